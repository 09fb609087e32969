use std::fmt;
use std::path::PathBuf;

/// How a plugin file is launched, decided by its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PluginKind {
    /// `.py`, run through the resolved Python interpreter.
    Script,
    /// `.sh`, run through the configured shell.
    Shell,
    /// `.js`, run through node.
    NativeRuntime,
}

impl PluginKind {
    pub const SUPPORTED_EXTENSIONS: [&'static str; 3] = ["py", "sh", "js"];

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "py" => Some(Self::Script),
            "sh" => Some(Self::Shell),
            "js" => Some(Self::NativeRuntime),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Script => "script",
            Self::Shell => "shell",
            Self::NativeRuntime => "native-runtime",
        }
    }
}

impl fmt::Display for PluginKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginDescriptor {
    pub path: PathBuf,
    pub kind: PluginKind,
}

impl PluginDescriptor {
    /// Returns `None` for files whose extension is not a supported plugin type.
    pub fn from_path(path: impl Into<PathBuf>) -> Option<Self> {
        let path = path.into();
        let kind = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(PluginKind::from_extension)?;
        Some(Self { path, kind })
    }

    /// File name without its extension; used as the title of failure results.
    pub fn title(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_follows_extension() {
        let cases = [
            ("/p/a.py", Some(PluginKind::Script)),
            ("/p/b.sh", Some(PluginKind::Shell)),
            ("/p/c.js", Some(PluginKind::NativeRuntime)),
            ("/p/notes.txt", None),
            ("/p/README", None),
            ("/p/archive.py.bak", None),
        ];
        for (path, expected) in cases {
            assert_eq!(
                PluginDescriptor::from_path(path).map(|d| d.kind),
                expected,
                "{path}"
            );
        }
    }

    #[test]
    fn title_strips_extension() {
        let desc = PluginDescriptor::from_path("/plugins/10_disk_usage.py").unwrap();
        assert_eq!(desc.title(), "10_disk_usage");
        assert_eq!(desc.file_name(), "10_disk_usage.py");
    }
}
