use relay_common::Result;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::descriptor::PluginDescriptor;

/// Discovers plugins in a single flat directory. Eligibility is decided by
/// file extension alone; there is no manifest.
#[derive(Debug, Clone)]
pub struct PluginLoader {
    plugins_dir: PathBuf,
}

impl PluginLoader {
    pub fn new(plugins_dir: impl Into<PathBuf>) -> Self {
        let plugins_dir = plugins_dir.into();
        let plugins_dir = std::path::absolute(&plugins_dir).unwrap_or(plugins_dir);
        Self { plugins_dir }
    }

    pub fn plugins_dir(&self) -> &Path {
        &self.plugins_dir
    }

    /// Scan the plugins directory, sorted by file name.
    ///
    /// A missing directory is created and yields no plugins. Files with an
    /// unsupported extension are skipped silently.
    pub fn discover(&self) -> Result<Vec<PluginDescriptor>> {
        if !self.plugins_dir.exists() {
            warn!(
                "plugins directory {} does not exist, creating it",
                self.plugins_dir.display()
            );
            std::fs::create_dir_all(&self.plugins_dir)?;
            return Ok(Vec::new());
        }

        let mut plugins = Vec::new();

        for entry in std::fs::read_dir(&self.plugins_dir)? {
            let entry = entry?;
            let path = entry.path();

            if !path.is_file() {
                continue;
            }

            match PluginDescriptor::from_path(&path) {
                Some(plugin) => plugins.push(plugin),
                None => debug!("ignoring non-plugin file {}", path.display()),
            }
        }

        plugins.sort_by(|a, b| a.path.file_name().cmp(&b.path.file_name()));
        Ok(plugins)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::PluginKind;
    use std::fs;

    #[test]
    fn missing_directory_is_created_and_empty() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("plugins");

        let plugins = PluginLoader::new(&dir).discover().unwrap();

        assert!(plugins.is_empty());
        assert!(dir.is_dir());
    }

    #[test]
    fn discovers_supported_files_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["20_docker.py", "00_vitals.py", "notes.txt", "10_disk.sh", "30_pm2.js"] {
            fs::write(dir.path().join(name), "").unwrap();
        }
        fs::create_dir(dir.path().join("helpers.py")).unwrap();

        let plugins = PluginLoader::new(dir.path()).discover().unwrap();

        let names: Vec<_> = plugins.iter().map(|p| p.file_name()).collect();
        assert_eq!(names, ["00_vitals.py", "10_disk.sh", "20_docker.py", "30_pm2.js"]);
        assert_eq!(plugins[1].kind, PluginKind::Shell);
        assert_eq!(plugins[3].kind, PluginKind::NativeRuntime);
        assert!(plugins.iter().all(|p| p.path.is_absolute()));
    }

    #[test]
    fn relative_directory_is_made_absolute() {
        let loader = PluginLoader::new("plugins");
        assert!(loader.plugins_dir().is_absolute());
    }
}
