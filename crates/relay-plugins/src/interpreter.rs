use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

/// How long a single `--version` check may take before the candidate is
/// treated as unavailable.
const DEFAULT_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Finds a working interpreter for script plugins and remembers the answer.
///
/// The first call checks each candidate with `--version`; the outcome,
/// including "none available", is cached for the life of the process so busy
/// status polling never re-spawns checks. Concurrent first calls share a
/// single check.
#[derive(Debug)]
pub struct InterpreterResolver {
    runtime: String,
    candidates: Vec<String>,
    check_timeout: Duration,
    resolved: OnceCell<Option<String>>,
}

impl InterpreterResolver {
    pub fn new(runtime: impl Into<String>, candidates: Vec<String>) -> Self {
        Self {
            runtime: runtime.into(),
            candidates,
            check_timeout: DEFAULT_CHECK_TIMEOUT,
            resolved: OnceCell::new(),
        }
    }

    pub fn with_check_timeout(mut self, timeout: Duration) -> Self {
        self.check_timeout = timeout;
        self
    }

    /// Resolver for `.py` plugins trying `python3` then `python`.
    pub fn python() -> Self {
        Self::new("Python", vec!["python3".to_string(), "python".to_string()])
    }

    pub fn runtime_name(&self) -> &str {
        &self.runtime
    }

    /// The cached outcome, if the check has already run.
    pub fn cached(&self) -> Option<Option<&str>> {
        self.resolved.get().map(|r| r.as_deref())
    }

    pub async fn resolve(&self) -> Option<String> {
        self.resolved
            .get_or_init(|| self.check_candidates())
            .await
            .clone()
    }

    /// Message used as the plugin error when nothing resolved.
    pub fn not_found_message(&self) -> String {
        format!(
            "{} not found (tried {})",
            self.runtime,
            self.candidates.join(" and ")
        )
    }

    async fn check_candidates(&self) -> Option<String> {
        for candidate in &self.candidates {
            if version_check(candidate, self.check_timeout).await {
                info!("using {} interpreter: {}", self.runtime, candidate);
                return Some(candidate.clone());
            }
            debug!("{} candidate unavailable: {}", self.runtime, candidate);
        }
        warn!("{}", self.not_found_message());
        None
    }
}

async fn version_check(program: &str, timeout: Duration) -> bool {
    let mut command = Command::new(program);
    command
        .arg("--version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true);

    match tokio::time::timeout(timeout, command.status()).await {
        Ok(Ok(status)) => status.success(),
        Ok(Err(_)) => false,
        Err(_) => {
            warn!("{program} --version did not answer within {timeout:?}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use std::sync::Arc;

    const MISSING: &str = "relay-test-missing-interpreter";

    #[tokio::test]
    async fn resolves_first_working_candidate() {
        let resolver = InterpreterResolver::new("Bash", vec!["bash".into(), "sh".into()]);
        assert_eq!(resolver.cached(), None);
        assert_eq!(resolver.resolve().await.as_deref(), Some("bash"));
        assert_eq!(resolver.cached(), Some(Some("bash")));
    }

    #[tokio::test]
    async fn falls_back_when_primary_is_missing() {
        let resolver = InterpreterResolver::new("Bash", vec![MISSING.into(), "bash".into()]);
        assert_eq!(resolver.resolve().await.as_deref(), Some("bash"));
    }

    #[tokio::test]
    async fn memoizes_unavailable() {
        let resolver =
            InterpreterResolver::new("Python", vec![MISSING.into(), format!("{MISSING}-2")]);
        assert_eq!(resolver.resolve().await, None);
        assert_eq!(resolver.cached(), Some(None));
        assert_eq!(resolver.resolve().await, None);
        assert_eq!(
            resolver.not_found_message(),
            format!("Python not found (tried {MISSING} and {MISSING}-2)")
        );
    }

    #[tokio::test]
    async fn concurrent_callers_agree() {
        let resolver = Arc::new(InterpreterResolver::new(
            "Bash",
            vec![MISSING.into(), "bash".into()],
        ));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let r = Arc::clone(&resolver);
                tokio::spawn(async move { r.resolve().await })
            })
            .collect();
        for h in handles {
            assert_eq!(h.await.unwrap().as_deref(), Some("bash"));
        }
    }

    #[tokio::test]
    async fn hung_candidate_is_skipped_after_check_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let hung = dir.path().join("python3");
        std::fs::write(&hung, "#!/bin/sh\nsleep 10\n").unwrap();
        std::fs::set_permissions(&hung, std::fs::Permissions::from_mode(0o755)).unwrap();

        let resolver = InterpreterResolver::new(
            "Python",
            vec![hung.display().to_string(), "bash".into()],
        )
        .with_check_timeout(Duration::from_millis(200));

        let start = std::time::Instant::now();
        assert_eq!(resolver.resolve().await.as_deref(), Some("bash"));
        assert!(start.elapsed() < Duration::from_secs(3));
    }

    #[test]
    fn python_defaults() {
        let resolver = InterpreterResolver::python();
        assert_eq!(resolver.runtime_name(), "Python");
        assert_eq!(
            resolver.not_found_message(),
            "Python not found (tried python3 and python)"
        );
    }
}
