use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::process::Command;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, error, warn};

use crate::descriptor::{PluginDescriptor, PluginKind};
use crate::interpreter::InterpreterResolver;
use crate::output::{INVALID_OUTPUT, PluginResult};
use crate::validation::validate;

const DEFAULT_TIMEOUT_SECS: u64 = 10;
/// Cap on stderr text carried into an error result or a log line.
const MAX_STDERR_CHARS: usize = 512;

#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Hard wall-clock limit per plugin process.
    pub timeout: Duration,
    /// Program used for `.sh` plugins.
    pub shell: String,
    /// Program used for `.js` plugins.
    pub node: String,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            shell: "bash".to_string(),
            node: "node".to_string(),
        }
    }
}

/// Runs a single plugin process and folds every outcome into a
/// [`PluginResult`]. `execute` never fails: spawn errors, non-zero exits,
/// timeouts and contract violations all come back as error results.
pub struct PluginExecutor {
    config: ExecutorConfig,
    python: Arc<InterpreterResolver>,
}

impl PluginExecutor {
    pub fn new(config: ExecutorConfig, python: Arc<InterpreterResolver>) -> Self {
        Self { config, python }
    }

    pub async fn execute(&self, plugin: &PluginDescriptor) -> PluginResult {
        let title = plugin.title();
        let name = plugin.file_name();
        // Interpreter lookup and the run itself share one deadline.
        let deadline = Instant::now() + self.config.timeout;

        let program = match plugin.kind {
            PluginKind::Script => match timeout_at(deadline, self.python.resolve()).await {
                Ok(Some(interpreter)) => interpreter,
                Ok(None) => return PluginResult::failure(title, self.python.not_found_message()),
                Err(_) => return self.timed_out(title, &name),
            },
            PluginKind::Shell => self.config.shell.clone(),
            PluginKind::NativeRuntime => self.config.node.clone(),
        };

        debug!(plugin = %name, program = %program, "running plugin");

        let child = Command::new(&program)
            .arg(&plugin.path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let child = match child {
            Ok(child) => child,
            Err(e) => {
                error!(plugin = %name, "failed to spawn {program}: {e}");
                return PluginResult::failure(title, format!("failed to execute plugin: {e}"));
            }
        };

        // Dropping the wait future on timeout drops the child, which kills it.
        let output = match timeout_at(deadline, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                error!(plugin = %name, "failed to collect plugin output: {e}");
                return PluginResult::failure(title, format!("failed to execute plugin: {e}"));
            }
            Err(_) => return self.timed_out(title, &name),
        };

        let stderr = String::from_utf8_lossy(&output.stderr);
        let stderr = stderr.trim();

        if !output.status.success() {
            let mut message = match output.status.code() {
                Some(code) => format!("plugin exited with code {code}"),
                None => "plugin terminated by signal".to_string(),
            };
            if !stderr.is_empty() {
                message.push_str(": ");
                message.push_str(&truncate_chars(stderr, MAX_STDERR_CHARS));
            }
            error!(plugin = %name, "{message}");
            return PluginResult::failure(title, message);
        }

        if !stderr.is_empty() {
            warn!(
                plugin = %name,
                "plugin stderr: {}",
                truncate_chars(stderr, MAX_STDERR_CHARS)
            );
        }

        let raw: Value = match serde_json::from_slice(&output.stdout) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(plugin = %name, "plugin printed invalid JSON: {e}");
                return PluginResult::failure(title, INVALID_OUTPUT);
            }
        };

        match validate(&raw) {
            Ok(result) => result,
            Err(e) => {
                warn!(plugin = %name, "plugin output rejected: {e}");
                PluginResult::failure(title, INVALID_OUTPUT)
            }
        }
    }

    fn timed_out(&self, title: String, name: &str) -> PluginResult {
        let message = format!("plugin timed out after {:?}", self.config.timeout);
        error!(plugin = %name, "{message}");
        PluginResult::failure(title, message)
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}... (truncated)", &s[..idx]),
        None => s.to_string(),
    }
}
