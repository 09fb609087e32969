use std::sync::Arc;

use futures::future::join_all;
use relay_common::Result;
use tracing::{debug, info};

use crate::descriptor::PluginDescriptor;
use crate::executor::PluginExecutor;
use crate::loader::PluginLoader;
use crate::output::PluginResult;

/// Runs one batch: re-discovers the plugin directory and executes every
/// plugin concurrently.
#[derive(Clone)]
pub struct PluginRunner {
    loader: PluginLoader,
    executor: Arc<PluginExecutor>,
}

impl PluginRunner {
    pub fn new(loader: PluginLoader, executor: Arc<PluginExecutor>) -> Self {
        Self { loader, executor }
    }

    pub fn loader(&self) -> &PluginLoader {
        &self.loader
    }

    pub fn discover(&self) -> Result<Vec<PluginDescriptor>> {
        self.loader.discover()
    }

    /// Execute all discovered plugins and return their results in directory
    /// order. Per-plugin failures are folded into that plugin's entry; only
    /// a failure to read the directory is returned as `Err`.
    pub async fn run(&self) -> Result<Vec<PluginResult>> {
        let plugins = self.loader.discover()?;
        if plugins.is_empty() {
            return Ok(Vec::new());
        }

        debug!("running {} plugins", plugins.len());
        let started = std::time::Instant::now();

        let results = join_all(plugins.iter().map(|p| self.executor.execute(p))).await;

        let failed = results.iter().filter(|r| r.is_error()).count();
        info!(
            "plugin batch finished: {} ok, {} failed in {:?}",
            results.len() - failed,
            failed,
            started.elapsed()
        );

        Ok(results)
    }
}
