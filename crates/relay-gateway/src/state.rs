use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use relay_common::Result;
use relay_config::AppConfig;
use relay_metrics::{CommandSource, MetricsSampler, MetricsSource, SystemSource};
use relay_plugins::{
    ExecutorConfig, InterpreterResolver, PluginExecutor, PluginLoader, PluginRunner,
};
use relay_security::{SecretVerifier, SlidingWindowLimiter};

/// How often idle rate-limit entries are purged.
const LIMITER_CLEANUP_INTERVAL: Duration = Duration::from_secs(300); // 5 minutes

/// Shared application state accessible from all request handlers.
pub struct AppState {
    pub config: AppConfig,
    pub runner: PluginRunner,
    pub sampler: Arc<MetricsSampler>,
    pub verifier: SecretVerifier,
    pub limiter: SlidingWindowLimiter,
}

impl AppState {
    pub fn new(config: AppConfig, runner: PluginRunner, sampler: Arc<MetricsSampler>) -> Result<Self> {
        config.validate()?;

        let verifier = SecretVerifier::new(config.gateway.agent_secret.clone().unwrap_or_default());
        let limiter = SlidingWindowLimiter::new(
            config.gateway.rate_limit_max_requests,
            config.gateway.rate_limit_window(),
        );

        Ok(Self {
            config,
            runner,
            sampler,
            verifier,
            limiter,
        })
    }

    /// Wire the plugin runner and metrics sampler described by `config`.
    pub fn from_config(config: AppConfig) -> Result<Self> {
        config.validate()?;

        let runner = build_runner(&config);

        let source: Arc<dyn MetricsSource> = match &config.metrics.command {
            Some(argv) => Arc::new(CommandSource::from_argv(
                argv,
                config.metrics.command_timeout(),
            )?),
            None => Arc::new(SystemSource::new()),
        };
        let sampler = Arc::new(MetricsSampler::new(source, config.metrics.max_history));

        Self::new(config, runner, sampler)
    }

    /// Spawn a background task that periodically drops idle rate-limit entries.
    pub fn spawn_limiter_cleanup(self: &Arc<Self>) {
        let state = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(LIMITER_CLEANUP_INTERVAL);
            loop {
                interval.tick().await;
                state.limiter.purge_idle(Instant::now());
            }
        });
    }
}

pub type SharedState = Arc<AppState>;

/// Build the plugin runner described by the `plugins` config section.
pub fn build_runner(config: &AppConfig) -> PluginRunner {
    let plugins = &config.plugins;
    let resolver = InterpreterResolver::new("Python", plugins.python.clone())
        .with_check_timeout(plugins.timeout());
    let executor = PluginExecutor::new(
        ExecutorConfig {
            timeout: plugins.timeout(),
            shell: plugins.shell.clone(),
            node: plugins.node.clone(),
        },
        Arc::new(resolver),
    );
    let plugins_dir = plugins
        .dir
        .clone()
        .unwrap_or_else(|| PathBuf::from("plugins"));
    PluginRunner::new(PluginLoader::new(plugins_dir), Arc::new(executor))
}
