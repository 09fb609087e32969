use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "relay",
    version,
    about = "Relay agent - host monitoring relay for a remote dashboard"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error); defaults to the config's
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the status gateway and metrics sampler
    Start {
        /// Host to bind to (overrides config and HOST)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config and PORT)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Query a running agent's status endpoint
    Status,

    /// Inspect or run plugins locally
    Plugins {
        #[command(subcommand)]
        action: PluginCommands,
    },
}

#[derive(Subcommand)]
enum PluginCommands {
    /// List discovered plugins
    List,
    /// Run every plugin once and print the batch as JSON
    Run,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_loader = relay_config::ConfigLoader::new()?;
    let config = config_loader.load()?;

    let log_level = cli
        .log_level
        .or_else(|| config.log_level.clone())
        .unwrap_or_else(|| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level)),
        )
        .init();

    match cli.command {
        Commands::Start { host, port } => {
            config_loader.ensure_dirs()?;

            let mut config = config;
            if let Some(host) = host {
                config.gateway.host = host;
            }
            if let Some(port) = port {
                config.gateway.port = port;
            }

            let server = relay_gateway::GatewayServer::new(config);
            server.run().await?;
        }
        Commands::Status => {
            let secret = config
                .gateway
                .agent_secret
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("AGENT_SECRET is not set"))?;

            let resp = reqwest::Client::new()
                .get(format!(
                    "http://{}:{}/api/status",
                    config.gateway.host, config.gateway.port
                ))
                .header("x-agent-secret", secret)
                .send()
                .await
                .map_err(|_| {
                    anyhow::anyhow!(
                        "Relay agent is not running at {}:{}",
                        config.gateway.host,
                        config.gateway.port
                    )
                })?;

            if resp.status() == reqwest::StatusCode::UNAUTHORIZED {
                anyhow::bail!("Unauthorized. Please check AGENT_SECRET.");
            }
            if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
                anyhow::bail!("Rate limited by the agent; try again later.");
            }

            let body = resp.json::<serde_json::Value>().await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        Commands::Plugins { action } => {
            let runner = relay_gateway::build_runner(&config);
            match action {
                PluginCommands::List => {
                    let plugins = runner.discover()?;
                    println!("Plugins in {}:", runner.loader().plugins_dir().display());
                    if plugins.is_empty() {
                        println!("  (none)");
                    }
                    for plugin in plugins {
                        println!("  {} [{}]", plugin.file_name(), plugin.kind);
                    }
                }
                PluginCommands::Run => {
                    let results = runner.run().await?;
                    println!("{}", serde_json::to_string_pretty(&results)?);
                }
            }
        }
    }

    Ok(())
}
