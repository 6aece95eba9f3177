use crate::api::rest::RestApi;
use crate::config::Config;
use crate::core::Ledger;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "linkchaind")]
#[command(about = "Linkchain node - an in-memory hash-linked ledger with a JSON REST API")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, help = "Configuration file path")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "REST API port")]
    pub port: Option<u16>,

    #[arg(long, help = "Enable debug logging")]
    pub debug: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the node and serve the REST API
    Start {
        #[arg(long, help = "Address to bind the REST API to")]
        host: Option<String>,
    },

    /// Write a default configuration file
    Init {
        #[arg(long, help = "Overwrite an existing configuration file")]
        force: bool,
    },

    /// Print the effective configuration
    Config,
}

pub async fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.debug { "debug" } else { "info" };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).try_init();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load_from(&config_path)?;
    if let Some(port) = cli.port {
        config.api.port = port;
    }

    match cli.command {
        Commands::Start { host } => {
            if let Some(host) = host {
                config.api.host = host;
            }
            start_node(config).await
        }

        Commands::Init { force } => init_config(&config_path, &config, force),

        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

async fn start_node(config: Config) -> anyhow::Result<()> {
    config.validate()?;

    log::info!("🌟 Linkchain node starting (wallet {})", config.chain.wallet_address);
    let ledger = Ledger::new(config.chain).into_shared();

    RestApi::new(ledger, config.api).start().await?;
    Ok(())
}

fn init_config(path: &Path, config: &Config, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
    }

    config.save_to(path)?;
    println!("✅ Configuration written to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use tempfile::TempDir;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_start_with_overrides() {
        let cli = Cli::parse_from(["linkchaind", "--port", "5000", "--debug", "start", "--host", "0.0.0.0"]);

        assert_eq!(cli.port, Some(5000));
        assert!(cli.debug);
        assert!(matches!(cli.command, Commands::Start { host: Some(ref h) } if h == "0.0.0.0"));
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        let config = Config::default();

        init_config(&path, &config, false).unwrap();
        assert!(init_config(&path, &config, false).is_err());
        init_config(&path, &config, true).unwrap();

        assert_eq!(Config::load_from(&path).unwrap(), config);
    }
}
