use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub chain: ChainConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChainConfig {
    /// Payload of the genesis block.
    pub genesis_data: String,
    /// Address that sends every transaction submitted through this node and
    /// receives coinbase rewards.
    pub wallet_address: String,
    /// Minted for the wallet by every appended block; zero disables coinbase.
    pub block_reward: u64,
    /// Minted for the wallet inside the genesis block; zero keeps genesis
    /// message-only.
    pub genesis_allocation: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            genesis_data: "Genesis".to_string(),
            wallet_address: "linkchain-node".to_string(),
            block_reward: 50,
            genesis_allocation: 0,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 4000,
            cors_origins: vec!["*".to_string()],
        }
    }
}

impl Config {
    /// Reads `path` if it exists; a missing file yields the defaults.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = serde_json::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            log::debug!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    pub fn validate(&self) -> crate::Result<()> {
        if self.chain.wallet_address.trim().is_empty() {
            return Err(crate::LedgerError::Config("chain.wallet_address must be set".to_string()));
        }
        if self.api.host.trim().is_empty() {
            return Err(crate::LedgerError::Config("api.host must be set".to_string()));
        }
        Ok(())
    }

    pub fn default_path() -> PathBuf {
        let home_dir = env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home_dir).join(".linkchain").join("config.json")
    }
}
