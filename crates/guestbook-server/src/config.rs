use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use tracing::info;

use guestbook_chain::{ChainConfig, DEFAULT_CHAIN_ID, DEFAULT_CONTRACT_ADDRESS};
use guestbook_types::{Address, WEI_PER_ETH};

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
];

pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub chain: ChainConfig,
    pub explorer_url: String,
    pub admin_address: Option<Address>,
    pub jwt_secret: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::load(|key| std::env::var(key).ok())
    }

    pub fn load(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| var(key).filter(|v| !v.trim().is_empty());

        let admin_address: Option<Address> = var("GUESTBOOK_ADMIN_ADDRESS")
            .map(|v| v.trim().parse())
            .transpose()
            .map_err(|e| anyhow::anyhow!("Invalid GUESTBOOK_ADMIN_ADDRESS: {}", e))?;

        let jwt_secret = var("GUESTBOOK_JWT_SECRET").unwrap_or_else(|| "dev-secret-change-me".into());
        if admin_address.is_some() && PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("GUESTBOOK_JWT_SECRET is unset or still a placeholder; set it before enabling admin login");
        }

        let contract_address = match var("GUESTBOOK_CONTRACT_ADDRESS") {
            Some(v) => v
                .trim()
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid GUESTBOOK_CONTRACT_ADDRESS: {}", e))?,
            None => DEFAULT_CONTRACT_ADDRESS,
        };

        let chain = ChainConfig {
            chain_id: parse_or(&var, "GUESTBOOK_CHAIN_ID", DEFAULT_CHAIN_ID)?,
            contract_address,
            genesis_balance: parse_or(&var, "GUESTBOOK_GENESIS_BALANCE_WEI", 10_000 * WEI_PER_ETH)?,
            mempool_capacity: parse_or(&var, "GUESTBOOK_MEMPOOL_CAPACITY", 1024)?,
            block_interval: Duration::from_millis(parse_or(&var, "GUESTBOOK_BLOCK_INTERVAL_MS", 2000)?),
        };
        if chain.block_interval.is_zero() {
            bail!("GUESTBOOK_BLOCK_INTERVAL_MS must be greater than zero");
        }

        Ok(Self {
            host: var("GUESTBOOK_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parse_or(&var, "GUESTBOOK_PORT", 3000)?,
            db_path: var("GUESTBOOK_DB_PATH").unwrap_or_else(|| "guestbook.db".into()).into(),
            chain,
            explorer_url: var("GUESTBOOK_EXPLORER_URL")
                .unwrap_or_else(|| "https://sepolia.etherscan.io".into()),
            admin_address,
            jwt_secret,
        })
    }
}

fn parse_or<T>(var: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr + Display,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match var(key) {
        Some(raw) => raw.trim().parse().with_context(|| format!("Invalid {} value '{}'", key, raw)),
        None => {
            info!("{} not set, using default: {}", key, default);
            Ok(default)
        }
    }
}
