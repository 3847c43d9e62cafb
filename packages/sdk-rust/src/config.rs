//! Deposit configuration.
//!
//! The on-disk form ([`FileConfig`]) is plain strings so it stays readable in
//! TOML.  It is validated exactly once into [`DepositConfig`], which the rest
//! of the SDK treats as immutable.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use solana_sdk::{pubkey::Pubkey, signature::Signature};

use crate::error::{Error, Result};
use crate::reader::RetryPolicy;

/// Largest decimal exponent whose scale factor fits in a `u64`.
const MAX_DECIMALS: u8 = 19;

// ─── File form ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    /// JSON-RPC endpoint of the ledger node
    pub rpc_url: String,

    /// Depositor keypair file (JSON byte array)
    pub keypair_path: String,

    /// Prepend idempotent associated-account creation to the deposit transaction
    #[serde(default)]
    pub create_missing_accounts: bool,

    /// Fail the deposit when any balance read is unavailable instead of
    /// reporting an unknown delta
    #[serde(default)]
    pub strict_balances: bool,

    /// Block-explorer URL template, e.g. `https://explorer/tx/{signature}`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explorer_tx_url: Option<String>,

    pub programs: ProgramsSection,
    pub pool:     PoolSection,

    #[serde(default)]
    pub reader: ReaderSection,

    #[serde(default)]
    pub submit: SubmitSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgramsSection {
    pub amm:              String,
    pub token:            String,
    pub associated_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolSection {
    pub mint_a:     String,
    pub mint_b:     String,
    pub share_mint: String,
    pub vault_a:    String,
    pub vault_b:    String,
    #[serde(default = "default_decimals")]
    pub decimals:   u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReaderSection {
    pub attempts: u32,
    pub delay_ms: u64,
}

impl Default for ReaderSection {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self { attempts: policy.attempts, delay_ms: policy.delay.as_millis() as u64 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitSection {
    pub confirm_timeout_secs: u64,
    pub poll_interval_ms:     u64,
}

impl Default for SubmitSection {
    fn default() -> Self {
        Self { confirm_timeout_secs: 60, poll_interval_ms: 500 }
    }
}

fn default_decimals() -> u8 {
    9
}

impl FileConfig {
    /// Load a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| Error::Config {
            path:   path.display().to_string(),
            reason: e.to_string(),
        })?;
        toml::from_str(&raw).map_err(|e| Error::Config {
            path:   path.display().to_string(),
            reason: e.to_string(),
        })
    }

    /// The B-C pool on GorbChain this tool was first pointed at.
    pub fn gorbchain_pool2() -> Self {
        Self {
            rpc_url:                 "https://rpc.gorbchain.xyz".to_string(),
            keypair_path:            "~/.config/solana/id.json".to_string(),
            create_missing_accounts: false,
            strict_balances:         false,
            explorer_tx_url:         Some("https://gorbscan.com/tx/{signature}".to_string()),
            programs: ProgramsSection {
                amm:              "8qhCTESZN9xDCHvtXFdCHfsgcctudbYdzdCFzUkTTMMe".to_string(),
                token:            "G22oYgZ6LnVcy7v8eSNi2xpNk1NcZiPD8CVKSTut7oZ6".to_string(),
                associated_token: "GoATGVNeSXerFerPqTJ8hcED1msPWHHLxao2vwBYqowm".to_string(),
            },
            pool: PoolSection {
                mint_a:     "AtZBwYcxgP2c9KYL1iezZrf8t7bbXTssSt6Aoz3h9wbH".to_string(),
                mint_b:     "EnpmunfM7kxxgLSJXd3ZG5jaJShMqJF9so95NcXJv1UW".to_string(),
                share_mint: "Brqgz5Lvq6St3WVLsAYvupZRiuZtzqsZHJi1FvM4YXuY".to_string(),
                vault_a:    "FTMqVxLRMpCpSPaUAHNKgSFmq6BoEULbb6QfYkPNhMCE".to_string(),
                vault_b:    "Ei2eeRY1X8hG9VJ6PVyT7mcLUPcXUEa4uJqoA5LACW85".to_string(),
                decimals:   default_decimals(),
            },
            reader: ReaderSection::default(),
            submit: SubmitSection::default(),
        }
    }

    /// Write the preset config to `path` as pretty TOML.
    pub fn write_default(path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let toml_str = toml::to_string_pretty(&Self::gorbchain_pool2()).map_err(|e| {
            Error::Config { path: path.display().to_string(), reason: e.to_string() }
        })?;
        std::fs::write(path, toml_str).map_err(|e| Error::Config {
            path:   path.display().to_string(),
            reason: e.to_string(),
        })?;
        log::info!("Created default config at {}", path.display());
        Ok(())
    }
}

// ─── Validated form ───────────────────────────────────────────────────────────

/// Program identifiers the deposit touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramIds {
    pub amm:              Pubkey,
    pub token:            Pubkey,
    pub associated_token: Pubkey,
}

/// Addresses fixed when the pool was initialised, plus display decimals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    pub mint_a:     Pubkey,
    pub mint_b:     Pubkey,
    pub share_mint: Pubkey,
    pub vault_a:    Pubkey,
    pub vault_b:    Pubkey,
    pub decimals:   u8,
}

#[derive(Debug, Clone)]
pub struct DepositConfig {
    pub rpc_url:                 String,
    pub keypair_path:            String,
    pub programs:                ProgramIds,
    pub pool:                    PoolConfig,
    pub retry:                   RetryPolicy,
    pub confirm_timeout:         Duration,
    pub poll_interval:           Duration,
    pub create_missing_accounts: bool,
    pub strict_balances:         bool,
    pub explorer_tx_url:         Option<String>,
}

impl DepositConfig {
    /// Load and validate a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::try_from(FileConfig::load(path)?)
    }

    /// Explorer link for a signature, when a template is configured.
    pub fn explorer_link(&self, signature: &Signature) -> Option<String> {
        self.explorer_tx_url
            .as_ref()
            .map(|t| t.replace("{signature}", &signature.to_string()))
    }
}

impl TryFrom<FileConfig> for DepositConfig {
    type Error = Error;

    fn try_from(file: FileConfig) -> Result<Self> {
        if file.rpc_url.trim().is_empty() {
            return Err(Error::InvalidConfig("rpc_url must not be empty".into()));
        }

        let programs = ProgramIds {
            amm:              parse_key("programs.amm", &file.programs.amm)?,
            token:            parse_key("programs.token", &file.programs.token)?,
            associated_token: parse_key("programs.associated_token", &file.programs.associated_token)?,
        };

        let pool = PoolConfig {
            mint_a:     parse_key("pool.mint_a", &file.pool.mint_a)?,
            mint_b:     parse_key("pool.mint_b", &file.pool.mint_b)?,
            share_mint: parse_key("pool.share_mint", &file.pool.share_mint)?,
            vault_a:    parse_key("pool.vault_a", &file.pool.vault_a)?,
            vault_b:    parse_key("pool.vault_b", &file.pool.vault_b)?,
            decimals:   file.pool.decimals,
        };

        if pool.mint_a == pool.mint_b {
            return Err(Error::InvalidConfig("pool.mint_a and pool.mint_b must differ".into()));
        }
        if pool.share_mint == pool.mint_a || pool.share_mint == pool.mint_b {
            return Err(Error::InvalidConfig(
                "pool.share_mint must differ from both pooled mints".into(),
            ));
        }
        if pool.vault_a == pool.vault_b {
            return Err(Error::InvalidConfig("pool.vault_a and pool.vault_b must differ".into()));
        }
        if pool.decimals > MAX_DECIMALS {
            return Err(Error::InvalidConfig(format!(
                "pool.decimals = {} exceeds {MAX_DECIMALS}",
                pool.decimals
            )));
        }

        if file.reader.attempts == 0 {
            return Err(Error::InvalidConfig("reader.attempts must be at least 1".into()));
        }
        if file.submit.confirm_timeout_secs == 0 {
            return Err(Error::InvalidConfig("submit.confirm_timeout_secs must be > 0".into()));
        }
        if file.submit.poll_interval_ms == 0 {
            return Err(Error::InvalidConfig("submit.poll_interval_ms must be > 0".into()));
        }
        if let Some(t) = &file.explorer_tx_url {
            if !t.contains("{signature}") {
                return Err(Error::InvalidConfig(
                    "explorer_tx_url must contain a {signature} placeholder".into(),
                ));
            }
        }

        Ok(Self {
            rpc_url:      file.rpc_url,
            keypair_path: file.keypair_path,
            programs,
            pool,
            retry: RetryPolicy {
                attempts: file.reader.attempts,
                delay:    Duration::from_millis(file.reader.delay_ms),
            },
            confirm_timeout:         Duration::from_secs(file.submit.confirm_timeout_secs),
            poll_interval:           Duration::from_millis(file.submit.poll_interval_ms),
            create_missing_accounts: file.create_missing_accounts,
            strict_balances:         file.strict_balances,
            explorer_tx_url:         file.explorer_tx_url,
        })
    }
}

fn parse_key(field: &str, value: &str) -> Result<Pubkey> {
    Pubkey::from_str(value.trim())
        .map_err(|e| Error::InvalidConfig(format!("{field}: '{value}' is not a valid address ({e})")))
}
