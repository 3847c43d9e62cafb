//! AMM deposit SDK
//!
//! Deposits two token balances into an existing two-asset AMM pool and
//! reconciles the depositor's balances before and after the transaction.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use amm_deposit_sdk::{DepositConfig, DepositFlow, DepositRequest, RpcLedger};
//! use solana_sdk::signature::read_keypair_file;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DepositConfig::load("amm-deposit.toml")?;
//!     let depositor = read_keypair_file(&config.keypair_path)?;
//!     let flow = DepositFlow::new(config.clone(), RpcLedger::new(&config.rpc_url));
//!
//!     // 0.5 of each 9-decimal token
//!     let report = flow.run(&depositor, DepositRequest::new(500_000_000, 500_000_000)).await?;
//!     println!("tx {}  shares received: {:?}", report.signature, report.shares_received());
//!     Ok(())
//! }
//! ```
//!
//! # Components
//!
//! | Module | Role |
//! |--------|------|
//! | [`addresses`] | Pool PDA and associated token accounts |
//! | [`reader`] | Balance reads with bounded retry |
//! | [`instructions`] | 17-byte deposit payload, 11-account instruction |
//! | [`submitter`] | Sign, send, timeout-bounded confirmation |
//! | [`report`] | Before/after deltas |
//! | [`flow`] | The state machine tying them together |

pub mod addresses;
pub mod amount;
pub mod config;
pub mod error;
pub mod flow;
pub mod instructions;
pub mod ledger;
pub mod reader;
pub mod report;
pub mod state;
pub mod submitter;

pub use addresses::{DepositorAccounts, PoolAddresses};
pub use config::{DepositConfig, FileConfig};
pub use error::{Error, Result};
pub use flow::{DepositFlow, DepositRequest, Phase, Progress};
pub use instructions::DepositInstruction;
pub use ledger::{BalanceSource, Ledger, RpcLedger};
pub use reader::{BalanceRead, BalanceSnapshot, RetryPolicy};
pub use report::{DepositReport, Delta};
pub use submitter::{Confirmation, Submitter};
