//! SDK error type.

use std::time::Duration;

use solana_sdk::{pubkey::Pubkey, signature::Signature};

/// All errors returned by the deposit SDK.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    // ── RPC / network ────────────────────────────────────────────────────────
    /// A JSON-RPC call failed at the transport or node level.
    #[error("RPC error: {0}")]
    Rpc(#[from] solana_client::client_error::ClientError),

    // ── Submission ───────────────────────────────────────────────────────────
    /// The AMM program (or the runtime) refused the transaction.  Nothing was
    /// applied; `logs` is the program's execution trace, verbatim.
    #[error("Transaction rejected: {reason}")]
    Rejected {
        signature: Option<Signature>,
        reason:    String,
        logs:      Vec<String>,
    },

    /// The transaction was sent but did not reach the target commitment in time.
    /// It may still land.
    #[error("Transaction {signature} not confirmed after {waited:?}")]
    ConfirmationTimeout { signature: Signature, waited: Duration },

    // ── Balance reads ────────────────────────────────────────────────────────
    /// A balance read exhausted its retries and the caller required a value.
    #[error("Balance of {account} unavailable after {attempts} attempts: {reason}")]
    BalanceUnavailable {
        account:  Pubkey,
        attempts: u32,
        reason:   String,
    },

    // ── Account parsing ──────────────────────────────────────────────────────
    /// Raw account or instruction bytes could not be deserialized.
    #[error("Parse error at offset {offset}: {reason}")]
    ParseError { offset: usize, reason: String },

    // ── Configuration ────────────────────────────────────────────────────────
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Config file {path}: {reason}")]
    Config { path: String, reason: String },

    // ── Validation ───────────────────────────────────────────────────────────
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl Error {
    /// Program log lines attached to a rejection, empty for every other kind.
    pub fn logs(&self) -> &[String] {
        match self {
            Error::Rejected { logs, .. } => logs,
            _ => &[],
        }
    }
}

/// Convenience alias so every module can write `Result<T>`.
pub type Result<T> = std::result::Result<T, Error>;
