//! The network seam.
//!
//! [`BalanceSource`] and [`Ledger`] are the only places the deposit flow
//! suspends on I/O.  [`RpcLedger`] implements them over the JSON-RPC client;
//! tests substitute an in-memory ledger.

use solana_account_decoder_client_types::UiAccountEncoding;
use solana_client::{
    client_error::{ClientError, ClientErrorKind},
    nonblocking::rpc_client::RpcClient,
    rpc_config::{RpcAccountInfoConfig, RpcTransactionConfig},
    rpc_request::{RpcError, RpcResponseErrorData},
};
use solana_sdk::{
    clock::Slot,
    commitment_config::CommitmentConfig,
    hash::Hash,
    pubkey::Pubkey,
    signature::Signature,
    transaction::Transaction,
};
use solana_transaction_status_client_types::UiTransactionEncoding;

use crate::error::{Error, Result};
use crate::state::parse_token_amount;

/// A token account as seen by the node at `slot`.  `amount` is `None` when the
/// account does not exist (yet) at that slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountObservation {
    pub slot:   Slot,
    pub amount: Option<u64>,
}

/// A signature that has reached the ledger's target commitment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureState {
    pub slot: Slot,
    /// Runtime error when the transaction landed but failed.
    pub err:  Option<String>,
}

#[allow(async_fn_in_trait)]
pub trait BalanceSource {
    /// Read a token account's raw amount, optionally requiring the node to
    /// have processed at least `min_context_slot`.
    async fn token_amount(
        &self,
        account:          &Pubkey,
        min_context_slot: Option<Slot>,
    ) -> Result<AccountObservation>;
}

#[allow(async_fn_in_trait)]
pub trait Ledger: BalanceSource {
    async fn latest_blockhash(&self) -> Result<Hash>;

    /// Send a signed transaction.  A preflight rejection surfaces as
    /// [`Error::Rejected`] carrying the simulation logs.
    async fn send_transaction(&self, tx: &Transaction) -> Result<Signature>;

    /// `Some` once `signature` satisfies the target commitment, `None` before.
    async fn signature_state(&self, signature: &Signature) -> Result<Option<SignatureState>>;

    /// Program log lines recorded for a landed transaction.
    async fn transaction_logs(&self, signature: &Signature) -> Result<Vec<String>>;
}

// ─── JSON-RPC implementation ──────────────────────────────────────────────────

pub struct RpcLedger {
    rpc:        RpcClient,
    commitment: CommitmentConfig,
}

impl RpcLedger {
    /// Client at `confirmed` commitment.
    pub fn new(rpc_url: impl Into<String>) -> Self {
        Self::with_commitment(rpc_url, CommitmentConfig::confirmed())
    }

    pub fn with_commitment(rpc_url: impl Into<String>, commitment: CommitmentConfig) -> Self {
        Self {
            rpc: RpcClient::new_with_commitment(rpc_url.into(), commitment),
            commitment,
        }
    }

    pub fn url(&self) -> String {
        self.rpc.url()
    }
}

impl BalanceSource for RpcLedger {
    async fn token_amount(
        &self,
        account:          &Pubkey,
        min_context_slot: Option<Slot>,
    ) -> Result<AccountObservation> {
        let config = RpcAccountInfoConfig {
            encoding: Some(UiAccountEncoding::Base64),
            commitment: Some(self.commitment),
            min_context_slot,
            ..RpcAccountInfoConfig::default()
        };
        let response = self.rpc.get_account_with_config(account, config).await?;
        let amount = response
            .value
            .map(|acct| parse_token_amount(&acct.data))
            .transpose()?;
        Ok(AccountObservation { slot: response.context.slot, amount })
    }
}

impl Ledger for RpcLedger {
    async fn latest_blockhash(&self) -> Result<Hash> {
        Ok(self.rpc.get_latest_blockhash().await?)
    }

    async fn send_transaction(&self, tx: &Transaction) -> Result<Signature> {
        self.rpc.send_transaction(tx).await.map_err(|e| match preflight_failure(&e) {
            Some((reason, logs)) => Error::Rejected { signature: None, reason, logs },
            None => Error::Rpc(e),
        })
    }

    async fn signature_state(&self, signature: &Signature) -> Result<Option<SignatureState>> {
        let response = self.rpc.get_signature_statuses(&[*signature]).await?;
        Ok(response
            .value
            .into_iter()
            .next()
            .flatten()
            .filter(|status| status.satisfies_commitment(self.commitment))
            .map(|status| SignatureState {
                slot: status.slot,
                err:  status.err.map(|e| e.to_string()),
            }))
    }

    async fn transaction_logs(&self, signature: &Signature) -> Result<Vec<String>> {
        let config = RpcTransactionConfig {
            encoding: Some(UiTransactionEncoding::Json),
            commitment: Some(self.commitment),
            max_supported_transaction_version: Some(0),
        };
        let tx = self.rpc.get_transaction_with_config(signature, config).await?;
        Ok(tx
            .transaction
            .meta
            .and_then(|meta| Option::<Vec<String>>::from(meta.log_messages))
            .unwrap_or_default())
    }
}

/// Pull the node's message and simulation logs out of a preflight failure.
fn preflight_failure(err: &ClientError) -> Option<(String, Vec<String>)> {
    match err.kind() {
        ClientErrorKind::RpcError(RpcError::RpcResponseError {
            message,
            data: RpcResponseErrorData::SendTransactionPreflightFailure(sim),
            ..
        }) => Some((message.clone(), sim.logs.clone().unwrap_or_default())),
        _ => None,
    }
}
