//! Signing, sending, and confirmation.

use std::time::Duration;

use solana_sdk::{
    clock::Slot,
    instruction::Instruction,
    signature::{Keypair, Signature, Signer},
    transaction::Transaction,
};

use crate::config::DepositConfig;
use crate::error::{Error, Result};
use crate::ledger::Ledger;

/// A transaction that reached the target commitment without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Confirmation {
    pub signature: Signature,
    pub slot:      Slot,
}

pub struct Submitter {
    confirm_timeout: Duration,
    poll_interval:   Duration,
}

impl Submitter {
    pub fn new(confirm_timeout: Duration, poll_interval: Duration) -> Self {
        Self { confirm_timeout, poll_interval }
    }

    pub fn from_config(config: &DepositConfig) -> Self {
        Self::new(config.confirm_timeout, config.poll_interval)
    }

    /// Build a transaction paid for and signed by `depositor` against a fresh
    /// blockhash.  Its signature is known before anything is sent.
    pub async fn sign<L: Ledger>(
        &self,
        ledger:       &L,
        instructions: &[Instruction],
        depositor:    &Keypair,
    ) -> Result<Transaction> {
        let blockhash = ledger.latest_blockhash().await?;
        Ok(Transaction::new_signed_with_payer(
            instructions,
            Some(&depositor.pubkey()),
            &[depositor],
            blockhash,
        ))
    }

    /// Send `tx` and wait until it is confirmed, fails, or the timeout expires.
    pub async fn send_and_confirm<L: Ledger>(&self, ledger: &L, tx: &Transaction) -> Result<Confirmation> {
        let signature = ledger.send_transaction(tx).await?;
        log::info!("Sent transaction {signature}");
        self.confirm(ledger, signature).await
    }

    /// Poll the signature until it satisfies the ledger's commitment.
    ///
    /// A failed status poll is logged and polled again; only the overall
    /// timeout ends the wait.
    pub async fn confirm<L: Ledger>(&self, ledger: &L, signature: Signature) -> Result<Confirmation> {
        let wait = async {
            loop {
                match ledger.signature_state(&signature).await {
                    Ok(Some(state)) => break state,
                    Ok(None) => {}
                    Err(e) => log::warn!("Status poll for {signature} failed: {e}"),
                }
                tokio::time::sleep(self.poll_interval).await;
            }
        };

        let state = tokio::time::timeout(self.confirm_timeout, wait)
            .await
            .map_err(|_| Error::ConfirmationTimeout { signature, waited: self.confirm_timeout })?;

        if let Some(reason) = state.err {
            let logs = match ledger.transaction_logs(&signature).await {
                Ok(logs) => logs,
                Err(e) => {
                    log::warn!("Could not fetch logs for failed transaction {signature}: {e}");
                    Vec::new()
                }
            };
            return Err(Error::Rejected { signature: Some(signature), reason, logs });
        }

        log::info!("Transaction {signature} confirmed at slot {}", state.slot);
        Ok(Confirmation { signature, slot: state.slot })
    }
}
