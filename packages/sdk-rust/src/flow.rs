//! The deposit state machine.
//!
//! ```text
//! Init → AddressesDerived → PreBalancesRead → InstructionBuilt → Submitted
//!      → Confirmed → PostBalancesRead → Reported
//! ```
//!
//! Any step may end in `Failed`.  Progress is published on a watch channel so
//! a caller that abandons [`DepositFlow::run`] still knows whether a
//! transaction may have been sent.

use std::fmt;

use solana_sdk::{
    instruction::Instruction,
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
};
use tokio::sync::watch;

use crate::addresses::{DepositorAccounts, PoolAddresses};
use crate::config::DepositConfig;
use crate::error::{Error, Result};
use crate::instructions::{create_associated_token_account_idempotent_ix, deposit_ix, DepositInstruction};
use crate::ledger::Ledger;
use crate::reader::{read_balance, BalanceRead, UnavailableReason};
use crate::report::{BalanceSet, DepositReport};
use crate::submitter::Submitter;

// ─── Phases ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Init,
    AddressesDerived,
    PreBalancesRead,
    InstructionBuilt,
    Submitted,
    Confirmed,
    PostBalancesRead,
    Reported,
    Failed,
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Reported | Phase::Failed)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Init             => "init",
            Phase::AddressesDerived => "addresses-derived",
            Phase::PreBalancesRead  => "pre-balances-read",
            Phase::InstructionBuilt => "instruction-built",
            Phase::Submitted        => "submitted",
            Phase::Confirmed        => "confirmed",
            Phase::PostBalancesRead => "post-balances-read",
            Phase::Reported         => "reported",
            Phase::Failed           => "failed",
        };
        f.write_str(name)
    }
}

/// Latest phase plus the transaction signature once one exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub phase:     Phase,
    pub signature: Option<Signature>,
}

impl Progress {
    /// True once a signed transaction has been handed to the network.  Such a
    /// transaction cannot be recalled.  A preflight rejection clears it.
    pub fn may_have_landed(&self) -> bool {
        self.signature.is_some()
    }
}

// ─── Request ──────────────────────────────────────────────────────────────────

/// One deposit: raw amounts of token A and token B.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepositRequest {
    pub amount_a: u64,
    pub amount_b: u64,
}

impl DepositRequest {
    pub fn new(amount_a: u64, amount_b: u64) -> Self {
        Self { amount_a, amount_b }
    }

    pub fn validate(&self) -> Result<()> {
        if self.amount_a == 0 || self.amount_b == 0 {
            return Err(Error::InvalidArgument(format!(
                "both deposit amounts must be > 0 (got a={}, b={})",
                self.amount_a, self.amount_b
            )));
        }
        Ok(())
    }

    pub fn instruction(&self) -> DepositInstruction {
        DepositInstruction { amount_a: self.amount_a, amount_b: self.amount_b }
    }
}

// ─── Flow ─────────────────────────────────────────────────────────────────────

pub struct DepositFlow<L> {
    config:    DepositConfig,
    ledger:    L,
    submitter: Submitter,
    progress:  watch::Sender<Progress>,
}

impl<L: Ledger> DepositFlow<L> {
    pub fn new(config: DepositConfig, ledger: L) -> Self {
        let submitter = Submitter::from_config(&config);
        let (progress, _) = watch::channel(Progress { phase: Phase::Init, signature: None });
        Self { config, ledger, submitter, progress }
    }

    pub fn config(&self) -> &DepositConfig {
        &self.config
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Follow phase transitions of this flow.
    pub fn subscribe(&self) -> watch::Receiver<Progress> {
        self.progress.subscribe()
    }

    pub fn progress(&self) -> Progress {
        *self.progress.borrow()
    }

    /// Pool and depositor accounts for `owner`.  No I/O.
    pub fn addresses(&self, owner: &Pubkey) -> (PoolAddresses, DepositorAccounts) {
        let pool = PoolAddresses::derive(&self.config.programs, &self.config.pool);
        let accounts = DepositorAccounts::derive(owner, &pool, &self.config.programs);
        (pool, accounts)
    }

    /// Every instruction the deposit transaction carries, in order.
    pub fn instructions(
        &self,
        pool:     &PoolAddresses,
        accounts: &DepositorAccounts,
        request:  &DepositRequest,
    ) -> Vec<Instruction> {
        let programs = &self.config.programs;
        let mut ixs = Vec::with_capacity(4);
        if self.config.create_missing_accounts {
            for (_, mint) in accounts.with_mints(pool) {
                ixs.push(create_associated_token_account_idempotent_ix(
                    &accounts.owner,
                    &accounts.owner,
                    &mint,
                    &programs.token,
                    &programs.associated_token,
                ));
            }
        }
        ixs.push(deposit_ix(&programs.amm, &programs.token, pool, accounts, request.instruction()));
        ixs
    }

    /// Execute one deposit end to end.
    ///
    /// Not idempotent: every successful call is a separate deposit.
    pub async fn run(&self, depositor: &Keypair, request: DepositRequest) -> Result<DepositReport> {
        self.progress.send_replace(Progress { phase: Phase::Init, signature: None });
        match self.drive(depositor, request).await {
            Ok(report) => Ok(report),
            Err(e) => {
                let reached = self.progress().phase;
                // a preflight rejection was never forwarded to the network
                let never_sent = matches!(e, Error::Rejected { signature: None, .. });
                self.progress.send_modify(|p| {
                    p.phase = Phase::Failed;
                    if never_sent {
                        p.signature = None;
                    }
                });
                log::error!("Deposit failed after phase {reached}: {e}");
                for line in e.logs() {
                    log::error!("  {line}");
                }
                Err(e)
            }
        }
    }

    async fn drive(&self, depositor: &Keypair, request: DepositRequest) -> Result<DepositReport> {
        request.validate()?;

        let (pool, accounts) = self.addresses(&depositor.pubkey());
        log::debug!("pool {} (bump {})", pool.pool, pool.bump);
        log::debug!(
            "depositor {}: token A {}, token B {}, shares {}",
            accounts.owner, accounts.token_a, accounts.token_b, accounts.shares
        );
        self.advance(Phase::AddressesDerived, None);

        let pre = self.read_set(&accounts, None).await?;
        self.advance(Phase::PreBalancesRead, None);

        let instructions = self.instructions(&pool, &accounts, &request);
        let tx = self.submitter.sign(&self.ledger, &instructions, depositor).await?;
        self.advance(Phase::InstructionBuilt, None);

        self.advance(Phase::Submitted, Some(tx.signatures[0]));
        let confirmation = self.submitter.send_and_confirm(&self.ledger, &tx).await?;
        self.advance(Phase::Confirmed, None);

        let post = self.read_set(&accounts, Some(confirmation.slot)).await?;
        self.advance(Phase::PostBalancesRead, None);

        let report = DepositReport::reconcile(
            request.instruction(),
            &pool,
            pre,
            post,
            confirmation,
            self.config.pool.decimals,
        );
        self.advance(Phase::Reported, None);
        Ok(report)
    }

    async fn read_set(&self, accounts: &DepositorAccounts, min_slot: Option<u64>) -> Result<BalanceSet> {
        Ok(BalanceSet {
            token_a: self.read(&accounts.token_a, min_slot).await?,
            token_b: self.read(&accounts.token_b, min_slot).await?,
            shares:  self.read(&accounts.shares, min_slot).await?,
        })
    }

    /// Read one balance, failing only when `strict_balances` demands a value.
    /// A pre-deposit "account not found" is an authoritative answer and is
    /// always accepted.
    async fn read(&self, account: &Pubkey, min_slot: Option<u64>) -> Result<BalanceRead> {
        let read = read_balance(&self.ledger, account, min_slot, self.config.retry).await;
        let acceptable = match (&read, min_slot) {
            (BalanceRead::Observed(_), _) => true,
            (BalanceRead::Unavailable { reason: UnavailableReason::AccountNotFound { .. }, .. }, None) => true,
            _ => !self.config.strict_balances,
        };
        if acceptable {
            Ok(read)
        } else {
            read.into_result().map(BalanceRead::Observed)
        }
    }

    fn advance(&self, phase: Phase, signature: Option<Signature>) {
        self.progress.send_modify(|p| {
            p.phase = phase;
            if signature.is_some() {
                p.signature = signature;
            }
        });
        match signature {
            Some(sig) => log::info!("deposit: {phase} ({sig})"),
            None => log::info!("deposit: {phase}"),
        }
    }
}
