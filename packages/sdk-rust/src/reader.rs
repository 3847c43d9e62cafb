//! Balance reads with bounded retry.
//!
//! A read that never succeeds is reported as [`BalanceRead::Unavailable`],
//! never as a zero balance; callers decide what an unknown balance means.

use std::fmt;
use std::time::Duration;

use solana_sdk::{clock::Slot, pubkey::Pubkey};

use crate::error::{Error, Result};
use crate::ledger::{AccountObservation, BalanceSource};

/// How many times a read is attempted and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay:    Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { attempts: 3, delay: Duration::from_secs(1) }
    }
}

/// A raw token amount observed at a given slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceSnapshot {
    pub account: Pubkey,
    pub amount:  u64,
    pub slot:    Slot,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnavailableReason {
    /// Every attempt found no such account; the last answer was at `slot`.
    AccountNotFound { slot: Slot },
    /// The last attempt failed outright.
    Failed(String),
}

impl fmt::Display for UnavailableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnavailableReason::AccountNotFound { slot } => {
                write!(f, "account not found (slot {slot})")
            }
            UnavailableReason::Failed(reason) => f.write_str(reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BalanceRead {
    Observed(BalanceSnapshot),
    Unavailable {
        account:  Pubkey,
        attempts: u32,
        reason:   UnavailableReason,
    },
}

impl BalanceRead {
    pub fn account(&self) -> Pubkey {
        match self {
            BalanceRead::Observed(s) => s.account,
            BalanceRead::Unavailable { account, .. } => *account,
        }
    }

    pub fn amount(&self) -> Option<u64> {
        match self {
            BalanceRead::Observed(s) => Some(s.amount),
            BalanceRead::Unavailable { .. } => None,
        }
    }

    /// The legacy fallback: unknown collapses to zero.  Only for display paths
    /// that label the value as unverified.
    pub fn amount_or_zero(&self) -> u64 {
        self.amount().unwrap_or(0)
    }

    pub fn is_observed(&self) -> bool {
        matches!(self, BalanceRead::Observed(_))
    }

    /// Require an observed balance.
    pub fn into_result(self) -> Result<BalanceSnapshot> {
        match self {
            BalanceRead::Observed(s) => Ok(s),
            BalanceRead::Unavailable { account, attempts, reason } => Err(Error::BalanceUnavailable {
                account,
                attempts,
                reason: reason.to_string(),
            }),
        }
    }
}

/// Read `account`'s token balance, retrying per `policy`.
///
/// Both RPC errors and a missing account count as transient: a freshly
/// created account may not be visible to the node yet.
pub async fn read_balance<S: BalanceSource>(
    source:           &S,
    account:          &Pubkey,
    min_context_slot: Option<Slot>,
    policy:           RetryPolicy,
) -> BalanceRead {
    let attempts = policy.attempts.max(1);
    let mut last = UnavailableReason::Failed("no attempt made".into());

    for attempt in 1..=attempts {
        match source.token_amount(account, min_context_slot).await {
            Ok(AccountObservation { slot, amount: Some(amount) }) => {
                log::debug!("balance {account} = {amount} at slot {slot}");
                return BalanceRead::Observed(BalanceSnapshot { account: *account, amount, slot });
            }
            Ok(AccountObservation { slot, amount: None }) => {
                log::warn!("Balance check attempt {attempt}/{attempts} for {account}: account not found at slot {slot}");
                last = UnavailableReason::AccountNotFound { slot };
            }
            Err(e) => {
                log::warn!("Balance check attempt {attempt}/{attempts} for {account} failed: {e}");
                last = UnavailableReason::Failed(e.to_string());
            }
        }
        if attempt < attempts {
            tokio::time::sleep(policy.delay).await;
        }
    }

    log::warn!("Balance of {account} unavailable after {attempts} attempts: {last}");
    BalanceRead::Unavailable { account: *account, attempts, reason: last }
}
