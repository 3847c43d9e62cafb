//! Before/after reconciliation.
//!
//! The share amount minted by a deposit is decided inside the AMM program;
//! this module only observes it.

use serde_json::{json, Value};
use solana_sdk::{clock::Slot, pubkey::Pubkey, signature::Signature};

use crate::addresses::PoolAddresses;
use crate::amount::format_token_amount;
use crate::instructions::DepositInstruction;
use crate::reader::{BalanceRead, UnavailableReason};
use crate::submitter::Confirmation;

/// Balances of the depositor's three accounts at one point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceSet {
    pub token_a: BalanceRead,
    pub token_b: BalanceRead,
    pub shares:  BalanceRead,
}

/// `post - pre` for one account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delta {
    Known(i128),
    Unknown(String),
}

impl Delta {
    pub fn between(pre: &BalanceRead, post: &BalanceRead) -> Self {
        let before = match pre {
            BalanceRead::Observed(s) => s.amount as i128,
            // The node answered that the account did not exist yet: that is a
            // real zero, not a failed read.
            BalanceRead::Unavailable { reason: UnavailableReason::AccountNotFound { .. }, .. } => 0,
            BalanceRead::Unavailable { reason, .. } => {
                return Delta::Unknown(format!("pre-deposit balance unavailable: {reason}"));
            }
        };
        match post {
            BalanceRead::Observed(s) => Delta::Known(s.amount as i128 - before),
            BalanceRead::Unavailable { reason, .. } => {
                Delta::Unknown(format!("post-deposit balance unavailable: {reason}"))
            }
        }
    }

    pub fn value(&self) -> Option<i128> {
        match self {
            Delta::Known(v) => Some(*v),
            Delta::Unknown(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetChange {
    pub account: Pubkey,
    pub mint:    Pubkey,
    pub pre:     BalanceRead,
    pub post:    BalanceRead,
    pub delta:   Delta,
}

impl AssetChange {
    fn new(mint: Pubkey, pre: BalanceRead, post: BalanceRead) -> Self {
        let delta = Delta::between(&pre, &post);
        Self { account: pre.account(), mint, pre, post, delta }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepositReport {
    pub signature: Signature,
    pub slot:      Slot,
    pub pool:      Pubkey,
    pub requested: DepositInstruction,
    pub decimals:  u8,
    pub asset_a:   AssetChange,
    pub asset_b:   AssetChange,
    pub shares:    AssetChange,
}

impl DepositReport {
    pub fn reconcile(
        requested:    DepositInstruction,
        pool:         &PoolAddresses,
        pre:          BalanceSet,
        post:         BalanceSet,
        confirmation: Confirmation,
        decimals:     u8,
    ) -> Self {
        Self {
            signature: confirmation.signature,
            slot:      confirmation.slot,
            pool:      pool.pool,
            requested,
            decimals,
            asset_a:   AssetChange::new(pool.mint_a, pre.token_a, post.token_a),
            asset_b:   AssetChange::new(pool.mint_b, pre.token_b, post.token_b),
            shares:    AssetChange::new(pool.share_mint, pre.shares, post.shares),
        }
    }

    /// Token A taken from the depositor (`-delta`).
    pub fn consumed_a(&self) -> Option<i128> {
        self.asset_a.delta.value().map(|d| -d)
    }

    /// Token B taken from the depositor (`-delta`).
    pub fn consumed_b(&self) -> Option<i128> {
        self.asset_b.delta.value().map(|d| -d)
    }

    /// Pool shares credited to the depositor.
    pub fn shares_received(&self) -> Option<i128> {
        self.shares.delta.value()
    }

    /// Combined raw amount of A and B handed to the pool.
    pub fn total_value_locked(&self) -> Option<i128> {
        Some(self.consumed_a()? + self.consumed_b()?)
    }

    /// Observations that do not match a clean deposit.
    pub fn warnings(&self) -> Vec<String> {
        let mut out = Vec::new();
        for (label, change, requested) in [
            ("Token A", &self.asset_a, self.requested.amount_a),
            ("Token B", &self.asset_b, self.requested.amount_b),
        ] {
            match change.delta.value() {
                None => {
                    if let Delta::Unknown(reason) = &change.delta {
                        out.push(format!("{label} change unknown: {reason}"));
                    }
                }
                Some(delta) if delta > 0 => {
                    out.push(format!("{label} balance increased by {delta} during the deposit"));
                }
                Some(delta) if -delta != requested as i128 => {
                    out.push(format!("{label} consumed {}, requested {requested}", -delta));
                }
                Some(_) => {}
            }
        }
        match &self.shares.delta {
            Delta::Unknown(reason) => out.push(format!("Share change unknown: {reason}")),
            Delta::Known(d) if *d <= 0 => out.push(format!("No pool shares received (delta {d})")),
            Delta::Known(_) => {}
        }
        out
    }

    pub fn to_json(&self) -> Value {
        json!({
            "status":               "ok",
            "command":              "deposit",
            "pool":                 self.pool.to_string(),
            "tx":                   self.signature.to_string(),
            "slot":                 self.slot,
            "requested_a":          self.requested.amount_a,
            "requested_b":          self.requested.amount_b,
            "token_a":              change_json(&self.asset_a, self.decimals),
            "token_b":              change_json(&self.asset_b, self.decimals),
            "shares":               change_json(&self.shares, self.decimals),
            "consumed_a":           self.consumed_a().map(|v| v.to_string()),
            "consumed_b":           self.consumed_b().map(|v| v.to_string()),
            "shares_received":      self.shares_received().map(|v| v.to_string()),
            "total_value_locked":   self.total_value_locked().map(|v| v.to_string()),
            "warnings":             self.warnings(),
        })
    }
}

fn change_json(change: &AssetChange, decimals: u8) -> Value {
    json!({
        "account": change.account.to_string(),
        "mint":    change.mint.to_string(),
        "pre":     read_json(&change.pre),
        "post":    read_json(&change.post),
        "delta":   match &change.delta {
            Delta::Known(v) => json!({
                "raw":       v.to_string(),
                "formatted": format_token_amount(*v, decimals),
            }),
            Delta::Unknown(reason) => json!({ "unknown": reason }),
        },
    })
}

fn read_json(read: &BalanceRead) -> Value {
    match read {
        BalanceRead::Observed(s) => json!({ "amount": s.amount, "slot": s.slot }),
        BalanceRead::Unavailable { attempts, reason, .. } => json!({
            "unavailable": reason.to_string(),
            "attempts":    attempts,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::BalanceSnapshot;

    fn observed(account: Pubkey, amount: u64) -> BalanceRead {
        BalanceRead::Observed(BalanceSnapshot { account, amount, slot: 10 })
    }

    fn failed(account: Pubkey) -> BalanceRead {
        BalanceRead::Unavailable {
            account,
            attempts: 3,
            reason: UnavailableReason::Failed("rpc down".into()),
        }
    }

    fn missing(account: Pubkey) -> BalanceRead {
        BalanceRead::Unavailable {
            account,
            attempts: 3,
            reason: UnavailableReason::AccountNotFound { slot: 9 },
        }
    }

    fn pool() -> PoolAddresses {
        PoolAddresses {
            pool:       Pubkey::new_unique(),
            bump:       254,
            mint_a:     Pubkey::new_unique(),
            mint_b:     Pubkey::new_unique(),
            vault_a:    Pubkey::new_unique(),
            vault_b:    Pubkey::new_unique(),
            share_mint: Pubkey::new_unique(),
        }
    }

    fn report(pre: BalanceSet, post: BalanceSet) -> DepositReport {
        DepositReport::reconcile(
            DepositInstruction { amount_a: 500_000_000, amount_b: 500_000_000 },
            &pool(),
            pre,
            post,
            Confirmation { signature: Signature::default(), slot: 11 },
            9,
        )
    }

    #[test]
    fn test_clean_deposit() {
        let (a, b, s) = (Pubkey::new_unique(), Pubkey::new_unique(), Pubkey::new_unique());
        let r = report(
            BalanceSet { token_a: observed(a, 2_000_000_000), token_b: observed(b, 1_000_000_000), shares: observed(s, 0) },
            BalanceSet { token_a: observed(a, 1_500_000_000), token_b: observed(b, 500_000_000), shares: observed(s, 499_999_000) },
        );
        assert_eq!(r.consumed_a(), Some(500_000_000));
        assert_eq!(r.consumed_b(), Some(500_000_000));
        assert_eq!(r.shares_received(), Some(499_999_000));
        assert_eq!(r.total_value_locked(), Some(1_000_000_000));
        assert!(r.warnings().is_empty());
        assert_eq!(r.asset_a.account, a);
    }

    #[test]
    fn test_failed_pre_read_is_unknown_not_zero() {
        let (a, b, s) = (Pubkey::new_unique(), Pubkey::new_unique(), Pubkey::new_unique());
        let r = report(
            BalanceSet { token_a: failed(a), token_b: observed(b, 900), shares: observed(s, 0) },
            BalanceSet { token_a: observed(a, 100), token_b: observed(b, 400), shares: observed(s, 1) },
        );
        assert_eq!(r.consumed_a(), None);
        assert_eq!(r.total_value_locked(), None);
        let warnings = r.warnings();
        assert!(warnings.iter().any(|w| w.starts_with("Token A change unknown")));
    }

    #[test]
    fn test_missing_share_account_before_counts_as_zero() {
        let (a, b, s) = (Pubkey::new_unique(), Pubkey::new_unique(), Pubkey::new_unique());
        let r = report(
            BalanceSet { token_a: observed(a, 500_000_000), token_b: observed(b, 500_000_000), shares: missing(s) },
            BalanceSet { token_a: observed(a, 0), token_b: observed(b, 0), shares: observed(s, 77) },
        );
        assert_eq!(r.shares_received(), Some(77));
        assert!(r.warnings().is_empty());
    }

    #[test]
    fn test_missing_after_deposit_is_unknown() {
        let s = Pubkey::new_unique();
        assert!(matches!(Delta::between(&observed(s, 5), &missing(s)), Delta::Unknown(_)));
    }

    #[test]
    fn test_warnings_for_odd_movements() {
        let (a, b, s) = (Pubkey::new_unique(), Pubkey::new_unique(), Pubkey::new_unique());
        let r = report(
            BalanceSet { token_a: observed(a, 1_000_000_000), token_b: observed(b, 100), shares: observed(s, 50) },
            BalanceSet { token_a: observed(a, 600_000_000), token_b: observed(b, 200), shares: observed(s, 50) },
        );
        let warnings = r.warnings();
        assert_eq!(warnings.len(), 3);
        assert!(warnings[0].contains("consumed 400000000, requested 500000000"));
        assert!(warnings[1].contains("increased by 100"));
        assert!(warnings[2].starts_with("No pool shares received"));
    }

    #[test]
    fn test_json_shape() {
        let (a, b, s) = (Pubkey::new_unique(), Pubkey::new_unique(), Pubkey::new_unique());
        let r = report(
            BalanceSet { token_a: observed(a, 500_000_000), token_b: failed(b), shares: observed(s, 0) },
            BalanceSet { token_a: observed(a, 0), token_b: observed(b, 0), shares: observed(s, 9) },
        );
        let v = r.to_json();
        assert_eq!(v["consumed_a"], "500000000");
        assert!(v["consumed_b"].is_null());
        assert_eq!(v["token_a"]["delta"]["formatted"], "-0.500000");
        assert_eq!(v["token_b"]["pre"]["unavailable"], "rpc down");
        assert_eq!(v["shares_received"], "9");
    }
}
