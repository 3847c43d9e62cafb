//! In-memory ledger that executes the deposit instruction the way the AMM
//! program does: all-or-nothing, with program logs on rejection.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use amm_deposit_sdk::{
    addresses::{DepositorAccounts, PoolAddresses},
    config::{DepositConfig, FileConfig, ProgramIds},
    error::{Error, Result},
    instructions::{DepositInstruction, DEPOSIT_ACCOUNT_COUNT},
    ledger::{AccountObservation, BalanceSource, Ledger, SignatureState},
    RetryPolicy,
};
use solana_sdk::{
    clock::Slot,
    hash::Hash,
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
    transaction::Transaction,
};

/// New balances and share supply, or the rejection reason and program logs.
type Outcome = std::result::Result<(HashMap<Pubkey, u64>, u64), (String, Vec<String>)>;

/// Reserves and share supply the pool starts with in every test.
pub const INITIAL_RESERVE: u64 = 10_000_000_000;

#[derive(Default)]
struct State {
    slot:                  Slot,
    balances:              HashMap<Pubkey, u64>,
    share_supply:          u64,
    read_failures:         HashMap<Pubkey, u32>,
    reads:                 HashMap<Pubkey, u32>,
    statuses:              HashMap<Signature, SignatureState>,
    logs:                  HashMap<Signature, Vec<String>>,
    sent:                  Vec<Transaction>,
    withhold_confirmation: bool,
    fail_after_preflight:  bool,
}

pub struct MockLedger {
    programs: ProgramIds,
    pool:     PoolAddresses,
    state:    Mutex<State>,
}

impl MockLedger {
    pub fn new(programs: ProgramIds, pool: PoolAddresses) -> Self {
        let mut state = State { slot: 1_000, share_supply: INITIAL_RESERVE, ..State::default() };
        state.balances.insert(pool.vault_a, INITIAL_RESERVE);
        state.balances.insert(pool.vault_b, INITIAL_RESERVE);
        Self { programs, pool, state: Mutex::new(state) }
    }

    pub fn set_balance(&self, account: Pubkey, amount: u64) {
        self.state.lock().unwrap().balances.insert(account, amount);
    }

    pub fn balance(&self, account: &Pubkey) -> Option<u64> {
        self.state.lock().unwrap().balances.get(account).copied()
    }

    /// Make the next `n` reads of `account` fail at the RPC level.
    pub fn fail_reads(&self, account: Pubkey, n: u32) {
        self.state.lock().unwrap().read_failures.insert(account, n);
    }

    pub fn reads(&self, account: &Pubkey) -> u32 {
        self.state.lock().unwrap().reads.get(account).copied().unwrap_or(0)
    }

    pub fn withhold_confirmation(&self) {
        self.state.lock().unwrap().withhold_confirmation = true;
    }

    /// Skip preflight: failing transactions land with an error status.
    pub fn fail_after_preflight(&self) {
        self.state.lock().unwrap().fail_after_preflight = true;
    }

    pub fn sent(&self) -> Vec<Transaction> {
        self.state.lock().unwrap().sent.clone()
    }

    pub fn slot(&self) -> Slot {
        self.state.lock().unwrap().slot
    }

    /// Run every instruction against a copy of the balances; commit only if
    /// all of them succeed.
    fn execute(&self, state: &State, tx: &Transaction) -> Outcome {
        let amm = self.programs.amm;
        let mut balances = state.balances.clone();
        let mut supply = state.share_supply;
        let keys = &tx.message.account_keys;

        if tx.verify().is_err() {
            return Err(("Transaction signature verification failure".into(), vec![]));
        }

        for (n, ix) in tx.message.instructions.iter().enumerate() {
            let program = keys[ix.program_id_index as usize];
            let key = |i: usize| keys[ix.accounts[i] as usize];

            if program == self.programs.associated_token {
                balances.entry(key(1)).or_insert(0);
                continue;
            }
            if program != amm {
                return Err((format!("Error processing Instruction {n}: unknown program"), vec![]));
            }

            let mut logs = vec![
                format!("Program {amm} invoke [1]"),
                "Program log: Instruction: AddLiquidity".to_string(),
            ];
            let fail = |mut logs: Vec<String>, msg: &str, code: u32| -> Outcome {
                logs.push(format!("Program log: Error: {msg}"));
                logs.push(format!("Program {amm} consumed 5120 of 200000 compute units"));
                logs.push(format!("Program {amm} failed: custom program error: {code:#x}"));
                Err((
                    format!("Error processing Instruction {n}: custom program error: {code:#x}"),
                    logs,
                ))
            };

            let Ok(amounts) = DepositInstruction::decode(&ix.data) else {
                return fail(logs, "invalid instruction data", 0);
            };
            if ix.accounts.len() != DEPOSIT_ACCOUNT_COUNT
                || key(0) != self.pool.pool
                || key(3) != self.pool.vault_a
                || key(4) != self.pool.vault_b
                || key(5) != self.pool.share_mint
                || !tx.message.is_signer(ix.accounts[9] as usize)
            {
                return fail(logs, "invalid account list", 2);
            }

            let (user_a, user_b, user_lp) = (key(6), key(7), key(8));
            let (Some(&bal_a), Some(&bal_b)) = (balances.get(&user_a), balances.get(&user_b)) else {
                return fail(logs, "token account not initialized", 3);
            };
            if !balances.contains_key(&user_lp) {
                return fail(logs, "token account not initialized", 3);
            }
            if bal_a < amounts.amount_a || bal_b < amounts.amount_b {
                logs.push("Program log: Instruction: Transfer".to_string());
                return fail(logs, "insufficient funds", 1);
            }

            let reserve_a = balances[&self.pool.vault_a] as u128;
            let reserve_b = balances[&self.pool.vault_b] as u128;
            let minted = ((amounts.amount_a as u128 * supply as u128 / reserve_a)
                .min(amounts.amount_b as u128 * supply as u128 / reserve_b)) as u64;

            *balances.get_mut(&user_a).unwrap() -= amounts.amount_a;
            *balances.get_mut(&user_b).unwrap() -= amounts.amount_b;
            *balances.get_mut(&self.pool.vault_a).unwrap() += amounts.amount_a;
            *balances.get_mut(&self.pool.vault_b).unwrap() += amounts.amount_b;
            *balances.get_mut(&user_lp).unwrap() += minted;
            supply += minted;
        }
        Ok((balances, supply))
    }
}

impl BalanceSource for MockLedger {
    async fn token_amount(&self, account: &Pubkey, min_context_slot: Option<Slot>) -> Result<AccountObservation> {
        let mut state = self.state.lock().unwrap();
        *state.reads.entry(*account).or_insert(0) += 1;
        if let Some(left) = state.read_failures.get_mut(account) {
            if *left > 0 {
                *left -= 1;
                return Err(Error::InvalidArgument("simulated RPC failure".into()));
            }
        }
        if let Some(min) = min_context_slot {
            if state.slot < min {
                return Err(Error::InvalidArgument("Minimum context slot has not been reached".into()));
            }
        }
        Ok(AccountObservation { slot: state.slot, amount: state.balances.get(account).copied() })
    }
}

impl Ledger for MockLedger {
    async fn latest_blockhash(&self) -> Result<Hash> {
        Ok(Hash::new_unique())
    }

    async fn send_transaction(&self, tx: &Transaction) -> Result<Signature> {
        let mut state = self.state.lock().unwrap();
        let signature = tx.signatures[0];
        state.sent.push(tx.clone());

        match self.execute(&state, tx) {
            Ok((balances, supply)) => {
                state.slot += 1;
                state.balances = balances;
                state.share_supply = supply;
                let slot = state.slot;
                state.statuses.insert(signature, SignatureState { slot, err: None });
                state.logs.insert(signature, vec![format!("Program {} success", self.programs.amm)]);
                Ok(signature)
            }
            Err((reason, logs)) if state.fail_after_preflight => {
                state.slot += 1;
                let slot = state.slot;
                state.statuses.insert(signature, SignatureState { slot, err: Some(reason) });
                state.logs.insert(signature, logs);
                Ok(signature)
            }
            Err((reason, logs)) => Err(Error::Rejected { signature: None, reason, logs }),
        }
    }

    async fn signature_state(&self, signature: &Signature) -> Result<Option<SignatureState>> {
        let state = self.state.lock().unwrap();
        if state.withhold_confirmation {
            return Ok(None);
        }
        Ok(state.statuses.get(signature).cloned())
    }

    async fn transaction_logs(&self, signature: &Signature) -> Result<Vec<String>> {
        Ok(self.state.lock().unwrap().logs.get(signature).cloned().unwrap_or_default())
    }
}

// ─── Fixtures ─────────────────────────────────────────────────────────────────

/// The B-C pool preset with test-speed timings.
pub fn config() -> DepositConfig {
    let mut config = DepositConfig::try_from(FileConfig::gorbchain_pool2()).unwrap();
    config.retry = RetryPolicy { attempts: 3, delay: Duration::ZERO };
    config.poll_interval = Duration::from_millis(1);
    config.confirm_timeout = Duration::from_secs(5);
    config
}

pub struct Harness {
    pub config:    DepositConfig,
    pub depositor: Keypair,
    pub pool:      PoolAddresses,
    pub accounts:  DepositorAccounts,
}

/// A depositor holding `a` of token A, `b` of token B, and an empty share account.
pub fn harness(config: DepositConfig, a: u64, b: u64) -> (Harness, MockLedger) {
    let depositor = Keypair::new();
    let pool = PoolAddresses::derive(&config.programs, &config.pool);
    let accounts = DepositorAccounts::derive(&depositor.pubkey(), &pool, &config.programs);
    let ledger = MockLedger::new(config.programs, pool);
    ledger.set_balance(accounts.token_a, a);
    ledger.set_balance(accounts.token_b, b);
    ledger.set_balance(accounts.shares, 0);
    (Harness { config, depositor, pool, accounts }, ledger)
}
