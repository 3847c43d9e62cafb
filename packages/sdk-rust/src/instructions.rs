//! Low-level instruction builders.
//!
//! The deposit payload is a fixed binary contract with the AMM program:
//!
//! ```text
//! discriminator(1) = 1   amount_a(8, LE)   amount_b(8, LE)   = 17 bytes
//! ```
//!
//! Account order and mutability are part of that contract as well; any
//! mismatch makes the program reject the whole transaction.

use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
};

use crate::addresses::{DepositorAccounts, PoolAddresses};
use crate::error::{Error, Result};

/// System program, hardcoded to avoid the deprecated `solana_sdk::system_program`
pub const SYSTEM_PROGRAM_ID: Pubkey = Pubkey::new_from_array([0u8; 32]);

/// "Deposit liquidity" discriminator in the AMM program's instruction enum.
pub const DEPOSIT_DISCRIMINATOR: u8 = 1;
/// Encoded deposit payload length.
pub const DEPOSIT_DATA_LEN: usize = 1 + 8 + 8;
/// Number of accounts the deposit instruction expects.
pub const DEPOSIT_ACCOUNT_COUNT: usize = 11;

/// `CreateIdempotent` in the associated token account program.
const ATA_CREATE_IDEMPOTENT: u8 = 1;

// ─── Deposit payload ──────────────────────────────────────────────────────────

/// Amounts for a single deposit, in each asset's smallest unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepositInstruction {
    pub amount_a: u64,
    pub amount_b: u64,
}

impl DepositInstruction {
    pub fn encode(&self) -> [u8; DEPOSIT_DATA_LEN] {
        let mut data = [0u8; DEPOSIT_DATA_LEN];
        data[0] = DEPOSIT_DISCRIMINATOR;
        data[1..9].copy_from_slice(&self.amount_a.to_le_bytes());
        data[9..17].copy_from_slice(&self.amount_b.to_le_bytes());
        data
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() != DEPOSIT_DATA_LEN {
            return Err(Error::ParseError {
                offset: 0,
                reason: format!(
                    "deposit payload is {} bytes; expected {DEPOSIT_DATA_LEN}",
                    data.len()
                ),
            });
        }
        if data[0] != DEPOSIT_DISCRIMINATOR {
            return Err(Error::ParseError {
                offset: 0,
                reason: format!("discriminator {} is not a deposit", data[0]),
            });
        }
        Ok(Self {
            amount_a: crate::state::read_u64(data, 1)?,
            amount_b: crate::state::read_u64(data, 9)?,
        })
    }
}

// ─── deposit ──────────────────────────────────────────────────────────────────

/// Build the deposit instruction.
///
/// `depositor` signs but is not written to: fees are charged to the
/// transaction's payer, not through this instruction.
pub fn deposit_ix(
    program_id:    &Pubkey,
    token_program: &Pubkey,
    pool:          &PoolAddresses,
    depositor:     &DepositorAccounts,
    amounts:       DepositInstruction,
) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(pool.pool,                 false),  // mut
            AccountMeta::new_readonly(pool.mint_a,      false),
            AccountMeta::new_readonly(pool.mint_b,      false),
            AccountMeta::new(pool.vault_a,              false),  // mut
            AccountMeta::new(pool.vault_b,              false),  // mut
            AccountMeta::new(pool.share_mint,           false),  // mut (mint_to)
            AccountMeta::new(depositor.token_a,         false),  // mut
            AccountMeta::new(depositor.token_b,         false),  // mut
            AccountMeta::new(depositor.shares,          false),  // mut
            AccountMeta::new_readonly(depositor.owner,  true),   // signer
            AccountMeta::new_readonly(*token_program,   false),
        ],
        data: amounts.encode().to_vec(),
    }
}

// ─── associated token account ─────────────────────────────────────────────────

/// Build an idempotent create for `owner`'s associated account of `mint`.
/// A no-op on-chain when the account already exists.
pub fn create_associated_token_account_idempotent_ix(
    payer:         &Pubkey,
    owner:         &Pubkey,
    mint:          &Pubkey,
    token_program: &Pubkey,
    ata_program:   &Pubkey,
) -> Instruction {
    let ata = crate::addresses::derive_associated_token_account(owner, mint, token_program, ata_program);
    Instruction {
        program_id: *ata_program,
        accounts: vec![
            AccountMeta::new(*payer,                    true),   // mut + signer
            AccountMeta::new(ata,                       false),  // mut (init)
            AccountMeta::new_readonly(*owner,           false),
            AccountMeta::new_readonly(*mint,            false),
            AccountMeta::new_readonly(SYSTEM_PROGRAM_ID, false),
            AccountMeta::new_readonly(*token_program,   false),
        ],
        data: vec![ATA_CREATE_IDEMPOTENT],
    }
}
