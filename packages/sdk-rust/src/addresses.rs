//! Deterministic address derivation.
//!
//! Nothing here touches the network: every address is a pure function of
//! seeds and program identifiers.

use solana_sdk::pubkey::Pubkey;

use crate::config::{PoolConfig, ProgramIds};

// ─── PDA seeds ────────────────────────────────────────────────────────────────

pub const POOL_SEED: &[u8] = b"pool";

// ─── PDA derivation helpers ───────────────────────────────────────────────────

/// Derive the pool PDA for an ordered mint pair.
///
/// The order is significant: `(a, b)` and `(b, a)` are different pools.
pub fn derive_pool(program_id: &Pubkey, mint_a: &Pubkey, mint_b: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[POOL_SEED, mint_a.as_ref(), mint_b.as_ref()],
        program_id,
    )
}

/// Derive the associated token account holding `owner`'s balance of `mint`.
pub fn derive_associated_token_account(
    owner:         &Pubkey,
    mint:          &Pubkey,
    token_program: &Pubkey,
    ata_program:   &Pubkey,
) -> Pubkey {
    Pubkey::find_program_address(
        &[owner.as_ref(), token_program.as_ref(), mint.as_ref()],
        ata_program,
    )
    .0
}

// ─── Address sets ─────────────────────────────────────────────────────────────

/// Every pool-side account the deposit instruction references.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolAddresses {
    pub pool:       Pubkey,
    pub bump:       u8,
    pub mint_a:     Pubkey,
    pub mint_b:     Pubkey,
    pub vault_a:    Pubkey,
    pub vault_b:    Pubkey,
    pub share_mint: Pubkey,
}

impl PoolAddresses {
    pub fn derive(programs: &ProgramIds, pool: &PoolConfig) -> Self {
        let (addr, bump) = derive_pool(&programs.amm, &pool.mint_a, &pool.mint_b);
        Self {
            pool:       addr,
            bump,
            mint_a:     pool.mint_a,
            mint_b:     pool.mint_b,
            vault_a:    pool.vault_a,
            vault_b:    pool.vault_b,
            share_mint: pool.share_mint,
        }
    }
}

/// The depositor's holding accounts for both pooled assets and the share token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepositorAccounts {
    pub owner:   Pubkey,
    pub token_a: Pubkey,
    pub token_b: Pubkey,
    pub shares:  Pubkey,
}

impl DepositorAccounts {
    pub fn derive(owner: &Pubkey, pool: &PoolAddresses, programs: &ProgramIds) -> Self {
        let ata = |mint: &Pubkey| {
            derive_associated_token_account(owner, mint, &programs.token, &programs.associated_token)
        };
        Self {
            owner:   *owner,
            token_a: ata(&pool.mint_a),
            token_b: ata(&pool.mint_b),
            shares:  ata(&pool.share_mint),
        }
    }

    /// `(account, mint)` pairs in reporting order: A, B, shares.
    pub fn with_mints(&self, pool: &PoolAddresses) -> [(Pubkey, Pubkey); 3] {
        [
            (self.token_a, pool.mint_a),
            (self.token_b, pool.mint_b),
            (self.shares, pool.share_mint),
        ]
    }
}
