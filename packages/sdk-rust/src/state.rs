//! On-chain account deserialization.
//!
//! The client only ever needs the `amount` field of an SPL token account; the
//! pool's own state is owned and interpreted by the AMM program.

use crate::error::{Error, Result};

/// Packed SPL token account length.
pub const TOKEN_ACCOUNT_LEN: usize = 165;

/// Offset of `amount` in a packed token account: `mint(32) owner(32) amount(8) …`
const AMOUNT_OFFSET: usize = 64;

// ─── SPL token account ────────────────────────────────────────────────────────

/// Read the `amount` field from a packed SPL token account.
pub fn parse_token_amount(data: &[u8]) -> Result<u64> {
    if data.len() < AMOUNT_OFFSET + 8 {
        return Err(Error::ParseError {
            offset: AMOUNT_OFFSET,
            reason: format!("Token account is {} bytes; need at least 72", data.len()),
        });
    }
    read_u64(data, AMOUNT_OFFSET)
}

// ─── Byte-slice primitives ────────────────────────────────────────────────────

pub(crate) fn read_u64(data: &[u8], offset: usize) -> Result<u64> {
    let b: [u8; 8] = data
        .get(offset..offset + 8)
        .and_then(|s| s.try_into().ok())
        .ok_or_else(|| Error::ParseError { offset, reason: "slice too short for u64".into() })?;
    Ok(u64::from_le_bytes(b))
}
