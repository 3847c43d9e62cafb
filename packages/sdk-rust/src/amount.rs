//! Human-readable token amounts.

/// Fractional digits shown for every amount.
pub const DISPLAY_PLACES: u8 = 6;

/// Format a raw (possibly negative) amount scaled by `10^decimals`, truncated
/// to six fractional digits.  Integer arithmetic only, so large balances stay
/// exact.
pub fn format_token_amount(raw: i128, decimals: u8) -> String {
    let sign = if raw < 0 { "-" } else { "" };
    let abs = raw.unsigned_abs();
    let scale = 10u128.pow(decimals as u32);
    let whole = abs / scale;
    let frac = abs % scale;
    let shown = if decimals >= DISPLAY_PLACES {
        frac / 10u128.pow((decimals - DISPLAY_PLACES) as u32)
    } else {
        frac * 10u128.pow((DISPLAY_PLACES - decimals) as u32)
    };
    format!("{sign}{whole}.{shown:06}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nine_decimals() {
        assert_eq!(format_token_amount(500_000_000, 9), "0.500000");
        assert_eq!(format_token_amount(1_234_567_891, 9), "1.234567");
        assert_eq!(format_token_amount(0, 9), "0.000000");
    }

    #[test]
    fn test_negative() {
        assert_eq!(format_token_amount(-500_000_000, 9), "-0.500000");
        assert_eq!(format_token_amount(-2_000_000_000, 9), "-2.000000");
    }

    #[test]
    fn test_few_decimals() {
        assert_eq!(format_token_amount(12_345, 2), "123.450000");
        assert_eq!(format_token_amount(7, 0), "7.000000");
    }

    #[test]
    fn test_u64_max_is_exact() {
        assert_eq!(format_token_amount(u64::MAX as i128, 9), "18446744073.709551");
    }
}
