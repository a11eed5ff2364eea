//! Fixed-point pricing primitives.
//!
//! All prices are integers in micro-sats with [`PRICE_SCALE`] per whole
//! token; a price is read as the probability that the outcome settles to one
//! unit of collateral. YES and NO prices are complementary
//! (`yes + no == PRICE_SCALE`). The matching path never touches floating
//! point; the mid-price and slippage ratios below are the only rounding
//! sites and round half-to-even.

/// Micro-sats per whole outcome token.
pub const PRICE_SCALE: u64 = 1_000_000;

/// Tolerance on `buy.price + sell.price - PRICE_SCALE` when classifying a
/// matched pair as a mint or merge, in micro-sats.
pub const MINT_MERGE_EPSILON: u64 = 10_000;

/// Maximum bid/ask spread for which the mid-point is trusted as the market
/// price, in micro-sats. Wider books fall back to the last trade price.
pub const MID_SPREAD_THRESHOLD: u64 = 100_000;

/// The complementary price: `PRICE_SCALE - price`.
pub fn complement(price: u64) -> u64 {
    PRICE_SCALE.saturating_sub(price)
}

/// Integer division rounding half-to-even (banker's rounding).
pub fn div_round_half_even(numerator: u128, denominator: u128) -> u128 {
    debug_assert!(denominator > 0);
    let quotient = numerator / denominator;
    let remainder = numerator % denominator;
    let doubled = remainder.saturating_mul(2);
    if doubled > denominator || (doubled == denominator && quotient % 2 == 1) {
        quotient + 1
    } else {
        quotient
    }
}

/// Derive the YES-frame market price from the current book state.
///
/// When both a best bid and a best ask exist and the spread is within
/// [`MID_SPREAD_THRESHOLD`], the half-even-rounded mid-point wins; otherwise
/// the last trade price; otherwise the current price is kept. The result is
/// clamped into `[0, PRICE_SCALE]`.
pub fn mid_price(
    best_bid: Option<u64>,
    best_ask: Option<u64>,
    last_trade: Option<u64>,
    current: u64,
) -> u64 {
    let picked = match (best_bid, best_ask) {
        (Some(bid), Some(ask)) if ask.saturating_sub(bid) <= MID_SPREAD_THRESHOLD => {
            div_round_half_even(bid as u128 + ask as u128, 2) as u64
        }
        _ => last_trade.unwrap_or(current),
    };
    picked.min(PRICE_SCALE)
}

/// Slippage of an average execution price versus the best available price,
/// in basis points, rounded half-to-even.
pub fn slippage_bps(average_price: u64, best_price: u64) -> u64 {
    if best_price == 0 {
        return 0;
    }
    let diff = average_price.abs_diff(best_price) as u128;
    div_round_half_even(diff * 10_000, best_price as u128) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complement() {
        assert_eq!(complement(600_000), 400_000);
        assert_eq!(complement(0), PRICE_SCALE);
        assert_eq!(complement(PRICE_SCALE), 0);
    }

    #[test]
    fn test_div_round_half_even_exact_and_down() {
        assert_eq!(div_round_half_even(10, 2), 5);
        assert_eq!(div_round_half_even(10, 4), 2); // 2.5 rounds to even 2
        assert_eq!(div_round_half_even(14, 4), 4); // 3.5 rounds to even 4
        assert_eq!(div_round_half_even(11, 4), 3); // 2.75 rounds up
        assert_eq!(div_round_half_even(9, 4), 2); // 2.25 rounds down
    }

    #[test]
    fn test_mid_price_uses_midpoint_within_threshold() {
        let p = mid_price(Some(600_000), Some(660_000), Some(123), 500_000);
        assert_eq!(p, 630_000);
    }

    #[test]
    fn test_mid_price_midpoint_rounds_half_even() {
        // (3 + 6) / 2 = 4.5 rounds to 4
        assert_eq!(mid_price(Some(3), Some(6), None, 0), 4);
        // (5 + 6) / 2 = 5.5 rounds to 6
        assert_eq!(mid_price(Some(5), Some(6), None, 0), 6);
    }

    #[test]
    fn test_mid_price_wide_spread_falls_back_to_last_trade() {
        let p = mid_price(Some(100_000), Some(900_000), Some(660_000), 500_000);
        assert_eq!(p, 660_000);
    }

    #[test]
    fn test_mid_price_no_book_no_trade_keeps_current() {
        assert_eq!(mid_price(None, None, None, 420_000), 420_000);
        assert_eq!(mid_price(Some(1), None, None, 420_000), 420_000);
    }

    #[test]
    fn test_slippage_bps() {
        // 662_000 vs 650_000: 12_000 * 10_000 / 650_000 = 184.6... -> 185
        assert_eq!(slippage_bps(662_000, 650_000), 185);
        assert_eq!(slippage_bps(650_000, 650_000), 0);
        assert_eq!(slippage_bps(0, 0), 0);
    }
}
