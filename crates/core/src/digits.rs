//! Decimal digit extraction by comparison ladder.
//!
//! A digit at magnitude `10^i` is found without division: the value is
//! compared against the nine multiples `9·10^i, 8·10^i, ..., 1·10^i` from the
//! top down, and the first multiple not exceeding the value names the digit.
//! Subtracting that multiple leaves the remainder for the next magnitude.
//!
//! # Example
//! ```
//! use collatz_sim_core::digits::extract;
//!
//! assert_eq!(extract(9, 9_111_222_333), (9, 111_222_333));
//! assert_eq!(extract(2, 300), (3, 0));
//! assert_eq!(extract(2, 99), (0, 99));
//! ```

/// Highest magnitude index (10^9, the billions digit).
pub const MAX_MAGNITUDE: u8 = 9;

/// Number of decimal positions a rendered value can have.
pub const DIGIT_COUNT: usize = MAX_MAGNITUDE as usize + 1;

/// Largest value with at most `DIGIT_COUNT` decimal digits.
pub const MAX_DECIMAL: u64 = 9_999_999_999;

/// Multiples `[1·10^i, 2·10^i, ..., 9·10^i]` for every magnitude index `i`.
const MAGNITUDE_TABLE: [[u64; 9]; DIGIT_COUNT] = build_table();

const fn build_table() -> [[u64; 9]; DIGIT_COUNT] {
    let mut table = [[0u64; 9]; DIGIT_COUNT];
    let mut magnitude = 0;
    let mut power = 1u64;
    while magnitude < DIGIT_COUNT {
        let mut k = 0;
        while k < 9 {
            table[magnitude][k] = (k as u64 + 1) * power;
            k += 1;
        }
        power *= 10;
        magnitude += 1;
    }
    table
}

/// Return the nine scaled multiples `[m1..m9]` with `mk = k · 10^magnitude`.
///
/// The caller keeps `magnitude` within `0..=9`.
pub fn multiples(magnitude: u8) -> &'static [u64; 9] {
    debug_assert!(magnitude <= MAX_MAGNITUDE);
    &MAGNITUDE_TABLE[magnitude as usize]
}

/// Extract the digit of `value` at `magnitude` and the remainder below it.
///
/// Scans `m9` down to `m1`; the first `mk <= value` gives
/// `(k, value - mk)`. When no multiple fits the digit is 0 and the value
/// passes through unchanged. A value equal to `mk` selects `k`.
///
/// For the digit to be meaningful `value` must be below `10^(magnitude+1)`,
/// which holds when magnitudes are visited from 9 down with the remainder
/// threaded forward and the start value is at most `MAX_DECIMAL`. Larger
/// values saturate at digit 9.
pub fn extract(magnitude: u8, value: u64) -> (u8, u64) {
    let table = multiples(magnitude);
    for k in (0..9).rev() {
        let mk = table[k];
        if mk <= value {
            return (k as u8 + 1, value - mk);
        }
    }
    (0, value)
}
