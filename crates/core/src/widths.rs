//! Fixed bit widths shared by the trajectory engine and the search loop.
//!
//! Two widths size the whole search:
//! - `value_bits` (W): width of every trial value and trajectory element
//! - `step_bits` (C): width of the step counter, and log2 of the trace size
//!
//! The pair must be chosen together: C bits have to cover the longest
//! trajectory of any W-bit value, and W bits must leave the two headroom bits
//! the odd step checks for. A value that would need more is reported as an
//! overflow or exhaustion outcome, never grown.

use crate::digits::MAX_DECIMAL;
use crate::error::{ConfigError, Result};

/// Smallest supported value width: two headroom bits plus one data bit.
pub const MIN_VALUE_BITS: u32 = 3;

/// Largest supported value width (values are carried in `u64`).
pub const MAX_VALUE_BITS: u32 = 64;

/// Smallest supported step counter width.
pub const MIN_STEP_BITS: u32 = 2;

/// Largest supported step counter width (bounds the trace arena at 1M slots).
pub const MAX_STEP_BITS: u32 = 20;

/// Value width of the reference configuration: enough for 9,999,999,999.
pub const DEFAULT_VALUE_BITS: u32 = 34;

/// Step counter width of the reference configuration.
pub const DEFAULT_STEP_BITS: u32 = 12;

/// Validated value and step-counter widths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Widths {
    value_bits: u32,
    step_bits: u32,
}

impl Widths {
    /// Validate a width pair.
    ///
    /// # Errors
    /// - `ConfigError::ValueBits` if `value_bits` is outside `3..=64`
    /// - `ConfigError::StepBits` if `step_bits` is outside `2..=20`
    pub fn new(value_bits: u32, step_bits: u32) -> Result<Self> {
        if !(MIN_VALUE_BITS..=MAX_VALUE_BITS).contains(&value_bits) {
            return Err(ConfigError::ValueBits {
                bits: value_bits,
                min: MIN_VALUE_BITS,
                max: MAX_VALUE_BITS,
            }
            .into());
        }

        if !(MIN_STEP_BITS..=MAX_STEP_BITS).contains(&step_bits) {
            return Err(ConfigError::StepBits {
                bits: step_bits,
                min: MIN_STEP_BITS,
                max: MAX_STEP_BITS,
            }
            .into());
        }

        Ok(Self {
            value_bits,
            step_bits,
        })
    }

    /// Value width W in bits.
    pub fn value_bits(&self) -> u32 {
        self.value_bits
    }

    /// Step counter width C in bits.
    pub fn step_bits(&self) -> u32 {
        self.step_bits
    }

    /// All-ones mask of the value width.
    pub fn value_mask(&self) -> u64 {
        u64::MAX >> (64 - self.value_bits)
    }

    /// Largest trial the search loads before wrapping back to 1.
    ///
    /// Bounded by both the value register and the ten-digit decimal range.
    pub fn trial_limit(&self) -> u64 {
        self.value_mask().min(MAX_DECIMAL)
    }

    /// The two most significant bits of a W-bit value.
    ///
    /// An odd value may only be stepped when both are clear.
    pub fn headroom_mask(&self) -> u64 {
        0b11 << (self.value_bits - 2)
    }

    /// Largest value the step counter can hold, `2^C - 1`.
    pub fn max_steps(&self) -> u32 {
        (1 << self.step_bits) - 1
    }

    /// Step count at which a run is declared exhausted, `2^C - 2`.
    pub fn step_budget(&self) -> u32 {
        (1 << self.step_bits) - 2
    }

    /// Number of slots in the trajectory trace, `2^C`.
    pub fn trace_len(&self) -> usize {
        1 << self.step_bits
    }
}

impl Default for Widths {
    fn default() -> Self {
        Self {
            value_bits: DEFAULT_VALUE_BITS,
            step_bits: DEFAULT_STEP_BITS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_default_widths() {
        let widths = Widths::default();
        assert_eq!(widths.value_bits(), 34);
        assert_eq!(widths.step_bits(), 12);
        assert!(widths.value_mask() >= 9_999_999_999);
        assert_eq!(widths.step_budget(), 4094);
        assert_eq!(widths.trace_len(), 4096);
    }

    #[test]
    fn test_masks() {
        let widths = Widths::new(13, 10).unwrap();
        assert_eq!(widths.value_mask(), 0x1FFF);
        assert_eq!(widths.headroom_mask(), 0b1_1000_0000_0000);
        assert_eq!(widths.max_steps(), 1023);
        assert_eq!(widths.step_budget(), 1022);
    }

    #[test]
    fn test_trial_limit() {
        assert_eq!(Widths::default().trial_limit(), 9_999_999_999);
        assert_eq!(Widths::new(13, 12).unwrap().trial_limit(), 8191);
        assert_eq!(Widths::new(64, 20).unwrap().trial_limit(), 9_999_999_999);
    }

    #[test]
    fn test_full_width_mask() {
        let widths = Widths::new(64, 20).unwrap();
        assert_eq!(widths.value_mask(), u64::MAX);
        assert_eq!(widths.headroom_mask(), 0xC000_0000_0000_0000);
    }

    #[test]
    fn test_rejects_out_of_range() {
        assert!(matches!(
            Widths::new(2, 10),
            Err(Error::Config(ConfigError::ValueBits { bits: 2, .. }))
        ));
        assert!(matches!(
            Widths::new(65, 10),
            Err(Error::Config(ConfigError::ValueBits { bits: 65, .. }))
        ));
        assert!(matches!(
            Widths::new(34, 1),
            Err(Error::Config(ConfigError::StepBits { bits: 1, .. }))
        ));
        assert!(matches!(
            Widths::new(34, 21),
            Err(Error::Config(ConfigError::StepBits { bits: 21, .. }))
        ));
    }
}
