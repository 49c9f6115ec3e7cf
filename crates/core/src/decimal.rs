//! Decimal rendering with leading-zero suppression and backpressure.
//!
//! `DecimalRenderer` walks the ten magnitudes from 10^9 down to 10^0, one
//! magnitude per tick, extracting each digit with the comparison ladder in
//! [`crate::digits`] and threading the remainder forward. A digit is emitted
//! as ASCII once a non-zero digit has been seen; the units digit is always
//! emitted, so 0 renders as `"0"` and nothing renders as the empty string.
//!
//! When the output queue is not writable the renderer holds its position and
//! emits nothing; the same digit is retried on the next tick.

use crate::digits::{self, MAX_DECIMAL, MAX_MAGNITUDE};
use crate::error::{CommandError, Result};
use crate::queue::FlowQueue;

/// Result of one renderer tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStep {
    /// Output was full; nothing happened
    Stalled,
    /// A magnitude was consumed; `emitted` if it produced a digit
    Progressed { emitted: bool },
    /// The units digit was emitted; the renderer is finished
    Finished,
}

/// Ten-magnitude decimal renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecimalRenderer {
    /// Magnitude to extract next; `None` once finished
    magnitude: Option<u8>,
    /// Value still to be rendered below the previous magnitude
    remaining: u64,
    /// A non-zero digit has been emitted
    significant: bool,
}

impl DecimalRenderer {
    /// Start rendering `value`.
    ///
    /// # Errors
    /// `CommandError::DecimalRange` if `value` has more than ten digits.
    pub fn new(value: u64) -> Result<Self> {
        if value > MAX_DECIMAL {
            return Err(CommandError::DecimalRange {
                value,
                max: MAX_DECIMAL,
            }
            .into());
        }
        Ok(Self {
            magnitude: Some(MAX_MAGNITUDE),
            remaining: value,
            significant: false,
        })
    }

    /// Whether the units digit has been emitted.
    pub fn is_finished(&self) -> bool {
        self.magnitude.is_none()
    }

    /// Advance by one magnitude if `out` can take a byte.
    pub fn tick(&mut self, out: &mut FlowQueue<u8>) -> RenderStep {
        let Some(magnitude) = self.magnitude else {
            return RenderStep::Finished;
        };
        if !out.writable() {
            return RenderStep::Stalled;
        }

        let (digit, remainder) = digits::extract(magnitude, self.remaining);
        let emitted = digit > 0 || self.significant || magnitude == 0;
        if emitted {
            // Writability checked above, the push cannot be rejected
            if out.push(b'0' + digit).is_err() {
                return RenderStep::Stalled;
            }
            self.significant = true;
        }
        self.remaining = remainder;

        if magnitude == 0 {
            self.magnitude = None;
            RenderStep::Finished
        } else {
            self.magnitude = Some(magnitude - 1);
            RenderStep::Progressed { emitted }
        }
    }
}

/// Render `value` straight to a byte vector, without tick semantics.
///
/// Used by the reference decoder's tests and by callers that only want the
/// text the renderer would produce.
///
/// # Errors
/// `CommandError::DecimalRange` if `value` has more than ten digits.
pub fn render_to_vec(value: u64) -> Result<Vec<u8>> {
    let mut renderer = DecimalRenderer::new(value)?;
    let mut out = FlowQueue::new(1);
    let mut bytes = Vec::with_capacity(digits::DIGIT_COUNT);
    loop {
        let step = renderer.tick(&mut out);
        out.commit();
        if let Ok(byte) = out.pop() {
            bytes.push(byte);
        }
        out.commit();
        if step == RenderStep::Finished {
            return Ok(bytes);
        }
    }
}
