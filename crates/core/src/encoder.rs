//! Protocol encoder: command records in, ASCII bytes out.
//!
//! The encoder is a state machine that sits between the command queue and
//! the outbound byte queue:
//!
//! ```text
//!            +-- Verbatim { index 0..4 } ------------------------------+
//!            |                                                         |
//! Ready -----+-- Decimal(DecimalRenderer) --------------> Space -------+--> Ready
//!            |                                             ^
//!            +-- Hex { group, High -> Low [-> Gap] } ------+
//! ```
//!
//! `Ready` dispatches one record per tick, only when a command is waiting
//! and the output queue has room. Every other state emits at most one byte
//! per tick and stalls in place while the output queue is full, so a
//! partially written command resumes at exactly the next byte.
//!
//! Records with an unknown tag are consumed and dropped, leaving the
//! encoder in `Ready`.

use crate::command::{Command, Tag};
use crate::decimal::{DecimalRenderer, RenderStep};
use crate::queue::FlowQueue;
use tracing::{trace, warn};

/// Position inside one hex byte group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HexCursor {
    /// High nibble of the group
    High,
    /// Low nibble of the group
    Low,
    /// Space before the next group (spaced form only)
    Gap,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum EncoderState {
    Ready,
    Verbatim {
        bytes: [u8; 4],
        index: usize,
    },
    Decimal(DecimalRenderer),
    Hex {
        /// Most significant byte first
        groups: [u8; 4],
        group: usize,
        cursor: HexCursor,
        spaced: bool,
    },
    Space,
}

/// What the encoder did during one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncoderStep {
    /// Ready with nothing to do
    Idle,
    /// A command record was taken from the queue
    Dispatched(Tag),
    /// A record was taken but could not be decoded
    Rejected,
    /// A rendering state made progress
    Busy,
    /// A rendering state waited on a full output queue
    Stalled,
}

/// Per-encoder counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncoderStats {
    pub verbatim: u64,
    pub decimal: u64,
    pub hex: u64,
    pub hex_spaced: u64,
    pub rejected: u64,
    pub bytes_emitted: u64,
    pub stall_ticks: u64,
}

impl EncoderStats {
    /// Records dispatched across all tags.
    pub fn commands(&self) -> u64 {
        self.verbatim + self.decimal + self.hex + self.hex_spaced
    }
}

/// Map a nibble to its lowercase ASCII hex digit.
pub fn hex_digit(nibble: u8) -> u8 {
    match nibble & 0x0F {
        n @ 0..=9 => b'0' + n,
        n => b'a' + (n - 10),
    }
}

/// Tag-dispatched ASCII encoder.
#[derive(Debug, Clone)]
pub struct ProtocolEncoder {
    state: EncoderState,
    stats: EncoderStats,
}

impl ProtocolEncoder {
    /// Create an encoder in the `Ready` state.
    pub fn new() -> Self {
        Self {
            state: EncoderState::Ready,
            stats: EncoderStats::default(),
        }
    }

    /// Whether the encoder is between commands.
    pub fn is_ready(&self) -> bool {
        self.state == EncoderState::Ready
    }

    /// Counters since construction.
    pub fn stats(&self) -> EncoderStats {
        self.stats
    }

    /// Run one tick against the command queue and the output byte queue.
    pub fn tick(&mut self, commands: &mut FlowQueue<u64>, out: &mut FlowQueue<u8>) -> EncoderStep {
        let step = match self.state {
            EncoderState::Ready => return self.dispatch(commands, out),
            _ if !out.writable() => EncoderStep::Stalled,
            EncoderState::Verbatim { .. } => self.step_verbatim(out),
            EncoderState::Decimal(_) => self.step_decimal(out),
            EncoderState::Hex { .. } => self.step_hex(out),
            EncoderState::Space => {
                self.emit(out, b' ');
                self.state = EncoderState::Ready;
                EncoderStep::Busy
            }
        };

        if step == EncoderStep::Stalled {
            self.stats.stall_ticks += 1;
            trace!("encoder stalled on full output");
        }
        step
    }

    fn dispatch(&mut self, commands: &mut FlowQueue<u64>, out: &FlowQueue<u8>) -> EncoderStep {
        if !commands.readable() || !out.writable() {
            return EncoderStep::Idle;
        }
        let Ok(record) = commands.pop() else {
            return EncoderStep::Idle;
        };

        let command = match Command::unpack(record) {
            Ok(command) => command,
            Err(err) => {
                warn!(record, %err, "dropping undecodable command record");
                self.stats.rejected += 1;
                return EncoderStep::Rejected;
            }
        };

        self.state = match command {
            Command::Verbatim(bytes) => {
                self.stats.verbatim += 1;
                EncoderState::Verbatim { bytes, index: 0 }
            }
            Command::Decimal(value) => match DecimalRenderer::new(value) {
                Ok(renderer) => {
                    self.stats.decimal += 1;
                    EncoderState::Decimal(renderer)
                }
                Err(err) => {
                    warn!(record, %err, "dropping out-of-range decimal command");
                    self.stats.rejected += 1;
                    return EncoderStep::Rejected;
                }
            },
            Command::Hex(word) | Command::HexSpaced(word) => {
                let spaced = command.tag() == Tag::HexSpaced;
                if spaced {
                    self.stats.hex_spaced += 1;
                } else {
                    self.stats.hex += 1;
                }
                EncoderState::Hex {
                    groups: word.to_be_bytes(),
                    group: 0,
                    cursor: HexCursor::High,
                    spaced,
                }
            }
        };
        EncoderStep::Dispatched(command.tag())
    }

    fn step_verbatim(&mut self, out: &mut FlowQueue<u8>) -> EncoderStep {
        let EncoderState::Verbatim { bytes, index } = self.state else {
            return EncoderStep::Idle;
        };

        // Zero bytes take their tick but print nothing
        let byte = bytes[index];
        if byte != 0 {
            self.emit(out, byte);
        }

        self.state = if index + 1 < bytes.len() {
            EncoderState::Verbatim {
                bytes,
                index: index + 1,
            }
        } else {
            EncoderState::Ready
        };
        EncoderStep::Busy
    }

    fn step_decimal(&mut self, out: &mut FlowQueue<u8>) -> EncoderStep {
        let EncoderState::Decimal(renderer) = &mut self.state else {
            return EncoderStep::Idle;
        };

        match renderer.tick(out) {
            RenderStep::Stalled => EncoderStep::Stalled,
            RenderStep::Progressed { emitted } => {
                self.stats.bytes_emitted += u64::from(emitted);
                EncoderStep::Busy
            }
            RenderStep::Finished => {
                // The units digit is always emitted
                self.stats.bytes_emitted += 1;
                self.state = EncoderState::Space;
                EncoderStep::Busy
            }
        }
    }

    fn step_hex(&mut self, out: &mut FlowQueue<u8>) -> EncoderStep {
        let EncoderState::Hex {
            groups,
            group,
            cursor,
            spaced,
        } = self.state
        else {
            return EncoderStep::Idle;
        };

        let byte = groups[group];
        let last = group + 1 == groups.len();
        let (emitted, next) = match cursor {
            HexCursor::High => (hex_digit(byte >> 4), Some((group, HexCursor::Low))),
            HexCursor::Low if last => (hex_digit(byte), None),
            HexCursor::Low if spaced => (hex_digit(byte), Some((group, HexCursor::Gap))),
            HexCursor::Low => (hex_digit(byte), Some((group + 1, HexCursor::High))),
            HexCursor::Gap => (b' ', Some((group + 1, HexCursor::High))),
        };
        self.emit(out, emitted);

        self.state = match next {
            Some((group, cursor)) => EncoderState::Hex {
                groups,
                group,
                cursor,
                spaced,
            },
            None => EncoderState::Space,
        };
        EncoderStep::Busy
    }

    fn emit(&mut self, out: &mut FlowQueue<u8>, byte: u8) {
        // Callers check writability first
        let pushed = out.push(byte).is_ok();
        debug_assert!(pushed, "encoder pushed into a full queue");
        self.stats.bytes_emitted += u64::from(pushed);
    }
}

impl Default for ProtocolEncoder {
    fn default() -> Self {
        Self::new()
    }
}
