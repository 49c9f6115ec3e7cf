//! Error types for the collatz-sim system.
//!
//! Configuration, command packing, queue misuse and output decoding return
//! structured errors rather than panicking. Per-trial overflow and step
//! exhaustion are deliberately absent here: they are search outcomes that
//! travel through the report protocol, not failures of the system.

use thiserror::Error;

/// Top-level error type for all operations in the system.
///
/// Each variant corresponds to a specific failure domain:
/// - Config: invalid bit widths or queue depths
/// - Engine: a trial value the trajectory engine cannot load
/// - Command: packing or unpacking an encoder command record
/// - Queue: pushing into a full queue or popping an empty one
/// - Decode: parsing the emitted byte stream back into reports
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Trajectory engine rejected a load
    #[error("trajectory engine error: {0}")]
    Engine(#[from] EngineError),

    /// Command record error
    #[error("command error: {0}")]
    Command(#[from] CommandError),

    /// Queue protocol violated
    #[error("queue error: {0}")]
    Queue(#[from] QueueError),

    /// Output stream could not be decoded
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// The pipeline did not reach its goal within the tick bound
    #[error("tick limit {limit} reached after {trials} completed trials")]
    TickLimit { limit: u64, trials: u64 },
}

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Value width outside the supported range
    #[error("value width {bits} bits is outside {min}..={max}")]
    ValueBits { bits: u32, min: u32, max: u32 },

    /// Step counter width outside the supported range
    #[error("step counter width {bits} bits is outside {min}..={max}")]
    StepBits { bits: u32, min: u32, max: u32 },

    /// A queue was configured with no room at all
    #[error("queue `{name}` must have a depth of at least 1")]
    ZeroDepth { name: &'static str },
}

/// Trajectory engine errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    /// Zero never reaches 1, so it cannot be a trial
    #[error("trial value 0 has no trajectory")]
    ZeroTrial,

    /// Trial does not fit in the configured value width
    #[error("trial value {value} does not fit in {bits} bits")]
    TrialTooWide { value: u64, bits: u32 },
}

/// Command record errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    /// Tag bits do not name a command
    #[error("unknown command tag {0:#05b}")]
    UnknownTag(u8),

    /// Payload exceeds the bits the command can carry
    #[error("payload {payload:#x} exceeds {bits} bits")]
    PayloadTooWide { payload: u64, bits: u32 },

    /// Decimal value has more digits than the renderer produces
    #[error("decimal value {value} exceeds {max}")]
    DecimalRange { value: u64, max: u64 },

    /// Verbatim text longer than one record word
    #[error("verbatim text of {len} bytes exceeds {max}")]
    TextTooLong { len: usize, max: usize },
}

/// Queue errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    /// Write attempted while the queue reports full
    #[error("queue full (capacity {capacity})")]
    Full { capacity: usize },

    /// Read attempted while the queue reports empty
    #[error("queue empty")]
    Empty,
}

/// Output stream decoding errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// Token contains a byte that is not a digit of the expected radix
    #[error("invalid {radix} digit {byte:#04x} in token {token:?}")]
    InvalidDigit {
        radix: &'static str,
        byte: u8,
        token: String,
    },

    /// Token with no digits at all
    #[error("empty {radix} token")]
    EmptyToken { radix: &'static str },

    /// Decimal token has a leading zero
    #[error("decimal token {0:?} has a leading zero")]
    LeadingZero(String),

    /// Token value does not fit the decoder's integer type
    #[error("token {0:?} overflows 64 bits")]
    Overflow(String),

    /// A report line has the wrong number of fields
    #[error("report {line:?} has {actual} fields, expected {expected}")]
    FieldCount {
        line: String,
        expected: usize,
        actual: usize,
    },

    /// Report starts with a marker the decoder does not know
    #[error("unknown report marker {0:?}")]
    UnknownMarker(String),

    /// Output ended in the middle of a report
    #[error("stream ends with an unterminated report {0:?}")]
    Unterminated(String),
}

/// Type alias for Result with our Error type
pub type Result<T> = std::result::Result<T, Error>;
