//! Encoder command records.
//!
//! Commands travel from the search controller to the protocol encoder as
//! fixed-width records, bit-packed low to high:
//!
//! ```text
//!  36    34 33  32 31                               0
//! +--------+------+----------------------------------+
//! |  tag   | pad  |            payload               |   Verbatim / Hex / HexSpaced
//! +--------+------+----------------------------------+
//! |  tag   |            payload (34 bits)             |   Decimal
//! +--------+-----------------------------------------+
//! ```
//!
//! | tag | command   | payload                                           |
//! |-----|-----------|---------------------------------------------------|
//! | 4   | Verbatim  | four ASCII bytes, least significant printed first |
//! | 5   | Decimal   | value up to 9,999,999,999                         |
//! | 6   | Hex       | 32-bit word, printed as 8 hex digits              |
//! | 7   | HexSpaced | 32-bit word, printed as 4 space-separated bytes   |
//!
//! Tags 0..=3 are unused. The two pad bits of 32-bit commands are ignored
//! on decode.

use crate::digits::MAX_DECIMAL;
use crate::error::{CommandError, Result};

/// Payload bits in a record; enough for the largest ten-digit decimal.
pub const PAYLOAD_BITS: u32 = 34;

/// Payload bits used by the 32-bit commands.
pub const WORD_BITS: u32 = 32;

/// Bits in the tag field.
pub const TAG_BITS: u32 = 3;

/// Total meaningful bits in a packed record.
pub const RECORD_BITS: u32 = PAYLOAD_BITS + TAG_BITS;

const PAYLOAD_MASK: u64 = (1 << PAYLOAD_BITS) - 1;
const WORD_MASK: u64 = (1 << WORD_BITS) - 1;
const TAG_MASK: u64 = (1 << TAG_BITS) - 1;

/// Carriage return, line feed, bell: closes every report.
pub const TRAILER: [u8; 4] = [b'\r', b'\n', 0x07, 0];

/// Command tag values as carried in the record's top three bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Tag {
    Verbatim = 4,
    Decimal = 5,
    Hex = 6,
    HexSpaced = 7,
}

impl TryFrom<u8> for Tag {
    type Error = CommandError;

    fn try_from(bits: u8) -> std::result::Result<Self, Self::Error> {
        match bits {
            4 => Ok(Tag::Verbatim),
            5 => Ok(Tag::Decimal),
            6 => Ok(Tag::Hex),
            7 => Ok(Tag::HexSpaced),
            other => Err(CommandError::UnknownTag(other)),
        }
    }
}

/// A decoded encoder command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Up to four literal bytes; zero bytes are not printed
    Verbatim([u8; 4]),
    /// Decimal value followed by a space
    Decimal(u64),
    /// Eight lowercase hex digits followed by a space
    Hex(u32),
    /// Four two-digit hex bytes separated and followed by spaces
    HexSpaced(u32),
}

impl Command {
    /// Verbatim command printing `text` (at most four bytes).
    ///
    /// # Errors
    /// `CommandError::TextTooLong` if `text` is longer than four bytes.
    pub fn verbatim(text: &[u8]) -> Result<Self> {
        if text.len() > 4 {
            return Err(CommandError::TextTooLong {
                len: text.len(),
                max: 4,
            }
            .into());
        }
        let mut bytes = [0u8; 4];
        bytes[..text.len()].copy_from_slice(text);
        Ok(Command::Verbatim(bytes))
    }

    /// Decimal command for `value`.
    ///
    /// # Errors
    /// `CommandError::DecimalRange` if `value` has more than ten digits.
    pub fn decimal(value: u64) -> Result<Self> {
        if value > MAX_DECIMAL {
            return Err(CommandError::DecimalRange {
                value,
                max: MAX_DECIMAL,
            }
            .into());
        }
        Ok(Command::Decimal(value))
    }

    /// The CR LF BEL report trailer.
    pub fn trailer() -> Self {
        Command::Verbatim(TRAILER)
    }

    /// Tag of this command.
    pub fn tag(&self) -> Tag {
        match self {
            Command::Verbatim(_) => Tag::Verbatim,
            Command::Decimal(_) => Tag::Decimal,
            Command::Hex(_) => Tag::Hex,
            Command::HexSpaced(_) => Tag::HexSpaced,
        }
    }

    /// Payload bits of this command, right-aligned.
    pub fn payload(&self) -> u64 {
        match *self {
            Command::Verbatim(bytes) => u32::from_le_bytes(bytes) as u64,
            Command::Decimal(value) => value,
            Command::Hex(word) | Command::HexSpaced(word) => word as u64,
        }
    }

    /// Pack into a record: payload in the low bits, tag above bit 34.
    pub fn pack(&self) -> u64 {
        (self.tag() as u64) << PAYLOAD_BITS | (self.payload() & PAYLOAD_MASK)
    }

    /// Decode a packed record.
    ///
    /// # Errors
    /// - `CommandError::PayloadTooWide` if bits above the record are set
    /// - `CommandError::UnknownTag` for tags 0..=3
    /// - `CommandError::DecimalRange` for a decimal payload over ten digits
    pub fn unpack(record: u64) -> Result<Self> {
        if record >> RECORD_BITS != 0 {
            return Err(CommandError::PayloadTooWide {
                payload: record,
                bits: RECORD_BITS,
            }
            .into());
        }

        let tag = Tag::try_from(((record >> PAYLOAD_BITS) & TAG_MASK) as u8)?;
        let payload = record & PAYLOAD_MASK;
        let word = (payload & WORD_MASK) as u32;

        match tag {
            Tag::Verbatim => Ok(Command::Verbatim(word.to_le_bytes())),
            Tag::Decimal => Command::decimal(payload),
            Tag::Hex => Ok(Command::Hex(word)),
            Tag::HexSpaced => Ok(Command::HexSpaced(word)),
        }
    }
}
