//! Reference decoder for the transmitted byte stream.
//!
//! The host side of the link sees reports of three space-terminated fields
//! closed by CR LF BEL:
//!
//! ```text
//! <index> <length> <trial> \r\n\x07     new record
//! X <length> <trial> \r\n\x07           trial overflowed the value width
//! N <length> <trial> \r\n\x07           trial exhausted the step budget
//! ```
//!
//! `parse_reports` turns a captured stream back into [`Report`]s. The token
//! helpers accept exactly what the encoder produces: decimal without leading
//! zeros, lowercase hex.

use crate::error::{DecodeError, Result};
use std::fmt;

/// Bytes closing every report (the trailer's zero byte is never printed).
pub const REPORT_END: &[u8] = b"\r\n\x07";

/// Fields in every report.
const REPORT_FIELDS: usize = 3;

/// A decoded report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Report {
    /// Trial `trial` set record number `index` with a trajectory of `length`
    Record { index: u64, length: u32, trial: u64 },
    /// Trial `trial` overflowed after `length` steps
    Overflow { length: u32, trial: u64 },
    /// Trial `trial` ran out of step budget at `length` steps
    Exhausted { length: u32, trial: u64 },
}

impl Report {
    pub fn trial(&self) -> u64 {
        match *self {
            Report::Record { trial, .. }
            | Report::Overflow { trial, .. }
            | Report::Exhausted { trial, .. } => trial,
        }
    }

    pub fn length(&self) -> u32 {
        match *self {
            Report::Record { length, .. }
            | Report::Overflow { length, .. }
            | Report::Exhausted { length, .. } => length,
        }
    }

    pub fn is_record(&self) -> bool {
        matches!(self, Report::Record { .. })
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Report::Record { index, length, trial } => {
                write!(f, "record #{index}: trial {trial} reaches 1 in {length} steps")
            }
            Report::Overflow { length, trial } => {
                write!(f, "overflow: trial {trial} exceeded the value width after {length} steps")
            }
            Report::Exhausted { length, trial } => {
                write!(f, "exhausted: trial {trial} still running after {length} steps")
            }
        }
    }
}

/// Parse a decimal token as printed by the encoder.
///
/// # Errors
/// - `DecodeError::EmptyToken` for an empty token
/// - `DecodeError::InvalidDigit` for a non-digit byte
/// - `DecodeError::LeadingZero` for `"0…"` other than `"0"` itself
/// - `DecodeError::Overflow` if the value exceeds `u64`
///
/// # Example
/// ```
/// use collatz_sim_core::report::parse_decimal;
///
/// assert_eq!(parse_decimal(b"9232").unwrap(), 9232);
/// assert!(parse_decimal(b"007").is_err());
/// ```
pub fn parse_decimal(token: &[u8]) -> Result<u64> {
    if token.is_empty() {
        return Err(DecodeError::EmptyToken { radix: "decimal" }.into());
    }
    if token.len() > 1 && token[0] == b'0' {
        return Err(DecodeError::LeadingZero(lossy(token)).into());
    }

    let mut value: u64 = 0;
    for &byte in token {
        if !byte.is_ascii_digit() {
            return Err(DecodeError::InvalidDigit {
                radix: "decimal",
                byte,
                token: lossy(token),
            }
            .into());
        }
        value = value
            .checked_mul(10)
            .and_then(|v| v.checked_add((byte - b'0') as u64))
            .ok_or_else(|| DecodeError::Overflow(lossy(token)))?;
    }
    Ok(value)
}

/// Parse a lowercase hex token as printed by the encoder.
///
/// # Errors
/// - `DecodeError::EmptyToken` for an empty token
/// - `DecodeError::InvalidDigit` for anything but `0-9a-f`
/// - `DecodeError::Overflow` for more than 16 digits
pub fn parse_hex(token: &[u8]) -> Result<u64> {
    if token.is_empty() {
        return Err(DecodeError::EmptyToken { radix: "hex" }.into());
    }
    if token.len() > 16 {
        return Err(DecodeError::Overflow(lossy(token)).into());
    }

    let mut value: u64 = 0;
    for &byte in token {
        let nibble = match byte {
            b'0'..=b'9' => byte - b'0',
            b'a'..=b'f' => byte - b'a' + 10,
            _ => {
                return Err(DecodeError::InvalidDigit {
                    radix: "hex",
                    byte,
                    token: lossy(token),
                }
                .into())
            }
        };
        value = value << 4 | nibble as u64;
    }
    Ok(value)
}

/// Split a captured stream into reports.
///
/// # Errors
/// - `DecodeError::Unterminated` if bytes follow the last trailer
/// - `DecodeError::FieldCount` for a report without exactly three fields
/// - `DecodeError::UnknownMarker` for a non-numeric first field other than
///   `X` or `N`
/// - any token error from [`parse_decimal`]
pub fn parse_reports(stream: &[u8]) -> Result<Vec<Report>> {
    let mut reports = Vec::new();
    let mut rest = stream;
    while !rest.is_empty() {
        let Some(end) = find(rest, REPORT_END) else {
            return Err(DecodeError::Unterminated(lossy(rest)).into());
        };
        reports.push(parse_report(&rest[..end])?);
        rest = &rest[end + REPORT_END.len()..];
    }
    Ok(reports)
}

/// Parse one report without its trailer.
pub fn parse_report(line: &[u8]) -> Result<Report> {
    let fields: Vec<&[u8]> = line.split(|&b| b == b' ').filter(|field| !field.is_empty()).collect();
    if fields.len() != REPORT_FIELDS {
        return Err(DecodeError::FieldCount {
            line: lossy(line),
            expected: REPORT_FIELDS,
            actual: fields.len(),
        }
        .into());
    }

    let length = parse_length(fields[1])?;
    let trial = parse_decimal(fields[2])?;
    match fields[0] {
        b"X" => Ok(Report::Overflow { length, trial }),
        b"N" => Ok(Report::Exhausted { length, trial }),
        marker if marker[0].is_ascii_digit() => Ok(Report::Record {
            index: parse_decimal(marker)?,
            length,
            trial,
        }),
        marker => Err(DecodeError::UnknownMarker(lossy(marker)).into()),
    }
}

fn parse_length(token: &[u8]) -> Result<u32> {
    let value = parse_decimal(token)?;
    u32::try_from(value).map_err(|_| DecodeError::Overflow(lossy(token)).into())
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}
