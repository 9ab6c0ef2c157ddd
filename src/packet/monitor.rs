//! Monitor readout decode
//!
//! A monitor readout carries housekeeping records as text payloads in the
//! usual packet stream: a temperature record and a TAI wall-clock record.
//! The TAI record counts years from 2000 and days from the start of the
//! year, with an appended second-of-day and `CLK` section the decoder
//! does not use.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::{split_packets, PacketError};

/// Prefix of the temperature record payload
const TEMPERATURE_PREFIX: &[u8] = b"0.0000";

/// Prefix of the TAI wall-clock record payload
const TAI_PREFIX: &[u8] = b"TAI:";

/// Separator in front of the unused CLK section
const CLK_SEPARATOR: &[u8] = b"\tCLK:";

/// Decoded monitor readout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorReadout {
    /// Wall-clock time reported by the TAI record
    pub time: NaiveDateTime,
    /// Panel temperature in degrees Celsius
    pub temperature: f64,
}

/// Monitor readout decode error
#[derive(Debug, Clone, Error, PartialEq)]
pub enum MonitorError {
    /// A packet in the stream failed to decode
    #[error(transparent)]
    Packet(#[from] PacketError),

    /// No temperature record in the stream
    #[error("temperature record not found")]
    MissingTemperature,

    /// No TAI record in the stream
    #[error("TAI record not found")]
    MissingTimestamp,

    /// Temperature record did not parse
    #[error("malformed temperature record: {0}")]
    MalformedTemperature(String),

    /// TAI record did not parse
    #[error("malformed TAI record: {0}")]
    MalformedTimestamp(String),
}

/// Decode a monitor readout stream
pub fn decode_monitor(data: &[u8]) -> Result<MonitorReadout, MonitorError> {
    let packets = split_packets(data)?;

    let temperature_packet = packets
        .iter()
        .find(|p| p.starts_with(TEMPERATURE_PREFIX))
        .ok_or(MonitorError::MissingTemperature)?;
    let tai_packet = packets
        .iter()
        .find(|p| p.starts_with(TAI_PREFIX))
        .ok_or(MonitorError::MissingTimestamp)?;

    let temperature = parse_temperature(temperature_packet)?;
    let time = parse_tai(tai_packet)?;

    debug!(%time, temperature, "monitor readout decoded");
    Ok(MonitorReadout { time, temperature })
}

/// Parse the temperature record: value is the second token
fn parse_temperature(payload: &[u8]) -> Result<f64, MonitorError> {
    let text = std::str::from_utf8(payload)
        .map_err(|e| MonitorError::MalformedTemperature(e.to_string()))?;
    let token = text
        .trim_end_matches(|c| c == '\n' || c == '\0')
        .split_whitespace()
        .nth(1)
        .ok_or_else(|| MonitorError::MalformedTemperature("missing value token".into()))?;
    token
        .parse()
        .map_err(|_| MonitorError::MalformedTemperature(format!("bad value {:?}", token)))
}

/// Parse the TAI record into a timestamp
///
/// Token layout: `TAI: <year-2000> <day-of-year> <hour> <minute> <second>
/// <second-of-day>`, optionally followed by a tab-separated CLK section.
fn parse_tai(payload: &[u8]) -> Result<NaiveDateTime, MonitorError> {
    let clipped = match find_subslice(payload, CLK_SEPARATOR) {
        Some(pos) => &payload[..pos],
        None => payload,
    };
    let text = std::str::from_utf8(clipped)
        .map_err(|e| MonitorError::MalformedTimestamp(e.to_string()))?;

    let tokens: Vec<&str> = text.split_whitespace().collect();
    // Leading TAI: tag and trailing second-of-day bracket the five fields
    if tokens.len() != 7 {
        return Err(MonitorError::MalformedTimestamp(format!(
            "expected 7 tokens, found {}",
            tokens.len()
        )));
    }

    let mut fields = [0u32; 5];
    for (field, token) in fields.iter_mut().zip(&tokens[1..6]) {
        *field = token
            .parse()
            .map_err(|_| MonitorError::MalformedTimestamp(format!("bad field {:?}", token)))?;
    }
    let [year, day, hour, minute, second] = fields;

    NaiveDate::from_yo_opt(2000 + year as i32, day)
        .and_then(|date| date.and_hms_opt(hour, minute, second))
        .ok_or_else(|| {
            MonitorError::MalformedTimestamp(format!(
                "out of range: year {} day {} {:02}:{:02}:{:02}",
                year, day, hour, minute, second
            ))
        })
}

/// Find the first occurrence of `needle` in `haystack`
fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
