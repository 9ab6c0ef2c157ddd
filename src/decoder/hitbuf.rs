//! Hit-buffer decoder for uDAQ readout frames
//!
//! Decodes the flat word stream captured from the uDAQ hit buffer and
//! reports how many PPS second markers and hit records it contains.
//!
//! # Data Format
//!
//! The buffer is a sequence of 32-bit Big-Endian words. The top byte of a
//! header word selects the record kind:
//!
//! - `0xE0` PPS second marker, 1 word
//! - `0xE4` PPS year marker, 1 word
//! - `0xE5` trigger configuration, 2 words (header + configuration word)
//! - `0xE6` data format marker, 1 word
//! - anything else: hit record — header word, then a count word whose top
//!   nibble holds the ADC channel count `n`, then `n / 2` sample words
//!
//! A record may end exactly at the buffer end; running past it is an
//! error. The scan is a single forward pass and keeps no state between
//! calls.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

mod constants {
    pub const WORD_SIZE: usize = 4; // 32-bit

    pub const TAG_SHIFT: u32 = 24;

    pub const TAG_PPS_SECOND: u8 = 0xE0;
    pub const TAG_PPS_YEAR: u8 = 0xE4;
    pub const TAG_TRIG_CONFIG: u8 = 0xE5;
    pub const TAG_DATA_FORMAT: u8 = 0xE6;

    // Hit count word
    pub const ADC_COUNT_SHIFT: u32 = 28;
    pub const ADC_COUNT_MASK: u32 = 0xF;

    // Record widths in words
    pub const MARKER_WORDS: usize = 1;
    pub const TRIG_CONFIG_WORDS: usize = 2;
    pub const HIT_BASE_WORDS: usize = 2;
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Record kind, selected by the top byte of a header word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    /// 1-second time pulse marker (tag 0xE0)
    PpsSecond,
    /// Yearly time marker (tag 0xE4)
    PpsYear,
    /// Trigger configuration record (tag 0xE5)
    TrigConfig,
    /// Data format marker (tag 0xE6)
    DataFormat,
    /// Hit record (any other tag)
    Hit,
}

impl RecordKind {
    /// Classify a header word by its tag byte
    pub fn from_tag(tag: u8) -> Self {
        match tag {
            constants::TAG_PPS_SECOND => Self::PpsSecond,
            constants::TAG_PPS_YEAR => Self::PpsYear,
            constants::TAG_TRIG_CONFIG => Self::TrigConfig,
            constants::TAG_DATA_FORMAT => Self::DataFormat,
            _ => Self::Hit,
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::PpsSecond => "PPS second",
            Self::PpsYear => "PPS year",
            Self::TrigConfig => "trigger config",
            Self::DataFormat => "data format",
            Self::Hit => "hit",
        };
        f.write_str(name)
    }
}

/// Summary counts accumulated over one hit-buffer scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HitBufSummary {
    /// Number of PPS second markers
    pub seconds: u64,
    /// Number of hit records
    pub hits: u64,
}

/// Hit-buffer decode error
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HitBufError {
    /// Buffer length is not a whole number of words
    #[error("buffer length {len} bytes is not a multiple of the {word_size}-byte word size")]
    MalformedLength { len: usize, word_size: usize },

    /// A record runs past the end of the buffer
    #[error(
        "truncated {kind} record at word {word_index}: needs {needed} word(s), {available} left"
    )]
    TruncatedFrame {
        kind: RecordKind,
        word_index: usize,
        needed: usize,
        available: usize,
    },
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// Decode a hit buffer into summary counts
///
/// The buffer length must be a multiple of 4; anything else is rejected
/// before scanning. Any truncated record aborts the whole decode, partial
/// counts are never returned.
pub fn decode(buffer: &[u8]) -> Result<HitBufSummary, HitBufError> {
    if buffer.len() % constants::WORD_SIZE != 0 {
        return Err(HitBufError::MalformedLength {
            len: buffer.len(),
            word_size: constants::WORD_SIZE,
        });
    }

    let word_count = buffer.len() / constants::WORD_SIZE;
    let mut summary = HitBufSummary::default();
    let mut index = 0usize;

    while index < word_count {
        let header = read_u32(buffer, index);
        let kind = RecordKind::from_tag((header >> constants::TAG_SHIFT) as u8);

        match kind {
            RecordKind::PpsSecond => {
                summary.seconds += 1;
                index += constants::MARKER_WORDS;
            }
            RecordKind::PpsYear | RecordKind::DataFormat => {
                index += constants::MARKER_WORDS;
            }
            RecordKind::TrigConfig => {
                check_width(kind, index, constants::TRIG_CONFIG_WORDS, word_count)?;
                index += constants::TRIG_CONFIG_WORDS;
            }
            RecordKind::Hit => {
                // The count word must exist before its nibble can be read
                check_width(kind, index, constants::HIT_BASE_WORDS, word_count)?;
                let count_word = read_u32(buffer, index + 1);
                let adc_count =
                    ((count_word >> constants::ADC_COUNT_SHIFT) & constants::ADC_COUNT_MASK)
                        as usize;
                let width = constants::HIT_BASE_WORDS + adc_count / 2;
                check_width(kind, index, width, word_count)?;
                summary.hits += 1;
                index += width;
            }
        }
    }

    Ok(summary)
}

// ---------------------------------------------------------------------------
// Free functions (pure, easy to test)
// ---------------------------------------------------------------------------

/// Read a u32 from the buffer at given word index (Big-Endian)
#[inline]
fn read_u32(buffer: &[u8], word_index: usize) -> u32 {
    let offset = word_index * constants::WORD_SIZE;
    u32::from_be_bytes(
        buffer[offset..offset + constants::WORD_SIZE]
            .try_into()
            .unwrap(),
    )
}

/// Check that a record starting at `start` fits into `word_count` words
///
/// A record that ends exactly at the buffer end is valid.
#[inline]
fn check_width(
    kind: RecordKind,
    start: usize,
    needed: usize,
    word_count: usize,
) -> Result<(), HitBufError> {
    if start + needed <= word_count {
        Ok(())
    } else {
        Err(HitBufError::TruncatedFrame {
            kind,
            word_index: start,
            needed,
            available: word_count - start,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
