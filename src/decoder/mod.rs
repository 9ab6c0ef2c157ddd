//! Decoder module for uDAQ raw data
//!
//! Converts raw binary hit-buffer data into summary counts.

pub mod hitbuf;

pub use hitbuf::{decode, HitBufError, HitBufSummary, RecordKind};
