//! Common error type for uDAQ analysis
//!
//! # Design Principles (KISS)
//! - Each module keeps its own precise error type
//! - This umbrella type exists for callers that funnel a whole readout
//!   through one Result
//! - Use thiserror for ergonomic error handling

use thiserror::Error;

use crate::decoder::HitBufError;
use crate::packet::{HitfileError, MonitorError, PacketError};

/// Umbrella error over every decode stage
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AnalysisError {
    /// Hit-buffer frame stream error
    #[error("hit buffer error: {0}")]
    HitBuf(#[from] HitBufError),

    /// Single packet decode error
    #[error("packet error: {0}")]
    Packet(#[from] PacketError),

    /// Hitfile reassembly error
    #[error("hitfile error: {0}")]
    Hitfile(#[from] HitfileError),

    /// Monitor readout error
    #[error("monitor error: {0}")]
    Monitor(#[from] MonitorError),
}

/// Result type alias using AnalysisError
pub type AnalysisResult<T> = Result<T, AnalysisError>;
