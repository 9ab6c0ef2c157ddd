//! Common types shared across decoder and packet modules

pub mod error;
pub use error::{AnalysisError, AnalysisResult};
