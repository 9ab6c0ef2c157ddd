//! Hitfile reassembly
//!
//! A hit-buffer readout arrives as a zero-delimited stream of COBS
//! packets: a 2-byte header packet carrying the block count, the payload
//! blocks, and an `OK\n\0` trailer packet. Reassembly validates the
//! envelope and concatenates the blocks back into the flat hit buffer.

use thiserror::Error;
use tracing::debug;

use super::{split_packets, PacketError};

/// Trailer payload closing a complete readout
const OK_TRAILER: &[u8] = b"OK\n\0";

/// Header packet payload size: Little-Endian u16 block count
const HEADER_LEN: usize = 2;

/// Hitfile reassembly error
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HitfileError {
    /// A packet in the stream failed to decode
    #[error(transparent)]
    Packet(#[from] PacketError),

    /// Stream contains no packets
    #[error("hitfile contains no packets")]
    Empty,

    /// Header packet is not a 2-byte block count
    #[error("bad header packet: {len} bytes, expected {expected}")]
    BadHeader { len: usize, expected: usize },

    /// Last packet is not the OK trailer
    #[error("readout not closed by OK trailer")]
    MissingTrailer,

    /// Number of payload blocks disagrees with the header
    #[error("wrong number of blocks received: {actual}, expected {expected}")]
    BlockCountMismatch { expected: usize, actual: usize },
}

/// Reassemble a hitfile readout into the flat hit buffer
///
/// Empty segments and lone `0xFF` keep-alive bytes between delimiters are
/// skipped before packet decoding.
pub fn reassemble(data: &[u8]) -> Result<Vec<u8>, HitfileError> {
    let packets = split_packets(data)?;

    if packets.is_empty() {
        return Err(HitfileError::Empty);
    }

    let header = &packets[0];
    if header.len() != HEADER_LEN {
        return Err(HitfileError::BadHeader {
            len: header.len(),
            expected: HEADER_LEN,
        });
    }
    let num_blocks = u16::from_le_bytes([header[0], header[1]]) as usize;

    if packets[packets.len() - 1] != OK_TRAILER {
        return Err(HitfileError::MissingTrailer);
    }

    if packets.len() != num_blocks + 2 {
        return Err(HitfileError::BlockCountMismatch {
            expected: num_blocks,
            actual: packets.len() - 2,
        });
    }

    let blocks = &packets[1..packets.len() - 1];
    let total: usize = blocks.iter().map(Vec::len).sum();
    let mut buffer = Vec::with_capacity(total);
    for block in blocks {
        buffer.extend_from_slice(block);
    }

    debug!(blocks = num_blocks, bytes = buffer.len(), "hitfile reassembled");
    Ok(buffer)
}
