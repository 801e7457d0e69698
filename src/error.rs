//! Codec error types

use thiserror::Error;

/// Errors raised while writing or reading a compressed block.
///
/// A clean end of stream is not an error: decoders report it as `Ok(None)`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("write would exceed bit buffer byte limit of {limit} bytes")]
    BufferFull { limit: usize },

    #[error("bit buffer could not grow: allocation failed")]
    CapacityExhausted,

    #[error("unexpected end of compressed stream")]
    UnexpectedEnd,

    #[error("invalid value window: {leading} leading and {trailing} trailing zeros")]
    InvalidWindow { leading: u32, trailing: u32 },

    #[error("predictor table size must be a positive power-of-two-roundable number, got {size}")]
    InvalidTableSize { size: usize },

    #[error("first timestamp {timestamp} does not fit the first-delta field of block {block_timestamp}")]
    FirstDeltaOutOfRange { block_timestamp: i64, timestamp: i64 },

    #[error("timestamp delta {delta} does not fit in 32 bits")]
    DeltaOutOfRange { delta: i64 },

    #[error("compressor is already closed")]
    Closed,
}

/// Result type for codec operations
pub type Result<T> = std::result::Result<T, Error>;
