//! # Gorilla codec
//!
//! A streaming, bit-level implementation of the time-series compression from
//! Facebook's *"Gorilla: A Fast, Scalable, In-Memory Time Series Database"*
//! (VLDB 2015), with millisecond block framing and pluggable value predictors.
//!
//! ## Algorithm overview
//!
//! - **Timestamps**: the first sample stores its offset from the block
//!   timestamp in 27 bits. Later samples store the *delta-of-delta*, zig-zag
//!   mapped, under a unary width prefix; a regular sampling interval costs a
//!   single bit per sample.
//!
//! - **Values**: every raw 64-bit value is XORed against a [`Predictor`]'s
//!   guess. A zero residual costs one bit; otherwise only the significant
//!   window of the residual is stored, reusing the previous window when it fits.
//!
//! ## Wire format
//!
//! 1. Block timestamp, 64 bits.
//! 2. First sample: 27-bit offset from the block timestamp, 64-bit raw value.
//! 3. Each later sample: timestamp code (1 to 36 bits), value code (1 to 78 bits).
//! 4. End of stream: `1111`, 32 one bits, one `0` bit, then padding to the storage unit.
//!
//! The stream is bit-identical whether it is held in bytes ([`BitBuffer`]) or
//! in `u64` words ([`WordBuffer`]).
//!
//! ## Example
//!
//! ```rust
//! use gorilla_codec::{BitBuffer, BitReader, Compressor, Decompressor, Pair};
//!
//! let block = 1_609_459_200_000;
//!
//! // Compress
//! let mut compressor = Compressor::new(block, BitBuffer::new()).unwrap();
//! compressor.add_f64(block + 60_000, 12.0).unwrap();
//! compressor.add_f64(block + 120_000, 12.5).unwrap();
//! compressor.add_f64(block + 180_000, 13.0).unwrap();
//! compressor.close().unwrap();
//!
//! let buffer = compressor.into_inner();
//! println!("Compressed 3 points into {} bytes", buffer.as_bytes().len());
//!
//! // Decompress
//! let decompressor = Decompressor::new(BitReader::new(&buffer)).unwrap();
//! let points: Vec<Pair> = decompressor.collect::<Result<_, _>>().unwrap();
//! assert_eq!(points.len(), 3);
//! assert_eq!(points[0], Pair::from_f64(block + 60_000, 12.0));
//! ```
//!
//! ## Predictors
//!
//! Both sides of a block must use the same predictor configuration.
//! [`PredictorKind`] describes one so each side can build its own instance:
//!
//! ```rust
//! # use gorilla_codec::{BitBuffer, BitReader, Compressor, Decompressor, PredictorKind};
//! let kind = PredictorKind::DifferentialFcm { table_size: 1024 };
//!
//! let mut compressor = Compressor::with_predictor(0, BitBuffer::new(), kind.build().unwrap()).unwrap();
//! for i in 1..=100 {
//!     compressor.add_i64(i * 10, (i % 5) * 100).unwrap();
//! }
//! compressor.close().unwrap();
//! let buffer = compressor.into_inner();
//!
//! let decompressor =
//!     Decompressor::with_predictor(BitReader::new(&buffer), kind.build().unwrap()).unwrap();
//! assert_eq!(decompressor.count(), 100);
//! ```

pub mod bitbuffer;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod predictor;
pub mod timestamp;
pub mod value;
pub mod wordbuffer;

// Re-export primary types at the crate root.
pub use bitbuffer::{BitBuffer, BitRead, BitReader, BitWrite};
pub use decoder::Decompressor;
pub use encoder::{Compressor, Pair};
pub use error::{Error, Result};
pub use predictor::{DifferentialFcm, LastValuePredictor, Predictor, PredictorKind};
pub use timestamp::FIRST_DELTA_BITS;
pub use value::{ValueCompressor, ValueDecompressor};
pub use wordbuffer::{WordBuffer, WordReader};
