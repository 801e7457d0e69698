use tracing::debug;

use crate::bitbuffer::BitWrite;
use crate::error::{Error, Result};
use crate::predictor::{LastValuePredictor, Predictor};
use crate::timestamp::TimestampCompressor;
use crate::value::ValueCompressor;

/// A single decoded sample: an epoch-millisecond timestamp and the raw
/// 64-bit pattern of its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pair {
    pub timestamp: i64,
    pub value: u64,
}

impl Pair {
    /// Creates a new `Pair` from a raw value.
    pub fn new(timestamp: i64, value: u64) -> Self {
        Self { timestamp, value }
    }

    pub fn from_f64(timestamp: i64, value: f64) -> Self {
        Self::new(timestamp, value.to_bits())
    }

    pub fn from_i64(timestamp: i64, value: i64) -> Self {
        Self::new(timestamp, value as u64)
    }

    /// The value reinterpreted as an IEEE 754 double.
    pub fn value_f64(&self) -> f64 {
        f64::from_bits(self.value)
    }

    /// The value reinterpreted as a signed integer.
    pub fn value_i64(&self) -> i64 {
        self.value as i64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Header written, no sample yet.
    Empty,
    /// At least one sample written.
    Streaming,
    Closed,
}

/// The Gorilla compressor (encoder) for one block.
///
/// Writes the block header on construction, then one sample per
/// [`add_value`](Self::add_value) call:
/// - **Timestamps**: delta-of-delta encoding with variable-length prefixes.
/// - **Values**: XOR against a [`Predictor`] with leading/trailing zero tracking.
///
/// [`close`](Self::close) writes the end-of-stream marker and flushes the sink.
///
/// # Example
/// ```
/// use gorilla_codec::{BitBuffer, Compressor};
///
/// let block = 1_609_459_200_000;
/// let mut compressor = Compressor::new(block, BitBuffer::new()).unwrap();
/// compressor.add_f64(block + 1_000, 12.0).unwrap();
/// compressor.add_f64(block + 2_000, 12.5).unwrap();
/// compressor.close().unwrap();
///
/// let buffer = compressor.into_inner();
/// assert!(buffer.len_bits() > 0);
/// ```
#[derive(Debug)]
pub struct Compressor<W, P = LastValuePredictor> {
    out: W,
    timestamps: TimestampCompressor,
    values: ValueCompressor<P>,
    state: State,
    /// Number of samples written so far.
    count: u64,
}

impl<W: BitWrite> Compressor<W, LastValuePredictor> {
    /// Creates a compressor using the last-value predictor and writes the header.
    pub fn new(block_timestamp: i64, out: W) -> Result<Self> {
        Self::with_predictor(block_timestamp, out, LastValuePredictor::new())
    }
}

impl<W: BitWrite, P: Predictor> Compressor<W, P> {
    /// Creates a compressor with the given predictor and writes the header.
    ///
    /// The decoder must be given a predictor of the same kind and configuration.
    pub fn with_predictor(block_timestamp: i64, mut out: W, predictor: P) -> Result<Self> {
        let timestamps = TimestampCompressor::new(block_timestamp);
        timestamps.write_header(&mut out)?;
        Ok(Self {
            out,
            timestamps,
            values: ValueCompressor::with_predictor(predictor),
            state: State::Empty,
            count: 0,
        })
    }

    /// Appends a sample with a raw 64-bit value.
    ///
    /// Samples should arrive in increasing timestamp order. The first sample
    /// must lie within `2^27 - 1` of the block timestamp.
    ///
    /// On error the sink may hold a partial sample; the block should be discarded.
    pub fn add_value(&mut self, timestamp: i64, value: u64) -> Result<()> {
        match self.state {
            State::Closed => return Err(Error::Closed),
            State::Empty => {
                self.timestamps.write_first(&mut self.out, timestamp)?;
                self.values.write_first(&mut self.out, value)?;
                self.state = State::Streaming;
            }
            State::Streaming => {
                self.timestamps.compress(&mut self.out, timestamp)?;
                self.values.compress(&mut self.out, value)?;
            }
        }
        self.count += 1;
        Ok(())
    }

    /// Appends a sample with a floating point value.
    pub fn add_f64(&mut self, timestamp: i64, value: f64) -> Result<()> {
        self.add_value(timestamp, value.to_bits())
    }

    /// Appends a sample with a signed integer value.
    pub fn add_i64(&mut self, timestamp: i64, value: i64) -> Result<()> {
        self.add_value(timestamp, value as u64)
    }

    pub fn add_pair(&mut self, pair: Pair) -> Result<()> {
        self.add_value(pair.timestamp, pair.value)
    }

    /// Writes the end-of-stream marker and flushes the sink. Closing twice is a no-op.
    pub fn close(&mut self) -> Result<()> {
        if self.state == State::Closed {
            return Ok(());
        }
        TimestampCompressor::write_end_of_stream(&mut self.out)?;
        self.out.flush()?;
        self.state = State::Closed;
        debug!(
            block_timestamp = self.timestamps.block_timestamp(),
            samples = self.count,
            "closed block"
        );
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.state == State::Closed
    }

    /// Returns the number of samples written so far.
    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn block_timestamp(&self) -> i64 {
        self.timestamps.block_timestamp()
    }

    /// Returns a reference to the underlying sink.
    pub fn sink(&self) -> &W {
        &self.out
    }

    /// Consumes the compressor and returns the sink.
    pub fn into_inner(self) -> W {
        self.out
    }
}
