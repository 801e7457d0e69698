//! Delta-of-delta timestamp compression.
//!
//! The first sample stores its offset from the block timestamp in a fixed
//! [`FIRST_DELTA_BITS`]-bit field. Every later sample stores the change in
//! delta (`dod`), zig-zag mapped and decremented by one, under a unary prefix:
//!
//! | Prefix | Payload | Covers `zigzag(dod) - 1`          |
//! |--------|---------|-----------------------------------|
//! | `0`    | none    | `dod == 0`                        |
//! | `10`   | 7 bits  | < 2^7                             |
//! | `110`  | 9 bits  | < 2^9                             |
//! | `1110` | 12 bits | < 2^12                            |
//! | `1111` | 32 bits | anything else                     |
//!
//! A `1111` prefix followed by an all-ones 32-bit payload marks the end of the
//! stream. Zero deltas-of-delta never reach the payload, so `zigzag(dod) - 1`
//! can never be all ones.

use tracing::debug;

use crate::bitbuffer::{BitRead, BitWrite};
use crate::error::{Error, Result};

/// Width of the first sample's offset from the block timestamp: enough for
/// a day of milliseconds.
pub const FIRST_DELTA_BITS: u8 = 27;

/// First-delta value that marks a block with no samples. It is what a
/// decoder sees when the end-of-stream marker directly follows the header.
const EMPTY_BLOCK_MARKER: u64 = (1 << FIRST_DELTA_BITS) - 1;

/// Escape payload reserved for the end of the stream.
const END_OF_STREAM: u32 = u32::MAX;

/// Payload widths for prefixes `10`, `110`, `1110` and `1111`.
const PAYLOAD_BITS: [u8; 4] = [7, 9, 12, 32];

/// Maps a signed value to an unsigned one so that small magnitudes stay small.
#[inline]
pub fn zigzag_encode(n: i32) -> u32 {
    ((n << 1) ^ (n >> 31)) as u32
}

#[inline]
pub fn zigzag_decode(n: u32) -> i32 {
    ((n >> 1) as i32) ^ -((n & 1) as i32)
}

/// Encoder-side timestamp state for one block.
#[derive(Debug, Clone)]
pub struct TimestampCompressor {
    block_timestamp: i64,
    stored_timestamp: i64,
    stored_delta: i32,
}

impl TimestampCompressor {
    pub fn new(block_timestamp: i64) -> Self {
        Self {
            block_timestamp,
            stored_timestamp: block_timestamp,
            stored_delta: 0,
        }
    }

    pub fn block_timestamp(&self) -> i64 {
        self.block_timestamp
    }

    /// Writes the block header: the block timestamp in 64 bits.
    pub fn write_header<W: BitWrite>(&self, out: &mut W) -> Result<()> {
        out.write_bits(self.block_timestamp as u64, 64)
    }

    /// Writes the first sample's offset from the block timestamp.
    ///
    /// The offset must be non-negative and below `2^27 - 1`; the all-ones
    /// value is reserved for empty blocks.
    pub fn write_first<W: BitWrite>(&mut self, out: &mut W, timestamp: i64) -> Result<()> {
        let delta = timestamp
            .checked_sub(self.block_timestamp)
            .filter(|d| (0..EMPTY_BLOCK_MARKER as i64).contains(d))
            .ok_or(Error::FirstDeltaOutOfRange {
                block_timestamp: self.block_timestamp,
                timestamp,
            })?;

        out.write_bits(delta as u64, FIRST_DELTA_BITS)?;
        // Lossless: the range check above keeps it under 2^27.
        self.stored_delta = delta as i32;
        self.stored_timestamp = timestamp;
        Ok(())
    }

    /// Writes the delta-of-delta of `timestamp` against the previous sample.
    ///
    /// Out-of-order and repeated timestamps are accepted; only deltas that do
    /// not fit in 32 signed bits are rejected.
    pub fn compress<W: BitWrite>(&mut self, out: &mut W, timestamp: i64) -> Result<()> {
        let delta = timestamp
            .checked_sub(self.stored_timestamp)
            .ok_or(Error::DeltaOutOfRange { delta: i64::MAX })?;
        let new_delta = i32::try_from(delta).map_err(|_| Error::DeltaOutOfRange { delta })?;
        let dod = new_delta.wrapping_sub(self.stored_delta);

        if dod == 0 {
            out.skip_bit()?;
        } else {
            let encoded = zigzag_encode(dod).wrapping_sub(1);
            let bits_required = 32 - encoded.leading_zeros();
            match bits_required {
                0..=7 => out.write_bits(0b10 << 7 | encoded as u64, 9)?,
                8..=9 => out.write_bits(0b110 << 9 | encoded as u64, 12)?,
                10..=12 => out.write_bits(0b1110 << 12 | encoded as u64, 16)?,
                _ => {
                    out.write_bits(0b1111, 4)?;
                    out.write_bits(encoded as u64, 32)?;
                }
            }
        }

        self.stored_delta = new_delta;
        self.stored_timestamp = timestamp;
        Ok(())
    }

    /// Writes the end-of-stream marker: `1111`, 32 one bits and a single pad bit.
    pub fn write_end_of_stream<W: BitWrite>(out: &mut W) -> Result<()> {
        out.write_bits(0b1111, 4)?;
        out.write_bits(END_OF_STREAM as u64, 32)?;
        out.skip_bit()
    }
}

/// Decoder-side timestamp state for one block.
#[derive(Debug, Clone)]
pub struct TimestampDecompressor {
    block_timestamp: i64,
    stored_timestamp: i64,
    stored_delta: i32,
}

impl TimestampDecompressor {
    /// Reads the block header.
    pub fn read_header<R: BitRead>(input: &mut R) -> Result<Self> {
        let block_timestamp = input.read_bits(64)? as i64;
        Ok(Self {
            block_timestamp,
            stored_timestamp: block_timestamp,
            stored_delta: 0,
        })
    }

    pub fn block_timestamp(&self) -> i64 {
        self.block_timestamp
    }

    /// Reads the first sample's timestamp, or `None` if the block is empty.
    pub fn read_first<R: BitRead>(&mut self, input: &mut R) -> Result<Option<i64>> {
        let delta = input.read_bits(FIRST_DELTA_BITS)?;
        if delta == EMPTY_BLOCK_MARKER {
            debug!(block_timestamp = self.block_timestamp, "empty block");
            return Ok(None);
        }
        self.stored_delta = delta as i32;
        self.stored_timestamp = self.block_timestamp.wrapping_add(delta as i64);
        Ok(Some(self.stored_timestamp))
    }

    /// Reads the next timestamp, or `None` at the end-of-stream marker.
    pub fn read_next<R: BitRead>(&mut self, input: &mut R) -> Result<Option<i64>> {
        let prefix = input.read_run_of_ones(4)? as usize;
        if prefix > 0 {
            let width = PAYLOAD_BITS[prefix - 1];
            let payload = input.read_bits(width)?;
            if width == 32 && payload as u32 == END_OF_STREAM {
                debug!(
                    block_timestamp = self.block_timestamp,
                    last_timestamp = self.stored_timestamp,
                    "end of stream"
                );
                return Ok(None);
            }
            let dod = zigzag_decode((payload as u32).wrapping_add(1));
            self.stored_delta = self.stored_delta.wrapping_add(dod);
        }
        self.stored_timestamp = self.stored_timestamp.wrapping_add(self.stored_delta as i64);
        Ok(Some(self.stored_timestamp))
    }
}
