//! Bit-level sinks and sources.
//!
//! [`BitWrite`] and [`BitRead`] are the only storage surface the codec needs.
//! This module also provides the byte-backed implementations; see
//! [`crate::wordbuffer`] for the `u64`-word-backed pair.

use tracing::trace;

use crate::error::{Error, Result};

/// An append-only sink of bits, most significant bit first.
pub trait BitWrite {
    /// Appends a single bit.
    fn write_bit(&mut self, bit: bool) -> Result<()>;

    /// Appends a single `0` bit.
    #[inline]
    fn skip_bit(&mut self) -> Result<()> {
        self.write_bit(false)
    }

    /// Appends the lowest `n` bits of `value`, most significant first. `n` must be <= 64.
    fn write_bits(&mut self, value: u64, n: u8) -> Result<()>;

    /// Commits any partially filled storage unit, zero-padding the remainder.
    /// Calling it again without writing in between is a no-op.
    fn flush(&mut self) -> Result<()>;
}

/// A read-once source of bits, most significant bit first.
pub trait BitRead {
    /// Consumes one bit.
    fn read_bit(&mut self) -> Result<bool>;

    /// Consumes `n` bits and returns them right-aligned. `n` must be <= 64.
    fn read_bits(&mut self, n: u8) -> Result<u64>;

    /// Reads up to `max_bits` bits, stopping after the first `0` bit, and
    /// returns how many `1` bits preceded it. The terminating `0` is consumed
    /// but not counted; when `max_bits` ones are read no terminator is consumed.
    fn read_run_of_ones(&mut self, max_bits: u8) -> Result<u32> {
        let mut ones = 0;
        for _ in 0..max_bits {
            if !self.read_bit()? {
                break;
            }
            ones += 1;
        }
        Ok(ones)
    }
}

impl<W: BitWrite + ?Sized> BitWrite for &mut W {
    #[inline]
    fn write_bit(&mut self, bit: bool) -> Result<()> {
        (**self).write_bit(bit)
    }

    #[inline]
    fn skip_bit(&mut self) -> Result<()> {
        (**self).skip_bit()
    }

    #[inline]
    fn write_bits(&mut self, value: u64, n: u8) -> Result<()> {
        (**self).write_bits(value, n)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }
}

impl<R: BitRead + ?Sized> BitRead for &mut R {
    #[inline]
    fn read_bit(&mut self) -> Result<bool> {
        (**self).read_bit()
    }

    #[inline]
    fn read_bits(&mut self, n: u8) -> Result<u64> {
        (**self).read_bits(n)
    }

    fn read_run_of_ones(&mut self, max_bits: u8) -> Result<u32> {
        (**self).read_run_of_ones(max_bits)
    }
}

/// Returns a bitmask with the lowest `n` bits set. Handles `n == 64` without overflow.
#[inline]
pub(crate) fn bitmask(n: u8) -> u64 {
    if n >= 64 {
        u64::MAX
    } else {
        (1u64 << n) - 1
    }
}

/// A growable byte buffer that accepts bits.
///
/// An optional byte limit can be set to cap memory usage. When the limit is
/// reached, write operations return `Err(Error::BufferFull)` instead of growing.
#[derive(Debug, Clone)]
pub struct BitBuffer {
    bytes: Vec<u8>,
    /// Number of valid bits in the last byte (1..=8, or 0 if empty).
    bit_count: u8,
    /// Maximum number of bytes the buffer is allowed to hold (`None` = unlimited).
    max_bytes: Option<usize>,
}

impl BitBuffer {
    /// Creates a new empty `BitBuffer` with no size limit.
    pub fn new() -> Self {
        Self {
            bytes: Vec::new(),
            bit_count: 0,
            max_bytes: None,
        }
    }

    /// Creates a `BitBuffer` with the given pre-allocated capacity in bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity),
            bit_count: 0,
            max_bytes: None,
        }
    }

    /// Creates a `BitBuffer` with a maximum byte limit.
    pub fn with_limit(max_bytes: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(max_bytes.min(128)),
            bit_count: 0,
            max_bytes: Some(max_bytes),
        }
    }

    /// Sets (or clears) the maximum byte limit on an existing buffer.
    pub fn set_limit(&mut self, max_bytes: Option<usize>) {
        self.max_bytes = max_bytes;
    }

    /// Returns the current byte limit, if any.
    pub fn limit(&self) -> Option<usize> {
        self.max_bytes
    }

    /// Returns the number of bytes that can still be added before hitting the
    /// limit, or `None` if no limit is set.
    pub fn remaining_capacity(&self) -> Option<usize> {
        self.max_bytes.map(|max| max.saturating_sub(self.bytes.len()))
    }

    /// Returns the total number of bits written, including flush padding.
    #[inline]
    pub fn len_bits(&self) -> usize {
        if self.bytes.is_empty() {
            0
        } else {
            (self.bytes.len() - 1) * 8 + self.bit_count as usize
        }
    }

    /// Returns `true` if no bits have been written.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Returns a reference to the underlying byte slice.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consumes the buffer and returns the raw byte vector.
    #[inline]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Starts a fresh zeroed byte at the end of the buffer.
    fn push_byte(&mut self) -> Result<()> {
        if let Some(limit) = self.max_bytes {
            if self.bytes.len() >= limit {
                return Err(Error::BufferFull { limit });
            }
        }
        if self.bytes.len() == self.bytes.capacity() {
            let old = self.bytes.capacity();
            self.bytes
                .try_reserve(old.max(8))
                .map_err(|_| Error::CapacityExhausted)?;
            trace!(old, new = self.bytes.capacity(), "grew bit buffer");
        }
        self.bytes.push(0);
        self.bit_count = 0;
        Ok(())
    }
}

impl Default for BitBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl BitWrite for BitBuffer {
    #[inline]
    fn write_bit(&mut self, bit: bool) -> Result<()> {
        if self.bit_count == 0 || self.bit_count == 8 {
            self.push_byte()?;
        }
        if bit {
            let last = self.bytes.len() - 1;
            self.bytes[last] |= 1 << (7 - self.bit_count);
        }
        self.bit_count += 1;
        Ok(())
    }

    /// On error the buffer may hold part of this call's bits.
    fn write_bits(&mut self, value: u64, n: u8) -> Result<()> {
        debug_assert!(n <= 64);
        let mut remaining = n;
        while remaining > 0 {
            if self.bit_count == 0 || self.bit_count == 8 {
                self.push_byte()?;
            }
            let free = 8 - self.bit_count;
            let take = free.min(remaining);
            let chunk = (value >> (remaining - take)) & bitmask(take);
            let last = self.bytes.len() - 1;
            self.bytes[last] |= (chunk as u8) << (free - take);
            self.bit_count += take;
            remaining -= take;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if !self.bytes.is_empty() {
            self.bit_count = 8;
        }
        Ok(())
    }
}

/// A cursor for reading bits sequentially from a byte slice.
#[derive(Debug)]
pub struct BitReader<'a> {
    bytes: &'a [u8],
    /// Total number of valid bits.
    total_bits: usize,
    /// Current bit position (0-indexed from the start).
    pos: usize,
}

impl<'a> BitReader<'a> {
    /// Creates a new `BitReader` over the given buffer.
    pub fn new(buffer: &'a BitBuffer) -> Self {
        Self::from_raw(buffer.as_bytes(), buffer.len_bits())
    }

    /// Creates a `BitReader` over every bit of `bytes`.
    pub fn from_bytes(bytes: &'a [u8]) -> Self {
        Self::from_raw(bytes, bytes.len() * 8)
    }

    /// Creates a `BitReader` from raw bytes and a total bit count.
    pub fn from_raw(bytes: &'a [u8], total_bits: usize) -> Self {
        Self {
            bytes,
            total_bits: total_bits.min(bytes.len() * 8),
            pos: 0,
        }
    }

    /// Returns the number of bits remaining.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.total_bits.saturating_sub(self.pos)
    }

    /// Returns `true` if there are no more bits to read.
    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.pos >= self.total_bits
    }

    /// Peeks at the next bit without advancing the position.
    #[inline]
    pub fn peek_bit(&self) -> Option<bool> {
        if self.pos >= self.total_bits {
            return None;
        }
        Some((self.bytes[self.pos / 8] >> (7 - self.pos % 8)) & 1 == 1)
    }
}

impl BitRead for BitReader<'_> {
    #[inline]
    fn read_bit(&mut self) -> Result<bool> {
        let bit = self.peek_bit().ok_or(Error::UnexpectedEnd)?;
        self.pos += 1;
        Ok(bit)
    }

    fn read_bits(&mut self, n: u8) -> Result<u64> {
        debug_assert!(n <= 64);
        if self.remaining() < n as usize {
            return Err(Error::UnexpectedEnd);
        }
        let mut value: u64 = 0;
        let mut remaining = n;
        while remaining > 0 {
            let offset = (self.pos % 8) as u8;
            let available = 8 - offset;
            let take = available.min(remaining);
            let byte = self.bytes[self.pos / 8] as u64;
            let chunk = (byte >> (available - take)) & bitmask(take);
            // `take` is at most 8, so the shift never reaches 64.
            value = (value << take) | chunk;
            self.pos += take as usize;
            remaining -= take;
        }
        Ok(value)
    }
}
