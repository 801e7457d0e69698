//! `u64`-word-backed bit sink and source.
//!
//! Bits are packed most significant first within each word, so the stream
//! is the same bit sequence a [`BitBuffer`](crate::bitbuffer::BitBuffer)
//! would hold; only the storage unit differs.

use tracing::trace;

use crate::bitbuffer::{bitmask, BitRead, BitWrite};
use crate::error::{Error, Result};

/// Number of words a [`WordBuffer::new`] preallocates.
pub const DEFAULT_ALLOCATION: usize = 256;

/// A growable word array that accepts bits.
///
/// Storage grows by doubling; previously written bits, including the
/// partially filled last word, are kept across every reallocation.
#[derive(Debug, Clone)]
pub struct WordBuffer {
    words: Vec<u64>,
    /// Number of valid bits in the last word (1..=64, or 0 if empty).
    bit_count: u8,
}

impl WordBuffer {
    /// Creates a `WordBuffer` with [`DEFAULT_ALLOCATION`] words preallocated.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_ALLOCATION)
    }

    /// Creates a `WordBuffer` with the given pre-allocated capacity in words.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            words: Vec::with_capacity(capacity),
            bit_count: 0,
        }
    }

    /// Returns the total number of bits written, including flush padding.
    #[inline]
    pub fn len_bits(&self) -> usize {
        if self.words.is_empty() {
            0
        } else {
            (self.words.len() - 1) * 64 + self.bit_count as usize
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Number of words currently allocated.
    pub fn capacity(&self) -> usize {
        self.words.capacity()
    }

    #[inline]
    pub fn as_words(&self) -> &[u64] {
        &self.words
    }

    #[inline]
    pub fn into_words(self) -> Vec<u64> {
        self.words
    }

    fn push_word(&mut self) -> Result<()> {
        if self.words.len() == self.words.capacity() {
            let old = self.words.capacity();
            self.words
                .try_reserve(old.max(1))
                .map_err(|_| Error::CapacityExhausted)?;
            trace!(old, new = self.words.capacity(), "grew word buffer");
        }
        self.words.push(0);
        self.bit_count = 0;
        Ok(())
    }
}

impl Default for WordBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl BitWrite for WordBuffer {
    #[inline]
    fn write_bit(&mut self, bit: bool) -> Result<()> {
        if self.bit_count == 0 || self.bit_count == 64 {
            self.push_word()?;
        }
        if bit {
            let last = self.words.len() - 1;
            self.words[last] |= 1 << (63 - self.bit_count);
        }
        self.bit_count += 1;
        Ok(())
    }

    fn write_bits(&mut self, value: u64, n: u8) -> Result<()> {
        debug_assert!(n <= 64);
        if n == 0 {
            return Ok(());
        }
        let value = value & bitmask(n);
        if self.bit_count == 0 || self.bit_count == 64 {
            self.push_word()?;
        }
        let free = 64 - self.bit_count;
        let last = self.words.len() - 1;
        if n <= free {
            self.words[last] |= value << (free - n);
            self.bit_count += n;
        } else {
            // Straddles two words: high part fills this one, the rest opens the next.
            let spill = n - free;
            self.words[last] |= value >> spill;
            self.push_word()?;
            self.words[last + 1] = value << (64 - spill);
            self.bit_count = spill;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if !self.words.is_empty() {
            self.bit_count = 64;
        }
        Ok(())
    }
}

/// A cursor for reading bits sequentially from a word slice.
#[derive(Debug)]
pub struct WordReader<'a> {
    words: &'a [u64],
    total_bits: usize,
    pos: usize,
}

impl<'a> WordReader<'a> {
    /// Creates a reader over every bit of `words`.
    pub fn new(words: &'a [u64]) -> Self {
        Self::from_raw(words, words.len() * 64)
    }

    /// Creates a reader over the bits written to `buffer`.
    pub fn from_buffer(buffer: &'a WordBuffer) -> Self {
        Self::from_raw(buffer.as_words(), buffer.len_bits())
    }

    /// Creates a reader over the first `total_bits` bits of `words`.
    pub fn from_raw(words: &'a [u64], total_bits: usize) -> Self {
        Self {
            words,
            total_bits: total_bits.min(words.len() * 64),
            pos: 0,
        }
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.total_bits.saturating_sub(self.pos)
    }

    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.pos >= self.total_bits
    }
}

impl BitRead for WordReader<'_> {
    #[inline]
    fn read_bit(&mut self) -> Result<bool> {
        if self.pos >= self.total_bits {
            return Err(Error::UnexpectedEnd);
        }
        let bit = (self.words[self.pos / 64] >> (63 - self.pos % 64)) & 1 == 1;
        self.pos += 1;
        Ok(bit)
    }

    fn read_bits(&mut self, n: u8) -> Result<u64> {
        debug_assert!(n <= 64);
        if n == 0 {
            return Ok(0);
        }
        if self.remaining() < n as usize {
            return Err(Error::UnexpectedEnd);
        }
        let idx = self.pos / 64;
        let offset = (self.pos % 64) as u8;
        let value = if offset + n <= 64 {
            (self.words[idx] << offset) >> (64 - n)
        } else {
            let first = 64 - offset;
            let spill = n - first;
            let high = self.words[idx] & bitmask(first);
            (high << spill) | (self.words[idx + 1] >> (64 - spill))
        };
        self.pos += n as usize;
        Ok(value)
    }

    fn read_run_of_ones(&mut self, max_bits: u8) -> Result<u32> {
        let needed = max_bits as usize + 1;
        let offset = self.pos % 64;
        if offset + needed <= 64 && self.remaining() >= needed {
            let window = self.words[self.pos / 64] << offset;
            let ones = window.leading_ones().min(max_bits as u32);
            self.pos += ones as usize + usize::from(ones < max_bits as u32);
            return Ok(ones);
        }

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
