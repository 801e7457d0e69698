//! XOR value compression.
//!
//! Each raw value is XORed against the predictor's guess and only the
//! significant bits of the residual are stored:
//!
//! | Code  | Meaning                                                      | Bits         |
//! |-------|--------------------------------------------------------------|--------------|
//! | `0`   | residual is zero                                             | 1            |
//! | `10`  | residual fits the previous window: meaningful bits follow     | 2 + window   |
//! | `11`  | new window: 6-bit leading zeros, 6-bit (length - 1), bits     | 14 + length  |
//!
//! The first value of a block is written verbatim in 64 bits.

use crate::bitbuffer::{BitRead, BitWrite};
use crate::error::{Error, Result};
use crate::predictor::{LastValuePredictor, Predictor};

/// Leading-zero count before any window has been announced. Larger than any
/// real count, so the first residual always opens a new window.
const NO_WINDOW: u32 = u32::MAX;

/// Encodes raw 64-bit values against a [`Predictor`].
#[derive(Debug, Clone)]
pub struct ValueCompressor<P = LastValuePredictor> {
    predictor: P,
    stored_leading_zeros: u32,
    stored_trailing_zeros: u32,
}

impl ValueCompressor<LastValuePredictor> {
    pub fn new() -> Self {
        Self::with_predictor(LastValuePredictor::new())
    }
}

impl Default for ValueCompressor<LastValuePredictor> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Predictor> ValueCompressor<P> {
    pub fn with_predictor(predictor: P) -> Self {
        Self {
            predictor,
            stored_leading_zeros: NO_WINDOW,
            stored_trailing_zeros: 0,
        }
    }

    /// Writes the block's first value in full.
    pub fn write_first<W: BitWrite>(&mut self, out: &mut W, value: u64) -> Result<()> {
        self.predictor.update(value);
        out.write_bits(value, 64)
    }

    /// Writes the XOR residual of `value` against the current prediction.
    pub fn compress<W: BitWrite>(&mut self, out: &mut W, value: u64) -> Result<()> {
        let xor = self.predictor.predict() ^ value;
        self.predictor.update(value);

        if xor == 0 {
            return out.skip_bit();
        }
        out.write_bit(true)?;

        let leading = xor.leading_zeros();
        let trailing = xor.trailing_zeros();

        if leading >= self.stored_leading_zeros && trailing >= self.stored_trailing_zeros {
            out.skip_bit()?;
            let significant = 64 - self.stored_leading_zeros - self.stored_trailing_zeros;
            out.write_bits(xor >> self.stored_trailing_zeros, significant as u8)
        } else {
            out.write_bit(true)?;
            let significant = 64 - leading - trailing;
            // Length is stored minus one so that 64 fits in six bits.
            out.write_bits(leading as u64, 6)?;
            out.write_bits((significant - 1) as u64, 6)?;
            out.write_bits(xor >> trailing, significant as u8)?;

            self.stored_leading_zeros = leading;
            self.stored_trailing_zeros = trailing;
            Ok(())
        }
    }
}

/// Decodes values written by a [`ValueCompressor`] with an identically
/// configured predictor.
#[derive(Debug, Clone)]
pub struct ValueDecompressor<P = LastValuePredictor> {
    predictor: P,
    stored_leading_zeros: u32,
    stored_trailing_zeros: u32,
}

impl ValueDecompressor<LastValuePredictor> {
    pub fn new() -> Self {
        Self::with_predictor(LastValuePredictor::new())
    }
}

impl Default for ValueDecompressor<LastValuePredictor> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Predictor> ValueDecompressor<P> {
    pub fn with_predictor(predictor: P) -> Self {
        Self {
            predictor,
            stored_leading_zeros: NO_WINDOW,
            stored_trailing_zeros: 0,
        }
    }

    pub fn read_first<R: BitRead>(&mut self, input: &mut R) -> Result<u64> {
        let value = input.read_bits(64)?;
        self.predictor.update(value);
        Ok(value)
    }

    pub fn next_value<R: BitRead>(&mut self, input: &mut R) -> Result<u64> {
        let value = match input.read_run_of_ones(2)? {
            0 => self.predictor.predict(),
            1 => self.read_residual(input)?,
            _ => {
                let leading = input.read_bits(6)? as u32;
                let significant = input.read_bits(6)? as u32 + 1;
                if leading + significant > 64 {
                    return Err(Error::InvalidWindow {
                        leading,
                        trailing: 0,
                    });
                }
                self.stored_leading_zeros = leading;
                self.stored_trailing_zeros = 64 - significant - leading;
                self.read_residual(input)?
            }
        };
        self.predictor.update(value);
        Ok(value)
    }

    /// Reads the meaningful bits of the stored window and applies them to the prediction.
    fn read_residual<R: BitRead>(&mut self, input: &mut R) -> Result<u64> {
        let window = self
            .stored_leading_zeros
            .checked_add(self.stored_trailing_zeros)
            .filter(|&used| used < 64)
            .ok_or(Error::InvalidWindow {
                leading: self.stored_leading_zeros,
                trailing: self.stored_trailing_zeros,
            })?;
        let bits = input.read_bits((64 - window) as u8)?;
        Ok(self.predictor.predict() ^ (bits << self.stored_trailing_zeros))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitbuffer::{BitBuffer, BitReader};
    use crate::predictor::DifferentialFcm;

    fn roundtrip<P: Predictor>(values: &[u64], enc: P, dec: P) -> Vec<u64> {
        let mut buf = BitBuffer::new();
        let mut compressor = ValueCompressor::with_predictor(enc);
        compressor.write_first(&mut buf, values[0]).unwrap();
        for &v in &values[1..] {
            compressor.compress(&mut buf, v).unwrap();
        }

        let mut reader = BitReader::new(&buf);
        let mut decompressor = ValueDecompressor::with_predictor(dec);
        let mut out = vec![decompressor.read_first(&mut reader).unwrap()];
        for _ in 1..values.len() {
            out.push(decompressor.next_value(&mut reader).unwrap());
        }
        assert!(reader.is_exhausted());
        out
    }

    #[test]
    fn test_first_value_is_verbatim() {
        let mut buf = BitBuffer::new();
        let mut compressor = ValueCompressor::new();
        compressor.write_first(&mut buf, 0x0123_4567_89AB_CDEF).unwrap();
        assert_eq!(buf.as_bytes(), &0x0123_4567_89AB_CDEFu64.to_be_bytes());
    }

    #[test]
    fn test_repeated_value_costs_one_bit() {
        let mut buf = BitBuffer::new();
        let mut compressor = ValueCompressor::new();
        compressor.write_first(&mut buf, 42.0f64.to_bits()).unwrap();
        for _ in 0..10 {
            compressor.compress(&mut buf, 42.0f64.to_bits()).unwrap();
        }
        assert_eq!(buf.len_bits(), 64 + 10);
    }

    #[test]
    fn test_new_window_then_reuse() {
        let mut buf = BitBuffer::new();
        let mut compressor = ValueCompressor::new();
        compressor.write_first(&mut buf, 0).unwrap();
        // xor = 0b1100 << 8: 52 leading, 10 trailing, 2 significant.
        compressor.compress(&mut buf, 0b1100 << 8).unwrap();
        assert_eq!(buf.len_bits(), 64 + 2 + 12 + 2);
        // xor = 0b0100 << 8 fits inside the stored window.
        compressor.compress(&mut buf, 0b1000 << 8).unwrap();
        assert_eq!(buf.len_bits(), 64 + 16 + 2 + 2);

        let mut reader = BitReader::new(&buf);
        reader.read_bits(64).unwrap();
        assert_eq!(reader.read_bits(2), Ok(0b11));
        assert_eq!(reader.read_bits(6), Ok(52));
        assert_eq!(reader.read_bits(6), Ok(1));
        assert_eq!(reader.read_bits(2), Ok(0b11));
        assert_eq!(reader.read_bits(2), Ok(0b10));
        assert_eq!(reader.read_bits(2), Ok(0b01));
    }

    #[test]
    fn test_full_width_residual() {
        let values = [0, u64::MAX, 1, 1 << 63, 0];
        let out = roundtrip(&values, LastValuePredictor::new(), LastValuePredictor::new());
        assert_eq!(out, values);
    }

    #[test]
    fn test_roundtrip_floats() {
        let values: Vec<u64> = [12.0, 12.5, 13.0, 11.5, 12.0, -0.0, f64::NAN, f64::INFINITY, 1e-300]
            .iter()
            .map(|v: &f64| v.to_bits())
            .collect();
        let out = roundtrip(&values, LastValuePredictor::new(), LastValuePredictor::new());
        assert_eq!(out, values);
    }

    #[test]
    fn test_roundtrip_with_dfcm() {
        let values: Vec<u64> = (0..300u64).map(|i| (i % 12) * 1000 + (i / 12)).collect();
        let out = roundtrip(
            &values,
            DifferentialFcm::new(64).unwrap(),
            DifferentialFcm::new(64).unwrap(),
        );
        assert_eq!(out, values);
    }

    #[test]
    fn test_dfcm_exact_predictions_stay_in_sync() {
        // A constant stride is predicted exactly, so every sample after the
        // warm-up takes the one-bit branch on both sides.
        let values: Vec<u64> = (0..100u64).map(|i| 1_000 + i * 7).collect();
        let out = roundtrip(
            &values,
            DifferentialFcm::new(16).unwrap(),
            DifferentialFcm::new(16).unwrap(),
        );
        assert_eq!(out, values);
    }

    #[test]
    fn test_reuse_before_any_window_is_rejected() {
        // `1` then `0`: reuse a window that was never announced.
        let bytes = [0b1000_0000];
        let mut reader = BitReader::from_bytes(&bytes);
        let mut decompressor = ValueDecompressor::new();
        assert!(matches!(
            decompressor.next_value(&mut reader),
            Err(Error::InvalidWindow { .. })
        ));
    }

    #[test]
    fn test_oversized_window_is_rejected() {
        // `11`, leading = 63, length - 1 = 63.
        let mut buf = BitBuffer::new();
        buf.write_bits(0b11, 2).unwrap();
        buf.write_bits(63, 6).unwrap();
        buf.write_bits(63, 6).unwrap();
        let mut reader = BitReader::new(&buf);
        let mut decompressor = ValueDecompressor::new();
        assert_eq!(
            decompressor.next_value(&mut reader),
            Err(Error::InvalidWindow {
                leading: 63,
                trailing: 0
            })
        );
    }

    #[test]
    fn test_truncated_residual() {
        let mut buf = BitBuffer::new();
        let mut compressor = ValueCompressor::new();
        compressor.write_first(&mut buf, 0).unwrap();
        compressor.compress(&mut buf, u64::MAX).unwrap();
        let bytes = buf.as_bytes();
        let mut reader = BitReader::from_raw(bytes, buf.len_bits() - 1);
        let mut decompressor = ValueDecompressor::new();
        decompressor.read_first(&mut reader).unwrap();
        assert_eq!(
            decompressor.next_value(&mut reader),
            Err(Error::UnexpectedEnd)
        );
    }
}
