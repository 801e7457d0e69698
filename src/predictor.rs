//! Value predictors.
//!
//! The value codec XORs every raw value against a prediction of it. The
//! encoder and decoder of a block must use the same predictor variant and
//! configuration, and feed it the same sequence of values; nothing in the
//! stream records which predictor was used.

use crate::error::{Error, Result};

/// Produces a guess for the next raw 64-bit value from the values seen so far.
pub trait Predictor {
    /// Records the true value of the sample just coded.
    fn update(&mut self, value: u64);

    /// Returns the predicted next raw value.
    fn predict(&self) -> u64;
}

impl<P: Predictor + ?Sized> Predictor for Box<P> {
    #[inline]
    fn update(&mut self, value: u64) {
        (**self).update(value)
    }

    #[inline]
    fn predict(&self) -> u64 {
        (**self).predict()
    }
}

/// Predicts that the next value repeats the last one. This is the predictor
/// of the Gorilla paper.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LastValuePredictor {
    last: u64,
}

impl LastValuePredictor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Predictor for LastValuePredictor {
    #[inline]
    fn update(&mut self, value: u64) {
        self.last = value;
    }

    #[inline]
    fn predict(&self) -> u64 {
        self.last
    }
}

/// Differential finite context method predictor.
///
/// Keeps a table of value deltas indexed by a rolling hash of the recent
/// delta history, and predicts `last_value + table[hash]`. Series with
/// repeating shapes get exact predictions once the pattern has been seen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DifferentialFcm {
    table: Box<[u64]>,
    mask: u64,
    hash: usize,
    last: u64,
}

impl DifferentialFcm {
    /// Creates a predictor whose table holds `size` entries rounded up to the
    /// next power of two. A `size` of zero is rejected.
    pub fn new(size: usize) -> Result<Self> {
        let len = match size {
            0 => None,
            n => n.checked_next_power_of_two(),
        }
        .ok_or(Error::InvalidTableSize { size })?;

        Ok(Self {
            table: vec![0; len].into_boxed_slice(),
            mask: (len - 1) as u64,
            hash: 0,
            last: 0,
        })
    }

    /// Number of entries in the prediction table.
    pub fn table_size(&self) -> usize {
        self.table.len()
    }
}

impl Predictor for DifferentialFcm {
    fn update(&mut self, value: u64) {
        let delta = value.wrapping_sub(self.last);
        self.table[self.hash] = delta;
        // Arithmetic shift: the top bits of a negative delta hash as ones.
        let context = ((delta as i64) >> 50) as u64;
        self.hash = ((((self.hash as u64) << 5) ^ context) & self.mask) as usize;
        self.last = value;
    }

    #[inline]
    fn predict(&self) -> u64 {
        self.table[self.hash].wrapping_add(self.last)
    }
}

/// A copyable description of a predictor, so both sides of a block can build
/// their own instance from the same settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PredictorKind {
    #[default]
    LastValue,
    DifferentialFcm { table_size: usize },
}

impl PredictorKind {
    /// Builds a fresh predictor with no history.
    pub fn build(self) -> Result<Box<dyn Predictor + Send>> {
        Ok(match self {
            PredictorKind::LastValue => Box::new(LastValuePredictor::new()),
            PredictorKind::DifferentialFcm { table_size } => {
                Box::new(DifferentialFcm::new(table_size)?)
            }
        })
    }
}
