use crate::bitbuffer::BitRead;
use crate::encoder::Pair;
use crate::error::{Error, Result};
use crate::predictor::{LastValuePredictor, Predictor};
use crate::timestamp::TimestampDecompressor;
use crate::value::ValueDecompressor;

#[derive(Debug, Clone, PartialEq, Eq)]
enum State {
    /// Header read, first sample not yet decoded.
    Empty,
    Streaming,
    /// End of stream seen; every further read returns `None`.
    Exhausted,
    /// A read failed; every further read returns the same error.
    Failed(Error),
}

/// The Gorilla decompressor (decoder) for one block.
///
/// Reads the block header on construction, then one sample per
/// [`read_pair`](Self::read_pair) call until the end-of-stream marker.
///
/// # Example
/// ```
/// use gorilla_codec::{BitBuffer, BitReader, Compressor, Decompressor};
///
/// let mut compressor = Compressor::new(0, BitBuffer::new()).unwrap();
/// compressor.add_f64(60, 12.0).unwrap();
/// compressor.add_f64(120, 12.5).unwrap();
/// compressor.close().unwrap();
/// let buffer = compressor.into_inner();
///
/// let mut decompressor = Decompressor::new(BitReader::new(&buffer)).unwrap();
/// let first = decompressor.read_pair().unwrap().unwrap();
/// assert_eq!((first.timestamp, first.value_f64()), (60, 12.0));
/// let second = decompressor.read_pair().unwrap().unwrap();
/// assert_eq!((second.timestamp, second.value_f64()), (120, 12.5));
/// assert_eq!(decompressor.read_pair(), Ok(None));
/// ```
#[derive(Debug)]
pub struct Decompressor<R, P = LastValuePredictor> {
    input: R,
    timestamps: TimestampDecompressor,
    values: ValueDecompressor<P>,
    state: State,
}

impl<R: BitRead> Decompressor<R, LastValuePredictor> {
    /// Creates a decompressor using the last-value predictor and reads the header.
    pub fn new(input: R) -> Result<Self> {
        Self::with_predictor(input, LastValuePredictor::new())
    }
}

impl<R: BitRead, P: Predictor> Decompressor<R, P> {
    /// Creates a decompressor with the given predictor and reads the header.
    ///
    /// The predictor must match the one the block was compressed with.
    pub fn with_predictor(mut input: R, predictor: P) -> Result<Self> {
        let timestamps = TimestampDecompressor::read_header(&mut input)?;
        Ok(Self {
            input,
            timestamps,
            values: ValueDecompressor::with_predictor(predictor),
            state: State::Empty,
        })
    }

    pub fn block_timestamp(&self) -> i64 {
        self.timestamps.block_timestamp()
    }

    /// Returns the next sample, or `None` once the end of the block is reached.
    ///
    /// A source that runs out before the end-of-stream marker yields
    /// `Err(Error::UnexpectedEnd)`.
    pub fn read_pair(&mut self) -> Result<Option<Pair>> {
        match &self.state {
            State::Exhausted => return Ok(None),
            State::Failed(err) => return Err(err.clone()),
            State::Empty | State::Streaming => {}
        }
        match self.next_pair() {
            Ok(Some(pair)) => {
                self.state = State::Streaming;
                Ok(Some(pair))
            }
            Ok(None) => {
                self.state = State::Exhausted;
                Ok(None)
            }
            Err(err) => {
                self.state = State::Failed(err.clone());
                Err(err)
            }
        }
    }

    fn next_pair(&mut self) -> Result<Option<Pair>> {
        let first = self.state == State::Empty;
        let timestamp = if first {
            self.timestamps.read_first(&mut self.input)?
        } else {
            self.timestamps.read_next(&mut self.input)?
        };
        let Some(timestamp) = timestamp else {
            return Ok(None);
        };

        let value = if first {
            self.values.read_first(&mut self.input)?
        } else {
            self.values.next_value(&mut self.input)?
        };
        Ok(Some(Pair::new(timestamp, value)))
    }

    /// Returns `true` once the end-of-stream marker has been read.
    pub fn is_exhausted(&self) -> bool {
        self.state == State::Exhausted
    }

    /// Consumes the decompressor and returns the source.
    pub fn into_inner(self) -> R {
        self.input
    }
}

/// Yields samples until the end of the block. A decode error is yielded once,
/// after which iteration stops.
impl<R: BitRead, P: Predictor> Iterator for Decompressor<R, P> {
    type Item = Result<Pair>;

    fn next(&mut self) -> Option<Self::Item> {
        if let State::Failed(_) = self.state {
            return None;
        }
        self.read_pair().transpose()
    }
}
