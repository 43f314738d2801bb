//! Errors for caller supplied data that is checked at construction time
use thiserror::Error;

/// Errors that can occur while building a lobe from tabulated data.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("the angle grid needs at least two entries, got {0}")]
    GridTooSmall(usize),

    #[error("the angle grid must be sorted ascending within [-1, 1] (entry {index}: {value})")]
    UnsortedGrid { index: usize, value: f64 },

    #[error("{name} has {actual} entries, expected {expected}")]
    LengthMismatch {
        name: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("unsupported channel count {0}, expected 1 or 3")]
    UnsupportedChannels(usize),

    #[error("coefficients of pair {pair} reach {end}, but only {len} are stored")]
    OffsetOutOfRange { pair: usize, end: usize, len: usize },

    #[error("the relative index of refraction must be positive, got {0}")]
    InvalidEta(f64),
}

pub type Result<T> = std::result::Result<T, Error>;
