//! Time-series normalization.

pub mod normalize;

pub use normalize::*;
