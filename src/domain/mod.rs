//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - validated input (`Address`) and the state-code table
//! - provider query/handle types (`LocationHandle`, `StatisticQuery`, `RawSeries`)
//! - normalized output (`TimeSeries`, `PipelineResult`)
//! - run configuration (`ProviderConfig`)

pub mod address;
pub mod config;
pub mod types;

pub use address::*;
pub use config::*;
pub use types::*;
