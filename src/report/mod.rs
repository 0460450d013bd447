//! Reporting utilities: value formatting and formatted terminal output.
//!
//! We keep formatting code in one place so the fetch/normalize code stays free of
//! presentation concerns.

pub mod format;

pub use format::*;
