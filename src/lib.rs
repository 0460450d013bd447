//! `altos-stats` library crate.
//!
//! The binary (`altos`) is a thin wrapper around this library so that:
//!
//! - the lookup pipeline is testable without spawning processes
//! - a web front-end can call `app::pipeline::Pipeline` directly
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod logging;
pub mod plot;
pub mod report;
pub mod series;
