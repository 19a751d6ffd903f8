//! # measure
//!
//! Library half of the `measure` binary: the CLI definition and the TOML
//! configuration layer over `measure-core`.

pub mod cli;
pub mod config;

pub use config::{AppConfig, AppError};
