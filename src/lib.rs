//! Daily archiver for the TGVmax seat availability open data export.
//!
//! Each run downloads the export, stamps it with the request time, encodes
//! it as csv or parquet and writes it as the next numbered file in a flat
//! data directory. A SQLite catalog indexes the snapshots, and the README
//! is regenerated from the archive's coverage.

pub mod archive;
pub mod cli;
pub mod commands;
pub mod config;
pub mod coverage;
pub mod encode;
pub mod error;
pub mod fetch;
pub mod readme;
pub mod report;
pub mod snapshot;
pub mod store;
pub mod util;

pub use error::{Error, Result};
