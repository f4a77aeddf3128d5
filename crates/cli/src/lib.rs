//! Terminal helpers for the coastwalk command line
//!
//! - Status messages and error reports
//! - Distance, duration and count formatting
//! - Progress bars for per-region batch work

#![warn(missing_docs)]

pub mod output;
pub mod progress;
