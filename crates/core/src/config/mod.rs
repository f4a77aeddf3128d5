//! Configuration loading and schema definitions
//!
//! `coastwalk.toml` is looked up in the working directory, as a dotfile, and
//! under `.config/`.

mod loader;
mod schema;

pub use loader::Config;
pub use schema::*;
