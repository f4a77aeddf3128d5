//! Storage for the coastwalk geometry pipeline
//!
//! - **Geometry documents**: processed boundaries and coastlines per region,
//!   published to and fetched from object storage, a directory tree or memory
//! - **Overpass**: raw batch downloads and their on-disk layout
//! - **Collected areas**: append-only rows of what each user has collected
//!
//! The HTTP store retries transient failures with exponential backoff, trips
//! a circuit breaker during outages and tags every call with a request id.
//!
//! # Example
//!
//! ```rust,no_run
//! use coastwalk_store::{GeometryStore, HttpGeometryStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = HttpGeometryStore::from_env()?;
//!     let coastline = store.fetch_coastline("JP-14").await?;
//!     println!("{} coastline segments", coastline.segment_count());
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod collection;
pub mod config;
pub mod error;
pub mod geometry;
pub mod http;
pub mod overpass;

pub use collection::{CollectedAreaRow, CollectionStore, JsonlCollectionStore, MemoryCollectionStore};
pub use config::{Environment, StoreConfig};
pub use error::{StoreError, StoreErrorCode, StoreResult};
pub use geometry::{FsGeometryStore, GeometryKind, GeometryStore, MemoryGeometryStore};
pub use http::HttpGeometryStore;
pub use overpass::{build_query, OverpassClient, OverpassTarget, RawDataDir};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::collection::{CollectionStore, JsonlCollectionStore, MemoryCollectionStore};
    pub use crate::config::StoreConfig;
    pub use crate::error::{StoreError, StoreResult};
    pub use crate::geometry::{FsGeometryStore, GeometryKind, GeometryStore, MemoryGeometryStore};
    pub use crate::http::HttpGeometryStore;
}
