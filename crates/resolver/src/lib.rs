//! Region resolution for coastwalk.
//!
//! [`RegionResolver`] turns a region code into the merged boundaries and
//! coastline of its grouping, served from a two-tier cache in front of a
//! [`GeometryStore`](coastwalk_store::GeometryStore). [`Tracker`] evaluates
//! a user's position against a resolved region and records newly collected
//! areas.

pub mod error;
pub mod resolve;
pub mod tracker;

pub use error::{ResolveError, ResolveErrorCode, Result};
pub use resolve::{cache_key, RegionPayload, RegionResolver, Resolution, ResponseEnvelope};
pub use tracker::{CheckOutcome, Tracker};
