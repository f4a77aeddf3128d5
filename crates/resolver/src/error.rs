//! Error types for region resolution

use coastwalk_store::StoreError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ResolveError>;

#[derive(Error, Debug)]
pub enum ResolveError {
    /// Every region code of the grouping failed to load
    #[error("No geometry available for {region_code} (tried {})", attempted.join(", "))]
    NoRegionData {
        region_code: String,
        attempted: Vec<String>,
    },

    #[error("Cache error: {0}")]
    Cache(#[from] coastwalk_core::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ResolveErrorCode {
    NoRegionData = 30001,
    Cache = 30002,
    Store = 30003,
}

impl ResolveError {
    pub fn code(&self) -> ResolveErrorCode {
        match self {
            Self::NoRegionData { .. } => ResolveErrorCode::NoRegionData,
            Self::Cache(_) => ResolveErrorCode::Cache,
            Self::Store(_) => ResolveErrorCode::Store,
        }
    }

    /// Status an HTTP front end would answer with
    pub fn http_status(&self) -> u16 {
        match self {
            Self::NoRegionData { .. } => 404,
            Self::Store(e) if e.is_unavailable() => 404,
            Self::Cache(_) | Self::Store(_) => 500,
        }
    }

    /// `{"error": message}` body
    pub fn to_envelope(&self) -> serde_json::Value {
        serde_json::json!({ "error": self.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let missing = ResolveError::NoRegionData {
            region_code: "JP-13".to_string(),
            attempted: vec!["JP-13".to_string(), "JP-14".to_string()],
        };
        assert_eq!(missing.http_status(), 404);
        assert_eq!(missing.code() as u32, 30001);
        assert_eq!(
            missing.to_envelope()["error"],
            "No geometry available for JP-13 (tried JP-13, JP-14)"
        );

        let unconfigured = ResolveError::Store(StoreError::NotConfigured("no url".to_string()));
        assert_eq!(unconfigured.http_status(), 500);
    }
}
