//! Geometry store selection

use coastwalk_core::config::Config;
use coastwalk_store::{FsGeometryStore, GeometryStore, HttpGeometryStore, StoreConfig, StoreResult};

/// The processed directory or remote object storage, picked per command
pub enum Backend {
    Local(FsGeometryStore),
    Remote(HttpGeometryStore),
}

impl Backend {
    pub fn from_config(config: &Config, remote: bool) -> StoreResult<Self> {
        if remote {
            let store_config = StoreConfig::from_section(&config.schema.store).with_env_overrides();
            Ok(Self::Remote(HttpGeometryStore::with_config(store_config)?))
        } else {
            Ok(Self::Local(FsGeometryStore::new(&config.schema.store.processed_dir)))
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Local(store) => store.root().display().to_string(),
            Self::Remote(store) => format!("bucket {}", store.config().bucket),
        }
    }
}

impl GeometryStore for Backend {
    async fn put_document(&self, path: &str, body: Vec<u8>) -> StoreResult<()> {
        match self {
            Self::Local(store) => store.put_document(path, body).await,
            Self::Remote(store) => store.put_document(path, body).await,
        }
    }

    async fn get_document(&self, path: &str) -> StoreResult<Vec<u8>> {
        match self {
            Self::Local(store) => store.get_document(path).await,
            Self::Remote(store) => store.get_document(path).await,
        }
    }
}
