//! Configuration file loading

use super::schema::ConfigSchema;
use crate::error::{Error, Result, ResultExt};
use std::path::{Path, PathBuf};

/// Configuration wrapper
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub schema: ConfigSchema,
    pub path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a file path, the standard locations, or defaults
    ///
    /// An explicit path that does not exist is an error; a missing file in
    /// the standard locations is not.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) if !p.exists() => return Err(Error::config_not_found(p)),
            Some(p) => Some(p.to_path_buf()),
            None => find_config_file(Path::new(".")),
        };

        let schema = match &config_path {
            Some(p) => load_config_file(p)?,
            None => ConfigSchema::default(),
        };
        schema.validate()?;

        Ok(Self {
            schema,
            path: config_path,
        })
    }
}

/// Find configuration file in standard locations under `root`
fn find_config_file(root: &Path) -> Option<PathBuf> {
    let candidates = ["coastwalk.toml", ".coastwalk.toml", ".config/coastwalk.toml"];

    candidates
        .iter()
        .map(|c| root.join(c))
        .find(|p| p.exists())
}

/// Load and parse a TOML configuration file
fn load_config_file(path: &Path) -> Result<ConfigSchema> {
    let content = std::fs::read_to_string(path)
        .map_err(Error::from)
        .context(format!("Failed to read config file {}", path.display()))?;

    let schema: ConfigSchema = toml::from_str(&content)?;
    Ok(schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(config.path.is_none());
        assert_eq!(config.schema.cache.memory_capacity, 50);
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let err = Config::load(Some(Path::new("/nonexistent/coastwalk.toml"))).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigNotFound);
    }

    #[test]
    fn test_load_explicit_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("coastwalk.toml");
        std::fs::write(
            &path,
            "[store]\nbase_url = \"https://example.supabase.co\"\nbucket = \"tiles\"\n",
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.path.as_deref(), Some(path.as_path()));
        assert_eq!(
            config.schema.store.base_url.as_deref(),
            Some("https://example.supabase.co")
        );
        assert_eq!(config.schema.store.bucket, "tiles");
    }

    #[test]
    fn test_parse_error_has_code() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("coastwalk.toml");
        std::fs::write(&path, "[cache\nttl_secs = ").unwrap();

        let err = Config::load(Some(&path)).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigParse);
    }

    #[test]
    fn test_find_in_dot_config() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join(".config")).unwrap();
        std::fs::write(temp.path().join(".config/coastwalk.toml"), "").unwrap();

        let found = find_config_file(temp.path()).unwrap();
        assert!(found.ends_with(".config/coastwalk.toml"));
    }
}
