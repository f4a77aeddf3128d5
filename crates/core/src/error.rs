//! Structured errors for the shared infrastructure
//!
//! Library crates keep their own `thiserror` enums. This type covers what
//! lives in this crate (configuration loading and the region cache) and is
//! what the command line renders for operators: a code, a message, optional
//! context and a hint on how to recover.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Error codes, grouped by the thousands digit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // General (1xxx)
    Internal = 1000,

    // IO (2xxx)
    Io = 2000,
    FileNotFound = 2001,
    PermissionDenied = 2002,

    // Configuration (3xxx)
    ConfigNotFound = 3001,
    ConfigParse = 3002,
    InvalidConfigValue = 3003,

    // Geometry (4xxx)
    MalformedInput = 4001,

    // Store (5xxx)
    StoreNotConfigured = 5001,
    NoRegionData = 5002,

    // Cache (6xxx)
    CacheLockPoisoned = 6001,
    CacheSerialization = 6002,
    SessionDirUnavailable = 6003,
}

impl ErrorCode {
    pub fn code(&self) -> u32 {
        *self as u32
    }

    pub fn category(&self) -> &'static str {
        match self.code() / 1000 {
            1 => "General",
            2 => "IO",
            3 => "Configuration",
            4 => "Geometry",
            5 => "Store",
            6 => "Cache",
            _ => "Unknown",
        }
    }

    /// Process exit status for a command failing with this code
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConfigNotFound | Self::ConfigParse | Self::InvalidConfigValue | Self::StoreNotConfigured => {
                exit_codes::CONFIG_ERROR
            }
            Self::MalformedInput => exit_codes::MALFORMED_INPUT,
            Self::NoRegionData => exit_codes::NO_REGION_DATA,
            _ => exit_codes::FAILURE,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{:04}", self.code())
    }
}

#[derive(Error, Debug)]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
    /// What was being done when it failed
    pub context: Option<String>,
    /// How an operator can recover
    pub suggestion: Option<String>,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(ctx) = &self.context {
            write!(f, " ({})", ctx)?;
        }
        Ok(())
    }
}

impl Error {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: None,
            suggestion: None,
            source: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn exit_code(&self) -> i32 {
        self.code.exit_code()
    }

    /// Serializable form for JSON output and logs
    pub fn to_report(&self) -> ErrorReport {
        ErrorReport {
            code: self.code,
            code_str: self.code.to_string(),
            category: self.code.category().to_string(),
            message: self.message.clone(),
            context: self.context.clone(),
            suggestion: self.suggestion.clone(),
            source: self.source.as_ref().map(|e| e.to_string()),
        }
    }

    pub fn config_not_found(path: impl AsRef<Path>) -> Self {
        Self::new(
            ErrorCode::ConfigNotFound,
            format!("Configuration file not found: {}", path.as_ref().display()),
        )
        .with_suggestion("Create coastwalk.toml or pass an existing file with --config")
    }

    pub fn invalid_config(field: &str, reason: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::InvalidConfigValue,
            format!("Invalid value for {}: {}", field, reason.into()),
        )
    }

    pub fn malformed_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::MalformedInput, message).with_suggestion("Fetch the raw batch again")
    }

    pub fn store_not_configured() -> Self {
        Self::new(ErrorCode::StoreNotConfigured, "Geometry store is not configured")
            .with_suggestion("Set COASTWALK_STORAGE_URL or [store].base_url in coastwalk.toml")
    }

    pub fn no_region_data(region_code: &str) -> Self {
        Self::new(
            ErrorCode::NoRegionData,
            format!("No processed geometry for {}", region_code),
        )
        .with_suggestion("Run `coastwalk fetch` and `coastwalk process` for the region")
    }

    pub fn lock_poisoned(what: &str) -> Self {
        Self::new(
            ErrorCode::CacheLockPoisoned,
            format!("Failed to acquire {} lock", what),
        )
    }

    /// The session cache directory could not be created
    pub fn session_dir(dir: &Path, source: std::io::Error) -> Self {
        Self::new(
            ErrorCode::SessionDirUnavailable,
            format!("Cannot use session cache directory {}", dir.display()),
        )
        .with_suggestion("Set [cache].session_dir to a writable path or session_enabled = false")
        .with_source(source)
    }
}

/// Serializable error report for logs and JSON output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorReport {
    pub code: ErrorCode,
    pub code_str: String,
    pub category: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

pub type Result<T> = std::result::Result<T, Error>;

/// Exit codes for CLI commands
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const FAILURE: i32 = 1;
    pub const MALFORMED_INPUT: i32 = 2;
    pub const CONFIG_ERROR: i32 = 3;
    pub const NO_REGION_DATA: i32 = 4;
    pub const STORE_UNAVAILABLE: i32 = 5;
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        let code = match err.kind() {
            std::io::ErrorKind::NotFound => ErrorCode::FileNotFound,
            std::io::ErrorKind::PermissionDenied => ErrorCode::PermissionDenied,
            _ => ErrorCode::Io,
        };
        Error::new(code, err.to_string()).with_source(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::new(ErrorCode::CacheSerialization, format!("JSON error: {}", err)).with_source(err)
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::new(ErrorCode::ConfigParse, format!("TOML parse error: {}", err))
            .with_source(err)
    }
}

/// Attach context or a hint to a failing [`Result`]
pub trait ResultExt<T> {
    fn context(self, context: impl Into<String>) -> Result<T>;
    fn with_suggestion(self, suggestion: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_suggestion(self, suggestion: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_suggestion(suggestion))
    }
}
