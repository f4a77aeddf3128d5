//! Exit status and error rendering for failed commands

use crate::OutputFormat;
use coastwalk_cli::output::Status;
use coastwalk_core::error::exit_codes;
use coastwalk_geo::GeoError;
use coastwalk_resolver::ResolveError;
use coastwalk_store::StoreError;
use owo_colors::OwoColorize;

/// Map the root cause of a command failure onto a process exit code
pub fn code_for(error: &anyhow::Error) -> i32 {
    for cause in error.chain() {
        if let Some(e) = cause.downcast_ref::<coastwalk_core::Error>() {
            return e.exit_code();
        }
        if let Some(e) = cause.downcast_ref::<ResolveError>() {
            return match e {
                ResolveError::NoRegionData { .. } => exit_codes::NO_REGION_DATA,
                ResolveError::Cache(e) => e.exit_code(),
                ResolveError::Store(e) => store_code(e),
            };
        }
        if let Some(e) = cause.downcast_ref::<StoreError>() {
            return store_code(e);
        }
        if cause.downcast_ref::<GeoError>().is_some() {
            return exit_codes::MALFORMED_INPUT;
        }
    }
    exit_codes::FAILURE
}

fn store_code(error: &StoreError) -> i32 {
    match error {
        StoreError::NotConfigured(_) => exit_codes::CONFIG_ERROR,
        StoreError::NotFound { .. } => exit_codes::NO_REGION_DATA,
        _ => exit_codes::STORE_UNAVAILABLE,
    }
}

/// Print a failed command's error to stderr
pub fn report(error: &anyhow::Error, format: OutputFormat) {
    match format {
        OutputFormat::Json => eprintln!("{}", json_report(error)),
        OutputFormat::Text => match error.downcast_ref::<coastwalk_core::Error>() {
            Some(e) => Status::report(e),
            None => eprintln!("{} {:#}", "Error:".red().bold(), error),
        },
    }
}

/// Machine-readable form of a failure, with the exit code it maps to
pub fn json_report(error: &anyhow::Error) -> serde_json::Value {
    let mut value = match error.downcast_ref::<coastwalk_core::Error>() {
        Some(e) => serde_json::to_value(e.to_report()).unwrap_or_default(),
        None => serde_json::json!({ "message": format!("{:#}", error) }),
    };
    value["exit_code"] = code_for(error).into();
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_codes_follow_root_cause() {
        let no_data: anyhow::Error = ResolveError::NoRegionData {
            region_code: "JP-13".into(),
            attempted: vec!["JP-13".into()],
        }
        .into();
        assert_eq!(code_for(&no_data), exit_codes::NO_REGION_DATA);

        let config: anyhow::Error = coastwalk_core::Error::invalid_config("store.bucket", "empty").into();
        assert_eq!(code_for(&config), exit_codes::CONFIG_ERROR);

        let geo = Err::<(), _>(GeoError::InvalidRegionCode("JP-99".into()))
            .context("checking position")
            .unwrap_err();
        assert_eq!(code_for(&geo), exit_codes::MALFORMED_INPUT);

        let unconfigured: anyhow::Error = StoreError::NotConfigured("storage_url".into()).into();
        assert_eq!(code_for(&unconfigured), exit_codes::CONFIG_ERROR);

        assert_eq!(code_for(&anyhow::anyhow!("boom")), exit_codes::FAILURE);
    }

    #[test]
    fn test_json_report_carries_code_and_exit_status() {
        let config: anyhow::Error = coastwalk_core::Error::config_not_found("nope.toml").into();
        let value = json_report(&config);
        assert_eq!(value["code_str"], "E3001");
        assert_eq!(value["category"], "Configuration");
        assert_eq!(value["exit_code"], exit_codes::CONFIG_ERROR);
        assert!(value["suggestion"].as_str().unwrap().contains("--config"));

        let other = json_report(&anyhow::anyhow!("boom"));
        assert_eq!(other["message"], "boom");
        assert_eq!(other["exit_code"], exit_codes::FAILURE);
    }
}
