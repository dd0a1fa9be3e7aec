//! Configuration loader for file and environment sources
//!
//! A run is configured either by a file whose path is the sole positional
//! CLI argument, or by environment variables. When a file is given it wins
//! and the environment is only consulted for `${VAR}` placeholders.

use super::schema::{
    default_checkpoint_path, default_lookback_hours, AppConfig, ApplicationConfig, BrokerConfig,
    ExportConfig, LoggingConfig, SourceConfig, StateConfig,
};
use super::secret::secret_string;
use crate::domain::errors::ExportError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Environment variable names read by [`load_config_from_env`]
pub mod env_vars {
    pub const MONGO_URL: &str = "MONGO_URL";
    pub const MONGO_COLLECTION: &str = "MONGO_COLLECTION";
    pub const KAFKA_BROKERS: &str = "KAFKA_BROKERS";
    pub const KAFKA_CLIENT_ID: &str = "KAFKA_CLIENT_ID";
    pub const KAFKA_TOPIC: &str = "KAFKA_TOPIC";
    pub const BATCH_SIZE: &str = "BATCH_SIZE";
    pub const INITIAL_RUN: &str = "INITIAL_RUN";
    pub const LOOKBACK_HOURS: &str = "LOOKBACK_HOURS";
    pub const KAFKA_SSL_KEY_PEM: &str = "KAFKA_SSL_KEY_PEM";
    pub const KAFKA_SSL_CERTIFICATE_PEM: &str = "KAFKA_SSL_CERTIFICATE_PEM";
    pub const KAFKA_SSL_CA_PEM: &str = "KAFKA_SSL_CA_PEM";
    pub const LOG_LEVEL: &str = "LOG_LEVEL";
    pub const CHECKPOINT_PATH: &str = "CHECKPOINT_PATH";
    pub const FLUSH_TIMEOUT_SECS: &str = "FLUSH_TIMEOUT_SECS";
    pub const DRY_RUN: &str = "DRY_RUN";
}

/// Load configuration from the file at `path` if given, otherwise from the
/// process environment.
///
/// # Errors
///
/// Returns [`ExportError::Configuration`] for any missing or malformed
/// setting. No I/O against the store or broker happens here.
pub fn resolve_config(path: Option<&str>) -> Result<AppConfig> {
    match path {
        Some(path) => {
            tracing::info!(path = %path, "Loading configuration from file");
            load_config(path)
        }
        None => {
            tracing::info!("Loading configuration from environment");
            load_config_from_env()
        }
    }
}

/// Loads configuration from a JSON or TOML file
///
/// This function:
/// 1. Reads the file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses it as TOML when the extension is `.toml`, JSON otherwise
/// 4. Validates the configuration
///
/// # Examples
///
/// ```no_run
/// use afid_export::config::loader::load_config;
///
/// let config = load_config("export.json").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<AppConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(ExportError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        ExportError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    let contents = substitute_env_vars(&contents)?;

    let is_toml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("toml"))
        .unwrap_or(false);

    let config: AppConfig = if is_toml {
        toml::from_str(&contents)?
    } else {
        serde_json::from_str(&contents)
            .map_err(|e| ExportError::Configuration(format!("Failed to parse JSON: {e}")))?
    };

    config.validate().map_err(|e| {
        ExportError::Configuration(format!("Configuration validation failed: {e}"))
    })?;

    Ok(config)
}

/// Loads configuration from the process environment
pub fn load_config_from_env() -> Result<AppConfig> {
    config_from_lookup(|name| std::env::var(name).ok())
}

/// Builds configuration from an arbitrary variable lookup
///
/// Empty values count as unset.
pub fn config_from_lookup<F>(lookup: F) -> Result<AppConfig>
where
    F: Fn(&str) -> Option<String>,
{
    use env_vars::*;

    let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
    let required = |name: &str| {
        get(name).ok_or_else(|| {
            ExportError::Configuration(format!("{name} environment variable is required"))
        })
    };

    let batch_size: usize = parse_number(BATCH_SIZE, &required(BATCH_SIZE)?)?;

    let config = AppConfig {
        application: ApplicationConfig {
            log_level: get(LOG_LEVEL)
                .map(|l| l.to_lowercase())
                .unwrap_or_else(|| ApplicationConfig::default().log_level),
        },
        source: SourceConfig {
            connection_string: secret_string(required(MONGO_URL)?),
            collection: required(MONGO_COLLECTION)?,
        },
        broker: BrokerConfig {
            brokers: required(KAFKA_BROKERS)?,
            client_id: required(KAFKA_CLIENT_ID)?,
            topic: required(KAFKA_TOPIC)?,
            flush_timeout_secs: match get(FLUSH_TIMEOUT_SECS) {
                Some(raw) => parse_number(FLUSH_TIMEOUT_SECS, &raw)?,
                None => 30,
            },
            ssl_key_pem: get(KAFKA_SSL_KEY_PEM).map(secret_string),
            ssl_certificate_pem: get(KAFKA_SSL_CERTIFICATE_PEM),
            ssl_ca_pem: get(KAFKA_SSL_CA_PEM),
        },
        export: ExportConfig {
            batch_size,
            initial_run: match get(INITIAL_RUN) {
                Some(raw) => parse_bool(INITIAL_RUN, &raw)?,
                None => false,
            },
            lookback_hours: match get(LOOKBACK_HOURS) {
                Some(raw) => parse_number(LOOKBACK_HOURS, &raw)?,
                None => default_lookback_hours(),
            },
            dry_run: match get(DRY_RUN) {
                Some(raw) => parse_bool(DRY_RUN, &raw)?,
                None => false,
            },
        },
        state: StateConfig {
            checkpoint_path: get(CHECKPOINT_PATH).unwrap_or_else(default_checkpoint_path),
        },
        logging: LoggingConfig::default(),
    };

    config.validate().map_err(|e| {
        ExportError::Configuration(format!("Configuration validation failed: {e}"))
    })?;

    Ok(config)
}

fn parse_number<T: FromStr>(name: &str, raw: &str) -> Result<T> {
    raw.trim().parse().map_err(|_| {
        ExportError::Configuration(format!(
            "{name} environment variable '{raw}' is not a valid integer"
        ))
    })
}

fn parse_bool(name: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ExportError::Configuration(format!(
            "{name} environment variable '{raw}' is not a valid boolean"
        ))),
    }
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// # Errors
///
/// Returns an error if a referenced environment variable is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| ExportError::Other(format!("Invalid substitution pattern: {e}")))?;
    let mut missing_vars: Vec<String> = Vec::new();

    let result = re.replace_all(input, |caps: &regex::Captures<'_>| {
        let var_name = &caps[1];
        match std::env::var(var_name) {
            Ok(value) => value,
            Err(_) => {
                if !missing_vars.iter().any(|v| v == var_name) {
                    missing_vars.push(var_name.to_string());
                }
                String::new()
            }
        }
    });

    if !missing_vars.is_empty() {
        return Err(ExportError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result.into_owned())
}
