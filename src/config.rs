use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow};
use jsonschema::{JSONSchema, ValidationError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_CONFIG_FILE: &str = "rainledger.jsonc";
const SCHEMA_FILE: &str = "rainledger.schema.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub oracle: OracleConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_socket_path() -> PathBuf {
    PathBuf::from("./run/rainledger.sock")
}

fn default_state_path() -> PathBuf {
    PathBuf::from("./state/ledger.json")
}

fn default_channel() -> String {
    "mychannel".to_string()
}

fn default_contract() -> String {
    "welfare".to_string()
}

fn default_identity() -> String {
    "admin".to_string()
}

fn default_wallet_dir() -> PathBuf {
    PathBuf::from("./wallet")
}

fn default_district() -> String {
    "pune".to_string()
}

fn default_recorded_by() -> String {
    "OracleNode-Primary".to_string()
}

fn default_max_rainfall_mm() -> u32 {
    150
}

fn default_enabled_true() -> bool {
    true
}

fn default_logging_dir() -> PathBuf {
    PathBuf::from("./logs")
}

fn default_logging_filter() -> String {
    "info".to_string()
}

fn default_logging_rotation() -> LoggingRotation {
    LoggingRotation::Daily
}

fn default_logging_retention_days() -> usize {
    14
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default = "default_socket_path")]
    pub socket_path: PathBuf,
    #[serde(default = "default_state_path")]
    pub state_path: PathBuf,
    #[serde(default = "default_channel")]
    pub channel: String,
    #[serde(default = "default_contract")]
    pub contract: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            socket_path: default_socket_path(),
            state_path: default_state_path(),
            channel: default_channel(),
            contract: default_contract(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    #[serde(default = "default_identity")]
    pub identity: String,
    #[serde(default = "default_wallet_dir")]
    pub wallet_dir: PathBuf,
    #[serde(default = "default_district")]
    pub district: String,
    #[serde(default = "default_recorded_by")]
    pub recorded_by: String,
    #[serde(default = "default_max_rainfall_mm")]
    pub max_rainfall_mm: u32,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            identity: default_identity(),
            wallet_dir: default_wallet_dir(),
            district: default_district(),
            recorded_by: default_recorded_by(),
            max_rainfall_mm: default_max_rainfall_mm(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum LoggingRotation {
    Daily,
    Hourly,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_logging_filter")]
    pub filter: String,
    #[serde(default = "default_logging_rotation")]
    pub rotation: LoggingRotation,
    #[serde(default = "default_logging_retention_days")]
    pub retention_days: usize,
    #[serde(default = "default_enabled_true")]
    pub stdout_enabled: bool,
    #[serde(default = "default_enabled_true")]
    pub stderr_warn_enabled: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: default_logging_dir(),
            filter: default_logging_filter(),
            rotation: default_logging_rotation(),
            retention_days: default_logging_retention_days(),
            stdout_enabled: true,
            stderr_warn_enabled: true,
        }
    }
}

impl Config {
    pub fn load(config_path: &Path) -> Result<Self> {
        let config_content = fs::read_to_string(config_path)
            .with_context(|| format!("failed to read {}", config_path.display()))?;
        let config_value: Value = json5::from_str(&config_content)
            .with_context(|| format!("failed to parse {}", config_path.display()))?;

        let config_base = config_path.parent().unwrap_or_else(|| Path::new("."));
        let schema_path = resolve_schema_path(config_base, &config_value)?;
        validate_against_schema(&config_value, &schema_path)?;

        let mut config: Config =
            serde_json::from_value(config_value).context("failed to deserialize config")?;
        config.resolve_paths(config_base);

        Ok(config)
    }

    /// Loads `explicit_path`, or `./rainledger.jsonc` when present, or falls back to defaults.
    pub fn load_or_default(explicit_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit_path {
            return Self::load(path);
        }

        let default_path = Path::new(DEFAULT_CONFIG_FILE);
        if default_path.exists() {
            return Self::load(default_path);
        }

        Ok(Self::default())
    }

    fn resolve_paths(&mut self, config_base: &Path) {
        for path in [
            &mut self.ledger.socket_path,
            &mut self.ledger.state_path,
            &mut self.oracle.wallet_dir,
            &mut self.logging.dir,
        ] {
            if !path.is_absolute() {
                *path = config_base.join(&*path);
            }
        }
    }
}

fn resolve_schema_path(config_base: &Path, config_value: &Value) -> Result<PathBuf> {
    if let Some(path_text) = config_value.get("$schema").and_then(|value| value.as_str()) {
        let configured = PathBuf::from(path_text);
        if configured.is_absolute() {
            return Ok(configured);
        }
        return Ok(config_base.join(&configured));
    }

    let local_default = config_base.join(SCHEMA_FILE);
    if local_default.exists() {
        return Ok(local_default);
    }

    Err(anyhow!(
        "unable to resolve schema path: expected $schema in config or {SCHEMA_FILE} next to it"
    ))
}

fn validate_against_schema(config_value: &Value, schema_path: &Path) -> Result<()> {
    let schema_content = fs::read_to_string(schema_path)
        .with_context(|| format!("failed to read schema {}", schema_path.display()))?;
    let schema: Value = serde_json::from_str(&schema_content)
        .with_context(|| format!("failed to parse schema {}", schema_path.display()))?;

    let compiled =
        JSONSchema::compile(&schema).map_err(|e| anyhow!("failed to compile schema: {e}"))?;

    match compiled.validate(config_value) {
        Ok(()) => Ok(()),
        Err(errors_iter) => {
            let validation_errors: Vec<ValidationError> = errors_iter.collect();
            let messages: Vec<String> = validation_errors
                .into_iter()
                .map(|error| error.to_string())
                .collect();
            Err(anyhow!("config validation failed: {}", messages.join("; ")))
        }
    }
}
