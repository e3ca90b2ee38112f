use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::analytics::cltv::DEFAULT_PROFIT_RATE;

pub const DEFAULT_CONFIG_FILE: &str = "cohort.toml";
pub const NESTED_CONFIG_FILE: &str = "config/cohort.toml";

#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
    pub data: DataConfig,
    pub scoring: ScoringConfig,
    pub export: ExportConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataConfig {
    pub invoices_path: PathBuf,
    pub recommendations_path: PathBuf,
}

/// Parameters of one scoring run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub reference_date: NaiveDate,
    pub profit_rate: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportConfig {
    pub rfm_path: PathBuf,
    pub delimiter: char,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub invoices_path: Option<PathBuf>,
    pub recommendations_path: Option<PathBuf>,
    pub reference_date: Option<NaiveDate>,
    pub profit_rate: Option<Decimal>,
    pub rfm_export_path: Option<PathBuf>,
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            reference_date: NaiveDate::from_ymd_opt(2024, 3, 10).unwrap_or(NaiveDate::MIN),
            profit_rate: DEFAULT_PROFIT_RATE,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data: DataConfig {
                invoices_path: PathBuf::from("data/invoices.csv"),
                recommendations_path: PathBuf::from("data/recommendations.csv"),
            },
            scoring: ScoringConfig::default(),
            export: ExportConfig { rfm_path: PathBuf::from("rfm.csv"), delimiter: ',' },
            server: ServerConfig { bind_address: "127.0.0.1".to_string(), port: 8080 },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl ExportConfig {
    /// The delimiter as the single byte the CSV writer expects.
    pub fn delimiter_byte(&self) -> u8 {
        u8::try_from(self.delimiter).unwrap_or(b',')
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch)?;
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) -> Result<(), ConfigError> {
        if let Some(data) = patch.data {
            if let Some(invoices_path) = data.invoices_path {
                self.data.invoices_path = invoices_path;
            }
            if let Some(recommendations_path) = data.recommendations_path {
                self.data.recommendations_path = recommendations_path;
            }
        }

        if let Some(scoring) = patch.scoring {
            if let Some(reference_date) = scoring.reference_date {
                self.scoring.reference_date = parse_date("scoring.reference_date", &reference_date)
                    .map_err(|_| {
                        ConfigError::Validation(format!(
                            "scoring.reference_date must be YYYY-MM-DD, got `{reference_date}`"
                        ))
                    })?;
            }
            if let Some(profit_rate) = scoring.profit_rate {
                self.scoring.profit_rate = Decimal::from_str(&profit_rate.to_string())
                    .map_err(|_| {
                        ConfigError::Validation(format!(
                            "scoring.profit_rate must be a finite number, got `{profit_rate}`"
                        ))
                    })?;
            }
        }

        if let Some(export) = patch.export {
            if let Some(rfm_path) = export.rfm_path {
                self.export.rfm_path = rfm_path;
            }
            if let Some(delimiter) = export.delimiter {
                self.export.delimiter = parse_delimiter("export.delimiter", &delimiter)?;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("COHORT_DATA_INVOICES_PATH") {
            self.data.invoices_path = PathBuf::from(value);
        }
        if let Some(value) = read_env("COHORT_DATA_RECOMMENDATIONS_PATH") {
            self.data.recommendations_path = PathBuf::from(value);
        }

        if let Some(value) = read_env("COHORT_SCORING_REFERENCE_DATE") {
            self.scoring.reference_date = parse_date("COHORT_SCORING_REFERENCE_DATE", &value)?;
        }
        if let Some(value) = read_env("COHORT_SCORING_PROFIT_RATE") {
            self.scoring.profit_rate = parse_decimal("COHORT_SCORING_PROFIT_RATE", &value)?;
        }

        if let Some(value) = read_env("COHORT_EXPORT_RFM_PATH") {
            self.export.rfm_path = PathBuf::from(value);
        }
        if let Some(value) = read_env("COHORT_EXPORT_DELIMITER") {
            self.export.delimiter = parse_delimiter("COHORT_EXPORT_DELIMITER", &value)?;
        }

        if let Some(value) = read_env("COHORT_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("COHORT_SERVER_PORT") {
            self.server.port = parse_u16("COHORT_SERVER_PORT", &value)?;
        }

        let log_level = read_env("COHORT_LOGGING_LEVEL").or_else(|| read_env("COHORT_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("COHORT_LOGGING_FORMAT").or_else(|| read_env("COHORT_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(invoices_path) = overrides.invoices_path {
            self.data.invoices_path = invoices_path;
        }
        if let Some(recommendations_path) = overrides.recommendations_path {
            self.data.recommendations_path = recommendations_path;
        }
        if let Some(reference_date) = overrides.reference_date {
            self.scoring.reference_date = reference_date;
        }
        if let Some(profit_rate) = overrides.profit_rate {
            self.scoring.profit_rate = profit_rate;
        }
        if let Some(rfm_export_path) = overrides.rfm_export_path {
            self.export.rfm_path = rfm_export_path;
        }
        if let Some(bind_address) = overrides.bind_address {
            self.server.bind_address = bind_address;
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_data(&self.data)?;
        validate_scoring(&self.scoring)?;
        validate_export(&self.export)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from(NESTED_CONFIG_FILE)]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_data(data: &DataConfig) -> Result<(), ConfigError> {
    if data.invoices_path.as_os_str().is_empty() {
        return Err(ConfigError::Validation("data.invoices_path must not be empty".to_string()));
    }
    if data.recommendations_path.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "data.recommendations_path must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_scoring(scoring: &ScoringConfig) -> Result<(), ConfigError> {
    if scoring.profit_rate <= Decimal::ZERO || scoring.profit_rate > Decimal::ONE {
        return Err(ConfigError::Validation(format!(
            "scoring.profit_rate must be in range (0, 1], got {}",
            scoring.profit_rate
        )));
    }
    Ok(())
}

fn validate_export(export: &ExportConfig) -> Result<(), ConfigError> {
    if !export.delimiter.is_ascii() || export.delimiter == '"' || export.delimiter == '\n' {
        return Err(ConfigError::Validation(
            "export.delimiter must be a single ASCII character other than quote or newline"
                .to_string(),
        ));
    }
    if export.rfm_path.as_os_str().is_empty() {
        return Err(ConfigError::Validation("export.rfm_path must not be empty".to_string()));
    }
    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.bind_address.trim().is_empty() {
        return Err(ConfigError::Validation("server.bind_address must not be empty".to_string()));
    }
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidEnvOverride { key: key.to_string(), value: value.to_string() }
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.trim().parse::<u16>().map_err(|_| invalid(key, value))
}

fn parse_date(key: &str, value: &str) -> Result<NaiveDate, ConfigError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| invalid(key, value))
}

fn parse_decimal(key: &str, value: &str) -> Result<Decimal, ConfigError> {
    Decimal::from_str(value.trim()).map_err(|_| invalid(key, value))
}

fn parse_delimiter(key: &str, value: &str) -> Result<char, ConfigError> {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(delimiter), None) => Ok(delimiter),
        _ if value == "\\t" => Ok('\t'),
        _ => Err(invalid(key, value)),
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    data: Option<DataPatch>,
    scoring: Option<ScoringPatch>,
    export: Option<ExportPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DataPatch {
    invoices_path: Option<PathBuf>,
    recommendations_path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct ScoringPatch {
    reference_date: Option<String>,
    profit_rate: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct ExportPatch {
    rfm_path: Option<PathBuf>,
    delimiter: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::path::PathBuf;
    use std::sync::{Mutex, OnceLock};

    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    fn write_config(dir: &TempDir, body: &str) -> Result<PathBuf, String> {
        let path = dir.path().join("cohort.toml");
        fs::write(&path, body).map_err(|err| err.to_string())?;
        Ok(path)
    }

    #[test]
    fn defaults_match_the_dashboard_run() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let config = AppConfig::load(LoadOptions::default())
            .map_err(|err| format!("config load failed: {err}"))?;

        ensure(
            config.scoring.reference_date == NaiveDate::from_ymd_opt(2024, 3, 10).unwrap_or(NaiveDate::MIN),
            "default reference date should be 2024-03-10",
        )?;
        ensure(config.scoring.profit_rate == Decimal::new(10, 2), "default profit rate is 0.10")?;
        ensure(config.export.delimiter == ',', "default delimiter is a comma")?;
        ensure(matches!(config.logging.format, LogFormat::Compact), "default format is compact")
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_COHORT_DATA_DIR", "/srv/sheets");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = write_config(
                &dir,
                r#"
[data]
invoices_path = "${TEST_COHORT_DATA_DIR}/Sayfa1.csv"
recommendations_path = "${TEST_COHORT_DATA_DIR}/LABONERI.csv"
"#,
            )?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.data.invoices_path == PathBuf::from("/srv/sheets/Sayfa1.csv"),
                "invoice path should be interpolated from environment",
            )?;
            ensure(
                config.data.recommendations_path == PathBuf::from("/srv/sheets/LABONERI.csv"),
                "recommendation path should be interpolated from environment",
            )
        })();

        clear_vars(&["TEST_COHORT_DATA_DIR"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("COHORT_SCORING_PROFIT_RATE", "0.25");
        env::set_var("COHORT_SERVER_PORT", "9090");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = write_config(
                &dir,
                r#"
[scoring]
reference_date = "2024-06-30"
profit_rate = 0.2

[server]
port = 7070

[logging]
level = "warn"
"#,
            )?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.scoring.reference_date
                    == NaiveDate::from_ymd_opt(2024, 6, 30).unwrap_or(NaiveDate::MIN),
                "file reference date should win over default",
            )?;
            ensure(
                config.scoring.profit_rate == Decimal::new(25, 2),
                "env profit rate should win over file",
            )?;
            ensure(config.server.port == 9090, "env port should win over file")?;
            ensure(config.logging.level == "debug", "override log level should win over file")
        })();

        clear_vars(&["COHORT_SCORING_PROFIT_RATE", "COHORT_SERVER_PORT"]);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("COHORT_LOG_LEVEL", "warn");
        env::set_var("COHORT_LOG_FORMAT", "json");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warn log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Json),
                "json logging format should be set from env var",
            )
        })();

        clear_vars(&["COHORT_LOG_LEVEL", "COHORT_LOG_FORMAT"]);
        result
    }

    #[test]
    fn validation_rejects_profit_rate_out_of_range() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let error = match AppConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                profit_rate: Some(Decimal::new(15, 1)),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }) {
            Ok(_) => return Err("expected validation failure but config load succeeded".to_string()),
            Err(error) => error,
        };

        let has_message = matches!(
            error,
            ConfigError::Validation(ref message) if message.contains("scoring.profit_rate")
        );
        ensure(has_message, "validation failure should mention scoring.profit_rate")
    }

    #[test]
    fn malformed_env_date_is_reported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("COHORT_SCORING_REFERENCE_DATE", "10/03/2024");

        let result = match AppConfig::load(LoadOptions::default()) {
            Ok(_) => Err("expected env override failure".to_string()),
            Err(ConfigError::InvalidEnvOverride { key, .. }) => ensure(
                key == "COHORT_SCORING_REFERENCE_DATE",
                "error should name the offending variable",
            ),
            Err(other) => Err(format!("unexpected error: {other}")),
        };

        clear_vars(&["COHORT_SCORING_REFERENCE_DATE"]);
        result
    }

    #[test]
    fn missing_required_file_fails() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let result = AppConfig::load(LoadOptions {
            config_path: Some(PathBuf::from("/nonexistent/cohort.toml")),
            require_file: true,
            ..LoadOptions::default()
        });

        ensure(
            matches!(result, Err(ConfigError::MissingConfigFile(_))),
            "require_file should fail when the file is absent",
        )
    }

    #[test]
    fn tab_delimiter_can_be_spelled_out() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let path = write_config(&dir, "[export]\ndelimiter = \"\\\\t\"\n")?;

        let config =
            AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                .map_err(|err| format!("config load failed: {err}"))?;

        ensure(config.export.delimiter == '\t', "`\\t` should map to a tab")?;
        ensure(config.export.delimiter_byte() == b'\t', "tab should be a single byte")
    }
}
