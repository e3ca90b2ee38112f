use std::env;
use std::fs;
use std::path::Path;

use cohort_core::config::{resolve_config_path, AppConfig};
use toml::Value;

use crate::GlobalArgs;

pub fn run(global: &GlobalArgs) -> String {
    let config = match AppConfig::load(global.load_options()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = resolve_config_path(global.config.as_deref());
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let fields: [(&str, String, &[&str], bool); 10] = [
        (
            "data.invoices_path",
            config.data.invoices_path.display().to_string(),
            &["COHORT_DATA_INVOICES_PATH"],
            global.invoices.is_some(),
        ),
        (
            "data.recommendations_path",
            config.data.recommendations_path.display().to_string(),
            &["COHORT_DATA_RECOMMENDATIONS_PATH"],
            global.recommendations.is_some(),
        ),
        (
            "scoring.reference_date",
            config.scoring.reference_date.to_string(),
            &["COHORT_SCORING_REFERENCE_DATE"],
            global.reference_date.is_some(),
        ),
        (
            "scoring.profit_rate",
            config.scoring.profit_rate.to_string(),
            &["COHORT_SCORING_PROFIT_RATE"],
            global.profit_rate.is_some(),
        ),
        (
            "export.rfm_path",
            config.export.rfm_path.display().to_string(),
            &["COHORT_EXPORT_RFM_PATH"],
            false,
        ),
        (
            "export.delimiter",
            config.export.delimiter.escape_default().to_string(),
            &["COHORT_EXPORT_DELIMITER"],
            false,
        ),
        (
            "server.bind_address",
            config.server.bind_address.clone(),
            &["COHORT_SERVER_BIND_ADDRESS"],
            false,
        ),
        ("server.port", config.server.port.to_string(), &["COHORT_SERVER_PORT"], false),
        (
            "logging.level",
            config.logging.level.clone(),
            &["COHORT_LOGGING_LEVEL", "COHORT_LOG_LEVEL"],
            global.log_level.is_some(),
        ),
        (
            "logging.format",
            format!("{:?}", config.logging.format),
            &["COHORT_LOGGING_FORMAT", "COHORT_LOG_FORMAT"],
            false,
        ),
    ];

    let mut lines =
        vec!["effective config (source precedence: flag > env > file > default):".to_string()];
    for (key_path, value, env_keys, from_flag) in fields {
        let source = field_source(
            key_path,
            env_keys,
            from_flag,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(key_path, &value, source));
    }

    lines.join("\n")
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let raw = fs::read_to_string(path?).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    from_flag: bool,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if from_flag {
        return "flag".to_string();
    }

    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
