pub mod config;
pub mod customers;
pub mod doctor;
pub mod export;
pub mod monthly;
pub mod recommend;
pub mod segment;

use cohort_core::config::AppConfig;
use cohort_core::errors::ApplicationError;
use cohort_core::Dashboard;
use serde::Serialize;
use serde_json::Value;

use crate::GlobalArgs;

pub const EXIT_CONFIG: u8 = 2;
pub const EXIT_LOAD: u8 = 3;
pub const EXIT_SCORING: u8 = 4;
pub const EXIT_EXPORT: u8 = 5;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        Self::success_with_data(command, message, None::<()>)
    }

    /// Success payload carrying the query result under `data`.
    pub fn success_with_data(
        command: &str,
        message: impl Into<String>,
        data: Option<impl Serialize>,
    ) -> Self {
        let data = match data.map(serde_json::to_value).transpose() {
            Ok(data) => data,
            Err(error) => {
                return Self::failure(command, "serialization", error.to_string(), 1);
            }
        };
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            data,
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            data: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    pub fn from_error(command: &str, error: &ApplicationError) -> Self {
        Self::failure(command, error.error_class(), error.to_string(), exit_code_for(error))
    }
}

pub fn exit_code_for(error: &ApplicationError) -> u8 {
    match error {
        ApplicationError::Configuration(_) | ApplicationError::InvalidQuery(_) => EXIT_CONFIG,
        ApplicationError::Load(_) => EXIT_LOAD,
        ApplicationError::Scoring(_) => EXIT_SCORING,
        ApplicationError::Export(_) => EXIT_EXPORT,
    }
}

pub(crate) fn load_config(command: &str, global: &GlobalArgs) -> Result<AppConfig, CommandResult> {
    AppConfig::load(global.load_options()).map_err(|error| {
        CommandResult::from_error(command, &ApplicationError::from(error))
    })
}

/// Loads config, reads both sheets, and scores them; any failure is already
/// rendered as the command's error payload.
pub(crate) fn load_dashboard(
    command: &str,
    global: &GlobalArgs,
) -> Result<(AppConfig, Dashboard), CommandResult> {
    let config = load_config(command, global)?;
    let dashboard =
        Dashboard::load(&config).map_err(|error| CommandResult::from_error(command, &error))?;
    Ok((config, dashboard))
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}
