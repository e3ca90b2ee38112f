use thiserror::Error;

use crate::{config::ConfigError, export::ExportError, loader::LoadError};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ScoringError {
    #[error(
        "quantile cut of `{metric}` into {required} buckets needs at least {required} distinct values, found {available}"
    )]
    InsufficientPopulation { metric: &'static str, required: usize, available: usize },
    #[error("churn rate is zero because every customer has repeat purchases; lifetime value is undefined")]
    ZeroChurnRate,
    #[error("`{metric}` for `{subject}` exceeds the decimal range")]
    Overflow { metric: &'static str, subject: String },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Scoring(#[from] ScoringError),
    #[error("source load failure: {0}")]
    Load(String),
    #[error("export failure: {0}")]
    Export(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
    #[error("invalid query: {0}")]
    InvalidQuery(String),
}

impl From<LoadError> for ApplicationError {
    fn from(value: LoadError) -> Self {
        Self::Load(value.to_string())
    }
}

impl From<ExportError> for ApplicationError {
    fn from(value: ExportError) -> Self {
        Self::Export(value.to_string())
    }
}

impl From<ConfigError> for ApplicationError {
    fn from(value: ConfigError) -> Self {
        Self::Configuration(value.to_string())
    }
}

impl ApplicationError {
    /// Stable machine-readable class used by CLI payloads and HTTP bodies.
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Scoring(ScoringError::InsufficientPopulation { .. }) => "insufficient_population",
            Self::Scoring(ScoringError::ZeroChurnRate) => "division_by_zero",
            Self::Scoring(ScoringError::Overflow { .. }) => "arithmetic_overflow",
            Self::Load(_) => "source_load",
            Self::Export(_) => "export",
            Self::Configuration(_) => "config_validation",
            Self::InvalidQuery(_) => "invalid_query",
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::ServiceUnavailable { .. } => {
                "The customer data could not be loaded or scored. Check the source sheets and reload."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        let message = value.to_string();
        match value {
            ApplicationError::InvalidQuery(_) => {
                Self::BadRequest { message, correlation_id: "unassigned".to_owned() }
            }
            ApplicationError::Scoring(_) | ApplicationError::Load(_) => {
                Self::ServiceUnavailable { message, correlation_id: "unassigned".to_owned() }
            }
            ApplicationError::Export(_) | ApplicationError::Configuration(_) => {
                Self::Internal { message, correlation_id: "unassigned".to_owned() }
            }
        }
    }
}
