use thiserror::Error;

/// Errors raised while saturating, executing or replaying a step.
///
/// Any of these aborts the whole step: nothing is appended to the ledger and
/// the previous state stays current.
#[derive(Debug, Error)]
pub enum StepError {
    /// A required param is missing or has the wrong shape.
    #[error("invalid parameter '{param}': {reason}")]
    InvalidParameter { param: String, reason: String },

    /// A bulk filter condition tag that the transition matrix does not know.
    #[error("invalid bulk filter with condition '{0}'")]
    InvalidFilterCondition(String),

    #[error("unknown step type '{0}'")]
    UnknownStepType(String),

    #[error("step '{step_type}' version {found} is newer than supported version {supported}")]
    UnsupportedStepVersion {
        step_type: String,
        found: u32,
        supported: u32,
    },

    #[error("no sheet at index {0}")]
    UnknownSheet(usize),

    #[error("no column '{column_id}' in sheet {sheet_index}")]
    UnknownColumn { sheet_index: usize, column_id: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StepError {
    pub fn missing(param: &str) -> Self {
        StepError::InvalidParameter {
            param: param.to_string(),
            reason: "missing".to_string(),
        }
    }

    /// Stable error code, used by front-ends that map errors to messages.
    pub fn code(&self) -> &'static str {
        match self {
            StepError::InvalidParameter { .. } => "invalid_parameter",
            StepError::InvalidFilterCondition(_) => "invalid_filter_condition",
            StepError::UnknownStepType(_) => "unknown_step_type",
            StepError::UnsupportedStepVersion { .. } => "unsupported_step_version",
            StepError::UnknownSheet(_) => "unknown_sheet",
            StepError::UnknownColumn { .. } => "unknown_column",
            StepError::Serialization(_) => "serialization",
        }
    }
}
