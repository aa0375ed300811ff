//! Step records and step requests.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::StepError;

/// Params of a step: the saturated input the performer executes from
pub type Params = Map<String, Value>;

/// Facts recorded while a step ran (timings, derived ids)
pub type ExecutionData = Map<String, Value>;

/// One recorded, replayable edit. Immutable once appended to a ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub step_id: String,
    pub step_type: String,
    pub step_version: u32,
    pub params: Params,
    #[serde(default)]
    pub execution_data: Option<ExecutionData>,
}

/// A client's request to run a step. Params may be partial until saturated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepRequest {
    pub step_type: String,
    /// Reusing the id of the current step overwrites that step
    #[serde(default)]
    pub step_id: Option<String>,
    /// Version the params were written for; defaults to the performer's
    #[serde(default)]
    pub step_version: Option<u32>,
    #[serde(default)]
    pub params: Params,
}

impl StepRequest {
    pub fn new(step_type: &str, params: Params) -> Self {
        Self {
            step_type: step_type.to_string(),
            step_id: None,
            step_version: None,
            params,
        }
    }

    pub fn with_step_id(mut self, step_id: &str) -> Self {
        self.step_id = Some(step_id.to_string());
        self
    }
}

pub fn new_step_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Read a required param, rejecting absent or mis-shaped values.
pub fn get_param<T: DeserializeOwned>(params: &Params, key: &str) -> Result<T, StepError> {
    let value = params.get(key).ok_or_else(|| StepError::missing(key))?;
    serde_json::from_value(value.clone()).map_err(|e| StepError::InvalidParameter {
        param: key.to_string(),
        reason: e.to_string(),
    })
}

pub fn to_param_value<T: Serialize>(value: &T) -> Result<Value, StepError> {
    Ok(serde_json::to_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: Value) -> Params {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_get_param_missing_and_wrong_shape() {
        let p = params(json!({"sheet_index": "zero"}));

        let err = get_param::<usize>(&p, "column_id").unwrap_err();
        assert!(matches!(err, StepError::InvalidParameter { ref param, .. } if param == "column_id"));

        let err = get_param::<usize>(&p, "sheet_index").unwrap_err();
        assert_eq!(err.code(), "invalid_parameter");
    }

    #[test]
    fn test_step_request_defaults() {
        let request: StepRequest =
            serde_json::from_str(r#"{"step_type": "bulk_filter"}"#).unwrap();
        assert_eq!(request.step_type, "bulk_filter");
        assert!(request.params.is_empty());
        assert!(request.step_id.is_none());
    }
}
