//! Parameter resolver: find the params of the most recent matching step.
//!
//! Used by front-ends that reopen an editor for an existing step (a pivot, a
//! graph) and need the params it was last run with.

use serde::{Deserialize, Serialize};

use crate::error::StepError;
use crate::ledger::StepLedger;
use crate::step::{ExecutionData, Params, Step};

/// Lookup criteria. The execution-data branch only applies when
/// `execution_data_to_match` is non-empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParamsQuery {
    pub step_type: String,
    #[serde(default)]
    pub step_id_to_match: String,
    #[serde(default)]
    pub execution_data_to_match: ExecutionData,
}

/// Walk the active history backwards and return the first step of the
/// queried type that matches by id or by execution data.
///
/// Within one step the id check runs first and the execution-data check may
/// overwrite it; both yield that step's params, so the result is the same.
pub fn find_matching_step<'a>(ledger: &'a StepLedger, query: &ParamsQuery) -> Option<&'a Step> {
    for step in ledger.active_steps().iter().rev() {
        if step.step_type != query.step_type {
            continue;
        }

        let mut found: Option<&Step> = None;

        if step.step_id == query.step_id_to_match {
            found = Some(step);
        }

        if let Some(execution_data) = &step.execution_data {
            if !query.execution_data_to_match.is_empty()
                && execution_data_matches(execution_data, &query.execution_data_to_match)
            {
                found = Some(step);
            }
        }

        if found.is_some() {
            return found;
        }
    }

    None
}

/// Every queried key must be present with an equal value; a missing key is
/// unequal, never a wildcard.
fn execution_data_matches(execution_data: &ExecutionData, to_match: &ExecutionData) -> bool {
    to_match
        .iter()
        .all(|(key, value)| execution_data.get(key) == Some(value))
}

pub fn find_matching_params<'a>(ledger: &'a StepLedger, query: &ParamsQuery) -> Option<&'a Params> {
    find_matching_step(ledger, query).map(|step| &step.params)
}

/// JSON params of the matching step, or the empty string if nothing matches.
pub fn get_params(ledger: &StepLedger, query: &ParamsQuery) -> Result<String, StepError> {
    match find_matching_params(ledger, query) {
        Some(params) => Ok(serde_json::to_string(params)?),
        None => Ok(String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn map(value: Value) -> Params {
        value.as_object().cloned().unwrap()
    }

    fn step(step_type: &str, id: &str, params: Value, exec: Option<Value>) -> Step {
        Step {
            step_id: id.to_string(),
            step_type: step_type.to_string(),
            step_version: 1,
            params: map(params),
            execution_data: exec.map(map),
        }
    }

    fn ledger(steps: Vec<Step>) -> StepLedger {
        let mut ledger = StepLedger::new();
        for s in steps {
            ledger.push(s);
        }
        ledger
    }

    fn query(step_type: &str, id: &str, exec: Value) -> ParamsQuery {
        ParamsQuery {
            step_type: step_type.to_string(),
            step_id_to_match: id.to_string(),
            execution_data_to_match: map(exec),
        }
    }

    fn three_steps() -> StepLedger {
        ledger(vec![
            step("A", "x", json!({"n": 0}), None),
            step("B", "y", json!({"n": 1}), None),
            step("A", "z", json!({"n": 2}), Some(json!({"k": 1}))),
        ])
    }

    #[test]
    fn test_id_match_skips_newer_steps_of_same_type() {
        let ledger = three_steps();
        let result = get_params(&ledger, &query("A", "x", json!({}))).unwrap();
        assert_eq!(result, r#"{"n":0}"#);
    }

    #[test]
    fn test_execution_data_match() {
        let ledger = three_steps();
        let result = get_params(&ledger, &query("A", "nope", json!({"k": 1}))).unwrap();
        assert_eq!(result, r#"{"n":2}"#);

        let miss = get_params(&ledger, &query("A", "nope", json!({"k": 2}))).unwrap();
        assert_eq!(miss, "");
    }

    #[test]
    fn test_every_key_must_match() {
        let ledger = ledger(vec![step(
            "A",
            "x",
            json!({"n": 0}),
            Some(json!({"k": 1, "j": 2})),
        )]);

        assert!(find_matching_step(&ledger, &query("A", "", json!({"k": 1, "j": 2}))).is_some());
        assert!(find_matching_step(&ledger, &query("A", "", json!({"k": 1, "j": 3}))).is_none());
        // Missing key is unequal
        assert!(find_matching_step(&ledger, &query("A", "", json!({"k": 1, "q": 2}))).is_none());
    }

    #[test]
    fn test_no_matching_type_returns_empty() {
        let ledger = three_steps();
        assert_eq!(get_params(&ledger, &query("C", "x", json!({}))).unwrap(), "");
    }

    #[test]
    fn test_most_recent_match_wins() {
        let ledger = ledger(vec![
            step("A", "x", json!({"n": 0}), Some(json!({"k": 1}))),
            step("A", "x", json!({"n": 1}), Some(json!({"k": 1}))),
        ]);
        assert_eq!(
            get_params(&ledger, &query("A", "x", json!({}))).unwrap(),
            r#"{"n":1}"#
        );
    }

    #[test]
    fn test_undone_steps_are_not_searched() {
        let mut ledger = three_steps();
        ledger.undo();
        assert_eq!(get_params(&ledger, &query("A", "z", json!({}))).unwrap(), "");
        ledger.redo();
        assert_eq!(
            get_params(&ledger, &query("A", "z", json!({}))).unwrap(),
            r#"{"n":2}"#
        );
    }
}
