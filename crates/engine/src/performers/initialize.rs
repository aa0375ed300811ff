//! Step 0 of every session: records which dataframes the session starts from.

use std::collections::BTreeSet;

use super::StepPerformer;
use crate::code_chunk::CodeChunk;
use crate::error::StepError;
use crate::state::TabularState;
use crate::step::{get_param, to_param_value, ExecutionData, Params};

pub struct InitializeStepPerformer;

impl StepPerformer for InitializeStepPerformer {
    fn step_type(&self) -> &'static str {
        "initialize"
    }

    fn step_version(&self) -> u32 {
        1
    }

    fn saturate(&self, prev_state: &TabularState, mut params: Params) -> Result<Params, StepError> {
        if !params.contains_key("df_names") {
            params.insert("df_names".to_string(), to_param_value(&prev_state.df_names())?);
        }
        Ok(params)
    }

    /// Replaying against different data must fail here, not deep in a later
    /// step.
    fn execute(
        &self,
        prev_state: &TabularState,
        params: &Params,
    ) -> Result<(TabularState, Option<ExecutionData>), StepError> {
        let df_names: Vec<String> = get_param(params, "df_names")?;
        if df_names.as_slice() != prev_state.df_names() {
            return Err(StepError::InvalidParameter {
                param: "df_names".to_string(),
                reason: format!(
                    "recorded dataframes {:?} but session has {:?}",
                    df_names,
                    prev_state.df_names()
                ),
            });
        }
        Ok((prev_state.copy(&[]), None))
    }

    fn transpile(
        &self,
        _prev_state: &TabularState,
        _post_state: &TabularState,
        _params: &Params,
        _execution_data: Option<&ExecutionData>,
    ) -> Result<Vec<CodeChunk>, StepError> {
        Ok(Vec::new())
    }

    fn get_modified_dataframe_indexes(&self, params: &Params) -> Result<BTreeSet<usize>, StepError> {
        let df_names: Vec<String> = get_param(params, "df_names")?;
        Ok((0..df_names.len()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::CellValue;
    use crate::frame::DataFrame;
    use serde_json::json;

    fn state() -> TabularState {
        let frame = |header: &str| {
            DataFrame::from_rows(vec![header.to_string()], vec![vec![CellValue::number(1.0)]]).unwrap()
        };
        TabularState::from_frames(vec![
            ("df1".to_string(), frame("A")),
            ("df2".to_string(), frame("B")),
        ])
    }

    fn params(value: serde_json::Value) -> Params {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_saturate_records_df_names_once() {
        let performer = InitializeStepPerformer;
        let saturated = performer.saturate(&state(), Params::new()).unwrap();
        assert_eq!(saturated["df_names"], json!(["df1", "df2"]));

        let recorded = params(json!({"df_names": ["other"]}));
        let again = performer.saturate(&state(), recorded.clone()).unwrap();
        assert_eq!(again, recorded);
    }

    #[test]
    fn test_execute_shares_every_sheet() {
        let prev = state();
        let performer = InitializeStepPerformer;
        let p = performer.saturate(&prev, Params::new()).unwrap();

        let (post, execution_data) = performer.execute(&prev, &p).unwrap();
        assert!(execution_data.is_none());
        assert!(post.shares_sheet_with(&prev, 0));
        assert!(post.shares_sheet_with(&prev, 1));
        assert!(performer.transpile(&prev, &post, &p, None).unwrap().is_empty());
        assert_eq!(
            performer.get_modified_dataframe_indexes(&p).unwrap(),
            BTreeSet::from([0, 1])
        );
    }

    #[test]
    fn test_execute_rejects_other_dataframes() {
        let performer = InitializeStepPerformer;
        let err = performer
            .execute(&state(), &params(json!({"df_names": ["df1", "sales"]})))
            .unwrap_err();
        assert!(matches!(err, StepError::InvalidParameter { ref param, .. } if param == "df_names"));

        let err = performer.execute(&state(), &Params::new()).unwrap_err();
        assert_eq!(err.code(), "invalid_parameter");
    }
}
