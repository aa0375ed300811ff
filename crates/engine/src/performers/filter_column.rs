//! Replace the simple filters of a column.

use std::collections::BTreeSet;

use serde_json::json;

use super::{StepPerformer, PROCESSING_TIME_KEY};
use crate::code_chunk::CodeChunk;
use crate::column_ids::ColumnId;
use crate::error::StepError;
use crate::filter::{Filter, FilterList, FilterOperator};
use crate::state::TabularState;
use crate::step::{get_param, to_param_value, ExecutionData, Params};

pub struct FilterColumnStepPerformer;

impl StepPerformer for FilterColumnStepPerformer {
    fn step_type(&self) -> &'static str {
        "filter_column"
    }

    fn step_version(&self) -> u32 {
        1
    }

    fn saturate(&self, prev_state: &TabularState, mut params: Params) -> Result<Params, StepError> {
        let sheet_index: usize = get_param(&params, "sheet_index")?;
        let column_id: ColumnId = get_param(&params, "column_id")?;
        let filter_list = &prev_state.column_filter(sheet_index, &column_id)?.filter_list;

        if !params.contains_key("operator") {
            params.insert("operator".to_string(), to_param_value(&filter_list.operator)?);
        }
        if !params.contains_key("filters") {
            params.insert("filters".to_string(), to_param_value(&filter_list.filters)?);
        }

        Ok(params)
    }

    fn execute(
        &self,
        prev_state: &TabularState,
        params: &Params,
    ) -> Result<(TabularState, Option<ExecutionData>), StepError> {
        let sheet_index: usize = get_param(params, "sheet_index")?;
        let column_id: ColumnId = get_param(params, "column_id")?;
        let operator: FilterOperator = get_param(params, "operator")?;
        let filters: Vec<Filter> = get_param(params, "filters")?;

        let mut post_state = prev_state.copy(&[sheet_index]);
        post_state.column_filter_mut(sheet_index, &column_id)?.filter_list = FilterList { operator, filters };

        let processing_time = post_state.reapply_filters(sheet_index)?;

        let mut execution_data = ExecutionData::new();
        execution_data.insert(
            PROCESSING_TIME_KEY.to_string(),
            json!(processing_time.as_secs_f64()),
        );

        Ok((post_state, Some(execution_data)))
    }

    fn transpile(
        &self,
        _prev_state: &TabularState,
        post_state: &TabularState,
        params: &Params,
        _execution_data: Option<&ExecutionData>,
    ) -> Result<Vec<CodeChunk>, StepError> {
        let sheet_index: usize = get_param(params, "sheet_index")?;
        let column_id: ColumnId = get_param(params, "column_id")?;

        Ok(vec![CodeChunk::filter(post_state, sheet_index, &column_id)?])
    }

    fn get_modified_dataframe_indexes(&self, params: &Params) -> Result<BTreeSet<usize>, StepError> {
        Ok(BTreeSet::from([get_param(params, "sheet_index")?]))
    }
}
