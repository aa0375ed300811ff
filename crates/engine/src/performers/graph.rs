//! Create or edit a graph.
//!
//! Only the graph's column selection and layout live in the state; the
//! renderer reads them from there.

use std::collections::BTreeSet;

use super::StepPerformer;
use crate::code_chunk::CodeChunk;
use crate::error::StepError;
use crate::graph::GraphRecord;
use crate::state::TabularState;
use crate::step::{get_param, to_param_value, ExecutionData, Params};

pub struct GraphStepPerformer;

impl StepPerformer for GraphStepPerformer {
    fn step_type(&self) -> &'static str {
        "graph"
    }

    fn step_version(&self) -> u32 {
        1
    }

    /// Editing an existing graph only needs the fields that change.
    fn saturate(&self, prev_state: &TabularState, mut params: Params) -> Result<Params, StepError> {
        let graph_id: String = get_param(&params, "graph_id")?;

        let existing = match prev_state.graph(&graph_id) {
            Some(record) => to_param_value(record)?,
            None => serde_json::json!({
                "safety_filter_turned_on_by_user": true,
                "x_axis_column_ids": [],
                "y_axis_column_ids": [],
            }),
        };

        if let Some(existing) = existing.as_object() {
            for (key, value) in existing {
                if !params.contains_key(key) {
                    params.insert(key.clone(), value.clone());
                }
            }
        }

        Ok(params)
    }

    fn execute(
        &self,
        prev_state: &TabularState,
        params: &Params,
    ) -> Result<(TabularState, Option<ExecutionData>), StepError> {
        let record = GraphRecord {
            graph_id: get_param(params, "graph_id")?,
            graph_type: get_param(params, "graph_type")?,
            sheet_index: get_param(params, "sheet_index")?,
            safety_filter_turned_on_by_user: get_param(params, "safety_filter_turned_on_by_user")?,
            x_axis_column_ids: get_param(params, "x_axis_column_ids")?,
            y_axis_column_ids: get_param(params, "y_axis_column_ids")?,
            height: get_param(params, "height")?,
            width: get_param(params, "width")?,
        };

        let column_ids = prev_state.column_ids().sheet(record.sheet_index)?;
        let unknown = record
            .x_axis_column_ids
            .iter()
            .chain(&record.y_axis_column_ids)
            .find(|id| !column_ids.contains(id));
        if let Some(column_id) = unknown {
            return Err(StepError::UnknownColumn {
                sheet_index: record.sheet_index,
                column_id: column_id.clone(),
            });
        }

        // Graphs never touch sheet data
        let mut post_state = prev_state.copy(&[]);
        post_state.set_graph(record);

        Ok((post_state, None))
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

    fn get_modified_dataframe_indexes(&self, _params: &Params) -> Result<BTreeSet<usize>, StepError> {
        Ok(BTreeSet::new())
    }
}
