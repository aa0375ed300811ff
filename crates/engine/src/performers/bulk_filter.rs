//! Bulk filter: toggle values into and out of a column's bulk filter.
//!
//! The kept set (`bulk_filter.value`) and the excluded set
//! (`filtered_out_values`) move together. Under IS_EXACTLY they partition the
//! column's distinct values; under IS_NOT_EXACTLY the kept set is the negated
//! operand and mirrors the excluded set. Flipping the condition preserves
//! which values are excluded.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{StepPerformer, PROCESSING_TIME_KEY};
use crate::cell::CellValue;
use crate::code_chunk::CodeChunk;
use crate::column_ids::ColumnId;
use crate::error::StepError;
use crate::filter::{BulkFilter, BulkFilterCondition};
use crate::state::TabularState;
use crate::step::{get_param, to_param_value, ExecutionData, Params};

pub const BULK_FILTER_TOGGLE_SPECIFIC_VALUE: &str = "toggle_specific_value";
pub const BULK_FILTER_TOGGLE_ALL_MATCHING: &str = "toggle_all_matching";
pub const BULK_FILTER_TOGGLE_FILTER_TYPE: &str = "toggle_filter_type";

/// What a bulk filter step toggles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToggleType {
    /// Flip IS_EXACTLY <-> IS_NOT_EXACTLY, keeping the excluded values
    ToggleFilterType,
    /// Move one literal value; `remove_from_dataframe` = exclude it
    ToggleSpecificValue {
        value: CellValue,
        remove_from_dataframe: bool,
    },
    /// Move every distinct value containing `search_string`
    ToggleAllMatching {
        search_string: String,
        remove_from_dataframe: bool,
    },
}

/// Result of a toggle, before it is written into a state
#[derive(Debug, Clone, PartialEq)]
pub struct BulkFilterTransition {
    pub bulk_filter: BulkFilter,
    pub filtered_out_values: Vec<CellValue>,
}

/// Compute the new bulk filter and excluded values.
///
/// `distinct_values` are the column's distinct values in first-seen order;
/// they drive both the IS_NOT_EXACTLY -> IS_EXACTLY flip and the
/// toggle-all-matching search.
pub fn toggle_bulk_filter(
    bulk_filter: &BulkFilter,
    filtered_out_values: &[CellValue],
    toggle_type: &ToggleType,
    distinct_values: &[CellValue],
) -> Result<BulkFilterTransition, StepError> {
    let condition = match &bulk_filter.condition {
        BulkFilterCondition::Unrecognized(tag) => {
            return Err(StepError::InvalidFilterCondition(tag.clone()))
        }
        condition => condition.clone(),
    };

    let (values_to_toggle, remove_from_dataframe) = match toggle_type {
        ToggleType::ToggleFilterType => {
            let value = match condition {
                BulkFilterCondition::IsNotExactly => distinct_values
                    .iter()
                    .filter(|v| !filtered_out_values.contains(v))
                    .cloned()
                    .collect(),
                _ => filtered_out_values.to_vec(),
            };
            let condition = match condition {
                BulkFilterCondition::IsNotExactly => BulkFilterCondition::IsExactly,
                _ => BulkFilterCondition::IsNotExactly,
            };
            return Ok(BulkFilterTransition {
                bulk_filter: BulkFilter { condition, value },
                filtered_out_values: filtered_out_values.to_vec(),
            });
        }
        ToggleType::ToggleSpecificValue { value, remove_from_dataframe } => {
            (vec![value.clone()], *remove_from_dataframe)
        }
        ToggleType::ToggleAllMatching { search_string, remove_from_dataframe } => (
            distinct_values
                .iter()
                .filter(|v| v.matches_search(search_string))
                .cloned()
                .collect(),
            *remove_from_dataframe,
        ),
    };

    let mut kept = bulk_filter.value.clone();
    let mut excluded = filtered_out_values.to_vec();

    for value in values_to_toggle {
        let is_kept = kept.contains(&value);
        match (&condition, remove_from_dataframe, is_kept) {
            (BulkFilterCondition::IsExactly, true, true) => {
                remove_value(&mut kept, &value);
                push_unique(&mut excluded, value);
            }
            (BulkFilterCondition::IsExactly, false, false) => {
                remove_value(&mut excluded, &value);
                push_unique(&mut kept, value);
            }
            (BulkFilterCondition::IsNotExactly, true, false) => {
                push_unique(&mut kept, value.clone());
                push_unique(&mut excluded, value);
            }
            (BulkFilterCondition::IsNotExactly, false, true) => {
                remove_value(&mut kept, &value);
                remove_value(&mut excluded, &value);
            }
            // Already in the requested place
            _ => {}
        }
    }

    Ok(BulkFilterTransition {
        bulk_filter: BulkFilter { condition, value: kept },
        filtered_out_values: excluded,
    })
}

fn push_unique(values: &mut Vec<CellValue>, value: CellValue) {
    if !values.contains(&value) {
        values.push(value);
    }
}

fn remove_value(values: &mut Vec<CellValue>, value: &CellValue) {
    values.retain(|v| v != value);
}

pub struct BulkFilterStepPerformer;

impl StepPerformer for BulkFilterStepPerformer {
    fn step_type(&self) -> &'static str {
        "bulk_filter"
    }

    fn step_version(&self) -> u32 {
        1
    }

    /// Record the column's current bulk filter, so replay toggles from the
    /// same starting point.
    fn saturate(&self, prev_state: &TabularState, mut params: Params) -> Result<Params, StepError> {
        let sheet_index: usize = get_param(&params, "sheet_index")?;
        let column_id: ColumnId = get_param(&params, "column_id")?;
        let column_filter = prev_state.column_filter(sheet_index, &column_id)?;

        if !params.contains_key("bulk_filter") {
            params.insert("bulk_filter".to_string(), to_param_value(&column_filter.bulk_filter)?);
        }
        if !params.contains_key("filtered_out_values") {
            params.insert(
                "filtered_out_values".to_string(),
                to_param_value(&column_filter.filtered_out_values)?,
            );
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
        let toggle_type: ToggleType = get_param(params, "toggle_type")?;
        let bulk_filter: BulkFilter = get_param(params, "bulk_filter")?;
        let filtered_out_values: Vec<CellValue> = get_param(params, "filtered_out_values")?;

        let distinct_values = prev_state.distinct_values(sheet_index, &column_id)?;
        let transition =
            toggle_bulk_filter(&bulk_filter, &filtered_out_values, &toggle_type, &distinct_values)?;

        // Only the toggled sheet gets its own copy
        let mut post_state = prev_state.copy(&[sheet_index]);
        let column_filter = post_state.column_filter_mut(sheet_index, &column_id)?;
        column_filter.bulk_filter = transition.bulk_filter;
        column_filter.filtered_out_values = transition.filtered_out_values;

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
