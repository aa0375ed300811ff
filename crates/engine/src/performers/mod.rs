//! Step performers: the unit of work behind every step type.
//!
//! Every performer declares how it saturates omitted params from the previous
//! state, how it executes, how it transpiles, and which sheets it can touch.
//! Dispatch goes through a registry keyed by step type, built once.

pub mod bulk_filter;
pub mod filter_column;
pub mod graph;
pub mod initialize;

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;

use crate::code_chunk::CodeChunk;
use crate::error::StepError;
use crate::state::TabularState;
use crate::step::{ExecutionData, Params};

/// Execution-data key of the time spent re-filtering, in seconds
pub const PROCESSING_TIME_KEY: &str = "pandas_processing_time";

pub trait StepPerformer: Send + Sync {
    /// Stable tag used for dispatch and ledger storage
    fn step_type(&self) -> &'static str;

    /// Params schema version
    fn step_version(&self) -> u32;

    /// Fill params the caller omitted from `prev_state`. Idempotent.
    fn saturate(&self, prev_state: &TabularState, params: Params) -> Result<Params, StepError>;

    /// Produce the next state. Pure in (prev_state, params).
    fn execute(
        &self,
        prev_state: &TabularState,
        params: &Params,
    ) -> Result<(TabularState, Option<ExecutionData>), StepError>;

    /// Describe the transition as code chunks, without re-executing it.
    fn transpile(
        &self,
        prev_state: &TabularState,
        post_state: &TabularState,
        params: &Params,
        execution_data: Option<&ExecutionData>,
    ) -> Result<Vec<CodeChunk>, StepError>;

    /// Sheets this step can possibly modify
    fn get_modified_dataframe_indexes(&self, params: &Params) -> Result<BTreeSet<usize>, StepError>;
}

/// Lookup table from step type to performer
pub struct StepRegistry {
    performers: FxHashMap<&'static str, &'static dyn StepPerformer>,
}

impl StepRegistry {
    fn builtin() -> Self {
        let performers: [&'static dyn StepPerformer; 4] = [
            &initialize::InitializeStepPerformer,
            &filter_column::FilterColumnStepPerformer,
            &bulk_filter::BulkFilterStepPerformer,
            &graph::GraphStepPerformer,
        ];

        Self {
            performers: performers.into_iter().map(|p| (p.step_type(), p)).collect(),
        }
    }

    pub fn get(&self, step_type: &str) -> Result<&'static dyn StepPerformer, StepError> {
        self.performers
            .get(step_type)
            .copied()
            .ok_or_else(|| StepError::UnknownStepType(step_type.to_string()))
    }

    /// Registered step types, sorted
    pub fn step_types(&self) -> Vec<&'static str> {
        let mut types: Vec<_> = self.performers.keys().copied().collect();
        types.sort_unstable();
        types
    }
}

static REGISTRY: Lazy<StepRegistry> = Lazy::new(StepRegistry::builtin);

/// The process-wide performer registry
pub fn registry() -> &'static StepRegistry {
    &REGISTRY
}
