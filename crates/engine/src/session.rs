//! Editing session: the step ledger plus the state after every step.
//!
//! Every step request goes through the same pipeline:
//! 1. look up the performer for the step type
//! 2. saturate the request's params from the current state
//! 3. execute against the current state
//! 4. append the step and its post-state
//!
//! A failure in any stage leaves the session exactly as it was.

use std::collections::BTreeSet;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::code_chunk::{self, CodeChunk, CodeOptions};
use crate::error::StepError;
use crate::frame::DataFrame;
use crate::ledger::StepLedger;
use crate::performers::{registry, StepPerformer, StepRegistry};
use crate::resolver::{self, ParamsQuery};
use crate::state::TabularState;
use crate::step::{new_step_id, ExecutionData, Params, Step, StepRequest};

/// Saved analysis format version
/// Increment when the layout changes in a way older readers can't load
pub const ANALYSIS_FORMAT_VERSION: u32 = 1;

/// Persisted form of a session: the active steps, already saturated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedAnalysis {
    pub format_version: u32,
    pub steps: Vec<Step>,
}

pub struct Session {
    ledger: StepLedger,
    /// Post-state of each entry in `ledger.steps_including_skipped()`
    states: Vec<TabularState>,
    /// State the first step runs against
    base_state: TabularState,
    registry: &'static StepRegistry,
}

impl Session {
    /// Start a session over named dataframes. Runs the initialize step.
    pub fn new(frames: Vec<(String, DataFrame)>) -> Result<Self, StepError> {
        let mut session = Self::empty(frames);
        session.handle_step(StepRequest::new("initialize", Params::new()))?;
        Ok(session)
    }

    fn empty(frames: Vec<(String, DataFrame)>) -> Self {
        Self {
            ledger: StepLedger::new(),
            states: Vec::new(),
            base_state: TabularState::from_frames(frames),
            registry: registry(),
        }
    }

    /// Rebuild a session by re-executing saved steps from their saved params.
    ///
    /// Saved params are already saturated, so saturation is skipped: each
    /// step starts from exactly the inputs it was recorded with.
    pub fn replay(frames: Vec<(String, DataFrame)>, saved: &SavedAnalysis) -> Result<Self, StepError> {
        let mut session = Self::empty(frames);

        if saved.steps.first().map(|s| s.step_type.as_str()) != Some("initialize") {
            return Err(StepError::InvalidParameter {
                param: "steps".to_string(),
                reason: "saved analysis must start with an initialize step".to_string(),
            });
        }

        for step in &saved.steps {
            let performer = session.performer_for(&step.step_type, Some(step.step_version))?;
            let (post_state, execution_data) = performer.execute(session.curr_state(), &step.params)?;
            session.append(
                Step {
                    step_id: step.step_id.clone(),
                    step_type: step.step_type.clone(),
                    step_version: step.step_version,
                    params: step.params.clone(),
                    execution_data,
                },
                post_state,
            );
        }

        debug!("replayed {} steps", saved.steps.len());
        Ok(session)
    }

    fn performer_for(
        &self,
        step_type: &str,
        step_version: Option<u32>,
    ) -> Result<&'static dyn StepPerformer, StepError> {
        let performer = self.registry.get(step_type)?;
        let supported = performer.step_version();
        match step_version {
            Some(found) if found > supported => Err(StepError::UnsupportedStepVersion {
                step_type: step_type.to_string(),
                found,
                supported,
            }),
            _ => Ok(performer),
        }
    }

    /// Saturate, execute and record a step.
    ///
    /// If the request reuses the id of the current step, the new step
    /// replaces it and runs against the state before it.
    pub fn handle_step(&mut self, request: StepRequest) -> Result<&Step, StepError> {
        let result = self.run_step(request);
        if let Err(e) = &result {
            warn!("step rejected: {e}");
        }
        let (step, post_state, overwrite) = result?;

        debug!(
            "{} step {} ({})",
            if overwrite { "overwrote" } else { "executed" },
            step.step_id,
            step.step_type
        );

        if overwrite {
            let idx = self.ledger.curr_step_idx();
            self.states.truncate(idx + 1);
            self.states[idx] = post_state;
            self.ledger.replace_current(step);
        } else {
            self.append(step, post_state);
        }

        self.ledger
            .curr_step()
            .ok_or_else(|| StepError::missing("step"))
    }

    fn run_step(&self, request: StepRequest) -> Result<(Step, TabularState, bool), StepError> {
        let performer = self.performer_for(&request.step_type, request.step_version)?;

        let overwrite = match (&request.step_id, self.ledger.curr_step()) {
            (Some(id), Some(curr)) => {
                curr.step_id == *id && curr.step_type == request.step_type && self.ledger.curr_step_idx() > 0
            }
            _ => false,
        };

        let prev_state = if overwrite {
            &self.states[self.ledger.curr_step_idx() - 1]
        } else {
            self.curr_state()
        };

        let params = performer.saturate(prev_state, request.params)?;
        let (post_state, execution_data) = performer.execute(prev_state, &params)?;

        let step = Step {
            step_id: request.step_id.unwrap_or_else(new_step_id),
            step_type: performer.step_type().to_string(),
            step_version: request.step_version.unwrap_or_else(|| performer.step_version()),
            params,
            execution_data,
        };

        Ok((step, post_state, overwrite))
    }

    fn append(&mut self, step: Step, post_state: TabularState) {
        if !self.states.is_empty() {
            self.states.truncate(self.ledger.curr_step_idx() + 1);
        }
        self.states.push(post_state);
        self.ledger.push(step);
    }

    pub fn undo(&mut self) -> bool {
        let undone = self.ledger.undo();
        if undone {
            debug!("undo to step {}", self.ledger.curr_step_idx());
        }
        undone
    }

    pub fn redo(&mut self) -> bool {
        let redone = self.ledger.redo();
        if redone {
            debug!("redo to step {}", self.ledger.curr_step_idx());
        }
        redone
    }

    pub fn ledger(&self) -> &StepLedger {
        &self.ledger
    }

    /// Active steps, oldest first
    pub fn steps(&self) -> &[Step] {
        self.ledger.active_steps()
    }

    pub fn curr_step(&self) -> Option<&Step> {
        self.ledger.curr_step()
    }

    pub fn curr_state(&self) -> &TabularState {
        self.states
            .get(self.ledger.curr_step_idx())
            .unwrap_or(&self.base_state)
    }

    /// Params of the most recent matching step, as JSON ("" if none)
    pub fn get_params(&self, query: &ParamsQuery) -> Result<String, StepError> {
        resolver::get_params(&self.ledger, query)
    }

    /// Sheets the current step could have modified
    pub fn modified_dataframe_indexes(&self) -> Result<BTreeSet<usize>, StepError> {
        match self.ledger.curr_step() {
            Some(step) => self
                .registry
                .get(&step.step_type)?
                .get_modified_dataframe_indexes(&step.params),
            None => Ok(BTreeSet::new()),
        }
    }

    /// Code chunks of every active step, in order
    pub fn transpile(&self) -> Result<Vec<CodeChunk>, StepError> {
        let mut chunks = Vec::new();
        for (idx, step) in self.ledger.active_steps().iter().enumerate() {
            let performer = self.registry.get(&step.step_type)?;
            let prev_state = if idx == 0 { &self.base_state } else { &self.states[idx - 1] };
            let execution_data: Option<&ExecutionData> = step.execution_data.as_ref();
            chunks.extend(performer.transpile(prev_state, &self.states[idx], &step.params, execution_data)?);
        }
        Ok(chunks)
    }

    pub fn generated_code(&self, options: CodeOptions) -> Result<Vec<String>, StepError> {
        Ok(code_chunk::render(self.transpile()?, options))
    }

    pub fn to_saved(&self) -> SavedAnalysis {
        SavedAnalysis {
            format_version: ANALYSIS_FORMAT_VERSION,
            steps: self.ledger.active_steps().to_vec(),
        }
    }
}
