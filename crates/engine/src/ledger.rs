//! Step ledger: the ordered history of a session.
//!
//! `steps_including_skipped` holds every step still reachable by redo;
//! `curr_step_idx` marks the last live step. Only `[0, curr_step_idx]` is
//! active history: lookups and saturation never see the redo tail.

use crate::step::Step;

#[derive(Debug, Clone, Default)]
pub struct StepLedger {
    steps_including_skipped: Vec<Step>,
    curr_step_idx: usize,
}

impl StepLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step and make it current, discarding any inert redo tail.
    pub fn push(&mut self, step: Step) {
        if !self.steps_including_skipped.is_empty() {
            self.steps_including_skipped.truncate(self.curr_step_idx + 1);
        }
        self.steps_including_skipped.push(step);
        self.curr_step_idx = self.steps_including_skipped.len() - 1;
    }

    /// Replace the current step in place (same position, same history).
    pub fn replace_current(&mut self, step: Step) {
        if self.steps_including_skipped.is_empty() {
            self.push(step);
            return;
        }
        self.steps_including_skipped.truncate(self.curr_step_idx + 1);
        self.steps_including_skipped[self.curr_step_idx] = step;
    }

    /// Move the cursor back one step. Step 0 can never be undone.
    pub fn undo(&mut self) -> bool {
        if self.curr_step_idx == 0 {
            return false;
        }
        self.curr_step_idx -= 1;
        true
    }

    /// Re-activate the next inert step, if any.
    pub fn redo(&mut self) -> bool {
        if self.curr_step_idx + 1 >= self.steps_including_skipped.len() {
            return false;
        }
        self.curr_step_idx += 1;
        true
    }

    pub fn curr_step_idx(&self) -> usize {
        self.curr_step_idx
    }

    pub fn curr_step(&self) -> Option<&Step> {
        self.steps_including_skipped.get(self.curr_step_idx)
    }

    pub fn steps_including_skipped(&self) -> &[Step] {
        &self.steps_including_skipped
    }

    /// The live history, oldest first
    pub fn active_steps(&self) -> &[Step] {
        if self.steps_including_skipped.is_empty() {
            return &[];
        }
        &self.steps_including_skipped[..=self.curr_step_idx]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::Params;

    fn step(id: &str) -> Step {
        Step {
            step_id: id.to_string(),
            step_type: "t".to_string(),
            step_version: 1,
            params: Params::new(),
            execution_data: None,
        }
    }

    fn ids(steps: &[Step]) -> Vec<&str> {
        steps.iter().map(|s| s.step_id.as_str()).collect()
    }

    #[test]
    fn test_push_moves_cursor() {
        let mut ledger = StepLedger::new();
        assert!(ledger.curr_step().is_none());
        assert!(ledger.active_steps().is_empty());

        ledger.push(step("a"));
        ledger.push(step("b"));
        assert_eq!(ledger.curr_step_idx(), 1);
        assert_eq!(ledger.curr_step().unwrap().step_id, "b");
    }

    #[test]
    fn test_undo_redo_keep_tail_inert() {
        let mut ledger = StepLedger::new();
        ledger.push(step("a"));
        ledger.push(step("b"));
        ledger.push(step("c"));

        assert!(ledger.undo());
        assert_eq!(ids(ledger.active_steps()), vec!["a", "b"]);
        assert_eq!(ledger.steps_including_skipped().len(), 3);
        assert!(ledger.active_steps().iter().all(|s| s.step_id != "c"));

        assert!(ledger.redo());
        assert_eq!(ids(ledger.active_steps()), vec!["a", "b", "c"]);
        assert!(!ledger.redo());
    }

    #[test]
    fn test_cannot_undo_first_step() {
        let mut ledger = StepLedger::new();
        ledger.push(step("init"));
        assert!(!ledger.undo());
        assert_eq!(ledger.curr_step_idx(), 0);
    }

    #[test]
    fn test_push_after_undo_discards_tail() {
        let mut ledger = StepLedger::new();
        ledger.push(step("a"));
        ledger.push(step("b"));
        ledger.undo();
        ledger.push(step("c"));

        assert_eq!(ids(ledger.steps_including_skipped()), vec!["a", "c"]);
        assert!(!ledger.redo());
    }

    #[test]
    fn test_replace_current() {
        let mut ledger = StepLedger::new();
        ledger.push(step("a"));
        ledger.push(step("b"));
        ledger.replace_current(step("b2"));
        assert_eq!(ids(ledger.active_steps()), vec!["a", "b2"]);
    }
}
