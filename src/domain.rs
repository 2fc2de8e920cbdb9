//! Domain layer: the immutable, static structure of troubleshooting guides.
//!
//! A [`Workflow`] is a directed graph of [`Step`]s. This module only defines
//! the shape of that graph; nothing here mutates at runtime. Runtime progress
//! through a workflow is tracked separately by [`crate::session::Frame`].

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Classifies step behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepType {
    /// Guidance without a user choice.
    Instruction,
    /// Decision point with predefined options.
    AskChoice,
    /// Collects specific data from the user.
    AskSlot,
    /// Provides contextual information.
    Respond,
    /// Terminal step marking workflow completion.
    End,
    /// Triggers a nested sub-workflow.
    CallWorkflow,
}

/// Visual aid attached to a step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Media {
    pub url: String,
    pub caption: String,
}

/// A potential branch to another workflow (a "smart link").
///
/// Unlike [`StepOption`] (which advances the current workflow), a
/// `WorkflowLink` is a helper workflow offered for completing the *current*
/// step, e.g. "Drain Water Heater" offered from inside "Fix Lukewarm Water".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowLink {
    pub target_workflow_id: String,
    pub title: String,
    pub rationale: String,
    #[serde(default)]
    pub trigger_keywords: Vec<String>,
}

/// A logical outcome for a step of type [`StepType::AskChoice`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepOption {
    /// State key used as `result_value` when this option is selected.
    pub id: String,
    /// Human-readable description shown to the LLM to disambiguate outcomes.
    pub label: String,
    /// Step to transition to when this outcome is selected.
    pub next_step_id: String,
}

/// One node of a workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    pub id: String,
    #[serde(rename = "type")]
    pub step_type: StepType,
    /// Natural-language success criterion for this step.
    pub goal: String,
    #[serde(default)]
    pub background_context: Option<String>,
    #[serde(default)]
    pub media: Option<Media>,
    /// Safety text that must be surfaced before advancing.
    #[serde(default)]
    pub warning: Option<String>,
    #[serde(default)]
    pub suggested_links: Vec<WorkflowLink>,
    #[serde(default)]
    pub options: Vec<StepOption>,
    /// Default linear successor, used when the step has no matching option.
    #[serde(default)]
    pub next_step: Option<String>,
    /// Field name under which a collected value is stored (for `ask_slot`).
    #[serde(default)]
    pub slot_name: Option<String>,
}

impl Step {
    pub fn new(id: impl Into<String>, step_type: StepType, goal: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            step_type,
            goal: goal.into(),
            background_context: None,
            media: None,
            warning: None,
            suggested_links: Vec::new(),
            options: Vec::new(),
            next_step: None,
            slot_name: None,
        }
    }

    pub fn with_background_context(mut self, context: impl Into<String>) -> Self {
        self.background_context = Some(context.into());
        self
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warning = Some(warning.into());
        self
    }

    pub fn with_next_step(mut self, next_step: impl Into<String>) -> Self {
        self.next_step = Some(next_step.into());
        self
    }

    pub fn with_option(mut self, option: StepOption) -> Self {
        self.options.push(option);
        self
    }

    pub fn with_suggested_link(mut self, link: WorkflowLink) -> Self {
        self.suggested_links.push(link);
        self
    }

    /// Looks up the option whose id matches `result_value`, if any.
    pub fn find_option(&self, result_value: &str) -> Option<&StepOption> {
        self.options.iter().find(|opt| opt.id == result_value)
    }
}

/// A directed graph of steps forming a complete troubleshooting guide.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    /// Unique identifier, also used as `target_workflow_id` in links.
    pub name: String,
    pub title: String,
    /// Entry point step id.
    pub start_step: String,
    /// Step id -> Step, for O(1) lookup.
    pub steps: HashMap<String, Step>,
}

impl Workflow {
    pub fn new(name: impl Into<String>, title: impl Into<String>, start_step: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            start_step: start_step.into(),
            steps: HashMap::new(),
        }
    }

    pub fn with_step(mut self, step: Step) -> Self {
        self.steps.insert(step.id.clone(), step);
        self
    }

    pub fn get_step(&self, step_id: &str) -> Option<&Step> {
        self.steps.get(step_id)
    }

    /// Validates the invariants every Workflow is expected to uphold:
    /// `start_step` exists, and every `next_step` / `option.next_step_id`
    /// resolves to a known step. `suggested_links` are not validated here
    /// since they reference other workflows, resolved by the `WorkflowStore`.
    pub fn validate(&self) -> Result<(), String> {
        if !self.steps.contains_key(&self.start_step) {
            return Err(format!(
                "start_step '{}' does not exist in workflow '{}'",
                self.start_step, self.name
            ));
        }
        for step in self.steps.values() {
            if let Some(next) = &step.next_step {
                if !self.steps.contains_key(next) {
                    return Err(format!(
                        "step '{}' references missing next_step '{}'",
                        step.id, next
                    ));
                }
            }
            for option in &step.options {
                if !self.steps.contains_key(&option.next_step_id) {
                    return Err(format!(
                        "step '{}' option '{}' references missing next_step_id '{}'",
                        step.id, option.id, option.next_step_id
                    ));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_workflow() -> Workflow {
        Workflow::new("troubleshoot_lukewarm_water", "Fix Lukewarm Water", "step_01_thermostat")
            .with_step(
                Step::new("step_01_thermostat", StepType::AskChoice, "Determine thermostat setting")
                    .with_option(StepOption {
                        id: "was_low".into(),
                        label: "Thermostat was set too low".into(),
                        next_step_id: "end_success_thermostat".into(),
                    })
                    .with_next_step("step_02_breaker"),
            )
            .with_step(Step::new("step_02_breaker", StepType::Instruction, "Check the breaker"))
            .with_step(Step::new("end_success_thermostat", StepType::End, "Issue resolved"))
    }

    #[test]
    fn validates_well_formed_workflow() {
        assert!(sample_workflow().validate().is_ok());
    }

    #[test]
    fn rejects_dangling_next_step() {
        let mut wf = sample_workflow();
        wf.steps.get_mut("step_02_breaker").unwrap().next_step = Some("missing_step".into());
        assert!(wf.validate().is_err());
    }

    #[test]
    fn rejects_missing_start_step() {
        let wf = Workflow::new("x", "X", "nope");
        assert!(wf.validate().is_err());
    }

    #[test]
    fn finds_option_by_result_value() {
        let wf = sample_workflow();
        let step = wf.get_step("step_01_thermostat").unwrap();
        let opt = step.find_option("was_low").unwrap();
        assert_eq!(opt.next_step_id, "end_success_thermostat");
        assert!(step.find_option("unknown").is_none());
    }

    #[test]
    fn serde_round_trip_preserves_edges_and_option_order() {
        let wf = sample_workflow();
        let json = serde_json::to_string(&wf).unwrap();
        let restored: Workflow = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.start_step, wf.start_step);
        for (id, step) in &wf.steps {
            let restored_step = restored.steps.get(id).unwrap();
            assert_eq!(restored_step.next_step, step.next_step);
            let opt_ids: Vec<_> = step.options.iter().map(|o| o.id.clone()).collect();
            let restored_opt_ids: Vec<_> = restored_step.options.iter().map(|o| o.id.clone()).collect();
            assert_eq!(opt_ids, restored_opt_ids);
        }
    }
}
