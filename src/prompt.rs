//! Prompt assembler: pure functions from `(Step, Frame)` to a system prompt.
//!
//! Both [`build_step_execution_prompt`] and [`build_step_introduction_prompt`]
//! read only their arguments - no hidden state, no I/O - which makes them
//! trivial to golden-file test and to port across languages.

use crate::domain::Step;
use crate::session::{Frame, WorkflowResultStatus};
use crate::transition::{StateMachineTransition, TransitionMeta};

/// Builds the system prompt used by the [`crate::executor::StepExecutor`]
/// for a single step turn.
///
/// Blocks are assembled in a fixed order; each conditional block is omitted
/// entirely (not emitted empty) when its trigger is absent.
pub fn build_step_execution_prompt(step: &Step, frame: &Frame) -> String {
    let mut prompt = String::new();

    // --- Role preamble ---
    prompt.push_str(
        "You are an expert DIY troubleshooting assistant. You are guiding a user through a specific troubleshooting step.\n\n",
    );

    // --- Goal + context ---
    prompt.push_str(&format!("CURRENT STEP GOAL: {}\n", step.goal));
    if let Some(context) = &step.background_context {
        prompt.push_str(&format!("CONTEXT: {context}\n"));
    }
    prompt.push('\n');

    // --- Safety warning ---
    if let Some(warning) = &step.warning {
        prompt.push_str(&format!("CRITICAL SAFETY WARNING: {warning}\n"));
        prompt.push_str("You MUST ensure the user acknowledges this warning before proceeding.\n\n");
    }

    // --- Mailbox (child workflow return) ---
    if let Some(result) = &frame.pending_child_result {
        let status_text = match result.status {
            WorkflowResultStatus::Success => "SUCCESS",
            WorkflowResultStatus::Aborted => "ABORTED",
        };
        prompt.push_str("SYSTEM NOTIFICATION: A sub-task has just finished.\n");
        prompt.push_str(&format!("Sub-task Status: {status_text}\n"));
        prompt.push_str(&format!("Sub-task Summary: {}\n", result.summary));
        prompt.push_str(
            "INSTRUCTION: Welcome the user back. Use this result to decide whether the current step's goal is now satisfied.\n\n",
        );
    }

    // --- Decision rubric ---
    prompt.push_str("INSTRUCTIONS:\n");
    prompt.push_str("1. If the user has satisfied the Goal (or confirmed the action), set status='COMPLETE'.\n");
    prompt.push_str("2. If the user is struggling or asks for help, provide guidance based on the Context.\n");
    prompt.push_str("3. If the user encounters a danger or cannot perform the step, set status='GIVE_UP'.\n");

    // --- Valid outcomes (ask_choice) ---
    if !step.options.is_empty() {
        prompt.push_str("\nVALID OUTCOMES (for 'result_value' when COMPLETE):\n");
        for option in &step.options {
            prompt.push_str(&format!("- ID: '{}' | Description: {}\n", option.id, option.label));
        }
        prompt.push_str("When status is COMPLETE, you MUST set 'result_value' to one of the IDs above.\n");
    }

    // --- Helper workflows ---
    if !step.suggested_links.is_empty() {
        prompt.push_str("\nAVAILABLE HELPER WORKFLOWS:\n");
        prompt.push_str("If the user explicitly asks for help with a related sub-task, you can branch to one of these workflows.\n");
        for link in &step.suggested_links {
            prompt.push_str(&format!("- ID: '{}' | Title: {}\n", link.target_workflow_id, link.title));
            prompt.push_str(&format!("  When to offer: {}\n", link.rationale));
        }
        prompt.push_str("\nTo branch to a helper workflow:\n");
        prompt.push_str("- Set status='CALL_WORKFLOW'\n");
        prompt.push_str("- Set result_value to the workflow ID\n");
        prompt.push_str(
            "IMPORTANT: Only use CALL_WORKFLOW when the user clearly needs or requests the sub-task. Do not proactively suggest branching unless the user is stuck.\n",
        );
    }

    prompt
}

/// Builds the system prompt used by the [`crate::narrator::TransitionNarrator`]
/// after an ADVANCE, PUSH, or POP transition.
pub fn build_step_introduction_prompt(from: &Step, to: &Step, meta: &TransitionMeta) -> String {
    let mut prompt = String::new();

    prompt.push_str(
        "You are an expert DIY troubleshooting assistant. A transition just occurred in the guided troubleshooting flow; introduce the next step in one coherent message.\n\n",
    );

    match meta.transition_type {
        StateMachineTransition::Advance => {
            prompt.push_str(&format!(
                "TRANSITION: The prior step '{}' is complete because: {}\n\n",
                from.goal, meta.reasoning
            ));
        }
        StateMachineTransition::Push => {
            if let Some(link) = &meta.workflow_link {
                prompt.push_str(&format!(
                    "TRANSITION: Branching to sub-workflow '{}': {}\n\n",
                    link.title, link.rationale
                ));
            }
        }
        StateMachineTransition::Pop => {
            if let Some(result) = &meta.child_result {
                prompt.push_str(&format!(
                    "TRANSITION: Sub-workflow '{}' finished with summary: {}\n\n",
                    result.source_workflow_id, result.summary
                ));
            }
        }
        StateMachineTransition::Hold => {
            // The narrator is never invoked on HOLD; nothing to render.
        }
    }

    prompt.push_str("STEP TO INTRODUCE:\n");
    prompt.push_str(&format!("Goal: {}\n", to.goal));
    if let Some(context) = &to.background_context {
        prompt.push_str(&format!("Context: {context}\n"));
    }
    if let Some(warning) = &to.warning {
        prompt.push_str(&format!("Safety warning (surface this prominently): {warning}\n"));
    }

    prompt.push_str("\nReturn status='IN_PROGRESS' - the new step has not yet begun.\n");

    prompt
}
