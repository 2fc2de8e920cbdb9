//! Workflow orchestration layer.
//!
//! [`WorkflowEngine`] is the deterministic state machine ("the manager")
//! that maintains the call stack, delegates step execution to
//! [`crate::executor::StepExecutor`] ("the worker"), and produces a single
//! coherent reply per turn via [`crate::narrator::TransitionNarrator`] when
//! a transition crosses a step boundary.
//!
//! This is strictly request/reply, one executor call plus at most one
//! narrator call per `handle_message`. An earlier internal design let the
//! engine loop and join consecutive executor replies with `" ".join(...)`;
//! that produced disjointed dialogue across a step boundary and was
//! replaced by the narrator.

use std::sync::Arc;

use tracing::warn;

use crate::decision::{Decision, DecisionStatus};
use crate::domain::{StepType, Workflow};
use crate::error::{EngineError, Result};
use crate::executor::StepExecutor;
use crate::narrator::TransitionNarrator;
use crate::session::{SessionState, WorkflowResult, WorkflowResultStatus};
use crate::store::WorkflowStore;
use crate::transition::{StateMachineTransition, TransitionMeta};

/// The deterministic orchestrator tying together step execution, state
/// mutation, and transition narration.
pub struct WorkflowEngine {
    workflows: Arc<dyn WorkflowStore>,
    executor: StepExecutor,
    narrator: TransitionNarrator,
}

impl WorkflowEngine {
    pub fn new(workflows: Arc<dyn WorkflowStore>, executor: StepExecutor, narrator: TransitionNarrator) -> Self {
        Self { workflows, executor, narrator }
    }

    /// Runs one turn against `session`, mutating its stack and history in
    /// place. Requires a non-empty stack; callers on a terminal session must
    /// push an initial frame (via the cold-start router) before calling this.
    pub async fn handle_message(&self, session: &mut SessionState, user_input: Option<&str>) -> Result<Decision> {
        let (workflow_name, step_id) = {
            let frame = session.active_frame().ok_or_else(|| {
                EngineError::InvalidState("cannot handle message: session has no active workflow".to_string())
            })?;
            (frame.workflow_name.clone(), frame.current_step_id.clone())
        };

        let workflow = self.workflows.get(&workflow_name).await?.ok_or_else(|| {
            EngineError::WorkflowNotFound(workflow_name.clone())
        })?;

        let current_step = workflow.get_step(&step_id).ok_or_else(|| EngineError::MalformedWorkflow {
            workflow: workflow_name.clone(),
            reason: format!("current_step_id '{step_id}' does not exist"),
        })?;

        let frame_snapshot = session.active_frame().expect("checked above").clone();
        let decision = self.executor.run_turn(current_step, &frame_snapshot, user_input, &session.history).await;

        // The mailbox on the frame we just executed was read into this turn's
        // prompt; clear it before `apply_decision` mutates the stack, since a
        // POP deposits a *new* result onto the parent frame and must not have
        // this clear wipe it back out.
        if let Some(frame) = session.active_frame_mut() {
            frame.pending_child_result = None;
        }

        let transition = self.apply_decision(session, &workflow, &step_id, &decision).await?;

        let final_decision = self.respond(session, &workflow, current_step, &decision, transition).await?;

        session.append_turn(user_input, &final_decision.reply_to_user);
        Ok(final_decision)
    }

    /// Translates `decision` into a [`StateMachineTransition`], mutating
    /// `session.stack` accordingly. This is the anti-corruption boundary
    /// between what the LLM believes happened ([`DecisionStatus`]) and what
    /// actually happens to the call stack.
    async fn apply_decision(
        &self,
        session: &mut SessionState,
        workflow: &Workflow,
        step_id: &str,
        decision: &Decision,
    ) -> Result<StateMachineTransition> {
        match decision.status {
            DecisionStatus::InProgress | DecisionStatus::GiveUp => {
                if decision.status == DecisionStatus::GiveUp {
                    session.escalated = true;
                }
                Ok(StateMachineTransition::Hold)
            }
            DecisionStatus::Complete => self.advance_or_pop(session, workflow, step_id, decision).await,
            DecisionStatus::CallWorkflow => self.push_child_workflow(session, step_id, decision).await,
        }
    }

    async fn advance_or_pop(
        &self,
        session: &mut SessionState,
        workflow: &Workflow,
        step_id: &str,
        decision: &Decision,
    ) -> Result<StateMachineTransition> {
        let current_step = workflow.get_step(step_id).expect("caller resolved step_id");

        if current_step.step_type == StepType::End {
            return Ok(self.pop_frame(session, workflow, decision));
        }

        let next_step_id = if current_step.step_type == StepType::AskChoice && !current_step.options.is_empty() {
            let selected = decision.result_value.as_deref().and_then(|v| current_step.find_option(v));
            match selected {
                Some(option) => option.next_step_id.clone(),
                None => current_step.next_step.clone().ok_or_else(|| EngineError::MalformedWorkflow {
                    workflow: workflow.name.clone(),
                    reason: format!("step '{step_id}' has no matching option and no default next_step"),
                })?,
            }
        } else {
            current_step.next_step.clone().ok_or_else(|| EngineError::MalformedWorkflow {
                workflow: workflow.name.clone(),
                reason: format!("step '{step_id}' is COMPLETE but has no next_step"),
            })?
        };

        let next_step = workflow.get_step(&next_step_id).ok_or_else(|| EngineError::MalformedWorkflow {
            workflow: workflow.name.clone(),
            reason: format!("step '{step_id}' resolves to missing next step '{next_step_id}'"),
        })?;

        if next_step.step_type == StepType::End {
            return Ok(self.pop_frame(session, workflow, decision));
        }

        let frame = session.active_frame_mut().expect("caller holds active frame");
        frame.current_step_id = next_step_id;
        Ok(StateMachineTransition::Advance)
    }

    /// Pops the current frame. If a parent frame exists, delivers the
    /// child's result into its mailbox.
    fn pop_frame(&self, session: &mut SessionState, completed_workflow: &Workflow, decision: &Decision) -> StateMachineTransition {
        session.stack.pop();

        if let Some(parent) = session.active_frame_mut() {
            parent.pending_child_result = Some(WorkflowResult {
                source_workflow_id: completed_workflow.name.clone(),
                status: WorkflowResultStatus::Success,
                summary: decision.reply_to_user.clone(),
                slots_collected: Default::default(),
            });
        }

        StateMachineTransition::Pop
    }

    async fn push_child_workflow(
        &self,
        session: &mut SessionState,
        step_id: &str,
        decision: &Decision,
    ) -> Result<StateMachineTransition> {
        let Some(target_id) = decision.result_value.as_deref() else {
            warn!(step = %step_id, "CALL_WORKFLOW status without target workflow id");
            return Ok(StateMachineTransition::Hold);
        };

        let Some(target) = self.workflows.get(target_id).await? else {
            warn!(step = %step_id, target = %target_id, "CALL_WORKFLOW target not found");
            return Ok(StateMachineTransition::Hold);
        };

        session.stack.push(crate::session::Frame::new(target.name.clone(), target.start_step.clone()));
        Ok(StateMachineTransition::Push)
    }

    /// Selects the outgoing reply: HOLD returns the executor's decision
    /// unchanged; a transition that lands on a new active step invokes the
    /// narrator to bridge the two. A POP that drains the stack entirely
    /// also returns the executor's decision unchanged - there is no new
    /// step to introduce.
    async fn respond(
        &self,
        session: &SessionState,
        from_workflow: &Workflow,
        from_step: &crate::domain::Step,
        decision: &Decision,
        transition: StateMachineTransition,
    ) -> Result<Decision> {
        match transition {
            StateMachineTransition::Hold => Ok(decision.clone()),
            StateMachineTransition::Pop if session.is_terminal() => Ok(decision.clone()),
            StateMachineTransition::Advance | StateMachineTransition::Push | StateMachineTransition::Pop => {
                let frame = session.active_frame().expect("non-terminal after transition");
                let to_workflow = self.workflows.get(&frame.workflow_name).await?.ok_or_else(|| {
                    EngineError::WorkflowNotFound(frame.workflow_name.clone())
                })?;
                let to_step = to_workflow.get_step(&frame.current_step_id).ok_or_else(|| EngineError::MalformedWorkflow {
                    workflow: frame.workflow_name.clone(),
                    reason: format!("current_step_id '{}' does not exist", frame.current_step_id),
                })?;

                let meta = match transition {
                    StateMachineTransition::Advance => TransitionMeta::advance(decision.reasoning.clone()),
                    StateMachineTransition::Push => {
                        let link = from_step
                            .suggested_links
                            .iter()
                            .find(|l| Some(l.target_workflow_id.as_str()) == decision.result_value.as_deref())
                            .cloned()
                            .unwrap_or_else(|| crate::domain::WorkflowLink {
                                target_workflow_id: to_workflow.name.clone(),
                                title: to_workflow.title.clone(),
                                rationale: decision.reasoning.clone(),
                                trigger_keywords: Vec::new(),
                            });
                        TransitionMeta::push(decision.reasoning.clone(), link)
                    }
                    StateMachineTransition::Pop => {
                        let child_result = WorkflowResult {
                            source_workflow_id: from_workflow.name.clone(),
                            status: WorkflowResultStatus::Success,
                            summary: decision.reply_to_user.clone(),
                            slots_collected: Default::default(),
                        };
                        TransitionMeta::pop(decision.reasoning.clone(), child_result)
                    }
                    StateMachineTransition::Hold => unreachable!("handled above"),
                };

                Ok(self.narrator.introduce(from_step, to_step, &meta, &session.history).await)
            }
        }
    }
}
