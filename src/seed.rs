//! Hardcoded seed workflows.
//!
//! Stands in for the authoring/distillation pipeline that would otherwise
//! turn source HTML troubleshooting guides into [`Workflow`] graphs (see
//! the original source's `data/hardcoded_workflows.py` import stub and
//! `scripts/db_seed_workflows.py`).

use crate::domain::{Step, StepOption, StepType, Workflow, WorkflowLink};

/// The top-level "fix lukewarm water" guide, including the branch point
/// that offers the `drain_water_heater` sub-workflow.
pub fn troubleshoot_lukewarm_water() -> Workflow {
    Workflow::new("troubleshoot_lukewarm_water", "Fix Lukewarm Water", "step_01_thermostat")
        .with_step(
            Step::new(
                "step_01_thermostat",
                StepType::AskChoice,
                "Determine whether the water heater's thermostat is set too low",
            )
            .with_background_context(
                "Most electric water heaters have a thermostat dial behind an access panel, usually set between 120-140F.",
            )
            .with_option(StepOption {
                id: "was_low".into(),
                label: "The thermostat was set too low and has been adjusted".into(),
                next_step_id: "end_success_thermostat".into(),
            })
            .with_next_step("step_02_breaker"),
        )
        .with_step(
            Step::new("step_02_breaker", StepType::Instruction, "Check whether the water heater's breaker has tripped")
                .with_background_context("A partially tripped breaker can starve one heating element while leaving the other running.")
                .with_warning("Turn off the main breaker before touching any wiring.")
                .with_next_step("step_04_sediment"),
        )
        .with_step(
            Step::new(
                "step_04_sediment",
                StepType::Instruction,
                "Determine whether sediment buildup in the tank is blocking proper heating",
            )
            .with_background_context(
                "Sediment settles at the bottom of the tank over time and insulates the lower heating element.",
            )
            .with_suggested_link(WorkflowLink {
                target_workflow_id: "drain_water_heater".into(),
                title: "Drain Water Heater".into(),
                rationale: "Offer this when sediment is suspected and the user needs draining instructions.".into(),
                trigger_keywords: vec!["drain".into(), "sediment".into(), "flush".into()],
            })
            .with_next_step("end_success_sediment"),
        )
        .with_step(Step::new("end_success_thermostat", StepType::End, "Issue resolved: thermostat was misconfigured"))
        .with_step(Step::new("end_success_sediment", StepType::End, "Issue resolved: tank sediment was cleared"))
}

/// The "drain the tank" sub-workflow, offered as a helper from
/// `step_04_sediment` above.
pub fn drain_water_heater() -> Workflow {
    Workflow::new("drain_water_heater", "Drain Water Heater", "drain_step_01_power_off")
        .with_step(
            Step::new("drain_step_01_power_off", StepType::Instruction, "Shut off power and water supply to the heater")
                .with_warning("Shut off the breaker (electric) or gas supply (gas) before draining; never drain a powered heater.")
                .with_next_step("drain_step_02_attach_hose"),
        )
        .with_step(
            Step::new("drain_step_02_attach_hose", StepType::Instruction, "Attach a garden hose to the drain valve and route it to a safe drainage point")
                .with_next_step("drain_step_03_open_valve"),
        )
        .with_step(
            Step::new("drain_step_03_open_valve", StepType::Instruction, "Open the drain valve and a hot water tap to let air into the tank")
                .with_next_step("drain_end_success"),
        )
        .with_step(Step::new("drain_end_success", StepType::End, "Tank drained successfully"))
}

/// All seed workflows, as registered at startup or by the seeding binary.
pub fn all() -> Vec<Workflow> {
    vec![troubleshoot_lukewarm_water(), drain_water_heater()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_seed_workflows_validate() {
        for workflow in all() {
            assert!(workflow.validate().is_ok(), "workflow '{}' failed validation", workflow.name);
        }
    }

    #[test]
    fn lukewarm_water_offers_drain_helper_from_sediment_step() {
        let workflow = troubleshoot_lukewarm_water();
        let step = workflow.get_step("step_04_sediment").unwrap();
        assert_eq!(step.suggested_links.len(), 1);
        assert_eq!(step.suggested_links[0].target_workflow_id, "drain_water_heater");
    }

    #[test]
    fn drain_workflow_carries_safety_warning_on_first_step() {
        let workflow = drain_water_heater();
        let step = workflow.get_step("drain_step_01_power_off").unwrap();
        assert!(step.warning.is_some());
    }
}
