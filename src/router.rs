//! Cold-start router: selects an initial workflow from free-text input when
//! a session's stack is empty.

use async_trait::async_trait;

use crate::domain::Workflow;
use crate::error::Result;

/// Selects the best-matching workflow for a user's initial query. An
/// injected trait object so this can later be swapped for an LLM- or
/// retrieval-backed implementation without touching
/// [`crate::engine::WorkflowEngine`] or [`crate::chat::ChatService`].
#[async_trait]
pub trait WorkflowRouter: Send + Sync {
    /// Returns `(workflow_id, confidence)` for the best match, or `None` if
    /// nothing clears the router's threshold.
    async fn find_best_workflow(&self, user_query: &str) -> Result<Option<(String, f32)>>;
}

/// Deterministic keyword-overlap router: scores each known workflow's
/// title and trigger keywords against the query's lowercased word set,
/// returning the highest-scoring match above `min_confidence`.
///
/// When exactly one workflow is registered, it is returned unconditionally
/// with confidence 1.0 - mirroring the original source's `MockWorkflowRouter`
/// stub for a single-workflow catalog, generalized to score across many.
pub struct KeywordOverlapRouter {
    candidates: Vec<RoutableWorkflow>,
    min_confidence: f32,
}

struct RoutableWorkflow {
    workflow_id: String,
    keywords: Vec<String>,
}

impl KeywordOverlapRouter {
    pub fn new(workflows: &[Workflow], min_confidence: f32) -> Self {
        let candidates = workflows
            .iter()
            .map(|w| {
                let mut keywords: Vec<String> = w.title.to_lowercase().split_whitespace().map(str::to_string).collect();
                keywords.push(w.name.to_lowercase());
                RoutableWorkflow { workflow_id: w.name.clone(), keywords }
            })
            .collect();
        Self { candidates, min_confidence }
    }

    fn score(&self, query_words: &[String], candidate: &RoutableWorkflow) -> f32 {
        if candidate.keywords.is_empty() {
            return 0.0;
        }
        let hits = candidate.keywords.iter().filter(|kw| query_words.iter().any(|w| w == *kw)).count();
        hits as f32 / candidate.keywords.len() as f32
    }
}

#[async_trait]
impl WorkflowRouter for KeywordOverlapRouter {
    async fn find_best_workflow(&self, user_query: &str) -> Result<Option<(String, f32)>> {
        if self.candidates.len() == 1 {
            return Ok(Some((self.candidates[0].workflow_id.clone(), 1.0)));
        }

        let query_words: Vec<String> = user_query.to_lowercase().split_whitespace().map(str::to_string).collect();

        let best = self
            .candidates
            .iter()
            .map(|c| (c, self.score(&query_words, c)))
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

        match best {
            Some((candidate, score)) if score >= self.min_confidence => {
                Ok(Some((candidate.workflow_id.clone(), score)))
            }
            _ => Ok(None),
        }
    }
}

/// A fixed single-answer router, mirroring the original source's
/// `MockWorkflowRouter`. Useful for tests and demos where routing itself
/// is not under test.
pub struct FixedWorkflowRouter {
    answer: Option<(String, f32)>,
}

impl FixedWorkflowRouter {
    pub fn always(workflow_id: impl Into<String>) -> Self {
        Self { answer: Some((workflow_id.into(), 1.0)) }
    }

    pub fn never() -> Self {
        Self { answer: None }
    }
}

#[async_trait]
impl WorkflowRouter for FixedWorkflowRouter {
    async fn find_best_workflow(&self, _user_query: &str) -> Result<Option<(String, f32)>> {
        Ok(self.answer.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Step, StepType};

    fn workflow(name: &str, title: &str) -> Workflow {
        Workflow::new(name, title, "s1").with_step(Step::new("s1", StepType::Instruction, "go"))
    }

    #[tokio::test]
    async fn single_registered_workflow_always_matches() {
        let router = KeywordOverlapRouter::new(&[workflow("troubleshoot_lukewarm_water", "Fix Lukewarm Water")], 0.5);
        let result = router.find_best_workflow("my water is cold").await.unwrap();
        assert_eq!(result, Some(("troubleshoot_lukewarm_water".to_string(), 1.0)));
    }

    #[tokio::test]
    async fn picks_highest_scoring_workflow_among_several() {
        let router = KeywordOverlapRouter::new(
            &[
                workflow("troubleshoot_lukewarm_water", "Fix Lukewarm Water"),
                workflow("troubleshoot_no_power", "Fix No Power Outlet"),
            ],
            0.2,
        );
        let result = router.find_best_workflow("the water heater is lukewarm").await.unwrap();
        assert_eq!(result.unwrap().0, "troubleshoot_lukewarm_water");
    }

    #[tokio::test]
    async fn returns_none_below_confidence_threshold() {
        let router = KeywordOverlapRouter::new(
            &[
                workflow("troubleshoot_lukewarm_water", "Fix Lukewarm Water"),
                workflow("troubleshoot_no_power", "Fix No Power Outlet"),
            ],
            0.9,
        );
        let result = router.find_best_workflow("completely unrelated request").await.unwrap();
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn fixed_router_always_returns_configured_answer() {
        let router = FixedWorkflowRouter::always("troubleshoot_lukewarm_water");
        let result = router.find_best_workflow("anything at all").await.unwrap();
        assert_eq!(result.unwrap().0, "troubleshoot_lukewarm_water");

        let none_router = FixedWorkflowRouter::never();
        assert_eq!(none_router.find_best_workflow("anything").await.unwrap(), None);
    }
}
