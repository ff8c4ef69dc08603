//! The two evaluation passes of a filter run.

use tracing::debug;

use crate::condition::{ConditionEvaluator, Evaluation};
use crate::fallback::{BatchQueue, FallbackParser};
use crate::model::{Applicability, EvaluationOutcome, TestCase};
use crate::storage::{normalize_condition_id, ConditionMap};

/// State of one test case after the deterministic pass.
#[derive(Debug, Clone, PartialEq)]
pub enum CaseState {
    Resolved(EvaluationOutcome),
    /// Waiting on the fallback parser; holds the cache key.
    Pending(String),
}

/// Expression text a test case reference stands for.
///
/// Empty and literal references are their own expression. Condition ids resolve
/// through `conditions`; an unknown id is evaluated as written.
pub fn expression_for<'a>(reference: &'a str, conditions: &'a ConditionMap) -> &'a str {
    let reference = reference.trim();
    if reference.is_empty() || Applicability::parse_literal(reference).is_some() {
        return reference;
    }
    match conditions.get(&normalize_condition_id(reference)) {
        Some(definition) => definition.as_str(),
        None => {
            debug!(reference, "no condition definition, evaluating reference as expression");
            reference
        }
    }
}

/// Deterministic pass. Unparsed expressions are answered from the cache when
/// possible, otherwise queued; a full queue is flushed before continuing.
pub async fn first_pass(
    cases: &[TestCase],
    conditions: &ConditionMap,
    evaluator: &ConditionEvaluator<'_>,
    fallback: &FallbackParser,
    queue: &mut BatchQueue,
) -> Vec<CaseState> {
    let mut states = Vec::with_capacity(cases.len());

    for case in cases {
        let expression = expression_for(&case.applicability_condition, conditions);
        let state = match evaluator.evaluate(expression) {
            Evaluation::Resolved(outcome) => CaseState::Resolved(outcome),
            Evaluation::Deferred(key) => {
                if fallback.cache().contains(&key) {
                    queue.record_hit();
                    match fallback.resolve_cached(&key, evaluator) {
                        Some(outcome) => CaseState::Resolved(outcome),
                        None => CaseState::Pending(key),
                    }
                } else {
                    queue.enqueue(key.clone());
                    CaseState::Pending(key)
                }
            }
        };
        states.push(state);

        if queue.is_full() {
            fallback.flush(queue).await;
        }
    }

    states
}

/// Resolve pending cases from the cache. Must run after the final flush.
pub fn second_pass(
    states: Vec<CaseState>,
    evaluator: &ConditionEvaluator<'_>,
    fallback: &FallbackParser,
) -> Vec<EvaluationOutcome> {
    states
        .into_iter()
        .map(|state| match state {
            CaseState::Resolved(outcome) => outcome,
            CaseState::Pending(key) => fallback
                .resolve_cached(&key, evaluator)
                .unwrap_or_else(|| {
                    EvaluationOutcome::new(
                        Applicability::Error,
                        key.as_str(),
                        vec!["Fallback result missing from cache after flush".to_string()],
                    )
                }),
        })
        .collect()
}
