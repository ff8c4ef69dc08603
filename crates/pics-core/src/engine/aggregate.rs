//! Turns per-case outcomes into the run result: reports, matched ids, breakdown
//! and metadata.

use std::collections::BTreeMap;

use crate::model::{
    Applicability, EvaluationOutcome, FallbackStats, FilterResult, RunMetadata, TestCase,
    TestCaseReport,
};
use crate::selections::{d_selections, e_selections};

/// Run inputs recorded in the result metadata.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    /// PICS items in the request, before grammar filtering.
    pub pics_items_count: usize,
    /// Entries in the dictionary actually used for substitution.
    pub dictionary_size: usize,
    /// Condition definitions loaded for the catalog.
    pub conditions_count: usize,
    /// Stored catalog id, or the one echoed from an inline request.
    pub specification_id: Option<String>,
    /// Parser and cache counters for this run.
    pub fallback: FallbackStats,
}

/// 100 minus the percentage of `ERROR` outcomes, two decimals. Empty runs score 100.
pub fn success_rate(outcomes: &[EvaluationOutcome]) -> f64 {
    if outcomes.is_empty() {
        return 100.0;
    }
    let errors = outcomes
        .iter()
        .filter(|o| o.result == Applicability::Error)
        .count();
    let rate = 100.0 - (errors as f64 * 100.0 / outcomes.len() as f64);
    (rate * 100.0).round() / 100.0
}

/// Pair each test case with its outcome, in input order.
pub fn aggregate(
    cases: &[TestCase],
    outcomes: Vec<EvaluationOutcome>,
    summary: RunSummary,
) -> FilterResult {
    debug_assert_eq!(cases.len(), outcomes.len());

    let rate = success_rate(&outcomes);
    let mut breakdown: BTreeMap<String, usize> = BTreeMap::new();
    let mut matched_test_ids = Vec::new();
    let mut reports = Vec::with_capacity(cases.len());

    for (case, outcome) in cases.iter().zip(outcomes) {
        *breakdown.entry(outcome.result.as_str().to_string()).or_insert(0) += 1;
        if outcome.applicable {
            matched_test_ids.push(case.test_id.clone());
        }
        let comment = case.comment.as_deref().unwrap_or_default();
        reports.push(TestCaseReport {
            test_id: case.test_id.clone(),
            applicability_condition: case.applicability_condition.clone(),
            evaluation_result: outcome.result,
            evaluation_logic: outcome.logic,
            evaluation_steps: outcome.steps,
            d_selections: d_selections(comment),
            e_selections: e_selections(comment),
        });
    }

    FilterResult {
        matched_count: matched_test_ids.len(),
        matched_test_ids,
        total_evaluated: reports.len(),
        test_cases: reports,
        evaluation_breakdown: breakdown,
        metadata: RunMetadata {
            success_rate: rate,
            pics_items_count: summary.pics_items_count,
            dictionary_size: summary.dictionary_size,
            conditions_count: summary.conditions_count,
            specification_id: summary.specification_id,
            fallback: summary.fallback,
            evaluated_at: chrono::Utc::now().to_rfc3339(),
        },
    }
}
