//! Deterministic condition evaluation.
//!
//! Boundaries:
//! - repair.rs: text normalisation before matching (also produces cache keys)
//! - substitute.rs: reference extraction, whole-token substitution, operators
//! - sandbox.rs: closed boolean evaluator
//! - mod.rs: classification and the evaluation flow

pub mod repair;
pub mod sandbox;
pub mod substitute;

use crate::model::{Applicability, EvaluationOutcome};
use crate::pics::PicsDictionary;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

lazy_static! {
    static ref IF_THEN_ELSE: Regex = Regex::new(
        r"(?is)^IF\b\s*(?P<ante>.+?)\s*\bTHEN\s+(?P<then>N/A|R|M|O)(?:\s+ELSE\s+(?P<else>N/A|R|M|O))?\s*$"
    )
    .unwrap();
    static ref NESTED_KEYWORD: Regex = Regex::new(r"(?i)\b(IF|THEN|ELSE)\b").unwrap();
}

/// Antecedent plus the two possible results of an IF/THEN/ELSE rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuredCondition {
    pub antecedent: String,
    pub then_value: Applicability,
    pub else_value: Applicability,
}

/// Condition text classified by how it can be resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// `R`, `M`, `O`, `N/A`; empty text is `R`.
    Literal(Applicability),
    /// Matched the IF/THEN/ELSE grammar after repair.
    Structured(StructuredCondition),
    /// Needs the fallback parser. Holds the repaired text (the cache key).
    Unparsed(String),
}

impl Condition {
    pub fn classify(text: &str) -> Self {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Self::Literal(Applicability::Required);
        }
        if let Some(token) = Applicability::parse_literal(trimmed) {
            return Self::Literal(token);
        }

        let repaired = repair::repair(trimmed);
        let structured = IF_THEN_ELSE.captures(&repaired).and_then(|caps| {
            let antecedent = caps["ante"].trim();
            if NESTED_KEYWORD.is_match(antecedent) {
                return None;
            }
            let token = |name: &str| {
                caps.name(name)
                    .and_then(|m| Applicability::parse_literal(m.as_str()))
            };
            Some(StructuredCondition {
                antecedent: antecedent.to_string(),
                then_value: token("then").unwrap_or(Applicability::Required),
                else_value: token("else").unwrap_or(Applicability::NotApplicable),
            })
        });

        match structured {
            Some(cond) => Self::Structured(cond),
            None => Self::Unparsed(repaired),
        }
    }
}

/// What the deterministic tier could do with an expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evaluation {
    Resolved(EvaluationOutcome),
    /// Grammar did not match; resolve through the fallback parser using this key.
    Deferred(String),
}

/// Evaluates condition text against one PICS dictionary.
#[derive(Debug, Clone, Copy)]
pub struct ConditionEvaluator<'a> {
    dict: &'a PicsDictionary,
}

impl<'a> ConditionEvaluator<'a> {
    pub fn new(dict: &'a PicsDictionary) -> Self {
        Self { dict }
    }

    /// Resolve `text` without any external call, or defer it to the fallback tier.
    pub fn evaluate(&self, text: &str) -> Evaluation {
        match Condition::classify(text) {
            Condition::Literal(token) => {
                let logic = if text.trim().is_empty() {
                    token.as_str()
                } else {
                    text.trim()
                };
                Evaluation::Resolved(EvaluationOutcome::literal(token, logic))
            }
            Condition::Structured(cond) => {
                let logic = repair::repair(text.trim());
                Evaluation::Resolved(self.evaluate_structured(&logic, &cond, &[]))
            }
            Condition::Unparsed(key) => {
                debug!(expression = %key, "no IF/THEN/ELSE match, deferring to fallback parser");
                Evaluation::Deferred(key)
            }
        }
    }

    /// Substitute, evaluate and pick the THEN/ELSE value for a structured condition.
    ///
    /// `extra_refs` carries references reported by the fallback parser; they are
    /// merged with the ids found in the antecedent.
    pub fn evaluate_structured(
        &self,
        logic: &str,
        cond: &StructuredCondition,
        extra_refs: &[String],
    ) -> EvaluationOutcome {
        let mut steps = vec![format!("Antecedent: {}", cond.antecedent)];

        let refs = substitute::extract_references(&cond.antecedent, extra_refs);
        let mut missing = Vec::new();
        let mut substituted = cond.antecedent.clone();
        for id in &refs {
            let value = match self.dict.get(id) {
                Some(v) => {
                    steps.push(format!("{} = {}", id, v));
                    *v
                }
                None => {
                    steps.push(format!("{} = false (missing from PICS)", id));
                    missing.push(id.as_str());
                    false
                }
            };
            let literal = if value { "true" } else { "false" };
            substituted = substitute::replace_whole_token(&substituted, id, literal);
        }
        if !missing.is_empty() {
            steps.push(format!("Missing PICS references: {}", missing.join(", ")));
        }

        let translated = substitute::translate_operators(&substituted);
        let (balanced, padded) = substitute::balance_parentheses(&translated);
        if padded {
            steps.push("Balanced parentheses after substitution".to_string());
        }
        steps.push(format!("Substituted: {}", balanced));

        match sandbox::evaluate_boolean(&balanced) {
            Ok(value) => {
                let result = if value {
                    cond.then_value
                } else {
                    cond.else_value
                };
                steps.push(format!("Antecedent evaluates to {}", value));
                steps.push(format!("Result: {}", result));
                EvaluationOutcome::new(result, logic, steps)
            }
            Err(e) => {
                debug!(expression = %logic, error = %e, "antecedent evaluation failed");
                steps.push(format!("Evaluation failed: {}; defaulting to N/A", e));
                EvaluationOutcome::new(Applicability::NotApplicable, logic, steps)
            }
        }
    }
}
