//! Shared cache of parsing-service answers, keyed by repaired expression text.
//!
//! Failures are cached like successes so an unparseable expression is sent to the
//! service once until it is invalidated.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::condition::StructuredCondition;
use crate::model::{Applicability, EvaluationOutcome};
use crate::providers::ParsedCondition;

/// What the parsing service made of one expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachedParse {
    Parsed {
        condition: StructuredCondition,
        references: Vec<String>,
    },
    /// The service failed or answered with something unusable. Resolves to `R`.
    Failed { reason: String },
}

impl CachedParse {
    /// Validate a service answer. Unknown THEN/ELSE tokens or an empty antecedent
    /// turn into a failure entry.
    pub fn from_parsed(parsed: &ParsedCondition) -> Self {
        let antecedent = parsed.antecedent.trim();
        if antecedent.is_empty() {
            return Self::failed("parser returned an empty antecedent");
        }
        let Some(then_value) = Applicability::parse_literal(&parsed.then_value) else {
            return Self::failed(format!(
                "parser returned invalid THEN value '{}'",
                parsed.then_value
            ));
        };
        let else_value = if parsed.else_value.trim().is_empty() {
            Applicability::NotApplicable
        } else {
            match Applicability::parse_literal(&parsed.else_value) {
                Some(v) => v,
                None => {
                    return Self::failed(format!(
                        "parser returned invalid ELSE value '{}'",
                        parsed.else_value
                    ))
                }
            }
        };

        Self::Parsed {
            condition: StructuredCondition {
                antecedent: antecedent.to_string(),
                then_value,
                else_value,
            },
            references: parsed.references.clone(),
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Validated service answer, or the reason it was rejected.
    pub parse: CachedParse,
    /// Most recent outcome resolved from this entry.
    pub last_outcome: Option<EvaluationOutcome>,
    /// RFC 3339 time the entry was written.
    pub cached_at: String,
}

/// Process-wide parse cache keyed by repaired expression text.
///
/// Cloning shares the underlying map. Entries are never evicted implicitly.
#[derive(Debug, Clone, Default)]
pub struct ParseCache {
    inner: Arc<RwLock<HashMap<String, CacheEntry>>>,
}

impl ParseCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, CacheEntry>> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, CacheEntry>> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        self.read().get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.read().contains_key(key)
    }

    /// Write a whole batch under one write lock.
    pub fn insert_many(&self, entries: Vec<(String, CachedParse)>) {
        let cached_at = chrono::Utc::now().to_rfc3339();
        let mut map = self.write();
        for (key, parse) in entries {
            map.insert(
                key,
                CacheEntry {
                    parse,
                    last_outcome: None,
                    cached_at: cached_at.clone(),
                },
            );
        }
    }

    pub fn record_outcome(&self, key: &str, outcome: &EvaluationOutcome) {
        if let Some(entry) = self.write().get_mut(key) {
            entry.last_outcome = Some(outcome.clone());
        }
    }

    /// Drop one entry. Returns whether it existed.
    pub fn invalidate(&self, key: &str) -> bool {
        self.write().remove(key).is_some()
    }

    pub fn clear(&self) {
        self.write().clear();
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}
