//! Fallback tier: resolves expressions the deterministic grammar cannot match.
//!
//! Expressions are queued per run, sent to the parsing service in batches of
//! unique texts, and every answer (including failures) lands in the shared
//! [`ParseCache`] before the queue is cleared. Resolution then reads the cache.

pub mod cache;

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::condition::{repair, ConditionEvaluator, Evaluation};
use crate::config::DEFAULT_BATCH_SIZE;
use crate::model::{Applicability, EvaluationOutcome, FallbackStats};
use crate::providers::{ConditionParser, OfflineParser};

pub use cache::{CacheEntry, CachedParse, ParseCache};

/// Cache key for raw expression text.
pub fn cache_key(expression: &str) -> String {
    repair::repair(expression.trim())
}

/// Unique expressions waiting for the next batch call. One queue per run.
#[derive(Debug)]
pub struct BatchQueue {
    pending: Vec<String>,
    seen: HashSet<String>,
    batch_size: usize,
    stats: FallbackStats,
}

impl BatchQueue {
    pub fn new(batch_size: usize) -> Self {
        Self {
            pending: Vec::new(),
            seen: HashSet::new(),
            batch_size: batch_size.max(1),
            stats: FallbackStats::default(),
        }
    }

    /// Queue `key` unless it is already waiting.
    pub fn enqueue(&mut self, key: String) {
        if self.seen.insert(key.clone()) {
            self.stats.cache_misses += 1;
            self.pending.push(key);
        }
    }

    pub fn is_full(&self) -> bool {
        self.pending.len() >= self.batch_size
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn stats(&self) -> FallbackStats {
        self.stats
    }

    pub fn record_hit(&mut self) {
        self.stats.cache_hits += 1;
    }
}

impl Default for BatchQueue {
    fn default() -> Self {
        Self::new(DEFAULT_BATCH_SIZE)
    }
}

/// Parsing service plus its cache.
#[derive(Clone)]
pub struct FallbackParser {
    parser: Arc<dyn ConditionParser>,
    cache: ParseCache,
}

impl std::fmt::Debug for FallbackParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackParser")
            .field("provider", &self.parser.provider_name())
            .field("cached", &self.cache.len())
            .finish()
    }
}

impl FallbackParser {
    pub fn new(parser: Arc<dyn ConditionParser>, cache: ParseCache) -> Self {
        Self { parser, cache }
    }

    /// Fallback with no service: every unparsed expression resolves to `R`.
    pub fn offline() -> Self {
        Self::new(Arc::new(OfflineParser), ParseCache::new())
    }

    pub fn cache(&self) -> &ParseCache {
        &self.cache
    }

    pub fn provider_name(&self) -> &'static str {
        self.parser.provider_name()
    }

    /// Forget the cached parse of `expression` (raw text, repaired here).
    pub fn invalidate(&self, expression: &str) -> bool {
        self.cache.invalidate(&cache_key(expression))
    }

    /// Send every queued expression in one batch call and cache the answers.
    ///
    /// Results are matched by position. A missing or unusable result, or a failed
    /// call, caches a failure entry for the affected expressions.
    pub async fn flush(&self, queue: &mut BatchQueue) {
        if queue.pending.is_empty() {
            return;
        }

        queue.stats.parser_calls += 1;
        let count = queue.pending.len();
        debug!(provider = self.provider_name(), count, "flushing fallback batch");

        let response = self.parser.parse_batch(&queue.pending).await;
        let entries: Vec<(String, CachedParse)> = match response {
            Ok(results) => {
                if results.len() != count {
                    warn!(
                        expected = count,
                        received = results.len(),
                        "parser returned a short batch"
                    );
                }
                queue
                    .pending
                    .iter()
                    .enumerate()
                    .map(|(i, key)| {
                        let parse = match results.get(i) {
                            Some(parsed) => CachedParse::from_parsed(parsed),
                            None => CachedParse::failed("parser returned no result for expression"),
                        };
                        (key.clone(), parse)
                    })
                    .collect()
            }
            Err(e) => {
                warn!(error = %e, count, "fallback batch failed; expressions default to R");
                let reason = e.to_string();
                queue
                    .pending
                    .iter()
                    .map(|key| (key.clone(), CachedParse::failed(reason.clone())))
                    .collect()
            }
        };

        let failures = entries.iter().filter(|(_, p)| p.is_failure()).count() as u64;
        queue.stats.failures += failures;
        self.cache.insert_many(entries);
        info!(count, failures, "fallback batch cached");

        queue.pending.clear();
        queue.seen.clear();
    }

    /// Resolve a cached expression against the evaluator's dictionary.
    ///
    /// `None` when the key has no cache entry.
    pub fn resolve_cached(
        &self,
        key: &str,
        evaluator: &ConditionEvaluator<'_>,
    ) -> Option<EvaluationOutcome> {
        let entry = self.cache.get(key)?;
        let outcome = match &entry.parse {
            CachedParse::Parsed {
                condition,
                references,
            } => {
                let mut outcome = evaluator.evaluate_structured(key, condition, references);
                outcome.steps.insert(
                    0,
                    format!("Resolved by {} parser", self.provider_name()),
                );
                outcome
            }
            CachedParse::Failed { reason } => EvaluationOutcome::new(
                Applicability::Required,
                key,
                vec![
                    format!("Fallback parser failed: {}", reason),
                    "Defaulting to R".to_string(),
                ],
            ),
        };
        self.cache.record_outcome(key, &outcome);
        Some(outcome)
    }

    /// Resolve one expression outside a batched run.
    ///
    /// Deterministic expressions never reach the service. Unparsed ones go through
    /// the cache and a single-expression call.
    pub async fn resolve_one(
        &self,
        expression: &str,
        evaluator: &ConditionEvaluator<'_>,
    ) -> (EvaluationOutcome, FallbackStats) {
        let mut stats = FallbackStats::default();
        let key = match evaluator.evaluate(expression) {
            Evaluation::Resolved(outcome) => return (outcome, stats),
            Evaluation::Deferred(key) => key,
        };

        if self.cache.contains(&key) {
            stats.cache_hits += 1;
        } else {
            stats.cache_misses += 1;
            stats.parser_calls += 1;
            let parse = match self.parser.parse_one(&key).await {
                Ok(parsed) => CachedParse::from_parsed(&parsed),
                Err(e) => {
                    warn!(error = %e, expression = %key, "fallback parse failed; defaulting to R");
                    CachedParse::failed(e.to_string())
                }
            };
            if parse.is_failure() {
                stats.failures += 1;
            }
            self.cache.insert_many(vec![(key.clone(), parse)]);
        }

        let outcome = self.resolve_cached(&key, evaluator).unwrap_or_else(|| {
            EvaluationOutcome::new(
                Applicability::Error,
                key.as_str(),
                vec!["Fallback result missing from cache".to_string()],
            )
        });
        (outcome, stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{ParserError, ParserResult};
    use crate::pics::PicsDictionary;
    use crate::providers::ParsedCondition;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Answers `IF <first id> THEN M ELSE N/A`-shaped results and counts calls.
    #[derive(Default)]
    struct CountingParser {
        batch_calls: AtomicUsize,
        single_calls: AtomicUsize,
        fail: bool,
    }

    fn shape(expression: &str) -> ParsedCondition {
        let id = expression
            .split_whitespace()
            .find(|w| w.starts_with("A."))
            .unwrap_or("A.0")
            .to_string();
        ParsedCondition {
            antecedent: id.clone(),
            then_value: "M".to_string(),
            else_value: "N/A".to_string(),
            references: vec![id],
        }
    }

    #[async_trait]
    impl ConditionParser for CountingParser {
        async fn parse_one(&self, expression: &str) -> ParserResult<ParsedCondition> {
            self.single_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ParserError::Unavailable {
                    message: "down".into(),
                });
            }
            Ok(shape(expression))
        }

        async fn parse_batch(&self, expressions: &[String]) -> ParserResult<Vec<ParsedCondition>> {
            self.batch_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ParserError::Network {
                    message: "reset".into(),
                });
            }
            Ok(expressions.iter().map(|e| shape(e)).collect())
        }

        fn provider_name(&self) -> &'static str {
            "counting"
        }
    }

    fn dict(pairs: &[(&str, bool)]) -> PicsDictionary {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn queue_deduplicates_and_bounds() {
        let mut queue = BatchQueue::new(2);
        queue.enqueue("x".into());
        queue.enqueue("x".into());
        assert_eq!(queue.len(), 1);
        assert!(!queue.is_full());
        queue.enqueue("y".into());
        assert!(queue.is_full());
        assert_eq!(queue.stats().cache_misses, 2);
    }

    #[tokio::test]
    async fn flush_caches_answers_and_clears_queue() {
        let parser = Arc::new(CountingParser::default());
        let fallback = FallbackParser::new(parser.clone(), ParseCache::new());
        let mut queue = BatchQueue::new(10);
        queue.enqueue("needs A.1 support".into());
        queue.enqueue("needs A.2 support".into());

        fallback.flush(&mut queue).await;
        assert!(queue.is_empty());
        assert_eq!(parser.batch_calls.load(Ordering::SeqCst), 1);
        assert_eq!(fallback.cache().len(), 2);

        // empty queue: no call
        fallback.flush(&mut queue).await;
        assert_eq!(parser.batch_calls.load(Ordering::SeqCst), 1);

        let d = dict(&[("A.1", true)]);
        let ev = ConditionEvaluator::new(&d);
        let o = fallback.resolve_cached("needs A.1 support", &ev).unwrap();
        assert_eq!(o.result, Applicability::Mandatory);
        assert_eq!(o.steps[0], "Resolved by counting parser");
        let o = fallback.resolve_cached("needs A.2 support", &ev).unwrap();
        assert_eq!(o.result, Applicability::NotApplicable);
        assert!(fallback.resolve_cached("never queued", &ev).is_none());
    }

    #[tokio::test]
    async fn failed_batch_defaults_to_required_and_is_cached() {
        let parser = Arc::new(CountingParser {
            fail: true,
            ..Default::default()
        });
        let fallback = FallbackParser::new(parser.clone(), ParseCache::new());
        let mut queue = BatchQueue::default();
        queue.enqueue("whatever A.1".into());
        fallback.flush(&mut queue).await;
        assert_eq!(queue.stats().failures, 1);

        let d = dict(&[]);
        let o = fallback
            .resolve_cached("whatever A.1", &ConditionEvaluator::new(&d))
            .unwrap();
        assert_eq!(o.result, Applicability::Required);
        assert!(o.steps[0].starts_with("Fallback parser failed"));
        assert!(fallback.cache().get("whatever A.1").unwrap().last_outcome.is_some());
    }

    #[tokio::test]
    async fn resolve_one_uses_cache_on_repeat() {
        let parser = Arc::new(CountingParser::default());
        let fallback = FallbackParser::new(parser.clone(), ParseCache::new());
        let d = dict(&[("A.3", true)]);
        let ev = ConditionEvaluator::new(&d);

        let (first, stats) = fallback.resolve_one("only  when A.3 holds", &ev).await;
        assert_eq!(first.result, Applicability::Mandatory);
        assert_eq!(stats.parser_calls, 1);

        let (second, stats) = fallback.resolve_one("only when A.3 holds", &ev).await;
        assert_eq!(second, first);
        assert_eq!(stats.cache_hits, 1);
        assert_eq!(parser.single_calls.load(Ordering::SeqCst), 1);

        assert!(fallback.invalidate("only when A.3 holds"));
        assert!(fallback.cache().is_empty());
    }

    #[tokio::test]
    async fn deterministic_expressions_skip_the_service() {
        let parser = Arc::new(CountingParser::default());
        let fallback = FallbackParser::new(parser.clone(), ParseCache::new());
        let d = dict(&[("A.1", true)]);
        let (o, stats) = fallback
            .resolve_one("IF A.1 THEN O ELSE N/A", &ConditionEvaluator::new(&d))
            .await;
        assert_eq!(o.result, Applicability::Optional);
        assert_eq!(stats, FallbackStats::default());
        assert_eq!(parser.single_calls.load(Ordering::SeqCst), 0);
    }
}
