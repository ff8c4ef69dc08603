//! Filter runs: dictionary, catalog, two evaluation passes, aggregation.

pub mod aggregate;
pub mod passes;

use std::sync::Arc;

use tracing::{debug, info};

use crate::condition::ConditionEvaluator;
use crate::config::EngineConfig;
use crate::errors::{EngineError, EngineResult};
use crate::fallback::{BatchQueue, FallbackParser, ParseCache};
use crate::model::{EvaluationOutcome, FallbackStats, FilterResult, PicsItem};
use crate::pics::build_dictionary;
use crate::providers::{ConditionParser, HttpConditionParser, OfflineParser};
use crate::request::{CatalogSource, FilterRequest};
use crate::storage::{ConditionStore, SqliteStore};

use aggregate::RunSummary;

/// Entry point of the engine. Owns the fallback parser and its cache, which
/// survive across runs; everything else is per run.
#[derive(Clone)]
pub struct FilterService {
    config: EngineConfig,
    fallback: FallbackParser,
    store: Option<Arc<dyn ConditionStore>>,
}

impl std::fmt::Debug for FilterService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterService")
            .field("batch_size", &self.config.batch_size)
            .field("fallback", &self.fallback)
            .field("store", &self.store.is_some())
            .finish()
    }
}

impl FilterService {
    pub fn new(config: EngineConfig, parser: Arc<dyn ConditionParser>, cache: ParseCache) -> Self {
        Self {
            config,
            fallback: FallbackParser::new(parser, cache),
            store: None,
        }
    }

    /// No parsing service, no store: inline requests only, unparsed expressions
    /// resolve to `R`.
    pub fn offline() -> Self {
        Self::new(
            EngineConfig::default(),
            Arc::new(OfflineParser),
            ParseCache::new(),
        )
    }

    /// Wire the HTTP parser and the SQLite store from configuration.
    pub fn from_config(config: EngineConfig) -> EngineResult<Self> {
        let parser: Arc<dyn ConditionParser> = match &config.parser.url {
            Some(_) => Arc::new(
                HttpConditionParser::new(&config.parser)
                    .map_err(|e| EngineError::configuration(e.to_string()))?,
            ),
            None => {
                debug!("no parser url configured, running offline");
                Arc::new(OfflineParser)
            }
        };

        let store: Option<Arc<dyn ConditionStore>> = match &config.database {
            Some(path) => Some(Arc::new(SqliteStore::open_read_only(path)?)),
            None => None,
        };

        let mut service = Self::new(config, parser, ParseCache::new());
        service.store = store;
        Ok(service)
    }

    pub fn with_store(mut self, store: Arc<dyn ConditionStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn fallback(&self) -> &FallbackParser {
        &self.fallback
    }

    pub fn cache(&self) -> &ParseCache {
        self.fallback.cache()
    }

    /// Evaluate every test case of the requested catalog.
    ///
    /// Fails only when the catalog cannot be loaded; per-expression problems end up
    /// in the individual outcomes.
    pub async fn filter(&self, request: &FilterRequest) -> EngineResult<FilterResult> {
        let (conditions, cases, specification_id) = match request.catalog()? {
            CatalogSource::Inline(data) => (
                data.conditions(),
                data.test_cases(),
                request.specification_id.clone(),
            ),
            CatalogSource::Stored(id) => {
                let store = self.store.as_ref().ok_or_else(|| {
                    EngineError::configuration("no condition store configured")
                })?;
                let (conditions, cases) =
                    tokio::try_join!(store.get_conditions(id), store.get_test_cases(id))?;
                (conditions, cases, Some(id.to_string()))
            }
        };

        let dictionary = build_dictionary(&request.pics_items);
        info!(
            specification_id = specification_id.as_deref().unwrap_or("inline"),
            test_cases = cases.len(),
            conditions = conditions.len(),
            pics = dictionary.len(),
            "starting filter run"
        );

        let evaluator = ConditionEvaluator::new(&dictionary);
        let mut queue = BatchQueue::new(self.config.batch_size);

        let states =
            passes::first_pass(&cases, &conditions, &evaluator, &self.fallback, &mut queue).await;
        self.fallback.flush(&mut queue).await;
        let outcomes = passes::second_pass(states, &evaluator, &self.fallback);

        let summary = RunSummary {
            pics_items_count: request.pics_items.len(),
            dictionary_size: dictionary.len(),
            conditions_count: conditions.len(),
            specification_id,
            fallback: queue.stats(),
        };
        let result = aggregate::aggregate(&cases, outcomes, summary);

        info!(
            total = result.total_evaluated,
            matched = result.matched_count,
            success_rate = result.metadata.success_rate,
            parser_calls = result.metadata.fallback.parser_calls,
            "filter run complete"
        );
        Ok(result)
    }

    /// Evaluate one expression against a set of PICS items (single fallback path).
    pub async fn evaluate_expression(
        &self,
        expression: &str,
        pics_items: &[PicsItem],
    ) -> (EvaluationOutcome, FallbackStats) {
        let dictionary = build_dictionary(pics_items);
        let evaluator = ConditionEvaluator::new(&dictionary);
        self.fallback.resolve_one(expression, &evaluator).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Applicability;
    use crate::storage::SpecData;

    fn request(json: &str) -> FilterRequest {
        FilterRequest::from_json(json).unwrap()
    }

    #[tokio::test]
    async fn offline_run_over_inline_catalog() {
        let service = FilterService::offline();
        let result = service
            .filter(&request(
                r#"{
                    "pics_items": [{"item_id": "A.1", "value": true}, {"item_id": "A.2", "value": "FALSE"}],
                    "spec_data": {
                        "test_cases": [
                            {"test_id": "T1", "applicability_condition": "C1"},
                            {"test_id": "T2", "applicability_condition": "C2"},
                            {"test_id": "T3", "applicability_condition": ""},
                            {"test_id": "T4", "applicability_condition": "C3"}
                        ],
                        "c_conditions": [
                            {"condition_id": "C1", "definition": "IF A.1 AND NOT A.2 THEN M ELSE N/A"},
                            {"condition_id": "C2", "definition": "IF A.2 THEN O ELSE N/A"},
                            {"condition_id": "C3", "definition": "supported when A.2 is absent"}
                        ]
                    }
                }"#,
            ))
            .await
            .unwrap();

        assert_eq!(result.matched_test_ids, vec!["T1", "T3", "T4"]);
        assert_eq!(
            result.report("T4").unwrap().evaluation_result,
            Applicability::Required
        );
        assert_eq!(result.metadata.fallback.parser_calls, 1);
        assert_eq!(result.metadata.fallback.failures, 1);
        assert_eq!(result.metadata.conditions_count, 3);
        assert_eq!(result.metadata.dictionary_size, 2);
        assert_eq!(result.metadata.success_rate, 100.0);
    }

    #[tokio::test]
    async fn stored_request_without_store_is_configuration_error() {
        let err = FilterService::offline()
            .filter(&FilterRequest::stored(vec![], "S1"))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Configuration { .. }));
    }

    #[tokio::test]
    async fn empty_catalog_scores_full_success() {
        let result = FilterService::offline()
            .filter(&FilterRequest::inline(vec![], SpecData::default()))
            .await
            .unwrap();
        assert_eq!(result.total_evaluated, 0);
        assert!(result.evaluation_breakdown.is_empty());
        assert_eq!(result.metadata.success_rate, 100.0);
    }

    #[tokio::test]
    async fn evaluate_expression_uses_dictionary() {
        let items = vec![PicsItem::new("PC_FEATURE", true)];
        let (outcome, stats) = FilterService::offline()
            .evaluate_expression("IF PC_FEATURE THEN M ELSE N/A", &items)
            .await;
        assert_eq!(outcome.result, Applicability::Mandatory);
        assert_eq!(stats.parser_calls, 0);
    }
}
