//! PICS-conditioned test applicability evaluation.
//!
//! Given a device's declared capability flags (PICS items) and a specification's
//! catalog of conditional applicability rules, the engine decides per conformance
//! test case whether the test is Required, Mandatory, Optional or Not-Applicable.
//!
//! Evaluation is two-tier: a deterministic IF/THEN/ELSE evaluator handles the bulk
//! of the catalog, and a batched, cached external parser picks up the free-form
//! expressions the deterministic grammar cannot match. A single bad expression never
//! aborts a run.
//!
//! # Quick Start
//!
//! ```no_run
//! use pics_core::{FilterRequest, FilterService};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let request: FilterRequest = serde_json::from_str(r#"{
//!     "pics_items": [{"item_id": "A.1", "value": true}],
//!     "spec_data": {
//!         "test_cases": [{"test_id": "T1", "applicability_condition": "C1"}],
//!         "c_conditions": [{"condition_id": "C1", "definition": "IF A.1 THEN M ELSE N/A"}]
//!     }
//! }"#)?;
//!
//! let service = FilterService::offline();
//! let response = service.filter(&request).await?;
//! println!("{} matched", response.matched_count);
//! # Ok(())
//! # }
//! ```

pub mod condition;
pub mod config;
pub mod engine;
pub mod errors;
pub mod fallback;
pub mod model;
pub mod pics;
pub mod providers;
pub mod report;
pub mod request;
pub mod selections;
pub mod storage;

pub use condition::{Condition, ConditionEvaluator};
pub use config::{EngineConfig, ParserConfig};
pub use engine::FilterService;
pub use errors::{EngineError, EngineResult, ParserError, ParserResult};
pub use fallback::{BatchQueue, FallbackParser, ParseCache};
pub use model::{
    Applicability, ConditionDefinition, EvaluationOutcome, FallbackStats, FilterResult, PicsItem,
    PicsValue, RunMetadata, TestCase, TestCaseReport,
};
pub use pics::{build_dictionary, is_capability_id, PicsDictionary};
pub use providers::{ConditionParser, HttpConditionParser, OfflineParser, ParsedCondition};
pub use request::{FilterRequest, FilterResponse};
pub use storage::{ConditionStore, InlineStore, SpecData, SqliteStore};
