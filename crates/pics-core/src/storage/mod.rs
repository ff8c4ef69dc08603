//! Condition and test case sources.

pub mod inline;
pub mod schema;
pub mod sqlite;

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::errors::EngineResult;
use crate::model::TestCase;

pub use inline::{InlineStore, SpecData, TestCaseSource};
pub use sqlite::SqliteStore;

/// Condition id to expression text.
pub type ConditionMap = BTreeMap<String, String>;

#[async_trait]
pub trait ConditionStore: Send + Sync {
    /// Condition definitions of one specification. Empty when it has none.
    async fn get_conditions(&self, specification_id: &str) -> EngineResult<ConditionMap>;

    /// Test cases of one specification, in catalog order.
    async fn get_test_cases(&self, specification_id: &str) -> EngineResult<Vec<TestCase>>;
}

/// Condition ids are matched trimmed and upper-cased.
pub fn normalize_condition_id(id: &str) -> String {
    id.trim().to_ascii_uppercase()
}

/// Build a [`ConditionMap`]; later duplicates overwrite earlier ones.
pub fn collect_conditions<I, K, V>(pairs: I) -> ConditionMap
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<String>,
{
    let mut map = ConditionMap::new();
    for (id, definition) in pairs {
        let id = normalize_condition_id(id.as_ref());
        if id.is_empty() {
            continue;
        }
        map.insert(id, definition.into());
    }
    map
}
