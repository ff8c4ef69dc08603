use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{collect_conditions, ConditionMap, ConditionStore};
use crate::errors::EngineResult;
use crate::model::{ConditionDefinition, TestCase};

/// Test cases as records, or as a `{headers, data}` table export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TestCaseSource {
    Records(Vec<TestCase>),
    Table {
        headers: Vec<String>,
        data: Vec<Vec<Value>>,
    },
}

impl Default for TestCaseSource {
    fn default() -> Self {
        Self::Records(Vec::new())
    }
}

/// Condition definitions as records or as an id to expression object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionSource {
    Records(Vec<ConditionDefinition>),
    Map(BTreeMap<String, String>),
}

impl Default for ConditionSource {
    fn default() -> Self {
        Self::Records(Vec::new())
    }
}

/// Specification catalog supplied inline with a request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpecData {
    #[serde(default)]
    pub test_cases: TestCaseSource,
    #[serde(default, alias = "conditions")]
    pub c_conditions: ConditionSource,
}

#[derive(Clone, Copy)]
enum Column {
    TestId,
    SpecificationId,
    Condition,
    Clause,
    Title,
    Release,
    Comment,
}

fn column_for(header: &str) -> Option<Column> {
    let column = match header.trim().to_ascii_lowercase().as_str() {
        "test_id" | "tc_id" | "id" | "test case id" | "test_case_id" => Column::TestId,
        "specification_id" | "spec_id" | "specification" => Column::SpecificationId,
        "applicability_condition" | "condition" | "applicability" | "pics" => {
            Column::Condition
        }
        "clause" | "section" => Column::Clause,
        "title" | "name" | "test case name" => Column::Title,
        "release" | "version" => Column::Release,
        "comment" | "comments" | "notes" => Column::Comment,
        _ => return None,
    };
    Some(column)
}

fn cell_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.trim().to_string()),
        other => Some(other.to_string()),
    }
}

fn table_rows(headers: &[String], data: &[Vec<Value>]) -> Vec<TestCase> {
    let columns: Vec<Option<Column>> = headers.iter().map(|h| column_for(h)).collect();
    let mut cases = Vec::with_capacity(data.len());

    for (index, row) in data.iter().enumerate() {
        let mut case = TestCase::default();
        for (column, value) in columns.iter().zip(row) {
            let Some(column) = column else { continue };
            let text = cell_text(value);
            match column {
                Column::TestId => case.test_id = text.unwrap_or_default(),
                Column::SpecificationId => case.specification_id = text.unwrap_or_default(),
                Column::Condition => case.applicability_condition = text.unwrap_or_default(),
                Column::Clause => case.clause = text,
                Column::Title => case.title = text,
                Column::Release => case.release = text,
                Column::Comment => case.comment = text,
            }
        }
        if case.test_id.is_empty() {
            debug!(row = index, "skipping table row without test id");
            continue;
        }
        cases.push(case);
    }
    cases
}

impl SpecData {
    pub fn from_json(text: &str) -> EngineResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Test cases in document order, table rows normalised to records.
    pub fn test_cases(&self) -> Vec<TestCase> {
        match &self.test_cases {
            TestCaseSource::Records(records) => records.clone(),
            TestCaseSource::Table { headers, data } => table_rows(headers, data),
        }
    }

    pub fn conditions(&self) -> ConditionMap {
        match &self.c_conditions {
            ConditionSource::Records(records) => collect_conditions(
                records
                    .iter()
                    .map(|c| (c.condition_id.as_str(), c.definition.clone())),
            ),
            ConditionSource::Map(map) => {
                collect_conditions(map.iter().map(|(k, v)| (k, v.clone())))
            }
        }
    }
}

/// Store over a single inline document. The specification id is ignored.
#[derive(Debug, Clone, Default)]
pub struct InlineStore {
    data: SpecData,
}

impl InlineStore {
    pub fn new(data: SpecData) -> Self {
        Self { data }
    }
}

#[async_trait]
impl ConditionStore for InlineStore {
    async fn get_conditions(&self, _specification_id: &str) -> EngineResult<ConditionMap> {
        Ok(self.data.conditions())
    }

    async fn get_test_cases(&self, _specification_id: &str) -> EngineResult<Vec<TestCase>> {
        Ok(self.data.test_cases())
    }
}
