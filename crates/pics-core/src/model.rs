use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Applicability token produced for every test case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Applicability {
    #[serde(rename = "R")]
    Required,
    #[serde(rename = "M")]
    Mandatory,
    #[serde(rename = "O")]
    Optional,
    #[serde(rename = "N/A")]
    NotApplicable,
    #[serde(rename = "ERROR")]
    Error,
}

impl Applicability {
    /// Parse one of the literal tokens `R`, `M`, `O`, `N/A` (case-insensitive).
    ///
    /// `ERROR` is an engine outcome, never an authored literal, so it is not accepted.
    pub fn parse_literal(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "R" => Some(Self::Required),
            "M" => Some(Self::Mandatory),
            "O" => Some(Self::Optional),
            "N/A" => Some(Self::NotApplicable),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Required => "R",
            Self::Mandatory => "M",
            Self::Optional => "O",
            Self::NotApplicable => "N/A",
            Self::Error => "ERROR",
        }
    }

    /// True for R, M and O.
    pub fn is_applicable(&self) -> bool {
        matches!(self, Self::Required | Self::Mandatory | Self::Optional)
    }
}

impl fmt::Display for Applicability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw PICS value as it arrives from upstream: a JSON boolean or a string flag.
///
/// Anything else (`null`, floats, objects) is kept as `Other` and reads as false.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PicsValue {
    Bool(bool),
    Text(String),
    Number(i64),
    Other(serde_json::Value),
}

impl PicsValue {
    pub fn as_bool(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Number(n) => *n != 0,
            Self::Text(s) => matches!(
                s.trim().to_ascii_uppercase().as_str(),
                "TRUE" | "1" | "YES" | "Y"
            ),
            Self::Other(_) => false,
        }
    }
}

impl From<bool> for PicsValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

/// A declared device capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PicsItem {
    #[serde(alias = "id", alias = "pics_id")]
    pub item_id: String,
    #[serde(alias = "supported")]
    pub value: PicsValue,
}

impl PicsItem {
    pub fn new(item_id: impl Into<String>, value: impl Into<PicsValue>) -> Self {
        Self {
            item_id: item_id.into(),
            value: value.into(),
        }
    }
}

/// A named applicability condition from the specification catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionDefinition {
    #[serde(alias = "id", alias = "c_id")]
    pub condition_id: String,
    #[serde(alias = "expression", alias = "condition")]
    pub definition: String,
}

impl ConditionDefinition {
    pub fn new(condition_id: impl Into<String>, definition: impl Into<String>) -> Self {
        Self {
            condition_id: condition_id.into(),
            definition: definition.into(),
        }
    }
}

/// One conformance test case from the specification catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    #[serde(alias = "tc_id", alias = "id")]
    pub test_id: String,
    #[serde(default, alias = "spec_id")]
    pub specification_id: String,
    #[serde(default, alias = "condition", alias = "applicability")]
    pub applicability_condition: String,
    #[serde(default)]
    pub clause: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub release: Option<String>,
    #[serde(default, alias = "comments")]
    pub comment: Option<String>,
}

impl TestCase {
    pub fn new(test_id: impl Into<String>, applicability_condition: impl Into<String>) -> Self {
        Self {
            test_id: test_id.into(),
            applicability_condition: applicability_condition.into(),
            ..Default::default()
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

/// Result of resolving one expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationOutcome {
    pub result: Applicability,
    /// Expression text that produced the outcome.
    pub logic: String,
    /// Ordered, human-readable evaluation trace.
    pub steps: Vec<String>,
    pub applicable: bool,
}

impl EvaluationOutcome {
    pub fn new(result: Applicability, logic: impl Into<String>, steps: Vec<String>) -> Self {
        Self {
            result,
            logic: logic.into(),
            steps,
            applicable: result.is_applicable(),
        }
    }

    /// Outcome with an empty trace (literals, unconditional cases).
    pub fn literal(result: Applicability, logic: impl Into<String>) -> Self {
        Self::new(result, logic, Vec::new())
    }
}

/// Per-test-case entry of a [`FilterResult`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCaseReport {
    pub test_id: String,
    pub applicability_condition: String,
    pub evaluation_result: Applicability,
    pub evaluation_logic: String,
    pub evaluation_steps: Vec<String>,
    pub d_selections: Vec<String>,
    pub e_selections: Vec<String>,
}

/// Fallback parser activity for one run (or one ad-hoc resolution).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackStats {
    pub parser_calls: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub failures: u64,
}

/// Audit metadata of a filter run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub success_rate: f64,
    pub pics_items_count: usize,
    pub dictionary_size: usize,
    pub conditions_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specification_id: Option<String>,
    pub fallback: FallbackStats,
    pub evaluated_at: String,
}

/// Complete answer of a filter run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterResult {
    pub matched_test_ids: Vec<String>,
    pub test_cases: Vec<TestCaseReport>,
    pub total_evaluated: usize,
    pub matched_count: usize,
    pub evaluation_breakdown: BTreeMap<String, usize>,
    pub metadata: RunMetadata,
}

impl FilterResult {
    pub fn report(&self, test_id: &str) -> Option<&TestCaseReport> {
        self.test_cases.iter().find(|r| r.test_id == test_id)
    }
}
