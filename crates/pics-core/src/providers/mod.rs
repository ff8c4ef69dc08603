//! Condition-parsing service clients.

pub mod http;

use crate::errors::{ParserError, ParserResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use http::HttpConditionParser;

/// Structured shape the parsing service returns for one free-form expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedCondition {
    pub antecedent: String,

    #[serde(rename = "then", alias = "then_value")]
    pub then_value: String,

    #[serde(rename = "else", alias = "else_value", default = "default_else")]
    pub else_value: String,

    /// Capability ids the service found in the expression.
    #[serde(default)]
    pub references: Vec<String>,
}

fn default_else() -> String {
    "N/A".to_string()
}

#[async_trait]
pub trait ConditionParser: Send + Sync {
    /// Parse a single expression.
    async fn parse_one(&self, expression: &str) -> ParserResult<ParsedCondition>;

    /// Parse many expressions in one request. Results are positional; a service may
    /// return fewer results than expressions.
    async fn parse_batch(&self, expressions: &[String]) -> ParserResult<Vec<ParsedCondition>>;

    fn provider_name(&self) -> &'static str;
}

/// Parser used when no service is configured. Every request fails, so every
/// expression it sees degrades to `R`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineParser;

#[async_trait]
impl ConditionParser for OfflineParser {
    async fn parse_one(&self, _expression: &str) -> ParserResult<ParsedCondition> {
        Err(ParserError::Unavailable {
            message: "no condition parser configured".to_string(),
        })
    }

    async fn parse_batch(&self, _expressions: &[String]) -> ParserResult<Vec<ParsedCondition>> {
        Err(ParserError::Unavailable {
            message: "no condition parser configured".to_string(),
        })
    }

    fn provider_name(&self) -> &'static str {
        "offline"
    }
}
