use serde::{Deserialize, Serialize};

use crate::errors::{EngineError, EngineResult};
use crate::model::{FilterResult, PicsItem};
use crate::storage::SpecData;

/// One filter run: device capabilities plus the catalog to evaluate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterRequest {
    #[serde(default, alias = "pics")]
    pub pics_items: Vec<PicsItem>,

    #[serde(default, skip_serializing_if = "Option::is_none", alias = "spec_id")]
    pub specification_id: Option<String>,

    /// Inline catalog. Takes precedence over `specification_id`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec_data: Option<SpecData>,
}

/// Where a run takes its catalog from.
#[derive(Debug, Clone, Copy)]
pub enum CatalogSource<'a> {
    Inline(&'a SpecData),
    Stored(&'a str),
}

impl FilterRequest {
    pub fn inline(pics_items: Vec<PicsItem>, spec_data: SpecData) -> Self {
        Self {
            pics_items,
            specification_id: None,
            spec_data: Some(spec_data),
        }
    }

    pub fn stored(pics_items: Vec<PicsItem>, specification_id: impl Into<String>) -> Self {
        Self {
            pics_items,
            specification_id: Some(specification_id.into()),
            spec_data: None,
        }
    }

    pub fn from_json(text: &str) -> EngineResult<Self> {
        serde_json::from_str(text).map_err(|e| EngineError::invalid_request(e.to_string()))
    }

    pub fn catalog(&self) -> EngineResult<CatalogSource<'_>> {
        if let Some(data) = &self.spec_data {
            return Ok(CatalogSource::Inline(data));
        }
        match self.specification_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => Ok(CatalogSource::Stored(id)),
            _ => Err(EngineError::invalid_request(
                "request needs spec_data or specification_id",
            )),
        }
    }
}

/// Wire name of the run result.
pub type FilterResponse = FilterResult;
