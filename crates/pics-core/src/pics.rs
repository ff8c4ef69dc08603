//! PICS dictionary builder and the capability-id grammar.

use crate::model::PicsItem;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeMap;
use tracing::debug;

/// Capability id → declared support.
pub type PicsDictionary = BTreeMap<String, bool>;

/// Unanchored capability-id pattern, used to find references inside expressions.
pub(crate) const CAPABILITY_ID_PATTERN: &str = r"A\.\d+(?:\.\d+)*(?:[-/]\d+[a-z]*)*|PC_\w+";

lazy_static! {
    static ref ANCHORED_ID: Regex =
        Regex::new(&format!("^(?:{})$", CAPABILITY_ID_PATTERN)).unwrap();
    pub(crate) static ref CAPABILITY_ID: Regex = Regex::new(CAPABILITY_ID_PATTERN).unwrap();
}

/// Whether `id` is a well-formed capability id (`A.1.2`, `A.4/1a`, `PC_Foo`).
pub fn is_capability_id(id: &str) -> bool {
    ANCHORED_ID.is_match(id)
}

/// Build the lookup table used by every evaluator.
///
/// Later items win over earlier ones with the same id. Items whose id does not
/// match the capability grammar are dropped without error.
pub fn build_dictionary(items: &[PicsItem]) -> PicsDictionary {
    let mut dict = PicsDictionary::new();
    for item in items {
        let id = item.item_id.trim();
        if !is_capability_id(id) {
            debug!(item_id = %item.item_id, "dropping PICS item with malformed id");
            continue;
        }
        dict.insert(id.to_string(), item.value.as_bool());
    }
    dict
}
