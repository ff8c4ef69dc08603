use crate::model::FilterResult;
use std::path::Path;

pub fn to_json(result: &FilterResult) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(result)?)
}

pub fn write_json(result: &FilterResult, out: &Path) -> anyhow::Result<()> {
    std::fs::write(out, to_json(result)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::aggregate::{aggregate, RunSummary};
    use crate::model::{Applicability, EvaluationOutcome, TestCase};

    #[test]
    fn writes_wire_shape() {
        let result = aggregate(
            &[TestCase::new("T1", "N/A")],
            vec![EvaluationOutcome::literal(Applicability::NotApplicable, "N/A")],
            RunSummary::default(),
        );
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("result.json");
        write_json(&result, &out).unwrap();

        let v: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(v["test_cases"][0]["evaluation_result"], "N/A");
        assert_eq!(v["evaluation_breakdown"]["N/A"], 1);
        assert_eq!(v["metadata"]["fallback"]["parser_calls"], 0);
        assert!(v["matched_test_ids"].as_array().unwrap().is_empty());
    }
}
