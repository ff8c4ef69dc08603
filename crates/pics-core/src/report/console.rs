use crate::model::{Applicability, FilterResult, TestCaseReport};

fn icon(result: Applicability) -> &'static str {
    match result {
        Applicability::Mandatory | Applicability::Required => "✅",
        Applicability::Optional => "➖",
        Applicability::NotApplicable => "⏭️ ",
        Applicability::Error => "❌",
    }
}

/// One line per test case. Deterministic, unit-testable.
#[must_use]
pub fn format_case_line(report: &TestCaseReport) -> String {
    let condition = if report.applicability_condition.trim().is_empty() {
        "(unconditional)"
    } else {
        report.applicability_condition.trim()
    };
    format!(
        "{} {:<24} {:<5} {}",
        icon(report.evaluation_result),
        report.test_id,
        report.evaluation_result.as_str(),
        condition
    )
}

#[must_use]
pub fn format_summary(result: &FilterResult, verbose: bool) -> String {
    let mut lines = Vec::with_capacity(result.test_cases.len() + 4);
    for report in &result.test_cases {
        lines.push(format_case_line(report));
        if verbose {
            for step in &report.evaluation_steps {
                lines.push(format!("    {}", step));
            }
        }
    }

    let breakdown = result
        .evaluation_breakdown
        .iter()
        .map(|(token, count)| format!("{}={}", token, count))
        .collect::<Vec<_>>()
        .join(" ");
    lines.push(String::new());
    lines.push(format!(
        "Matched {} of {} test cases ({})",
        result.matched_count, result.total_evaluated, breakdown
    ));

    let fallback = &result.metadata.fallback;
    lines.push(format!(
        "Success rate: {:.2}%  parser_calls={} cache_hits={} failures={}",
        result.metadata.success_rate, fallback.parser_calls, fallback.cache_hits, fallback.failures
    ));
    lines.join("\n")
}

pub fn print_summary(result: &FilterResult, verbose: bool) {
    println!("{}", format_summary(result, verbose));
}
