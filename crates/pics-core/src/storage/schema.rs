/// Layout the condition store expects. The engine only ever reads it.
pub const DDL: &str = r#"
CREATE TABLE IF NOT EXISTS c_conditions (
  specification_id TEXT NOT NULL,
  condition_id TEXT NOT NULL,
  definition TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS test_cases (
  specification_id TEXT NOT NULL,
  test_id TEXT NOT NULL,
  clause TEXT,
  title TEXT,
  release TEXT,
  applicability_condition TEXT,
  comment TEXT
);

CREATE INDEX IF NOT EXISTS idx_c_conditions_spec ON c_conditions(specification_id);
CREATE INDEX IF NOT EXISTS idx_test_cases_spec ON test_cases(specification_id);
"#;

pub const REQUIRED_TABLES: &[&str] = &["c_conditions", "test_cases"];
