use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OpenFlags};
use tracing::debug;

use super::schema::REQUIRED_TABLES;
use super::{collect_conditions, ConditionMap, ConditionStore};
use crate::errors::{EngineError, EngineResult};
use crate::model::TestCase;

/// Read-only SQLite condition store. One connection, reused across runs.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    path: PathBuf,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore").field("path", &self.path).finish()
    }
}

impl SqliteStore {
    pub fn open_read_only(path: &Path) -> EngineResult<Self> {
        if !path.is_file() {
            return Err(EngineError::configuration(format!(
                "condition store not found: {}",
                path.display()
            )));
        }
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| {
            EngineError::configuration(format!("failed to open {}: {}", path.display(), e))
        })?;

        verify_schema(&conn)?;
        debug!(path = %path.display(), "opened condition store");

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: path.to_path_buf(),
        })
    }

    async fn with_conn<T, F>(&self, f: F) -> EngineResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> EngineResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| EngineError::configuration("condition store lock poisoned"))?;
            f(&guard)
        })
        .await
        .map_err(|e| EngineError::configuration(format!("condition store task failed: {}", e)))?
    }
}

fn verify_schema(conn: &Connection) -> EngineResult<()> {
    let mut stmt =
        conn.prepare("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1")?;
    for table in REQUIRED_TABLES {
        let count: i64 = stmt.query_row(params![table], |row| row.get(0))?;
        if count == 0 {
            return Err(EngineError::configuration(format!(
                "condition store is missing table '{}'",
                table
            )));
        }
    }
    Ok(())
}

#[async_trait]
impl ConditionStore for SqliteStore {
    async fn get_conditions(&self, specification_id: &str) -> EngineResult<ConditionMap> {
        let spec = specification_id.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT condition_id, definition
                 FROM c_conditions
                 WHERE specification_id = ?1
                 ORDER BY rowid",
            )?;
            let rows = stmt.query_map(params![spec], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?;

            let mut pairs = Vec::new();
            for r in rows {
                pairs.push(r?);
            }
            Ok(collect_conditions(pairs))
        })
        .await
    }

    async fn get_test_cases(&self, specification_id: &str) -> EngineResult<Vec<TestCase>> {
        let spec = specification_id.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT specification_id, test_id, clause, title, release,
                        applicability_condition, comment
                 FROM test_cases
                 WHERE specification_id = ?1
                 ORDER BY rowid",
            )?;
            let rows = stmt.query_map(params![spec], |row| {
                Ok(TestCase {
                    specification_id: row.get(0)?,
                    test_id: row.get(1)?,
                    clause: row.get(2)?,
                    title: row.get(3)?,
                    release: row.get(4)?,
                    applicability_condition: row
                        .get::<_, Option<String>>(5)?
                        .unwrap_or_default(),
                    comment: row.get(6)?,
                })
            })?;

            let mut cases = Vec::new();
            for r in rows {
                cases.push(r?);
            }
            Ok(cases)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::schema::DDL;

    fn fixture(dir: &tempfile::TempDir) -> PathBuf {
        let path = dir.path().join("spec.db");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(DDL).unwrap();
        conn.execute_batch(
            "INSERT INTO c_conditions VALUES ('S1', 'c1', 'IF A.1 THEN M ELSE N/A');
             INSERT INTO c_conditions VALUES ('S1', 'C2', 'O');
             INSERT INTO c_conditions VALUES ('S2', 'C1', 'R');
             INSERT INTO test_cases VALUES ('S1', 'T2', '5.1', 'Second', 'R1', 'C2', NULL);
             INSERT INTO test_cases VALUES ('S1', 'T1', '5.2', 'First', 'R1', NULL, 'D1 E2');",
        )
        .unwrap();
        path
    }

    #[tokio::test]
    async fn reads_conditions_and_cases_in_row_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open_read_only(&fixture(&dir)).unwrap();

        let conditions = store.get_conditions("S1").await.unwrap();
        assert_eq!(conditions.len(), 2);
        assert_eq!(conditions["C1"], "IF A.1 THEN M ELSE N/A");

        let cases = store.get_test_cases("S1").await.unwrap();
        let ids: Vec<_> = cases.iter().map(|c| c.test_id.as_str()).collect();
        assert_eq!(ids, vec!["T2", "T1"]);
        assert_eq!(cases[1].applicability_condition, "");
        assert_eq!(cases[1].comment.as_deref(), Some("D1 E2"));

        assert!(store.get_conditions("unknown").await.unwrap().is_empty());
    }

    #[test]
    fn missing_file_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = SqliteStore::open_read_only(&dir.path().join("nope.db")).unwrap_err();
        assert!(matches!(err, EngineError::Configuration { .. }));
    }

    #[test]
    fn missing_tables_are_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.db");
        Connection::open(&path)
            .unwrap()
            .execute_batch("CREATE TABLE other (x TEXT);")
            .unwrap();
        let err = SqliteStore::open_read_only(&path).unwrap_err();
        assert!(err.to_string().contains("c_conditions"));
    }
}
