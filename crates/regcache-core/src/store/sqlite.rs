//! SQLite-backed rule cache.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use tracing::{debug, info};

use super::{Result, RuleAssignment, RuleRecord, RuleStore, RuleTransition};
use crate::error::StoreError;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS regex_rules (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        label TEXT NOT NULL,
        field_name TEXT NOT NULL,
        rule_name TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        UNIQUE(label, field_name)
    );
    CREATE TABLE IF NOT EXISTS regex_conflicts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        label TEXT NOT NULL,
        field_name TEXT NOT NULL,
        marked_at TEXT NOT NULL,
        UNIQUE(label, field_name)
    );
";

/// Rule cache persisted in an SQLite database.
///
/// One connection is shared behind a store-wide lock, so every read and every
/// `save_rule` of this process is serialized. `save_rule` additionally runs in
/// an `IMMEDIATE` transaction, which takes the database write lock up front and
/// keeps other processes using the same file from racing the check-then-act.
pub struct SqliteRuleStore {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl SqliteRuleStore {
    /// Open (or create) the database at `path`.
    pub fn open(path: impl AsRef<Path>, busy_timeout: Duration) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        conn.busy_timeout(busy_timeout)?;
        conn.execute_batch(SCHEMA)?;

        debug!("Opened rule cache at {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
            path: Some(path.to_path_buf()),
        })
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: None,
        })
    }

    /// Delete the database at `path` and recreate an empty schema.
    pub fn reset(path: impl AsRef<Path>, busy_timeout: Duration) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            std::fs::remove_file(path).map_err(|source| StoreError::File {
                path: path.display().to_string(),
                source,
            })?;
            info!("Removed rule cache {}", path.display());
        }
        Self::open(path, busy_timeout)
    }

    /// Database file, `None` when in memory.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }
}

fn read_assignment(conn: &Connection, label: &str, field: &str) -> Result<RuleAssignment> {
    let conflicting = conn
        .query_row(
            "SELECT 1 FROM regex_conflicts WHERE label = ?1 AND field_name = ?2",
            params![label, field],
            |_| Ok(()),
        )
        .optional()?
        .is_some();
    if conflicting {
        return Ok(RuleAssignment::Conflicting);
    }

    let rule: Option<String> = conn
        .query_row(
            "SELECT rule_name FROM regex_rules WHERE label = ?1 AND field_name = ?2",
            params![label, field],
            |row| row.get(0),
        )
        .optional()?;

    Ok(rule.map_or(RuleAssignment::Unassigned, RuleAssignment::Active))
}

impl RuleStore for SqliteRuleStore {
    fn assignment(&self, label: &str, field: &str) -> Result<RuleAssignment> {
        let mut conn = self.lock()?;
        // Snapshot both tables so a concurrent conflict write is seen whole.
        let tx = conn.transaction()?;
        let assignment = read_assignment(&tx, label, field)?;
        tx.commit()?;

        debug!(label, field, ?assignment, "Read rule assignment");
        Ok(assignment)
    }

    fn save_rule(&self, label: &str, field: &str, rule: &str) -> Result<RuleTransition> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let current = read_assignment(&tx, label, field)?;
        let (_, transition) = current.observe(rule);
        let now = Utc::now().to_rfc3339();

        match &transition {
            RuleTransition::Assigned | RuleTransition::Unchanged => {
                tx.execute(
                    "INSERT INTO regex_rules (label, field_name, rule_name, updated_at)
                     VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT(label, field_name)
                     DO UPDATE SET rule_name = excluded.rule_name, updated_at = excluded.updated_at",
                    params![label, field, rule, now],
                )?;
            }
            RuleTransition::Conflicted { .. } => {
                tx.execute(
                    "DELETE FROM regex_rules WHERE label = ?1 AND field_name = ?2",
                    params![label, field],
                )?;
                tx.execute(
                    "INSERT OR REPLACE INTO regex_conflicts (label, field_name, marked_at)
                     VALUES (?1, ?2, ?3)",
                    params![label, field, now],
                )?;
            }
            RuleTransition::Ignored => {}
        }

        tx.commit()?;

        match &transition {
            RuleTransition::Assigned => {
                info!(label, field, rule, "Saved rule");
            }
            RuleTransition::Conflicted { previous } => {
                info!(
                    label,
                    field,
                    previous = previous.as_str(),
                    rule,
                    "Conflicting rules, field now routed to the LLM"
                );
            }
            RuleTransition::Unchanged | RuleTransition::Ignored => {
                debug!(label, field, rule, ?transition, "Rule observation");
            }
        }

        Ok(transition)
    }

    fn records(&self) -> Result<Vec<RuleRecord>> {
        let conn = self.lock()?;
        let mut records = Vec::new();

        let mut stmt = conn.prepare(
            "SELECT label, field_name, rule_name, updated_at FROM regex_rules",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(RuleRecord {
                label: row.get(0)?,
                field: row.get(1)?,
                assignment: RuleAssignment::Active(row.get(2)?),
                updated_at: row.get(3)?,
            })
        })?;
        for row in rows {
            records.push(row?);
        }

        let mut stmt = conn.prepare(
            "SELECT label, field_name, marked_at FROM regex_conflicts",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(RuleRecord {
                label: row.get(0)?,
                field: row.get(1)?,
                assignment: RuleAssignment::Conflicting,
                updated_at: row.get(2)?,
            })
        })?;
        for row in rows {
            records.push(row?);
        }

        records.sort_by(|a, b| (&a.label, &a.field).cmp(&(&b.label, &b.field)));
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests_support;

    #[test]
    fn test_contract_in_memory() {
        let store = SqliteRuleStore::open_in_memory().unwrap();
        tests_support::exercise_contract(&store);
    }

    #[test]
    fn test_state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.db");

        {
            let store = SqliteRuleStore::open(&path, Duration::from_secs(1)).unwrap();
            store.save_rule("RG", "data_emissao", "DATA_BR").unwrap();
            store.save_rule("RG", "cpf", "CPF").unwrap();
            store.save_rule("RG", "cpf", "N10").unwrap();
        }

        let store = SqliteRuleStore::open(&path, Duration::from_secs(1)).unwrap();
        assert_eq!(
            store.get_rule("RG", "data_emissao").unwrap(),
            Some("DATA_BR".to_string())
        );
        assert!(store.is_conflicting("RG", "cpf").unwrap());
        assert_eq!(store.get_rule("RG", "cpf").unwrap(), None);
    }

    #[test]
    fn test_conflict_removes_rule_row() {
        let store = SqliteRuleStore::open_in_memory().unwrap();
        store.save_rule("CNH", "validade", "DATA_BR").unwrap();
        store.save_rule("CNH", "validade", "DATA_ISO").unwrap();

        let conn = store.lock().unwrap();
        let rules: i64 = conn
            .query_row("SELECT COUNT(*) FROM regex_rules", [], |row| row.get(0))
            .unwrap();
        let conflicts: i64 = conn
            .query_row("SELECT COUNT(*) FROM regex_conflicts", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rules, 0);
        assert_eq!(conflicts, 1);
    }

    #[test]
    fn test_reset_clears_everything() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.db");

        let store = SqliteRuleStore::open(&path, Duration::from_secs(1)).unwrap();
        store.save_rule("RG", "nome", "EMAIL").unwrap();
        drop(store);

        let store = SqliteRuleStore::reset(&path, Duration::from_secs(1)).unwrap();
        assert!(store.records().unwrap().is_empty());
        assert_eq!(store.path(), Some(path.as_path()));
    }

    #[test]
    fn test_concurrent_learners_detect_conflict() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.db");
        let store = std::sync::Arc::new(
            SqliteRuleStore::open(&path, Duration::from_secs(5)).unwrap(),
        );

        let handles: Vec<_> = ["DATA_BR", "DATA_ISO"]
            .into_iter()
            .map(|rule| {
                let store = store.clone();
                std::thread::spawn(move || store.save_rule("RG", "data_emissao", rule).unwrap())
            })
            .collect();

        let mut transitions: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        transitions.sort_by_key(|t| matches!(t, RuleTransition::Conflicted { .. }));

        assert_eq!(transitions[0], RuleTransition::Assigned);
        assert!(matches!(transitions[1], RuleTransition::Conflicted { .. }));
        assert!(store.is_conflicting("RG", "data_emissao").unwrap());
    }

    #[test]
    fn test_two_handles_on_one_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.db");
        let first = SqliteRuleStore::open(&path, Duration::from_secs(5)).unwrap();
        let second = SqliteRuleStore::open(&path, Duration::from_secs(5)).unwrap();

        assert_eq!(
            first.save_rule("RG", "data_emissao", "DATA_BR").unwrap(),
            RuleTransition::Assigned
        );
        assert!(matches!(
            second.save_rule("RG", "data_emissao", "DATA_ISO").unwrap(),
            RuleTransition::Conflicted { .. }
        ));
        assert!(first.is_conflicting("RG", "data_emissao").unwrap());
    }
}
