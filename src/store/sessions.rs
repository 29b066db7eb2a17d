//! Session ledger: one row per selection request, plus later-arriving
//! outcome feedback.

use super::ScoutStore;
use crate::domain::{SelectedFile, Session, SessionOutcome, TaskMode};
use crate::error::{Result, ScoutError};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

/// A session request about to be persisted.
pub struct SessionRecord<'a> {
    pub task: &'a str,
    pub mode: TaskMode,
    pub fingerprint: &'a str,
    pub focal_file: &'a str,
    pub token_budget: u64,
    pub selection: &'a [SelectedFile],
}

impl ScoutStore {
    /// Persist a request and its computed selection; returns the
    /// monotonically assigned session id.
    pub fn create_session(&self, record: SessionRecord<'_>) -> Result<i64> {
        let selection_json = serde_json::to_string(record.selection)
            .map_err(|e| ScoutError::InvalidInput(format!("unserializable selection: {e}")))?;
        let created_at = Utc::now().to_rfc3339();
        let root = self.project_root().to_string();

        self.with_retry(|conn| {
            conn.execute(
                "INSERT INTO sessions
                    (project_root, task, mode, fingerprint, focal_file, token_budget, created_at, selection)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    root,
                    record.task,
                    record.mode.as_str(),
                    record.fingerprint,
                    record.focal_file,
                    record.token_budget as i64,
                    created_at,
                    selection_json,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Fetch a session by id; sessions are project-scoped, so an id from
    /// a different project root is reported as unknown.
    pub fn get_session(&self, id: i64) -> Result<Session> {
        let row = self.with_retry(|conn| {
            conn.query_row(
                "SELECT project_root, task, mode, fingerprint, focal_file, token_budget,
                        created_at, selection, outcome
                 FROM sessions WHERE id = ?1",
                params![id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, i64>(5)?,
                        row.get::<_, String>(6)?,
                        row.get::<_, String>(7)?,
                        row.get::<_, Option<String>>(8)?,
                    ))
                },
            )
            .optional()
        })?;

        let Some((root, task, mode, fingerprint, focal_file, budget, created_at, selection, outcome)) = row
        else {
            return Err(ScoutError::UnknownSession(id));
        };
        if root != self.project_root() {
            return Err(ScoutError::UnknownSession(id));
        }

        let selection: Vec<SelectedFile> = serde_json::from_str(&selection)
            .map_err(|e| ScoutError::InvalidInput(format!("corrupt selection for session {id}: {e}")))?;
        let outcome: Option<SessionOutcome> = match outcome {
            Some(json) => Some(serde_json::from_str(&json).map_err(|e| {
                ScoutError::InvalidInput(format!("corrupt outcome for session {id}: {e}"))
            })?),
            None => None,
        };

        Ok(Session {
            id,
            task,
            mode: mode.parse().map_err(ScoutError::InvalidInput)?,
            fingerprint,
            focal_file,
            token_budget: budget as u64,
            created_at: created_at
                .parse::<DateTime<Utc>>()
                .unwrap_or_else(|_| Utc::now()),
            selection,
            outcome,
        })
    }

    /// Attach an outcome to a session, at most once.
    pub fn set_outcome(&self, id: i64, outcome: &SessionOutcome) -> Result<()> {
        // Validates existence and project scope first.
        let session = self.get_session(id)?;
        if session.outcome.is_some() {
            return Err(ScoutError::InvalidInput(format!(
                "session {id} already has an outcome"
            )));
        }

        let json = serde_json::to_string(outcome)
            .map_err(|e| ScoutError::InvalidInput(format!("unserializable outcome: {e}")))?;
        let changed = self.with_retry(|conn| {
            conn.execute(
                "UPDATE sessions SET outcome = ?1 WHERE id = ?2 AND outcome IS NULL",
                params![json, id],
            )
        })?;
        if changed == 0 {
            // Lost a race with another outcome writer.
            return Err(ScoutError::InvalidInput(format!("session {id} already has an outcome")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LearningConfig;
    use crate::domain::Tier;

    fn store() -> ScoutStore {
        ScoutStore::open_in_memory("/proj", LearningConfig::default()).unwrap()
    }

    fn record<'a>(selection: &'a [SelectedFile]) -> SessionRecord<'a> {
        SessionRecord {
            task: "fix session expiry",
            mode: TaskMode::Debug,
            fingerprint: "expiry-session",
            focal_file: "src/session.rs",
            token_budget: 4000,
            selection,
        }
    }

    fn selected(path: &str) -> SelectedFile {
        SelectedFile { path: path.to_string(), tier: Tier::Recommended, final_score: 0.6, cost: 100 }
    }

    #[test]
    fn ids_are_monotonic() {
        let store = store();
        let sel = [selected("src/a.rs")];
        let first = store.create_session(record(&sel)).unwrap();
        let second = store.create_session(record(&sel)).unwrap();
        assert!(second > first);
    }

    #[test]
    fn round_trips_request_and_selection() {
        let store = store();
        let sel = [selected("src/a.rs"), selected("src/b.rs")];
        let id = store.create_session(record(&sel)).unwrap();

        let session = store.get_session(id).unwrap();
        assert_eq!(session.task, "fix session expiry");
        assert_eq!(session.mode, TaskMode::Debug);
        assert_eq!(session.fingerprint, "expiry-session");
        assert_eq!(session.selection.len(), 2);
        assert_eq!(session.selection[0].path, "src/a.rs");
        assert!(session.outcome.is_none());
    }

    #[test]
    fn unknown_id_is_reported() {
        let store = store();
        assert!(matches!(store.get_session(42), Err(ScoutError::UnknownSession(42))));
    }

    #[test]
    fn sessions_are_project_scoped() {
        let store = store();
        let sel = [selected("src/a.rs")];
        let id = store.create_session(record(&sel)).unwrap();

        // Same database, different project root: the id must look foreign.
        let foreign = ScoutStore {
            conn: store.conn,
            project_root: "/other".to_string(),
            learning: LearningConfig::default(),
        };
        assert!(matches!(foreign.get_session(id), Err(ScoutError::UnknownSession(_))));
    }

    #[test]
    fn outcome_is_set_at_most_once() {
        let store = store();
        let sel = [selected("src/a.rs")];
        let id = store.create_session(record(&sel)).unwrap();

        let outcome = SessionOutcome { was_successful: true, files_used: vec!["src/a.rs".into()] };
        store.set_outcome(id, &outcome).unwrap();
        assert!(store.get_session(id).unwrap().outcome.is_some());

        let again = store.set_outcome(id, &outcome);
        assert!(matches!(again, Err(ScoutError::InvalidInput(_))));
    }
}
