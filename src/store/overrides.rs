//! Override learning store: the durable feedback memory.
//!
//! Each `(file, task pattern)` key accumulates a bounded adjustment from
//! repeated, consistent user corrections. A single noisy session never
//! shifts future rankings: the deltas apply only from the configured
//! strike count onward, and only while the correction type stays
//! consistent.

use super::ScoutStore;
use crate::domain::{FileRelation, OverridePattern, OverrideType};
use crate::error::Result;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

impl ScoutStore {
    /// Append an override event and fold it into the matching pattern.
    ///
    /// Idempotent per `(session, file, type)`: replaying an event that is
    /// already in the log leaves the pattern untouched, so the strike
    /// threshold counts observations, not deliveries.
    pub fn record_override(
        &self,
        session_id: i64,
        file_path: &str,
        override_type: OverrideType,
        fingerprint: &str,
    ) -> Result<()> {
        let learning = *self.learning();
        let recorded_at = Utc::now().to_rfc3339();

        self.with_retry(|conn| {
            let tx = conn.transaction()?;

            let inserted = tx.execute(
                "INSERT OR IGNORE INTO override_events
                    (session_id, file_path, override_type, fingerprint, recorded_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![session_id, file_path, override_type.as_str(), fingerprint, recorded_at],
            )?;
            if inserted == 0 {
                // Replay of an identical event; nothing new observed.
                tx.commit()?;
                return Ok(());
            }

            let existing = read_pattern(&tx, file_path, fingerprint)?;
            let mut pattern = existing.unwrap_or_else(|| OverridePattern {
                file_path: file_path.to_string(),
                fingerprint: fingerprint.to_string(),
                override_count: 0,
                last_override_type: None,
                cumulative_adjustment: 0.0,
                confidence: 0.0,
            });

            pattern.override_count += 1;
            let consistent = pattern.last_override_type == Some(override_type);
            if pattern.override_count >= learning.strikes && consistent {
                let delta = match override_type {
                    OverrideType::Added => learning.added_delta,
                    OverrideType::Removed => learning.removed_delta,
                    // Kept confirms the ranking; it raises confidence only.
                    OverrideType::Kept => 0.0,
                };
                pattern.cumulative_adjustment = (pattern.cumulative_adjustment + delta)
                    .clamp(learning.adjustment_min, learning.adjustment_max);
            }
            pattern.confidence =
                (pattern.confidence + learning.confidence_increment).min(1.0);
            pattern.last_override_type = Some(override_type);

            write_pattern(&tx, &pattern)?;
            tx.commit()?;
            Ok(())
        })
    }

    /// Learned adjustment for a `(file, pattern)` key, or 0.0 while the
    /// pattern's confidence has not cleared the gate.
    pub fn adjustment(&self, file_path: &str, fingerprint: &str) -> Result<f64> {
        let gate = self.learning().confidence_gate;
        let row = self.with_retry(|conn| {
            conn.query_row(
                "SELECT cumulative_adjustment, confidence FROM override_patterns
                 WHERE file_path = ?1 AND fingerprint = ?2",
                params![file_path, fingerprint],
                |r| Ok((r.get::<_, f64>(0)?, r.get::<_, f64>(1)?)),
            )
            .optional()
        })?;
        Ok(match row {
            Some((adjustment, confidence)) if confidence > gate => adjustment,
            _ => 0.0,
        })
    }

    /// Full pattern row, for diagnostics and tests.
    pub fn pattern(&self, file_path: &str, fingerprint: &str) -> Result<Option<OverridePattern>> {
        self.with_retry(|conn| read_pattern(conn, file_path, fingerprint))
    }

    /// Refresh the relationship cache with relations observed during
    /// signal collection. Strength only ever grows.
    pub fn upsert_relations(&self, relations: &[FileRelation]) -> Result<()> {
        if relations.is_empty() {
            return Ok(());
        }
        self.with_retry(|conn| {
            let tx = conn.transaction()?;
            for rel in relations {
                tx.execute(
                    "INSERT INTO file_relationships (file_a, file_b, relation_type, strength)
                     VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT(file_a, file_b, relation_type)
                     DO UPDATE SET strength = MAX(strength, excluded.strength)",
                    params![rel.file_a, rel.file_b, rel.relation_type.as_str(), rel.strength],
                )?;
            }
            tx.commit()?;
            Ok(())
        })
    }
}

fn read_pattern(
    conn: &Connection,
    file_path: &str,
    fingerprint: &str,
) -> rusqlite::Result<Option<OverridePattern>> {
    conn.query_row(
        "SELECT override_count, last_override_type, cumulative_adjustment, confidence
         FROM override_patterns WHERE file_path = ?1 AND fingerprint = ?2",
        params![file_path, fingerprint],
        |row| {
            Ok(OverridePattern {
                file_path: file_path.to_string(),
                fingerprint: fingerprint.to_string(),
                override_count: row.get::<_, i64>(0)? as u32,
                last_override_type: row
                    .get::<_, Option<String>>(1)?
                    .and_then(|s| OverrideType::parse(&s)),
                cumulative_adjustment: row.get(2)?,
                confidence: row.get(3)?,
            })
        },
    )
    .optional()
}

fn write_pattern(conn: &Connection, pattern: &OverridePattern) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO override_patterns
            (file_path, fingerprint, override_count, last_override_type, cumulative_adjustment, confidence)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(file_path, fingerprint) DO UPDATE SET
            override_count = excluded.override_count,
            last_override_type = excluded.last_override_type,
            cumulative_adjustment = excluded.cumulative_adjustment,
            confidence = excluded.confidence",
        params![
            pattern.file_path,
            pattern.fingerprint,
            pattern.override_count as i64,
            pattern.last_override_type.map(|t| t.as_str()),
            pattern.cumulative_adjustment,
            pattern.confidence,
        ],
    )?;
    Ok(())
}
