//! The context engine: the four exposed operations, orchestrating
//! pattern extraction, signal collection, scoring, selection, and the
//! ledger. One request is one synchronous unit; it either completes with
//! a full selection or fails with a named error, never partially.

use crate::config::{ScoutConfig, TierThresholds};
use crate::domain::{
    FileDescriptor, FileRelation, OverrideType, ScoredFile, SelectedFile, SessionOutcome, TaskMode,
    Tier,
};
use crate::error::{Result, ScoutError};
use crate::index::{SearchHit, TextIndex};
use crate::pattern;
use crate::score;
use crate::select::{self, SelectionResult};
use crate::signal::{HistoryProvider, SignalCollector};
use crate::store::sessions::SessionRecord;
use crate::store::ScoutStore;
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::Serialize;

/// One selection request. The file list is the caller's codebase
/// snapshot, read-only to the engine.
pub struct ContextRequest<'a> {
    pub task: &'a str,
    pub focal_file: &'a str,
    pub files: &'a [FileDescriptor],
    pub token_budget: u64,
    pub min_relevance: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IncludedFile {
    pub path: String,
    pub tier: Tier,
    pub final_score: f64,
    pub primary_reason: String,
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExcludedFile {
    pub path: String,
    pub final_score: f64,
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContextResponse {
    pub session_id: i64,
    pub task_mode: TaskMode,
    pub included: Vec<IncludedFile>,
    pub excluded: Vec<ExcludedFile>,
    pub total_cost: u64,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct OverrideSummary {
    pub added: usize,
    pub removed: usize,
    pub kept: usize,
}

pub struct ContextEngine {
    config: ScoutConfig,
    store: ScoutStore,
    history: Option<Box<dyn HistoryProvider + Send + Sync>>,
    index: Option<Box<dyn TextIndex + Send + Sync>>,
}

impl ContextEngine {
    pub fn new(config: ScoutConfig, store: ScoutStore) -> Self {
        Self { config, store, history: None, index: None }
    }

    pub fn with_history(mut self, history: Box<dyn HistoryProvider + Send + Sync>) -> Self {
        self.history = Some(history);
        self
    }

    pub fn with_index(mut self, index: Box<dyn TextIndex + Send + Sync>) -> Self {
        self.index = Some(index);
        self
    }

    pub fn store(&self) -> &ScoutStore {
        &self.store
    }

    /// Score, tier, and select files for a task, recording the session.
    pub fn get_optimal_context(&self, request: ContextRequest<'_>) -> Result<ContextResponse> {
        self.get_optimal_context_at(request, Utc::now())
    }

    /// Same as [`get_optimal_context`](Self::get_optimal_context) with an
    /// injected clock, so identical inputs reproduce identical scores.
    pub fn get_optimal_context_at(
        &self,
        request: ContextRequest<'_>,
        now: DateTime<Utc>,
    ) -> Result<ContextResponse> {
        if request.task.trim().is_empty() {
            return Err(ScoutError::InvalidInput("task description is empty".to_string()));
        }
        if request.token_budget == 0 {
            return Err(ScoutError::InvalidInput("token budget must be positive".to_string()));
        }
        if let Some(floor) = request.min_relevance {
            if !(0.0..=1.0).contains(&floor) {
                return Err(ScoutError::InvalidInput(format!(
                    "minimum relevance {floor} outside [0, 1]"
                )));
            }
        }

        let task_pattern = pattern::extract(request.task);
        tracing::debug!(
            mode = task_pattern.mode.as_str(),
            fingerprint = %task_pattern.fingerprint,
            files = request.files.len(),
            "scoring request"
        );

        let focal = self.resolve_focal(request.focal_file, request.files, now);
        let collector = SignalCollector::new(
            &self.config,
            request.task,
            &focal,
            self.history.as_deref().map(|h| h as &dyn HistoryProvider),
            now,
        );

        // Signal collection is pure per file; score lookup against the
        // store stays sequential behind its lock.
        let collected: Vec<_> =
            request.files.par_iter().map(|file| collector.collect(file)).collect();

        let thresholds = self.effective_thresholds(request.min_relevance);
        let mut relations: Vec<FileRelation> = Vec::new();
        let mut scored: Vec<ScoredFile> = Vec::with_capacity(request.files.len());
        for (file, signals) in request.files.iter().zip(collected.iter()) {
            let adjustment =
                self.store.adjustment(&file.path, &task_pattern.fingerprint)?;
            scored.push(score::score_file(
                file,
                signals,
                adjustment,
                &self.config.weights,
                &thresholds,
            ));
            relations.extend(signals.relations.iter().cloned());
        }

        let result = select::select(scored, request.token_budget, request.min_relevance);
        self.store.upsert_relations(&relations)?;

        let selection: Vec<SelectedFile> = result
            .included
            .iter()
            .map(|f| SelectedFile {
                path: f.path.clone(),
                tier: f.tier,
                final_score: f.final_score,
                cost: f.cost,
            })
            .collect();
        let session_id = self.store.create_session(SessionRecord {
            task: request.task,
            mode: task_pattern.mode,
            fingerprint: &task_pattern.fingerprint,
            focal_file: request.focal_file,
            token_budget: request.token_budget,
            selection: &selection,
        })?;

        Ok(build_response(session_id, task_pattern.mode, result))
    }

    /// Record explicit user corrections against a session's selection.
    pub fn apply_user_overrides(
        &self,
        session_id: i64,
        added: &[String],
        removed: &[String],
        kept: &[String],
    ) -> Result<OverrideSummary> {
        let session = self.store.get_session(session_id)?;

        let mut summary = OverrideSummary::default();
        for (paths, override_type, count) in [
            (added, OverrideType::Added, &mut summary.added),
            (removed, OverrideType::Removed, &mut summary.removed),
            (kept, OverrideType::Kept, &mut summary.kept),
        ] {
            for path in paths {
                self.store.record_override(session_id, path, override_type, &session.fingerprint)?;
                *count += 1;
            }
        }
        tracing::info!(
            session = session_id,
            added = summary.added,
            removed = summary.removed,
            kept = summary.kept,
            "recorded overrides"
        );
        Ok(summary)
    }

    /// Record whether a session's selection led to success, folding the
    /// report into the learning store as implicit overrides.
    pub fn record_session_outcome(
        &self,
        session_id: i64,
        was_successful: bool,
        files_used: &[String],
    ) -> Result<()> {
        let session = self.store.get_session(session_id)?;
        if session.outcome.is_some() {
            return Err(ScoutError::InvalidInput(format!(
                "session {session_id} already has an outcome"
            )));
        }

        // The implicit overrides land before the write-once outcome. A
        // failure partway through leaves the outcome unset, so the caller
        // can replay the whole report; the event log ignores replayed
        // events, so nothing is counted twice.

        // Files the user pulled in on their own are implicit additions.
        let selected: Vec<&str> = session.selection.iter().map(|f| f.path.as_str()).collect();
        for path in files_used {
            if !selected.contains(&path.as_str()) {
                self.store.record_override(
                    session_id,
                    path,
                    OverrideType::Added,
                    &session.fingerprint,
                )?;
            }
        }

        // Unused high-tier recommendations are implicit removals, but a
        // failed session's non-use of a file is not informative.
        if was_successful {
            for file in &session.selection {
                let unused = !files_used.iter().any(|u| u == &file.path);
                if unused && matches!(file.tier, Tier::Essential | Tier::Recommended) {
                    self.store.record_override(
                        session_id,
                        &file.path,
                        OverrideType::Removed,
                        &session.fingerprint,
                    )?;
                }
            }
        }

        let outcome = SessionOutcome { was_successful, files_used: files_used.to_vec() };
        self.store.set_outcome(session_id, &outcome)?;
        Ok(())
    }

    /// Delegate a free-text search to the configured index; an engine
    /// without one answers with no results.
    pub fn search_codebase(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
        if query.trim().is_empty() {
            return Err(ScoutError::InvalidInput("search query is empty".to_string()));
        }
        match &self.index {
            Some(index) => index
                .search(query, limit.max(1))
                .map_err(|e| ScoutError::Index(format!("{e:#}"))),
            None => {
                tracing::debug!("no text index configured, returning empty results");
                Ok(Vec::new())
            }
        }
    }

    /// The focal file may legitimately be absent from the snapshot (for
    /// example a file the user is about to create); an empty descriptor
    /// still anchors the relation signal.
    fn resolve_focal(
        &self,
        focal_path: &str,
        files: &[FileDescriptor],
        now: DateTime<Utc>,
    ) -> FileDescriptor {
        files.iter().find(|f| f.path == focal_path).cloned().unwrap_or_else(|| FileDescriptor {
            path: focal_path.to_string(),
            size_bytes: 0,
            modified_at: now,
            imports: Vec::new(),
        })
    }

    /// The caller's minimum relevance replaces the recommended band.
    fn effective_thresholds(&self, min_relevance: Option<f64>) -> TierThresholds {
        let mut thresholds = self.config.thresholds;
        if let Some(floor) = min_relevance {
            thresholds.recommended = floor;
        }
        thresholds
    }
}

fn build_response(session_id: i64, mode: TaskMode, result: SelectionResult) -> ContextResponse {
    ContextResponse {
        session_id,
        task_mode: mode,
        included: result
            .included
            .into_iter()
            .map(|f| IncludedFile {
                primary_reason: f.primary_reason().to_string(),
                path: f.path,
                tier: f.tier,
                final_score: f.final_score,
                reasons: f.reasons,
            })
            .collect(),
        excluded: result
            .excluded
            .into_iter()
            .map(|f| ExcludedFile { path: f.path, final_score: f.final_score, reasons: f.reasons })
            .collect(),
        total_cost: result.total_cost,
    }
}
