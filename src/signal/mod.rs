//! Per-file relevance signal collection.
//!
//! Four independent signals in `[0, 1]`, each separately testable:
//! keyword/path overlap, recency, structural relation to the focal file,
//! and historical co-change. Missing signal sources never fail a request;
//! they degrade to zero with a note in the reason trail.

use crate::config::ScoutConfig;
use crate::domain::{FileDescriptor, FileRelation, RelationType, SignalSet};
use crate::pattern;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};

/// Version-history collaborator, consumed at its interface only.
///
/// Implementations must return empty results, not errors, when no history
/// system is present.
pub trait HistoryProvider {
    /// Relative paths modified within the last `hours_window` hours.
    fn recently_modified(&self, hours_window: u64) -> anyhow::Result<HashSet<String>>;

    /// For each file, the fraction of the last `lookback` commits touching
    /// `focal_file` that also touched it.
    fn co_change_frequency(
        &self,
        focal_file: &str,
        lookback: usize,
    ) -> anyhow::Result<HashMap<String, f64>>;
}

/// Signals for one candidate plus the evidence behind them.
#[derive(Debug, Clone)]
pub struct CollectedSignals {
    pub signals: SignalSet,
    /// One reason per non-zero signal, keyed for later ordering by
    /// contribution in the scorer.
    pub keyword_reason: Option<String>,
    pub recency_reason: Option<String>,
    pub relation_reason: Option<String>,
    pub co_change_reason: Option<String>,
    /// Degradation notes, e.g. an unavailable history source.
    pub notes: Vec<String>,
    /// Structural relations observed while computing the relation signal.
    pub relations: Vec<FileRelation>,
}

/// Collects signals for every candidate of one request.
///
/// Construction resolves everything that is per-request rather than
/// per-file: task tokens, the focal file's directory and imports, and the
/// prefetched co-change map.
pub struct SignalCollector {
    task_tokens: Vec<String>,
    focal_path: String,
    focal_dir: String,
    focal_stem: String,
    focal_imports: HashSet<String>,
    co_change: HashMap<String, f64>,
    co_change_note: Option<String>,
    recency_horizon_days: f64,
    now: DateTime<Utc>,
}

impl SignalCollector {
    pub fn new(
        cfg: &ScoutConfig,
        task: &str,
        focal: &FileDescriptor,
        history: Option<&dyn HistoryProvider>,
        now: DateTime<Utc>,
    ) -> Self {
        let (co_change, co_change_note) = match history {
            None => (HashMap::new(), Some("co-change unavailable: no version history".to_string())),
            Some(h) => match h.co_change_frequency(&focal.path, cfg.co_change_lookback.0) {
                Ok(map) if map.is_empty() => {
                    (map, Some("co-change unavailable: no shared history".to_string()))
                }
                Ok(map) => (map, None),
                Err(e) => {
                    tracing::debug!("co-change lookup degraded: {e:#}");
                    (HashMap::new(), Some(format!("co-change unavailable: {e}")))
                }
            },
        };

        Self {
            task_tokens: significant_tokens(task),
            focal_path: focal.path.clone(),
            focal_dir: parent_dir(&focal.path),
            focal_stem: file_stem(&focal.path),
            focal_imports: focal.imports.iter().cloned().collect(),
            co_change,
            co_change_note,
            recency_horizon_days: cfg.recency_horizon_days.0,
            now,
        }
    }

    /// Compute all four signals for one candidate.
    pub fn collect(&self, file: &FileDescriptor) -> CollectedSignals {
        let mut out = CollectedSignals {
            signals: SignalSet::default(),
            keyword_reason: None,
            recency_reason: None,
            relation_reason: None,
            co_change_reason: None,
            notes: Vec::new(),
            relations: Vec::new(),
        };

        self.keyword_signal(file, &mut out);
        self.recency_signal(file, &mut out);
        self.relation_signal(file, &mut out);
        self.co_change_signal(file, &mut out);
        out
    }

    fn keyword_signal(&self, file: &FileDescriptor, out: &mut CollectedSignals) {
        if self.task_tokens.is_empty() {
            return;
        }
        let path_tokens = path_tokens(&file.path);
        let matched: Vec<&String> = self
            .task_tokens
            .iter()
            .filter(|task_tok| path_tokens.iter().any(|p| prefix_match(task_tok, p)))
            .collect();
        if matched.is_empty() {
            return;
        }

        // Square root softens the penalty of long task descriptions: one
        // strong path match out of four tokens still reads as 0.5.
        let overlap = matched.len() as f64 / self.task_tokens.len() as f64;
        let mut score = overlap.sqrt();
        if file.path == self.focal_path {
            score = (score + 0.3).min(1.0);
            out.keyword_reason =
                Some(format!("focal file matches task keywords ({})", join(&matched)));
        } else {
            out.keyword_reason = Some(format!("path matches task keywords ({})", join(&matched)));
        }
        out.signals.keyword = score.min(1.0);
    }

    fn recency_signal(&self, file: &FileDescriptor, out: &mut CollectedSignals) {
        let age_days =
            (self.now - file.modified_at).num_seconds().max(0) as f64 / 86_400.0;
        if age_days >= self.recency_horizon_days {
            return;
        }
        let score = 1.0 - age_days / self.recency_horizon_days;
        out.signals.recency = score;
        out.recency_reason = Some(format!("modified {:.1} days ago", age_days));
    }

    fn relation_signal(&self, file: &FileDescriptor, out: &mut CollectedSignals) {
        if file.path == self.focal_path {
            out.signals.relation = 1.0;
            out.relation_reason = Some("focal file".to_string());
            return;
        }

        let mut score: f64 = 0.0;
        let mut parts = Vec::new();

        if parent_dir(&file.path) == self.focal_dir {
            score += 0.5;
            parts.push("same directory as focal file");
            out.relations.push(relation(&file.path, &self.focal_path, RelationType::SameDirectory, 0.5));
        }

        let imports_focal = file.imports.iter().any(|i| i == &self.focal_path);
        if imports_focal || self.focal_imports.contains(&file.path) {
            score += 0.6;
            parts.push(if imports_focal { "imports focal file" } else { "imported by focal file" });
            out.relations.push(relation(&file.path, &self.focal_path, RelationType::Import, 0.6));
        }

        if is_test_pair(&file_stem(&file.path), &self.focal_stem) {
            score += 0.4;
            parts.push("test pairing with focal file");
            out.relations.push(relation(&file.path, &self.focal_path, RelationType::TestPair, 0.4));
        }

        if score > 0.0 {
            out.signals.relation = score.min(1.0);
            out.relation_reason = Some(parts.join(", "));
        }
    }

    fn co_change_signal(&self, file: &FileDescriptor, out: &mut CollectedSignals) {
        if let Some(note) = &self.co_change_note {
            out.notes.push(note.clone());
            return;
        }
        if file.path == self.focal_path {
            return;
        }
        if let Some(freq) = self.co_change.get(&file.path) {
            let score = freq.clamp(0.0, 1.0);
            if score > 0.0 {
                out.signals.co_change = score;
                out.co_change_reason =
                    Some(format!("co-changed with focal file in {:.0}% of recent commits", score * 100.0));
            }
        }
    }
}

fn relation(a: &str, b: &str, relation_type: RelationType, strength: f64) -> FileRelation {
    // Symmetric pair: store lexically ordered so (a,b) and (b,a) collide.
    let (file_a, file_b) =
        if a <= b { (a.to_string(), b.to_string()) } else { (b.to_string(), a.to_string()) };
    FileRelation { file_a, file_b, relation_type, strength }
}

fn join(tokens: &[&String]) -> String {
    tokens.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", ")
}

/// Task tokens worth matching, deduplicated but in description order.
fn significant_tokens(task: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    pattern::significant_tokens(task).into_iter().filter(|t| seen.insert(t.clone())).collect()
}

/// Path components split on separators and case transitions, lowercased.
fn path_tokens(path: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    for component in path.split(|c: char| c == '/' || c == '.' || c == '_' || c == '-') {
        if component.is_empty() {
            continue;
        }
        // Split camelCase: authController -> auth, controller.
        let mut current = String::new();
        for ch in component.chars() {
            if ch.is_uppercase() && !current.is_empty() {
                tokens.push(current.to_lowercase());
                current = String::new();
            }
            current.push(ch);
        }
        if !current.is_empty() {
            tokens.push(current.to_lowercase());
        }
    }
    tokens
}

/// Either token is a prefix of the other, with both long enough to mean
/// something ("auth" matches "authentication", "js" matches nothing).
fn prefix_match(task_token: &str, path_token: &str) -> bool {
    if task_token.len() < 4 || path_token.len() < 4 {
        return task_token == path_token && task_token.len() >= 4;
    }
    task_token.starts_with(path_token) || path_token.starts_with(task_token)
}

fn parent_dir(path: &str) -> String {
    match path.rfind('/') {
        Some(idx) => path[..idx].to_string(),
        None => String::new(),
    }
}

fn file_stem(path: &str) -> String {
    let name = path.rsplit('/').next().unwrap_or(path);
    match name.find('.') {
        Some(idx) => name[..idx].to_lowercase(),
        None => name.to_lowercase(),
    }
}

/// Test pairing by stem convention: `foo` pairs with `foo_test`,
/// `test_foo`, `foo.test`, `foo_spec`.
fn is_test_pair(a: &str, b: &str) -> bool {
    strip_test_affix(a) == b || strip_test_affix(b) == a
}

fn strip_test_affix(stem: &str) -> &str {
    for suffix in ["_test", "_spec", ".test", ".spec"] {
        if let Some(bare) = stem.strip_suffix(suffix) {
            return bare;
        }
    }
    for prefix in ["test_", "spec_"] {
        if let Some(bare) = stem.strip_prefix(prefix) {
            return bare;
        }
    }
    stem
}
