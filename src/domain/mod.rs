//! Shared domain types for scoring, selection, and feedback learning.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A candidate file as reported by the codebase scanner.
///
/// Owned by the caller of signal collection; the core never mutates it.
#[derive(Debug, Clone, PartialEq)]
pub struct FileDescriptor {
    /// Path relative to the project root, forward slashes.
    pub path: String,
    pub size_bytes: u64,
    pub modified_at: DateTime<Utc>,
    /// Declared import/dependency targets, resolved to relative paths
    /// of other scanned files where possible.
    pub imports: Vec<String>,
}

/// Coarse classification of a task description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskMode {
    Debug,
    Feature,
    Refactor,
    Test,
    General,
}

impl TaskMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskMode::Debug => "debug",
            TaskMode::Feature => "feature",
            TaskMode::Refactor => "refactor",
            TaskMode::Test => "test",
            TaskMode::General => "general",
        }
    }
}

impl std::str::FromStr for TaskMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "debug" => Ok(TaskMode::Debug),
            "feature" => Ok(TaskMode::Feature),
            "refactor" => Ok(TaskMode::Refactor),
            "test" => Ok(TaskMode::Test),
            "general" => Ok(TaskMode::General),
            other => Err(format!("unknown task mode: {other}")),
        }
    }
}

/// Discrete relevance bucket derived from thresholding a score.
///
/// Ordering matters: `Essential` sorts before `Recommended` and so on,
/// which the selector relies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Essential,
    Recommended,
    Optional,
    Excluded,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Essential => "essential",
            Tier::Recommended => "recommended",
            Tier::Optional => "optional",
            Tier::Excluded => "excluded",
        }
    }
}

/// The four independent relevance signals, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SignalSet {
    pub keyword: f64,
    pub recency: f64,
    pub relation: f64,
    pub co_change: f64,
}

impl SignalSet {
    pub fn is_all_zero(&self) -> bool {
        self.keyword == 0.0 && self.recency == 0.0 && self.relation == 0.0 && self.co_change == 0.0
    }
}

/// Per-file scoring result for one request. Recomputed every request,
/// never persisted as-is.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredFile {
    pub path: String,
    pub signals: SignalSet,
    pub base_score: f64,
    pub adjustment: f64,
    pub final_score: f64,
    pub tier: Tier,
    /// Human-readable reason trail, dominant signal first.
    pub reasons: Vec<String>,
    /// Cost in budget units (estimated tokens).
    pub cost: u64,
}

impl ScoredFile {
    pub fn primary_reason(&self) -> &str {
        self.reasons.first().map(String::as_str).unwrap_or("")
    }
}

/// Explicit user correction type for a proposed selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverrideType {
    Added,
    Removed,
    Kept,
}

impl OverrideType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OverrideType::Added => "added",
            OverrideType::Removed => "removed",
            OverrideType::Kept => "kept",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "added" => Some(OverrideType::Added),
            "removed" => Some(OverrideType::Removed),
            "kept" => Some(OverrideType::Kept),
            _ => None,
        }
    }
}

/// Durable learning state for one `(file, task pattern)` key.
///
/// Never deleted, only updated in place; this is the memory that must
/// survive process restarts.
#[derive(Debug, Clone, PartialEq)]
pub struct OverridePattern {
    pub file_path: String,
    pub fingerprint: String,
    pub override_count: u32,
    pub last_override_type: Option<OverrideType>,
    pub cumulative_adjustment: f64,
    pub confidence: f64,
}

/// One file in a finished selection, as persisted with the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectedFile {
    pub path: String,
    pub tier: Tier,
    pub final_score: f64,
    pub cost: u64,
}

/// Outcome feedback for a session, set at most once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionOutcome {
    pub was_successful: bool,
    pub files_used: Vec<String>,
}

/// One selection request and its result, as recorded by the ledger.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: i64,
    pub task: String,
    pub mode: TaskMode,
    pub fingerprint: String,
    pub focal_file: String,
    pub token_budget: u64,
    pub created_at: DateTime<Utc>,
    pub selection: Vec<SelectedFile>,
    pub outcome: Option<SessionOutcome>,
}

/// Cached structural relationship between two files, symmetric pair.
#[derive(Debug, Clone, PartialEq)]
pub struct FileRelation {
    pub file_a: String,
    pub file_b: String,
    pub relation_type: RelationType,
    pub strength: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationType {
    SameDirectory,
    Import,
    TestPair,
}

impl RelationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationType::SameDirectory => "same_directory",
            RelationType::Import => "import",
            RelationType::TestPair => "test_pair",
        }
    }
}

/// Estimate budget cost in tokens from byte size (chars / 4 heuristic).
pub fn estimate_tokens(size_bytes: u64) -> u64 {
    size_bytes / 4
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_ordering_matches_selection_priority() {
        assert!(Tier::Essential < Tier::Recommended);
        assert!(Tier::Recommended < Tier::Optional);
        assert!(Tier::Optional < Tier::Excluded);
    }

    #[test]
    fn override_type_round_trips_through_str() {
        for t in [OverrideType::Added, OverrideType::Removed, OverrideType::Kept] {
            assert_eq!(OverrideType::parse(t.as_str()), Some(t));
        }
        assert_eq!(OverrideType::parse("dropped"), None);
    }

    #[test]
    fn all_zero_signal_detection() {
        assert!(SignalSet::default().is_all_zero());
        let set = SignalSet { keyword: 0.1, ..Default::default() };
        assert!(!set.is_all_zero());
    }
}
