//! Budget-constrained selection over scored, tiered files.
//!
//! The budget is a soft target for recommended/optional tiers and a
//! floor-not-ceiling for essential files: essentials are never dropped
//! for budget reasons alone.

use crate::domain::{ScoredFile, Tier};
use std::cmp::Ordering;

/// Reason attached to files dropped purely for budget, distinct from
/// irrelevance.
pub const BUDGET_EXCEEDED: &str = "budget exceeded";

/// Outcome of one selection pass.
#[derive(Debug, Clone)]
pub struct SelectionResult {
    /// Included files in final presentation order.
    pub included: Vec<ScoredFile>,
    /// Excluded files, each carrying a non-empty reason trail.
    pub excluded: Vec<ScoredFile>,
    /// Total cost of the included set, in budget units.
    pub total_cost: u64,
}

/// Select files under `budget` cost units.
///
/// Ordering is `(tier, final score desc, path depth asc, path lex asc)`
/// and is deterministic under repeated identical input. `min_relevance`,
/// when given, is the caller's relevance floor for every tier: a file
/// below it is excluded as irrelevant, which is the only way an
/// essential-tier file can ever be excluded here.
pub fn select(mut files: Vec<ScoredFile>, budget: u64, min_relevance: Option<f64>) -> SelectionResult {
    files.sort_by(rank_order);

    let mut included = Vec::new();
    let mut excluded = Vec::new();
    let mut total_cost = 0u64;

    for mut file in files {
        if file.tier == Tier::Excluded {
            excluded.push(file);
            continue;
        }

        if let Some(floor) = min_relevance {
            if file.final_score < floor {
                file.reasons.insert(0, format!("below minimum relevance {floor:.2}"));
                file.tier = Tier::Excluded;
                excluded.push(file);
                continue;
            }
        }

        // Essential files are always included, even past the budget.
        if file.tier == Tier::Essential || total_cost + file.cost <= budget {
            total_cost += file.cost;
            included.push(file);
        } else {
            file.reasons.insert(0, BUDGET_EXCEEDED.to_string());
            excluded.push(file);
        }
    }

    SelectionResult { included, excluded, total_cost }
}

fn rank_order(a: &ScoredFile, b: &ScoredFile) -> Ordering {
    a.tier
        .cmp(&b.tier)
        .then_with(|| b.final_score.partial_cmp(&a.final_score).unwrap_or(Ordering::Equal))
        .then_with(|| path_depth(&a.path).cmp(&path_depth(&b.path)))
        .then_with(|| a.path.cmp(&b.path))
}

fn path_depth(path: &str) -> usize {
    path.matches('/').count()
}
