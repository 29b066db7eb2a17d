//! Relevance scoring: weighted signal combination, override blending,
//! tier assignment, and the reason trail.

use crate::config::{ScoringWeights, TierThresholds};
use crate::domain::{estimate_tokens, FileDescriptor, ScoredFile, Tier};
use crate::signal::CollectedSignals;

/// Final score ceiling once an override adjustment is blended in. Base
/// scores stay within `[0, 1]`; a maxed-out positive adjustment can push
/// past it.
const MAX_FINAL_SCORE: f64 = 1.5;

/// Score one candidate from its collected signals and a learned
/// adjustment (0.0 when none is surfaced for this task pattern).
///
/// The reason trail ordering is a contract: the dominant signal (largest
/// weighted contribution) comes first, the override note follows the
/// signal reasons, degradation notes come last.
pub fn score_file(
    file: &FileDescriptor,
    collected: &CollectedSignals,
    adjustment: f64,
    weights: &ScoringWeights,
    thresholds: &TierThresholds,
) -> ScoredFile {
    let signals = collected.signals;
    let base_score = weights.keyword * signals.keyword
        + weights.recency * signals.recency
        + weights.relation * signals.relation
        + weights.co_change * signals.co_change;

    let final_score = (base_score + adjustment).clamp(0.0, MAX_FINAL_SCORE);

    // Order signal reasons by weighted contribution, dominant first.
    let mut contributions: Vec<(f64, &Option<String>)> = vec![
        (weights.keyword * signals.keyword, &collected.keyword_reason),
        (weights.recency * signals.recency, &collected.recency_reason),
        (weights.relation * signals.relation, &collected.relation_reason),
        (weights.co_change * signals.co_change, &collected.co_change_reason),
    ];
    contributions.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

    let mut reasons: Vec<String> = contributions
        .into_iter()
        .filter(|(c, reason)| *c > 0.0 && reason.is_some())
        .filter_map(|(_, reason)| reason.clone())
        .collect();

    if adjustment != 0.0 {
        reasons.push(format!("learned adjustment {adjustment:+.2} from past feedback"));
    }
    reasons.extend(collected.notes.iter().cloned());

    // A file with nothing going for it is excluded no matter where the
    // thresholds sit.
    let tier = if signals.is_all_zero() && adjustment == 0.0 {
        reasons.insert(0, "no relevance signals".to_string());
        Tier::Excluded
    } else {
        let tier = assign_tier(final_score, thresholds);
        if tier == Tier::Excluded {
            reasons.insert(0, "below relevance thresholds".to_string());
        }
        tier
    };

    ScoredFile {
        path: file.path.clone(),
        signals,
        base_score,
        adjustment,
        final_score,
        tier,
        reasons,
        cost: estimate_tokens(file.size_bytes),
    }
}

fn assign_tier(final_score: f64, thresholds: &TierThresholds) -> Tier {
    if final_score >= thresholds.essential {
        Tier::Essential
    } else if final_score >= thresholds.recommended {
        Tier::Recommended
    } else if final_score >= thresholds.optional {
        Tier::Optional
    } else {
        Tier::Excluded
    }
}
