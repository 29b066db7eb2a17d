//! End-to-end tests for the context engine.

use chrono::{Duration, Utc};
use context_scout::config::ScoutConfig;
use context_scout::domain::{FileDescriptor, OverrideType, Tier};
use context_scout::index::{SearchHit, TextIndex};
use context_scout::engine::{ContextEngine, ContextRequest, ContextResponse};
use context_scout::error::ScoutError;
use context_scout::store::ScoutStore;

fn file(path: &str, age_days: i64, size: u64, imports: &[&str]) -> FileDescriptor {
    FileDescriptor {
        path: path.to_string(),
        size_bytes: size,
        modified_at: Utc::now() - Duration::days(age_days),
        imports: imports.iter().map(|s| s.to_string()).collect(),
    }
}

fn engine() -> ContextEngine {
    let config = ScoutConfig::default();
    let store = ScoutStore::open_in_memory("/proj", config.learning).unwrap();
    ContextEngine::new(config, store)
}

/// The snapshot from the auth scenario: a focal controller, two fresh
/// siblings, and stale unrelated files.
fn auth_snapshot() -> Vec<FileDescriptor> {
    vec![
        file("src/api/authController.js", 1, 4_000, &["src/api/authService.js"]),
        file("src/api/authService.js", 2, 3_000, &[]),
        file("src/api/sessionManager.js", 1, 3_000, &["src/api/authController.js"]),
        file("config/auth.config.js", 40, 2_000, &[]),
        file("src/utils/logger.js", 90, 2_000, &[]),
        file("docs/roadmap.md", 120, 6_000, &[]),
    ]
}

fn auth_request(files: &[FileDescriptor]) -> ContextRequest<'_> {
    ContextRequest {
        task: "fix authentication error when session expires",
        focal_file: "src/api/authController.js",
        files,
        token_budget: 4000,
        min_relevance: None,
    }
}

fn tier_of(response: &ContextResponse, path: &str) -> Option<Tier> {
    response.included.iter().find(|f| f.path == path).map(|f| f.tier)
}

#[test]
fn auth_scenario_ranks_fresh_auth_files_high() {
    let files = auth_snapshot();
    let response = engine().get_optimal_context(auth_request(&files)).unwrap();

    assert_eq!(response.task_mode.as_str(), "debug");
    assert_eq!(tier_of(&response, "src/api/authController.js"), Some(Tier::Essential));
    for path in ["src/api/authService.js", "src/api/sessionManager.js"] {
        let tier = tier_of(&response, path).unwrap_or_else(|| panic!("{path} not included"));
        assert!(
            matches!(tier, Tier::Essential | Tier::Recommended),
            "{path} landed in {tier:?}"
        );
    }

    // Every excluded file carries a non-empty reason.
    assert!(!response.excluded.is_empty());
    for excluded in &response.excluded {
        assert!(!excluded.reasons.is_empty(), "{} has no reason", excluded.path);
        assert!(!excluded.reasons[0].is_empty());
    }
}

#[test]
fn identical_requests_are_deterministic() {
    let files = auth_snapshot();
    let engine = engine();
    let now = Utc::now();

    let first = engine.get_optimal_context_at(auth_request(&files), now).unwrap();
    let second = engine.get_optimal_context_at(auth_request(&files), now).unwrap();

    // Session ids advance; everything else is byte-for-byte identical.
    assert!(second.session_id > first.session_id);
    let key = |r: &ContextResponse| {
        r.included
            .iter()
            .map(|f| (f.path.clone(), f.tier, f.final_score.to_bits()))
            .collect::<Vec<_>>()
    };
    assert_eq!(key(&first), key(&second));
    assert_eq!(first.total_cost, second.total_cost);
}

#[test]
fn essential_files_survive_a_tiny_budget() {
    let files = auth_snapshot();
    let mut request = auth_request(&files);
    request.token_budget = 10;
    let response = engine().get_optimal_context(request).unwrap();

    assert_eq!(tier_of(&response, "src/api/authController.js"), Some(Tier::Essential));
    // Anything excluded over budget says so, distinct from irrelevance.
    let budget_cut: Vec<_> = response
        .excluded
        .iter()
        .filter(|f| f.reasons[0] == "budget exceeded")
        .collect();
    assert!(!budget_cut.is_empty());
}

#[test]
fn scoring_completes_without_version_history() {
    // The default test engine has no history provider at all.
    let files = auth_snapshot();
    let response = engine().get_optimal_context(auth_request(&files)).unwrap();
    assert!(!response.included.is_empty());
    // The degradation is visible in the reason trail, not an error.
    let focal = response.included.iter().find(|f| f.path == "src/api/authController.js").unwrap();
    assert!(focal.reasons.iter().any(|r| r.contains("co-change unavailable")));
}

#[test]
fn invalid_input_is_rejected_before_any_state() {
    let files = auth_snapshot();
    let engine = engine();

    let mut request = auth_request(&files);
    request.task = "   ";
    assert!(matches!(
        engine.get_optimal_context(request),
        Err(ScoutError::InvalidInput(_))
    ));

    let mut request = auth_request(&files);
    request.token_budget = 0;
    assert!(matches!(
        engine.get_optimal_context(request),
        Err(ScoutError::InvalidInput(_))
    ));

    let mut request = auth_request(&files);
    request.min_relevance = Some(1.5);
    assert!(matches!(
        engine.get_optimal_context(request),
        Err(ScoutError::InvalidInput(_))
    ));
}

#[test]
fn overrides_against_unknown_sessions_fail_cleanly() {
    let engine = engine();
    assert!(matches!(
        engine.apply_user_overrides(999, &["a.rs".to_string()], &[], &[]),
        Err(ScoutError::UnknownSession(999))
    ));
    assert!(matches!(
        engine.record_session_outcome(999, true, &[]),
        Err(ScoutError::UnknownSession(999))
    ));
}

#[test]
fn repeated_added_overrides_raise_future_scores() {
    let files = auth_snapshot();
    let engine = engine();
    let now = Utc::now();
    let target = "config/auth.config.js".to_string();

    let score_of = |response: &ContextResponse| -> f64 {
        response
            .included
            .iter()
            .find(|f| f.path == target)
            .map(|f| f.final_score)
            .or_else(|| {
                response.excluded.iter().find(|f| f.path == target).map(|f| f.final_score)
            })
            .expect("target file scored")
    };

    // Three sessions with the same phrasing, each correcting the same
    // omission.
    let first = engine.get_optimal_context_at(auth_request(&files), now).unwrap();
    let first_score = score_of(&first);
    engine.apply_user_overrides(first.session_id, &[target.clone()], &[], &[]).unwrap();

    for _ in 0..2 {
        let response = engine.get_optimal_context_at(auth_request(&files), now).unwrap();
        engine.apply_user_overrides(response.session_id, &[target.clone()], &[], &[]).unwrap();
    }

    let fourth = engine.get_optimal_context_at(auth_request(&files), now).unwrap();
    let fourth_score = score_of(&fourth);
    assert!(
        fourth_score > first_score,
        "learning had no effect: {first_score} -> {fourth_score}"
    );
    // Two sessions of feedback were not enough; the jump happened only
    // after the third consistent override.
    assert_eq!(
        engine.store().pattern(&target, "authentication-error-expires-session").unwrap().unwrap().override_count,
        3
    );
}

#[test]
fn two_overrides_are_not_enough_to_learn() {
    let files = auth_snapshot();
    let engine = engine();
    let now = Utc::now();
    let target = "config/auth.config.js".to_string();

    for _ in 0..2 {
        let response = engine.get_optimal_context_at(auth_request(&files), now).unwrap();
        engine.apply_user_overrides(response.session_id, &[target.clone()], &[], &[]).unwrap();
    }

    let fingerprint = "authentication-error-expires-session";
    assert_eq!(engine.store().adjustment(&target, fingerprint).unwrap(), 0.0);
}

#[test]
fn successful_outcome_records_implicit_overrides() {
    let files = auth_snapshot();
    let engine = engine();
    let response = engine.get_optimal_context(auth_request(&files)).unwrap();
    let fingerprint = "authentication-error-expires-session";

    // The user used a file we never selected, and ignored a recommended
    // one.
    let ignored = response
        .included
        .iter()
        .find(|f| f.tier == Tier::Recommended)
        .map(|f| f.path.clone())
        .expect("some recommended file");
    let used: Vec<String> = response
        .included
        .iter()
        .filter(|f| f.path != ignored)
        .map(|f| f.path.clone())
        .chain(["src/utils/logger.js".to_string()])
        .collect();

    engine.record_session_outcome(response.session_id, true, &used).unwrap();

    let added = engine.store().pattern("src/utils/logger.js", fingerprint).unwrap().unwrap();
    assert_eq!(added.override_count, 1);
    let removed = engine.store().pattern(&ignored, fingerprint).unwrap().unwrap();
    assert_eq!(removed.override_count, 1);

    // A second report for the same session is rejected.
    assert!(matches!(
        engine.record_session_outcome(response.session_id, true, &used),
        Err(ScoutError::InvalidInput(_))
    ));
}

#[test]
fn failed_outcome_never_penalizes_unused_files() {
    let files = auth_snapshot();
    let engine = engine();
    let response = engine.get_optimal_context(auth_request(&files)).unwrap();
    let fingerprint = "authentication-error-expires-session";

    let selected: Vec<String> = response.included.iter().map(|f| f.path.clone()).collect();
    engine.record_session_outcome(response.session_id, false, &[]).unwrap();

    for path in &selected {
        assert!(
            engine.store().pattern(path, fingerprint).unwrap().is_none(),
            "{path} was penalized by a failed session"
        );
    }
}

#[test]
fn outcome_report_resumes_after_partial_delivery() {
    let files = auth_snapshot();
    let engine = engine();
    let response = engine.get_optimal_context(auth_request(&files)).unwrap();
    let fingerprint = "authentication-error-expires-session";

    let used: Vec<String> = response
        .included
        .iter()
        .map(|f| f.path.clone())
        .chain(["src/utils/logger.js".to_string()])
        .collect();

    // A previous attempt died after recording the implicit addition but
    // before the outcome was written.
    engine
        .store()
        .record_override(response.session_id, "src/utils/logger.js", OverrideType::Added, fingerprint)
        .unwrap();

    // Replaying the full report succeeds: the already-delivered event is
    // ignored, the outcome lands, nothing is counted twice.
    engine.record_session_outcome(response.session_id, true, &used).unwrap();

    let pattern = engine.store().pattern("src/utils/logger.js", fingerprint).unwrap().unwrap();
    assert_eq!(pattern.override_count, 1);

    // Only now is a further report a duplicate.
    assert!(matches!(
        engine.record_session_outcome(response.session_id, true, &used),
        Err(ScoutError::InvalidInput(_))
    ));
}

#[test]
fn index_failures_are_reported_as_index_errors() {
    struct Broken;
    impl TextIndex for Broken {
        fn search(&self, _: &str, _: usize) -> anyhow::Result<Vec<SearchHit>> {
            anyhow::bail!("index offline")
        }
    }

    let engine = engine().with_index(Box::new(Broken));
    assert!(matches!(
        engine.search_codebase("anything", 5),
        Err(ScoutError::Index(_))
    ));
}

#[test]
fn min_relevance_floor_tightens_the_selection() {
    let files = auth_snapshot();
    let engine = engine();
    let now = Utc::now();

    let loose = engine.get_optimal_context_at(auth_request(&files), now).unwrap();
    let mut request = auth_request(&files);
    request.min_relevance = Some(0.7);
    let tight = engine.get_optimal_context_at(request, now).unwrap();

    assert!(tight.included.len() < loose.included.len());
    for file in &tight.included {
        assert!(file.final_score >= 0.7);
    }
}

#[test]
fn search_without_an_index_returns_empty() {
    let engine = engine();
    assert!(engine.search_codebase("anything", 5).unwrap().is_empty());
    assert!(matches!(
        engine.search_codebase("  ", 5),
        Err(ScoutError::InvalidInput(_))
    ));
}
