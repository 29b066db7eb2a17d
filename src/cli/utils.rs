//! Shared CLI plumbing: engine construction for a project directory.

use crate::config::{load_config, ScoutConfig};
use crate::engine::ContextEngine;
use crate::history::GitHistory;
use crate::store::ScoutStore;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Where the store lives inside a project, unless overridden.
pub const DEFAULT_DB_RELATIVE: &str = ".context-scout/store.sqlite";

pub struct ProjectArgs {
    pub root: PathBuf,
    pub config: ScoutConfig,
}

pub fn resolve_project(path: &Path, config_path: Option<&Path>) -> Result<ProjectArgs> {
    let root = path
        .canonicalize()
        .with_context(|| format!("Cannot resolve project path: {}", path.display()))?;
    if !root.is_dir() {
        anyhow::bail!("Path is not a directory: {}", root.display());
    }
    let config = load_config(&root, config_path)?;
    Ok(ProjectArgs { root, config })
}

/// Open the engine for a project: persistent store plus git history when
/// the directory is inside a repository.
pub fn build_engine(project: &ProjectArgs, db: Option<&Path>) -> Result<ContextEngine> {
    let db_path = match db {
        Some(p) => p.to_path_buf(),
        None => project.root.join(DEFAULT_DB_RELATIVE),
    };
    let root_key = project.root.to_string_lossy().to_string();
    let store = ScoutStore::open(&db_path, &root_key, project.config.learning)?;

    let mut engine = ContextEngine::new(project.config.clone(), store);
    if let Some(history) =
        GitHistory::discover(&project.root, project.config.history_deadline_ms.0)
    {
        engine = engine.with_history(Box::new(history));
    }
    Ok(engine)
}
