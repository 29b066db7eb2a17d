//! Override and outcome commands: feed corrections back into the
//! learning store.

use super::utils::{build_engine, resolve_project};
use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

#[derive(Args)]
pub struct OverrideArgs {
    /// Project directory the session belongs to
    #[arg(long, value_name = "PATH", default_value = ".")]
    pub path: PathBuf,

    /// Session id returned by `select`
    #[arg(long, value_name = "ID")]
    pub session: i64,

    /// Files the selection should have included
    #[arg(long = "add", value_name = "FILE")]
    pub added: Vec<String>,

    /// Files the selection should not have included
    #[arg(long = "remove", value_name = "FILE")]
    pub removed: Vec<String>,

    /// Files the selection got right
    #[arg(long = "keep", value_name = "FILE")]
    pub kept: Vec<String>,

    /// Store database path (default: <path>/.context-scout/store.sqlite)
    #[arg(long, value_name = "FILE")]
    pub db: Option<PathBuf>,
}

pub fn run_override(args: OverrideArgs) -> Result<()> {
    if args.added.is_empty() && args.removed.is_empty() && args.kept.is_empty() {
        anyhow::bail!("Nothing to record: pass at least one of --add, --remove, --keep");
    }
    let project = resolve_project(&args.path, None)?;
    let engine = build_engine(&project, args.db.as_deref())?;
    let summary =
        engine.apply_user_overrides(args.session, &args.added, &args.removed, &args.kept)?;
    println!(
        "Recorded overrides for session {}: {} added, {} removed, {} kept",
        args.session, summary.added, summary.removed, summary.kept
    );
    Ok(())
}

#[derive(Args)]
pub struct OutcomeArgs {
    /// Project directory the session belongs to
    #[arg(long, value_name = "PATH", default_value = ".")]
    pub path: PathBuf,

    /// Session id returned by `select`
    #[arg(long, value_name = "ID")]
    pub session: i64,

    /// The task completed successfully
    #[arg(long, conflicts_with = "failure")]
    pub success: bool,

    /// The task did not complete
    #[arg(long)]
    pub failure: bool,

    /// Files actually used while completing the task
    #[arg(long = "used", value_name = "FILE")]
    pub files_used: Vec<String>,

    /// Store database path (default: <path>/.context-scout/store.sqlite)
    #[arg(long, value_name = "FILE")]
    pub db: Option<PathBuf>,
}

pub fn run_outcome(args: OutcomeArgs) -> Result<()> {
    if !args.success && !args.failure {
        anyhow::bail!("Outcome must be either --success or --failure");
    }
    let project = resolve_project(&args.path, None)?;
    let engine = build_engine(&project, args.db.as_deref())?;
    engine.record_session_outcome(args.session, args.success, &args.files_used)?;
    println!(
        "Recorded {} outcome for session {} ({} files used)",
        if args.success { "successful" } else { "failed" },
        args.session,
        args.files_used.len()
    );
    Ok(())
}
