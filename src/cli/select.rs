//! Select command: run the scoring pipeline and print the selection.

use super::utils::{build_engine, resolve_project};
use crate::engine::{ContextRequest, ContextResponse};
use crate::scan::CodebaseScanner;
use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

#[derive(Args)]
pub struct SelectArgs {
    /// Project directory to analyze
    #[arg(long, value_name = "PATH", default_value = ".")]
    pub path: PathBuf,

    /// Task description, e.g. "fix authentication error when session expires"
    #[arg(long, value_name = "TEXT")]
    pub task: String,

    /// Focal file the task centers on (relative to the project root)
    #[arg(long, value_name = "FILE")]
    pub file: String,

    /// Token budget for the selection
    #[arg(long, value_name = "TOKENS", default_value_t = 4000)]
    pub budget: u64,

    /// Minimum relevance score for inclusion, in [0, 1]
    #[arg(long, value_name = "SCORE")]
    pub min_relevance: Option<f64>,

    /// Store database path (default: <path>/.context-scout/store.sqlite)
    #[arg(long, value_name = "FILE")]
    pub db: Option<PathBuf>,

    /// Config file path (default: discovered at the project root)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Emit the full response as JSON
    #[arg(long)]
    pub json: bool,

    /// Also list excluded files with their reasons
    #[arg(long)]
    pub show_excluded: bool,
}

pub fn run(args: SelectArgs) -> Result<()> {
    let project = resolve_project(&args.path, args.config.as_deref())?;
    let mut scanner = CodebaseScanner::new(project.root.clone(), &project.config.scan);
    let files = scanner.scan()?;
    for error in &scanner.stats().scan_errors {
        tracing::warn!("scan error: {error}");
    }

    let engine = build_engine(&project, args.db.as_deref())?;
    let response = engine.get_optimal_context(ContextRequest {
        task: &args.task,
        focal_file: &args.file,
        files: &files,
        token_budget: args.budget,
        min_relevance: args.min_relevance,
    })?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        print_response(&response, args.show_excluded);
    }
    Ok(())
}

fn print_response(response: &ContextResponse, show_excluded: bool) {
    println!("Session {} ({} mode)", response.session_id, response.task_mode.as_str());
    println!(
        "Included {} files, ~{} tokens:",
        response.included.len(),
        response.total_cost
    );
    for file in &response.included {
        println!(
            "  [{:<11}] {:.3}  {}  ({})",
            file.tier.as_str(),
            file.final_score,
            file.path,
            file.primary_reason
        );
    }
    if show_excluded {
        println!("Excluded {} files:", response.excluded.len());
        for file in &response.excluded {
            let reason = file.reasons.first().map(String::as_str).unwrap_or("");
            println!("  {}  ({})", file.path, reason);
        }
    }
}
