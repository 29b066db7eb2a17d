//! Info command: scan statistics and recent history for a project.

use super::utils::resolve_project;
use crate::history::GitHistory;
use crate::scan::CodebaseScanner;
use crate::signal::HistoryProvider;
use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

#[derive(Args)]
pub struct InfoArgs {
    /// Project directory to analyze
    #[arg(value_name = "PATH", default_value = ".")]
    pub path: PathBuf,

    /// Window for the recently-modified listing, in hours
    #[arg(long, value_name = "HOURS", default_value_t = 168)]
    pub recent_hours: u64,
}

pub fn run(args: InfoArgs) -> Result<()> {
    let project = resolve_project(&args.path, None)?;
    let mut scanner = CodebaseScanner::new(project.root.clone(), &project.config.scan);
    let files = scanner.scan()?;
    let stats = scanner.stats();

    println!("Project: {}", project.root.display());
    println!("Statistics:");
    println!("  files scanned:  {}", stats.files_scanned);
    println!("  files included: {}", stats.files_included);
    println!("  skipped (glob): {}", stats.files_skipped_glob);
    println!("  skipped (size): {}", stats.files_skipped_size);
    if !stats.scan_errors.is_empty() {
        println!("  scan errors:    {}", stats.scan_errors.len());
        for error in &stats.scan_errors {
            println!("    {error}");
        }
    }

    let total_bytes: u64 = files.iter().map(|f| f.size_bytes).sum();
    println!("  total size:     {} bytes (~{} tokens)", total_bytes, total_bytes / 4);

    match GitHistory::discover(&project.root, project.config.history_deadline_ms.0) {
        Some(history) => {
            let recent = history.recently_modified(args.recent_hours)?;
            println!("Recently modified ({}h window): {} files", args.recent_hours, recent.len());
            let mut recent: Vec<_> = recent.into_iter().collect();
            recent.sort();
            for path in recent.iter().take(20) {
                println!("  {path}");
            }
        }
        None => println!("No version history detected"),
    }
    Ok(())
}
