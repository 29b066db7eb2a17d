//! Search command: query the lightweight text index.

use super::utils::{build_engine, resolve_project};
use crate::index::HashEmbeddingIndex;
use crate::scan::CodebaseScanner;
use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

#[derive(Args)]
pub struct SearchArgs {
    /// Free-text query
    #[arg(value_name = "QUERY")]
    pub query: String,

    /// Project directory to search
    #[arg(long, value_name = "PATH", default_value = ".")]
    pub path: PathBuf,

    /// Max results to display
    #[arg(short = 'n', long, value_name = "COUNT", default_value_t = 10)]
    pub limit: usize,

    /// Emit results as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: SearchArgs) -> Result<()> {
    let project = resolve_project(&args.path, None)?;
    let mut scanner = CodebaseScanner::new(project.root.clone(), &project.config.scan);
    let paths: Vec<String> = scanner.scan()?.into_iter().map(|f| f.path).collect();

    let index = HashEmbeddingIndex::new(&project.root, paths);
    let engine = build_engine(&project, None)?.with_index(Box::new(index));
    let hits = engine.search_codebase(&args.query, args.limit)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&hits)?);
        return Ok(());
    }
    if hits.is_empty() {
        println!("No matches");
        return Ok(());
    }
    for hit in hits {
        println!("{:.3}  {}  {}", hit.score, hit.path, hit.excerpt);
    }
    Ok(())
}
