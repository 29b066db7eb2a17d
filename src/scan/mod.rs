//! Codebase scanner collaborator.
//!
//! Walks a project root with gitignore support, producing the read-only
//! file descriptors the engine scores: relative path, size, modification
//! time, and declared import references resolved against the scanned
//! set. Unreadable files become scan errors, never aborts.

use crate::config::ScanConfig;
use crate::domain::FileDescriptor;
use anyhow::Result;
use chrono::{DateTime, Utc};
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

/// Bytes of each file examined for import references.
const IMPORT_SAMPLE_BYTES: u64 = 16_384;

#[derive(Debug, Default, Clone)]
pub struct ScanStats {
    pub files_scanned: usize,
    pub files_included: usize,
    pub files_skipped_glob: usize,
    pub files_skipped_size: usize,
    pub scan_errors: Vec<String>,
}

pub struct CodebaseScanner {
    root: PathBuf,
    exclude_globs: Vec<String>,
    max_file_bytes: u64,
    respect_gitignore: bool,
    stats: ScanStats,
}

impl CodebaseScanner {
    pub fn new(root: PathBuf, config: &ScanConfig) -> Self {
        Self {
            root,
            exclude_globs: config.exclude_globs.clone(),
            max_file_bytes: config.max_file_bytes,
            respect_gitignore: config.respect_gitignore,
            stats: ScanStats::default(),
        }
    }

    fn build_exclude_globset(&self) -> Result<GlobSet> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.exclude_globs {
            if let Ok(glob) = Glob::new(pattern) {
                builder.add(glob);
            }
        }
        Ok(builder.build()?)
    }

    /// Scan the project and return descriptors in deterministic sorted
    /// order by relative path.
    pub fn scan(&mut self) -> Result<Vec<FileDescriptor>> {
        self.stats = ScanStats::default();
        let exclude_globset = self.build_exclude_globset()?;

        let dir_filter = |entry: &ignore::DirEntry| -> bool {
            if let Some(file_type) = entry.file_type() {
                if file_type.is_dir() {
                    if let Some(name) = entry.file_name().to_str() {
                        if matches!(name, "node_modules" | "__pycache__" | ".git" | ".venv" | "venv") {
                            return false;
                        }
                        if name.starts_with('.') && name != ".github" {
                            return false;
                        }
                    }
                }
            }
            true
        };

        let mut builder = WalkBuilder::new(&self.root);
        builder
            .git_ignore(self.respect_gitignore)
            .git_global(self.respect_gitignore)
            .git_exclude(self.respect_gitignore)
            .hidden(false)
            .parents(self.respect_gitignore)
            .filter_entry(dir_filter);

        let mut raw: Vec<(PathBuf, String, u64, DateTime<Utc>)> = Vec::new();
        for entry_result in builder.build() {
            let entry = match entry_result {
                Ok(e) => e,
                Err(e) => {
                    self.stats.scan_errors.push(e.to_string());
                    continue;
                }
            };
            let path = entry.path();
            if path.is_dir() {
                continue;
            }
            self.stats.files_scanned += 1;

            let rel_path = match path.strip_prefix(&self.root) {
                Ok(p) => normalize_path(p.to_str().unwrap_or("")),
                Err(_) => continue,
            };

            if exclude_globset.is_match(&rel_path) {
                self.stats.files_skipped_glob += 1;
                continue;
            }

            let metadata = match path.metadata() {
                Ok(m) => m,
                Err(e) => {
                    self.stats.scan_errors.push(format!("{rel_path}: {e}"));
                    continue;
                }
            };
            if metadata.len() > self.max_file_bytes {
                self.stats.files_skipped_size += 1;
                continue;
            }

            let modified_at = metadata
                .modified()
                .map(DateTime::<Utc>::from)
                .unwrap_or_else(|_| Utc::now());

            raw.push((path.to_path_buf(), rel_path, metadata.len(), modified_at));
        }

        raw.sort_by(|a, b| a.1.cmp(&b.1));

        // Two passes: references first, then resolution against the full
        // scanned set so imports point at real relative paths.
        let known: HashSet<String> = raw.iter().map(|(_, rel, _, _)| rel.clone()).collect();
        let stem_index = build_stem_index(&known);

        let mut result = Vec::new();
        for (path, rel_path, size, modified_at) in raw {
            let references = match read_sample(&path, IMPORT_SAMPLE_BYTES) {
                Ok(content) => extract_import_references(&content),
                Err(e) => {
                    self.stats.scan_errors.push(format!("{rel_path}: {e}"));
                    Vec::new()
                }
            };
            let imports = resolve_references(&references, &rel_path, &stem_index);

            self.stats.files_included += 1;
            result.push(FileDescriptor { path: rel_path, size_bytes: size, modified_at, imports });
        }

        Ok(result)
    }

    pub fn stats(&self) -> &ScanStats {
        &self.stats
    }
}

fn normalize_path(path: &str) -> String {
    path.replace('\\', "/")
}

fn read_sample(path: &Path, limit: u64) -> std::io::Result<String> {
    use std::io::Read;
    let file = fs::File::open(path)?;
    let mut content = String::new();
    // Invalid UTF-8 (binary) files simply yield no references.
    let _ = file.take(limit).read_to_string(&mut content);
    Ok(content)
}

static IMPORT_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // Rust: use crate::auth::session; / mod session;
        r"(?m)^\s*use\s+(?:crate|super|self)?(?:::)?([A-Za-z0-9_:]+)",
        r"(?m)^\s*(?:pub\s+)?mod\s+([A-Za-z0-9_]+)\s*;",
        // Python: import auth.session / from auth.session import x
        r"(?m)^\s*import\s+([A-Za-z0-9_.]+)",
        r"(?m)^\s*from\s+([A-Za-z0-9_.]+)\s+import",
        // JS/TS: import x from './auth' / require('./auth')
        r#"(?m)import\s+[^"']*["']([^"']+)["']"#,
        r#"(?m)require\(\s*["']([^"']+)["']\s*\)"#,
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static import pattern"))
    .collect()
});

/// Raw import-ish references found in a file sample.
pub fn extract_import_references(content: &str) -> Vec<String> {
    let mut refs = Vec::new();
    for pattern in IMPORT_PATTERNS.iter() {
        for captures in pattern.captures_iter(content) {
            if let Some(m) = captures.get(1) {
                refs.push(m.as_str().to_string());
            }
        }
    }
    refs
}

/// Index from lowercase file stem to relative paths sharing it.
fn build_stem_index(known: &HashSet<String>) -> HashMap<String, Vec<String>> {
    let mut index: HashMap<String, Vec<String>> = HashMap::new();
    for path in known {
        let stem = stem_of(path);
        index.entry(stem).or_default().push(path.clone());
    }
    for paths in index.values_mut() {
        paths.sort();
    }
    index
}

fn stem_of(path: &str) -> String {
    let name = path.rsplit('/').next().unwrap_or(path);
    match name.rfind('.') {
        Some(idx) => name[..idx].to_lowercase(),
        None => name.to_lowercase(),
    }
}

/// Resolve references to relative paths of scanned files by matching the
/// final module segment against file stems. Self-references are dropped.
fn resolve_references(
    references: &[String],
    source: &str,
    stem_index: &HashMap<String, Vec<String>>,
) -> Vec<String> {
    let mut imports = Vec::new();
    let mut seen = HashSet::new();
    for reference in references {
        let segment = reference
            .trim_end_matches('/')
            .rsplit(|c| c == ':' || c == '.' || c == '/')
            .next()
            .unwrap_or(reference)
            .to_lowercase();
        if segment.is_empty() {
            continue;
        }
        if let Some(paths) = stem_index.get(&segment) {
            for path in paths {
                if path != source && seen.insert(path.clone()) {
                    imports.push(path.clone());
                }
            }
        }
    }
    imports.sort();
    imports
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScanConfig;
    use tempfile::TempDir;

    fn scan(root: &Path) -> Vec<FileDescriptor> {
        let mut config = ScanConfig::default();
        config.respect_gitignore = false;
        CodebaseScanner::new(root.to_path_buf(), &config).scan().unwrap()
    }

    #[test]
    fn scan_is_sorted_and_relative() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("src")).unwrap();
        fs::write(tmp.path().join("src/b.rs"), "fn b() {}").unwrap();
        fs::write(tmp.path().join("src/a.rs"), "fn a() {}").unwrap();

        let files = scan(tmp.path());
        let paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["src/a.rs", "src/b.rs"]);
    }

    #[test]
    fn oversized_files_are_skipped_with_stat() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("big.rs"), "a".repeat(2_000_000)).unwrap();
        fs::write(tmp.path().join("small.rs"), "fn main() {}").unwrap();

        let mut config = ScanConfig::default();
        config.respect_gitignore = false;
        let mut scanner = CodebaseScanner::new(tmp.path().to_path_buf(), &config);
        let files = scanner.scan().unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, "small.rs");
        assert_eq!(scanner.stats().files_skipped_size, 1);
    }

    #[test]
    fn noise_dirs_are_skipped() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("node_modules")).unwrap();
        fs::write(tmp.path().join("node_modules/x.js"), "noise").unwrap();
        fs::write(tmp.path().join("main.js"), "real").unwrap();

        let files = scan(tmp.path());
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, "main.js");
    }

    #[test]
    fn rust_imports_resolve_to_sibling_files() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("src")).unwrap();
        fs::write(tmp.path().join("src/main.rs"), "mod session;\nuse crate::session::Session;\n").unwrap();
        fs::write(tmp.path().join("src/session.rs"), "pub struct Session;").unwrap();

        let files = scan(tmp.path());
        let main = files.iter().find(|f| f.path == "src/main.rs").unwrap();
        assert_eq!(main.imports, vec!["src/session.rs"]);
    }

    #[test]
    fn js_imports_resolve_by_stem() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("src/api")).unwrap();
        fs::write(
            tmp.path().join("src/api/authController.js"),
            "import { verify } from './authService';\nconst db = require('../db');\n",
        )
        .unwrap();
        fs::write(tmp.path().join("src/api/authService.js"), "export const verify = 1;").unwrap();
        fs::write(tmp.path().join("src/db.js"), "module.exports = {};").unwrap();

        let files = scan(tmp.path());
        let controller = files.iter().find(|f| f.path == "src/api/authController.js").unwrap();
        assert_eq!(controller.imports, vec!["src/api/authService.js", "src/db.js"]);
    }

    #[test]
    fn extract_references_covers_python() {
        let refs = extract_import_references("import os\nfrom auth.session import renew\n");
        assert!(refs.contains(&"os".to_string()));
        assert!(refs.contains(&"auth.session".to_string()));
    }
}
