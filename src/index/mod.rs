//! Optional text search collaborator.
//!
//! `search_codebase` is a pure pass-through to this index; the scoring
//! pipeline never depends on it. The default implementation ranks files
//! by cosine similarity of hashed token frequency vectors, cheap enough
//! to run without a model or a prebuilt index.

use anyhow::Result;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

const EMBEDDING_DIM: usize = 256;
const SAMPLE_BYTES: u64 = 32_768;
const EXCERPT_MAX_LEN: usize = 120;

#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub path: String,
    pub score: f64,
    /// First line containing a query token, trimmed for display.
    pub excerpt: String,
}

pub trait TextIndex {
    fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>>;
}

/// Hash-embedding search over the scanned file set.
pub struct HashEmbeddingIndex {
    root: PathBuf,
    paths: Vec<String>,
}

impl HashEmbeddingIndex {
    pub fn new(root: &Path, paths: Vec<String>) -> Self {
        Self { root: root.to_path_buf(), paths }
    }
}

impl TextIndex for HashEmbeddingIndex {
    fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
        let query_vec = hash_embedding(query);
        let query_tokens = tokenize(query);

        let mut hits: Vec<SearchHit> = Vec::new();
        for path in &self.paths {
            let Ok(content) = read_sample(&self.root.join(path), SAMPLE_BYTES) else {
                continue;
            };
            // Path tokens count toward the match so file names rank even
            // when their content is opaque.
            let doc = format!("{path}\n{content}");
            let score = cosine_similarity(&query_vec, &hash_embedding(&doc));
            if score <= 0.0 {
                continue;
            }
            hits.push(SearchHit {
                path: path.clone(),
                score,
                excerpt: excerpt(&content, &query_tokens),
            });
        }

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.path.cmp(&b.path))
        });
        hits.truncate(limit);
        Ok(hits)
    }
}

fn read_sample(path: &Path, limit: u64) -> std::io::Result<String> {
    use std::io::Read;
    let file = fs::File::open(path)?;
    let mut content = String::new();
    let _ = file.take(limit).read_to_string(&mut content);
    Ok(content)
}

fn excerpt(content: &str, query_tokens: &[String]) -> String {
    let line = content
        .lines()
        .find(|line| {
            let lower = line.to_lowercase();
            query_tokens.iter().any(|t| lower.contains(t.as_str()))
        })
        .unwrap_or_else(|| content.lines().next().unwrap_or(""));
    let trimmed = line.trim();
    if trimmed.len() > EXCERPT_MAX_LEN {
        let mut end = EXCERPT_MAX_LEN;
        while !trimmed.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}…", &trimmed[..end])
    } else {
        trimmed.to_string()
    }
}

fn hash_embedding(text: &str) -> [f64; EMBEDDING_DIM] {
    let mut vec = [0.0_f64; EMBEDDING_DIM];
    for token in tokenize(text) {
        let hash = fnv1a_64(token.as_bytes());
        vec[(hash % EMBEDDING_DIM as u64) as usize] += 1.0;
    }
    let norm = vec.iter().map(|v| v * v).sum::<f64>().sqrt();
    if norm > 0.0 {
        for value in vec.iter_mut() {
            *value /= norm;
        }
    }
    vec
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|t| t.len() >= 2)
        .map(|t| t.to_lowercase())
        .collect()
}

fn cosine_similarity(a: &[f64; EMBEDDING_DIM], b: &[f64; EMBEDDING_DIM]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum::<f64>()
}

fn fnv1a_64(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x100000001b3;
    let mut hash = OFFSET;
    for byte in bytes {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn search_ranks_matching_content_first() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("src")).unwrap();
        fs::write(
            tmp.path().join("src/auth.rs"),
            "fn authenticate(session: &Session) { renew_token(session) }",
        )
        .unwrap();
        fs::write(tmp.path().join("src/render.rs"), "fn draw(canvas: &mut Canvas) {}").unwrap();

        let index = HashEmbeddingIndex::new(
            tmp.path(),
            vec!["src/auth.rs".to_string(), "src/render.rs".to_string()],
        );
        let hits = index.search("authenticate session token", 10).unwrap();

        assert!(!hits.is_empty());
        assert_eq!(hits[0].path, "src/auth.rs");
        assert!(hits[0].score > 0.0);
        assert!(hits[0].excerpt.contains("authenticate"));
    }

    #[test]
    fn limit_truncates_results() {
        let tmp = TempDir::new().unwrap();
        for i in 0..5 {
            fs::write(tmp.path().join(format!("f{i}.txt")), "shared token soup").unwrap();
        }
        let paths = (0..5).map(|i| format!("f{i}.txt")).collect();
        let index = HashEmbeddingIndex::new(tmp.path(), paths);
        let hits = index.search("token soup", 2).unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn excerpt_is_bounded() {
        let long = "token ".repeat(100);
        let cut = excerpt(&long, &["token".to_string()]);
        assert!(cut.chars().count() <= EXCERPT_MAX_LEN + 1);
    }
}
