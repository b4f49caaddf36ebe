//! Static agronomy knowledge base
//!
//! A flat set of keyword-tagged advisory entries, loaded once at startup
//! from a JSON file and read-only for the process lifetime. When the file
//! is absent or malformed the compiled-in citrus entries are served — the
//! process always has a knowledge base.
//!
//! Search is deliberately unranked: matches come back in storage order and
//! downstream consumers use only the first two.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// One static advisory record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KnowledgeEntry {
    pub title: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    pub content: String,
}

/// On-disk knowledge base file format.
#[derive(Debug, Deserialize)]
struct KnowledgeFile {
    entries: Vec<KnowledgeEntry>,
}

/// Knowledge base load errors. Internal — `load` always falls back.
#[derive(Debug, Error)]
pub enum KnowledgeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("knowledge file has no entries")]
    Empty,
}

/// The loaded, immutable knowledge base.
#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    entries: Vec<KnowledgeEntry>,
}

impl KnowledgeBase {
    /// Load from `path` when given, falling back to the compiled-in citrus
    /// entries on any failure.
    pub fn load(path: Option<&Path>) -> Self {
        match path {
            Some(p) => match Self::load_file(p) {
                Ok(entries) => {
                    tracing::info!(path = %p.display(), count = entries.len(), "Loaded knowledge base");
                    Self { entries }
                }
                Err(e) => {
                    tracing::error!(path = %p.display(), error = %e, "Failed to load knowledge base, using built-in entries");
                    Self::builtin()
                }
            },
            None => Self::builtin(),
        }
    }

    /// The compiled-in citrus advisory set.
    pub fn builtin() -> Self {
        Self { entries: builtin_entries() }
    }

    fn load_file(path: &Path) -> Result<Vec<KnowledgeEntry>, KnowledgeError> {
        let raw = std::fs::read_to_string(path)?;
        let file: KnowledgeFile = serde_json::from_str(&raw)?;
        if file.entries.is_empty() {
            return Err(KnowledgeError::Empty);
        }
        Ok(file.entries)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keyword search: an entry matches when any of its keywords occurs in
    /// the lower-cased query, or any query token occurs in its title or
    /// content. All matches are returned in storage order — no ranking.
    pub fn search(&self, query: &str) -> Vec<&KnowledgeEntry> {
        let query_lower = query.to_lowercase();
        let tokens: Vec<&str> = query_lower.split_whitespace().collect();

        self.entries
            .iter()
            .filter(|entry| {
                let title = entry.title.to_lowercase();
                let content = entry.content.to_lowercase();
                entry
                    .keywords
                    .iter()
                    .any(|kw| query_lower.contains(&kw.to_lowercase()))
                    || tokens.iter().any(|t| title.contains(t))
                    || tokens.iter().any(|t| content.contains(t))
            })
            .collect()
    }
}

/// Built-in citrus advisory entries, used when no knowledge file is
/// configured or the configured file cannot be read.
fn builtin_entries() -> Vec<KnowledgeEntry> {
    vec![
        KnowledgeEntry {
            title: "Yellowing leaves".to_string(),
            keywords: vec!["yellow".into(), "yellowing".into(), "chlorosis".into()],
            content: "Uniform yellowing usually signals nitrogen deficiency; \
                      yellowing of new leaves with green veins points to iron \
                      deficiency. Waterlogged roots produce similar symptoms, \
                      so check drainage before fertilizing."
                .to_string(),
        },
        KnowledgeEntry {
            title: "Spider mite control".to_string(),
            keywords: vec!["mite".into(), "mites".into(), "spider".into()],
            content: "Citrus red mites show as pale stippling on leaves with \
                      moving red dots on the underside. Rotate miticides to \
                      avoid resistance and protect predatory mites; hot dry \
                      spells need preventive scouting."
                .to_string(),
        },
        KnowledgeEntry {
            title: "NPK fertilizer ratios".to_string(),
            keywords: vec!["fertilizer".into(), "npk".into(), "nutrient".into()],
            content: "Young trees favor a 2-1-1 N-P-K ratio, flowering favors \
                      1-2-2, and fruit expansion favors 1-1-2. Water in every \
                      application and avoid single-nutrient overdosing."
                .to_string(),
        },
        KnowledgeEntry {
            title: "Heat stress protection".to_string(),
            keywords: vec!["heat".into(), "temperature".into(), "sunburn".into()],
            content: "Above 35°C citrus drops flowers and fruit and sun-facing \
                      fruit scalds. Irrigate mornings or evenings, keep ground \
                      cover for cooling, and shade-net during extremes. Growth \
                      optimum is 15-30°C."
                .to_string(),
        },
        KnowledgeEntry {
            title: "Irrigation scheduling".to_string(),
            keywords: vec!["irrigation".into(), "water".into(), "moisture".into()],
            content: "Target 30-40% soil moisture during flowering and 40-50% \
                      during fruit expansion; ease off near harvest to build \
                      sugars. Drip lines beat furrow irrigation for uniformity \
                      and disease pressure."
                .to_string(),
        },
        KnowledgeEntry {
            title: "Soil pH management".to_string(),
            keywords: vec!["ph".into(), "acidity".into(), "lime".into()],
            content: "Citrus performs best between pH 5.5 and 7.0. Below 5.5 \
                      apply agricultural lime in split doses; above 7.5 use \
                      elemental sulfur and acidifying fertilizers, re-testing \
                      each season."
                .to_string(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_builtin_is_nonempty() {
        let kb = KnowledgeBase::builtin();
        assert!(kb.len() >= 5);
    }

    #[test]
    fn test_search_matches_keywords_in_query() {
        let kb = KnowledgeBase::builtin();
        let hits = kb.search("why are my leaves yellowing so fast");
        assert!(!hits.is_empty());
        assert_eq!(hits[0].title, "Yellowing leaves");
    }

    #[test]
    fn test_search_matches_title_tokens() {
        let kb = KnowledgeBase::builtin();
        let hits = kb.search("irrigation");
        assert!(hits.iter().any(|e| e.title == "Irrigation scheduling"));
    }

    #[test]
    fn test_search_preserves_storage_order() {
        let kb = KnowledgeBase::builtin();
        // "water" appears in several entries; matches must come back in
        // the order they are stored, not by relevance.
        let hits = kb.search("water");
        let positions: Vec<usize> = hits
            .iter()
            .map(|h| kb.entries.iter().position(|e| e == *h).unwrap())
            .collect();
        let mut sorted = positions.clone();
        sorted.sort_unstable();
        assert_eq!(positions, sorted);
    }

    #[test]
    fn test_search_no_match_returns_empty() {
        let kb = KnowledgeBase::builtin();
        assert!(kb.search("blockchain").is_empty());
    }

    #[test]
    fn test_load_malformed_file_falls_back_to_builtin() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json at all").unwrap();

        let kb = KnowledgeBase::load(Some(file.path()));
        assert_eq!(kb.len(), KnowledgeBase::builtin().len());
    }

    #[test]
    fn test_load_valid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let json = serde_json::json!({
            "entries": [
                {"title": "Test entry", "keywords": ["test"], "content": "Body text."}
            ]
        });
        write!(file, "{json}").unwrap();

        let kb = KnowledgeBase::load(Some(file.path()));
        assert_eq!(kb.len(), 1);
        assert_eq!(kb.search("test")[0].title, "Test entry");
    }
}
