use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{AssistantError, LanguageModel};

pub const MATCH_THRESHOLD: f32 = 0.75;
pub const NO_MATCH_REPLY: &str =
    "I'm sorry, I couldn't find an exact match. Could you provide more details?";

const FAQ_KEYWORDS: [&str; 8] = [
    "modify booking",
    "hidden charge",
    "refund",
    "cancel",
    "policy",
    "charges",
    "payment",
    "change booking",
];

/// Whether a turn should be answered from the FAQ instead of the booking flow.
pub fn is_faq_query(text: &str) -> bool {
    let lower = text.to_lowercase();
    FAQ_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaqEntry {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct EmbeddingCache {
    questions: Vec<String>,
    embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Clone, Default)]
pub struct FaqMatcher {
    entries: Vec<FaqEntry>,
    embeddings: Vec<Vec<f32>>,
}

impl FaqMatcher {
    pub fn from_parts(entries: Vec<FaqEntry>, embeddings: Vec<Vec<f32>>) -> Self {
        Self {
            entries,
            embeddings,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Loads the JSONL dataset and the question embeddings. Embeddings come from
    /// `cache_path` when it matches the dataset, otherwise they are computed and the cache
    /// is rewritten.
    pub async fn load(
        dataset_path: &Path,
        cache_path: &Path,
        model: &dyn LanguageModel,
    ) -> Result<Self> {
        let raw = fs::read_to_string(dataset_path)
            .with_context(|| format!("failed to read FAQ dataset {}", dataset_path.display()))?;
        let entries = parse_dataset(&raw);
        let questions: Vec<String> = entries.iter().map(|e| e.question.clone()).collect();

        if let Some(cache) = read_cache(cache_path) {
            if cache.questions == questions && cache.embeddings.len() == entries.len() {
                info!(entries = entries.len(), "loaded cached FAQ embeddings");
                return Ok(Self::from_parts(entries, cache.embeddings));
            }
            warn!(path = %cache_path.display(), "FAQ embedding cache is stale; recomputing");
        }

        let mut embeddings = Vec::with_capacity(entries.len());
        for entry in &entries {
            embeddings.push(model.embed(&entry.question).await?);
        }
        let cache = EmbeddingCache {
            questions,
            embeddings,
        };
        if let Some(parent) = cache_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        fs::write(cache_path, serde_json::to_vec(&cache)?)
            .with_context(|| format!("failed to write {}", cache_path.display()))?;
        info!(entries = entries.len(), "computed FAQ embeddings");
        Ok(Self::from_parts(entries, cache.embeddings))
    }

    /// Answer of the most similar question, or the fallback reply when nothing clears
    /// [`MATCH_THRESHOLD`].
    pub async fn find_best_match(
        &self,
        model: &dyn LanguageModel,
        question: &str,
    ) -> Result<String, AssistantError> {
        let query = model.embed(question).await?;
        let best = self
            .embeddings
            .iter()
            .enumerate()
            .map(|(idx, candidate)| (idx, cosine_similarity(&query, candidate)))
            .max_by(|a, b| a.1.total_cmp(&b.1));

        match best {
            Some((idx, score)) if score > MATCH_THRESHOLD => Ok(self.entries[idx].answer.clone()),
            _ => Ok(NO_MATCH_REPLY.to_string()),
        }
    }
}

fn parse_dataset(raw: &str) -> Vec<FaqEntry> {
    raw.lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| match serde_json::from_str::<FaqEntry>(line) {
            Ok(entry) => Some(entry),
            Err(error) => {
                warn!(%error, "skipping invalid FAQ line");
                None
            }
        })
        .collect()
}

fn read_cache(path: &Path) -> Option<EmbeddingCache> {
    let raw = fs::read(path).ok()?;
    match serde_json::from_slice(&raw) {
        Ok(cache) => Some(cache),
        Err(error) => {
            warn!(%error, path = %path.display(), "ignoring unreadable FAQ embedding cache");
            None
        }
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
#[path = "tests/faq_tests.rs"]
mod tests;
