use crate::api_client::QueryResponse;
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::PathBuf;
use tracing::{debug, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedResult {
    pub id: u64,
    pub question_hash: String,
    pub question: String,
    pub timestamp: DateTime<Local>,
    pub row_count: usize,
    pub file_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheIndex {
    results: Vec<CachedResult>,
    next_id: u64,
}

impl Default for CacheIndex {
    fn default() -> Self {
        Self {
            results: Vec::new(),
            next_id: 1,
        }
    }
}

/// Local store of backend answers, keyed by a hash of the question.
/// Lets `\replay` serve a previous answer when the backend is offline.
pub struct ResultCache {
    cache_dir: PathBuf,
    index_path: PathBuf,
    index: CacheIndex,
}

impl ResultCache {
    pub fn open(cache_dir: impl Into<PathBuf>) -> Result<Self> {
        let cache_dir = cache_dir.into();
        let data_dir = cache_dir.join("data");
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("Cannot create {}", data_dir.display()))?;

        let index_path = cache_dir.join("metadata.json");
        let index = if index_path.exists() {
            match fs::read_to_string(&index_path)
                .map_err(anyhow::Error::from)
                .and_then(|c| serde_json::from_str(&c).map_err(anyhow::Error::from))
            {
                Ok(index) => index,
                Err(e) => {
                    warn!("Malformed cache index, starting fresh: {}", e);
                    CacheIndex::default()
                }
            }
        } else {
            CacheIndex::default()
        };

        Ok(Self {
            cache_dir,
            index_path,
            index,
        })
    }

    /// Store an answer, replacing any previous answer to the same question
    pub fn store(&mut self, question: &str, response: &QueryResponse) -> Result<u64> {
        let question_hash = hash_question(question);

        if let Some(pos) = self
            .index
            .results
            .iter()
            .position(|r| r.question_hash == question_hash)
        {
            let old = self.index.results.remove(pos);
            let _ = fs::remove_file(self.cache_dir.join("data").join(&old.file_path));
        }

        let id = self.index.next_id;
        let filename = format!("result_{:06}.json", id);
        let file_path = self.cache_dir.join("data").join(&filename);
        let json = serde_json::to_string_pretty(response)?;
        fs::write(&file_path, json)?;

        self.index.results.push(CachedResult {
            id,
            question_hash,
            question: question.to_string(),
            timestamp: Local::now(),
            row_count: response.row_count,
            file_path: filename,
        });
        self.index.next_id += 1;
        self.save_index()?;
        debug!("Cached answer {} for question '{}'", id, question);
        Ok(id)
    }

    /// Previous answer to a question, if one is stored and still readable
    pub fn lookup(&self, question: &str) -> Option<QueryResponse> {
        let question_hash = hash_question(question);
        let entry = self
            .index
            .results
            .iter()
            .find(|r| r.question_hash == question_hash)?;
        let file_path = self.cache_dir.join("data").join(&entry.file_path);
        match fs::read_to_string(&file_path)
            .map_err(anyhow::Error::from)
            .and_then(|c| serde_json::from_str(&c).map_err(anyhow::Error::from))
        {
            Ok(response) => Some(response),
            Err(e) => {
                warn!("Unreadable cache entry {}: {}", entry.id, e);
                None
            }
        }
    }

    pub fn list(&self) -> &[CachedResult] {
        &self.index.results
    }

    pub fn clear(&mut self) -> Result<()> {
        let data_dir = self.cache_dir.join("data");
        for entry in fs::read_dir(&data_dir)? {
            let entry = entry?;
            if entry.path().extension().map_or(false, |ext| ext == "json") {
                fs::remove_file(entry.path())?;
            }
        }
        self.index = CacheIndex::default();
        self.save_index()?;
        Ok(())
    }

    fn save_index(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.index)?;
        fs::write(&self.index_path, json)?;
        Ok(())
    }
}

/// Case- and whitespace-insensitive key so "Show sales" and "show sales"
/// share a slot, matching history dedup
fn hash_question(question: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(question.trim().to_lowercase().as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_normalizes_case_and_whitespace() {
        assert_eq!(hash_question("Show sales"), hash_question("  show SALES  "));
        assert_ne!(hash_question("Show sales"), hash_question("Show revenue"));
    }
}
