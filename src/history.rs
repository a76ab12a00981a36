use anyhow::Result;
use chrono::Utc;
use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::PathBuf;
use tracing::{debug, warn};

/// One remembered question and the outcome of running it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    pub question: String,
    pub timestamp_ms: i64,
    #[serde(default)]
    pub sql: String,
    #[serde(default)]
    pub row_count: usize,
    #[serde(default)]
    pub execution_time_ms: f64,
    #[serde(default)]
    pub confidence: f64,
}

/// Outcome metadata captured when a query succeeds
#[derive(Debug, Clone, Default)]
pub struct QueryRecord {
    pub question: String,
    pub sql: String,
    pub row_count: usize,
    pub execution_time_ms: f64,
    pub confidence: f64,
}

#[derive(Debug, Clone)]
pub struct HistoryMatch {
    pub entry: HistoryEntry,
    pub score: i64,
}

type HistoryListener = Box<dyn Fn(&[HistoryEntry]) + Send>;

/// Newest-first ledger of asked questions, deduplicated by question text
/// and bounded by capacity. Every mutation persists the whole ledger to
/// one JSON file before listeners are notified.
pub struct QueryHistory {
    entries: Vec<HistoryEntry>,
    history_file: PathBuf,
    limit: usize,
    matcher: SkimMatcherV2,
    listeners: Vec<HistoryListener>,
}

impl QueryHistory {
    /// Open the ledger at the given path. A missing, empty, or malformed
    /// file hydrates to an empty ledger rather than failing.
    pub fn open(path: impl Into<PathBuf>, limit: usize) -> Self {
        let mut history = Self {
            entries: Vec::new(),
            history_file: path.into(),
            limit,
            matcher: SkimMatcherV2::default(),
            listeners: Vec::new(),
        };
        history.hydrate();
        history
    }

    fn hydrate(&mut self) {
        if !self.history_file.exists() {
            return;
        }
        let content = match fs::read_to_string(&self.history_file) {
            Ok(c) => c,
            Err(e) => {
                warn!("Could not read history file, starting empty: {}", e);
                return;
            }
        };
        if content.trim().is_empty() {
            return;
        }
        match serde_json::from_str::<Vec<HistoryEntry>>(&content) {
            Ok(mut entries) => {
                entries.truncate(self.limit);
                debug!("Hydrated {} history entries", entries.len());
                self.entries = entries;
            }
            Err(e) => {
                warn!("Malformed history file, starting empty: {}", e);
            }
        }
    }

    /// Record a question. Any existing entry with the same question
    /// (case-insensitive) is replaced; the new entry lands at the front
    /// and the oldest entry is evicted past capacity.
    pub fn add(&mut self, record: QueryRecord) -> Result<()> {
        if record.question.trim().is_empty() {
            return Ok(());
        }

        let key = record.question.to_lowercase();
        self.entries.retain(|e| e.question.to_lowercase() != key);

        let timestamp_ms = Utc::now().timestamp_millis();
        let entry = HistoryEntry {
            id: entry_id(&record.question, timestamp_ms),
            question: record.question,
            timestamp_ms,
            sql: record.sql,
            row_count: record.row_count,
            execution_time_ms: record.execution_time_ms,
            confidence: record.confidence,
        };
        self.entries.insert(0, entry);
        self.entries.truncate(self.limit);

        self.save_to_file()?;
        self.notify();
        Ok(())
    }

    /// Remove an entry by id. Removing an id that is already gone is a
    /// no-op, so a stale reference never errors.
    pub fn remove(&mut self, id: &str) -> Result<bool> {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        if self.entries.len() == before {
            return Ok(false);
        }
        self.save_to_file()?;
        self.notify();
        Ok(true)
    }

    /// Empty the ledger and delete the persisted file
    pub fn clear(&mut self) -> Result<()> {
        self.entries.clear();
        if self.history_file.exists() {
            fs::remove_file(&self.history_file)?;
        }
        self.notify();
        Ok(())
    }

    /// Register a callback invoked with a snapshot after every mutation
    pub fn subscribe(&mut self, listener: impl Fn(&[HistoryEntry]) + Send + 'static) {
        self.listeners.push(Box::new(listener));
    }

    fn notify(&self) {
        for listener in &self.listeners {
            listener(&self.entries);
        }
    }

    /// Entries, newest first
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&HistoryEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Question texts, newest first, for the suggestion pool
    pub fn questions(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.question.clone()).collect()
    }

    /// Fuzzy search over questions, best score first, recency breaking ties
    pub fn search(&self, term: &str) -> Vec<HistoryMatch> {
        if term.is_empty() {
            return self
                .entries
                .iter()
                .map(|entry| HistoryMatch {
                    entry: entry.clone(),
                    score: 0,
                })
                .collect();
        }
        let mut matches: Vec<HistoryMatch> = self
            .entries
            .iter()
            .filter_map(|entry| {
                self.matcher
                    .fuzzy_match(&entry.question, term)
                    .map(|score| HistoryMatch {
                        entry: entry.clone(),
                        score,
                    })
            })
            .collect();
        matches.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then_with(|| b.entry.timestamp_ms.cmp(&a.entry.timestamp_ms))
        });
        matches
    }

    fn save_to_file(&self) -> Result<()> {
        let content = serde_json::to_string_pretty(&self.entries)?;
        fs::write(&self.history_file, content)?;
        Ok(())
    }
}

fn entry_id(question: &str, timestamp_ms: i64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(question.as_bytes());
    hasher.update(timestamp_ms.to_le_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..16].to_string()
}

/// Human-readable age of a timestamp: "just now", minutes, hours, days
pub fn relative_age(now_ms: i64, timestamp_ms: i64) -> String {
    let minutes = (now_ms - timestamp_ms).max(0) / 60_000;
    if minutes < 1 {
        return "just now".to_string();
    }
    if minutes < 60 {
        return format!("{}m ago", minutes);
    }
    let hours = minutes / 60;
    if hours < 24 {
        return format!("{}h ago", hours);
    }
    format!("{}d ago", hours / 24)
}
