use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Serialize)]
pub struct QueryRequest {
    pub question: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_name: Option<String>,
}

/// Column metadata as classified by the backend
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ColumnMeta {
    pub name: String,
    #[serde(default)]
    pub r#type: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ChartRecommendation {
    #[serde(default)]
    pub chart_type: String,
    #[serde(default)]
    pub config: Value,
    #[serde(default)]
    pub reasoning: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Insight {
    #[serde(rename = "type", default)]
    pub kind: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub magnitude: Option<f64>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub priority: String,
}

/// Full answer to a natural-language question
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct QueryResponse {
    pub sql: String,
    pub data: Vec<serde_json::Map<String, Value>>,
    pub columns: Vec<ColumnMeta>,
    #[serde(default)]
    pub chart_recommendation: ChartRecommendation,
    #[serde(default)]
    pub insights: Vec<Insight>,
    pub row_count: usize,
    #[serde(default)]
    pub execution_time_ms: f64,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub assumptions: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct TableInfo {
    pub name: String,
    #[serde(default)]
    pub columns: Vec<ColumnMeta>,
    #[serde(default)]
    pub row_count: usize,
}

#[derive(Debug, Deserialize)]
struct TablesResponse {
    #[serde(default)]
    tables: Vec<TableInfo>,
}

#[derive(Debug, Deserialize)]
pub struct UploadResponse {
    #[serde(default)]
    pub success: bool,
    pub table_name: String,
    #[serde(default)]
    pub row_count: usize,
    #[serde(default)]
    pub profile: Value,
}

#[derive(Debug, Deserialize)]
pub struct SampleResponse {
    pub table_name: String,
    pub data: Vec<serde_json::Map<String, Value>>,
    pub columns: Vec<ColumnMeta>,
    #[serde(default)]
    pub sample_size: usize,
}

#[derive(Debug, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(default)]
    pub version: String,
}

/// Blocking HTTP client for the AutoBI backend
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Ask a natural-language question, optionally pinned to a table
    pub fn query(&self, question: &str, table_name: Option<&str>) -> Result<QueryResponse> {
        let request = QueryRequest {
            question: question.to_string(),
            table_name: table_name.map(|t| t.to_string()),
        };
        debug!("POST /query: {}", question);
        let response = self
            .client
            .post(format!("{}/query", self.base_url))
            .json(&request)
            .send()
            .context("Backend unreachable")?;
        Self::read_json(response)
    }

    /// Upload a CSV for ingestion; the backend derives the table name
    /// from the filename
    pub fn upload_csv(&self, path: &Path) -> Result<UploadResponse> {
        let form = reqwest::blocking::multipart::Form::new()
            .file("file", path)
            .with_context(|| format!("Cannot read {}", path.display()))?;
        let response = self
            .client
            .post(format!("{}/upload", self.base_url))
            .multipart(form)
            .send()
            .context("Backend unreachable")?;
        Self::read_json(response)
    }

    pub fn tables(&self) -> Result<Vec<TableInfo>> {
        let response = self
            .client
            .get(format!("{}/tables", self.base_url))
            .send()
            .context("Backend unreachable")?;
        let parsed: TablesResponse = Self::read_json(response)?;
        Ok(parsed.tables)
    }

    /// Schema profile for one table; free-form, displayed as-is
    pub fn schema(&self, table_name: &str) -> Result<Value> {
        let response = self
            .client
            .get(format!("{}/schema/{}", self.base_url, table_name))
            .send()
            .context("Backend unreachable")?;
        Self::read_json(response)
    }

    pub fn sample(&self, table_name: &str, limit: usize) -> Result<SampleResponse> {
        let response = self
            .client
            .get(format!(
                "{}/sample/{}?limit={}",
                self.base_url, table_name, limit
            ))
            .send()
            .context("Backend unreachable")?;
        Self::read_json(response)
    }

    pub fn health(&self) -> Result<HealthResponse> {
        let response = self
            .client
            .get(format!("{}/health", self.base_url))
            .send()
            .context("Backend unreachable")?;
        Self::read_json(response)
    }

    fn read_json<T: serde::de::DeserializeOwned>(
        response: reqwest::blocking::Response,
    ) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            let detail = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(String::from))
                .unwrap_or(body);
            return Err(anyhow!("Backend error ({}): {}", status, detail));
        }
        response.json().context("Malformed backend response")
    }
}

/// Background health poller. Checks the backend on a fixed interval,
/// publishes the result through a shared flag, and stops deterministically
/// when dropped.
pub struct HealthMonitor {
    status: Arc<AtomicBool>,
    cancel: mpsc::Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl HealthMonitor {
    pub fn start(client: ApiClient, interval: Duration) -> Self {
        let status = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&status);
        let (cancel, rx) = mpsc::channel();

        let handle = thread::spawn(move || loop {
            let healthy = match client.health() {
                Ok(h) => h.status == "healthy",
                Err(e) => {
                    debug!("Health check failed: {}", e);
                    false
                }
            };
            let was = flag.swap(healthy, Ordering::Relaxed);
            if was != healthy {
                if healthy {
                    info!("Backend is reachable");
                } else {
                    warn!("Backend went offline");
                }
            }
            match rx.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => continue,
                _ => break,
            }
        });

        Self {
            status,
            cancel,
            handle: Some(handle),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status.load(Ordering::Relaxed)
    }

    /// Shared flag for prompt rendering
    pub fn status_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.status)
    }
}

impl Drop for HealthMonitor {
    fn drop(&mut self) {
        let _ = self.cancel.send(());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
