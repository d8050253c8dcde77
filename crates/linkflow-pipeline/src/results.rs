use async_trait::async_trait;
use linkflow_core::error::{LinkflowError, LinkflowResult};
use log::info;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// File name of the results record inside the output directory
pub const RESULTS_FILE_NAME: &str = "flow_results.json";

/// Receives the flat results aggregate once a run has finished
#[async_trait]
pub trait ResultSink: Send + Sync {
    async fn persist(&self, results: &Map<String, Value>) -> LinkflowResult<()>;
}

/// Writes the results as pretty-printed JSON into a directory
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    pub directory: PathBuf,
}

impl JsonFileSink {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.directory.join(RESULTS_FILE_NAME)
    }

    /// Read a previously written results record
    pub async fn load(path: &Path) -> LinkflowResult<Map<String, Value>> {
        let json = tokio::fs::read_to_string(path).await?;
        serde_json::from_str(&json).map_err(|e| {
            LinkflowError::Config(format!("invalid results file {}: {}", path.display(), e))
        })
    }
}

#[async_trait]
impl ResultSink for JsonFileSink {
    async fn persist(&self, results: &Map<String, Value>) -> LinkflowResult<()> {
        tokio::fs::create_dir_all(&self.directory).await?;
        let file_path = self.path();
        let json = serde_json::to_string_pretty(results)
            .map_err(|e| LinkflowError::Config(format!("failed to serialize results: {}", e)))?;
        tokio::fs::write(&file_path, json).await?;
        info!("Results saved to {}", file_path.display());
        Ok(())
    }
}

/// Keeps every persisted aggregate in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    persisted: Mutex<Vec<Map<String, Value>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn persisted(&self) -> Vec<Map<String, Value>> {
        self.persisted.lock().await.clone()
    }
}

#[async_trait]
impl ResultSink for MemorySink {
    async fn persist(&self, results: &Map<String, Value>) -> LinkflowResult<()> {
        self.persisted.lock().await.push(results.clone());
        Ok(())
    }
}
