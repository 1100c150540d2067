//! Persisted run artifacts, one JSON document per run under `runs/<id>.json`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::errors::StorageError;
use crate::model::{PromptResult, RunOutcome, RunSummary};
use crate::storage::BlobStore;

pub const RUNS_PREFIX: &str = "runs/";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub id: String,
    pub name: String,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub timed_out: bool,
    pub results: Vec<PromptResult>,
    /// Denormalised copy; recomputed from `results` on load.
    pub summary: RunSummary,
}

impl RunRecord {
    pub fn new(
        name: impl Into<String>,
        model: impl Into<String>,
        dataset: Option<String>,
        outcome: RunOutcome,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            model: model.into(),
            dataset,
            created_at: Utc::now(),
            timed_out: outcome.timed_out,
            summary: RunSummary::from_results(&outcome.results),
            results: outcome.results,
        }
    }

    pub fn blob_key(&self) -> String {
        run_key(&self.id)
    }
}

fn run_key(id: &str) -> String {
    format!("{RUNS_PREFIX}{id}.json")
}

/// Header row for listings; avoids handing out full result sets.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunListing {
    pub id: String,
    pub name: String,
    pub model: String,
    pub created_at: DateTime<Utc>,
    pub summary: RunSummary,
}

impl From<&RunRecord> for RunListing {
    fn from(r: &RunRecord) -> Self {
        Self {
            id: r.id.clone(),
            name: r.name.clone(),
            model: r.model.clone(),
            created_at: r.created_at,
            summary: r.summary,
        }
    }
}

#[async_trait]
pub trait RunRecorder: Send + Sync {
    async fn record(&self, run: &RunRecord) -> Result<(), StorageError>;
}

pub struct BlobRunRecorder {
    blobs: Arc<dyn BlobStore>,
}

impl BlobRunRecorder {
    pub fn new(blobs: Arc<dyn BlobStore>) -> Self {
        Self { blobs }
    }

    pub async fn load(&self, id: &str) -> Result<Option<RunRecord>, StorageError> {
        let key = run_key(id);
        let Some(value) = self.blobs.load(&key).await? else {
            return Ok(None);
        };
        let mut run: RunRecord =
            serde_json::from_value(value).map_err(|source| StorageError::Serde { key, source })?;
        run.summary = RunSummary::from_results(&run.results);
        Ok(Some(run))
    }

    /// All readable runs, newest first. Unreadable documents are skipped.
    pub async fn list(&self) -> Result<Vec<RunListing>, StorageError> {
        let mut out = Vec::new();
        for key in self.blobs.list(RUNS_PREFIX).await? {
            let Some(id) = key
                .strip_prefix(RUNS_PREFIX)
                .and_then(|k| k.strip_suffix(".json"))
            else {
                continue;
            };
            match self.load(id).await {
                Ok(Some(run)) => out.push(RunListing::from(&run)),
                Ok(None) => {}
                Err(e) => warn!(key = %key, error = %e, "skipping unreadable run record"),
            }
        }
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }

    pub async fn delete(&self, id: &str) -> Result<(), StorageError> {
        self.blobs.delete(&run_key(id)).await
    }
}

#[async_trait]
impl RunRecorder for BlobRunRecorder {
    async fn record(&self, run: &RunRecord) -> Result<(), StorageError> {
        let key = run.blob_key();
        let value = serde_json::to_value(run).map_err(|source| StorageError::Serde {
            key: key.clone(),
            source,
        })?;
        self.blobs.save(&key, &value).await?;
        info!(
            run_id = %run.id,
            backend = self.blobs.backend_name(),
            total_tests = run.summary.total_tests,
            "run recorded"
        );
        Ok(())
    }
}
