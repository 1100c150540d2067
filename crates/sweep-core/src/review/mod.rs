//! Human review of recorded runs: 0-5 ratings with notes, and the statistics
//! reviewers compare prompts by.
//!
//! Annotations for one run live in a single document at
//! `ratings/<run_id>.json`, addressed by test index, prompt name and model.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use crate::errors::StorageError;
use crate::record::RunRecord;
use crate::storage::BlobStore;

pub const RATINGS_PREFIX: &str = "ratings/";

#[derive(Debug, thiserror::Error)]
pub enum ReviewError {
    #[error("rating {0} is out of range (0-5)")]
    InvalidRating(u8),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// A 0-5 score. Zero means the item has not been rated yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub const MAX: u8 = 5;

    pub fn new(value: u8) -> Result<Self, ReviewError> {
        if value > Self::MAX {
            return Err(ReviewError::InvalidRating(value));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn is_rated(self) -> bool {
        self.0 > 0
    }

    pub fn label(self) -> &'static str {
        match self.0 {
            0 => "not rated",
            1 => "poor",
            2 => "needs improvement",
            3 => "acceptable",
            4 => "good",
            _ => "excellent",
        }
    }
}

impl TryFrom<u8> for Rating {
    type Error = ReviewError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Rating> for u8 {
    fn from(r: Rating) -> Self {
        r.0
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.0, self.label())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub rating: Rating,
    #[serde(default)]
    pub notes: String,
}

/// test index -> prompt name -> model -> annotation
type Entries = BTreeMap<usize, BTreeMap<String, BTreeMap<String, Annotation>>>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationBook {
    pub run_id: String,
    #[serde(default)]
    pub entries: Entries,
}

impl AnnotationBook {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            entries: BTreeMap::new(),
        }
    }

    pub fn get(&self, test_idx: usize, prompt: &str, model: &str) -> Option<&Annotation> {
        self.entries.get(&test_idx)?.get(prompt)?.get(model)
    }

    pub fn rating(&self, test_idx: usize, prompt: &str, model: &str) -> Rating {
        self.get(test_idx, prompt, model)
            .map(|a| a.rating)
            .unwrap_or_default()
    }

    pub fn set(&mut self, test_idx: usize, prompt: &str, model: &str, annotation: Annotation) {
        self.entries
            .entry(test_idx)
            .or_default()
            .entry(prompt.to_string())
            .or_default()
            .insert(model.to_string(), annotation);
    }
}

fn ratings_key(run_id: &str) -> String {
    format!("{RATINGS_PREFIX}{run_id}.json")
}

/// Annotation documents over a blob store.
///
/// `annotate` calls through one `ReviewStore` are serialised. Separate
/// processes writing the same run still race: the last save wins.
pub struct ReviewStore {
    blobs: Arc<dyn BlobStore>,
    write_lock: Mutex<()>,
}

impl ReviewStore {
    pub fn new(blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            blobs,
            write_lock: Mutex::new(()),
        }
    }

    /// The run's annotations; an empty book when none were saved yet.
    pub async fn load(&self, run_id: &str) -> Result<AnnotationBook, ReviewError> {
        let key = ratings_key(run_id);
        match self.blobs.load(&key).await? {
            Some(value) => serde_json::from_value(value)
                .map_err(|source| ReviewError::Storage(StorageError::Serde { key, source })),
            None => Ok(AnnotationBook::new(run_id)),
        }
    }

    pub async fn save(&self, book: &AnnotationBook) -> Result<(), ReviewError> {
        let key = ratings_key(&book.run_id);
        let value = serde_json::to_value(book).map_err(|source| StorageError::Serde {
            key: key.clone(),
            source,
        })?;
        self.blobs.save(&key, &value).await?;
        Ok(())
    }

    /// Validate, store and return one annotation (load-modify-save).
    pub async fn annotate(
        &self,
        run_id: &str,
        test_idx: usize,
        prompt: &str,
        model: &str,
        rating: u8,
        notes: impl Into<String>,
    ) -> Result<Annotation, ReviewError> {
        let annotation = Annotation {
            rating: Rating::new(rating)?,
            notes: notes.into(),
        };
        let _guard = self.write_lock.lock().await;
        let mut book = self.load(run_id).await?;
        book.set(test_idx, prompt, model, annotation.clone());
        self.save(&book).await?;
        debug!(run_id, test_idx, prompt, model, rating, "annotation saved");
        Ok(annotation)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ReviewStats {
    pub total: usize,
    pub rated: usize,
    /// Mean over rated items only; `None` until something is rated.
    pub average: Option<f64>,
    pub excellent: usize,
    pub poor: usize,
}

impl ReviewStats {
    /// Stats for one (prompt, model) column over test indices `0..total`.
    pub fn compute(book: &AnnotationBook, prompt: &str, model: &str, total: usize) -> Self {
        let mut stats = Self {
            total,
            ..Self::default()
        };
        let mut sum = 0u32;
        for idx in 0..total {
            let r = book.rating(idx, prompt, model);
            if !r.is_rated() {
                continue;
            }
            stats.rated += 1;
            sum += u32::from(r.value());
            match r.value() {
                5 => stats.excellent += 1,
                1 => stats.poor += 1,
                _ => {}
            }
        }
        if stats.rated > 0 {
            stats.average = Some(f64::from(sum) / stats.rated as f64);
        }
        stats
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BestTally {
    /// Test cases where this prompt alone had the top rating.
    pub sole: usize,
    /// Test cases where it shared the top rating.
    pub tied: usize,
}

/// Which prompts earned the highest rating per test case, for one model.
/// Unrated annotations do not compete.
pub fn best_prompt_tally(book: &AnnotationBook, model: &str) -> BTreeMap<String, BestTally> {
    let mut tally: BTreeMap<String, BestTally> = BTreeMap::new();
    for by_prompt in book.entries.values() {
        let rated: Vec<(&String, Rating)> = by_prompt
            .iter()
            .filter_map(|(prompt, by_model)| by_model.get(model).map(|a| (prompt, a.rating)))
            .filter(|(_, r)| r.is_rated())
            .collect();
        let Some(top) = rated.iter().map(|(_, r)| *r).max() else {
            continue;
        };
        let best: Vec<&String> = rated
            .iter()
            .filter(|(_, r)| *r == top)
            .map(|(p, _)| *p)
            .collect();
        let sole = best.len() == 1;
        for prompt in best {
            let t = tally.entry(prompt.clone()).or_default();
            if sole {
                t.sole += 1;
            } else {
                t.tied += 1;
            }
        }
    }
    tally
}

/// One test case of an exported run. `columns` holds
/// `<prompt>_<model>_response`, `_rating` and `_notes` for every
/// (prompt, model) pair that has a response or an annotation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportRow {
    pub test_idx: usize,
    pub message: String,
    #[serde(flatten)]
    pub columns: serde_json::Map<String, serde_json::Value>,
}

/// Join a recorded run with its annotations, one row per message.
///
/// Responses come from the run's own model; pairs rated under another model
/// get an empty response. Unrated pairs export rating 0.
pub fn export_rows(run: &RunRecord, book: &AnnotationBook) -> Vec<ExportRow> {
    let mut pairs: Vec<(usize, &str)> = Vec::new();
    for (p, prompt) in run.results.iter().enumerate() {
        let mut models: BTreeSet<&str> = BTreeSet::from([run.model.as_str()]);
        for by_prompt in book.entries.values() {
            if let Some(by_model) = by_prompt.get(&prompt.prompt_name) {
                models.extend(by_model.keys().map(String::as_str));
            }
        }
        pairs.extend(models.into_iter().map(|m| (p, m)));
    }

    let total = run.results.iter().map(|p| p.results.len()).max().unwrap_or(0);
    (0..total)
        .map(|idx| {
            let message = run
                .results
                .iter()
                .find_map(|p| p.results.get(idx))
                .map(|r| r.prompt.clone())
                .unwrap_or_default();
            let mut columns = serde_json::Map::new();
            for &(p, model) in &pairs {
                let prompt = &run.results[p];
                let name = &prompt.prompt_name;
                let response = if model == run.model {
                    prompt
                        .results
                        .get(idx)
                        .map(|r| r.response.clone())
                        .unwrap_or_default()
                } else {
                    String::new()
                };
                let annotation = book.get(idx, name, model).cloned().unwrap_or_default();
                columns.insert(format!("{name}_{model}_response"), response.into());
                columns.insert(
                    format!("{name}_{model}_rating"),
                    annotation.rating.value().into(),
                );
                columns.insert(format!("{name}_{model}_notes"), annotation.notes.into());
            }
            ExportRow {
                test_idx: idx,
                message,
                columns,
            }
        })
        .collect()
}

/// Drop a model's planning preamble: everything up to and including the first
/// line that starts with `Signature:`. Text without such a line is returned
/// unchanged.
pub fn strip_reasoning_preamble(text: &str) -> &str {
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        offset += line.len();
        if line.trim_start().starts_with("Signature:") {
            return text[offset..].trim();
        }
    }
    text
}
