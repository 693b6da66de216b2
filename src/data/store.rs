//! Keyed in-memory dataset cache.
//!
//! A dataset is identified by its canonical path, the normalization options
//! it was loaded under, and a SHA-256 content fingerprint. A load request
//! for an unchanged file returns the cached `Arc<Dataset>`; a changed
//! fingerprint replaces the entry. There is no other invalidation path and
//! nothing persists across runs.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, RwLock};

use chrono::Utc;

use crate::data::loader::{self, Dataset, LoadError, NormalizeOptions};
use crate::services::landmask::LandClassifier;

#[derive(Default)]
pub struct DatasetCache {
    entries: RwLock<HashMap<String, Arc<Dataset>>>,
}

impl DatasetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a dataset through the cache.
    ///
    /// The file is always read to fingerprint it; normalization only runs
    /// when the content changed since the last load of the same path.
    pub fn load(
        &self,
        path: &Path,
        classifier: &dyn LandClassifier,
        options: NormalizeOptions,
    ) -> Result<Arc<Dataset>, LoadError> {
        let bytes = fs::read(path)?;
        let fingerprint = loader::fingerprint(&bytes);
        let key = cache_key(path, options);

        if let Some(cached) = self.entries.read().unwrap_or_else(|e| e.into_inner()).get(&key) {
            if cached.fingerprint == fingerprint {
                tracing::debug!(path = %path.display(), "dataset cache hit");
                return Ok(Arc::clone(cached));
            }
            tracing::info!(path = %path.display(), "dataset changed on disk, reloading");
        }

        let text = String::from_utf8_lossy(&bytes);
        let (records, dropped_rows) = loader::parse_dataset(&text, classifier, options)?;
        tracing::info!(
            path = %path.display(),
            records = records.len(),
            dropped = dropped_rows,
            "dataset loaded"
        );
        let dataset = Arc::new(Dataset {
            records,
            dropped_rows,
            fingerprint,
            loaded_at: Utc::now(),
        });
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key, Arc::clone(&dataset));
        Ok(dataset)
    }
}

fn cache_key(path: &Path, options: NormalizeOptions) -> String {
    let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    format!(
        "{}::strict={}",
        canonical.to_string_lossy(),
        options.require_positive_durations
    )
}
