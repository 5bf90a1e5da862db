//! Hub sources
//!
//! A source hands the registry already-split raw records. Validation of the
//! individual fields happens in the registry, so a source only fails when the
//! whole data set cannot be read.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tokio::task;
use tracing::{debug, warn};

use super::RegistryError;
use crate::models::{RawHubRecord, RowError};

/// A raw record, or the reason the source could not decode that row
pub type SourceRow = std::result::Result<RawHubRecord, RowError>;

/// Supplier of raw hub records
#[async_trait]
pub trait HubSource: Send + Sync {
    /// Fetch every row of the source in source order
    async fn fetch(&self) -> Result<Vec<SourceRow>, RegistryError>;

    /// Short description used in logs and errors, e.g. `csv:data/locations.csv`
    fn describe(&self) -> String;
}

#[async_trait]
impl<T: HubSource + ?Sized> HubSource for std::sync::Arc<T> {
    async fn fetch(&self) -> Result<Vec<SourceRow>, RegistryError> {
        (**self).fetch().await
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Hub records from a CSV file with a header row
pub struct CsvHubSource {
    path: PathBuf,
}

impl CsvHubSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_rows(path: &Path) -> Result<Vec<SourceRow>, String> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_path(path)
            .map_err(|e| e.to_string())?;

        // A missing or unreadable header makes every row meaningless
        reader.headers().map_err(|e| e.to_string())?;

        let rows = reader
            .deserialize::<RawHubRecord>()
            .map(|record| record.map_err(|e| RowError::Undecodable(e.to_string())))
            .collect();
        Ok(rows)
    }
}

#[async_trait]
impl HubSource for CsvHubSource {
    async fn fetch(&self) -> Result<Vec<SourceRow>, RegistryError> {
        let path = self.path.clone();
        if !path.exists() {
            return Err(RegistryError::unavailable(
                self.describe(),
                format!("CSV file not found: {}", path.display()),
            ));
        }

        debug!("Reading hub rows from CSV: {}", path.display());
        task::spawn_blocking(move || Self::read_rows(&path))
            .await
            .map_err(|e| RegistryError::unavailable(self.describe(), e.to_string()))?
            .map_err(|e| RegistryError::unavailable(self.describe(), e))
    }

    fn describe(&self) -> String {
        format!("csv:{}", self.path.display())
    }
}

/// Hub records from a JSON file holding an array of objects
pub struct JsonHubSource {
    path: PathBuf,
}

impl JsonHubSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl HubSource for JsonHubSource {
    async fn fetch(&self) -> Result<Vec<SourceRow>, RegistryError> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            RegistryError::unavailable(
                self.describe(),
                format!("Failed to read {}: {e}", self.path.display()),
            )
        })?;

        let document: Value = serde_json::from_str(&content)
            .map_err(|e| RegistryError::unavailable(self.describe(), e.to_string()))?;

        let Value::Array(items) = document else {
            return Err(RegistryError::unavailable(
                self.describe(),
                "expected a JSON array of hub objects",
            ));
        };

        let rows = items
            .iter()
            .map(|item| match item.as_object() {
                Some(object) => Ok(RawHubRecord::from_json_object(object)),
                None => {
                    warn!("Hub entry is not a JSON object: {}", item);
                    Err(RowError::Undecodable("not a JSON object".to_string()))
                }
            })
            .collect();
        Ok(rows)
    }

    fn describe(&self) -> String {
        format!("json:{}", self.path.display())
    }
}

/// Fixed in-memory records
#[derive(Default)]
pub struct StaticHubSource {
    records: std::sync::RwLock<Vec<RawHubRecord>>,
}

impl StaticHubSource {
    #[must_use]
    pub fn new(records: Vec<RawHubRecord>) -> Self {
        Self {
            records: std::sync::RwLock::new(records),
        }
    }

    /// Swap the records returned by the next fetch
    pub fn replace(&self, records: Vec<RawHubRecord>) {
        let mut guard = self
            .records
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *guard = records;
    }
}

#[async_trait]
impl HubSource for StaticHubSource {
    async fn fetch(&self) -> Result<Vec<SourceRow>, RegistryError> {
        let guard = self
            .records
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        Ok(guard.iter().cloned().map(Ok).collect())
    }

    fn describe(&self) -> String {
        "static".to_string()
    }
}
