//! Hub registry
//!
//! The registry owns the authoritative set of hubs. Each successful load
//! builds a complete [`HubSnapshot`] off to the side and publishes it with a
//! single atomic swap, so readers always see one whole load and never a
//! partially filled list. Loads are serialized; a second `load()` waits for
//! the running one to finish.

pub mod source;

use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::models::{Hub, HubCounts};
pub use source::{CsvHubSource, HubSource, JsonHubSource, SourceRow, StaticHubSource};

/// Source-level load failure
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    #[error("Hub source {source_name} unavailable: {message}")]
    SourceUnavailable {
        source_name: String,
        message: String,
    },

    #[error("Hub source {source_name} returned no records")]
    EmptySource { source_name: String },
}

impl RegistryError {
    pub fn unavailable(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SourceUnavailable {
            source_name: source_name.into(),
            message: message.into(),
        }
    }
}

/// The full set of hubs from one successful load. Immutable once published.
#[derive(Debug, Clone, Default)]
pub struct HubSnapshot {
    hubs: Vec<Hub>,
    loaded_at: Option<DateTime<Utc>>,
    rejected_rows: usize,
    source: String,
}

impl HubSnapshot {
    /// Build a snapshot directly from hubs, e.g. for tests or embedding
    #[must_use]
    pub fn new(hubs: Vec<Hub>) -> Self {
        Self {
            hubs,
            loaded_at: Some(Utc::now()),
            rejected_rows: 0,
            source: "in-memory".to_string(),
        }
    }

    /// Hubs in load order
    #[must_use]
    pub fn hubs(&self) -> &[Hub] {
        &self.hubs
    }

    #[must_use]
    pub fn loaded_at(&self) -> Option<DateTime<Utc>> {
        self.loaded_at
    }

    /// Rows dropped during the load that produced this snapshot
    #[must_use]
    pub fn rejected_rows(&self) -> usize {
        self.rejected_rows
    }

    /// Description of the source this snapshot was loaded from
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hubs.is_empty()
    }

    /// First hub with the given id
    #[must_use]
    pub fn get_by_id(&self, id: &str) -> Option<&Hub> {
        self.hubs.iter().find(|hub| hub.id == id)
    }

    pub fn by_region<'a>(&'a self, region: &'a str) -> impl Iterator<Item = &'a Hub> + 'a {
        self.hubs
            .iter()
            .filter(move |hub| hub.region.as_deref() == Some(region))
    }

    pub fn active(&self) -> impl Iterator<Item = &Hub> {
        self.hubs.iter().filter(|hub| hub.active)
    }

    #[must_use]
    pub fn counts(&self) -> HubCounts {
        let active = self.active().count();
        HubCounts {
            total: self.hubs.len(),
            active,
            inactive: self.hubs.len() - active,
        }
    }
}

/// In-memory registry of delivery hubs backed by a [`HubSource`]
pub struct HubRegistry {
    source: Box<dyn HubSource>,
    require_records: bool,
    current: ArcSwap<HubSnapshot>,
    load_lock: Mutex<()>,
}

impl HubRegistry {
    /// Create an empty registry. Nothing is read until [`HubRegistry::load`].
    pub fn new(source: Box<dyn HubSource>) -> Self {
        info!("Hub registry initialized with {} data source", source.describe());
        Self {
            source,
            require_records: true,
            current: ArcSwap::from_pointee(HubSnapshot::default()),
            load_lock: Mutex::new(()),
        }
    }

    /// Whether a source with zero records is a load failure (default true)
    #[must_use]
    pub fn require_records(mut self, required: bool) -> Self {
        self.require_records = required;
        self
    }

    /// Load hubs from the source and publish them as the current snapshot.
    ///
    /// Rows that fail validation are logged, counted and skipped. Only a
    /// failure of the source as a whole returns an error, in which case the
    /// previously published snapshot stays current.
    #[instrument(name = "load_hubs", skip(self), fields(source = %self.source.describe()))]
    pub async fn load(&self) -> Result<Arc<HubSnapshot>, RegistryError> {
        let _guard = self.load_lock.lock().await;
        let start_time = Instant::now();
        info!("Loading hubs from {}", self.source.describe());

        let rows = self.source.fetch().await.inspect_err(|e| {
            warn!("Failed to load hubs: {}", e);
        })?;

        if rows.is_empty() && self.require_records {
            warn!("Hub source {} returned no records", self.source.describe());
            return Err(RegistryError::EmptySource {
                source_name: self.source.describe(),
            });
        }

        let mut hubs = Vec::with_capacity(rows.len());
        let mut rejected_rows = 0;
        for (index, row) in rows.into_iter().enumerate() {
            let row_number = index + 1;
            match row.and_then(|raw| Hub::try_from_raw(raw, row_number)) {
                Ok(hub) => hubs.push(hub),
                Err(e) => {
                    warn!("Skipping row {} due to {}", row_number, e);
                    rejected_rows += 1;
                }
            }
        }

        let snapshot = Arc::new(HubSnapshot {
            hubs,
            loaded_at: Some(Utc::now()),
            rejected_rows,
            source: self.source.describe(),
        });
        self.current.store(Arc::clone(&snapshot));

        let counts = snapshot.counts();
        info!(
            "Loaded {} hubs ({} active, {} rejected rows) in {:.2}ms",
            counts.total,
            counts.active,
            rejected_rows,
            start_time.elapsed().as_secs_f64() * 1000.0
        );

        Ok(snapshot)
    }

    /// Re-run [`HubRegistry::load`] to pick up upstream changes
    pub async fn reload(&self) -> Result<Arc<HubSnapshot>, RegistryError> {
        info!("Reloading hubs");
        self.load().await
    }

    /// The currently published snapshot
    #[must_use]
    pub fn snapshot(&self) -> Arc<HubSnapshot> {
        self.current.load_full()
    }

    #[must_use]
    pub fn get_by_id(&self, id: &str) -> Option<Hub> {
        let hub = self.current.load().get_by_id(id).cloned();
        debug!("Lookup hub by id '{}': found={}", id, hub.is_some());
        hub
    }

    #[must_use]
    pub fn get_by_region(&self, region: &str) -> Vec<Hub> {
        self.current.load().by_region(region).cloned().collect()
    }

    #[must_use]
    pub fn active_only(&self) -> Vec<Hub> {
        self.current.load().active().cloned().collect()
    }

    #[must_use]
    pub fn counts(&self) -> HubCounts {
        self.current.load().counts()
    }

    #[must_use]
    pub fn last_loaded(&self) -> Option<DateTime<Utc>> {
        self.current.load().loaded_at()
    }

    #[must_use]
    pub fn rejected_rows(&self) -> usize {
        self.current.load().rejected_rows()
    }
}

/// Reload `registry` every `period` until the task is aborted. A failed
/// reload is logged and the previous snapshot keeps serving.
pub fn spawn_periodic_reload(registry: Arc<HubRegistry>, period: Duration) -> JoinHandle<()> {
    info!("Reloading hubs every {}s", period.as_secs_f64());
    tokio::spawn(async move {
        let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            if let Err(e) = registry.reload().await {
                warn!("Periodic hub reload failed, keeping previous hubs: {}", e);
            }
        }
    })
}
