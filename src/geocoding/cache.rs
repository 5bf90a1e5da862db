//! In-memory geocoding cache with per-entry expiry and bounded capacity

use std::num::NonZeroUsize;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use lru::LruCache;
use tracing::{debug, info};

use super::{GeocodedAddress, Geocoder, GeocodingError};

struct StoredEntry {
    value: GeocodedAddress,
    expires_at: Instant,
}

/// Least-recently-used cache of geocoding results with a time-to-live
pub struct GeocodeCache {
    entries: Mutex<LruCache<String, StoredEntry>>,
    ttl: Duration,
}

impl GeocodeCache {
    pub fn new(capacity: NonZeroUsize, ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    fn key(address: &str) -> String {
        address.trim().to_string()
    }

    /// Cached value if present and not expired. Expired entries are evicted.
    pub fn get(&self, address: &str) -> Option<GeocodedAddress> {
        let key = Self::key(address);
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);

        let fresh = match entries.get(&key) {
            Some(entry) if Instant::now() < entry.expires_at => Some(entry.value.clone()),
            Some(_) => None,
            None => {
                debug!("Key not found");
                return None;
            }
        };

        if fresh.is_none() {
            debug!("Key found but expired");
            entries.pop(&key);
        }
        fresh
    }

    pub fn put(&self, address: &str, value: GeocodedAddress) {
        let entry = StoredEntry {
            value,
            expires_at: Instant::now() + self.ttl,
        };
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .put(Self::key(address), entry);
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Wraps a geocoder so repeated addresses are answered from [`GeocodeCache`].
/// Failures are never cached.
pub struct CachedGeocoder<G> {
    inner: G,
    cache: GeocodeCache,
}

impl<G: Geocoder> CachedGeocoder<G> {
    pub fn new(inner: G, cache: GeocodeCache) -> Self {
        Self { inner, cache }
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
        info!("Geocoding cache cleared");
    }

    #[must_use]
    pub fn cache(&self) -> &GeocodeCache {
        &self.cache
    }
}

#[async_trait]
impl<G: Geocoder> Geocoder for CachedGeocoder<G> {
    async fn geocode(&self, address: &str) -> Result<GeocodedAddress, GeocodingError> {
        if let Some(hit) = self.cache.get(address) {
            debug!("Cache hit for address: {}", address.trim());
            return Ok(hit);
        }

        let result = self.inner.geocode(address).await?;
        self.cache.put(address, result.clone());
        Ok(result)
    }
}
