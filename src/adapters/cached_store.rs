//! Listing store wrapper that reuses the last snapshot while its token holds.

use crate::domain::error::PricebandError;
use crate::domain::listing::Listing;
use crate::ports::cache_port::CachePort;
use crate::ports::listing_port::ListingPort;
use std::sync::Arc;

const SNAPSHOT_KEY: &str = "listings";

pub struct CachedListingStore<'a, S: ListingPort> {
    inner: S,
    cache: &'a dyn CachePort<Vec<Listing>>,
}

impl<'a, S: ListingPort> CachedListingStore<'a, S> {
    pub fn new(inner: S, cache: &'a dyn CachePort<Vec<Listing>>) -> Self {
        Self { inner, cache }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Snapshot shared with the cache; the store is only read on a miss.
    pub fn fetch_shared(&self) -> Result<Arc<Vec<Listing>>, PricebandError> {
        let token = self.inner.snapshot_token()?;
        if let Some(hit) = self.cache.get(SNAPSHOT_KEY, &token) {
            tracing::debug!(token = %token, "snapshot cache hit");
            return Ok(hit);
        }
        let listings = Arc::new(self.inner.fetch_listings()?);
        self.cache.set(SNAPSHOT_KEY, &token, Arc::clone(&listings));
        Ok(listings)
    }
}

impl<S: ListingPort> ListingPort for CachedListingStore<'_, S> {
    fn fetch_listings(&self) -> Result<Vec<Listing>, PricebandError> {
        Ok(self.fetch_shared()?.as_ref().clone())
    }

    fn snapshot_token(&self) -> Result<String, PricebandError> {
        self.inner.snapshot_token()
    }
}
