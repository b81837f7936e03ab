//! Listing store port trait.

use crate::domain::error::PricebandError;
use crate::domain::listing::{Listing, OfferType};
use chrono::NaiveDate;

/// Freshness limit applied when `[store] max_age_days` is not set; 0 disables it.
pub const DEFAULT_MAX_AGE_DAYS: i64 = 90;

/// Row counts and collection dates of a store snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingSummary {
    pub sale: usize,
    pub rental: usize,
    pub first_collected: Option<NaiveDate>,
    pub last_collected: Option<NaiveDate>,
}

impl ListingSummary {
    pub fn from_listings(listings: &[Listing]) -> Self {
        let mut summary = ListingSummary::default();
        for l in listings {
            match l.offer {
                OfferType::Sale => summary.sale += 1,
                OfferType::Rental => summary.rental += 1,
            }
            if let Some(d) = l.collected_at {
                summary.first_collected = Some(summary.first_collected.map_or(d, |f| f.min(d)));
                summary.last_collected = Some(summary.last_collected.map_or(d, |f| f.max(d)));
            }
        }
        summary
    }

    pub fn total(&self) -> usize {
        self.sale + self.rental
    }
}

pub trait ListingPort {
    /// Every listing in the current snapshot, both offer types.
    fn fetch_listings(&self) -> Result<Vec<Listing>, PricebandError>;

    /// Changes whenever the snapshot returned by `fetch_listings` may have
    /// changed. Cached results are only valid for an identical token.
    fn snapshot_token(&self) -> Result<String, PricebandError>;

    fn summary(&self) -> Result<ListingSummary, PricebandError> {
        Ok(ListingSummary::from_listings(&self.fetch_listings()?))
    }
}
