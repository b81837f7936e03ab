//! Sink for banded listings (map consumer).

use crate::domain::band::BandedListing;
use crate::domain::error::PricebandError;
use crate::domain::listing::OfferType;

pub trait BandExportPort {
    /// Replaces everything previously exported for `offer` with `rows`.
    ///
    /// Readers must never observe a partially written set.
    fn export(&self, offer: OfferType, rows: &[BandedListing]) -> Result<(), PricebandError>;
}
