//! CSV snapshot listing store.
//!
//! Expected header (order free, optional columns may be empty):
//! `id,offer,property_type,neighborhood,city,postal_code,block,usable_area,
//! nominal_price,price_per_area,bedrooms,parking_spaces,latitude,longitude,collected_at`

use crate::domain::error::PricebandError;
use crate::domain::listing::{Listing, OfferType};
use crate::ports::listing_port::ListingPort;
use chrono::NaiveDate;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

#[derive(Debug, Deserialize)]
struct ListingRecord {
    id: String,
    offer: String,
    property_type: String,
    neighborhood: String,
    city: String,
    #[serde(default)]
    postal_code: Option<String>,
    #[serde(default)]
    block: Option<String>,
    usable_area: f64,
    nominal_price: f64,
    #[serde(default)]
    price_per_area: Option<f64>,
    #[serde(default)]
    bedrooms: Option<u32>,
    #[serde(default)]
    parking_spaces: Option<u32>,
    #[serde(default)]
    latitude: Option<f64>,
    #[serde(default)]
    longitude: Option<f64>,
    #[serde(default)]
    collected_at: Option<NaiveDate>,
}

impl ListingRecord {
    fn into_listing(self) -> Result<Listing, String> {
        let offer: OfferType = self.offer.parse()?;
        let blank_to_none = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        Ok(Listing {
            id: self.id,
            offer,
            property_type: self.property_type,
            neighborhood: self.neighborhood,
            city: self.city,
            postal_code: blank_to_none(self.postal_code),
            block: blank_to_none(self.block),
            usable_area: self.usable_area,
            nominal_price: self.nominal_price,
            price_per_area: self.price_per_area,
            bedrooms: self.bedrooms,
            parking_spaces: self.parking_spaces,
            latitude: self.latitude,
            longitude: self.longitude,
            collected_at: self.collected_at,
        })
    }
}

/// Parses listings from any CSV source.
pub fn read_listings<R: std::io::Read>(reader: R) -> Result<Vec<Listing>, PricebandError> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut listings = Vec::new();
    for (i, result) in rdr.deserialize::<ListingRecord>().enumerate() {
        let record = result.map_err(|e| PricebandError::StoreQuery {
            reason: format!("CSV parse error: {e}"),
        })?;
        let listing = record.into_listing().map_err(|reason| PricebandError::StoreQuery {
            reason: format!("record {}: {reason}", i + 1),
        })?;
        listings.push(listing);
    }
    Ok(listings)
}

/// Keeps listings collected within `max_age_days` of `as_of`. Undated
/// listings are always kept.
pub fn retain_recent(listings: &mut Vec<Listing>, max_age_days: u32, as_of: NaiveDate) {
    let cutoff = as_of - chrono::Duration::days(i64::from(max_age_days));
    listings.retain(|l| l.collected_at.is_none_or(|d| d >= cutoff));
}

pub struct CsvListingStore {
    path: PathBuf,
    max_age_days: Option<u32>,
    as_of: Option<NaiveDate>,
}

impl CsvListingStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            max_age_days: None,
            as_of: None,
        }
    }

    /// Only listings collected in the last `days` days are returned.
    /// Zero disables the limit.
    pub fn with_max_age(mut self, days: u32) -> Self {
        self.max_age_days = (days > 0).then_some(days);
        self
    }

    /// Fixes the reference date for the age limit (defaults to today).
    pub fn as_of(mut self, date: NaiveDate) -> Self {
        self.as_of = Some(date);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ListingPort for CsvListingStore {
    fn fetch_listings(&self) -> Result<Vec<Listing>, PricebandError> {
        let file = fs::File::open(&self.path).map_err(|e| PricebandError::StoreUnavailable {
            reason: format!("failed to read {}: {}", self.path.display(), e),
        })?;
        let mut listings = read_listings(file)?;

        if let Some(days) = self.max_age_days {
            let as_of = self.as_of.unwrap_or_else(|| chrono::Local::now().date_naive());
            retain_recent(&mut listings, days, as_of);
        }
        Ok(listings)
    }

    /// Modification time and length of the file.
    fn snapshot_token(&self) -> Result<String, PricebandError> {
        let meta = fs::metadata(&self.path).map_err(|e| PricebandError::StoreUnavailable {
            reason: format!("failed to stat {}: {}", self.path.display(), e),
        })?;
        let modified = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let age = self.max_age_days.unwrap_or(0);
        Ok(format!("{modified}:{}:{age}", meta.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HEADER: &str = "id,offer,property_type,neighborhood,city,postal_code,block,usable_area,nominal_price,price_per_area,bedrooms,parking_spaces,latitude,longitude,collected_at\n";

    fn create_csv(rows: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{HEADER}{rows}").unwrap();
        file
    }

    #[test]
    fn reads_listings() {
        let file = create_csv(
            "a1,venda,Apartamento,NORTE,Brasília,71900-000,,80,800000,,3,1,-15.8,-48.0,2024-05-01\n\
             a2,aluguel,Apartamento,SUL,Brasília,,QS 1,60,3000,50,2,,,,\n",
        );
        let store = CsvListingStore::new(file.path().to_path_buf());
        let listings = store.fetch_listings().unwrap();

        assert_eq!(listings.len(), 2);
        assert_eq!(listings[0].offer, OfferType::Sale);
        assert_eq!(listings[0].postal_code.as_deref(), Some("71900-000"));
        assert_eq!(listings[0].block, None);
        assert_eq!(listings[0].price_per_area, None);
        assert_eq!(listings[0].parking_spaces, Some(1));
        assert_eq!(listings[0].collected_at, NaiveDate::from_ymd_opt(2024, 5, 1));
        assert_eq!(listings[1].offer, OfferType::Rental);
        assert_eq!(listings[1].block.as_deref(), Some("QS 1"));
        assert_eq!(listings[1].price_per_area, Some(50.0));
        assert_eq!(listings[1].parking_spaces, None);
        assert_eq!(listings[1].collected_at, None);
    }

    #[test]
    fn missing_file_is_unavailable() {
        let store = CsvListingStore::new(PathBuf::from("/nonexistent/listings.csv"));
        let err = store.fetch_listings().unwrap_err();
        assert!(matches!(err, PricebandError::StoreUnavailable { .. }));
        assert!(err.is_retryable());
        assert!(store.snapshot_token().is_err());
    }

    #[test]
    fn bad_offer_is_a_query_error() {
        let file = create_csv("a1,leasing,Apartamento,SUL,Brasília,,,80,800000,,,,,,\n");
        let store = CsvListingStore::new(file.path().to_path_buf());
        let err = store.fetch_listings().unwrap_err();
        assert!(matches!(err, PricebandError::StoreQuery { .. }));
    }

    #[test]
    fn non_numeric_area_is_a_query_error() {
        let file = create_csv("a1,sale,Apartamento,SUL,Brasília,,,big,800000,,,,,,\n");
        let store = CsvListingStore::new(file.path().to_path_buf());
        assert!(matches!(
            store.fetch_listings().unwrap_err(),
            PricebandError::StoreQuery { .. }
        ));
    }

    #[test]
    fn max_age_drops_old_rows() {
        let file = create_csv(
            "old,sale,Apartamento,SUL,Brasília,,,80,800000,,,,,,2024-01-01\n\
             new,sale,Apartamento,SUL,Brasília,,,80,800000,,,,,,2024-05-20\n\
             undated,sale,Apartamento,SUL,Brasília,,,80,800000,,,,,,\n",
        );
        let store = CsvListingStore::new(file.path().to_path_buf())
            .with_max_age(90)
            .as_of(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        let ids: Vec<String> = store.fetch_listings().unwrap().into_iter().map(|l| l.id).collect();
        assert_eq!(ids, vec!["new".to_string(), "undated".to_string()]);
    }

    #[test]
    fn token_changes_with_content() {
        let mut file = create_csv("a1,sale,Apartamento,SUL,Brasília,,,80,800000,,,,,,\n");
        let store = CsvListingStore::new(file.path().to_path_buf());
        let before = store.snapshot_token().unwrap();
        assert_eq!(before, store.snapshot_token().unwrap());

        write!(file, "a2,sale,Apartamento,SUL,Brasília,,,90,900000,,,,,,\n").unwrap();
        file.flush().unwrap();
        assert_ne!(before, store.snapshot_token().unwrap());
    }

    #[test]
    fn summary_counts_offers() {
        let file = create_csv(
            "a1,sale,Apartamento,SUL,Brasília,,,80,800000,,,,,,2024-05-01\n\
             a2,rental,Apartamento,SUL,Brasília,,,80,3000,,,,,,2024-05-03\n\
             a3,rental,Apartamento,SUL,Brasília,,,80,3200,,,,,,\n",
        );
        let store = CsvListingStore::new(file.path().to_path_buf());
        let summary = store.summary().unwrap();
        assert_eq!(summary.sale, 1);
        assert_eq!(summary.rental, 2);
        assert_eq!(summary.total(), 3);
        assert_eq!(summary.first_collected, NaiveDate::from_ymd_opt(2024, 5, 1));
        assert_eq!(summary.last_collected, NaiveDate::from_ymd_opt(2024, 5, 3));
    }
}
