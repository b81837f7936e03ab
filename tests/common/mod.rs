#![allow(dead_code)]

use priceband::domain::error::PricebandError;
use priceband::domain::listing::{Listing, OfferType};
use priceband::ports::listing_port::ListingPort;
use std::cell::Cell;

pub struct MockListingStore {
    pub listings: Vec<Listing>,
    pub error: Option<String>,
    pub token: String,
    pub fetches: Cell<usize>,
}

impl MockListingStore {
    pub fn new() -> Self {
        Self {
            listings: Vec::new(),
            error: None,
            token: "v1".to_string(),
            fetches: Cell::new(0),
        }
    }

    pub fn with_listings(mut self, listings: Vec<Listing>) -> Self {
        self.listings.extend(listings);
        self
    }

    pub fn with_error(mut self, reason: &str) -> Self {
        self.error = Some(reason.to_string());
        self
    }

    pub fn with_token(mut self, token: &str) -> Self {
        self.token = token.to_string();
        self
    }
}

impl ListingPort for MockListingStore {
    fn fetch_listings(&self) -> Result<Vec<Listing>, PricebandError> {
        self.fetches.set(self.fetches.get() + 1);
        if let Some(reason) = &self.error {
            return Err(PricebandError::StoreUnavailable {
                reason: reason.clone(),
            });
        }
        Ok(self.listings.clone())
    }

    fn snapshot_token(&self) -> Result<String, PricebandError> {
        if let Some(reason) = &self.error {
            return Err(PricebandError::StoreUnavailable {
                reason: reason.clone(),
            });
        }
        Ok(self.token.clone())
    }
}

/// Apartment in Asa Sul with two bedrooms and a parking space.
pub fn make_listing(id: &str, offer: OfferType, area: f64, price_per_area: f64) -> Listing {
    Listing {
        id: id.to_string(),
        offer,
        property_type: "Apartamento".to_string(),
        neighborhood: "Asa Sul".to_string(),
        city: "Brasília".to_string(),
        postal_code: None,
        block: None,
        usable_area: area,
        nominal_price: area * price_per_area,
        price_per_area: Some(price_per_area),
        bedrooms: Some(2),
        parking_spaces: Some(1),
        latitude: Some(-15.82),
        longitude: Some(-47.92),
        collected_at: None,
    }
}

/// `n` listings of one offer type at a fixed area and increasing price per m².
pub fn make_series(prefix: &str, offer: OfferType, n: usize, area: f64, base: f64, step: f64) -> Vec<Listing> {
    (0..n)
        .map(|i| make_listing(&format!("{prefix}{i}"), offer, area, base + step * i as f64))
        .collect()
}

/// The 20-row sale set: three tiers plus five extreme outliers.
pub fn tiered_sales_with_outliers() -> Vec<Listing> {
    let mut values = vec![1000.0; 5];
    values.extend([2000.0; 5]);
    values.extend([3000.0; 5]);
    values.extend([500_000.0; 5]);
    values
        .into_iter()
        .enumerate()
        .map(|(i, v)| make_listing(&format!("s{i}"), OfferType::Sale, 80.0, v))
        .collect()
}

pub const CSV_HEADER: &str = "id,offer,property_type,neighborhood,city,postal_code,block,usable_area,nominal_price,price_per_area,bedrooms,parking_spaces,latitude,longitude,collected_at\n";

pub fn listings_csv(listings: &[Listing]) -> String {
    let mut out = String::from(CSV_HEADER);
    for l in listings {
        let opt = |v: Option<f64>| v.map(|x| x.to_string()).unwrap_or_default();
        let opt_u = |v: Option<u32>| v.map(|x| x.to_string()).unwrap_or_default();
        out.push_str(&format!(
            "{},{},{},{},{},{},{},{},{},{},{},{},{},{},{}\n",
            l.id,
            l.offer,
            l.property_type,
            l.neighborhood,
            l.city,
            l.postal_code.clone().unwrap_or_default(),
            l.block.clone().unwrap_or_default(),
            l.usable_area,
            l.nominal_price,
            opt(l.price_per_area),
            opt_u(l.bedrooms),
            opt_u(l.parking_spaces),
            opt(l.latitude),
            opt(l.longitude),
            l.collected_at.map(|d| d.to_string()).unwrap_or_default(),
        ));
    }
    out
}
