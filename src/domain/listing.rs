//! Listing records as supplied by a listing store.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The two parallel market segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OfferType {
    Sale,
    Rental,
}

impl OfferType {
    pub const ALL: [OfferType; 2] = [OfferType::Sale, OfferType::Rental];

    pub fn as_str(&self) -> &'static str {
        match self {
            OfferType::Sale => "sale",
            OfferType::Rental => "rental",
        }
    }
}

impl fmt::Display for OfferType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OfferType {
    type Err = String;

    /// Accepts the English names and the Portuguese tags found in scraped data.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sale" | "venda" => Ok(OfferType::Sale),
            "rental" | "rent" | "aluguel" => Ok(OfferType::Rental),
            other => Err(format!("unknown offer type '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: String,
    pub offer: OfferType,
    pub property_type: String,
    pub neighborhood: String,
    pub city: String,
    pub postal_code: Option<String>,
    pub block: Option<String>,
    pub usable_area: f64,
    pub nominal_price: f64,
    /// Precomputed price per m²; derived from price and area when absent.
    pub price_per_area: Option<f64>,
    pub bedrooms: Option<u32>,
    pub parking_spaces: Option<u32>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub collected_at: Option<NaiveDate>,
}

impl Listing {
    /// Price per m², falling back to nominal price / usable area.
    pub fn price_per_area(&self) -> f64 {
        match self.price_per_area {
            Some(v) => v,
            None if self.usable_area > 0.0 => self.nominal_price / self.usable_area,
            None => f64::NAN,
        }
    }

    /// Only listings with a positive, finite price per m² may be banded.
    pub fn has_valid_price_per_area(&self) -> bool {
        let v = self.price_per_area();
        v.is_finite() && v > 0.0
    }
}
