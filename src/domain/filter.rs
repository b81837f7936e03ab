//! Listing filter: conjunction of the user's predicates.
//!
//! Every present field of a [`FilterSpec`] narrows the listing set. The
//! target area is not applied here; it is resolved per offer type by
//! [`crate::domain::sample_window`].

use crate::domain::error::PricebandError;
use crate::domain::listing::{Listing, OfferType};
use serde::Serialize;
use std::collections::HashMap;

/// Requests at or above this bedroom count match "N or more".
pub const DEFAULT_BEDROOM_BUCKET: u32 = 4;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FilterSpec {
    pub property_type: Option<String>,
    pub neighborhood: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub block: Option<String>,
    /// `Some(true)` keeps listings that report parking, `Some(false)` keeps
    /// listings that report none. Presence only; the count is ignored.
    pub require_parking: Option<bool>,
    pub bedrooms: Option<u32>,
    pub target_area: Option<f64>,
}

impl FilterSpec {
    /// Builds a spec from raw string parameters, as an outer layer (query
    /// string, config section) would supply them. Blank values are absent.
    pub fn parse_with<F>(lookup: F) -> Result<Self, PricebandError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let require_parking = match text("parking") {
            Some(v) => Some(parse_bool(&v).ok_or_else(|| {
                PricebandError::invalid_input("parking", format!("expected true or false, got '{v}'"))
            })?),
            None => None,
        };

        let bedrooms = match text("bedrooms") {
            Some(v) => Some(v.parse::<u32>().map_err(|_| {
                PricebandError::invalid_input(
                    "bedrooms",
                    format!("expected a non-negative integer, got '{v}'"),
                )
            })?),
            None => None,
        };

        let target_area = match text("area") {
            Some(v) => Some(v.parse::<f64>().map_err(|_| {
                PricebandError::invalid_input("area", format!("expected a number, got '{v}'"))
            })?),
            None => None,
        };

        let spec = FilterSpec {
            property_type: text("type"),
            neighborhood: text("neighborhood"),
            city: text("city"),
            postal_code: text("postal_code"),
            block: text("block"),
            require_parking,
            bedrooms,
            target_area,
        };
        spec.validate()?;
        Ok(spec)
    }

    pub fn from_pairs<'a, I>(pairs: I) -> Result<Self, PricebandError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let map: HashMap<&str, &str> = pairs.into_iter().collect();
        Self::parse_with(|key| map.get(key).map(|v| v.to_string()))
    }

    pub fn validate(&self) -> Result<(), PricebandError> {
        if let Some(area) = self.target_area {
            if !area.is_finite() || area <= 0.0 {
                return Err(PricebandError::invalid_input(
                    "area",
                    format!("target area must be a positive number, got {area}"),
                ));
            }
        }
        Ok(())
    }

    /// Fields set in `other` replace the ones in `self`.
    pub fn overlay(mut self, other: FilterSpec) -> Self {
        if other.property_type.is_some() {
            self.property_type = other.property_type;
        }
        if other.neighborhood.is_some() {
            self.neighborhood = other.neighborhood;
        }
        if other.city.is_some() {
            self.city = other.city;
        }
        if other.postal_code.is_some() {
            self.postal_code = other.postal_code;
        }
        if other.block.is_some() {
            self.block = other.block;
        }
        if other.require_parking.is_some() {
            self.require_parking = other.require_parking;
        }
        if other.bedrooms.is_some() {
            self.bedrooms = other.bedrooms;
        }
        if other.target_area.is_some() {
            self.target_area = other.target_area;
        }
        self
    }

    /// Key for caching results of this request. Text fields enter verbatim,
    /// since [`ListingFilter`] compares them exactly.
    pub fn cache_key(&self) -> String {
        [
            format!("{:?}", self.property_type),
            format!("{:?}", self.neighborhood),
            format!("{:?}", self.city),
            format!("{:?}", self.postal_code),
            format!("{:?}", self.block),
            format!("{:?}", self.require_parking),
            format!("{:?}", self.bedrooms),
            format!("{:?}", self.target_area),
        ]
        .join("|")
    }
}

pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "1" => Some(true),
        "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

/// Neighborhood names recorded in the data as several sub-district tags.
#[derive(Debug, Clone, PartialEq)]
pub struct NeighborhoodAliases {
    groups: HashMap<String, Vec<String>>,
}

impl NeighborhoodAliases {
    pub fn empty() -> Self {
        Self {
            groups: HashMap::new(),
        }
    }

    pub fn insert(&mut self, name: &str, tags: Vec<String>) {
        self.groups.insert(name.to_string(), tags);
    }

    pub fn tags(&self, name: &str) -> Option<&[String]> {
        self.groups.get(name).map(|t| t.as_slice())
    }

    pub fn matches(&self, requested: &str, recorded: &str) -> bool {
        match self.tags(requested) {
            Some(tags) => tags.iter().any(|t| t == recorded),
            None => requested == recorded,
        }
    }
}

impl Default for NeighborhoodAliases {
    fn default() -> Self {
        let mut aliases = Self::empty();
        aliases.insert("Águas Claras", vec!["NORTE".into(), "SUL".into()]);
        aliases
    }
}

pub struct ListingFilter<'a> {
    spec: &'a FilterSpec,
    aliases: &'a NeighborhoodAliases,
    bedroom_bucket: u32,
}

impl<'a> ListingFilter<'a> {
    pub fn new(spec: &'a FilterSpec, aliases: &'a NeighborhoodAliases, bedroom_bucket: u32) -> Self {
        Self {
            spec,
            aliases,
            bedroom_bucket,
        }
    }

    pub fn spec(&self) -> &FilterSpec {
        self.spec
    }

    /// All predicates except the target area window.
    pub fn matches(&self, listing: &Listing) -> bool {
        if !listing.has_valid_price_per_area() {
            return false;
        }
        let spec = self.spec;
        if let Some(ref t) = spec.property_type {
            if listing.property_type != *t {
                return false;
            }
        }
        if let Some(ref n) = spec.neighborhood {
            if !self.aliases.matches(n, &listing.neighborhood) {
                return false;
            }
        }
        if let Some(ref c) = spec.city {
            if listing.city != *c {
                return false;
            }
        }
        if let Some(ref p) = spec.postal_code {
            if listing.postal_code.as_deref() != Some(p.as_str()) {
                return false;
            }
        }
        if let Some(ref b) = spec.block {
            if listing.block.as_deref() != Some(b.as_str()) {
                return false;
            }
        }
        if let Some(parking) = spec.require_parking {
            if listing.parking_spaces.is_some() != parking {
                return false;
            }
        }
        if let Some(wanted) = spec.bedrooms {
            let Some(have) = listing.bedrooms else {
                return false;
            };
            let ok = if wanted < self.bedroom_bucket {
                have == wanted
            } else {
                have >= wanted
            };
            if !ok {
                return false;
            }
        }
        true
    }

    pub fn apply<'l>(&self, listings: &'l [Listing]) -> Vec<&'l Listing> {
        listings.iter().filter(|l| self.matches(l)).collect()
    }

    pub fn apply_offer<'l>(&self, listings: &'l [Listing], offer: OfferType) -> Vec<&'l Listing> {
        listings
            .iter()
            .filter(|l| l.offer == offer && self.matches(l))
            .collect()
    }
}
