//! Partition of one offer type's listings into price-per-m² bands.
//!
//! Labels produced here carry no order; bands are only addressed by the rank
//! assigned after sorting (see [`crate::domain::alignment::rank_bands`]).

use crate::domain::band_metrics::BandMetrics;
use crate::domain::kmeans::{fit_kmeans, KMeansParams};
use crate::domain::listing::{Listing, OfferType};
use serde::{Deserialize, Serialize};

/// Label given to every row when a segment is too small to subdivide.
pub const PLACEHOLDER_LABEL: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandParams {
    pub kmeans: KMeansParams,
    pub placeholder_label: usize,
}

impl Default for BandParams {
    fn default() -> Self {
        Self {
            kmeans: KMeansParams::default(),
            placeholder_label: PLACEHOLDER_LABEL,
        }
    }
}

impl BandParams {
    /// Largest segment that still gets a single synthetic band.
    pub fn small_sample_limit(&self) -> usize {
        self.kmeans.n_clusters.saturating_sub(1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BandingMethod {
    /// No rows: no bands.
    Empty,
    /// Too few comparables; one aggregate band.
    Synthetic,
    KMeans,
}

/// A listing tagged with the rank of its band, as handed to the map export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandedListing {
    pub id: String,
    pub offer: OfferType,
    pub band: usize,
    pub price_per_area: f64,
    pub nominal_price: f64,
    pub usable_area: f64,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct LabeledListing<'l> {
    pub listing: &'l Listing,
    pub label: usize,
}

#[derive(Debug, Clone)]
pub struct Clustered<'l> {
    pub offer: OfferType,
    pub method: BandingMethod,
    pub rows: Vec<LabeledListing<'l>>,
}

impl<'l> Clustered<'l> {
    /// Distinct labels in ascending order.
    pub fn labels(&self) -> Vec<usize> {
        let mut labels: Vec<usize> = self.rows.iter().map(|r| r.label).collect();
        labels.sort_unstable();
        labels.dedup();
        labels
    }

    pub fn members(&self, label: usize) -> Vec<&'l Listing> {
        self.rows
            .iter()
            .filter(|r| r.label == label)
            .map(|r| r.listing)
            .collect()
    }

    /// Replaces raw labels with the ranks of `ranked`, which must come from
    /// this partition.
    pub fn banded(&self, ranked: &[BandMetrics]) -> Vec<BandedListing> {
        self.rows
            .iter()
            .filter_map(|row| {
                let band = ranked.iter().find(|b| b.label == row.label)?;
                let l = row.listing;
                Some(BandedListing {
                    id: l.id.clone(),
                    offer: self.offer,
                    band: band.rank,
                    price_per_area: l.price_per_area(),
                    nominal_price: l.nominal_price,
                    usable_area: l.usable_area,
                    latitude: l.latitude,
                    longitude: l.longitude,
                })
            })
            .collect()
    }
}

pub fn clusterize<'l>(rows: &[&'l Listing], offer: OfferType, params: &BandParams) -> Clustered<'l> {
    if rows.is_empty() {
        return Clustered {
            offer,
            method: BandingMethod::Empty,
            rows: Vec::new(),
        };
    }

    if rows.len() <= params.small_sample_limit() {
        return synthetic(rows, offer, params.placeholder_label);
    }

    let values: Vec<f64> = rows.iter().map(|l| l.price_per_area()).collect();
    match fit_kmeans(&values, &params.kmeans) {
        Ok(model) => {
            tracing::debug!(
                offer = %offer,
                rows = rows.len(),
                bands = model.occupied_labels().len(),
                inertia = model.inertia,
                "fitted price bands"
            );
            Clustered {
                offer,
                method: BandingMethod::KMeans,
                rows: rows
                    .iter()
                    .zip(model.labels)
                    .map(|(listing, label)| LabeledListing { listing, label })
                    .collect(),
            }
        }
        Err(e) => {
            tracing::warn!(offer = %offer, error = %e, "clustering failed, using a single band");
            synthetic(rows, offer, params.placeholder_label)
        }
    }
}

fn synthetic<'l>(rows: &[&'l Listing], offer: OfferType, label: usize) -> Clustered<'l> {
    Clustered {
        offer,
        method: BandingMethod::Synthetic,
        rows: rows
            .iter()
            .map(|listing| LabeledListing { listing, label })
            .collect(),
    }
}
