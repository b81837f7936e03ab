//! Rank alignment of sale and rental bands, and the yield of each pair.

use crate::domain::band_metrics::BandMetrics;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum YieldConvention {
    /// Monthly rent over sale price.
    #[default]
    Monthly,
    /// Twelve months of rent over sale price.
    Annualized,
}

impl YieldConvention {
    pub fn rent_multiplier(&self) -> f64 {
        match self {
            YieldConvention::Monthly => 1.0,
            YieldConvention::Annualized => 12.0,
        }
    }
}

impl fmt::Display for YieldConvention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            YieldConvention::Monthly => f.write_str("monthly"),
            YieldConvention::Annualized => f.write_str("annualized"),
        }
    }
}

impl FromStr for YieldConvention {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "monthly" => Ok(YieldConvention::Monthly),
            "annualized" | "annual" | "yearly" => Ok(YieldConvention::Annualized),
            other => Err(format!("unknown yield convention '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlignedBandPair {
    pub rank: usize,
    pub sale: Option<BandMetrics>,
    pub rental: Option<BandMetrics>,
    #[serde(rename = "yield")]
    pub yield_ratio: f64,
}

/// Sorts ascending by mean price per m² and stamps each band with its rank.
///
/// Equal means keep label order, so ranking is deterministic.
pub fn rank_bands(mut bands: Vec<BandMetrics>) -> Vec<BandMetrics> {
    bands.sort_by(|a, b| {
        a.price_per_area_mean
            .total_cmp(&b.price_per_area_mean)
            .then(a.label.cmp(&b.label))
    });
    for (rank, band) in bands.iter_mut().enumerate() {
        band.rank = rank;
    }
    bands
}

/// NaN when either side is missing or the sale price is zero.
pub fn rental_yield(
    sale: Option<&BandMetrics>,
    rental: Option<&BandMetrics>,
    convention: YieldConvention,
) -> f64 {
    match (sale, rental) {
        (Some(s), Some(r)) if s.nominal_price_mean != 0.0 => {
            r.nominal_price_mean * convention.rent_multiplier() / s.nominal_price_mean
        }
        _ => f64::NAN,
    }
}

/// Pairs the i-th cheapest sale band with the i-th cheapest rental band.
///
/// Both inputs must already be ranked. The shorter side is padded with
/// `None`, so the output has `max(sale.len(), rental.len())` entries.
pub fn align_bands(
    sale: &[BandMetrics],
    rental: &[BandMetrics],
    convention: YieldConvention,
) -> Vec<AlignedBandPair> {
    let len = sale.len().max(rental.len());
    (0..len)
        .map(|rank| {
            let s = sale.get(rank);
            let r = rental.get(rank);
            AlignedBandPair {
                rank,
                sale: s.cloned(),
                rental: r.cloned(),
                yield_ratio: rental_yield(s, r, convention),
            }
        })
        .collect()
}
