//! Descriptive statistics per band.

use crate::domain::band::Clustered;
use crate::domain::listing::{Listing, OfferType};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BandMetrics {
    pub offer: OfferType,
    /// Position after sorting by mean price per m²; the band's address.
    pub rank: usize,
    /// Clustering label, only meaningful within one run.
    pub label: usize,
    pub price_per_area_mean: f64,
    /// Mean price per m² projected onto the target area when one is given,
    /// otherwise the mean listed price.
    pub nominal_price_mean: f64,
    pub usable_area_mean: f64,
    /// Sample standard deviation over mean of price per m². NaN when the
    /// mean is zero or the band has a single row.
    pub coefficient_of_variation: f64,
    pub sample_size: usize,
}

impl BandMetrics {
    pub fn compute(
        rows: &[&Listing],
        offer: OfferType,
        label: usize,
        target_area: Option<f64>,
    ) -> Self {
        let ppa: Vec<f64> = rows.iter().map(|l| l.price_per_area()).collect();
        let price_per_area_mean = mean(&ppa);

        let nominal_price_mean = match target_area {
            Some(area) => price_per_area_mean * area,
            None => mean(&rows.iter().map(|l| l.nominal_price).collect::<Vec<_>>()),
        };

        let usable_area_mean = mean(&rows.iter().map(|l| l.usable_area).collect::<Vec<_>>());

        let coefficient_of_variation = if price_per_area_mean != 0.0 {
            sample_stddev(&ppa) / price_per_area_mean
        } else {
            f64::NAN
        };

        BandMetrics {
            offer,
            rank: 0,
            label,
            price_per_area_mean,
            nominal_price_mean,
            usable_area_mean,
            coefficient_of_variation,
            sample_size: rows.len(),
        }
    }
}

/// One record per occupied label, in label order. Ranks are assigned later.
pub fn aggregate_bands(clustered: &Clustered<'_>, target_area: Option<f64>) -> Vec<BandMetrics> {
    clustered
        .labels()
        .into_iter()
        .map(|label| {
            let members = clustered.members(label);
            BandMetrics::compute(&members, clustered.offer, label, target_area)
        })
        .collect()
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Standard deviation with Bessel's correction; NaN below two values.
fn sample_stddev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    let m = mean(values);
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    (ss / (values.len() - 1) as f64).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::band::{clusterize, BandParams, PLACEHOLDER_LABEL};
    use approx::assert_relative_eq;

    fn listing(id: &str, area: f64, price: f64) -> Listing {
        Listing {
            id: id.into(),
            offer: OfferType::Sale,
            property_type: "Apartamento".into(),
            neighborhood: "Asa Sul".into(),
            city: "Brasília".into(),
            postal_code: None,
            block: None,
            usable_area: area,
            nominal_price: price,
            price_per_area: None,
            bedrooms: None,
            parking_spaces: None,
            latitude: None,
            longitude: None,
            collected_at: None,
        }
    }

    #[test]
    fn means_over_raw_prices_without_target() {
        let rows = [listing("a", 50.0, 500_000.0), listing("b", 100.0, 1_200_000.0)];
        let refs: Vec<&Listing> = rows.iter().collect();
        let m = BandMetrics::compute(&refs, OfferType::Sale, 3, None);

        // 10_000 and 12_000 per m²
        assert_relative_eq!(m.price_per_area_mean, 11_000.0);
        assert_relative_eq!(m.nominal_price_mean, 850_000.0);
        assert_relative_eq!(m.usable_area_mean, 75.0);
        assert_eq!(m.sample_size, 2);
        assert_eq!(m.label, 3);
    }

    #[test]
    fn target_area_projects_nominal_price() {
        let rows = [listing("a", 50.0, 500_000.0), listing("b", 100.0, 1_200_000.0)];
        let refs: Vec<&Listing> = rows.iter().collect();
        let m = BandMetrics::compute(&refs, OfferType::Sale, 0, Some(80.0));
        assert_relative_eq!(m.nominal_price_mean, 11_000.0 * 80.0);
        assert_relative_eq!(m.usable_area_mean, 75.0);
    }

    #[test]
    fn coefficient_of_variation_uses_sample_stddev() {
        let rows = [
            listing("a", 100.0, 1_000_000.0),
            listing("b", 100.0, 1_200_000.0),
            listing("c", 100.0, 1_400_000.0),
        ];
        let refs: Vec<&Listing> = rows.iter().collect();
        let m = BandMetrics::compute(&refs, OfferType::Sale, 0, None);
        // ppa 10k, 12k, 14k: sample std = 2000, mean = 12000
        assert_relative_eq!(m.coefficient_of_variation, 2000.0 / 12_000.0, epsilon = 1e-12);
    }

    #[test]
    fn single_row_has_undefined_variation() {
        let rows = [listing("a", 100.0, 1_000_000.0)];
        let refs: Vec<&Listing> = rows.iter().collect();
        let m = BandMetrics::compute(&refs, OfferType::Sale, 0, None);
        assert!(m.coefficient_of_variation.is_nan());
        assert_eq!(m.sample_size, 1);
    }

    #[test]
    fn zero_mean_has_undefined_variation() {
        let mut row = listing("a", 100.0, 0.0);
        row.price_per_area = Some(0.0);
        let rows = [row.clone(), row];
        let refs: Vec<&Listing> = rows.iter().collect();
        let m = BandMetrics::compute(&refs, OfferType::Sale, 0, None);
        assert!(m.coefficient_of_variation.is_nan());
    }

    #[test]
    fn aggregates_synthetic_band() {
        let rows: Vec<Listing> = (0..6)
            .map(|i| listing(&format!("r{i}"), 60.0, 3_000.0 + 100.0 * i as f64))
            .collect();
        let refs: Vec<&Listing> = rows.iter().collect();
        let clustered = clusterize(&refs, OfferType::Rental, &BandParams::default());
        let bands = aggregate_bands(&clustered, None);
        assert_eq!(bands.len(), 1);
        assert_eq!(bands[0].label, PLACEHOLDER_LABEL);
        assert_eq!(bands[0].sample_size, 6);
        assert_eq!(bands[0].offer, OfferType::Rental);
    }
}
