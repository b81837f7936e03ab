//! Human-readable rendering of band metrics.
//!
//! Non-finite values render as zero.

use crate::domain::alignment::AlignedBandPair;
use crate::domain::band_metrics::BandMetrics;
use serde::Serialize;

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

/// Fixed two decimals with `,` thousands separators.
pub fn group_thousands(value: f64) -> String {
    let value = finite_or_zero(value);
    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let digits: Vec<char> = int_part.chars().collect();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(*c);
    }

    let sign = if value < 0.0 && fixed.bytes().any(|b| b.is_ascii_digit() && b != b'0') {
        "-"
    } else {
        ""
    };
    format!("{sign}{grouped}.{frac_part}")
}

pub fn format_currency(value: f64) -> String {
    format!("R$ {}", group_thousands(value))
}

pub fn format_rate(value: f64) -> String {
    format!("R$ {} /m²", group_thousands(value))
}

pub fn format_area(value: f64) -> String {
    format!("{:.2} m²", finite_or_zero(value))
}

pub fn format_percent(value: f64) -> String {
    format!("{:.2}%", finite_or_zero(value) * 100.0)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormattedBand {
    pub rank: usize,
    pub price_per_area: String,
    pub nominal_price: String,
    pub usable_area: String,
    pub coefficient_of_variation: String,
    pub sample_size: usize,
}

impl From<&BandMetrics> for FormattedBand {
    fn from(band: &BandMetrics) -> Self {
        FormattedBand {
            rank: band.rank,
            price_per_area: format_rate(band.price_per_area_mean),
            nominal_price: format_currency(band.nominal_price_mean),
            usable_area: format_area(band.usable_area_mean),
            coefficient_of_variation: format_percent(band.coefficient_of_variation),
            sample_size: band.sample_size,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormattedPair {
    pub rank: usize,
    pub sale: Option<FormattedBand>,
    pub rental: Option<FormattedBand>,
    #[serde(rename = "yield")]
    pub yield_ratio: String,
}

impl From<&AlignedBandPair> for FormattedPair {
    fn from(pair: &AlignedBandPair) -> Self {
        FormattedPair {
            rank: pair.rank,
            sale: pair.sale.as_ref().map(FormattedBand::from),
            rental: pair.rental.as_ref().map(FormattedBand::from),
            yield_ratio: format_percent(pair.yield_ratio),
        }
    }
}

pub fn format_pairs(pairs: &[AlignedBandPair]) -> Vec<FormattedPair> {
    pairs.iter().map(FormattedPair::from).collect()
}
