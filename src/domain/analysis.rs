//! Pipeline entry point.
//!
//! Filter, then per offer type resolve the area window, drop IQR outliers,
//! cluster and aggregate; finally rank and align both sides and compute
//! yields. One call owns every intermediate value; nothing is shared.

use crate::domain::alignment::{align_bands, rank_bands, AlignedBandPair, YieldConvention};
use crate::domain::band::{clusterize, BandParams, BandedListing, BandingMethod};
use crate::domain::band_metrics::{aggregate_bands, BandMetrics};
use crate::domain::config_validation::{read_double, read_int, read_text, validate_analysis_config};
use crate::domain::error::PricebandError;
use crate::domain::filter::{FilterSpec, ListingFilter, NeighborhoodAliases, DEFAULT_BEDROOM_BUCKET};
use crate::domain::kmeans::KMeansParams;
use crate::domain::listing::{Listing, OfferType};
use crate::domain::outlier::remove_outliers;
use crate::domain::sample_window::{resolve_segments, WindowParams, WindowResolution};
use crate::ports::band_export_port::BandExportPort;
use crate::ports::cache_port::CachePort;
use crate::ports::config_port::ConfigPort;
use crate::ports::listing_port::ListingPort;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    pub window: WindowParams,
    pub bands: BandParams,
    pub bedroom_bucket: u32,
    pub yield_convention: YieldConvention,
    pub aliases: NeighborhoodAliases,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            window: WindowParams::default(),
            bands: BandParams::default(),
            bedroom_bucket: DEFAULT_BEDROOM_BUCKET,
            yield_convention: YieldConvention::default(),
            aliases: NeighborhoodAliases::default(),
        }
    }
}

impl AnalysisConfig {
    /// Reads `[analysis]` and `[aliases]`; absent keys keep their defaults.
    ///
    /// Configured aliases are added to the built-in group, replacing it when
    /// the same neighborhood is named.
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, PricebandError> {
        validate_analysis_config(config)?;
        let d = AnalysisConfig::default();
        let s = "analysis";

        let window = WindowParams {
            initial_width: read_double(config, s, "initial_window", d.window.initial_width)?,
            step: read_double(config, s, "window_step", d.window.step)?,
            max_steps: read_int(config, s, "max_window_steps", d.window.max_steps as i64)? as usize,
            min_sample: read_int(config, s, "min_sample", d.window.min_sample as i64)? as usize,
        };

        let kmeans = KMeansParams {
            n_clusters: read_int(config, s, "clusters", d.bands.kmeans.n_clusters as i64)? as usize,
            seed: read_int(config, s, "seed", d.bands.kmeans.seed as i64)? as u64,
            n_init: read_int(config, s, "restarts", d.bands.kmeans.n_init as i64)? as usize,
            max_iterations: read_int(config, s, "max_iterations", d.bands.kmeans.max_iterations as i64)?
                as usize,
            tolerance: read_double(config, s, "tolerance", d.bands.kmeans.tolerance)?,
        };

        let bands = BandParams {
            kmeans,
            placeholder_label: read_int(config, s, "placeholder_band", d.bands.placeholder_label as i64)?
                as usize,
        };

        let yield_convention = match read_text(config, s, "yield") {
            Some(v) => v.parse().map_err(|reason| PricebandError::ConfigInvalid {
                section: s.to_string(),
                key: "yield".to_string(),
                reason,
            })?,
            None => d.yield_convention,
        };

        let mut aliases = d.aliases;
        for name in config.keys("aliases") {
            let tags: Vec<String> = read_text(config, "aliases", &name)
                .unwrap_or_default()
                .split(',')
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect();
            aliases.insert(&name, tags);
        }

        Ok(AnalysisConfig {
            window,
            bands,
            bedroom_bucket: read_int(config, s, "bedroom_bucket", d.bedroom_bucket as i64)? as u32,
            yield_convention,
            aliases,
        })
    }
}

/// How many rows each stage left for one offer type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentSummary {
    pub offer: OfferType,
    pub filtered: usize,
    pub after_outliers: usize,
    pub method: BandingMethod,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub request: FilterSpec,
    pub yield_convention: YieldConvention,
    /// Ranked ascending by mean price per m².
    pub sale: Vec<BandMetrics>,
    pub rental: Vec<BandMetrics>,
    pub pairs: Vec<AlignedBandPair>,
    pub banded: Vec<BandedListing>,
    pub windows: WindowResolution,
    pub segments: Vec<SegmentSummary>,
}

impl AnalysisResult {
    pub fn bands(&self, offer: OfferType) -> &[BandMetrics] {
        match offer {
            OfferType::Sale => &self.sale,
            OfferType::Rental => &self.rental,
        }
    }

    /// The `rank`-th cheapest band of one offer type.
    pub fn band(&self, offer: OfferType, rank: usize) -> Result<&BandMetrics, PricebandError> {
        let bands = self.bands(offer);
        bands.get(rank).ok_or(PricebandError::BandNotFound {
            offer,
            rank,
            available: bands.len(),
        })
    }

    pub fn banded_for(&self, offer: OfferType) -> Vec<BandedListing> {
        self.banded.iter().filter(|b| b.offer == offer).cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.sale.is_empty() && self.rental.is_empty()
    }
}

/// Runs the pipeline over an in-memory snapshot. Pure and deterministic.
pub fn run_pipeline(listings: &[Listing], request: &FilterSpec, config: &AnalysisConfig) -> AnalysisResult {
    let filter = ListingFilter::new(request, &config.aliases, config.bedroom_bucket);
    let segments = resolve_segments(listings, &filter, &config.window);

    let mut ranked = Vec::with_capacity(2);
    let mut banded = Vec::new();
    let mut summaries = Vec::with_capacity(2);

    for offer in OfferType::ALL {
        let rows = segments.get(offer).to_vec();
        let filtered = rows.len();
        let kept = remove_outliers(rows, |l| l.price_per_area());
        let clustered = clusterize(&kept, offer, &config.bands);
        let bands = rank_bands(aggregate_bands(&clustered, request.target_area));

        tracing::debug!(
            offer = %offer,
            filtered,
            after_outliers = kept.len(),
            bands = bands.len(),
            "segment banded"
        );

        banded.extend(clustered.banded(&bands));
        summaries.push(SegmentSummary {
            offer,
            filtered,
            after_outliers: kept.len(),
            method: clustered.method,
        });
        ranked.push(bands);
    }

    let rental = ranked.pop().unwrap_or_default();
    let sale = ranked.pop().unwrap_or_default();
    let pairs = align_bands(&sale, &rental, config.yield_convention);

    AnalysisResult {
        request: request.clone(),
        yield_convention: config.yield_convention,
        sale,
        rental,
        pairs,
        banded,
        windows: segments.resolution,
        segments: summaries,
    }
}

/// Validates the request, reads the store and runs the pipeline.
pub fn analyze(
    store: &dyn ListingPort,
    request: &FilterSpec,
    config: &AnalysisConfig,
) -> Result<AnalysisResult, PricebandError> {
    request.validate()?;
    let listings = store.fetch_listings()?;
    tracing::debug!(listings = listings.len(), "fetched snapshot");
    Ok(run_pipeline(&listings, request, config))
}

/// [`analyze`] with an optional result cache and banded-row export.
pub struct Analyzer<'a> {
    store: &'a dyn ListingPort,
    config: AnalysisConfig,
    cache: Option<&'a dyn CachePort<AnalysisResult>>,
    export: Option<&'a dyn BandExportPort>,
}

impl<'a> Analyzer<'a> {
    pub fn new(store: &'a dyn ListingPort, config: AnalysisConfig) -> Self {
        Self {
            store,
            config,
            cache: None,
            export: None,
        }
    }

    pub fn with_cache(mut self, cache: &'a dyn CachePort<AnalysisResult>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_export(mut self, export: &'a dyn BandExportPort) -> Self {
        self.export = Some(export);
        self
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Cached results are keyed by the request and valid for one snapshot
    /// token. Only fresh computations are exported; export failures are
    /// logged and do not fail the analysis.
    pub fn run(&self, request: &FilterSpec) -> Result<Arc<AnalysisResult>, PricebandError> {
        request.validate()?;

        let key = request.cache_key();
        let token = match self.cache {
            Some(cache) => {
                let token = self.store.snapshot_token()?;
                if let Some(hit) = cache.get(&key, &token) {
                    tracing::debug!(key = %key, "analysis cache hit");
                    return Ok(hit);
                }
                Some(token)
            }
            None => None,
        };

        let result = Arc::new(analyze(self.store, request, &self.config)?);

        if let Some(export) = self.export {
            for offer in OfferType::ALL {
                if let Err(e) = export.export(offer, &result.banded_for(offer)) {
                    tracing::warn!(offer = %offer, error = %e, "band export failed");
                }
            }
        }

        if let (Some(cache), Some(token)) = (self.cache, token) {
            cache.set(&key, &token, Arc::clone(&result));
        }
        Ok(result)
    }
}
