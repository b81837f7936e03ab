//! CLI definition and dispatch.

use clap::{Args, Parser, Subcommand};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use crate::adapters::csv_adapter::{read_listings, CsvListingStore};
use crate::adapters::csv_export_adapter::CsvBandExporter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::analysis::{AnalysisConfig, AnalysisResult, Analyzer};
use crate::domain::config_validation::{
    validate_analysis_config, validate_filter_section, validate_store_config,
};
use crate::domain::error::PricebandError;
use crate::domain::filter::FilterSpec;
use crate::domain::format::{format_area, format_percent, format_pairs, FormattedBand};
use crate::domain::listing::{Listing, OfferType};
use crate::ports::band_export_port::BandExportPort;
use crate::ports::config_port::ConfigPort;
use crate::ports::listing_port::{ListingPort, ListingSummary, DEFAULT_MAX_AGE_DAYS};

#[derive(Parser, Debug)]
#[command(name = "priceband", about = "Comparable-listing price bands for sale and rent")]
pub struct Cli {
    /// Debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Band comparable listings and print sale/rental pairs
    Analyze {
        #[arg(short, long)]
        config: PathBuf,
        #[command(flatten)]
        filter: FilterArgs,
        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
        /// Offer type for --band (sale or rental)
        #[arg(long, requires = "band")]
        offer: Option<String>,
        /// Print only the band at this rank (0 = cheapest)
        #[arg(long, requires = "offer")]
        band: Option<usize>,
        /// Skip the banded-listing export
        #[arg(long)]
        no_export: bool,
    },
    /// Load a CSV snapshot into the SQLite listing store
    Import {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        csv: PathBuf,
    },
    /// Show snapshot token and listing counts
    Info {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

/// Request fields from the command line. Values stay textual so that
/// malformed input is reported like any other invalid request.
#[derive(Args, Debug, Default, Clone)]
pub struct FilterArgs {
    #[arg(long = "type")]
    pub property_type: Option<String>,
    #[arg(long)]
    pub neighborhood: Option<String>,
    #[arg(long)]
    pub city: Option<String>,
    #[arg(long)]
    pub postal_code: Option<String>,
    #[arg(long)]
    pub block: Option<String>,
    /// true: with parking, false: without
    #[arg(long)]
    pub parking: Option<String>,
    #[arg(long)]
    pub bedrooms: Option<String>,
    /// Target usable area in m²
    #[arg(long)]
    pub area: Option<String>,
}

impl FilterArgs {
    pub fn to_spec(&self) -> Result<FilterSpec, PricebandError> {
        FilterSpec::parse_with(|key| {
            match key {
                "type" => self.property_type.clone(),
                "neighborhood" => self.neighborhood.clone(),
                "city" => self.city.clone(),
                "postal_code" => self.postal_code.clone(),
                "block" => self.block.clone(),
                "parking" => self.parking.clone(),
                "bedrooms" => self.bedrooms.clone(),
                "area" => self.area.clone(),
                _ => None,
            }
        })
    }
}

pub fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let default = if verbose { "priceband=debug" } else { "priceband=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Analyze {
            config,
            filter,
            json,
            offer,
            band,
            no_export,
        } => run_analyze(&config, &filter, json, offer.as_deref().zip(band), no_export),
        Command::Import { config, csv } => run_import(&config, &csv),
        Command::Info { config } => run_info(&config),
        Command::Validate { config } => run_validate(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, PricebandError> {
    FileConfigAdapter::from_file(path).map_err(|e| PricebandError::ConfigParse {
        file: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// The configured listing store.
pub enum Store {
    Csv(CsvListingStore),
    #[cfg(feature = "sqlite")]
    Sqlite(crate::adapters::sqlite_adapter::SqliteListingStore),
}

impl Store {
    pub fn backend(&self) -> &'static str {
        match self {
            Store::Csv(_) => "csv",
            #[cfg(feature = "sqlite")]
            Store::Sqlite(_) => "sqlite",
        }
    }

    /// The SQLite store doubles as the export sink for its own bands.
    pub fn as_export(&self) -> Option<&dyn BandExportPort> {
        match self {
            Store::Csv(_) => None,
            #[cfg(feature = "sqlite")]
            Store::Sqlite(s) => Some(s),
        }
    }
}

impl ListingPort for Store {
    fn fetch_listings(&self) -> Result<Vec<Listing>, PricebandError> {
        match self {
            Store::Csv(s) => s.fetch_listings(),
            #[cfg(feature = "sqlite")]
            Store::Sqlite(s) => s.fetch_listings(),
        }
    }

    fn snapshot_token(&self) -> Result<String, PricebandError> {
        match self {
            Store::Csv(s) => s.snapshot_token(),
            #[cfg(feature = "sqlite")]
            Store::Sqlite(s) => s.snapshot_token(),
        }
    }

    fn summary(&self) -> Result<ListingSummary, PricebandError> {
        match self {
            Store::Csv(s) => s.summary(),
            #[cfg(feature = "sqlite")]
            Store::Sqlite(s) => s.summary(),
        }
    }
}

pub fn open_store(config: &dyn ConfigPort) -> Result<Store, PricebandError> {
    validate_store_config(config)?;
    let backend = config
        .get_string("store", "backend")
        .map(|b| b.trim().to_string())
        .unwrap_or_else(|| "csv".to_string());
    let max_age = config.get_int("store", "max_age_days", DEFAULT_MAX_AGE_DAYS).max(0) as u32;

    match backend.as_str() {
        "sqlite" => open_sqlite(config),
        _ => {
            let path = config.get_string("store", "path").unwrap_or_default();
            Ok(Store::Csv(
                CsvListingStore::new(PathBuf::from(path.trim())).with_max_age(max_age),
            ))
        }
    }
}

#[cfg(feature = "sqlite")]
fn open_sqlite(config: &dyn ConfigPort) -> Result<Store, PricebandError> {
    use crate::adapters::sqlite_adapter::SqliteListingStore;

    let store = SqliteListingStore::from_config(config)?;
    store.initialize_schema()?;
    Ok(Store::Sqlite(store))
}

#[cfg(not(feature = "sqlite"))]
fn open_sqlite(_config: &dyn ConfigPort) -> Result<Store, PricebandError> {
    Err(PricebandError::ConfigInvalid {
        section: "store".into(),
        key: "backend".into(),
        reason: "sqlite feature is required for the sqlite backend".into(),
    })
}

/// `[filter]` defaults overlaid with command-line fields.
pub fn build_request(config: &dyn ConfigPort, args: &FilterArgs) -> Result<FilterSpec, PricebandError> {
    let defaults = validate_filter_section(config)?;
    let request = defaults.overlay(args.to_spec()?);
    request.validate()?;
    Ok(request)
}

fn run_analyze(
    config_path: &Path,
    args: &FilterArgs,
    json: bool,
    band: Option<(&str, usize)>,
    no_export: bool,
) -> Result<(), PricebandError> {
    eprintln!("Loading config from {}", config_path.display());
    let config = load_config(config_path)?;
    let analysis_config = AnalysisConfig::from_config(&config)?;
    let request = build_request(&config, args)?;
    let lookup = band
        .map(|(offer, rank)| {
            offer
                .parse::<OfferType>()
                .map(|o| (o, rank))
                .map_err(|reason| PricebandError::invalid_input("offer", reason))
        })
        .transpose()?;

    let store = open_store(&config)?;
    eprintln!("Reading listings from {} store", store.backend());

    let csv_export = config
        .get_string("export", "path")
        .filter(|p| !p.trim().is_empty())
        .map(|p| CsvBandExporter::new(PathBuf::from(p.trim())));
    let export: Option<&dyn BandExportPort> = match (&csv_export, no_export) {
        (_, true) => None,
        (Some(csv), false) => Some(csv),
        (None, false) => store.as_export(),
    };

    let result = run_analysis(&store, &request, analysis_config, export)?;

    if let Some((offer, rank)) = lookup {
        let found = result.band(offer, rank)?;
        if json {
            println!("{}", to_json(found)?);
        } else {
            print!("{}", render_band(&FormattedBand::from(found)));
        }
        return Ok(());
    }

    if json {
        println!("{}", to_json(result.as_ref())?);
    } else {
        print!("{}", render_table(&result));
    }
    Ok(())
}

/// Runs one analysis and reports per-segment counts on stderr.
pub fn run_analysis(
    store: &dyn ListingPort,
    request: &FilterSpec,
    config: AnalysisConfig,
    export: Option<&dyn BandExportPort>,
) -> Result<Arc<AnalysisResult>, PricebandError> {
    let mut analyzer = Analyzer::new(store, config);
    if let Some(export) = export {
        analyzer = analyzer.with_export(export);
    }
    let result = analyzer.run(request)?;

    for segment in &result.segments {
        let window = match result.windows.for_offer(segment.offer) {
            Some(w) => format!(
                ", area window ±{} ({}..{})",
                format_percent(w.width),
                format_area(w.lower),
                format_area(w.upper)
            ),
            None => String::new(),
        };
        eprintln!(
            "  {}: {} comparables, {} after outlier removal, {} bands{}",
            segment.offer,
            segment.filtered,
            segment.after_outliers,
            result.bands(segment.offer).len(),
            window
        );
    }
    if result.is_empty() {
        eprintln!("No comparable listings matched the request.");
    }

    Ok(result)
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, PricebandError> {
    serde_json::to_string_pretty(value).map_err(|e| PricebandError::Io(std::io::Error::other(e)))
}

fn render_band(band: &FormattedBand) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Rank:           {}", band.rank);
    let _ = writeln!(out, "Price per m²:   {}", band.price_per_area);
    let _ = writeln!(out, "Price:          {}", band.nominal_price);
    let _ = writeln!(out, "Usable area:    {}", band.usable_area);
    let _ = writeln!(out, "Variation:      {}", band.coefficient_of_variation);
    let _ = writeln!(out, "Sample size:    {}", band.sample_size);
    out
}

/// One line per rank; a missing side prints as `-`.
pub fn render_table(result: &AnalysisResult) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>4}  {:>20}  {:>18}  {:>4}  {:>20}  {:>16}  {:>4}  {:>8}",
        "rank", "sale /m²", "sale price", "n", "rent /m²", "rent", "n", "yield"
    );
    for pair in format_pairs(&result.pairs) {
        let side = |b: &Option<FormattedBand>| match b {
            Some(b) => (b.price_per_area.clone(), b.nominal_price.clone(), b.sample_size.to_string()),
            None => ("-".to_string(), "-".to_string(), "-".to_string()),
        };
        let (s_rate, s_price, s_n) = side(&pair.sale);
        let (r_rate, r_price, r_n) = side(&pair.rental);
        let _ = writeln!(
            out,
            "{:>4}  {:>20}  {:>18}  {:>4}  {:>20}  {:>16}  {:>4}  {:>8}",
            pair.rank, s_rate, s_price, s_n, r_rate, r_price, r_n, pair.yield_ratio
        );
    }
    out
}

fn run_import(config_path: &Path, csv_path: &Path) -> Result<(), PricebandError> {
    eprintln!("Loading config from {}", config_path.display());
    let config = load_config(config_path)?;
    let store = open_store(&config)?;

    #[cfg(feature = "sqlite")]
    {
        let Store::Sqlite(sqlite) = &store else {
            return Err(PricebandError::ConfigInvalid {
                section: "store".into(),
                key: "backend".into(),
                reason: "import requires the sqlite backend".into(),
            });
        };

        let file = fs::File::open(csv_path).map_err(|e| PricebandError::StoreUnavailable {
            reason: format!("failed to read {}: {}", csv_path.display(), e),
        })?;
        let listings = read_listings(file)?;
        let count = sqlite.insert_listings(&listings)?;
        eprintln!("Imported {count} listings from {}", csv_path.display());
        Ok(())
    }

    #[cfg(not(feature = "sqlite"))]
    {
        let _ = (store, csv_path, read_listings::<fs::File>);
        Err(PricebandError::ConfigInvalid {
            section: "store".into(),
            key: "backend".into(),
            reason: "sqlite feature is required for import".into(),
        })
    }
}

fn run_info(config_path: &Path) -> Result<(), PricebandError> {
    let config = load_config(config_path)?;
    let store = open_store(&config)?;
    let token = store.snapshot_token()?;
    let summary = store.summary()?;

    println!("backend:  {}", store.backend());
    println!("snapshot: {token}");
    println!("sale:     {}", summary.sale);
    println!("rental:   {}", summary.rental);
    match (summary.first_collected, summary.last_collected) {
        (Some(first), Some(last)) => println!("collected: {first} to {last}"),
        _ => println!("collected: undated"),
    }
    Ok(())
}

fn run_validate(config_path: &Path) -> Result<(), PricebandError> {
    eprintln!("Validating {}", config_path.display());
    let config = load_config(config_path)?;
    validate_store_config(&config)?;
    validate_analysis_config(&config)?;
    let defaults = validate_filter_section(&config)?;
    if defaults != FilterSpec::default() {
        eprintln!("  default request: {}", defaults.cache_key());
    }
    eprintln!("Configuration is valid.");
    Ok(())
}
