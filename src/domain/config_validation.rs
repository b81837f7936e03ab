//! Configuration validation.
//!
//! Validates every config field before a run. The readers here are shared
//! with the code that builds runtime settings, so a value that passes
//! validation is read back the same way.

use crate::domain::alignment::YieldConvention;
use crate::domain::error::PricebandError;
use crate::domain::filter::FilterSpec;
use crate::ports::config_port::ConfigPort;
use crate::ports::listing_port::DEFAULT_MAX_AGE_DAYS;

pub const STORE_BACKENDS: [&str; 2] = ["csv", "sqlite"];

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> PricebandError {
    PricebandError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn missing(section: &str, key: &str) -> PricebandError {
    PricebandError::ConfigMissing {
        section: section.to_string(),
        key: key.to_string(),
    }
}

/// Trimmed, non-empty value of a key.
pub(crate) fn read_text(config: &dyn ConfigPort, section: &str, key: &str) -> Option<String> {
    config
        .get_string(section, key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub(crate) fn read_int(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: i64,
) -> Result<i64, PricebandError> {
    match read_text(config, section, key) {
        Some(v) => v
            .parse::<i64>()
            .map_err(|_| invalid(section, key, format!("{key} must be an integer, got '{v}'"))),
        None => Ok(default),
    }
}

pub(crate) fn read_double(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<f64, PricebandError> {
    match read_text(config, section, key) {
        Some(v) => match v.parse::<f64>() {
            Ok(x) if x.is_finite() => Ok(x),
            _ => Err(invalid(section, key, format!("{key} must be a number, got '{v}'"))),
        },
        None => Ok(default),
    }
}

pub fn validate_store_config(config: &dyn ConfigPort) -> Result<(), PricebandError> {
    let backend = read_text(config, "store", "backend").unwrap_or_else(|| "csv".to_string());
    match backend.as_str() {
        "csv" => {
            read_text(config, "store", "path").ok_or_else(|| missing("store", "path"))?;
        }
        "sqlite" => {
            read_text(config, "sqlite", "path").ok_or_else(|| missing("sqlite", "path"))?;
            let pool = read_int(config, "sqlite", "pool_size", 4)?;
            if pool < 1 {
                return Err(invalid("sqlite", "pool_size", "pool_size must be at least 1"));
            }
        }
        other => {
            return Err(invalid(
                "store",
                "backend",
                format!("unknown backend '{other}', expected one of {}", STORE_BACKENDS.join(", ")),
            ));
        }
    }

    let max_age = read_int(config, "store", "max_age_days", DEFAULT_MAX_AGE_DAYS)?;
    if max_age < 0 {
        return Err(invalid("store", "max_age_days", "max_age_days must be non-negative"));
    }
    Ok(())
}

pub fn validate_analysis_config(config: &dyn ConfigPort) -> Result<(), PricebandError> {
    validate_clustering(config)?;
    validate_window(config)?;
    validate_banding(config)?;
    validate_aliases(config)?;
    Ok(())
}

/// Default request fields from `[filter]`, reported as config errors.
pub fn validate_filter_section(config: &dyn ConfigPort) -> Result<FilterSpec, PricebandError> {
    FilterSpec::parse_with(|key| config.get_string("filter", key)).map_err(|e| match e {
        PricebandError::InvalidInput { field, reason } => invalid("filter", &field, reason),
        other => other,
    })
}

fn validate_clustering(config: &dyn ConfigPort) -> Result<(), PricebandError> {
    for key in ["clusters", "restarts", "max_iterations"] {
        let value = read_int(config, "analysis", key, 1)?;
        if value < 1 {
            return Err(invalid("analysis", key, format!("{key} must be at least 1")));
        }
    }

    let seed = read_int(config, "analysis", "seed", 42)?;
    if seed < 0 {
        return Err(invalid("analysis", "seed", "seed must be non-negative"));
    }

    let tolerance = read_double(config, "analysis", "tolerance", 1e-4)?;
    if tolerance < 0.0 {
        return Err(invalid("analysis", "tolerance", "tolerance must be non-negative"));
    }
    Ok(())
}

fn validate_window(config: &dyn ConfigPort) -> Result<(), PricebandError> {
    let min_sample = read_int(config, "analysis", "min_sample", 9)?;
    if min_sample < 1 {
        return Err(invalid("analysis", "min_sample", "min_sample must be at least 1"));
    }

    let initial = read_double(config, "analysis", "initial_window", 0.10)?;
    if initial <= 0.0 || initial >= 1.0 {
        return Err(invalid(
            "analysis",
            "initial_window",
            "initial_window must be between 0 and 1",
        ));
    }

    let step = read_double(config, "analysis", "window_step", 0.05)?;
    if step <= 0.0 {
        return Err(invalid("analysis", "window_step", "window_step must be positive"));
    }

    let steps = read_int(config, "analysis", "max_window_steps", 17)?;
    if steps < 0 {
        return Err(invalid(
            "analysis",
            "max_window_steps",
            "max_window_steps must be non-negative",
        ));
    }
    Ok(())
}

fn validate_banding(config: &dyn ConfigPort) -> Result<(), PricebandError> {
    let bucket = read_int(config, "analysis", "bedroom_bucket", 4)?;
    if bucket < 1 {
        return Err(invalid("analysis", "bedroom_bucket", "bedroom_bucket must be at least 1"));
    }

    let placeholder = read_int(config, "analysis", "placeholder_band", 5)?;
    if placeholder < 0 {
        return Err(invalid(
            "analysis",
            "placeholder_band",
            "placeholder_band must be non-negative",
        ));
    }

    if let Some(v) = read_text(config, "analysis", "yield") {
        v.parse::<YieldConvention>()
            .map_err(|reason| invalid("analysis", "yield", reason))?;
    }
    Ok(())
}

fn validate_aliases(config: &dyn ConfigPort) -> Result<(), PricebandError> {
    for name in config.keys("aliases") {
        let tags = read_text(config, "aliases", &name).unwrap_or_default();
        if tags.split(',').all(|t| t.trim().is_empty()) {
            return Err(invalid("aliases", &name, "alias must list at least one tag"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    fn make_config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    #[test]
    fn valid_csv_store_passes() {
        let config = make_config("[store]\nbackend = csv\npath = listings.csv\nmax_age_days = 90\n");
        assert!(validate_store_config(&config).is_ok());
    }

    #[test]
    fn backend_defaults_to_csv() {
        let config = make_config("[store]\npath = listings.csv\n");
        assert!(validate_store_config(&config).is_ok());
    }

    #[test]
    fn csv_store_requires_path() {
        let config = make_config("[store]\nbackend = csv\n");
        let err = validate_store_config(&config).unwrap_err();
        assert!(matches!(err, PricebandError::ConfigMissing { key, .. } if key == "path"));
    }

    #[test]
    fn sqlite_store_requires_sqlite_path() {
        let config = make_config("[store]\nbackend = sqlite\n");
        let err = validate_store_config(&config).unwrap_err();
        assert!(
            matches!(err, PricebandError::ConfigMissing { section, key } if section == "sqlite" && key == "path")
        );
    }

    #[test]
    fn sqlite_pool_size_zero_fails() {
        let config = make_config("[store]\nbackend = sqlite\n[sqlite]\npath = a.db\npool_size = 0\n");
        let err = validate_store_config(&config).unwrap_err();
        assert!(matches!(err, PricebandError::ConfigInvalid { key, .. } if key == "pool_size"));
    }

    #[test]
    fn unknown_backend_fails() {
        let config = make_config("[store]\nbackend = postgres\npath = x\n");
        let err = validate_store_config(&config).unwrap_err();
        assert!(matches!(err, PricebandError::ConfigInvalid { key, .. } if key == "backend"));
    }

    #[test]
    fn negative_max_age_fails() {
        let config = make_config("[store]\npath = a.csv\nmax_age_days = -1\n");
        let err = validate_store_config(&config).unwrap_err();
        assert!(matches!(err, PricebandError::ConfigInvalid { key, .. } if key == "max_age_days"));
    }

    #[test]
    fn empty_analysis_section_passes() {
        let config = make_config("[analysis]\n");
        assert!(validate_analysis_config(&config).is_ok());
    }

    #[test]
    fn full_analysis_section_passes() {
        let config = make_config(
            r#"
[analysis]
clusters = 9
seed = 42
restarts = 10
max_iterations = 300
tolerance = 0.0001
min_sample = 9
initial_window = 0.10
window_step = 0.05
max_window_steps = 17
bedroom_bucket = 4
placeholder_band = 5
yield = annualized

[aliases]
Águas Claras = NORTE,SUL
"#,
        );
        assert!(validate_analysis_config(&config).is_ok());
    }

    #[test]
    fn zero_clusters_fails() {
        let config = make_config("[analysis]\nclusters = 0\n");
        let err = validate_analysis_config(&config).unwrap_err();
        assert!(matches!(err, PricebandError::ConfigInvalid { key, .. } if key == "clusters"));
    }

    #[test]
    fn non_numeric_value_fails() {
        let config = make_config("[analysis]\nrestarts = ten\n");
        let err = validate_analysis_config(&config).unwrap_err();
        assert!(matches!(err, PricebandError::ConfigInvalid { key, .. } if key == "restarts"));
    }

    #[test]
    fn window_out_of_range_fails() {
        let config = make_config("[analysis]\ninitial_window = 1.5\n");
        let err = validate_analysis_config(&config).unwrap_err();
        assert!(matches!(err, PricebandError::ConfigInvalid { key, .. } if key == "initial_window"));

        let config = make_config("[analysis]\nwindow_step = 0\n");
        let err = validate_analysis_config(&config).unwrap_err();
        assert!(matches!(err, PricebandError::ConfigInvalid { key, .. } if key == "window_step"));
    }

    #[test]
    fn unknown_yield_convention_fails() {
        let config = make_config("[analysis]\nyield = weekly\n");
        let err = validate_analysis_config(&config).unwrap_err();
        assert!(matches!(err, PricebandError::ConfigInvalid { key, .. } if key == "yield"));
    }

    #[test]
    fn empty_alias_fails() {
        let config = make_config("[aliases]\nSudoeste = ,\n");
        let err = validate_analysis_config(&config).unwrap_err();
        assert!(matches!(err, PricebandError::ConfigInvalid { key, .. } if key == "Sudoeste"));
    }

    #[test]
    fn filter_section_is_parsed() {
        let config = make_config("[filter]\ntype = Apartamento\nbedrooms = 3\narea = 80\n");
        let spec = validate_filter_section(&config).unwrap();
        assert_eq!(spec.property_type.as_deref(), Some("Apartamento"));
        assert_eq!(spec.bedrooms, Some(3));
        assert_eq!(spec.target_area, Some(80.0));
    }

    #[test]
    fn bad_filter_value_is_a_config_error() {
        let config = make_config("[filter]\narea = -5\n");
        let err = validate_filter_section(&config).unwrap_err();
        assert!(
            matches!(err, PricebandError::ConfigInvalid { section, key, .. } if section == "filter" && key == "area")
        );
    }
}
