//! INI file configuration adapter.

use crate::domain::filter::parse_bool;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

/// Keys are case-sensitive so neighborhood aliases keep their spelling.
#[derive(Debug)]
pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let mut config = Ini::new_cs();
        config.load(path).map_err(std::io::Error::other)?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, String> {
        let mut config = Ini::new_cs();
        config.read(content.to_string())?;
        Ok(Self { config })
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.config
            .getint(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.config
            .getfloat(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.config
            .get(section, key)
            .as_deref()
            .and_then(parse_bool)
            .unwrap_or(default)
    }

    /// Sorted, since the INI map does not keep file order.
    fn keys(&self, section: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .config
            .get_map_ref()
            .get(section)
            .map(|s| s.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn from_string_parses_config() {
        let content = r#"
[store]
backend = csv
path = data/listings.csv

[analysis]
clusters = 9
yield = monthly
"#;
        let adapter = FileConfigAdapter::from_string(content).unwrap();
        assert_eq!(adapter.get_string("store", "backend"), Some("csv".to_string()));
        assert_eq!(
            adapter.get_string("store", "path"),
            Some("data/listings.csv".to_string())
        );
        assert_eq!(adapter.get_int("analysis", "clusters", 0), 9);
    }

    #[test]
    fn get_string_returns_none_for_missing_key() {
        let adapter = FileConfigAdapter::from_string("[store]\nbackend = csv\n").unwrap();
        assert_eq!(adapter.get_string("store", "missing"), None);
        assert_eq!(adapter.get_string("missing_section", "key"), None);
    }

    #[test]
    fn numeric_getters_fall_back_to_default() {
        let adapter =
            FileConfigAdapter::from_string("[analysis]\nseed = abc\ntolerance = x\n").unwrap();
        assert_eq!(adapter.get_int("analysis", "seed", 42), 42);
        assert_eq!(adapter.get_int("analysis", "missing", 7), 7);
        assert_eq!(adapter.get_double("analysis", "tolerance", 1e-4), 1e-4);
    }

    #[test]
    fn get_double_returns_value() {
        let adapter =
            FileConfigAdapter::from_string("[analysis]\ninitial_window = 0.2\n").unwrap();
        assert_eq!(adapter.get_double("analysis", "initial_window", 0.0), 0.2);
    }

    #[test]
    fn get_bool_accepts_common_spellings() {
        let adapter =
            FileConfigAdapter::from_string("[filter]\na = true\nb = no\nc = 1\nd = maybe\n")
                .unwrap();
        assert!(adapter.get_bool("filter", "a", false));
        assert!(!adapter.get_bool("filter", "b", true));
        assert!(adapter.get_bool("filter", "c", false));
        assert!(adapter.get_bool("filter", "d", true));
        assert!(!adapter.get_bool("filter", "missing", false));
    }

    #[test]
    fn alias_keys_keep_case_and_accents() {
        let content = "[aliases]\nÁguas Claras = NORTE,SUL\nSudoeste = SUDOESTE,OCTOGONAL\n";
        let adapter = FileConfigAdapter::from_string(content).unwrap();
        assert_eq!(
            adapter.keys("aliases"),
            vec!["Sudoeste".to_string(), "Águas Claras".to_string()]
        );
        assert_eq!(
            adapter.get_string("aliases", "Águas Claras"),
            Some("NORTE,SUL".to_string())
        );
    }

    #[test]
    fn keys_are_sorted_not_in_file_order() {
        let adapter = FileConfigAdapter::from_string("[filter]\nzeta = 1\nalpha = 2\nmid = 3\n").unwrap();
        assert_eq!(adapter.keys("filter"), vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn keys_of_missing_section_is_empty() {
        let adapter = FileConfigAdapter::from_string("[store]\n").unwrap();
        assert!(adapter.keys("aliases").is_empty());
    }

    #[test]
    fn from_file_reads_config() {
        let file = create_temp_config("[export]\npath = /tmp/bands\n");
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(adapter.get_string("export", "path"), Some("/tmp/bands".to_string()));
    }

    #[test]
    fn from_file_returns_error_for_missing_file() {
        let result = FileConfigAdapter::from_file("/nonexistent/path/config.ini");
        assert!(result.is_err());
    }
}
