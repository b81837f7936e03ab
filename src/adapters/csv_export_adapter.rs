//! CSV export of banded listings, one file per offer type.

use crate::domain::band::BandedListing;
use crate::domain::error::PricebandError;
use crate::domain::listing::OfferType;
use crate::ports::band_export_port::BandExportPort;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub struct CsvBandExporter {
    dir: PathBuf,
}

impl CsvBandExporter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn file_path(&self, offer: OfferType) -> PathBuf {
        self.dir.join(format!("bands_{offer}.csv"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

fn export_error(e: impl std::fmt::Display) -> PricebandError {
    PricebandError::Export {
        reason: e.to_string(),
    }
}

impl BandExportPort for CsvBandExporter {
    /// Writes to a temporary file in the target directory and renames it
    /// over the previous export.
    fn export(&self, offer: OfferType, rows: &[BandedListing]) -> Result<(), PricebandError> {
        let tmp = NamedTempFile::new_in(&self.dir).map_err(export_error)?;
        {
            let mut wtr = csv::Writer::from_writer(tmp.as_file());
            for row in rows {
                wtr.serialize(row).map_err(export_error)?;
            }
            wtr.flush().map_err(export_error)?;
        }
        let path = self.file_path(offer);
        tmp.persist(&path).map_err(|e| export_error(e.error))?;
        tracing::debug!(offer = %offer, rows = rows.len(), path = %path.display(), "exported banded listings");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn row(id: &str, band: usize) -> BandedListing {
        BandedListing {
            id: id.into(),
            offer: OfferType::Rental,
            band,
            price_per_area: 45.0,
            nominal_price: 3_600.0,
            usable_area: 80.0,
            latitude: Some(-15.8),
            longitude: None,
        }
    }

    fn read_back(path: &Path) -> Vec<BandedListing> {
        let mut rdr = csv::Reader::from_path(path).unwrap();
        rdr.deserialize().map(|r| r.unwrap()).collect()
    }

    #[test]
    fn writes_one_file_per_offer() {
        let dir = TempDir::new().unwrap();
        let exporter = CsvBandExporter::new(dir.path().to_path_buf());
        exporter.export(OfferType::Rental, &[row("a", 0), row("b", 2)]).unwrap();

        let path = exporter.file_path(OfferType::Rental);
        assert!(path.ends_with("bands_rental.csv"));
        assert_eq!(read_back(&path), vec![row("a", 0), row("b", 2)]);
        assert!(!exporter.file_path(OfferType::Sale).exists());
    }

    #[test]
    fn second_export_replaces_first() {
        let dir = TempDir::new().unwrap();
        let exporter = CsvBandExporter::new(dir.path().to_path_buf());
        exporter.export(OfferType::Rental, &[row("a", 0), row("b", 1)]).unwrap();
        exporter.export(OfferType::Rental, &[row("c", 0)]).unwrap();

        assert_eq!(read_back(&exporter.file_path(OfferType::Rental)), vec![row("c", 0)]);
        let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn missing_directory_is_an_export_error() {
        let exporter = CsvBandExporter::new(PathBuf::from("/nonexistent/export/dir"));
        let err = exporter.export(OfferType::Sale, &[]).unwrap_err();
        assert!(matches!(err, PricebandError::Export { .. }));
    }
}
