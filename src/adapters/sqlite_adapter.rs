//! SQLite listing store and banded-row export.

use crate::domain::band::BandedListing;
use crate::domain::error::PricebandError;
use crate::domain::listing::{Listing, OfferType};
use crate::ports::band_export_port::BandExportPort;
use crate::ports::config_port::ConfigPort;
use crate::ports::listing_port::{ListingPort, ListingSummary, DEFAULT_MAX_AGE_DAYS};
use chrono::NaiveDate;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;

const DATE_FORMAT: &str = "%Y-%m-%d";

fn unavailable(e: r2d2::Error) -> PricebandError {
    PricebandError::StoreUnavailable {
        reason: e.to_string(),
    }
}

fn query_error(e: rusqlite::Error) -> PricebandError {
    PricebandError::StoreQuery {
        reason: e.to_string(),
    }
}

fn parse_date(idx: usize, value: Option<String>) -> rusqlite::Result<Option<NaiveDate>> {
    value
        .map(|s| {
            NaiveDate::parse_from_str(&s, DATE_FORMAT).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
            })
        })
        .transpose()
}

pub struct SqliteListingStore {
    pool: Pool<SqliteConnectionManager>,
    max_age_days: Option<u32>,
    as_of: Option<NaiveDate>,
}

impl SqliteListingStore {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, PricebandError> {
        let db_path =
            config
                .get_string("sqlite", "path")
                .ok_or_else(|| PricebandError::ConfigMissing {
                    section: "sqlite".into(),
                    key: "path".into(),
                })?;

        let pool_size = config.get_int("sqlite", "pool_size", 4).max(1) as u32;
        let max_age = config.get_int("store", "max_age_days", DEFAULT_MAX_AGE_DAYS).max(0) as u32;

        let manager = SqliteConnectionManager::file(&db_path);
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(unavailable)?;

        Ok(Self {
            pool,
            max_age_days: None,
            as_of: None,
        }
        .with_max_age(max_age))
    }

    pub fn in_memory() -> Result<Self, PricebandError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(unavailable)?;

        Ok(Self {
            pool,
            max_age_days: None,
            as_of: None,
        })
    }

    /// Zero disables the limit.
    pub fn with_max_age(mut self, days: u32) -> Self {
        self.max_age_days = (days > 0).then_some(days);
        self
    }

    pub fn as_of(mut self, date: NaiveDate) -> Self {
        self.as_of = Some(date);
        self
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, PricebandError> {
        self.pool.get().map_err(unavailable)
    }

    pub fn initialize_schema(&self) -> Result<(), PricebandError> {
        let conn = self.conn()?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS listings (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                offer TEXT NOT NULL,
                property_type TEXT NOT NULL,
                neighborhood TEXT NOT NULL,
                city TEXT NOT NULL,
                postal_code TEXT,
                block TEXT,
                usable_area REAL NOT NULL,
                nominal_price REAL NOT NULL,
                price_per_area REAL,
                bedrooms INTEGER,
                parking_spaces INTEGER,
                latitude REAL,
                longitude REAL,
                collected_at TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_listings_offer ON listings(offer);
            CREATE INDEX IF NOT EXISTS idx_listings_collected ON listings(collected_at);
            CREATE TABLE IF NOT EXISTS banded_listings (
                id TEXT NOT NULL,
                offer TEXT NOT NULL,
                band INTEGER NOT NULL,
                price_per_area REAL NOT NULL,
                nominal_price REAL NOT NULL,
                usable_area REAL NOT NULL,
                latitude REAL,
                longitude REAL,
                PRIMARY KEY (offer, id)
            );",
        )
        .map_err(query_error)?;
        Ok(())
    }

    /// Inserts or replaces by id, all in one transaction.
    pub fn insert_listings(&self, listings: &[Listing]) -> Result<usize, PricebandError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_error)?;

        for l in listings {
            tx.execute(
                "INSERT OR REPLACE INTO listings (id, offer, property_type, neighborhood, city,
                     postal_code, block, usable_area, nominal_price, price_per_area, bedrooms,
                     parking_spaces, latitude, longitude, collected_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
                params![
                    l.id,
                    l.offer.as_str(),
                    l.property_type,
                    l.neighborhood,
                    l.city,
                    l.postal_code,
                    l.block,
                    l.usable_area,
                    l.nominal_price,
                    l.price_per_area,
                    l.bedrooms,
                    l.parking_spaces,
                    l.latitude,
                    l.longitude,
                    l.collected_at.map(|d| d.format(DATE_FORMAT).to_string()),
                ],
            )
            .map_err(query_error)?;
        }

        tx.commit().map_err(query_error)?;
        Ok(listings.len())
    }

    /// Banded rows last exported for one offer type, by band then id.
    pub fn exported(&self, offer: OfferType) -> Result<Vec<BandedListing>, PricebandError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, band, price_per_area, nominal_price, usable_area, latitude, longitude
                 FROM banded_listings WHERE offer = ?1 ORDER BY band, id",
            )
            .map_err(query_error)?;

        let rows = stmt
            .query_map(params![offer.as_str()], |row| {
                Ok(BandedListing {
                    id: row.get(0)?,
                    offer,
                    band: row.get::<_, i64>(1)? as usize,
                    price_per_area: row.get(2)?,
                    nominal_price: row.get(3)?,
                    usable_area: row.get(4)?,
                    latitude: row.get(5)?,
                    longitude: row.get(6)?,
                })
            })
            .map_err(query_error)?;

        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(query_error)
    }

    fn cutoff(&self) -> Option<String> {
        self.max_age_days.map(|days| {
            let as_of = self.as_of.unwrap_or_else(|| chrono::Local::now().date_naive());
            (as_of - chrono::Duration::days(i64::from(days)))
                .format(DATE_FORMAT)
                .to_string()
        })
    }
}

impl ListingPort for SqliteListingStore {
    fn fetch_listings(&self) -> Result<Vec<Listing>, PricebandError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, offer, property_type, neighborhood, city, postal_code, block,
                        usable_area, nominal_price, price_per_area, bedrooms, parking_spaces,
                        latitude, longitude, collected_at
                 FROM listings
                 WHERE ?1 IS NULL OR collected_at IS NULL OR collected_at >= ?1
                 ORDER BY id",
            )
            .map_err(query_error)?;

        let rows = stmt
            .query_map(params![self.cutoff()], |row| {
                let offer: String = row.get(1)?;
                let offer = offer.parse::<OfferType>().map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, e.into())
                })?;
                Ok(Listing {
                    id: row.get(0)?,
                    offer,
                    property_type: row.get(2)?,
                    neighborhood: row.get(3)?,
                    city: row.get(4)?,
                    postal_code: row.get(5)?,
                    block: row.get(6)?,
                    usable_area: row.get(7)?,
                    nominal_price: row.get(8)?,
                    price_per_area: row.get(9)?,
                    bedrooms: row.get(10)?,
                    parking_spaces: row.get(11)?,
                    latitude: row.get(12)?,
                    longitude: row.get(13)?,
                    collected_at: parse_date(14, row.get(14)?)?,
                })
            })
            .map_err(query_error)?;

        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(query_error)
    }

    /// Latest collection date, row count and highest write sequence.
    /// Replacing a row gives it a fresh sequence number, so rewrites change
    /// the token too.
    fn snapshot_token(&self) -> Result<String, PricebandError> {
        let conn = self.conn()?;
        let (max_date, count, max_seq): (Option<String>, i64, Option<i64>) = conn
            .query_row(
                "SELECT MAX(collected_at), COUNT(*), MAX(seq) FROM listings",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .map_err(query_error)?;
        Ok(format!(
            "{}:{count}:{}:{}",
            max_date.unwrap_or_default(),
            max_seq.unwrap_or(0),
            self.cutoff().unwrap_or_default()
        ))
    }

    fn summary(&self) -> Result<ListingSummary, PricebandError> {
        let conn = self.conn()?;
        let cutoff = self.cutoff();
        let (sale, rental, first, last): (i64, i64, Option<String>, Option<String>) = conn
            .query_row(
                "SELECT COALESCE(SUM(offer = 'sale'), 0), COALESCE(SUM(offer = 'rental'), 0),
                        MIN(collected_at), MAX(collected_at)
                 FROM listings
                 WHERE ?1 IS NULL OR collected_at IS NULL OR collected_at >= ?1",
                params![cutoff],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .map_err(query_error)?;

        Ok(ListingSummary {
            sale: sale as usize,
            rental: rental as usize,
            first_collected: parse_date(2, first).map_err(query_error)?,
            last_collected: parse_date(3, last).map_err(query_error)?,
        })
    }
}

impl BandExportPort for SqliteListingStore {
    /// Delete and reinsert inside one transaction; readers see the old set
    /// or the new one.
    fn export(&self, offer: OfferType, rows: &[BandedListing]) -> Result<(), PricebandError> {
        let export_error = |e: rusqlite::Error| PricebandError::Export {
            reason: e.to_string(),
        };

        let mut conn = self.pool.get().map_err(|e| PricebandError::Export {
            reason: e.to_string(),
        })?;
        let tx = conn.transaction().map_err(export_error)?;

        tx.execute("DELETE FROM banded_listings WHERE offer = ?1", params![offer.as_str()])
            .map_err(export_error)?;

        for r in rows {
            tx.execute(
                "INSERT OR REPLACE INTO banded_listings (id, offer, band, price_per_area,
                     nominal_price, usable_area, latitude, longitude)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    r.id,
                    offer.as_str(),
                    r.band as i64,
                    r.price_per_area,
                    r.nominal_price,
                    r.usable_area,
                    r.latitude,
                    r.longitude,
                ],
            )
            .map_err(export_error)?;
        }

        tx.commit().map_err(export_error)?;
        tracing::debug!(offer = %offer, rows = rows.len(), "exported banded listings");
        Ok(())
    }
}
