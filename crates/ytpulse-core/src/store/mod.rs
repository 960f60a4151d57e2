//! Append-only snapshot storage.
//!
//! Two interchangeable backends implement [`SnapshotStore`]: a local CSV file
//! and a Google Sheets spreadsheet. The backend is picked once from settings.

mod csv_file;
mod google_auth;
mod sheets;

use std::path::PathBuf;
use thiserror::Error;

use crate::config::{ConfigError, Settings, StoreBackend};
use crate::snapshot::Snapshot;

pub use csv_file::CsvStore;
pub use google_auth::AuthorizedUser;
pub use sheets::SheetsStore;

/// Error type for snapshot storage
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing file does not exist yet
    #[error("store not found: {}; run a collection first", path.display())]
    Missing { path: PathBuf },

    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Remote request failed
    #[error("spreadsheet request failed: {0}")]
    Http(#[from] ureq::Error),

    #[error("credentials error: {message}")]
    Credentials { message: String },
}

/// Durable, append-only log of snapshots
pub trait SnapshotStore {
    /// Persist every row, writing the header first if the store is empty
    fn append_all(&mut self, rows: &[Snapshot]) -> Result<(), StoreError>;

    /// Every row ever appended, in insertion order
    fn read_all(&self) -> Result<Vec<Snapshot>, StoreError>;

    /// Human-readable location, for console output
    fn describe(&self) -> String;
}

/// Build the store selected by `settings.store.backend`
pub fn open_store(settings: &Settings) -> Result<Box<dyn SnapshotStore>, ConfigError> {
    match settings.store.backend {
        StoreBackend::Csv => Ok(Box::new(CsvStore::new(settings.store.csv_path.clone()))),
        StoreBackend::Sheets => {
            let sheet_id = settings
                .store
                .sheet_id
                .clone()
                .ok_or(ConfigError::MissingSheetId)?;
            let credentials = settings.store.credentials_source();
            Ok(Box::new(SheetsStore::new(sheet_id, credentials)))
        }
    }
}
