use std::borrow::Cow;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::{SnapshotStore, StoreError};
use crate::snapshot::{is_header, Snapshot, HEADER};

/// Snapshot log kept in a local CSV file
pub struct CsvStore {
    path: PathBuf,
}

impl CsvStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Encode rows, with the header first when `with_header` is set
    fn encode(rows: &[Snapshot], with_header: bool) -> Result<Vec<u8>, StoreError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        if with_header {
            writer.write_record(HEADER)?;
        }
        for row in rows {
            writer.write_record(row.to_record())?;
        }
        writer
            .into_inner()
            .map_err(|e| StoreError::Io(e.into_error()))
    }
}

/// Whether a non-empty file lacks a final newline
fn missing_final_newline(path: &Path) -> std::io::Result<bool> {
    let mut file = File::open(path)?;
    if file.metadata()?.len() == 0 {
        return Ok(false);
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}

impl SnapshotStore for CsvStore {
    fn append_all(&mut self, rows: &[Snapshot]) -> Result<(), StoreError> {
        if rows.is_empty() {
            return Ok(());
        }

        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)?;
            }
        }

        let needs_header = std::fs::metadata(&self.path)
            .map(|m| m.len() == 0)
            .unwrap_or(true);

        // Encode everything first so a single write hits the file
        let mut buf = Self::encode(rows, needs_header)?;
        if !needs_header && missing_final_newline(&self.path)? {
            buf.insert(0, b'\n');
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(&buf)?;
        file.flush()?;

        debug!("Appended {} row(s) to {:?}", rows.len(), self.path);
        Ok(())
    }

    fn read_all(&self) -> Result<Vec<Snapshot>, StoreError> {
        if !self.path.exists() {
            return Err(StoreError::Missing {
                path: self.path.clone(),
            });
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(&self.path)?;

        let mut rows = Vec::new();
        for (line, record) in reader.byte_records().enumerate() {
            let record = match record {
                Ok(record) => record,
                Err(e) if e.is_io_error() => return Err(e.into()),
                Err(e) => {
                    warn!("Skipping unreadable row {} in {:?}: {}", line + 1, self.path, e);
                    continue;
                }
            };
            let fields: Vec<Cow<str>> = record.iter().map(String::from_utf8_lossy).collect();
            if is_header(fields.as_slice()) {
                continue;
            }
            match Snapshot::from_record(fields.as_slice()) {
                Some(snapshot) => rows.push(snapshot),
                None => warn!("Skipping unreadable row {} in {:?}", line + 1, self.path),
            }
        }
        Ok(rows)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::Subscribers;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn snap(date: &str, name: &str, views: u64, subs: Subscribers, videos: u64) -> Snapshot {
        Snapshot {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            channel_name: name.to_string(),
            views: Some(views),
            subscribers: Some(subs),
            videos: Some(videos),
        }
    }

    #[test]
    fn test_read_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvStore::new(dir.path().join("none.csv"));
        assert!(matches!(store.read_all(), Err(StoreError::Missing { .. })));
    }

    #[test]
    fn test_append_then_read_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.csv");
        let mut store = CsvStore::new(&path);

        let first = vec![
            snap("2024-05-01", "Demo", 500, Subscribers::Count(10), 2),
            snap("2024-05-01", "Secretive, Inc.", 900, Subscribers::Hidden, 7),
        ];
        let second = vec![snap("2024-05-02", "Demo", 650, Subscribers::Count(12), 3)];
        store.append_all(&first).unwrap();
        store.append_all(&second).unwrap();

        let rows = store.read_all().unwrap();
        let expected: Vec<Snapshot> = first.into_iter().chain(second).collect();
        assert_eq!(rows, expected);

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.matches("Date,ChannelName").count(), 1);
        assert!(content.starts_with("Date,ChannelName,Views,Subscribers,Videos\n"));
        assert!(content.contains(",Hidden,"));
        assert!(content.contains("\"Secretive, Inc.\""));
    }

    #[test]
    fn test_append_nothing_does_not_create_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.csv");
        let mut store = CsvStore::new(&path);
        store.append_all(&[]).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_append_after_missing_final_newline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.csv");
        std::fs::write(
            &path,
            "Date,ChannelName,Views,Subscribers,Videos\n2024-05-01,Demo,1,1,1",
        )
        .unwrap();

        let mut store = CsvStore::new(&path);
        let added = snap("2024-05-02", "Demo", 2, Subscribers::Count(2), 2);
        store.append_all(std::slice::from_ref(&added)).unwrap();

        let rows = store.read_all().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], snap("2024-05-01", "Demo", 1, Subscribers::Count(1), 1));
        assert_eq!(rows[1], added);
    }

    #[test]
    fn test_read_survives_invalid_utf8() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.csv");
        std::fs::write(
            &path,
            b"Date,ChannelName,Views,Subscribers,Videos\n\
              2024-05-01,Demo,1,1,1\n\
              2024-05-02,\xFF\xFE,2,2,2\n",
        )
        .unwrap();

        let rows = CsvStore::new(&path).read_all().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].channel_name, "Demo");
        assert!(rows[1].channel_name.contains('\u{FFFD}'));
        assert_eq!(rows[1].views, Some(2));
    }

    #[test]
    fn test_read_tolerates_bad_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.csv");
        std::fs::write(
            &path,
            "Date,ChannelName,Views,Subscribers,Videos\n\
             2024-05-01,Demo,oops,10,2\n\
             not-a-date,Demo,1,1,1\n\
             2024-05-02,Demo,700,10\n",
        )
        .unwrap();

        let rows = CsvStore::new(&path).read_all().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].views, None);
        assert_eq!(rows[1].views, Some(700));
        assert_eq!(rows[1].videos, None);
    }
}
