//! # Store Reader
//!
//! The read side of the store, used by the web layer. Reads take no lock: a
//! request racing the polling loop may see a store mid-append or just
//! truncated. Turn on `atomicPublish` if that matters.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::csv_rows::parse_records;
use super::DELIMITER;
use crate::errors::IngestError;

/// What a display request sees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreView {
    /// The store has never been created.
    Absent,
    /// The store exists. Both fields are empty right after a reset.
    Present {
        /// First record of the file.
        header: Vec<String>,
        /// Every following record.
        rows: Vec<Vec<String>>,
    },
}

impl StoreView {
    /// Number of data rows, zero when absent.
    pub fn row_count(&self) -> usize {
        match self {
            Self::Absent => 0,
            Self::Present { rows, .. } => rows.len(),
        }
    }
}

/// Read-only handle on the store file.
#[derive(Debug, Clone)]
pub struct StoreReader {
    path: PathBuf,
}

impl StoreReader {
    /// Creates a reader for the store at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the store.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name offered to downloads.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "data.csv".to_string())
    }

    /// Parses the current store for display. Invalid UTF-8 is replaced
    /// rather than rejected; text that does not parse as CSV is an error.
    pub fn view(&self) -> Result<StoreView, IngestError> {
        let Some(raw) = self.raw()? else {
            return Ok(StoreView::Absent);
        };

        let text = String::from_utf8_lossy(&raw);
        let mut records = parse_records(&text, DELIMITER)?.into_iter();
        let header = records.next().unwrap_or_default();
        Ok(StoreView::Present {
            header,
            rows: records.collect(),
        })
    }

    /// Raw store bytes for download, `None` if the store has never been created.
    pub fn raw(&self) -> Result<Option<Vec<u8>>, IngestError> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(IngestError::StoreIo {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn absent_and_empty_are_distinct() {
        let dir = tempdir().unwrap();
        let reader = StoreReader::new(dir.path().join("data.csv"));

        assert_eq!(reader.view().unwrap(), StoreView::Absent);
        assert_eq!(reader.raw().unwrap(), None);

        fs::write(reader.path(), "").unwrap();
        assert_eq!(
            reader.view().unwrap(),
            StoreView::Present {
                header: vec![],
                rows: vec![]
            }
        );
        assert_eq!(reader.raw().unwrap(), Some(Vec::new()));
    }

    #[test]
    fn splits_header_from_rows() {
        let dir = tempdir().unwrap();
        let reader = StoreReader::new(dir.path().join("data.csv"));
        fs::write(reader.path(), "a,b\n1,2\n3,4\n").unwrap();

        let view = reader.view().unwrap();
        assert_eq!(view.row_count(), 2);
        match view {
            StoreView::Present { header, rows } => {
                assert_eq!(header, vec!["a", "b"]);
                assert_eq!(rows[1], vec!["3", "4"]);
            }
            StoreView::Absent => panic!("store should be present"),
        }
    }

    #[test]
    fn download_name_is_the_store_file_name() {
        let reader = StoreReader::new("/var/lib/relay/nysm_latest_data.csv");
        assert_eq!(reader.file_name(), "nysm_latest_data.csv");
    }
}
