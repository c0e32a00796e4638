//! # Snapshot Merger
//!
//! Folds one fetched snapshot into the store. A fresh store (absent, or
//! emptied by the daily reset) receives the header and all rows; an existing
//! one receives the data rows only. Nothing is deduplicated, so merging the
//! same snapshot twice stores its rows twice.

use std::fs::{self, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use log::debug;
use tempfile::NamedTempFile;

use super::csv_rows::{parse_records, write_record};
use super::DELIMITER;
use crate::errors::IngestError;

/// How the merged rows reach the store file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOptions {
    /// Rewrite the whole store into a temp file and rename it over
    /// the store, so readers never see a half-written row. The store keeps
    /// its permissions; a new store gets the temp file's (0600 on unix).
    pub atomic_publish: bool,
}

/// What a merge did to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The store was absent or empty; header and rows were written.
    Created {
        /// Data rows written after the header.
        data_rows: usize,
    },
    /// Data rows were appended below the existing content.
    Appended {
        /// Data rows appended.
        data_rows: usize,
    },
}

impl MergeOutcome {
    /// Number of data rows written, header excluded.
    pub fn data_rows(&self) -> usize {
        match self {
            Self::Created { data_rows } | Self::Appended { data_rows } => *data_rows,
        }
    }
}

/// Merges `snapshot` into the store at `store_path`.
///
/// The snapshot must be UTF-8 delimited text whose first record is the
/// header. On any error the store is left as it was, except that an in-place
/// append interrupted mid-write may leave a partial last row.
pub fn merge(
    snapshot: &[u8],
    store_path: &Path,
    options: MergeOptions,
) -> Result<MergeOutcome, IngestError> {
    let text = std::str::from_utf8(snapshot)?;
    let mut records = parse_records(text, DELIMITER)?.into_iter();
    let header = records.next().ok_or(IngestError::EmptySnapshot)?;
    let rows: Vec<Vec<String>> = records.collect();

    let fresh = store_is_fresh(store_path)?;

    let mut chunk = Vec::with_capacity(snapshot.len());
    if fresh {
        write_record(&mut chunk, &header, DELIMITER).map_err(store_io(store_path))?;
    }
    for row in &rows {
        write_record(&mut chunk, row, DELIMITER).map_err(store_io(store_path))?;
    }

    ensure_parent_dir(store_path).map_err(store_io(store_path))?;
    if options.atomic_publish {
        publish_atomic(store_path, &chunk, fresh).map_err(store_io(store_path))?;
    } else {
        append_in_place(store_path, &chunk).map_err(store_io(store_path))?;
    }

    debug!(
        "Merged {} data rows into {} (fresh: {})",
        rows.len(),
        store_path.display(),
        fresh
    );

    let data_rows = rows.len();
    Ok(if fresh {
        MergeOutcome::Created { data_rows }
    } else {
        MergeOutcome::Appended { data_rows }
    })
}

/// A store that is missing or zero-length needs its header written.
fn store_is_fresh(store_path: &Path) -> Result<bool, IngestError> {
    match fs::metadata(store_path) {
        Ok(meta) => Ok(meta.len() == 0),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(true),
        Err(e) => Err(store_io(store_path)(e)),
    }
}

fn store_io(path: &Path) -> impl Fn(io::Error) -> IngestError + '_ {
    move |source| IngestError::StoreIo {
        path: path.to_path_buf(),
        source,
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn ensure_parent_dir(path: &Path) -> io::Result<()> {
    fs::create_dir_all(parent_dir(path))
}

fn append_in_place(store_path: &Path, chunk: &[u8]) -> io::Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(store_path)?;
    file.write_all(chunk)?;
    file.flush()
}

fn publish_atomic(store_path: &Path, chunk: &[u8], fresh: bool) -> io::Result<()> {
    let mut tmp = NamedTempFile::new_in(parent_dir(store_path))?;
    if !fresh {
        let mut current = Vec::new();
        fs::File::open(store_path)?.read_to_end(&mut current)?;
        tmp.write_all(&current)?;
    }
    match fs::metadata(store_path) {
        Ok(meta) => tmp.as_file().set_permissions(meta.permissions())?,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }
    tmp.write_all(chunk)?;
    tmp.flush()?;
    tmp.persist(store_path).map_err(|e| e.error)?;
    Ok(())
}
