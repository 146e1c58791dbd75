//! CSV output sink with atomic tmp→rename

use std::ffi::OsString;
use std::fs::{self, File};
use std::io;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::ConvertError;

/// A flat output record with a fixed column header.
///
/// `HEADER` must list the columns in the same order the struct serializes
/// its fields.
pub trait TableRow: Serialize {
    const HEADER: &'static [&'static str];
}

/// `<path>.tmp`, the staging file next to the final output.
pub fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}

/// CSV writer that stages into a tmp file and renames on `finalize`.
///
/// Dropping the sink without finalizing removes the tmp file, so a failed
/// run never leaves a complete-looking output behind.
pub struct CsvSink<R: TableRow> {
    writer: Option<csv::Writer<File>>,
    tmp_path: PathBuf,
    final_path: PathBuf,
    row_count: usize,
    finalized: bool,
    _row: PhantomData<fn(&R)>,
}

impl<R: TableRow> std::fmt::Debug for CsvSink<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CsvSink")
            .field("final_path", &self.final_path)
            .field("row_count", &self.row_count)
            .finish_non_exhaustive()
    }
}

impl<R: TableRow> CsvSink<R> {
    /// Create the tmp file and write the header row.
    pub fn create(final_path: &Path) -> Result<Self, ConvertError> {
        let final_path = final_path.to_path_buf();
        let tmp_path = tmp_path_for(&final_path);
        let write_err = |source| ConvertError::Write {
            path: final_path.clone(),
            source,
        };

        if let Some(parent) = final_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_err)?;
        }

        // Stale tmp from an earlier crash
        if tmp_path.exists() {
            log::warn!("Removing stale tmp file: {}", tmp_path.display());
            fs::remove_file(&tmp_path).map_err(write_err)?;
        }

        let file = File::create(&tmp_path).map_err(write_err)?;
        let writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        let mut sink = Self {
            writer: Some(writer),
            tmp_path,
            final_path,
            row_count: 0,
            finalized: false,
            _row: PhantomData,
        };
        sink.write_header()?;
        Ok(sink)
    }

    fn write_header(&mut self) -> Result<(), ConvertError> {
        let result = match self.writer.as_mut() {
            Some(writer) => writer.write_record(R::HEADER).map_err(io::Error::from),
            None => Err(io::Error::other("sink already finalized")),
        };
        result.map_err(|e| self.write_err(e))
    }

    fn write_err(&self, source: io::Error) -> ConvertError {
        ConvertError::Write {
            path: self.final_path.clone(),
            source,
        }
    }

    /// Serialize one row.
    pub fn write_row(&mut self, row: &R) -> Result<(), ConvertError> {
        let Some(writer) = self.writer.as_mut() else {
            return Err(self.write_err(io::Error::other("sink already finalized")));
        };
        if let Err(e) = writer.serialize(row) {
            return Err(self.write_err(e.into()));
        }
        self.row_count += 1;
        Ok(())
    }

    /// Flush, then atomically rename tmp → final. Returns rows written.
    pub fn finalize(mut self) -> Result<usize, ConvertError> {
        let Some(writer) = self.writer.take() else {
            return Err(self.write_err(io::Error::other("sink already finalized")));
        };
        let file = writer
            .into_inner()
            .map_err(|e| self.write_err(e.into_error()))?;
        file.sync_all().map_err(|e| self.write_err(e))?;
        drop(file);

        fs::rename(&self.tmp_path, &self.final_path).map_err(|e| self.write_err(e))?;
        self.finalized = true;
        Ok(self.row_count)
    }
}

impl<R: TableRow> Drop for CsvSink<R> {
    fn drop(&mut self) {
        if !self.finalized && self.tmp_path.exists() {
            drop(self.writer.take());
            if let Err(e) = fs::remove_file(&self.tmp_path) {
                log::warn!("Failed to remove {}: {e}", self.tmp_path.display());
            }
        }
    }
}
