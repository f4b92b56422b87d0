//! Writing frames to a directory.
//!
//! [`FileSink`] is the [`FrameSink`] used by real runs: one `.vfld` file
//! per field per frame, one append-only `.vser` file per series.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use tracing::debug;
use vlasov_core::{Field, FrameIndex};
use vlasov_engine::{DiagnosticsError, FrameSink};

use crate::codec::{encode_field, encode_sample, encode_series_header};
use crate::error::IoError;
use crate::{field_path, series_path};

/// Write one field to `path`, replacing any existing file.
pub fn write_field_file(
    path: impl AsRef<Path>,
    quantity: &str,
    frame: FrameIndex,
    time: f64,
    field: &Field,
) -> Result<(), IoError> {
    let mut writer = BufWriter::new(File::create(path)?);
    encode_field(&mut writer, quantity, frame, time, field)?;
    writer.flush()?;
    Ok(())
}

struct SeriesFile {
    writer: BufWriter<File>,
    width: u32,
}

/// Persists frames under a single output directory.
///
/// Series files are created (and truncated) the first time a quantity is
/// appended; every later sample must have the same width.
pub struct FileSink {
    dir: PathBuf,
    series: IndexMap<String, SeriesFile>,
    fields_written: u64,
}

impl FileSink {
    /// A sink writing into `dir`, created if missing.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, IoError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            series: IndexMap::new(),
            fields_written: 0,
        })
    }

    /// Output directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Field files written so far.
    pub fn fields_written(&self) -> u64 {
        self.fields_written
    }

    /// Store one field of one frame.
    pub fn store_field(
        &mut self,
        quantity: &str,
        frame: FrameIndex,
        time: f64,
        field: &Field,
    ) -> Result<PathBuf, IoError> {
        let path = field_path(&self.dir, quantity, frame);
        write_field_file(&path, quantity, frame, time, field)?;
        self.fields_written += 1;
        debug!(quantity, %frame, path = %path.display(), "field written");
        Ok(path)
    }

    /// Append one sample to the series `quantity`.
    pub fn store_sample(
        &mut self,
        quantity: &str,
        frame: FrameIndex,
        time: f64,
        values: &[f64],
    ) -> Result<(), IoError> {
        if !self.series.contains_key(quantity) {
            let width = u32::try_from(values.len()).map_err(|_| IoError::Malformed {
                detail: format!("{} values do not fit a series sample", values.len()),
            })?;
            let mut writer = BufWriter::new(File::create(series_path(&self.dir, quantity))?);
            encode_series_header(&mut writer, quantity, width)?;
            self.series
                .insert(quantity.to_string(), SeriesFile { writer, width });
        }
        let Some(file) = self.series.get_mut(quantity) else {
            return Err(IoError::Malformed {
                detail: format!("series '{quantity}' was not opened"),
            });
        };
        if values.len() != file.width as usize {
            return Err(IoError::WidthMismatch {
                quantity: quantity.to_string(),
                expected: file.width,
                found: values.len(),
            });
        }
        encode_sample(&mut file.writer, frame, time, values)
    }

    /// Flush every open series file.
    pub fn flush_all(&mut self) -> Result<(), IoError> {
        for file in self.series.values_mut() {
            file.writer.flush()?;
        }
        Ok(())
    }
}

fn sink_error(quantity: &str, err: IoError) -> DiagnosticsError {
    DiagnosticsError::Sink {
        quantity: quantity.to_string(),
        source: Box::new(err),
    }
}

impl FrameSink for FileSink {
    fn write_field(
        &mut self,
        quantity: &str,
        frame: FrameIndex,
        time: f64,
        field: &Field,
    ) -> Result<(), DiagnosticsError> {
        self.store_field(quantity, frame, time, field)
            .map(|_| ())
            .map_err(|e| sink_error(quantity, e))
    }

    fn append_series(
        &mut self,
        quantity: &str,
        frame: FrameIndex,
        time: f64,
        values: &[f64],
    ) -> Result<(), DiagnosticsError> {
        self.store_sample(quantity, frame, time, values)
            .map_err(|e| sink_error(quantity, e))
    }

    fn flush(&mut self) -> Result<(), DiagnosticsError> {
        self.flush_all().map_err(|e| sink_error("*", e))
    }
}

impl std::fmt::Debug for FileSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSink")
            .field("dir", &self.dir)
            .field("series", &self.series.keys().collect::<Vec<_>>())
            .field("fields_written", &self.fields_written)
            .finish()
    }
}
