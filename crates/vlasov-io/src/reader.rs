//! Reading frame files and time series back.
//!
//! [`SeriesReader`] streams samples from any `Read` source. The free
//! functions open files by path and load them whole.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::codec::{decode_field, decode_sample, decode_series_header};
use crate::error::IoError;
use crate::types::{FieldFrame, Series, SeriesSample};

/// Streams samples from a `.vser` byte stream.
///
/// The header is read and validated on construction.
pub struct SeriesReader<R: Read> {
    reader: R,
    quantity: String,
    width: u32,
    samples_read: u64,
}

impl<R: Read> SeriesReader<R> {
    /// Open a series stream, reading its header.
    pub fn open(mut reader: R) -> Result<Self, IoError> {
        let (quantity, width) = decode_series_header(&mut reader)?;
        Ok(Self {
            reader,
            quantity,
            width,
            samples_read: 0,
        })
    }

    /// Series name from the header.
    pub fn quantity(&self) -> &str {
        &self.quantity
    }

    /// Values per sample.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Next sample, or `None` at the end of the stream.
    pub fn next_sample(&mut self) -> Result<Option<SeriesSample>, IoError> {
        let sample = decode_sample(&mut self.reader, self.width)?;
        if sample.is_some() {
            self.samples_read += 1;
        }
        Ok(sample)
    }

    /// Samples read so far.
    pub fn samples_read(&self) -> u64 {
        self.samples_read
    }

    /// Drain the remaining samples into a [`Series`].
    pub fn into_series(mut self) -> Result<Series, IoError> {
        let mut samples = Vec::new();
        while let Some(sample) = self.next_sample()? {
            samples.push(sample);
        }
        Ok(Series {
            quantity: self.quantity,
            width: self.width,
            samples,
        })
    }
}

/// Load one `.vfld` file.
pub fn read_field_file(path: impl AsRef<Path>) -> Result<FieldFrame, IoError> {
    let mut reader = BufReader::new(File::open(path)?);
    decode_field(&mut reader)
}

/// Load a whole `.vser` file.
pub fn read_series(path: impl AsRef<Path>) -> Result<Series, IoError> {
    SeriesReader::open(BufReader::new(File::open(path)?))?.into_series()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{encode_sample, encode_series_header};
    use vlasov_core::FrameIndex;

    fn energy_stream() -> Vec<u8> {
        let mut buf = Vec::new();
        encode_series_header(&mut buf, "field_energy", 2).unwrap();
        for i in 0..4u32 {
            let t = f64::from(i) * 0.25;
            encode_sample(&mut buf, FrameIndex(i), t, &[t, 2.0 * t]).unwrap();
        }
        buf
    }

    #[test]
    fn streams_samples_in_order() {
        let buf = energy_stream();
        let mut reader = SeriesReader::open(buf.as_slice()).unwrap();
        assert_eq!(reader.quantity(), "field_energy");
        assert_eq!(reader.width(), 2);

        let first = reader.next_sample().unwrap().unwrap();
        assert_eq!(first.frame, FrameIndex(0));
        assert_eq!(reader.samples_read(), 1);

        let series = reader.into_series().unwrap();
        assert_eq!(series.samples.len(), 3);
        assert_eq!(series.times(), vec![0.25, 0.5, 0.75]);
        assert_eq!(series.column(1), vec![0.5, 1.0, 1.5]);
    }

    #[test]
    fn trailing_garbage_is_reported() {
        let mut buf = energy_stream();
        buf.extend_from_slice(&[1, 0, 0, 0, 9]);
        let err = SeriesReader::open(buf.as_slice())
            .unwrap()
            .into_series()
            .unwrap_err();
        assert!(matches!(err, IoError::Io(_) | IoError::Malformed { .. }));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("em_0.vfld");
        assert!(matches!(read_field_file(&path), Err(IoError::Io(_))));
        assert!(matches!(read_series(dir.path().join("energy.vser")), Err(IoError::Io(_))));
    }
}
