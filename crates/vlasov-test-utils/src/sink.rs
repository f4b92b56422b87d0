//! In-memory [`FrameSink`] for inspecting frames in tests.

use std::sync::{Arc, Mutex, MutexGuard};

use vlasov_core::{Field, FrameIndex};
use vlasov_engine::{DiagnosticsError, FrameSink};

/// One `write_field` call.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldRecord {
    pub quantity: String,
    pub frame: FrameIndex,
    pub time: f64,
    pub data: Vec<f64>,
}

/// One `append_series` call.
#[derive(Clone, Debug, PartialEq)]
pub struct SeriesRecord {
    pub quantity: String,
    pub frame: FrameIndex,
    pub time: f64,
    pub values: Vec<f64>,
}

#[derive(Debug, Default)]
struct Recorded {
    fields: Vec<FieldRecord>,
    series: Vec<SeriesRecord>,
    flushes: usize,
}

/// Records everything written to it.
///
/// Clones share one store: hand one clone to the engine and keep another
/// to read back what was written.
#[derive(Clone, Debug, Default)]
pub struct MemorySink {
    inner: Arc<Mutex<Recorded>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Recorded> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Every field write, in order.
    pub fn fields(&self) -> Vec<FieldRecord> {
        self.lock().fields.clone()
    }

    /// Every series sample, in order.
    pub fn series(&self) -> Vec<SeriesRecord> {
        self.lock().series.clone()
    }

    /// Samples of one series, in order.
    pub fn series_of(&self, quantity: &str) -> Vec<SeriesRecord> {
        self.lock()
            .series
            .iter()
            .filter(|s| s.quantity == quantity)
            .cloned()
            .collect()
    }

    /// Distinct `(frame, time)` pairs in write order.
    pub fn frames(&self) -> Vec<(FrameIndex, f64)> {
        let guard = self.lock();
        let mut out: Vec<(FrameIndex, f64)> = Vec::new();
        let stamps = guard
            .fields
            .iter()
            .map(|f| (f.frame, f.time))
            .chain(guard.series.iter().map(|s| (s.frame, s.time)));
        for stamp in stamps {
            if !out.iter().any(|(frame, _)| *frame == stamp.0) {
                out.push(stamp);
            }
        }
        out.sort_by_key(|(frame, _)| *frame);
        out
    }

    /// Data written for `quantity` in `frame`.
    pub fn field(&self, quantity: &str, frame: FrameIndex) -> Option<Vec<f64>> {
        self.lock()
            .fields
            .iter()
            .find(|f| f.quantity == quantity && f.frame == frame)
            .map(|f| f.data.clone())
    }

    /// Number of `flush` calls.
    pub fn flushes(&self) -> usize {
        self.lock().flushes
    }
}

impl FrameSink for MemorySink {
    fn write_field(
        &mut self,
        quantity: &str,
        frame: FrameIndex,
        time: f64,
        field: &Field,
    ) -> Result<(), DiagnosticsError> {
        self.lock().fields.push(FieldRecord {
            quantity: quantity.to_string(),
            frame,
            time,
            data: field.as_slice().to_vec(),
        });
        Ok(())
    }

    fn append_series(
        &mut self,
        quantity: &str,
        frame: FrameIndex,
        time: f64,
        values: &[f64],
    ) -> Result<(), DiagnosticsError> {
        self.lock().series.push(SeriesRecord {
            quantity: quantity.to_string(),
            frame,
            time,
            values: values.to_vec(),
        });
        Ok(())
    }

    fn flush(&mut self) -> Result<(), DiagnosticsError> {
        self.lock().flushes += 1;
        Ok(())
    }
}
