//! Decoded frame and series records.

use vlasov_core::{Field, FrameIndex};

/// Kind tag written after the magic and version bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordKind {
    /// One field at one frame (`.vfld`).
    Field,
    /// A scalar time series (`.vser`).
    Series,
}

impl RecordKind {
    /// On-disk tag.
    pub fn tag(self) -> u8 {
        match self {
            Self::Field => 1,
            Self::Series => 2,
        }
    }

    /// Human-readable name used in errors.
    pub fn label(self) -> &'static str {
        match self {
            Self::Field => "field",
            Self::Series => "series",
        }
    }
}

/// One field as stored in a `.vfld` file.
///
/// The field's name is the persisted quantity name.
#[derive(Clone, Debug)]
pub struct FieldFrame {
    /// Frame index.
    pub frame: FrameIndex,
    /// Simulation time of the frame.
    pub time: f64,
    /// Shape and contents, ghost cells included.
    pub field: Field,
}

/// One sample of a scalar time series.
#[derive(Clone, Debug, PartialEq)]
pub struct SeriesSample {
    /// Frame the sample was taken at.
    pub frame: FrameIndex,
    /// Simulation time of the sample.
    pub time: f64,
    /// One value per column.
    pub values: Vec<f64>,
}

/// A whole `.vser` file.
#[derive(Clone, Debug, PartialEq)]
pub struct Series {
    /// Series name.
    pub quantity: String,
    /// Values per sample.
    pub width: u32,
    /// Samples in append order.
    pub samples: Vec<SeriesSample>,
}

impl Series {
    /// Sample times in order.
    pub fn times(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.time).collect()
    }

    /// Column `index` across all samples. Empty if out of range.
    pub fn column(&self, index: usize) -> Vec<f64> {
        self.samples
            .iter()
            .filter_map(|s| s.values.get(index).copied())
            .collect()
    }
}
