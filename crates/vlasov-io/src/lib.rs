//! Frame persistence for the Vlasov-Maxwell driver.
//!
//! Fields are stored one file per quantity per frame; scalar diagnostics
//! are appended to one file per series. Both use a small little-endian
//! binary codec with no serde dependency.
//!
//! # Architecture
//!
//! - [`FileSink`] implements [`vlasov_engine::FrameSink`] over a directory
//! - [`read_field_file`] and [`read_series`] load files back
//! - [`SeriesReader`] streams samples from any `Read` source
//!
//! # Layout
//!
//! ```text
//! <dir>/<quantity>_<frame>.vfld
//! <dir>/<quantity>.vser
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod codec;
pub mod error;
pub mod reader;
pub mod types;
pub mod writer;

use std::path::{Path, PathBuf};

use vlasov_core::FrameIndex;

pub use error::IoError;
pub use reader::{read_field_file, read_series, SeriesReader};
pub use types::{FieldFrame, RecordKind, Series, SeriesSample};
pub use writer::{write_field_file, FileSink};

/// Magic bytes at the start of every file.
pub const MAGIC: [u8; 4] = *b"VLSV";

/// Current binary format version.
pub const FORMAT_VERSION: u8 = 1;

/// Extension of per-frame field files.
pub const FIELD_EXTENSION: &str = "vfld";

/// Extension of time-series files.
pub const SERIES_EXTENSION: &str = "vser";

/// Path of `quantity` at `frame` inside `dir`.
pub fn field_path(dir: &Path, quantity: &str, frame: FrameIndex) -> PathBuf {
    dir.join(format!("{quantity}_{}.{FIELD_EXTENSION}", frame.0))
}

/// Path of the series `quantity` inside `dir`.
pub fn series_path(dir: &Path, quantity: &str) -> PathBuf {
    dir.join(format!("{quantity}.{SERIES_EXTENSION}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names() {
        let dir = Path::new("out");
        assert_eq!(
            field_path(dir, "elc_M0", FrameIndex(12)),
            Path::new("out/elc_M0_12.vfld")
        );
        assert_eq!(
            series_path(dir, "field_energy"),
            Path::new("out/field_energy.vser")
        );
    }
}
