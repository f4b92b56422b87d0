//! Binary encode/decode for frame and series files.
//!
//! All integers are little-endian. Strings are length-prefixed with a
//! `u32` length. Every file starts with `MAGIC`, `FORMAT_VERSION` and a
//! [`RecordKind`] tag:
//!
//! ```text
//! .vfld  [header] [quantity] [frame u32] [time f64]
//!        [ndim u8] [extents u32; ndim] [ghost u32; ndim] [components u32]
//!        [len u64] [data f64; len]
//! .vser  [header] [quantity] [width u32]
//!        ([frame u32] [time f64] [values f64; width])*
//! ```

use std::io::{ErrorKind, Read, Write};

use vlasov_core::{Field, FieldShape, FrameIndex};

use crate::error::IoError;
use crate::types::{FieldFrame, RecordKind, SeriesSample};
use crate::{FORMAT_VERSION, MAGIC};

/// Largest dimensionality accepted when decoding.
pub const MAX_NDIM: u8 = 8;

// ── Primitive writers ───────────────────────────────────────────

/// Write a single byte.
pub fn write_u8(w: &mut dyn Write, v: u8) -> Result<(), IoError> {
    w.write_all(&[v])?;
    Ok(())
}

/// Write a little-endian u32.
pub fn write_u32_le(w: &mut dyn Write, v: u32) -> Result<(), IoError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

/// Write a little-endian u64.
pub fn write_u64_le(w: &mut dyn Write, v: u64) -> Result<(), IoError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

/// Write a little-endian f64.
pub fn write_f64_le(w: &mut dyn Write, v: f64) -> Result<(), IoError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

/// Write a length-prefixed UTF-8 string (u32 length + bytes).
pub fn write_length_prefixed_str(w: &mut dyn Write, s: &str) -> Result<(), IoError> {
    let len = u32::try_from(s.len()).map_err(|_| IoError::Malformed {
        detail: format!("string of {} bytes is too long", s.len()),
    })?;
    write_u32_le(w, len)?;
    w.write_all(s.as_bytes())?;
    Ok(())
}

fn write_f64_slice(w: &mut dyn Write, values: &[f64]) -> Result<(), IoError> {
    let mut buf = Vec::with_capacity(values.len() * 8);
    for v in values {
        buf.extend_from_slice(&v.to_le_bytes());
    }
    w.write_all(&buf)?;
    Ok(())
}

// ── Primitive readers ───────────────────────────────────────────

/// Read a single byte.
pub fn read_u8(r: &mut dyn Read) -> Result<u8, IoError> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf)?;
    Ok(buf[0])
}

/// Read a little-endian u32.
pub fn read_u32_le(r: &mut dyn Read) -> Result<u32, IoError> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

/// Read a little-endian u64.
pub fn read_u64_le(r: &mut dyn Read) -> Result<u64, IoError> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

/// Read a little-endian f64.
pub fn read_f64_le(r: &mut dyn Read) -> Result<f64, IoError> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(f64::from_le_bytes(buf))
}

/// Read a length-prefixed UTF-8 string.
pub fn read_length_prefixed_str(r: &mut dyn Read) -> Result<String, IoError> {
    let len = read_u32_le(r)? as usize;
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)?;
    String::from_utf8(buf).map_err(|e| IoError::Malformed {
        detail: format!("invalid UTF-8 string: {e}"),
    })
}

fn read_f64_vec(r: &mut dyn Read, len: usize) -> Result<Vec<f64>, IoError> {
    let mut bytes = vec![0u8; len * 8];
    r.read_exact(&mut bytes)?;
    Ok(bytes
        .chunks_exact(8)
        .map(|c| {
            let mut b = [0u8; 8];
            b.copy_from_slice(c);
            f64::from_le_bytes(b)
        })
        .collect())
}

/// Read a u32, or `None` if the stream ends cleanly before its first byte.
fn read_u32_or_eof(r: &mut dyn Read) -> Result<Option<u32>, IoError> {
    let mut buf = [0u8; 4];
    loop {
        match r.read(&mut buf[..1]) {
            Ok(0) => return Ok(None),
            Ok(_) => break,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    r.read_exact(&mut buf[1..]).map_err(|e| match e.kind() {
        ErrorKind::UnexpectedEof => IoError::Malformed {
            detail: "truncated sample".into(),
        },
        _ => e.into(),
    })?;
    Ok(Some(u32::from_le_bytes(buf)))
}

// ── Header ──────────────────────────────────────────────────────

/// Write magic, version and kind tag.
pub fn encode_header(w: &mut dyn Write, kind: RecordKind) -> Result<(), IoError> {
    w.write_all(&MAGIC)?;
    write_u8(w, FORMAT_VERSION)?;
    write_u8(w, kind.tag())
}

/// Read and check magic, version and kind tag.
pub fn decode_header(r: &mut dyn Read, kind: RecordKind) -> Result<(), IoError> {
    let mut magic = [0u8; 4];
    r.read_exact(&mut magic)?;
    if magic != MAGIC {
        return Err(IoError::InvalidMagic);
    }
    let version = read_u8(r)?;
    if version != FORMAT_VERSION {
        return Err(IoError::UnsupportedVersion { found: version });
    }
    let tag = read_u8(r)?;
    if tag != kind.tag() {
        return Err(IoError::WrongKind {
            expected: kind.label(),
            found: tag,
        });
    }
    Ok(())
}

// ── Field records ───────────────────────────────────────────────

/// Encode a whole `.vfld` file.
pub fn encode_field(
    w: &mut dyn Write,
    quantity: &str,
    frame: FrameIndex,
    time: f64,
    field: &Field,
) -> Result<(), IoError> {
    encode_header(w, RecordKind::Field)?;
    write_length_prefixed_str(w, quantity)?;
    write_u32_le(w, frame.0)?;
    write_f64_le(w, time)?;

    let shape = field.shape();
    let ndim = u8::try_from(shape.ndim())
        .ok()
        .filter(|n| *n <= MAX_NDIM)
        .ok_or_else(|| IoError::Malformed {
            detail: format!("{}-dimensional field cannot be stored", shape.ndim()),
        })?;
    write_u8(w, ndim)?;
    for &e in shape.extents() {
        write_u32_le(w, e)?;
    }
    for &g in shape.ghost() {
        write_u32_le(w, g)?;
    }
    write_u32_le(w, shape.components())?;
    write_u64_le(w, field.as_slice().len() as u64)?;
    write_f64_slice(w, field.as_slice())
}

/// Decode a whole `.vfld` file.
pub fn decode_field(r: &mut dyn Read) -> Result<FieldFrame, IoError> {
    decode_header(r, RecordKind::Field)?;
    let quantity = read_length_prefixed_str(r)?;
    let frame = FrameIndex(read_u32_le(r)?);
    let time = read_f64_le(r)?;

    let ndim = read_u8(r)?;
    if ndim == 0 || ndim > MAX_NDIM {
        return Err(IoError::Malformed {
            detail: format!("dimensionality {ndim} out of range"),
        });
    }
    let extents = (0..ndim)
        .map(|_| read_u32_le(r))
        .collect::<Result<Vec<_>, _>>()?;
    let ghost = (0..ndim)
        .map(|_| read_u32_le(r))
        .collect::<Result<Vec<_>, _>>()?;
    let components = read_u32_le(r)?;
    let shape = FieldShape::new(&extents, &ghost, components)?;

    let len = read_u64_le(r)?;
    if usize::try_from(len).ok() != Some(shape.len()) {
        return Err(IoError::Malformed {
            detail: format!("{len} values recorded for shape {shape}"),
        });
    }
    let data = read_f64_vec(r, shape.len())?;
    let field = Field::from_data(quantity, shape, data)?;
    Ok(FieldFrame { frame, time, field })
}

// ── Series records ──────────────────────────────────────────────

/// Encode the `.vser` header.
pub fn encode_series_header(w: &mut dyn Write, quantity: &str, width: u32) -> Result<(), IoError> {
    encode_header(w, RecordKind::Series)?;
    write_length_prefixed_str(w, quantity)?;
    write_u32_le(w, width)
}

/// Decode the `.vser` header, returning `(quantity, width)`.
pub fn decode_series_header(r: &mut dyn Read) -> Result<(String, u32), IoError> {
    decode_header(r, RecordKind::Series)?;
    let quantity = read_length_prefixed_str(r)?;
    let width = read_u32_le(r)?;
    Ok((quantity, width))
}

/// Encode one sample.
pub fn encode_sample(
    w: &mut dyn Write,
    frame: FrameIndex,
    time: f64,
    values: &[f64],
) -> Result<(), IoError> {
    write_u32_le(w, frame.0)?;
    write_f64_le(w, time)?;
    write_f64_slice(w, values)
}

/// Decode one sample of `width` values, or `None` at a clean end of stream.
pub fn decode_sample(r: &mut dyn Read, width: u32) -> Result<Option<SeriesSample>, IoError> {
    let Some(frame) = read_u32_or_eof(r)? else {
        return Ok(None);
    };
    let time = read_f64_le(r)?;
    let values = read_f64_vec(r, width as usize)?;
    Ok(Some(SeriesSample {
        frame: FrameIndex(frame),
        time,
        values,
    }))
}
