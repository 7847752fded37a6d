//! Sample codec: fixed-width packing for numeric samples and a
//! newline-delimited encoding for text.
//!
//! Numeric samples are packed native-endian (IEEE-754 for floats, two's
//! complement for integers) with no header, so a record file is just the
//! concatenation of its packed samples in storage order.
//!
//! Text is encoded as a whole collection: elements are UTF-8 encoded and
//! joined by a single [`LINE_SEPARATOR`] byte. An element that itself
//! contains the separator comes back as several elements; this is a
//! format limitation, not something the codec tries to escape.

use crate::error::{PoolError, PoolResult};
use bytes::{Buf, BufMut, BytesMut};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use std::str::FromStr;

/// Separator between text elements on disk.
pub const LINE_SEPARATOR: u8 = b'\n';

/// Element type of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleType {
    /// 32-bit IEEE float, little-endian.
    Float32,
    /// 64-bit IEEE float, little-endian.
    Float64,
    /// 32-bit signed integer, little-endian.
    Int32,
    /// 64-bit signed integer, little-endian.
    Int64,
    /// UTF-8 strings, one per line on disk.
    Text,
}

impl SampleType {
    /// Packed width in bytes, `None` for text.
    #[must_use]
    pub fn width(self) -> Option<usize> {
        match self {
            SampleType::Float32 | SampleType::Int32 => Some(4),
            SampleType::Float64 | SampleType::Int64 => Some(8),
            SampleType::Text => None,
        }
    }

    /// Fixed-width types.
    #[must_use]
    pub fn is_numeric(self) -> bool {
        self.width().is_some()
    }

    /// Lowercase name, as accepted by `FromStr`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SampleType::Float32 => "float32",
            SampleType::Float64 => "float64",
            SampleType::Int32 => "int32",
            SampleType::Int64 => "int64",
            SampleType::Text => "text",
        }
    }
}

impl fmt::Display for SampleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SampleType {
    type Err = PoolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "float32" | "f32" => Ok(SampleType::Float32),
            "float64" | "f64" => Ok(SampleType::Float64),
            "int32" | "i32" => Ok(SampleType::Int32),
            "int64" | "i64" => Ok(SampleType::Int64),
            "text" | "str" => Ok(SampleType::Text),
            other => Err(PoolError::InvalidConfiguration(format!(
                "Unsupported sample type '{other}'. Must be one of: float32, float64, int32, int64, text"
            ))),
        }
    }
}

/// Width of a sample type in bytes (`None` for text).
#[must_use]
pub fn width(sample_type: SampleType) -> Option<usize> {
    sample_type.width()
}

/// A decoded, ordered collection of same-typed elements.
///
/// This is the unit that flows through the storage engine: whole payloads,
/// chunks produced by the readers and random-access slices are all `Samples`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "values", rename_all = "lowercase")]
pub enum Samples {
    /// `float32` elements.
    Float32(Vec<f32>),
    /// `float64` elements.
    Float64(Vec<f64>),
    /// `int32` elements.
    Int32(Vec<i32>),
    /// `int64` elements.
    Int64(Vec<i64>),
    /// `text` elements.
    Text(Vec<String>),
}

impl Samples {
    /// An empty collection of the given type.
    #[must_use]
    pub fn empty(sample_type: SampleType) -> Self {
        match sample_type {
            SampleType::Float32 => Samples::Float32(Vec::new()),
            SampleType::Float64 => Samples::Float64(Vec::new()),
            SampleType::Int32 => Samples::Int32(Vec::new()),
            SampleType::Int64 => Samples::Int64(Vec::new()),
            SampleType::Text => Samples::Text(Vec::new()),
        }
    }

    /// Element type of the collection.
    #[must_use]
    pub fn sample_type(&self) -> SampleType {
        match self {
            Samples::Float32(_) => SampleType::Float32,
            Samples::Float64(_) => SampleType::Float64,
            Samples::Int32(_) => SampleType::Int32,
            Samples::Int64(_) => SampleType::Int64,
            Samples::Text(_) => SampleType::Text,
        }
    }

    /// Number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Samples::Float32(v) => v.len(),
            Samples::Float64(v) => v.len(),
            Samples::Int32(v) => v.len(),
            Samples::Int64(v) => v.len(),
            Samples::Text(v) => v.len(),
        }
    }

    /// Whether the collection has no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the elements in `range`, clamped to the collection bounds.
    #[must_use]
    pub fn slice(&self, range: Range<usize>) -> Samples {
        let end = range.end.min(self.len());
        let start = range.start.min(end);
        match self {
            Samples::Float32(v) => Samples::Float32(v[start..end].to_vec()),
            Samples::Float64(v) => Samples::Float64(v[start..end].to_vec()),
            Samples::Int32(v) => Samples::Int32(v[start..end].to_vec()),
            Samples::Int64(v) => Samples::Int64(v[start..end].to_vec()),
            Samples::Text(v) => Samples::Text(v[start..end].to_vec()),
        }
    }

    /// Append `other` to `self`. Both must have the same sample type.
    pub fn append(&mut self, other: Samples) -> PoolResult<()> {
        match (self, other) {
            (Samples::Float32(a), Samples::Float32(b)) => a.extend(b),
            (Samples::Float64(a), Samples::Float64(b)) => a.extend(b),
            (Samples::Int32(a), Samples::Int32(b)) => a.extend(b),
            (Samples::Int64(a), Samples::Int64(b)) => a.extend(b),
            (Samples::Text(a), Samples::Text(b)) => a.extend(b),
            (this, other) => {
                return Err(PoolError::SampleTypeMismatch {
                    expected: this.sample_type(),
                    found: other.sample_type(),
                })
            }
        }
        Ok(())
    }

    /// Fail with a mismatch error unless this collection has `expected` type.
    pub fn ensure_type(&self, expected: SampleType) -> PoolResult<()> {
        let found = self.sample_type();
        if found == expected {
            Ok(())
        } else {
            Err(PoolError::SampleTypeMismatch { expected, found })
        }
    }

    /// Number of bytes `encode` would produce for this collection alone.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        match self {
            Samples::Text(v) => {
                let content: usize = v.iter().map(String::len).sum();
                content + v.len().saturating_sub(1)
            }
            other => other.len() * other.sample_type().width().unwrap_or(0),
        }
    }

    /// Numeric view as `f64`, for kinds whose payload is read back as numbers.
    #[must_use]
    pub fn to_f64_vec(&self) -> Option<Vec<f64>> {
        match self {
            Samples::Float32(v) => Some(v.iter().map(|&x| f64::from(x)).collect()),
            Samples::Float64(v) => Some(v.clone()),
            Samples::Int32(v) => Some(v.iter().map(|&x| f64::from(x)).collect()),
            Samples::Int64(v) => Some(v.iter().map(|&x| x as f64).collect()),
            Samples::Text(_) => None,
        }
    }

    /// The elements, if they are `float32`.
    #[must_use]
    pub fn as_f32(&self) -> Option<&[f32]> {
        match self {
            Samples::Float32(v) => Some(v),
            _ => None,
        }
    }

    /// The elements, if they are `float64`.
    #[must_use]
    pub fn as_f64(&self) -> Option<&[f64]> {
        match self {
            Samples::Float64(v) => Some(v),
            _ => None,
        }
    }

    /// The elements, if they are `int32`.
    #[must_use]
    pub fn as_i32(&self) -> Option<&[i32]> {
        match self {
            Samples::Int32(v) => Some(v),
            _ => None,
        }
    }

    /// The elements, if they are `int64`.
    #[must_use]
    pub fn as_i64(&self) -> Option<&[i64]> {
        match self {
            Samples::Int64(v) => Some(v),
            _ => None,
        }
    }

    /// The elements, if they are text.
    #[must_use]
    pub fn as_text(&self) -> Option<&[String]> {
        match self {
            Samples::Text(v) => Some(v),
            _ => None,
        }
    }
}

impl From<Vec<f32>> for Samples {
    fn from(value: Vec<f32>) -> Self {
        Samples::Float32(value)
    }
}

impl From<Vec<f64>> for Samples {
    fn from(value: Vec<f64>) -> Self {
        Samples::Float64(value)
    }
}

impl From<Vec<i32>> for Samples {
    fn from(value: Vec<i32>) -> Self {
        Samples::Int32(value)
    }
}

impl From<Vec<i64>> for Samples {
    fn from(value: Vec<i64>) -> Self {
        Samples::Int64(value)
    }
}

impl From<Vec<String>> for Samples {
    fn from(value: Vec<String>) -> Self {
        Samples::Text(value)
    }
}

impl From<Vec<&str>> for Samples {
    fn from(value: Vec<&str>) -> Self {
        Samples::Text(value.into_iter().map(str::to_owned).collect())
    }
}

impl From<&str> for Samples {
    fn from(value: &str) -> Self {
        Samples::Text(vec![value.to_owned()])
    }
}

impl From<String> for Samples {
    fn from(value: String) -> Self {
        Samples::Text(vec![value])
    }
}

/// Encode a whole collection.
#[must_use]
pub fn encode(samples: &Samples) -> Vec<u8> {
    let mut encoder = StreamEncoder::new(samples.sample_type());
    let mut out = BytesMut::with_capacity(samples.encoded_len());
    encoder.encode_into(samples, &mut out);
    out.to_vec()
}

/// Decode `bytes` as a collection of `sample_type`.
///
/// Numeric input must be a whole multiple of the sample width. Empty input
/// decodes to an empty collection for every type, text included.
pub fn decode(sample_type: SampleType, bytes: &[u8]) -> PoolResult<Samples> {
    match sample_type {
        SampleType::Float32 => unpack(sample_type, bytes, |b| b.get_f32_ne()).map(Samples::Float32),
        SampleType::Float64 => unpack(sample_type, bytes, |b| b.get_f64_ne()).map(Samples::Float64),
        SampleType::Int32 => unpack(sample_type, bytes, |b| b.get_i32_ne()).map(Samples::Int32),
        SampleType::Int64 => unpack(sample_type, bytes, |b| b.get_i64_ne()).map(Samples::Int64),
        SampleType::Text => decode_text(bytes),
    }
}

fn unpack<T>(
    sample_type: SampleType,
    mut bytes: &[u8],
    mut get: impl FnMut(&mut &[u8]) -> T,
) -> PoolResult<Vec<T>> {
    let width = sample_type.width().unwrap_or(1);
    if bytes.len() % width != 0 {
        return Err(PoolError::Format(format!(
            "{} bytes is not a multiple of the {sample_type} width ({width})",
            bytes.len()
        )));
    }
    let count = bytes.len() / width;
    Ok((0..count).map(|_| get(&mut bytes)).collect())
}

fn decode_text(bytes: &[u8]) -> PoolResult<Samples> {
    if bytes.is_empty() {
        return Ok(Samples::Text(Vec::new()));
    }
    let text = std::str::from_utf8(bytes)
        .map_err(|e| PoolError::Format(format!("text record is not valid UTF-8: {e}")))?;
    Ok(Samples::Text(
        text.split(LINE_SEPARATOR as char).map(str::to_owned).collect(),
    ))
}

/// Incremental encoder for a chunked write.
///
/// Numeric chunks pack independently. Text chunks need the separator
/// between the last element of one chunk and the first of the next, so the
/// encoder remembers whether anything has been written yet. Encoding a
/// collection in one chunk or in many yields the same bytes.
#[derive(Debug)]
pub struct StreamEncoder {
    sample_type: SampleType,
    wrote_element: bool,
}

impl StreamEncoder {
    /// Encoder for a fresh stream of `sample_type` elements.
    #[must_use]
    pub fn new(sample_type: SampleType) -> Self {
        Self {
            sample_type,
            wrote_element: false,
        }
    }

    /// Append the packed form of `chunk` to `out`.
    ///
    /// The chunk must already be of the encoder's sample type; callers check
    /// with [`Samples::ensure_type`] first.
    pub fn encode_into(&mut self, chunk: &Samples, out: &mut BytesMut) {
        debug_assert_eq!(chunk.sample_type(), self.sample_type);
        out.reserve(chunk.encoded_len() + 1);
        match chunk {
            Samples::Float32(v) => v.iter().for_each(|&x| out.put_f32_ne(x)),
            Samples::Float64(v) => v.iter().for_each(|&x| out.put_f64_ne(x)),
            Samples::Int32(v) => v.iter().for_each(|&x| out.put_i32_ne(x)),
            Samples::Int64(v) => v.iter().for_each(|&x| out.put_i64_ne(x)),
            Samples::Text(v) => {
                for element in v {
                    if self.wrote_element {
                        out.put_u8(LINE_SEPARATOR);
                    }
                    out.put_slice(element.as_bytes());
                    self.wrote_element = true;
                }
            }
        }
    }
}
