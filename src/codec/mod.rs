//! Element codec: endian-aware (de)serialization of typed buffers to raw
//! bytes, followed by a pluggable byte-to-byte compressor stage.

#[cfg(feature = "blosc")]
mod blosc_codec;

use serde_json::Value;

use crate::data_type::{Endian, ReflectedType};
use crate::error::Error;

/// The compressor named in a `.zarray`'s `"compressor"` field.
///
/// `Null` is Zarr's `compressor: null`, a byte-identity passthrough.
#[derive(Debug, Clone, PartialEq)]
pub enum CompressorKind {
    Null,
    #[cfg(feature = "blosc")]
    Blosc(blosc_codec::BloscOptions),
}

impl CompressorKind {
    /// A Blosc compressor with the `.zarray` default options (`cname: lz4`,
    /// `clevel: 5`, shuffle enabled).
    #[cfg(feature = "blosc")]
    pub fn blosc_default() -> Self {
        CompressorKind::Blosc(blosc_codec::BloscOptions::default())
    }

    pub(crate) fn compress(&self, raw: &[u8]) -> Vec<u8> {
        match self {
            CompressorKind::Null => raw.to_vec(),
            #[cfg(feature = "blosc")]
            CompressorKind::Blosc(opts) => blosc_codec::compress(opts, raw),
        }
    }

    /// Returns `None` when `bytes` is not a valid frame for this compressor;
    /// callers fall back to treating `bytes` as already-raw data (the
    /// "autodetection" behavior: a chunk written without compression can
    /// still be opened by an array configured with one).
    pub(crate) fn decompress(&self, bytes: &[u8]) -> Option<Vec<u8>> {
        match self {
            CompressorKind::Null => Some(bytes.to_vec()),
            #[cfg(feature = "blosc")]
            CompressorKind::Blosc(_) => blosc_codec::decompress(bytes),
        }
    }

    pub(crate) fn to_json(&self) -> Value {
        match self {
            CompressorKind::Null => Value::Null,
            #[cfg(feature = "blosc")]
            CompressorKind::Blosc(opts) => opts.to_json(),
        }
    }

    pub(crate) fn from_json(value: &Value) -> Result<Self, Error> {
        if value.is_null() {
            return Ok(CompressorKind::Null);
        }
        let id = value
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::UnknownCompressor {
                id: value.to_string(),
            })?;
        match id {
            #[cfg(feature = "blosc")]
            "blosc" => Ok(CompressorKind::Blosc(blosc_codec::BloscOptions::from_json(
                value,
            )?)),
            other => Err(Error::UnknownCompressor {
                id: other.to_owned(),
            }),
        }
    }
}

/// Serialize `elements` to `endian`-ordered bytes, then compress.
pub fn encode<T: ReflectedType>(elements: &[T], endian: Endian, compressor: &CompressorKind) -> Vec<u8> {
    let width = std::mem::size_of::<T>();
    let mut raw = vec![0u8; elements.len() * width];
    for (chunk, &value) in raw.chunks_exact_mut(width).zip(elements.iter()) {
        write_element(value, endian, chunk);
    }
    compressor.compress(&raw)
}

/// Decompress `bytes` (falling back to treating them as already-raw, see
/// [CompressorKind::decompress]) and deserialize `count` elements of `T` in
/// `endian` order.
pub fn decode<T: ReflectedType>(
    bytes: &[u8],
    count: usize,
    endian: Endian,
    compressor: &CompressorKind,
) -> Result<Vec<T>, Error> {
    let raw = compressor
        .decompress(bytes)
        .unwrap_or_else(|| bytes.to_vec());
    let width = std::mem::size_of::<T>();
    if raw.len() != count * width {
        return Err(Error::ChunkDecode {
            path: Default::default(),
            reason: format!(
                "decoded {} bytes, expected {} ({} elements of width {})",
                raw.len(),
                count * width,
                count,
                width
            ),
        });
    }
    Ok(raw
        .chunks_exact(width)
        .map(|chunk| read_element::<T>(chunk, endian))
        .collect())
}

/// Writes `value`'s bytes in the requested on-disk `endian`, via
/// [ReflectedType::write_bytes].
fn write_element<T: ReflectedType>(value: T, endian: Endian, buf: &mut [u8]) {
    value.write_bytes(endian, buf);
}

fn read_element<T: ReflectedType>(buf: &[u8], endian: Endian) -> T {
    T::read_bytes(endian, buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_roundtrip_little_endian() {
        let elements = [1i32, -2, 3, i32::MAX];
        let bytes = encode(&elements, Endian::Little, &CompressorKind::Null);
        let back: Vec<i32> = decode(&bytes, elements.len(), Endian::Little, &CompressorKind::Null).unwrap();
        assert_eq!(back, elements);
    }

    #[test]
    fn null_roundtrip_big_endian() {
        let elements = [1i32, -2, 3, i32::MAX];
        let bytes = encode(&elements, Endian::Big, &CompressorKind::Null);
        let back: Vec<i32> = decode(&bytes, elements.len(), Endian::Big, &CompressorKind::Null).unwrap();
        assert_eq!(back, elements);
        // distinct byte order from little-endian encoding of the same data
        let le_bytes = encode(&elements, Endian::Little, &CompressorKind::Null);
        assert_ne!(bytes, le_bytes);
    }

    #[test]
    fn raw_bytes_shorter_than_expected_is_an_error() {
        let err = decode::<i32>(&[0u8; 3], 1, Endian::Little, &CompressorKind::Null).unwrap_err();
        assert!(matches!(err, Error::ChunkDecode { .. }));
    }

    #[test]
    fn null_compressor_json_roundtrip() {
        let kind = CompressorKind::Null;
        let json = kind.to_json();
        assert!(json.is_null());
        assert_eq!(CompressorKind::from_json(&json).unwrap(), kind);
    }

    #[test]
    fn unknown_compressor_id_rejected() {
        let value = serde_json::json!({"id": "zstd"});
        assert!(matches!(
            CompressorKind::from_json(&value),
            Err(Error::UnknownCompressor { .. })
        ));
    }

    #[cfg(feature = "blosc")]
    #[test]
    fn blosc_encode_decode_roundtrip() {
        let compressor = CompressorKind::blosc_default();
        let elements: Vec<i32> = (0..64).collect();
        let bytes = encode(&elements, Endian::Little, &compressor);
        let back: Vec<i32> = decode(&bytes, elements.len(), Endian::Little, &compressor).unwrap();
        assert_eq!(back, elements);
    }

    #[cfg(feature = "blosc")]
    #[test]
    fn blosc_compressor_json_roundtrip() {
        let compressor = CompressorKind::blosc_default();
        let json = compressor.to_json();
        assert_eq!(json["id"], "blosc");
        assert_eq!(CompressorKind::from_json(&json).unwrap(), compressor);
    }
}
