//! `.zarray` metadata: shape, chunk shape, dtype, storage order, fill value
//! and compressor. One [Header] is shared (via `Rc`) between an [crate::Array]
//! and every [crate::chunk::Chunk] it has live in cache.

use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::codec::CompressorKind;
use crate::data_type::{DataType, Endian, ReflectedType};
use crate::error::Error;
use crate::order::Order;
use crate::Coord;

const ZARRAY_FILE: &str = ".zarray";

#[derive(Debug, Clone)]
pub struct Header {
    shape: Coord,
    chunks: Coord,
    dtype: DataType,
    endian: Endian,
    order: Order,
    fill_value: f64,
    compressor: CompressorKind,
}

impl Header {
    pub fn new<T: ReflectedType>(
        shape: Coord,
        chunks: Coord,
        order: Order,
        fill_value: f64,
        compressor: CompressorKind,
    ) -> Result<Self, Error> {
        crate::same_rank(&shape, &chunks)?;
        Ok(Header {
            shape,
            chunks,
            dtype: T::ZARR_TYPE,
            endian: Endian::Little,
            order,
            fill_value,
            compressor,
        })
    }

    pub fn shape(&self) -> &[u64] {
        &self.shape
    }

    pub fn chunks(&self) -> &[u64] {
        &self.chunks
    }

    pub fn dimensions(&self) -> usize {
        self.shape.len()
    }

    pub fn dtype(&self) -> DataType {
        self.dtype
    }

    pub(crate) fn endian(&self) -> Endian {
        self.endian
    }

    pub fn order(&self) -> Order {
        self.order
    }

    pub fn fill_value(&self) -> f64 {
        self.fill_value
    }

    pub(crate) fn compressor(&self) -> &CompressorKind {
        &self.compressor
    }

    /// Total element count, the product of `shape`.
    pub fn size(&self) -> u64 {
        self.shape.iter().product()
    }

    /// Element count of one chunk, the product of `chunks`.
    pub fn chunk_size(&self) -> u64 {
        self.chunks.iter().product()
    }

    /// Whether `shape`, `chunks`, and `dtype` describe a usable array: equal
    /// rank, all extents non-zero, chunk extents not exceeding shape extents.
    pub fn is_valid(&self) -> bool {
        self.shape.len() == self.chunks.len()
            && !self.shape.is_empty()
            && self
                .shape
                .iter()
                .zip(self.chunks.iter())
                .all(|(s, c)| *s > 0 && *c > 0 && *c <= *s)
    }

    pub fn read(array_path: &Path) -> Result<Self, Error> {
        let path = array_path.join(ZARRAY_FILE);
        let text = fs::read_to_string(&path).map_err(|e| Error::io(path.clone(), e))?;
        let value: Value =
            serde_json::from_str(&text).map_err(|e| Error::ChunkDecode {
                path: path.clone(),
                reason: e.to_string(),
            })?;
        Self::from_json(&value, &path)
    }

    pub fn write(&self, array_path: &Path) -> Result<(), Error> {
        let path = array_path.join(ZARRAY_FILE);
        let text = serde_json::to_string_pretty(&self.to_json()).expect("Header always serializes");
        fs::write(&path, text).map_err(|e| Error::io(path, e))
    }

    fn to_json(&self) -> Value {
        serde_json::json!({
            "zarr_format": 2,
            "shape": self.shape.as_slice(),
            "chunks": self.chunks.as_slice(),
            "dtype": self.dtype.to_dtype_string(self.endian),
            "order": self.order.to_zarr_letter(),
            "fill_value": self.fill_value,
            "compressor": self.compressor.to_json(),
            "filters": Value::Null,
        })
    }

    fn from_json(value: &Value, path: &Path) -> Result<Self, Error> {
        let err = |reason: String| Error::ChunkDecode {
            path: path.to_owned(),
            reason,
        };

        let shape: Coord = value
            .get("shape")
            .and_then(Value::as_array)
            .ok_or_else(|| err("missing \"shape\"".into()))?
            .iter()
            .map(|v| v.as_u64().ok_or_else(|| err("non-integer shape entry".into())))
            .collect::<Result<_, _>>()?;

        let chunks: Coord = value
            .get("chunks")
            .and_then(Value::as_array)
            .ok_or_else(|| err("missing \"chunks\"".into()))?
            .iter()
            .map(|v| v.as_u64().ok_or_else(|| err("non-integer chunks entry".into())))
            .collect::<Result<_, _>>()?;

        let dtype_str = value
            .get("dtype")
            .and_then(Value::as_str)
            .ok_or_else(|| err("missing \"dtype\"".into()))?;
        let (dtype, endian) = DataType::parse_dtype(dtype_str)?;

        let order = value
            .get("order")
            .and_then(Value::as_str)
            .and_then(Order::from_zarr_letter)
            .unwrap_or_default();

        let fill_value = match value.get("fill_value") {
            None | Some(Value::Null) => 0.0,
            Some(Value::Bool(b)) => {
                if dtype == DataType::Bool {
                    if *b {
                        1.0
                    } else {
                        0.0
                    }
                } else {
                    return Err(err("boolean fill_value on a non-bool dtype".into()));
                }
            }
            Some(Value::Number(n)) => n.as_f64().ok_or_else(|| err("fill_value not representable as f64".into()))?,
            Some(other) => return Err(err(format!("unsupported fill_value {other}"))),
        };

        let compressor = CompressorKind::from_json(value.get("compressor").unwrap_or(&Value::Null))?;

        Ok(Header {
            shape,
            chunks,
            dtype,
            endian,
            order,
            fill_value,
            compressor,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;
    use tempfile::tempdir;

    #[test]
    fn roundtrips_through_disk() {
        let header = Header::new::<i32>(
            smallvec![4u64, 4],
            smallvec![2u64, 2],
            Order::ColumnMajor,
            -1.0,
            CompressorKind::Null,
        )
        .unwrap();
        let dir = tempdir().unwrap();
        header.write(dir.path()).unwrap();
        let back = Header::read(dir.path()).unwrap();
        assert_eq!(back.shape(), header.shape());
        assert_eq!(back.chunks(), header.chunks());
        assert_eq!(back.dtype(), header.dtype());
        assert_eq!(back.fill_value(), header.fill_value());
    }

    #[test]
    fn rejects_mismatched_rank() {
        assert!(Header::new::<i32>(smallvec![4u64, 4], smallvec![2u64], Order::ColumnMajor, 0.0, CompressorKind::Null).is_err());
    }

    #[test]
    fn is_valid_rejects_oversized_chunks() {
        let header = Header::new::<i32>(smallvec![4u64], smallvec![8u64], Order::ColumnMajor, 0.0, CompressorKind::Null).unwrap();
        assert!(!header.is_valid());
    }

    #[test]
    fn bool_fill_value_rejected_on_numeric_dtype() {
        let dir = tempdir().unwrap();
        let header = Header::new::<i32>(smallvec![2u64], smallvec![2u64], Order::ColumnMajor, 0.0, CompressorKind::Null).unwrap();
        header.write(dir.path()).unwrap();
        let raw = fs::read_to_string(dir.path().join(ZARRAY_FILE)).unwrap();
        let mut value: Value = serde_json::from_str(&raw).unwrap();
        value["fill_value"] = Value::Bool(true);
        fs::write(dir.path().join(ZARRAY_FILE), value.to_string()).unwrap();
        assert!(Header::read(dir.path()).is_err());
    }
}
