//! Untyped array access and shared directory-attribute handling.
//!
//! [Array<T>] requires the caller to know the element type at compile time.
//! [IArray] erases that: it dispatches to the right `Array<T>` based on the
//! dtype recorded in `.zarray`, at the cost of expressing every element as
//! `f64` at the boundary.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::array::Array;
use crate::data_type::DataType;
use crate::error::Error;
use crate::header::Header;

const ZATTRS_FILE: &str = ".zattrs";

/// Arbitrary user metadata attached to a group or array directory via
/// `.zattrs`. A thin, serde-backed wrapper around a JSON object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes(serde_json::Map<String, Value>);

impl Attributes {
    pub fn new() -> Self {
        Attributes(serde_json::Map::new())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    pub fn read(dir: &Path) -> Result<Self, Error> {
        let path = dir.join(ZATTRS_FILE);
        match fs::read_to_string(&path) {
            Ok(text) => {
                let map = serde_json::from_str(&text).map_err(|e| Error::ChunkDecode {
                    path: path.clone(),
                    reason: e.to_string(),
                })?;
                Ok(Attributes(map))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Attributes::new()),
            Err(e) => Err(Error::io(path, e)),
        }
    }

    pub fn write(&self, dir: &Path) -> Result<(), Error> {
        let path = dir.join(ZATTRS_FILE);
        let text = serde_json::to_string_pretty(&self.0).expect("Attributes always serializes");
        fs::write(&path, text).map_err(|e| Error::io(path, e))
    }
}

/// Directory-level state shared by every node in the collection tree: a
/// path and its attributes. [crate::Group] and array directories both
/// embed one.
#[derive(Debug, Clone)]
pub struct BaseCollection {
    path: PathBuf,
    attributes: Attributes,
}

impl BaseCollection {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, Error> {
        let path = path.into();
        let attributes = Attributes::read(&path)?;
        Ok(BaseCollection { path, attributes })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// This node's directory name, relative to its parent.
    pub fn name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn set_attributes(&mut self, attributes: Attributes) -> Result<(), Error> {
        attributes.write(&self.path)?;
        self.attributes = attributes;
        Ok(())
    }

    /// Whether `path` names a node with a `.zarray` (an array) as opposed
    /// to a `.zgroup` (a group).
    pub fn is_array_dir(path: &Path) -> bool {
        path.join(".zarray").is_file()
    }

    pub fn is_group_dir(path: &Path) -> bool {
        path.join(".zgroup").is_file()
    }
}

/// Type-erased read/write access to one array, whatever its element dtype.
///
/// Values cross this boundary as `f64`; this loses precision for `i64`/
/// `u64` magnitudes beyond 2^53, the same tradeoff already accepted for
/// fill values (see [crate::header::Header]'s Open Question note).
pub trait IArray {
    fn path(&self) -> &Path;
    fn shape(&self) -> &[u64];
    fn dtype(&self) -> DataType;
    fn size(&self) -> u64;
    fn get(&mut self, index: u64) -> Result<f64, Error>;
    fn set(&mut self, index: u64, value: f64) -> Result<(), Error>;
    fn flush(&mut self) -> Result<(), Error>;
    fn attributes(&self) -> &Attributes;
    fn set_attributes(&mut self, attributes: Attributes) -> Result<(), Error>;
}

macro_rules! impl_iarray {
    ($t:ty) => {
        impl IArray for Array<$t> {
            fn path(&self) -> &Path {
                Array::path(self)
            }

            fn shape(&self) -> &[u64] {
                Array::shape(self)
            }

            fn dtype(&self) -> DataType {
                Array::dtype(self)
            }

            fn size(&self) -> u64 {
                Array::size(self)
            }

            fn get(&mut self, index: u64) -> Result<f64, Error> {
                Array::get(self, index).map(|v| v as f64)
            }

            fn set(&mut self, index: u64, value: f64) -> Result<(), Error> {
                Array::set(self, index, value as $t)
            }

            fn flush(&mut self) -> Result<(), Error> {
                Array::flush(self)
            }

            fn attributes(&self) -> &Attributes {
                Array::attributes(self)
            }

            fn set_attributes(&mut self, attributes: Attributes) -> Result<(), Error> {
                Array::set_attributes(self, attributes)
            }
        }
    };
}

impl_iarray!(i8);
impl_iarray!(i16);
impl_iarray!(i32);
impl_iarray!(i64);
impl_iarray!(u8);
impl_iarray!(u16);
impl_iarray!(u32);
impl_iarray!(u64);
impl_iarray!(f32);
impl_iarray!(f64);

impl IArray for Array<bool> {
    fn path(&self) -> &Path {
        Array::path(self)
    }

    fn shape(&self) -> &[u64] {
        Array::shape(self)
    }

    fn dtype(&self) -> DataType {
        Array::dtype(self)
    }

    fn size(&self) -> u64 {
        Array::size(self)
    }

    fn get(&mut self, index: u64) -> Result<f64, Error> {
        Array::get(self, index).map(|v| if v { 1.0 } else { 0.0 })
    }

    fn set(&mut self, index: u64, value: f64) -> Result<(), Error> {
        Array::set(self, index, value != 0.0)
    }

    fn flush(&mut self) -> Result<(), Error> {
        Array::flush(self)
    }

    fn attributes(&self) -> &Attributes {
        Array::attributes(self)
    }

    fn set_attributes(&mut self, attributes: Attributes) -> Result<(), Error> {
        Array::set_attributes(self, attributes)
    }
}

/// Open `path` as an array, dispatching to the concrete `Array<T>` whose
/// dtype matches the on-disk `.zarray`.
pub fn open_untyped(path: impl Into<PathBuf>) -> Result<Box<dyn IArray>, Error> {
    let path = path.into();
    let header = Header::read(&path)?;
    Ok(match header.dtype() {
        DataType::I8 => Box::new(Array::<i8>::open(path)?),
        DataType::I16 => Box::new(Array::<i16>::open(path)?),
        DataType::I32 => Box::new(Array::<i32>::open(path)?),
        DataType::I64 => Box::new(Array::<i64>::open(path)?),
        DataType::U8 => Box::new(Array::<u8>::open(path)?),
        DataType::U16 => Box::new(Array::<u16>::open(path)?),
        DataType::U32 => Box::new(Array::<u32>::open(path)?),
        DataType::U64 => Box::new(Array::<u64>::open(path)?),
        DataType::F32 => Box::new(Array::<f32>::open(path)?),
        DataType::F64 => Box::new(Array::<f64>::open(path)?),
        DataType::Bool => Box::new(Array::<bool>::open(path)?),
    })
}
