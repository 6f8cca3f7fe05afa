//! Typed element-indexed array, the concrete store backing [crate::IArray].

use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use log::warn;

use crate::cache::ChunkCache;
use crate::chunk::Chunk;
use crate::codec::CompressorKind;
use crate::collection::Attributes;
use crate::data_type::{DataType, ReflectedType};
use crate::error::Error;
use crate::header::Header;
use crate::indexing;
use crate::order::Order;
use crate::Coord;

/// A single chunked N-D array backed by a directory: one `.zarray` plus one
/// file per chunk, named by chunk id, plus the `.zattrs` attributes every
/// node in the collection tree carries.
pub struct Array<T: ReflectedType> {
    path: PathBuf,
    header: Rc<Header>,
    cache: ChunkCache<T>,
    attributes: Attributes,
}

impl<T: ReflectedType> Array<T> {
    /// Create a new array in a freshly allocated temporary directory
    /// (see `create_temp_array_path`) and write its `.zarray`. The
    /// returned array is empty and lazy: no chunk file exists until an
    /// element has been set and flushed.
    pub fn create(
        shape: Coord,
        chunks: Coord,
        order: Order,
        fill_value: f64,
        compressor: CompressorKind,
    ) -> Result<Self, Error> {
        Self::create_at(
            crate::path::create_temp_array_path(),
            shape,
            chunks,
            order,
            fill_value,
            compressor,
        )
    }

    /// Create a new array at an explicit directory and write its
    /// `.zarray`. Fails if `path` already exists.
    pub fn create_at(
        path: impl Into<PathBuf>,
        shape: Coord,
        chunks: Coord,
        order: Order,
        fill_value: f64,
        compressor: CompressorKind,
    ) -> Result<Self, Error> {
        let path = path.into();
        fs::create_dir(&path).map_err(|e| Error::io(path.clone(), e))?;
        let header = Header::new::<T>(shape, chunks, order, fill_value, compressor)?;
        header.write(&path)?;
        Ok(Array {
            path,
            header: Rc::new(header),
            cache: ChunkCache::new(crate::cache::MAX),
            attributes: Attributes::new(),
        })
    }

    /// Open an existing array directory, checking its declared dtype
    /// matches `T`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, Error> {
        let path = path.into();
        let header = Header::read(&path)?;
        if header.dtype() != T::ZARR_TYPE {
            return Err(Error::DtypeMismatch {
                header: format!("{:?}", header.dtype()),
                requested: format!("{:?}", T::ZARR_TYPE),
            });
        }
        let attributes = Attributes::read(&path)?;
        Ok(Array {
            path,
            header: Rc::new(header),
            cache: ChunkCache::new(crate::cache::MAX),
            attributes,
        })
    }

    /// Like [Array::open], with an explicit chunk cache capacity.
    pub fn open_with_cache(path: impl Into<PathBuf>, cache_capacity: usize) -> Result<Self, Error> {
        let mut array = Self::open(path)?;
        array.cache = ChunkCache::new(cache_capacity);
        Ok(array)
    }

    /// Like [Array::create_at], with an explicit chunk cache capacity.
    pub fn create_at_with_cache(
        path: impl Into<PathBuf>,
        shape: Coord,
        chunks: Coord,
        order: Order,
        fill_value: f64,
        compressor: CompressorKind,
        cache_capacity: usize,
    ) -> Result<Self, Error> {
        let mut array = Self::create_at(path, shape, chunks, order, fill_value, compressor)?;
        array.cache = ChunkCache::new(cache_capacity);
        Ok(array)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of this array's `.zarray` metadata file.
    pub fn header_path(&self) -> PathBuf {
        self.path.join(".zarray")
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Replace this array's attributes and write them to `.zattrs`
    /// immediately, rather than waiting for the array to drop.
    pub fn set_attributes(&mut self, attributes: Attributes) -> Result<(), Error> {
        attributes.write(&self.path)?;
        self.attributes = attributes;
        Ok(())
    }

    pub fn shape(&self) -> &[u64] {
        self.header.shape()
    }

    pub fn chunk_shape(&self) -> &[u64] {
        self.header.chunks()
    }

    pub fn dimensions(&self) -> usize {
        self.header.dimensions()
    }

    pub fn size(&self) -> u64 {
        self.header.size()
    }

    pub fn chunk_size(&self) -> u64 {
        self.header.chunk_size()
    }

    pub fn dtype(&self) -> DataType {
        self.header.dtype()
    }

    fn chunk_id_and_offset(&self, index: u64) -> Result<(Coord, usize), Error> {
        if index >= self.header.size() {
            return Err(Error::OutOfRange {
                index,
                size: self.header.size(),
            });
        }
        let position = indexing::find_position(index, self.header.shape(), self.header.order());
        let chunk_id = indexing::find_chunk_id(&position, self.header.chunks())?;
        let in_chunk = indexing::find_chunk_position(&position, &chunk_id, self.header.chunks())?;
        let offset = indexing::flatten(&in_chunk, self.header.chunks())? as usize;
        Ok((chunk_id, offset))
    }

    fn ensure_chunk(&mut self, chunk_id: &Coord) -> Result<(), Error> {
        if !self.cache.contains(chunk_id) {
            let chunk = Chunk::new_from_path(self.header.clone(), &self.path, chunk_id.clone());
            self.cache.insert(chunk_id.clone(), chunk)?;
        }
        Ok(())
    }

    /// Read the element at linear `index`.
    pub fn get(&mut self, index: u64) -> Result<T, Error> {
        let (chunk_id, offset) = self.chunk_id_and_offset(index)?;
        self.ensure_chunk(&chunk_id)?;
        self.cache.get(&chunk_id)?.get(offset)
    }

    /// Write the element at linear `index`.
    pub fn set(&mut self, index: u64, value: T) -> Result<(), Error> {
        let (chunk_id, offset) = self.chunk_id_and_offset(index)?;
        self.ensure_chunk(&chunk_id)?;
        self.cache.get(&chunk_id)?.set(offset, value)
    }

    /// Set every element of the array to `value`, chunk by chunk.
    pub fn fill(&mut self, value: T) -> Result<(), Error> {
        let chunks_per_axis = self.num_chunks_per_axis();
        let num_chunks: u64 = chunks_per_axis.iter().product();
        for linear_chunk in 0..num_chunks {
            let chunk_id = indexing::find_position(linear_chunk, &chunks_per_axis, self.header.order());
            self.ensure_chunk(&chunk_id)?;
            self.cache.get(&chunk_id)?.fill(value)?;
        }
        Ok(())
    }

    fn num_chunks_per_axis(&self) -> Coord {
        self.header
            .shape()
            .iter()
            .zip(self.header.chunks().iter())
            .map(|(s, c)| s.div_ceil(*c))
            .collect()
    }

    /// Flush every dirty cached chunk without closing the array.
    pub fn flush(&mut self) -> Result<(), Error> {
        self.cache.flush_all()
    }

    /// Random-access iteration over every element, `0..size()` in order.
    /// `std::iter::Iterator` already gives this a natural end (`None`), so
    /// unlike a random-access C++ iterator there is no end-sentinel to
    /// construct or compare.
    pub fn iter(&mut self) -> Iter<'_, T> {
        let size = self.size();
        Iter {
            array: self,
            index: 0,
            size,
        }
    }
}

/// Yields `Ok(element)` for each index in `0..array.size()`, or `Err` the
/// first time a read fails; iteration stops after any `Err`.
pub struct Iter<'a, T: ReflectedType> {
    array: &'a mut Array<T>,
    index: u64,
    size: u64,
}

impl<T: ReflectedType> Iterator for Iter<'_, T> {
    type Item = Result<T, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.size {
            return None;
        }
        let result = self.array.get(self.index);
        if result.is_ok() {
            self.index += 1;
        } else {
            self.index = self.size;
        }
        Some(result)
    }
}

impl<T: ReflectedType> Drop for Array<T> {
    /// Explicitly flushes the cache before the implicit field drops run, so
    /// every live chunk is written back while its `Rc<Header>` clone is
    /// still valid regardless of `header`'s and `cache`'s declaration order.
    fn drop(&mut self) {
        if let Err(e) = self.cache.flush_all() {
            warn!("failed to flush array at {}: {e}", self.path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;
    use tempfile::tempdir;

    #[test]
    fn create_open_get_set_roundtrip() {
        let dir = tempdir().unwrap();
        let array_path = dir.path().join("a");
        {
            let mut array = Array::<i32>::create_at(
                &array_path,
                smallvec![4u64, 4],
                smallvec![2u64, 2],
                Order::ColumnMajor,
                -1.0,
                CompressorKind::Null,
            )
            .unwrap();
            array.set(14, 99).unwrap();
        }
        let mut array = Array::<i32>::open(&array_path).unwrap();
        assert_eq!(array.get(14).unwrap(), 99);
        assert_eq!(array.get(0).unwrap(), -1);
    }

    #[test]
    fn open_with_wrong_dtype_errors() {
        let dir = tempdir().unwrap();
        let array_path = dir.path().join("a");
        Array::<i32>::create_at(
            &array_path,
            smallvec![4u64],
            smallvec![2u64],
            Order::ColumnMajor,
            0.0,
            CompressorKind::Null,
        )
        .unwrap();
        assert!(matches!(
            Array::<f32>::open(&array_path),
            Err(Error::DtypeMismatch { .. })
        ));
    }

    #[test]
    fn fill_sets_every_element() {
        let dir = tempdir().unwrap();
        let array_path = dir.path().join("a");
        let mut array = Array::<i32>::create_at(
            &array_path,
            smallvec![4u64, 4],
            smallvec![2u64, 2],
            Order::ColumnMajor,
            0.0,
            CompressorKind::Null,
        )
        .unwrap();
        array.fill(7).unwrap();
        for i in 0..16 {
            assert_eq!(array.get(i).unwrap(), 7);
        }
    }

    #[test]
    fn fill_covers_ragged_trailing_chunks() {
        // shape=[3,3], chunks=[2,2]: 4 chunks (2x2 grid), not 3 as a naive
        // size/chunk_size division would suggest.
        let dir = tempdir().unwrap();
        let array_path = dir.path().join("a");
        let mut array = Array::<i32>::create_at(
            &array_path,
            smallvec![3u64, 3],
            smallvec![2u64, 2],
            Order::ColumnMajor,
            0.0,
            CompressorKind::Null,
        )
        .unwrap();
        array.fill(9).unwrap();
        for i in 0..9 {
            assert_eq!(array.get(i).unwrap(), 9);
        }
    }

    #[test]
    fn out_of_range_index_errors() {
        let dir = tempdir().unwrap();
        let array_path = dir.path().join("a");
        let mut array = Array::<i32>::create_at(
            &array_path,
            smallvec![4u64],
            smallvec![2u64],
            Order::ColumnMajor,
            0.0,
            CompressorKind::Null,
        )
        .unwrap();
        assert!(matches!(array.get(4), Err(Error::OutOfRange { .. })));
    }

    #[test]
    fn create_allocates_its_own_temporary_directory() {
        let mut array = Array::<i32>::create(
            smallvec![2u64],
            smallvec![2u64],
            Order::ColumnMajor,
            0.0,
            CompressorKind::Null,
        )
        .unwrap();
        assert!(array.path().is_dir());
        assert!(array.header_path().ends_with(".zarray"));
        array.set(0, 5).unwrap();
        assert_eq!(array.get(0).unwrap(), 5);
    }

    #[test]
    fn iter_yields_every_element_in_order() {
        let dir = tempdir().unwrap();
        let array_path = dir.path().join("a");
        let mut array = Array::<i32>::create_at(
            &array_path,
            smallvec![4u64],
            smallvec![2u64],
            Order::ColumnMajor,
            0.0,
            CompressorKind::Null,
        )
        .unwrap();
        array.fill(0).unwrap();
        for i in 0..4 {
            array.set(i, i as i32).unwrap();
        }
        let values: Result<Vec<i32>, Error> = array.iter().collect();
        assert_eq!(values.unwrap(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn attributes_persist_across_reopen() {
        let dir = tempdir().unwrap();
        let array_path = dir.path().join("a");
        {
            let mut array = Array::<i32>::create_at(
                &array_path,
                smallvec![2u64],
                smallvec![2u64],
                Order::ColumnMajor,
                0.0,
                CompressorKind::Null,
            )
            .unwrap();
            assert_eq!(array.attributes(), &crate::collection::Attributes::new());
            let mut attrs = crate::collection::Attributes::new();
            attrs.insert("unit", serde_json::Value::String("meters".into()));
            array.set_attributes(attrs).unwrap();
        }
        let array = Array::<i32>::open(&array_path).unwrap();
        assert_eq!(
            array.attributes().get("unit").and_then(|v| v.as_str()),
            Some("meters")
        );
    }
}
