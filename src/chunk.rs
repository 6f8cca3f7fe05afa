//! A single chunk file: lazily loaded, written back on eviction or drop.

use std::path::{Path, PathBuf};
use std::rc::Rc;

use log::{debug, warn};

use crate::codec;
use crate::data_type::ReflectedType;
use crate::error::Error;
use crate::header::Header;
use crate::path::{chunk_path, parse_chunk_file_name};
use crate::Coord;

/// One chunk of an array's data, identified by its chunk id.
///
/// Holds a strong reference to the owning array's [Header] so that a chunk
/// still in the cache after the array itself would otherwise be free to
/// drop can still be decoded/encoded.
pub struct Chunk<T: ReflectedType> {
    header: Rc<Header>,
    chunk_id: Coord,
    path: PathBuf,
    data: Option<Vec<T>>,
    dirty: bool,
}

impl<T: ReflectedType> Chunk<T> {
    /// A chunk handle with nothing loaded yet: `get`/`set` will fault it in
    /// on first use.
    pub fn new_absent(header: Rc<Header>, array_path: &Path, chunk_id: Coord) -> Self {
        let path = chunk_path(array_path, &chunk_id);
        Chunk {
            header,
            chunk_id,
            path,
            data: None,
            dirty: false,
        }
    }

    /// A chunk handle for a file already known to exist at `array_path`.
    pub fn new_from_path(header: Rc<Header>, array_path: &Path, chunk_id: Coord) -> Self {
        Self::new_absent(header, array_path, chunk_id)
    }

    /// A chunk handle derived from a full chunk file path, recovering the
    /// id from its filename rather than from index arithmetic. Intended for
    /// callers that discover chunk files by directory listing rather than
    /// computing an id from a linear index, e.g. repair or inspection tools.
    pub fn from_chunk_file(header: Rc<Header>, path: &Path) -> Result<Self, Error> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::BadChunkName {
                name: path.display().to_string(),
            })?;
        let chunk_id = parse_chunk_file_name(name).ok_or_else(|| Error::BadChunkName {
            name: name.to_owned(),
        })?;
        Ok(Chunk {
            header,
            chunk_id,
            path: path.to_owned(),
            data: None,
            dirty: false,
        })
    }

    pub fn chunk_id(&self) -> &[u64] {
        &self.chunk_id
    }

    /// A chunk is valid once loaded iff it holds exactly `chunk_size`
    /// elements; an unloaded chunk is trivially valid (nothing to check).
    pub fn is_valid(&self) -> bool {
        match &self.data {
            Some(data) => data.len() as u64 == self.header.chunk_size(),
            None => true,
        }
    }

    fn ensure_loaded(&mut self) -> Result<(), Error> {
        if self.data.is_some() {
            return Ok(());
        }
        let count = self.header.chunk_size() as usize;
        self.data = Some(match std::fs::read(&self.path) {
            Ok(bytes) => {
                debug!("chunk {:?} loaded from {}", self.chunk_id, self.path.display());
                codec::decode::<T>(&bytes, count, self.header.endian(), self.header.compressor())
                    .map_err(|e| match e {
                        Error::ChunkDecode { reason, .. } => Error::ChunkDecode {
                            path: self.path.clone(),
                            reason,
                        },
                        other => other,
                    })?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("chunk {:?} absent, filling with fill_value", self.chunk_id);
                vec![T::from_fill_f64(self.header.fill_value()); count]
            }
            Err(e) => return Err(Error::io(self.path.clone(), e)),
        });
        Ok(())
    }

    pub fn get(&mut self, offset: usize) -> Result<T, Error> {
        self.ensure_loaded()?;
        self.data
            .as_ref()
            .unwrap()
            .get(offset)
            .copied()
            .ok_or(Error::OutOfRange {
                index: offset as u64,
                size: self.header.chunk_size(),
            })
    }

    pub fn set(&mut self, offset: usize, value: T) -> Result<(), Error> {
        self.ensure_loaded()?;
        let data = self.data.as_mut().unwrap();
        let slot = data.get_mut(offset).ok_or(Error::OutOfRange {
            index: offset as u64,
            size: self.header.chunk_size(),
        })?;
        *slot = value;
        self.dirty = true;
        Ok(())
    }

    pub fn fill(&mut self, value: T) -> Result<(), Error> {
        self.ensure_loaded()?;
        self.data.as_mut().unwrap().fill(value);
        self.dirty = true;
        Ok(())
    }

    /// Write the chunk's data to disk if it has been modified since load
    /// or creation. No-op for a chunk that was never faulted in.
    pub fn flush(&mut self) -> Result<(), Error> {
        if !self.dirty {
            return Ok(());
        }
        let Some(data) = &self.data else {
            return Ok(());
        };
        let bytes = codec::encode(data, self.header.endian(), self.header.compressor());
        std::fs::write(&self.path, &bytes).map_err(|e| Error::io(self.path.clone(), e))?;
        debug!("chunk {:?} flushed to {}", self.chunk_id, self.path.display());
        self.dirty = false;
        Ok(())
    }
}

impl<T: ReflectedType> Drop for Chunk<T> {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            warn!("failed to flush chunk {:?} on drop: {e}", self.chunk_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::CompressorKind;
    use crate::order::Order;
    use smallvec::smallvec;
    use tempfile::tempdir;

    fn header() -> Rc<Header> {
        Rc::new(
            Header::new::<i32>(
                smallvec![4u64],
                smallvec![4u64],
                Order::ColumnMajor,
                -1.0,
                CompressorKind::Null,
            )
            .unwrap(),
        )
    }

    #[test]
    fn absent_chunk_reads_as_fill_value() {
        let dir = tempdir().unwrap();
        let mut chunk: Chunk<i32> = Chunk::new_absent(header(), dir.path(), smallvec![0u64]);
        assert_eq!(chunk.get(0).unwrap(), -1);
    }

    #[test]
    fn set_then_flush_then_reload_roundtrips() {
        let dir = tempdir().unwrap();
        let h = header();
        {
            let mut chunk: Chunk<i32> = Chunk::new_absent(h.clone(), dir.path(), smallvec![0u64]);
            chunk.set(2, 42).unwrap();
            chunk.flush().unwrap();
        }
        let mut chunk: Chunk<i32> = Chunk::new_absent(h, dir.path(), smallvec![0u64]);
        assert_eq!(chunk.get(2).unwrap(), 42);
        assert_eq!(chunk.get(0).unwrap(), -1);
    }

    #[test]
    fn out_of_range_offset_errors() {
        let dir = tempdir().unwrap();
        let mut chunk: Chunk<i32> = Chunk::new_absent(header(), dir.path(), smallvec![0u64]);
        assert!(matches!(chunk.get(99), Err(Error::OutOfRange { .. })));
    }

    #[test]
    fn from_chunk_file_recovers_id_from_filename() {
        let dir = tempdir().unwrap();
        let h = header();
        {
            let mut chunk: Chunk<i32> = Chunk::new_absent(h.clone(), dir.path(), smallvec![0u64]);
            chunk.set(1, 7).unwrap();
            chunk.flush().unwrap();
        }
        let mut chunk: Chunk<i32> = Chunk::from_chunk_file(h, &dir.path().join("0")).unwrap();
        assert_eq!(chunk.chunk_id(), &[0]);
        assert_eq!(chunk.get(1).unwrap(), 7);
    }

    #[test]
    fn from_chunk_file_rejects_garbage_name() {
        let dir = tempdir().unwrap();
        let err = Chunk::<i32>::from_chunk_file(header(), &dir.path().join("not.a.chunk.x")).unwrap_err();
        assert!(matches!(err, Error::BadChunkName { .. }));
    }
}
