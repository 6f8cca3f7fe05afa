//! Bounded FIFO chunk cache: a fixed-capacity ring, not an LRU. Eviction
//! flushes the evicted chunk before dropping it, so a full cache never
//! silently loses writes.

use std::collections::HashMap;

use log::debug;

use crate::chunk::Chunk;
use crate::data_type::ReflectedType;
use crate::error::Error;
use crate::Coord;

/// Default ring capacity, used when an [Array] is opened without an
/// explicit override.
pub const MAX: usize = 6;

/// A bounded FIFO cache of live [Chunk] handles, keyed by chunk id.
///
/// `begin`/`end` track the ring's occupied span over `slots`; insertion
/// beyond `capacity` evicts `slots[begin]` and advances `begin`, giving
/// first-in-first-out eviction instead of recency-based eviction.
pub struct ChunkCache<T: ReflectedType> {
    capacity: usize,
    slots: Vec<Option<Coord>>,
    begin: usize,
    end: usize,
    len: usize,
    chunks: HashMap<Coord, Chunk<T>>,
}

impl<T: ReflectedType> ChunkCache<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        ChunkCache {
            capacity,
            slots: vec![None; capacity],
            begin: 0,
            end: 0,
            len: 0,
            chunks: HashMap::with_capacity(capacity),
        }
    }

    pub fn contains(&self, chunk_id: &[u64]) -> bool {
        self.chunks.contains_key(chunk_id)
    }

    pub fn get(&mut self, chunk_id: &[u64]) -> Result<&mut Chunk<T>, Error> {
        self.chunks.get_mut(chunk_id).ok_or(Error::NotCached)
    }

    /// Insert a newly-loaded chunk, evicting (and flushing) the oldest
    /// entry if the ring is already full.
    pub fn insert(&mut self, chunk_id: Coord, chunk: Chunk<T>) -> Result<(), Error> {
        if self.len == self.capacity {
            self.evict_oldest()?;
        }
        self.slots[self.end] = Some(chunk_id.clone());
        self.end = (self.end + 1) % self.capacity;
        self.len += 1;
        self.chunks.insert(chunk_id, chunk);
        Ok(())
    }

    fn evict_oldest(&mut self) -> Result<(), Error> {
        let slot = self.slots[self.begin].take().expect("full ring has a slot at begin");
        self.begin = (self.begin + 1) % self.capacity;
        self.len -= 1;
        if let Some(mut chunk) = self.chunks.remove(&slot) {
            debug!("evicting chunk {:?} from cache", slot);
            chunk.flush()?;
        }
        Ok(())
    }

    /// Flush and drop every cached chunk, in FIFO order. Called when an
    /// [Array] is dropped or explicitly closed.
    pub fn flush_all(&mut self) -> Result<(), Error> {
        while self.len > 0 {
            self.evict_oldest()?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
