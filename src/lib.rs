use smallvec::SmallVec;

mod array;
mod cache;
mod chunk;
pub mod codec;
mod collection;
mod data_type;
mod error;
pub mod indexing;
mod order;
mod header;
mod group;
mod path;

pub use array::Array;
pub use collection::{Attributes, BaseCollection, IArray};
pub use data_type::{DataType, Endian, ReflectedType};
pub use error::Error;
pub use group::{Group, Node};
pub use header::Header;
pub use order::Order;

const COORD_SMALLVEC_SIZE: usize = 4;

/// N-D coordinate: a shape, a position, or a chunk id.
///
/// Stack-allocated up to [COORD_SMALLVEC_SIZE] dimensions, matching the
/// common case of 2-4 axis arrays without forcing a heap allocation.
pub type Coord = SmallVec<[u64; COORD_SMALLVEC_SIZE]>;

pub(crate) fn same_rank(a: &[u64], b: &[u64]) -> Result<usize, Error> {
    if a.len() == b.len() {
        Ok(a.len())
    } else {
        Err(Error::BadDimensions {
            expected: a.len(),
            actual: b.len(),
        })
    }
}
