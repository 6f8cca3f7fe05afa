//! Pure functions mapping between linear index, N-D position, chunk id, and
//! in-chunk offset. Every element access in [crate::array] flows through
//! [find_chunk_index], so the storage [crate::Order] is honored exactly
//! once per access.

use crate::{error::Error, order::Order, same_rank, Coord};

/// Mixed-radix evaluation: stride 1 at dimension 0, stride `Π_{k<i} shape[k]`
/// at dimension `i`.
pub fn flatten(position: &[u64], shape: &[u64]) -> Result<u64, Error> {
    same_rank(shape, position)?;
    let mut index: u64 = 0;
    let mut stride: u64 = 1;
    for (p, s) in position.iter().zip(shape.iter()) {
        index += p * stride;
        stride *= s;
    }
    Ok(index)
}

/// Inverse of [flatten], peeling axes off in the order [Order] dictates.
pub fn find_position(mut index: u64, shape: &[u64], order: Order) -> Coord {
    let mut position = Coord::from_elem(0, shape.len());
    for axis in order.axis_order(shape.len()) {
        let extent = shape[axis];
        position[axis] = index % extent;
        index /= extent;
    }
    position
}

/// Elementwise integer division: the chunk id containing `position`.
pub fn find_chunk_id(position: &[u64], chunks: &[u64]) -> Result<Coord, Error> {
    same_rank(chunks, position)?;
    Ok(position
        .iter()
        .zip(chunks.iter())
        .map(|(p, c)| p / c)
        .collect())
}

/// Composition of [find_position] and [find_chunk_id]: the chunk id
/// containing the element at linear `index`.
pub fn find_chunk_id_for_index(
    index: u64,
    shape: &[u64],
    chunks: &[u64],
    order: Order,
) -> Result<Coord, Error> {
    let position = find_position(index, shape, order);
    find_chunk_id(&position, chunks)
}

/// `offset[i] = position[i] - chunk_id[i] * chunks[i]`.
///
/// Fails with [Error::OutOfChunk] if any component would underflow, i.e. the
/// claimed chunk id does not actually contain `position`.
pub fn find_chunk_position(
    position: &[u64],
    chunk_id: &[u64],
    chunks: &[u64],
) -> Result<Coord, Error> {
    same_rank(position, chunk_id)?;
    same_rank(position, chunks)?;
    let mut offset = Coord::with_capacity(position.len());
    for ((p, id), c) in position.iter().zip(chunk_id.iter()).zip(chunks.iter()) {
        let base = id * c;
        if *p < base {
            return Err(Error::OutOfChunk {
                chunk_id: chunk_id.to_vec(),
            });
        }
        offset.push(p - base);
    }
    Ok(offset)
}

/// The in-chunk linear offset for the element at linear `index`: equal to
/// `flatten(find_chunk_position(...), chunks)`.
pub fn find_chunk_index(
    index: u64,
    shape: &[u64],
    chunks: &[u64],
    order: Order,
) -> Result<u64, Error> {
    let position = find_position(index, shape, order);
    let chunk_id = find_chunk_id(&position, chunks)?;
    let in_chunk = find_chunk_position(&position, &chunk_id, chunks)?;
    flatten(&in_chunk, chunks)
}
