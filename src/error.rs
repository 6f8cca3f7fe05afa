use std::path::PathBuf;

use thiserror::Error;

/// All failure modes surfaced at the public API, per the error handling design.
///
/// Fill-value substitution on a missing chunk file is not represented here:
/// it is defined semantics, not a failure.
#[derive(Error, Debug)]
pub enum Error {
    #[error("index {index} out of range (size {size})")]
    OutOfRange { index: u64, size: u64 },

    #[error("expected {expected} dimensions, got {actual}")]
    BadDimensions { expected: usize, actual: usize },

    #[error("position is not inside chunk {chunk_id:?}")]
    OutOfChunk { chunk_id: Vec<u64> },

    #[error("chunk file name {name:?} is not dot-separated unsigned decimals")]
    BadChunkName { name: String },

    #[error("could not decode chunk at {path}: {reason}")]
    ChunkDecode { path: PathBuf, reason: String },

    #[error("could not encode chunk at {path}: {reason}")]
    ChunkEncode { path: PathBuf, reason: String },

    #[error("unknown compressor id {id:?}")]
    UnknownCompressor { id: String },

    #[error("unknown or malformed dtype string {dtype:?}")]
    UnknownDtype { dtype: String },

    #[error("array dtype mismatch: header has {header:?}, typed open requested {requested:?}")]
    DtypeMismatch { header: String, requested: String },

    #[error("io error at {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cache accessor invoked without a prior contains() check")]
    NotCached,
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::IoError {
            path: path.into(),
            source,
        }
    }
}
