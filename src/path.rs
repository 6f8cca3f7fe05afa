//! Filesystem layout helpers: chunk file naming and the scratch directory
//! used for atomic header/chunk writes.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::Coord;

/// Chunk files are named by dot-joined unsigned decimal chunk id components,
/// e.g. chunk id `[1, 2]` -> `"1.2"`.
pub fn chunk_file_name(chunk_id: &[u64]) -> String {
    chunk_id
        .iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join(".")
}

pub fn chunk_path(array_path: &Path, chunk_id: &[u64]) -> PathBuf {
    array_path.join(chunk_file_name(chunk_id))
}

/// Parse a chunk file's name back into a chunk id.
pub fn parse_chunk_file_name(name: &str) -> Option<Coord> {
    name.split('.')
        .map(|part| part.parse::<u64>().ok())
        .collect()
}

static TEMP_DIR: OnceLock<tempfile::TempDir> = OnceLock::new();

/// The process-wide scratch directory backing [create_temp_array_path].
/// Created lazily on first use and removed on process exit.
fn temp_dir() -> &'static Path {
    TEMP_DIR
        .get_or_init(|| tempfile::Builder::new().prefix("zarr2store-").tempdir().expect("create temp dir"))
        .path()
}

/// A fresh, not-yet-existing path under the scratch directory, suitable for
/// staging a new array's directory before it is moved into place.
pub fn create_temp_array_path() -> PathBuf {
    temp_dir().join(uuid_like_name())
}

/// A reasonably-unique name without pulling in a UUID dependency: the
/// scratch directory itself is unique per process, so a monotonic counter
/// is enough to avoid collisions within it.
fn uuid_like_name() -> String {
    use std::sync::atomic::{AtomicU64, Ordering};
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    format!("array-{}", COUNTER.fetch_add(1, Ordering::Relaxed))
}
