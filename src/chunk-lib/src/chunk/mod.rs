mod file_chunk;

pub use file_chunk::*;

use crate::{ChunkResult, Element, Layout};

/// A single in-memory block of a chunked array, persisted at a bound path.
///
/// Implementations own their buffer and dirty flag. Loading is lazy: a chunk
/// reads its bound path on the first element access after a bind, not when
/// the path is bound.
pub trait Chunk: Clone {
    type Value: Element;
    type Config;

    /// Currently bound storage path, empty when unbound.
    fn path(&self) -> &str;

    /// Rebinds the chunk to `path`. Dirty contents are written back to the
    /// previous path first; an error leaves the old binding in place.
    fn bind_path(&mut self, path: &str) -> ChunkResult<()>;

    fn resize(&mut self, shape: &[usize], layout: Layout);

    fn shape(&self) -> &[usize];

    /// Hands the current contents to the storage backend, which decides
    /// from the dirty state whether anything is written.
    fn flush(&mut self) -> ChunkResult<()>;

    fn configure_format(&mut self, config: &Self::Config);

    /// Drops the in-memory contents without writing them; the next access reloads.
    fn invalidate(&mut self);

    fn is_dirty(&self) -> bool;

    fn get(&mut self, index: &[usize]) -> ChunkResult<Self::Value>;

    fn set(&mut self, index: &[usize], value: Self::Value) -> ChunkResult<()>;
}
