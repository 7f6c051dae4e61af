mod disk;
mod object;

pub use disk::*;
pub use object::*;

use crate::{ChunkResult, Element, FormatConfig};

/// Storage backend of a chunk: moves an encoded element buffer to and from a path.
pub trait IoHandler: Clone + Send {
    type Config: FormatConfig;

    fn configure_format(&mut self, config: &Self::Config);

    fn format(&self) -> &Self::Config;

    /// Returns `None` when nothing is stored at `path` yet.
    fn read<T: Element>(&self, path: &str) -> ChunkResult<Option<Vec<T>>>;

    /// Writes `data` to `path` if the format asks for it given `dirty`.
    /// Returns whether anything was written.
    fn write<T: Element>(&self, data: &[T], path: &str, dirty: bool) -> ChunkResult<bool>;
}
