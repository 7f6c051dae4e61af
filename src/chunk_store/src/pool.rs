use chunk_lib::{checked_size, Chunk, ChunkCoordinate, ChunkError, ChunkResult, Layout};
use serde::{Deserialize, Serialize};

/// Number of physical chunk slots kept in memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolSize {
    Bounded(usize),
    /// One slot per logical chunk, nothing is ever evicted.
    FullResidency,
}

impl Default for PoolSize {
    fn default() -> Self {
        PoolSize::Bounded(1)
    }
}

impl PoolSize {
    /// Number of slots for a store whose chunk grid is `grid_shape`. Only
    /// `FullResidency` looks at the grid.
    pub fn resolve(&self, grid_shape: &[usize]) -> ChunkResult<usize> {
        let size = match self {
            PoolSize::Bounded(n) => *n,
            PoolSize::FullResidency => checked_size(grid_shape).ok_or_else(|| {
                ChunkError::InvalidConfig(format!(
                    "chunk grid {:?} is too large for full residency",
                    grid_shape
                ))
            })?,
        };
        if size == 0 {
            return Err(ChunkError::InvalidConfig(format!(
                "pool size {:?} resolves to zero slots (chunk grid {:?})",
                self, grid_shape
            )));
        }
        Ok(size)
    }
}

/// Fixed set of chunk slots, each tagged with the coordinate it currently holds.
///
/// `indices[i]` is the coordinate resident in `chunks[i]`, `None` for a slot
/// never assigned. A coordinate is resident in at most one slot.
#[derive(Debug, Clone)]
pub struct ChunkPool<C: Chunk> {
    chunks: Vec<C>,
    indices: Vec<Option<ChunkCoordinate>>,
    unload_index: usize,
}

impl<C: Chunk> ChunkPool<C> {
    /// Builds `size` slots from `prototype`, each sized once to `chunk_shape`.
    pub fn new(prototype: &C, size: usize, chunk_shape: &[usize], layout: Layout) -> Self {
        let mut chunks = vec![prototype.clone(); size];
        for chunk in chunks.iter_mut() {
            chunk.resize(chunk_shape, layout);
        }
        Self {
            chunks,
            indices: vec![None; size],
            unload_index: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn find(&self, coord: &[usize]) -> Option<usize> {
        self.indices
            .iter()
            .position(|index| index.as_deref() == Some(coord))
    }

    pub fn find_free(&self) -> Option<usize> {
        self.indices.iter().position(|index| index.is_none())
    }

    pub fn index_of(&self, slot: usize) -> Option<&[usize]> {
        self.indices.get(slot).and_then(|index| index.as_deref())
    }

    /// Binds `slot` to `path` and tags it with `coord`. The tag only changes
    /// once the chunk accepted the new binding.
    pub fn assign(&mut self, slot: usize, coord: &[usize], path: &str) -> ChunkResult<()> {
        self.chunks[slot].bind_path(path)?;
        self.indices[slot] = Some(coord.to_vec());
        Ok(())
    }

    pub fn unload_index(&self) -> usize {
        self.unload_index
    }

    pub fn advance_unload_index(&mut self) {
        self.unload_index = (self.unload_index + 1) % self.chunks.len();
    }

    pub fn reset_unload_index(&mut self) {
        self.unload_index = 0;
    }

    pub fn chunk(&self, slot: usize) -> &C {
        &self.chunks[slot]
    }

    pub fn chunk_mut(&mut self, slot: usize) -> &mut C {
        &mut self.chunks[slot]
    }

    pub fn chunks_mut(&mut self) -> std::slice::IterMut<'_, C> {
        self.chunks.iter_mut()
    }

    pub fn resident(&self) -> Vec<ChunkCoordinate> {
        self.indices.iter().flatten().cloned().collect()
    }
}
