use crate::{ChunkStoreManager, DotPathTranslator, PathTranslator};
use chunk_lib::{checked_size, split_index, Chunk, ChunkError, ChunkResult};
use log::{debug, info, warn};
use std::fs;

/// Logical array view over a chunk store: element indices are split into a
/// chunk coordinate and an index inside that chunk.
#[derive(Debug, Clone)]
pub struct ChunkedArray<C: Chunk, P: PathTranslator = DotPathTranslator> {
    store: ChunkStoreManager<C, P>,
}

impl<C: Chunk, P: PathTranslator> ChunkedArray<C, P> {
    pub fn new(store: ChunkStoreManager<C, P>) -> Self {
        Self { store }
    }

    pub fn shape(&self) -> &[usize] {
        self.store.shape()
    }

    pub fn chunk_shape(&self) -> &[usize] {
        self.store.chunk_shape()
    }

    /// Number of elements, `None` when it does not fit in a `usize`.
    pub fn size(&self) -> Option<usize> {
        checked_size(self.shape())
    }

    pub fn chunks(&self) -> &ChunkStoreManager<C, P> {
        &self.store
    }

    pub fn chunks_mut(&mut self) -> &mut ChunkStoreManager<C, P> {
        &mut self.store
    }

    pub fn into_chunks(self) -> ChunkStoreManager<C, P> {
        self.store
    }

    fn check_index(&self, index: &[usize]) -> ChunkResult<()> {
        let shape = self.shape();
        if index.len() != shape.len() || index.iter().zip(shape).any(|(i, extent)| i >= extent) {
            return Err(ChunkError::OutOfBounds(format!(
                "index {:?} outside array shape {:?}",
                index, shape
            )));
        }
        Ok(())
    }

    pub fn get(&mut self, index: &[usize]) -> ChunkResult<C::Value> {
        self.check_index(index)?;
        let (coord, local) = split_index(index, self.store.chunk_shape());
        self.store.resolve(&coord)?.get(&local)
    }

    pub fn set(&mut self, index: &[usize], value: C::Value) -> ChunkResult<()> {
        self.check_index(index)?;
        let (coord, local) = split_index(index, self.store.chunk_shape());
        self.store.resolve(&coord)?.set(&local, value)
    }

    /// Every logical index in row-major order.
    pub fn indices(&self) -> RowMajorIndices {
        RowMajorIndices::new(self.shape())
    }

    pub fn to_vec(&mut self) -> ChunkResult<Vec<C::Value>> {
        let size = self.size().ok_or_else(|| {
            ChunkError::OutOfBounds(format!("array shape {:?} is too large", self.shape()))
        })?;
        let mut values = Vec::with_capacity(size);
        for index in self.indices() {
            values.push(self.get(&index)?);
        }
        Ok(values)
    }

    pub fn fill_with<F>(&mut self, mut f: F) -> ChunkResult<()>
    where
        F: FnMut(&[usize]) -> C::Value,
    {
        for index in self.indices() {
            let value = f(&index);
            self.set(&index, value)?;
        }
        Ok(())
    }

    /// Replaces the whole contents with `source`.
    ///
    /// A complete replacement store is written under a fresh temporary
    /// directory, flushed, and then swapped into this store's directory, so
    /// the old chunk files stay intact until the new ones are complete.
    pub fn assign_from<C2, P2>(&mut self, source: &mut ChunkedArray<C2, P2>) -> ChunkResult<()>
    where
        C2: Chunk<Value = C::Value>,
        P2: PathTranslator,
    {
        let shape = source.shape().to_vec();
        let tmp_dir = self.store.get_temporary_directory();
        fs::create_dir_all(&tmp_dir)
            .map_err(|e| ChunkError::IoError(format!("create {} failed: {}", tmp_dir, e)))?;
        debug!("ChunkedArray: build replacement store in {}", tmp_dir);

        if let Err(e) = self
            .build_replacement(source, &shape, &tmp_dir)
            .and_then(|()| self.store.reset_to_directory(&tmp_dir))
        {
            warn!("ChunkedArray: assign into {} failed! {}", self.store.directory(), e);
            if let Err(remove_err) = fs::remove_dir_all(&tmp_dir) {
                if remove_err.kind() != std::io::ErrorKind::NotFound {
                    warn!("ChunkedArray: remove {} failed! {}", tmp_dir, remove_err);
                }
            }
            return Err(e);
        }
        self.store.resize(&shape);
        info!(
            "ChunkedArray: assigned {:?} elements into {}",
            shape,
            self.store.directory()
        );
        Ok(())
    }

    /// Writes a flushed copy of `source` as a new store under `tmp_dir`.
    fn build_replacement<C2, P2>(
        &self,
        source: &mut ChunkedArray<C2, P2>,
        shape: &[usize],
        tmp_dir: &str,
    ) -> ChunkResult<()>
    where
        C2: Chunk<Value = C::Value>,
        P2: PathTranslator,
    {
        let mut tmp = ChunkedArray::new(self.store.fresh_store(shape, tmp_dir)?);
        for index in source.indices() {
            let value = source.get(&index)?;
            tmp.set(&index, value)?;
        }
        tmp.chunks_mut().flush()
    }
}

/// Row-major walk over all indices of a shape. A zero-dimensional shape
/// yields the single empty index; a shape with a zero extent yields nothing.
#[derive(Debug, Clone)]
pub struct RowMajorIndices {
    shape: Vec<usize>,
    next: Option<Vec<usize>>,
}

impl RowMajorIndices {
    pub fn new(shape: &[usize]) -> Self {
        let next = if shape.iter().any(|extent| *extent == 0) {
            None
        } else {
            Some(vec![0; shape.len()])
        };
        Self {
            shape: shape.to_vec(),
            next,
        }
    }
}

impl Iterator for RowMajorIndices {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Vec<usize>> {
        let current = self.next.take()?;
        let mut following = current.clone();
        for dim in (0..self.shape.len()).rev() {
            following[dim] += 1;
            if following[dim] < self.shape[dim] {
                self.next = Some(following);
                return Some(current);
            }
            following[dim] = 0;
        }
        Some(current)
    }
}
