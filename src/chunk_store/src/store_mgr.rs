//! ChunkStoreManager maps the unbounded space of chunk coordinates onto a
//! fixed pool of in-memory chunks.
//!
//! Resolving a coordinate:
//! 1. Empty coordinate (zero-dimensional array): slot 0, no lookup
//! 2. Coordinate already resident: that slot, unchanged
//! 3. A slot never assigned: bind it to the coordinate's path
//! 4. Pool full: rebind the slot under the walking unload index and advance
//!    the index, so slots are reused round-robin
//!
//! Rebinding is where a chunk writes back its dirty contents, so eviction may
//! perform I/O. Loading is left to the chunk, on first element access.
use crate::{ChunkPool, ChunkStoreConfig, DotPathTranslator, PathTranslator, PoolSize};
use chunk_lib::{
    checked_size, grid_shape, Chunk, ChunkCoordinate, ChunkError, ChunkResult, Element,
    FileChunk, FileMode, IoHandler, Layout,
};
use log::{debug, info, warn};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Suffix of the old store directory while `reset_to_directory` swaps in a new one.
const STORE_BACKUP_SUFFIX: &str = ".old";

#[derive(Debug, Clone)]
pub struct ChunkStoreManager<C: Chunk, P: PathTranslator = DotPathTranslator> {
    shape: Vec<usize>,
    chunk_shape: Vec<usize>,
    layout: Layout,
    pool_size: PoolSize,
    pool: ChunkPool<C>,
    path_translator: P,
    /// Unbound copy of the slot chunk, used to build replacement stores.
    prototype: C,
    temp_root: Option<PathBuf>,
}

pub type FileChunkStore<T, H> = ChunkStoreManager<FileChunk<T, H>, DotPathTranslator>;

/// Store of file-backed chunks that fall back to `init_value` (or the
/// element default) for chunks with nothing stored yet.
pub fn file_chunk_store<T: Element, H: IoHandler>(
    shape: &[usize],
    chunk_shape: &[usize],
    directory: &str,
    pool_size: PoolSize,
    handler: H,
    init_value: Option<T>,
) -> ChunkResult<FileChunkStore<T, H>> {
    let prototype = match init_value {
        Some(value) => FileChunk::with_init_value(handler, FileMode::InitOnFail, value),
        None => FileChunk::new(handler, FileMode::InitOnFail),
    };
    ChunkStoreManager::new(
        shape,
        chunk_shape,
        directory,
        pool_size,
        Layout::default(),
        prototype,
    )
}

impl<C: Chunk, P: PathTranslator> ChunkStoreManager<C, P> {
    pub fn new(
        shape: &[usize],
        chunk_shape: &[usize],
        directory: &str,
        pool_size: PoolSize,
        layout: Layout,
        prototype: C,
    ) -> ChunkResult<Self> {
        if shape.len() != chunk_shape.len() {
            return Err(ChunkError::InvalidConfig(format!(
                "shape {:?} and chunk shape {:?} differ in dimension",
                shape, chunk_shape
            )));
        }
        if chunk_shape.iter().any(|extent| *extent == 0) {
            return Err(ChunkError::InvalidConfig(format!(
                "chunk shape {:?} has a zero extent",
                chunk_shape
            )));
        }

        let slots = pool_size.resolve(&grid_shape(shape, chunk_shape))?;

        let mut path_translator = P::default();
        path_translator.set_root(directory);

        let mut pool = ChunkPool::new(&prototype, slots, chunk_shape, layout);
        if shape.is_empty() {
            // the single chunk of a scalar array always lives in slot 0
            let scalar_path = path_translator.coordinate_to_path(&[]);
            pool.chunk_mut(0).bind_path(&scalar_path)?;
        }

        debug!(
            "ChunkStoreManager: created store at {} shape:{:?} chunk_shape:{:?} slots:{}",
            path_translator.root(),
            shape,
            chunk_shape,
            slots
        );

        Ok(Self {
            shape: shape.to_vec(),
            chunk_shape: chunk_shape.to_vec(),
            layout,
            pool_size,
            pool,
            path_translator,
            prototype,
            temp_root: None,
        })
    }

    pub fn from_config(config: &ChunkStoreConfig, prototype: C) -> ChunkResult<Self> {
        let mut store = Self::new(
            &config.shape,
            &config.chunk_shape,
            &config.directory,
            config.pool_size,
            config.layout,
            prototype,
        )?;
        store.temp_root = config.temp_root.clone();
        Ok(store)
    }

    pub fn config(&self) -> ChunkStoreConfig {
        ChunkStoreConfig {
            shape: self.shape.clone(),
            chunk_shape: self.chunk_shape.clone(),
            directory: self.directory().to_string(),
            pool_size: self.pool_size,
            layout: self.layout,
            temp_root: self.temp_root.clone(),
        }
    }

    /// New empty store with this store's chunk shape, pool size and chunk
    /// prototype, rooted at `directory` and covering `shape`.
    pub fn fresh_store(&self, shape: &[usize], directory: &str) -> ChunkResult<Self> {
        let mut store = Self::new(
            shape,
            &self.chunk_shape,
            directory,
            self.pool_size,
            self.layout,
            self.prototype.clone(),
        )?;
        store.temp_root = self.temp_root.clone();
        Ok(store)
    }

    pub fn resolve(&mut self, coord: &[usize]) -> ChunkResult<&mut C> {
        if coord.is_empty() {
            return Ok(self.pool.chunk_mut(0));
        }

        if let Some(slot) = self.pool.find(coord) {
            return Ok(self.pool.chunk_mut(slot));
        }

        let path = self.path_translator.coordinate_to_path(coord);
        if let Some(slot) = self.pool.find_free() {
            debug!("ChunkStoreManager: load {:?} into free slot {}", coord, slot);
            self.pool.assign(slot, coord, &path)?;
            return Ok(self.pool.chunk_mut(slot));
        }

        let slot = self.pool.unload_index();
        debug!(
            "ChunkStoreManager: evict {:?} from slot {} for {:?}",
            self.pool.index_of(slot),
            slot,
            coord
        );
        self.pool.assign(slot, coord, &path).map_err(|e| {
            warn!(
                "ChunkStoreManager: evicting slot {} for {:?} failed! {}",
                slot, coord, e
            );
            e
        })?;
        self.pool.advance_unload_index();
        Ok(self.pool.chunk_mut(slot))
    }

    /// Slot currently holding `coord`, if resident.
    pub fn slot_of(&self, coord: &[usize]) -> Option<usize> {
        if coord.is_empty() {
            return Some(0);
        }
        self.pool.find(coord)
    }

    pub fn chunk(&self, slot: usize) -> Option<&C> {
        (slot < self.pool.len()).then(|| self.pool.chunk(slot))
    }

    pub fn resident_coordinates(&self) -> Vec<ChunkCoordinate> {
        self.pool.resident()
    }

    /// Records a new logical shape. The pool is left untouched: its size is
    /// independent of how many chunks the array spans.
    pub fn resize(&mut self, shape: &[usize]) {
        self.shape = shape.to_vec();
    }

    pub fn flush(&mut self) -> ChunkResult<()> {
        for chunk in self.pool.chunks_mut() {
            chunk.flush()?;
        }
        Ok(())
    }

    pub fn configure_format(&mut self, config: &C::Config) {
        self.prototype.configure_format(config);
        for chunk in self.pool.chunks_mut() {
            chunk.configure_format(config);
        }
    }

    /// First of `0`, `1`, `2`, ... that does not exist under the temp root.
    pub fn get_temporary_directory(&self) -> String {
        let tmp_root = self
            .temp_root
            .clone()
            .unwrap_or_else(std::env::temp_dir);
        let mut count: usize = 0;
        while tmp_root.join(count.to_string()).exists() {
            count += 1;
        }
        tmp_root.join(count.to_string()).to_string_lossy().to_string()
    }

    /// Replaces this store's directory with `directory`, which must hold a
    /// complete, flushed store over the same coordinate space.
    ///
    /// The old directory is moved aside first and only removed once the new
    /// one is in place; if moving the new one in fails, the old directory is
    /// put back. Slot tags are kept since the paths under the root are
    /// unchanged, but every slot drops its in-memory contents so the next
    /// access reads the replacement files.
    pub fn reset_to_directory(&mut self, directory: &str) -> ChunkResult<()> {
        let root = self.directory().to_string();
        let target = root.trim_end_matches(['/', std::path::MAIN_SEPARATOR]);
        if target.is_empty() {
            return Err(ChunkError::InvalidParam(
                "store has no directory to reset".to_string(),
            ));
        }
        if !Path::new(directory).is_dir() {
            warn!(
                "ChunkStoreManager: reset {} failed! {} is not a directory",
                target, directory
            );
            return Err(ChunkError::NotFound(format!(
                "replacement store dir {}",
                directory
            )));
        }

        let backup = format!("{}{}", target, STORE_BACKUP_SUFFIX);
        match fs::remove_dir_all(&backup) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                warn!("ChunkStoreManager: remove stale {} failed! {}", backup, e);
                return Err(ChunkError::IoError(format!(
                    "remove stale backup {} failed: {}",
                    backup, e
                )));
            }
        }
        let has_old = match fs::rename(target, &backup) {
            Ok(()) => true,
            Err(e) if e.kind() == ErrorKind::NotFound => false,
            Err(e) => {
                warn!(
                    "ChunkStoreManager: move {} to {} failed! {}",
                    target, backup, e
                );
                return Err(ChunkError::IoError(format!(
                    "move store dir {} aside failed: {}",
                    target, e
                )));
            }
        };

        if let Err(e) = fs::rename(directory, target) {
            warn!(
                "ChunkStoreManager: rename {} to {} failed! {}",
                directory, target, e
            );
            if has_old {
                fs::rename(&backup, target).map_err(|restore_err| {
                    warn!(
                        "ChunkStoreManager: restore {} from {} failed! {}",
                        target, backup, restore_err
                    );
                    ChunkError::IoError(format!(
                        "rename {} to {} failed: {}; old store left at {}: {}",
                        directory, target, e, backup, restore_err
                    ))
                })?;
            }
            return Err(ChunkError::IoError(format!(
                "rename {} to {} failed: {}",
                directory, target, e
            )));
        }

        if has_old {
            if let Err(e) = fs::remove_dir_all(&backup) {
                warn!("ChunkStoreManager: remove {} failed! {}", backup, e);
            }
        }

        for chunk in self.pool.chunks_mut() {
            chunk.invalidate();
        }
        self.pool.reset_unload_index();
        info!("ChunkStoreManager: reset {} from {}", target, directory);
        Ok(())
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn chunk_shape(&self) -> &[usize] {
        &self.chunk_shape
    }

    pub fn grid_shape(&self) -> Vec<usize> {
        grid_shape(&self.shape, &self.chunk_shape)
    }

    /// Number of logical chunks, `None` when it does not fit in a `usize`.
    pub fn chunk_count(&self) -> Option<usize> {
        checked_size(&self.grid_shape())
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn pool_size(&self) -> usize {
        self.pool.len()
    }

    pub fn unload_index(&self) -> usize {
        self.pool.unload_index()
    }

    pub fn directory(&self) -> &str {
        self.path_translator.root()
    }

    pub fn path_translator(&self) -> &P {
        &self.path_translator
    }

    pub fn set_temp_root(&mut self, temp_root: PathBuf) {
        self.temp_root = Some(temp_root);
    }
}
