use super::Chunk;
use crate::{
    compute_size, flat_index, strides_for, ChunkError, ChunkResult, Element, IoHandler, Layout,
};

/// How a chunk obtains its contents when it is first accessed after a bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileMode {
    /// Read the bound path; a missing payload is an error.
    Load,
    /// Never read, start from the init value.
    Init,
    /// Read the bound path, fall back to the init value when nothing is stored.
    InitOnFail,
}

#[derive(Debug, Clone)]
pub struct FileChunk<T: Element, H: IoHandler> {
    path: String,
    shape: Vec<usize>,
    strides: Vec<usize>,
    layout: Layout,
    data: Vec<T>,
    dirty: bool,
    loaded: bool,
    mode: FileMode,
    init_value: Option<T>,
    handler: H,
}

impl<T: Element, H: IoHandler> FileChunk<T, H> {
    pub fn new(handler: H, mode: FileMode) -> Self {
        Self {
            path: String::new(),
            shape: Vec::new(),
            strides: Vec::new(),
            layout: Layout::default(),
            data: Vec::new(),
            dirty: false,
            loaded: false,
            mode,
            init_value: None,
            handler,
        }
    }

    pub fn with_init_value(handler: H, mode: FileMode, init_value: T) -> Self {
        let mut chunk = Self::new(handler, mode);
        chunk.init_value = Some(init_value);
        chunk
    }

    pub fn size(&self) -> usize {
        compute_size(&self.shape)
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn mode(&self) -> FileMode {
        self.mode
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    fn fill_value(&self) -> T {
        self.init_value.unwrap_or_default()
    }

    fn ensure_loaded(&mut self) -> ChunkResult<()> {
        if self.loaded {
            return Ok(());
        }

        let size = self.size();
        let fill = self.fill_value();
        if self.path.is_empty() || self.mode == FileMode::Init {
            self.data.clear();
            self.data.resize(size, fill);
        } else {
            match self.handler.read::<T>(&self.path)? {
                Some(stored) => {
                    if stored.len() != size {
                        warn!(
                            "FileChunk: {} holds {} elements, chunk shape {:?} needs {}",
                            self.path,
                            stored.len(),
                            self.shape,
                            size
                        );
                        return Err(ChunkError::SizeMismatch(format!(
                            "{}: expected {} elements, found {}",
                            self.path,
                            size,
                            stored.len()
                        )));
                    }
                    self.data.clear();
                    self.data.extend_from_slice(&stored);
                }
                None => {
                    if self.mode == FileMode::Load {
                        return Err(ChunkError::NotFound(self.path.clone()));
                    }
                    self.data.clear();
                    self.data.resize(size, fill);
                }
            }
        }
        self.loaded = true;
        self.dirty = false;
        Ok(())
    }

    fn write_back(&mut self) -> ChunkResult<()> {
        if self.path.is_empty() || !self.loaded {
            return Ok(());
        }
        if self.handler.write(&self.data, &self.path, self.dirty)? {
            debug!("FileChunk: flushed {}", self.path);
        }
        self.dirty = false;
        Ok(())
    }

    pub fn get_mut(&mut self, index: &[usize]) -> ChunkResult<&mut T> {
        self.ensure_loaded()?;
        let offset = flat_index(index, &self.shape, &self.strides)?;
        self.dirty = true;
        Ok(&mut self.data[offset])
    }

    /// Contents in the chunk's memory layout.
    pub fn data(&mut self) -> ChunkResult<&[T]> {
        self.ensure_loaded()?;
        Ok(&self.data)
    }

    pub fn fill(&mut self, value: T) {
        let size = self.size();
        self.data.clear();
        self.data.resize(size, value);
        self.loaded = true;
        self.dirty = true;
    }
}

impl<T: Element, H: IoHandler> Chunk for FileChunk<T, H> {
    type Value = T;
    type Config = H::Config;

    fn path(&self) -> &str {
        &self.path
    }

    fn bind_path(&mut self, path: &str) -> ChunkResult<()> {
        if self.path == path {
            return Ok(());
        }
        if self.dirty {
            debug!("FileChunk: write back {} before rebinding to {}", self.path, path);
            self.write_back()?;
        }
        self.path = path.to_string();
        self.loaded = false;
        self.dirty = false;
        Ok(())
    }

    fn resize(&mut self, shape: &[usize], layout: Layout) {
        self.shape = shape.to_vec();
        self.layout = layout;
        self.strides = strides_for(shape, layout);
        if self.loaded {
            let fill = self.fill_value();
            self.data.resize(compute_size(shape), fill);
        } else {
            self.data.reserve(compute_size(shape));
        }
    }

    fn shape(&self) -> &[usize] {
        &self.shape
    }

    fn flush(&mut self) -> ChunkResult<()> {
        self.write_back()
    }

    fn configure_format(&mut self, config: &H::Config) {
        self.handler.configure_format(config);
    }

    fn invalidate(&mut self) {
        self.loaded = false;
        self.dirty = false;
    }

    fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn get(&mut self, index: &[usize]) -> ChunkResult<T> {
        self.ensure_loaded()?;
        let offset = flat_index(index, &self.shape, &self.strides)?;
        Ok(self.data[offset])
    }

    fn set(&mut self, index: &[usize], value: T) -> ChunkResult<()> {
        *self.get_mut(index)? = value;
        Ok(())
    }
}
