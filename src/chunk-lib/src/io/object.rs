use super::IoHandler;
use crate::{ChunkError, ChunkResult, Element, FormatConfig};
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::{Arc, Mutex, MutexGuard};

type Buckets = HashMap<String, HashMap<String, Vec<u8>>>;

/// In-process object storage: buckets of named byte objects.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    buckets: Mutex<Buckets>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> ChunkResult<MutexGuard<'_, Buckets>> {
        self.buckets
            .lock()
            .map_err(|e| ChunkError::Internal(format!("object store lock poisoned: {}", e)))
    }

    pub fn put_object(&self, bucket: &str, key: &str, data: Vec<u8>) -> ChunkResult<()> {
        let mut buckets = self.lock()?;
        buckets
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string(), data);
        Ok(())
    }

    pub fn get_object(&self, bucket: &str, key: &str) -> ChunkResult<Option<Vec<u8>>> {
        let buckets = self.lock()?;
        Ok(buckets.get(bucket).and_then(|objects| objects.get(key)).cloned())
    }

    pub fn delete_object(&self, bucket: &str, key: &str) -> ChunkResult<bool> {
        let mut buckets = self.lock()?;
        Ok(buckets
            .get_mut(bucket)
            .map(|objects| objects.remove(key).is_some())
            .unwrap_or(false))
    }

    /// Keys of `bucket`, sorted.
    pub fn list_objects(&self, bucket: &str) -> ChunkResult<Vec<String>> {
        let buckets = self.lock()?;
        let mut keys: Vec<String> = buckets
            .get(bucket)
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        Ok(keys)
    }
}

/// Splits `bucket/key/...` at the first separator.
pub fn split_bucket_path(path: &str) -> ChunkResult<(&str, &str)> {
    match path.split_once('/') {
        Some((bucket, key)) if !bucket.is_empty() && !key.is_empty() => Ok((bucket, key)),
        _ => Err(ChunkError::InvalidParam(format!(
            "object path {} is not of the form bucket/key",
            path
        ))),
    }
}

/// Chunks stored as objects; the first path component names the bucket.
#[derive(Debug, Clone)]
pub struct ObjectStoreHandler<F: FormatConfig> {
    store: Arc<MemoryObjectStore>,
    format: F,
}

impl<F: FormatConfig> ObjectStoreHandler<F> {
    pub fn new(store: Arc<MemoryObjectStore>, format: F) -> Self {
        Self { store, format }
    }

    pub fn store(&self) -> &Arc<MemoryObjectStore> {
        &self.store
    }
}

impl<F: FormatConfig> IoHandler for ObjectStoreHandler<F> {
    type Config = F;

    fn configure_format(&mut self, config: &F) {
        self.format = config.clone();
    }

    fn format(&self) -> &F {
        &self.format
    }

    fn read<T: Element>(&self, path: &str) -> ChunkResult<Option<Vec<T>>> {
        let (bucket, key) = split_bucket_path(path)?;
        match self.store.get_object(bucket, key)? {
            Some(bytes) => {
                let data = self.format.load(&mut Cursor::new(bytes))?;
                Ok(Some(data))
            }
            None => Ok(None),
        }
    }

    fn write<T: Element>(&self, data: &[T], path: &str, dirty: bool) -> ChunkResult<bool> {
        if !self.format.will_dump(dirty) {
            return Ok(false);
        }
        let (bucket, key) = split_bucket_path(path)?;
        let mut payload = Vec::new();
        self.format.dump(data, &mut payload)?;
        self.store.put_object(bucket, key, payload)?;
        debug!("ObjectStoreHandler: put {} elements to {}", data.len(), path);
        Ok(true)
    }
}
