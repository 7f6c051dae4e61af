use crate::PoolSize;
use chunk_lib::{ChunkError, ChunkResult, Layout};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const STORE_CONFIG_FILE_NAME: &str = "chunk_store.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkStoreConfig {
    pub shape: Vec<usize>,
    pub chunk_shape: Vec<usize>,
    pub directory: String,
    #[serde(default)]
    pub pool_size: PoolSize,
    #[serde(default)]
    pub layout: Layout,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub temp_root: Option<PathBuf>,
}

impl ChunkStoreConfig {
    pub fn new(shape: &[usize], chunk_shape: &[usize], directory: &str) -> Self {
        Self {
            shape: shape.to_vec(),
            chunk_shape: chunk_shape.to_vec(),
            directory: directory.to_string(),
            pool_size: PoolSize::default(),
            layout: Layout::default(),
            temp_root: None,
        }
    }

    pub fn load(path: &Path) -> ChunkResult<Self> {
        let config_str = fs::read_to_string(path).map_err(|e| {
            warn!("ChunkStoreConfig: read {} failed! {}", path.display(), e);
            ChunkError::NotFound(format!("chunk store config {}", path.display()))
        })?;
        serde_json::from_str::<ChunkStoreConfig>(&config_str).map_err(|e| {
            warn!("ChunkStoreConfig: parse {} failed! {}", path.display(), e);
            ChunkError::InvalidConfig(format!("chunk store config invalid: {}", e))
        })
    }

    pub fn save(&self, path: &Path) -> ChunkResult<()> {
        let config_str = serde_json::to_string_pretty(self)
            .map_err(|e| ChunkError::Internal(e.to_string()))?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                debug!("ChunkStoreConfig: create config dir:{}", parent.display());
                fs::create_dir_all(parent)
                    .map_err(|e| ChunkError::IoError(format!("create config dir failed: {}", e)))?;
            }
        }
        fs::write(path, config_str)
            .map_err(|e| ChunkError::IoError(format!("write config failed: {}", e)))?;
        Ok(())
    }
}
