use super::IoHandler;
use crate::{ChunkError, ChunkResult, Element, FormatConfig};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind};
use std::path::{Path, PathBuf};

const CHUNK_TMP_EXT: &str = "tmp";

/// One local file per chunk.
#[derive(Debug, Clone, Default)]
pub struct DiskHandler<F: FormatConfig> {
    format: F,
}

impl<F: FormatConfig> DiskHandler<F> {
    pub fn new(format: F) -> Self {
        Self { format }
    }

    fn tmp_path(path: &Path) -> PathBuf {
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".");
        tmp.push(CHUNK_TMP_EXT);
        PathBuf::from(tmp)
    }
}

impl<F: FormatConfig> IoHandler for DiskHandler<F> {
    type Config = F;

    fn configure_format(&mut self, config: &F) {
        self.format = config.clone();
    }

    fn format(&self) -> &F {
        &self.format
    }

    fn read<T: Element>(&self, path: &str) -> ChunkResult<Option<Vec<T>>> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                warn!("DiskHandler: open chunk file {} failed! {}", path, e);
                return Err(ChunkError::IoError(format!("open {} failed: {}", path, e)));
            }
        };
        let mut reader = BufReader::new(file);
        let data = self.format.load(&mut reader)?;
        Ok(Some(data))
    }

    fn write<T: Element>(&self, data: &[T], path: &str, dirty: bool) -> ChunkResult<bool> {
        if !self.format.will_dump(dirty) {
            return Ok(false);
        }

        let final_path = Path::new(path);
        if let Some(parent) = final_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                debug!("DiskHandler: create chunk dir:{}", parent.display());
                fs::create_dir_all(parent)
                    .map_err(|e| ChunkError::IoError(format!("create chunk dir failed: {}", e)))?;
            }
        }

        // write the whole payload aside, then move it over the previous version
        let tmp_path = Self::tmp_path(final_path);
        {
            let file = File::create(&tmp_path).map_err(|e| {
                warn!("DiskHandler: create {} failed! {}", tmp_path.display(), e);
                ChunkError::IoError(format!("create {} failed: {}", tmp_path.display(), e))
            })?;
            let mut writer = BufWriter::new(file);
            self.format.dump(data, &mut writer)?;
        }
        fs::rename(&tmp_path, final_path).map_err(|e| {
            ChunkError::IoError(format!("rename chunk file to {} failed: {}", path, e))
        })?;
        debug!(
            "DiskHandler: wrote {} elements as {} to {}",
            data.len(),
            self.format.name(),
            path
        );
        Ok(true)
    }
}
