use super::{codec_runtime, FormatConfig};
use crate::{decode_elements, encode_elements, ChunkError, ChunkResult, Element};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

pub const GZIP_FORMAT_NAME: &str = "gzip";
const DEFAULT_GZIP_LEVEL: u32 = 5;

/// Element bytes in a gzip stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GzipConfig {
    pub big_endian: bool,
    pub level: u32,
}

impl Default for GzipConfig {
    fn default() -> Self {
        Self {
            big_endian: codec_runtime().host_big_endian,
            level: DEFAULT_GZIP_LEVEL,
        }
    }
}

impl FormatConfig for GzipConfig {
    fn name(&self) -> &'static str {
        GZIP_FORMAT_NAME
    }

    fn dump<T: Element>(&self, data: &[T], writer: &mut dyn Write) -> ChunkResult<()> {
        if self.level > 9 {
            return Err(ChunkError::InvalidConfig(format!(
                "gzip level {} not in 0..=9",
                self.level
            )));
        }
        let payload = encode_elements(data, self.big_endian);
        let mut encoder = GzEncoder::new(writer, Compression::new(self.level));
        encoder
            .write_all(&payload)
            .map_err(|e| ChunkError::EncodeError(format!("gzip write failed: {}", e)))?;
        let writer = encoder
            .finish()
            .map_err(|e| ChunkError::EncodeError(format!("gzip finish failed: {}", e)))?;
        writer.flush()?;
        Ok(())
    }

    fn load<T: Element>(&self, reader: &mut dyn Read) -> ChunkResult<Vec<T>> {
        let mut decoder = GzDecoder::new(reader);
        let mut buf = Vec::new();
        decoder
            .read_to_end(&mut buf)
            .map_err(|e| ChunkError::DecodeError(format!("gzip read failed: {}", e)))?;
        decode_elements(&buf, self.big_endian)
    }
}
