use super::FormatConfig;
use crate::{decode_elements, encode_elements, ChunkResult, Element};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

pub const BINARY_FORMAT_NAME: &str = "binary";

/// Raw element bytes without header. The chunk shape is not stored, only the data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BinaryConfig {
    #[serde(default)]
    pub big_endian: bool,
}

impl FormatConfig for BinaryConfig {
    fn name(&self) -> &'static str {
        BINARY_FORMAT_NAME
    }

    fn dump<T: Element>(&self, data: &[T], writer: &mut dyn Write) -> ChunkResult<()> {
        writer.write_all(&encode_elements(data, self.big_endian))?;
        writer.flush()?;
        Ok(())
    }

    fn load<T: Element>(&self, reader: &mut dyn Read) -> ChunkResult<Vec<T>> {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;
        decode_elements(&buf, self.big_endian)
    }
}
