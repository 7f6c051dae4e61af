mod binary;
mod gzip;

pub use binary::*;
pub use gzip::*;

use crate::{ChunkResult, Element};
use once_cell::sync::Lazy;
use std::fmt::Debug;
use std::io::{Read, Write};

/// Serialization format of one chunk payload.
///
/// A format config is handed to every chunk of a store through
/// `configure_format`; the I/O handler asks it whether a write is needed and
/// uses it to encode/decode the element buffer.
pub trait FormatConfig: Clone + Default + Debug + Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether a chunk with the given dirty state has to be written on flush.
    fn will_dump(&self, dirty: bool) -> bool {
        dirty
    }

    fn dump<T: Element>(&self, data: &[T], writer: &mut dyn Write) -> ChunkResult<()>;

    fn load<T: Element>(&self, reader: &mut dyn Read) -> ChunkResult<Vec<T>>;
}

/// Process-wide codec state, initialised once on first use.
#[derive(Debug)]
pub struct CodecRuntime {
    pub host_big_endian: bool,
    pub codecs: Vec<&'static str>,
}

static CODEC_RUNTIME: Lazy<CodecRuntime> = Lazy::new(|| {
    let runtime = CodecRuntime {
        host_big_endian: cfg!(target_endian = "big"),
        codecs: vec![BINARY_FORMAT_NAME, GZIP_FORMAT_NAME],
    };
    info!(
        "codec runtime initialized: host_big_endian={}, codecs={:?}",
        runtime.host_big_endian, runtime.codecs
    );
    runtime
});

pub fn codec_runtime() -> &'static CodecRuntime {
    &CODEC_RUNTIME
}
