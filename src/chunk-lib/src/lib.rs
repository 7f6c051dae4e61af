mod chunk;
mod element;
mod format;
mod io;
mod layout;

pub use chunk::*;
pub use element::*;
pub use format::*;
pub use io::*;
pub use layout::*;

use thiserror::Error;

#[macro_use]
extern crate log;

#[derive(Error, Debug)]
pub enum ChunkError {
    #[error("internal error: {0}")]
    Internal(String),
    #[error("chunk not found: {0}")]
    NotFound(String),
    #[error("I/O error: {0}")]
    IoError(String),
    #[error("invalid param: {0}")]
    InvalidParam(String),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("size mismatch: {0}")]
    SizeMismatch(String),
    #[error("decode error: {0}")]
    DecodeError(String),
    #[error("encode error: {0}")]
    EncodeError(String),
    #[error("index out of bounds: {0}")]
    OutOfBounds(String),
    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}

impl ChunkError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ChunkError::NotFound(_))
    }
}

pub type ChunkResult<T> = std::result::Result<T, ChunkError>;

impl From<std::io::Error> for ChunkError {
    fn from(err: std::io::Error) -> Self {
        ChunkError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for ChunkError {
    fn from(err: serde_json::Error) -> Self {
        ChunkError::DecodeError(err.to_string())
    }
}
