use crate::{ChunkError, ChunkResult};
use std::fmt::Debug;

/// Fixed-width value stored in a chunk.
///
/// Every element has an exact byte width and an explicit byte order when it
/// is written to storage, so chunk files written on one host can be read back
/// on another.
pub trait Element: Copy + Default + PartialEq + Debug + Send + Sync + 'static {
    const WIDTH: usize;

    fn write_bytes(&self, big_endian: bool, out: &mut Vec<u8>);

    /// `bytes` must hold at least `WIDTH` bytes.
    fn read_bytes(bytes: &[u8], big_endian: bool) -> Self;
}

macro_rules! impl_element {
    ($($t:ty),*) => {
        $(
            impl Element for $t {
                const WIDTH: usize = std::mem::size_of::<$t>();

                fn write_bytes(&self, big_endian: bool, out: &mut Vec<u8>) {
                    if big_endian {
                        out.extend_from_slice(&self.to_be_bytes());
                    } else {
                        out.extend_from_slice(&self.to_le_bytes());
                    }
                }

                fn read_bytes(bytes: &[u8], big_endian: bool) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$t>()];
                    raw.copy_from_slice(&bytes[..Self::WIDTH]);
                    if big_endian {
                        <$t>::from_be_bytes(raw)
                    } else {
                        <$t>::from_le_bytes(raw)
                    }
                }
            }
        )*
    };
}

impl_element!(u8, i8, u16, i16, u32, i32, u64, i64, f32, f64);

pub fn encode_elements<T: Element>(data: &[T], big_endian: bool) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() * T::WIDTH);
    for value in data {
        value.write_bytes(big_endian, &mut out);
    }
    out
}

pub fn decode_elements<T: Element>(bytes: &[u8], big_endian: bool) -> ChunkResult<Vec<T>> {
    if bytes.len() % T::WIDTH != 0 {
        return Err(ChunkError::DecodeError(format!(
            "payload of {} bytes is not a multiple of element width {}",
            bytes.len(),
            T::WIDTH
        )));
    }
    Ok(bytes
        .chunks_exact(T::WIDTH)
        .map(|raw| T::read_bytes(raw, big_endian))
        .collect())
}
