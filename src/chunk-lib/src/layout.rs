use crate::{ChunkError, ChunkResult};
use serde::{Deserialize, Serialize};

/// Integer tuple identifying a chunk in the grid of chunks.
pub type ChunkCoordinate = Vec<usize>;

/// Memory order of the elements inside one chunk buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    #[default]
    RowMajor,
    ColumnMajor,
}

/// Number of elements described by `shape`; a zero-dimensional shape holds one element.
pub fn compute_size(shape: &[usize]) -> usize {
    shape.iter().product()
}

/// `compute_size` for shapes that may come from user input; `None` on overflow.
pub fn checked_size(shape: &[usize]) -> Option<usize> {
    shape
        .iter()
        .try_fold(1usize, |acc, extent| acc.checked_mul(*extent))
}

pub fn strides_for(shape: &[usize], layout: Layout) -> Vec<usize> {
    let mut strides = vec![0; shape.len()];
    let mut acc = 1;
    match layout {
        Layout::RowMajor => {
            for (i, extent) in shape.iter().enumerate().rev() {
                strides[i] = acc;
                acc *= extent;
            }
        }
        Layout::ColumnMajor => {
            for (i, extent) in shape.iter().enumerate() {
                strides[i] = acc;
                acc *= extent;
            }
        }
    }
    strides
}

pub fn flat_index(index: &[usize], shape: &[usize], strides: &[usize]) -> ChunkResult<usize> {
    if index.len() != shape.len() {
        return Err(ChunkError::OutOfBounds(format!(
            "index {:?} has {} dimensions, expected {}",
            index,
            index.len(),
            shape.len()
        )));
    }
    let mut offset = 0;
    for ((i, extent), stride) in index.iter().zip(shape).zip(strides) {
        if i >= extent {
            return Err(ChunkError::OutOfBounds(format!(
                "index {:?} outside shape {:?}",
                index, shape
            )));
        }
        offset += i * stride;
    }
    Ok(offset)
}

/// Shape of the chunk grid covering `shape`, rounding partial edge chunks up.
pub fn grid_shape(shape: &[usize], chunk_shape: &[usize]) -> Vec<usize> {
    shape
        .iter()
        .zip(chunk_shape)
        .map(|(extent, chunk)| extent.div_ceil(*chunk))
        .collect()
}

/// Splits a logical element index into (chunk coordinate, index inside that chunk).
pub fn split_index(index: &[usize], chunk_shape: &[usize]) -> (ChunkCoordinate, Vec<usize>) {
    index
        .iter()
        .zip(chunk_shape)
        .map(|(i, chunk)| (i / chunk, i % chunk))
        .unzip()
}
