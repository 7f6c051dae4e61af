//store layout只负责 chunk 坐标到存储路径的映射，不做任何 I/O
use chunk_lib::ChunkCoordinate;

/// File stem used for the single chunk of a zero-dimensional array.
pub const SCALAR_CHUNK_NAME: &str = "scalar";
const COORDINATE_SEPARATOR: char = '.';

/// Maps a chunk coordinate to the storage key of that chunk.
pub trait PathTranslator: Clone + Default {
    /// Stores the root; a trailing separator is added when missing.
    fn set_root(&mut self, root: &str);

    fn root(&self) -> &str;

    fn coordinate_to_path(&self, coord: &[usize]) -> String;
}

/// Default layout: components joined with `.` under the root, e.g. `root/1.2`.
///
/// Components are decimal integers, so a path splits back into exactly one
/// coordinate. The empty coordinate maps to `root/scalar`, which can not be
/// produced by any non-empty coordinate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DotPathTranslator {
    root: String,
}

impl DotPathTranslator {
    pub fn new(root: &str) -> Self {
        let mut translator = Self::default();
        translator.set_root(root);
        translator
    }

    /// Inverse of `coordinate_to_path` for paths under this root.
    pub fn path_to_coordinate(&self, path: &str) -> Option<ChunkCoordinate> {
        let stem = path.strip_prefix(self.root.as_str())?;
        if stem == SCALAR_CHUNK_NAME {
            return Some(Vec::new());
        }
        stem.split(COORDINATE_SEPARATOR)
            .map(|part| {
                if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                    None
                } else {
                    part.parse::<usize>().ok()
                }
            })
            .collect()
    }
}

impl PathTranslator for DotPathTranslator {
    fn set_root(&mut self, root: &str) {
        self.root = root.to_string();
        if !self.root.is_empty()
            && !self.root.ends_with('/')
            && !self.root.ends_with(std::path::MAIN_SEPARATOR)
        {
            self.root.push('/');
        }
    }

    fn root(&self) -> &str {
        &self.root
    }

    fn coordinate_to_path(&self, coord: &[usize]) -> String {
        if coord.is_empty() {
            return format!("{}{}", self.root, SCALAR_CHUNK_NAME);
        }
        let stem = coord
            .iter()
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join(".");
        format!("{}{}", self.root, stem)
    }
}
