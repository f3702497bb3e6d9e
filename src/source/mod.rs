//! Input sources and the shared byte buffer.
//!
//! A reading session holds the whole input as one immutable byte buffer.
//! `SharedBuffer` abstracts over owned in-memory bytes and memory-mapped
//! local files behind a cheap `Clone`, so row views can keep the buffer
//! alive without copying it.

use std::fs::File;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use memmap2::Mmap;

use crate::error::SourceError;

/// Cheaply clonable, immutable view over the raw input bytes.
///
/// Cloning never copies the underlying data; both variants share it by
/// reference count. The buffer is released when the last clone drops,
/// including early abandonment of an iteration.
#[derive(Clone)]
pub enum SharedBuffer {
    /// Owned in-memory bytes.
    Owned(Bytes),
    /// Memory-mapped local file.
    Mapped(Arc<Mmap>),
}

impl SharedBuffer {
    /// Create a buffer by copying the given slice.
    pub fn from_slice(data: &[u8]) -> Self {
        Self::Owned(Bytes::copy_from_slice(data))
    }

    /// Create a buffer from already-shared bytes without copying.
    pub fn from_bytes(data: Bytes) -> Self {
        Self::Owned(data)
    }

    /// Memory-map a local file.
    ///
    /// Zero-length files are returned as an empty owned buffer because
    /// mapping an empty file is rejected on some platforms.
    ///
    /// # Errors
    /// Returns [`SourceError::NotFound`] if the path does not exist, or
    /// [`SourceError::Io`] for any other IO failure.
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => SourceError::NotFound(path.display().to_string()),
            _ => SourceError::Io(e),
        })?;
        let len = file.metadata()?.len();
        if len == 0 {
            return Ok(Self::Owned(Bytes::new()));
        }
        // Safety contract of Mmap::map: the file must not be truncated while
        // the map is alive. Readers treat the input as immutable for the
        // duration of a session.
        let map = unsafe { Mmap::map(&file)? };
        Ok(Self::Mapped(Arc::new(map)))
    }

    /// Total length of the input in bytes.
    pub fn len(&self) -> usize {
        self.as_ref().len()
    }

    /// Whether the input is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AsRef<[u8]> for SharedBuffer {
    fn as_ref(&self) -> &[u8] {
        match self {
            SharedBuffer::Owned(bytes) => bytes.as_ref(),
            SharedBuffer::Mapped(map) => &map[..],
        }
    }
}

impl std::fmt::Debug for SharedBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let variant = match self {
            SharedBuffer::Owned(_) => "Owned",
            SharedBuffer::Mapped(_) => "Mapped",
        };
        f.debug_struct("SharedBuffer")
            .field("variant", &variant)
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_from_slice_round_trip() {
        let buf = SharedBuffer::from_slice(b"a,b\n1,2\n");
        assert_eq!(buf.as_ref(), b"a,b\n1,2\n");
        assert_eq!(buf.len(), 8);
        assert!(!buf.is_empty());
    }

    #[test]
    fn test_clone_shares_data() {
        let buf = SharedBuffer::from_slice(b"hello");
        let clone = buf.clone();
        assert_eq!(buf.as_ref(), clone.as_ref());
    }

    #[test]
    fn test_open_path_maps_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"x,y\n1,2\n").unwrap();
        file.flush().unwrap();

        let buf = SharedBuffer::open_path(file.path()).unwrap();
        assert_eq!(buf.as_ref(), b"x,y\n1,2\n");
        assert!(matches!(buf, SharedBuffer::Mapped(_)));
    }

    #[test]
    fn test_open_path_empty_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let buf = SharedBuffer::open_path(file.path()).unwrap();
        assert!(buf.is_empty());
        assert!(matches!(buf, SharedBuffer::Owned(_)));
    }

    #[test]
    fn test_open_path_not_found() {
        let err = SharedBuffer::open_path("/definitely/not/here.csv").unwrap_err();
        assert!(matches!(err, SourceError::NotFound(_)));
    }
}
