use anyhow::{anyhow, Context, Result};
use serde::{Serialize, Serializer};
use std::{
    fmt,
    io::SeekFrom,
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::io::{AsyncReadExt, AsyncSeekExt};

/// Opaque handle to a file's bytes. Cheap to clone; two handles are equal
/// when they point at the same file or share the same in-memory buffer name
/// and contents.
#[derive(Clone, PartialEq, Eq)]
pub enum ContentHandle {
    Disk(PathBuf),
    Memory { name: String, bytes: Arc<[u8]> },
}

impl ContentHandle {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        ContentHandle::Disk(path.into())
    }

    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        ContentHandle::Memory {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Stable identity of the underlying content, used as a change key by
    /// renderers.
    pub fn identity(&self) -> String {
        match self {
            ContentHandle::Disk(path) => path.display().to_string(),
            ContentHandle::Memory { name, .. } => format!("memory:{name}"),
        }
    }

    pub fn disk_path(&self) -> Option<&Path> {
        match self {
            ContentHandle::Disk(path) => Some(path.as_path()),
            ContentHandle::Memory { .. } => None,
        }
    }

    pub async fn size(&self) -> Result<u64> {
        match self {
            ContentHandle::Disk(path) => {
                let metadata = tokio::fs::metadata(path)
                    .await
                    .with_context(|| format!("failed to stat {}", path.display()))?;
                Ok(metadata.len())
            }
            ContentHandle::Memory { bytes, .. } => Ok(bytes.len() as u64),
        }
    }

    pub async fn read_bytes(&self) -> Result<Vec<u8>> {
        match self {
            ContentHandle::Disk(path) => tokio::fs::read(path)
                .await
                .with_context(|| format!("failed to read {}", path.display())),
            ContentHandle::Memory { bytes, .. } => Ok(bytes.to_vec()),
        }
    }

    pub async fn read_text(&self) -> Result<String> {
        let bytes = self.read_bytes().await?;
        String::from_utf8(bytes)
            .map_err(|err| anyhow!("{} is not valid UTF-8: {err}", self.identity()))
    }

    /// Reads up to `len` bytes starting at `offset`. Returns fewer bytes when
    /// the content ends first.
    pub async fn read_range(&self, offset: u64, len: usize) -> Result<Vec<u8>> {
        match self {
            ContentHandle::Disk(path) => {
                let mut file = tokio::fs::File::open(path)
                    .await
                    .with_context(|| format!("failed to open {}", path.display()))?;
                file.seek(SeekFrom::Start(offset))
                    .await
                    .with_context(|| format!("failed to seek {} to {offset}", path.display()))?;

                let mut buffer = Vec::with_capacity(len);
                file.take(len as u64)
                    .read_to_end(&mut buffer)
                    .await
                    .with_context(|| format!("failed to read {}", path.display()))?;
                Ok(buffer)
            }
            ContentHandle::Memory { bytes, .. } => {
                let start = usize::try_from(offset).unwrap_or(usize::MAX).min(bytes.len());
                let end = start.saturating_add(len).min(bytes.len());
                Ok(bytes[start..end].to_vec())
            }
        }
    }
}

impl fmt::Debug for ContentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentHandle::Disk(path) => f.debug_tuple("Disk").field(path).finish(),
            ContentHandle::Memory { name, bytes } => f
                .debug_struct("Memory")
                .field("name", name)
                .field("len", &bytes.len())
                .finish(),
        }
    }
}

impl Serialize for ContentHandle {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.identity())
    }
}

/// One entry of the input file collection: a relative, `/`-separated path
/// plus a handle to its content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub path: String,
    pub content: ContentHandle,
}

impl FileEntry {
    pub fn new(path: impl Into<String>, content: ContentHandle) -> Self {
        Self {
            path: path.into().replace('\\', "/"),
            content,
        }
    }

    /// Convenience constructor for in-memory entries.
    pub fn in_memory(path: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        let path = path.into().replace('\\', "/");
        let content = ContentHandle::from_bytes(path.clone(), bytes);
        Self { path, content }
    }

    /// Final path component.
    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}
