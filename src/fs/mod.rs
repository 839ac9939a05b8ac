//! Read-only file tree the server publishes.
//!
//! The server never touches storage directly. It talks to a [`FileTree`],
//! which answers three questions about a [`TreePath`]: what is there, what
//! does a directory contain, and what are a file's bytes.
//!
//! - **`disk`**: a tree backed by a directory on the local filesystem
//! - **`memory`**: a tree held entirely in memory
//! - **`resolver`**: maps request paths onto tree entries
//! - **`listing`**: renders the HTML index of a directory

use std::fmt;
use std::io::{self, Read};

pub mod disk;
pub mod listing;
pub mod memory;
pub mod resolver;

pub use disk::DiskTree;
pub use memory::MemoryTree;

/// A normalised location inside the tree: the root plus zero or more
/// names, none of them empty, `.` or `..`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TreePath {
    segments: Vec<String>,
}

impl TreePath {
    pub fn root() -> Self {
        Self::default()
    }

    /// Builds a path from already-validated segments.
    pub(crate) fn from_segments(segments: Vec<String>) -> Self {
        Self { segments }
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Last segment, `None` at the root.
    pub fn file_name(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    pub fn join(&self, name: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(name.to_string());
        Self { segments }
    }
}

impl fmt::Display for TreePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("/");
        }
        for segment in &self.segments {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File { size: u64 },
    Directory,
}

/// One child of a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub kind: EntryKind,
}

impl DirEntry {
    pub fn file(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::File { size },
        }
    }

    pub fn dir(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Directory,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

/// Read access to the published files.
///
/// Implementations are synchronous. Reads happen on the single server
/// thread, between socket operations.
pub trait FileTree: Send + Sync {
    /// What lives at `path`, or `None` if nothing does.
    fn kind(&self, path: &TreePath) -> io::Result<Option<EntryKind>>;

    /// Children of the directory at `path`, in a stable order.
    fn list(&self, path: &TreePath) -> io::Result<Vec<DirEntry>>;

    /// Opens the file at `path`, returning its length and a reader.
    fn open(&self, path: &TreePath) -> io::Result<(u64, Box<dyn Read + Send>)>;
}
