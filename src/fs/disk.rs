use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::Context;

use super::{DirEntry, EntryKind, FileTree, TreePath};

/// A [`FileTree`] rooted at a directory on the local filesystem.
///
/// Entries whose real location (after following symlinks) falls outside
/// the root are reported as absent.
#[derive(Debug, Clone)]
pub struct DiskTree {
    root: PathBuf,
}

impl DiskTree {
    pub fn new(root: impl AsRef<Path>) -> anyhow::Result<Self> {
        let root = root.as_ref();
        let root = root
            .canonicalize()
            .with_context(|| format!("document root {} is not accessible", root.display()))?;

        if !root.is_dir() {
            anyhow::bail!("document root {} is not a directory", root.display());
        }

        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem location of `path`, or `None` if it is missing or
    /// escapes the root.
    fn locate(&self, path: &TreePath) -> io::Result<Option<PathBuf>> {
        let mut full = self.root.clone();
        full.extend(path.segments());

        match full.canonicalize() {
            Ok(real) if real.starts_with(&self.root) => Ok(Some(real)),
            Ok(real) => {
                tracing::warn!(path = %path, resolved = %real.display(), "Refusing entry outside document root");
                Ok(None)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn require(&self, path: &TreePath) -> io::Result<PathBuf> {
        self.locate(path)?
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.to_string()))
    }
}

fn kind_of(metadata: &fs::Metadata) -> Option<EntryKind> {
    if metadata.is_dir() {
        Some(EntryKind::Directory)
    } else if metadata.is_file() {
        Some(EntryKind::File {
            size: metadata.len(),
        })
    } else {
        None
    }
}

impl FileTree for DiskTree {
    fn kind(&self, path: &TreePath) -> io::Result<Option<EntryKind>> {
        match self.locate(path)? {
            Some(real) => Ok(kind_of(&fs::metadata(real)?)),
            None => Ok(None),
        }
    }

    /// Lists a directory sorted by name. Names that are not valid UTF-8
    /// cannot be requested and are skipped.
    fn list(&self, path: &TreePath) -> io::Result<Vec<DirEntry>> {
        let dir = self.require(path)?;
        let mut entries = Vec::new();

        for entry in fs::read_dir(&dir)? {
            let entry = entry?;

            let Ok(name) = entry.file_name().into_string() else {
                tracing::debug!(dir = %dir.display(), "Skipping non UTF-8 file name");
                continue;
            };

            // Same root check as locate(), so listings never show escaped entries.
            let real = match entry.path().canonicalize() {
                Ok(real) if real.starts_with(&self.root) => real,
                Ok(real) => {
                    tracing::debug!(name = %name, resolved = %real.display(), "Hiding entry outside document root");
                    continue;
                }
                Err(_) => {
                    tracing::trace!(name = %name, "Skipping dangling entry");
                    continue;
                }
            };

            match fs::metadata(&real).ok().as_ref().and_then(kind_of) {
                Some(kind) => entries.push(DirEntry { name, kind }),
                None => tracing::trace!(name = %name, "Skipping special entry"),
            }
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn open(&self, path: &TreePath) -> io::Result<(u64, Box<dyn Read + Send>)> {
        let file = File::open(self.require(path)?)?;
        let metadata = file.metadata()?;

        if !metadata.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{path} is not a regular file"),
            ));
        }

        // Length is taken from the open handle so it matches what is read.
        Ok((metadata.len(), Box::new(file.take(metadata.len()))))
    }
}
