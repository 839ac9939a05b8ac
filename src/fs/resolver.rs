//! Maps request paths onto entries of a [`FileTree`].
//!
//! Resolution order for a path that lands on a directory:
//!
//! 1. a file named exactly like the configured index file (`index.htm`)
//!    is served in its place;
//! 2. otherwise the directory itself is returned for listing, if listings
//!    are enabled;
//! 3. otherwise the path is absent.
//!
//! Paths are normalised before they reach the tree. A `..` that would
//! climb above the root makes the whole path absent.

use std::fmt;
use std::io::{self, Read};

use super::{DirEntry, EntryKind, FileTree, TreePath};

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("reading {path} failed: {source}")]
    Io {
        path: TreePath,
        #[source]
        source: io::Error,
    },
}

/// How directories are answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveOptions {
    /// File served in place of a directory, matched exactly.
    pub index_file: String,
    /// Render a listing for directories without an index file.
    pub directory_listing: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            index_file: "index.htm".to_string(),
            directory_listing: true,
        }
    }
}

/// A request path reduced to a tree location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedPath {
    pub path: TreePath,
    /// The request ended in `/`, so only a directory may answer it.
    pub trailing_slash: bool,
}

/// Outcome of resolving a request path.
pub enum Resolution {
    File {
        name: String,
        size: u64,
        reader: Box<dyn Read + Send>,
    },
    /// A directory to be listed. `url_path` is its canonical URL, ending in `/`.
    Directory {
        url_path: String,
        entries: Vec<DirEntry>,
    },
    Absent,
}

impl fmt::Debug for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::File { name, size, .. } => f
                .debug_struct("File")
                .field("name", name)
                .field("size", size)
                .finish_non_exhaustive(),
            Resolution::Directory { url_path, entries } => f
                .debug_struct("Directory")
                .field("url_path", url_path)
                .field("entries", entries)
                .finish(),
            Resolution::Absent => f.write_str("Absent"),
        }
    }
}

/// Normalises a request target.
///
/// Query string and fragment are dropped, segments are percent-decoded,
/// `.` and empty segments vanish and `..` removes its parent. Returns
/// `None` for anything that cannot name an entry inside the tree.
///
/// ```
/// # use pofo_httpd::fs::resolver::normalize;
/// let n = normalize("/docs/./a%20b/../readme.txt?x=1").unwrap();
/// assert_eq!(n.path.to_string(), "/docs/readme.txt");
/// assert!(normalize("/../etc/passwd").is_none());
/// ```
pub fn normalize(target: &str) -> Option<NormalizedPath> {
    let end = target.find(['?', '#']).unwrap_or(target.len());
    let raw = &target[..end];

    if !raw.starts_with('/') {
        return None;
    }

    let mut segments: Vec<String> = Vec::new();

    for raw_segment in raw.split('/') {
        let segment = urlencoding::decode(raw_segment).ok()?;

        match &*segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            name if name.contains(['/', '\\', '\0']) => return None,
            name => segments.push(name.to_string()),
        }
    }

    Some(NormalizedPath {
        path: TreePath::from_segments(segments),
        trailing_slash: raw.ends_with('/'),
    })
}

fn io_error(path: &TreePath) -> impl FnOnce(io::Error) -> ResolveError + '_ {
    move |source| ResolveError::Io {
        path: path.clone(),
        source,
    }
}

/// Resolves `target` against `tree`.
///
/// Missing entries are `Absent`, never an error. Errors are reserved for
/// failures reading entries that do exist.
pub fn resolve(
    tree: &dyn FileTree,
    target: &str,
    options: &ResolveOptions,
) -> Result<Resolution, ResolveError> {
    let Some(normalized) = normalize(target) else {
        tracing::debug!(request_target = target, "Request path does not name an entry");
        return Ok(Resolution::Absent);
    };
    let path = normalized.path;

    match tree.kind(&path).map_err(io_error(&path))? {
        None => Ok(Resolution::Absent),
        Some(EntryKind::File { .. }) if normalized.trailing_slash => Ok(Resolution::Absent),
        Some(EntryKind::File { .. }) => open_file(tree, &path),
        Some(EntryKind::Directory) => resolve_directory(tree, &path, options),
    }
}

fn resolve_directory(
    tree: &dyn FileTree,
    dir: &TreePath,
    options: &ResolveOptions,
) -> Result<Resolution, ResolveError> {
    let index = dir.join(&options.index_file);

    if let Some(EntryKind::File { .. }) = tree.kind(&index).map_err(io_error(&index))? {
        return open_file(tree, &index);
    }

    if !options.directory_listing {
        return Ok(Resolution::Absent);
    }

    let entries = tree.list(dir).map_err(io_error(dir))?;

    let mut url_path = dir.to_string();
    if !url_path.ends_with('/') {
        url_path.push('/');
    }

    Ok(Resolution::Directory { url_path, entries })
}

fn open_file(tree: &dyn FileTree, path: &TreePath) -> Result<Resolution, ResolveError> {
    match tree.open(path) {
        Ok((size, reader)) => Ok(Resolution::File {
            name: path.file_name().unwrap_or_default().to_string(),
            size,
            reader,
        }),
        // Removed between the lookup and the open.
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Resolution::Absent),
        Err(e) => Err(io_error(path)(e)),
    }
}
