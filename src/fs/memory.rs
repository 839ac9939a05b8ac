use std::collections::BTreeMap;
use std::io::{self, Cursor, Read};
use std::sync::Arc;

use super::{DirEntry, EntryKind, FileTree, TreePath};

#[derive(Debug, Clone)]
enum Node {
    File(Arc<[u8]>),
    Dir(BTreeMap<String, Node>),
}

/// A [`FileTree`] held in memory.
///
/// Children are kept in a `BTreeMap`, so listings come back sorted by
/// name. Parents are created on demand by the builder methods.
///
/// ```
/// # use pofo_httpd::fs::MemoryTree;
/// let tree = MemoryTree::new()
///     .with_file("/index.htm", "<h1>hi</h1>")
///     .with_dir("/empty");
/// ```
#[derive(Debug, Clone)]
pub struct MemoryTree {
    root: Node,
}

impl Default for MemoryTree {
    fn default() -> Self {
        Self::new()
    }
}

fn split(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

impl MemoryTree {
    pub fn new() -> Self {
        Self {
            root: Node::Dir(BTreeMap::new()),
        }
    }

    /// Adds a file, replacing whatever was at `path`.
    pub fn with_file(mut self, path: &str, content: impl Into<Vec<u8>>) -> Self {
        let mut names = split(path);
        let Some(name) = names.pop() else {
            return self;
        };
        let bytes: Vec<u8> = content.into();
        if let Some(parent) = Self::make_dirs(&mut self.root, &names) {
            parent.insert(name.to_string(), Node::File(bytes.into()));
        }
        self
    }

    /// Adds an empty directory (and any missing parents).
    pub fn with_dir(mut self, path: &str) -> Self {
        Self::make_dirs(&mut self.root, &split(path));
        self
    }

    fn make_dirs<'a>(
        mut node: &'a mut Node,
        names: &[&str],
    ) -> Option<&'a mut BTreeMap<String, Node>> {
        for name in names {
            let Node::Dir(children) = node else {
                return None;
            };
            node = children
                .entry(name.to_string())
                .or_insert_with(|| Node::Dir(BTreeMap::new()));
        }
        match node {
            Node::Dir(children) => Some(children),
            Node::File(_) => None,
        }
    }

    fn lookup(&self, path: &TreePath) -> Option<&Node> {
        path.segments().iter().try_fold(&self.root, |node, name| match node {
            Node::Dir(children) => children.get(name),
            Node::File(_) => None,
        })
    }
}

fn kind_of(node: &Node) -> EntryKind {
    match node {
        Node::File(bytes) => EntryKind::File {
            size: bytes.len() as u64,
        },
        Node::Dir(_) => EntryKind::Directory,
    }
}

impl FileTree for MemoryTree {
    fn kind(&self, path: &TreePath) -> io::Result<Option<EntryKind>> {
        Ok(self.lookup(path).map(kind_of))
    }

    fn list(&self, path: &TreePath) -> io::Result<Vec<DirEntry>> {
        match self.lookup(path) {
            Some(Node::Dir(children)) => Ok(children
                .iter()
                .map(|(name, node)| DirEntry {
                    name: name.clone(),
                    kind: kind_of(node),
                })
                .collect()),
            Some(Node::File(_)) => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{path} is not a directory"),
            )),
            None => Err(io::Error::new(io::ErrorKind::NotFound, path.to_string())),
        }
    }

    fn open(&self, path: &TreePath) -> io::Result<(u64, Box<dyn Read + Send>)> {
        match self.lookup(path) {
            Some(Node::File(bytes)) => {
                // Readers share the buffer instead of copying it.
                let reader = Cursor::new(Arc::clone(bytes));
                Ok((bytes.len() as u64, Box::new(reader)))
            }
            Some(Node::Dir(_)) => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{path} is a directory"),
            )),
            None => Err(io::Error::new(io::ErrorKind::NotFound, path.to_string())),
        }
    }
}
