use std::io::{self, Read};

use pofo_httpd::fs::resolver::{ResolveError, ResolveOptions, Resolution, normalize, resolve};
use pofo_httpd::fs::{DirEntry, EntryKind, FileTree, MemoryTree, TreePath};

fn site() -> MemoryTree {
    MemoryTree::new()
        .with_file("/index.htm", "<h1>Welcome to Atari Portfolio</h1>")
        .with_file("/about.htm", "<h1>About</h1>")
        .with_file("/pofo.jpg", vec![0xFFu8, 0xD8, 0xFF, 0xE0])
        .with_file("/docs/readme.txt", "Atari Portfolio via SLIP")
        .with_file("/docs/specs.htm", "80C88 at 4.9 MHz")
        .with_file("/games/index.htm", "games index")
        .with_dir("/empty")
}

fn read_all(resolution: Resolution) -> Vec<u8> {
    match resolution {
        Resolution::File { mut reader, .. } => {
            let mut out = Vec::new();
            reader.read_to_end(&mut out).unwrap();
            out
        }
        other => panic!("expected a file, got {other:?}"),
    }
}

#[test]
fn test_normalize_root() {
    let n = normalize("/").unwrap();
    assert!(n.path.is_root());
    assert!(n.trailing_slash);
}

#[test]
fn test_normalize_collapses_dots_and_slashes() {
    let n = normalize("//docs/./specs.htm").unwrap();
    assert_eq!(n.path.to_string(), "/docs/specs.htm");
    assert!(!n.trailing_slash);
}

#[test]
fn test_normalize_parent_inside_root() {
    let n = normalize("/docs/../about.htm").unwrap();
    assert_eq!(n.path.to_string(), "/about.htm");
}

#[test]
fn test_normalize_rejects_escape_above_root() {
    assert!(normalize("/..").is_none());
    assert!(normalize("/../etc/passwd").is_none());
    assert!(normalize("/docs/../../secret").is_none());
    assert!(normalize("/%2e%2e/secret").is_none());
}

#[test]
fn test_normalize_rejects_encoded_separators() {
    assert!(normalize("/docs%2f..%2f..%2fsecret").is_none());
    assert!(normalize("/docs%5creadme.txt").is_none());
    assert!(normalize("/a%00b").is_none());
}

#[test]
fn test_normalize_decodes_and_strips_query() {
    let n = normalize("/my%20file.txt?download=1#top").unwrap();
    assert_eq!(n.path.file_name(), Some("my file.txt"));
}

#[test]
fn test_normalize_requires_leading_slash() {
    assert!(normalize("about.htm").is_none());
    assert!(normalize("").is_none());
}

#[test]
fn test_resolve_root_serves_index() {
    let tree = site();
    let resolution = resolve(&tree, "/", &ResolveOptions::default()).unwrap();

    match &resolution {
        Resolution::File { name, .. } => assert_eq!(name, "index.htm"),
        other => panic!("expected index file, got {other:?}"),
    }
    let body = String::from_utf8(read_all(resolution)).unwrap();
    assert!(body.contains("Welcome to Atari Portfolio"));
}

#[test]
fn test_resolve_plain_file() {
    let tree = site();
    let resolution = resolve(&tree, "/docs/readme.txt", &ResolveOptions::default()).unwrap();

    match &resolution {
        Resolution::File { name, size, .. } => {
            assert_eq!(name, "readme.txt");
            assert_eq!(*size, 24);
        }
        other => panic!("expected file, got {other:?}"),
    }
}

#[test]
fn test_resolve_subdirectory_with_index() {
    let tree = site();

    for path in ["/games/", "/games"] {
        let body = read_all(resolve(&tree, path, &ResolveOptions::default()).unwrap());
        assert_eq!(body, b"games index", "{path}");
    }
}

#[test]
fn test_resolve_directory_without_index_lists_children() {
    let tree = site();
    let resolution = resolve(&tree, "/docs/", &ResolveOptions::default()).unwrap();

    match resolution {
        Resolution::Directory { url_path, entries } => {
            assert_eq!(url_path, "/docs/");
            let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
            assert_eq!(names, ["readme.txt", "specs.htm"]);
        }
        other => panic!("expected directory, got {other:?}"),
    }
}

#[test]
fn test_resolve_directory_without_trailing_slash_gets_canonical_url() {
    let tree = site();

    match resolve(&tree, "/docs", &ResolveOptions::default()).unwrap() {
        Resolution::Directory { url_path, .. } => assert_eq!(url_path, "/docs/"),
        other => panic!("expected directory, got {other:?}"),
    }
}

#[test]
fn test_resolve_listing_disabled() {
    let tree = site();
    let options = ResolveOptions {
        directory_listing: false,
        ..ResolveOptions::default()
    };

    assert!(matches!(resolve(&tree, "/docs/", &options).unwrap(), Resolution::Absent));
    // Index files still win.
    assert!(matches!(resolve(&tree, "/", &options).unwrap(), Resolution::File { .. }));
}

#[test]
fn test_resolve_custom_index_name_is_exact() {
    let tree = MemoryTree::new().with_file("/INDEX.HTM", "upper");
    let resolution = resolve(&tree, "/", &ResolveOptions::default()).unwrap();

    assert!(matches!(resolution, Resolution::Directory { .. }));

    let options = ResolveOptions {
        index_file: "INDEX.HTM".to_string(),
        directory_listing: true,
    };
    assert_eq!(read_all(resolve(&tree, "/", &options).unwrap()), b"upper");
}

#[test]
fn test_resolve_missing_paths_are_absent() {
    let tree = site();

    for path in ["/nonexistent.htm", "/docs/nonexistent.htm", "/nope/", "/about.htm/x"] {
        let resolution = resolve(&tree, path, &ResolveOptions::default()).unwrap();
        assert!(matches!(resolution, Resolution::Absent), "{path}");
    }
}

#[test]
fn test_resolve_file_with_trailing_slash_is_absent() {
    let tree = site();
    let resolution = resolve(&tree, "/about.htm/", &ResolveOptions::default()).unwrap();

    assert!(matches!(resolution, Resolution::Absent));
}

#[test]
fn test_resolve_traversal_is_absent() {
    let tree = site();
    let resolution = resolve(&tree, "/../index.htm", &ResolveOptions::default()).unwrap();

    assert!(matches!(resolution, Resolution::Absent));
}

#[test]
fn test_resolve_empty_directory_lists_nothing() {
    let tree = site();

    match resolve(&tree, "/empty/", &ResolveOptions::default()).unwrap() {
        Resolution::Directory { entries, .. } => assert!(entries.is_empty()),
        other => panic!("expected directory, got {other:?}"),
    }
}

/// A tree whose medium fails on every access.
struct FaultyTree;

impl FileTree for FaultyTree {
    fn kind(&self, path: &TreePath) -> io::Result<Option<EntryKind>> {
        if path.is_root() {
            Ok(Some(EntryKind::Directory))
        } else {
            Err(io::Error::other("sector not found"))
        }
    }

    fn list(&self, _path: &TreePath) -> io::Result<Vec<DirEntry>> {
        Err(io::Error::other("sector not found"))
    }

    fn open(&self, _path: &TreePath) -> io::Result<(u64, Box<dyn Read + Send>)> {
        Err(io::Error::other("sector not found"))
    }
}

#[test]
fn test_resolve_medium_fault_is_an_error() {
    let result = resolve(&FaultyTree, "/readme.txt", &ResolveOptions::default());

    match result {
        Err(ResolveError::Io { path, .. }) => assert_eq!(path.to_string(), "/readme.txt"),
        other => panic!("expected io error, got {other:?}"),
    }
}
