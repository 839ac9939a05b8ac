use std::fmt::Write;

use super::{DirEntry, EntryKind};

/// Renders the HTML index page for the directory at `url_path`.
///
/// Pure function of its inputs: the same children in the same order give
/// the same page. Children are listed in the order given, except that
/// names starting with `.` are left out. `url_path` should end in `/`.
/// Links are absolute, so the page works whether or not the directory
/// was requested with its trailing slash.
///
/// ```
/// # use pofo_httpd::fs::{DirEntry, listing::render_listing};
/// let page = render_listing("/docs/", &[DirEntry::file("readme.txt", 12)]);
/// assert!(page.contains(r#"<a href="/docs/readme.txt">readme.txt</a>"#));
/// ```
pub fn render_listing(url_path: &str, entries: &[DirEntry]) -> String {
    let title = escape_html(url_path);
    let base = encode_path(url_path);
    let mut page = format!(
        "<html><head><title>Index of {title}</title></head><body><h1>Index of {title}</h1><hr><pre>\n"
    );

    if let Some((parent, _)) = url_path.trim_end_matches('/').rsplit_once('/') {
        let _ = writeln!(page, "<a href=\"{}/\">..</a> (parent directory)", encode_path(parent));
    }

    for entry in entries.iter().filter(|e| !e.name.starts_with('.')) {
        let href = format!("{base}{}", urlencoding::encode(&entry.name));
        let name = escape_html(&entry.name);

        // Writing into a String cannot fail.
        let _ = match entry.kind {
            EntryKind::Directory => writeln!(page, "<a href=\"{href}/\">{name}/</a>\t\t(dir)"),
            EntryKind::File { size } => writeln!(page, "<a href=\"{href}\">{name}</a>\t\t{size}"),
        };
    }

    page.push_str("</pre><hr></body></html>");
    page
}

/// Percent-encodes each segment, keeping the slashes.
fn encode_path(path: &str) -> String {
    path.split('/')
        .map(urlencoding::encode)
        .collect::<Vec<_>>()
        .join("/")
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}
