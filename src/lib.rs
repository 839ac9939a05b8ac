//! pofo_httpd - static file server for small machines on slow links
//!
//! Serves a read-only file tree over HTTP/1.0, one connection at a time.

pub mod config;
pub mod fs;
pub mod http;
pub mod server;
