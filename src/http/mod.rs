//! HTTP protocol implementation.
//!
//! This module implements the HTTP/1.0 subset the file server speaks:
//! GET only, one request per connection, no keep-alive.
//!
//! # Architecture
//!
//! - **`connection`**: The per-connection state machine
//! - **`parser`**: Incremental request-head parser
//! - **`request`**: HTTP request representation
//! - **`response`**: HTTP response representation with builder pattern
//! - **`writer`**: Serializes and streams responses to the client
//! - **`mime`**: MIME type detection based on file extensions
//!
//! # Connection State Machine
//!
//! ```text
//!        ┌──────────────────┐
//!        │ AwaitingRequest  │ ← Accumulate bytes until the blank line
//!        └──────┬─────┬─────┘
//!               │     └──── malformed ──► Failed ─┐
//!               ▼                                 │
//!        ┌──────────────────┐                     │
//!        │    Resolving     │ ← Look up the path  │
//!        └──────┬───────────┘                     │
//!               ▼                                 │
//!        ┌──────────────────┐                     │
//!        │     Sending      │ ◄──── 400 ──────────┘
//!        └──────┬───────────┘
//!               ▼
//!             Closed  ← also reached on peer close or idle timeout
//! ```
//!
//! # Example
//!
//! ```ignore
//! use pofo_httpd::fs::MemoryTree;
//! use pofo_httpd::http::connection::Connection;
//!
//! let tree = MemoryTree::new().with_file("/index.htm", "hello");
//! let (socket, _peer) = listener.accept().await?;
//! let outcome = Connection::new(socket, &tree, &cfg).run().await?;
//! ```

pub mod connection;
pub mod mime;
pub mod parser;
pub mod request;
pub mod response;
pub mod writer;
