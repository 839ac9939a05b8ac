use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;

use crate::config::Config;
use crate::fs::FileTree;
use crate::fs::resolver::{ResolveOptions, resolve};
use crate::http::parser::{ParseError, RequestParser};
use crate::http::request::Request;
use crate::http::response::{Response, StatusCode, build_response};
use crate::http::writer::ResponseWriter;

const READ_BUFFER: usize = 512;

/// One accepted connection, driven from first byte to close.
pub struct Connection<'a, S> {
    stream: S,
    parser: RequestParser,
    state: ConnectionState,
    tree: &'a dyn FileTree,
    options: ResolveOptions,
    idle_timeout: Duration,
    chunk_size: usize,
}

pub enum ConnectionState {
    AwaitingRequest,
    Resolving(Request),
    Sending(ResponseWriter, StatusCode),
    /// Malformed request; a 400 goes out before closing.
    Failed(ParseError),
    Closed,
}

/// How a connection ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A response was sent. `request` is the request line summary, `None`
    /// when the request could not be parsed.
    Served {
        request: Option<String>,
        status: StatusCode,
        bytes: u64,
    },
    /// The peer went away before finishing its request.
    PeerClosed,
    /// No bytes arrived within the idle timeout.
    TimedOut,
}

impl<'a, S> Connection<'a, S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, tree: &'a dyn FileTree, cfg: &Config) -> Self {
        Self {
            stream,
            parser: RequestParser::new(cfg.server.max_request_bytes),
            state: ConnectionState::AwaitingRequest,
            tree,
            options: cfg.resolve_options(),
            idle_timeout: cfg.idle_timeout(),
            chunk_size: cfg.static_files.chunk_size,
        }
    }

    /// Runs the connection to completion.
    ///
    /// Exactly one response is written per connection and the stream is
    /// shut down afterwards. An `Err` means the response could not be
    /// delivered.
    pub async fn run(&mut self) -> anyhow::Result<Outcome> {
        let result = self.drive().await;

        // The peer may already be gone; nothing left to report either way.
        let _ = self.stream.shutdown().await;

        result
    }

    async fn drive(&mut self) -> anyhow::Result<Outcome> {
        let mut outcome = Outcome::PeerClosed;
        let mut summary = None;

        loop {
            match std::mem::replace(&mut self.state, ConnectionState::Closed) {
                ConnectionState::AwaitingRequest => match self.read_request().await? {
                    ReadResult::Request(req) => {
                        self.state = ConnectionState::Resolving(req);
                    }
                    ReadResult::Malformed(e) => {
                        self.state = ConnectionState::Failed(e);
                    }
                    ReadResult::PeerClosed => {
                        tracing::debug!(buffered = self.parser.buffered(), "Peer closed before completing request");
                        outcome = Outcome::PeerClosed;
                    }
                    ReadResult::TimedOut => {
                        tracing::warn!(timeout = ?self.idle_timeout, "Abandoning idle connection");
                        outcome = Outcome::TimedOut;
                    }
                },

                ConnectionState::Resolving(req) => {
                    summary = Some(format!("{} {}", req.method.as_str(), req.path));
                    let response = self.handle_request(&req);
                    let status = response.status;
                    self.state = ConnectionState::Sending(ResponseWriter::new(response), status);
                }

                ConnectionState::Failed(e) => {
                    tracing::debug!(error = %e, "Malformed request");
                    let response = Response::bad_request();
                    let status = response.status;
                    self.state = ConnectionState::Sending(ResponseWriter::new(response), status);
                }

                ConnectionState::Sending(writer, status) => {
                    let bytes = writer
                        .write_to(&mut self.stream, self.chunk_size, self.idle_timeout)
                        .await?;
                    outcome = Outcome::Served {
                        request: summary.take(),
                        status,
                        bytes,
                    };
                    // Falls through to Closed; no second request on this connection.
                }

                ConnectionState::Closed => break,
            }
        }

        Ok(outcome)
    }

    async fn read_request(&mut self) -> anyhow::Result<ReadResult> {
        let mut temp = [0u8; READ_BUFFER];

        loop {
            let n = match timeout(self.idle_timeout, self.stream.read(&mut temp)).await {
                Ok(Ok(n)) => n,
                Ok(Err(e)) if is_disconnect(&e) => return Ok(ReadResult::PeerClosed),
                Ok(Err(e)) => return Err(e.into()),
                Err(_) => return Ok(ReadResult::TimedOut),
            };

            if n == 0 {
                return Ok(ReadResult::PeerClosed);
            }

            match self.parser.feed(&temp[..n]) {
                Ok(Some(request)) => return Ok(ReadResult::Request(request)),
                Ok(None) => {
                    tracing::trace!(buffered = self.parser.buffered(), "Waiting for rest of request");
                }
                Err(e) => return Ok(ReadResult::Malformed(e)),
            }
        }
    }

    fn handle_request(&self, req: &Request) -> Response {
        if !req.is_get() {
            return Response::method_not_allowed();
        }

        match resolve(self.tree, &req.path, &self.options) {
            Ok(resolution) => build_response(resolution),
            Err(e) => {
                tracing::error!(error = %e, path = %req.path, "Failed to read from file tree");
                Response::internal_error()
            }
        }
    }
}

fn is_disconnect(e: &std::io::Error) -> bool {
    use std::io::ErrorKind;
    matches!(
        e.kind(),
        ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted | ErrorKind::BrokenPipe | ErrorKind::UnexpectedEof
    )
}

enum ReadResult {
    Request(Request),
    Malformed(ParseError),
    PeerClosed,
    TimedOut,
}
