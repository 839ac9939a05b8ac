use bytes::BytesMut;
use std::collections::HashMap;

use crate::http::request::{Method, Request};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// No header terminator yet; feed more bytes.
    #[error("request incomplete")]
    Incomplete,
    #[error("malformed request line")]
    InvalidRequest,
    #[error("unknown method")]
    InvalidMethod,
    #[error("unsupported request target")]
    InvalidTarget,
    #[error("unsupported protocol version")]
    InvalidVersion,
    #[error("request head exceeds {0} bytes")]
    TooLarge(usize),
}

impl ParseError {
    /// Everything except `Incomplete` ends the connection with a 400.
    pub fn is_malformed(&self) -> bool {
        !matches!(self, ParseError::Incomplete)
    }
}

/// Parses one request head out of `buf`.
///
/// Returns the request and the number of bytes it occupied, or
/// `ParseError::Incomplete` until a blank line has been seen. Header
/// lines are collected but never required; lines without a colon are
/// skipped.
pub fn parse_http_request(buf: &[u8]) -> Result<(Request, usize), ParseError> {
    let (headers_end, terminator_len) = find_headers_end(buf).ok_or(ParseError::Incomplete)?;

    let mut lines = buf[..headers_end]
        .split(|&b| b == b'\n')
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line));

    // Request line
    let request_line = lines.next().ok_or(ParseError::InvalidRequest)?;
    let request_line = std::str::from_utf8(request_line).map_err(|_| ParseError::InvalidRequest)?;
    let mut parts = request_line.split_whitespace();

    let method_str = parts.next().ok_or(ParseError::InvalidRequest)?;
    let target = parts.next().ok_or(ParseError::InvalidRequest)?;
    let version = parts.next().ok_or(ParseError::InvalidRequest)?;

    if parts.next().is_some() {
        return Err(ParseError::InvalidRequest);
    }

    let method = Method::from_str(method_str).ok_or(ParseError::InvalidMethod)?;

    if !version.starts_with("HTTP/1.") {
        return Err(ParseError::InvalidVersion);
    }

    let path = origin_form(target)?;

    // Headers
    let mut headers = HashMap::new();

    // Header values are opaque; stray Latin-1 bytes must not reject the request.
    for line in lines {
        let line = String::from_utf8_lossy(line);
        match line.split_once(':') {
            Some((key, value)) => {
                headers.insert(key.trim().to_string(), value.trim().to_string());
            }
            None => {
                tracing::trace!(line = %line, "Ignoring header line without colon");
            }
        }
    }

    let request = Request {
        method,
        path,
        version: version.to_string(),
        headers,
    };

    Ok((request, headers_end + terminator_len))
}

/// Reduces a request target to origin form (`/path?query`).
///
/// Absolute-form targets, as sent through HTTP/1.0 proxies, are accepted
/// and their path kept.
fn origin_form(target: &str) -> Result<String, ParseError> {
    if target.starts_with('/') {
        return Ok(target.to_string());
    }

    let url = url::Url::parse(target).map_err(|_| ParseError::InvalidTarget)?;

    if url.scheme() != "http" || url.cannot_be_a_base() {
        return Err(ParseError::InvalidTarget);
    }

    let mut path = url.path().to_string();
    if let Some(query) = url.query() {
        path.push('?');
        path.push_str(query);
    }

    Ok(path)
}

/// Finds the blank line ending the head. Returns its offset and length.
///
/// A bare `\n\n` is tolerated for clients typing requests by hand.
fn find_headers_end(buf: &[u8]) -> Option<(usize, usize)> {
    (0..buf.len()).find_map(|i| {
        let rest = &buf[i..];
        if rest.starts_with(b"\r\n\r\n") {
            Some((i, 4))
        } else if rest.starts_with(b"\n\n") {
            Some((i, 2))
        } else {
            None
        }
    })
}

/// Accumulates bytes from a slow link until a full request head arrives.
///
/// There is no notion of time in here: a request split across any number
/// of reads completes as soon as its terminator shows up. The buffer is
/// bounded by `max_len`.
#[derive(Debug)]
pub struct RequestParser {
    buffer: BytesMut,
    max_len: usize,
}

impl RequestParser {
    pub fn new(max_len: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(max_len.min(1024)),
            max_len,
        }
    }

    /// Appends `data` and tries to complete the request.
    ///
    /// `Ok(None)` means more bytes are needed. Any error is final.
    pub fn feed(&mut self, data: &[u8]) -> Result<Option<Request>, ParseError> {
        self.buffer.extend_from_slice(data);

        match parse_http_request(&self.buffer) {
            Ok((request, consumed)) => {
                // One request per connection; anything after the head is dropped.
                let _ = self.buffer.split_to(consumed);
                Ok(Some(request))
            }
            Err(ParseError::Incomplete) if self.buffer.len() > self.max_len => {
                Err(ParseError::TooLarge(self.max_len))
            }
            Err(ParseError::Incomplete) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Bytes received but not yet part of a completed request.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_get() {
        let req = b"GET / HTTP/1.0\r\nHost: example.com\r\n\r\n";

        let (parsed, consumed) = parse_http_request(req).unwrap();

        assert_eq!(parsed.path, "/");
        assert_eq!(parsed.header("host"), Some("example.com"));
        assert_eq!(consumed, req.len());
    }

    #[test]
    fn terminator_split_over_feeds() {
        let mut parser = RequestParser::new(512);

        assert!(parser.feed(b"GET / HTTP/1.0\r").unwrap().is_none());
        assert!(parser.feed(b"\n\r").unwrap().is_none());
        assert!(parser.feed(b"\n").unwrap().is_some());
    }
}
