use std::io::Read;
use std::time::Duration;

use anyhow::Context;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;

use crate::http::response::{Body, Response};

const HTTP_VERSION: &str = "HTTP/1.0";

fn serialize_head(resp: &Response) -> Vec<u8> {
    let mut buf = Vec::new();

    // Status line
    let status_line = format!(
        "{} {} {}\r\n",
        HTTP_VERSION,
        resp.status.as_u16(),
        resp.status.reason_phrase()
    );
    buf.extend_from_slice(status_line.as_bytes());

    // Headers
    for (k, v) in &resp.headers {
        buf.extend_from_slice(k.as_bytes());
        buf.extend_from_slice(b": ");
        buf.extend_from_slice(v.as_bytes());
        buf.extend_from_slice(b"\r\n");
    }

    // Header/body separator
    buf.extend_from_slice(b"\r\n");

    buf
}

/// Sends one response: the head, then the body in bounded chunks.
///
/// Streamed bodies are read from the file tree one chunk at a time and
/// written before the next chunk is read, so memory use does not depend
/// on file size.
pub struct ResponseWriter {
    head: Vec<u8>,
    body: Body,
    expected: Option<u64>,
}

impl ResponseWriter {
    pub fn new(response: Response) -> Self {
        Self {
            head: serialize_head(&response),
            expected: response.content_length(),
            body: response.body,
        }
    }

    /// Writes the whole response, giving each write at most `idle` to
    /// make progress. Returns the number of body bytes sent.
    pub async fn write_to<S>(
        self,
        stream: &mut S,
        chunk_size: usize,
        idle: Duration,
    ) -> anyhow::Result<u64>
    where
        S: AsyncWrite + Unpin,
    {
        write_chunk(stream, &self.head, idle).await?;

        let sent = match self.body {
            Body::Bytes(bytes) => {
                for chunk in bytes.chunks(chunk_size.max(1)) {
                    write_chunk(stream, chunk, idle).await?;
                }
                bytes.len() as u64
            }
            Body::Stream(mut reader) => {
                let mut buf = vec![0u8; chunk_size.max(1)];
                let mut sent = 0u64;
                loop {
                    let n = reader.read(&mut buf).context("reading file content")?;
                    if n == 0 {
                        break;
                    }
                    write_chunk(stream, &buf[..n], idle).await?;
                    sent += n as u64;
                }
                sent
            }
        };

        stream.flush().await?;

        // Content-Length was already sent; a short file means a truncated body.
        if let Some(expected) = self.expected {
            if sent != expected {
                anyhow::bail!("body length {sent} does not match Content-Length {expected}");
            }
        }

        Ok(sent)
    }
}

async fn write_chunk<S>(stream: &mut S, chunk: &[u8], idle: Duration) -> anyhow::Result<()>
where
    S: AsyncWrite + Unpin,
{
    timeout(idle, stream.write_all(chunk))
        .await
        .context("write timed out")?
        .context("connection closed while writing")?;
    Ok(())
}
