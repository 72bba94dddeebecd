//! Line-delimited JSON transport.
//!
//! - Messages are UTF-8 encoded JSON objects
//! - Messages are delimited by newlines
//! - Messages must not contain embedded newlines
//! - stdin: receives requests from the client
//! - stdout: sends responses to the client
//! - stderr: may be used for logging (never protocol messages)
//!
//! The transport is generic over any buffered reader and writer so the
//! session loop can run over in-memory pipes as well as stdio.

use std::io;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::mcp::protocol::Response;

/// One line read from the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Incoming {
    /// A UTF-8 line with its terminator removed.
    Line(String),
    /// A line whose bytes are not valid UTF-8.
    InvalidUtf8,
}

/// A newline-framed message channel.
pub struct LineTransport<R, W> {
    reader: R,
    writer: W,
}

/// The transport over the process's standard streams.
pub type StdioTransport = LineTransport<BufReader<tokio::io::Stdin>, tokio::io::Stdout>;

impl StdioTransport {
    /// Creates a transport reading stdin and writing stdout.
    #[must_use]
    pub fn stdio() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

impl<R, W> LineTransport<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Wraps a reader and writer.
    pub const fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    /// Reads the next message line.
    ///
    /// Returns `None` once the reader is closed (EOF). A line that is not
    /// valid UTF-8 is consumed and reported as [`Incoming::InvalidUtf8`].
    ///
    /// # Errors
    ///
    /// Returns an error if reading fails.
    pub async fn read_line(&mut self) -> io::Result<Option<Incoming>> {
        let mut buf = Vec::new();
        let bytes_read = self.reader.read_until(b'\n', &mut buf).await?;

        if bytes_read == 0 {
            return Ok(None);
        }

        if buf.last() == Some(&b'\n') {
            buf.pop();
            if buf.last() == Some(&b'\r') {
                buf.pop();
            }
        }

        Ok(Some(
            String::from_utf8(buf).map_or(Incoming::InvalidUtf8, Incoming::Line),
        ))
    }

    /// Writes a response, serialised to JSON and terminated with a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialisation or writing fails.
    pub async fn write_response(&mut self, response: &Response) -> io::Result<()> {
        let json = serde_json::to_string(response)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        self.write_raw(&json).await
    }

    async fn write_raw(&mut self, json: &str) -> io::Result<()> {
        debug_assert!(
            !json.contains('\n'),
            "JSON message must not contain embedded newlines"
        );

        self.writer.write_all(json.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;

        Ok(())
    }

    /// Returns the underlying reader and writer.
    pub fn into_inner(self) -> (R, W) {
        (self.reader, self.writer)
    }
}
