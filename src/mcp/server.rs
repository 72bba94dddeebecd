//! The session loop.
//!
//! One message at a time: read a line, decode it, dispatch it, write the
//! response, repeat. The next line is only read after the previous
//! response has been written, so responses leave in arrival order.
//!
//! The loop ends on end-of-stream, on a transport I/O error, or (for
//! [`McpServer::run`]) on SIGINT/SIGTERM. Decode failures and tool errors
//! are answered and the loop continues.

use std::io;

use tokio::io::{AsyncBufRead, AsyncWrite};

use crate::mcp::dispatcher::Dispatcher;
use crate::mcp::protocol::{parse_request, ErrorBody, ErrorCode, Response};
use crate::mcp::transport::{Incoming, LineTransport, StdioTransport};

/// Session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Created, not yet serving.
    Idle,
    /// Reading and answering requests.
    Running,
    /// The channel closed or a shutdown signal arrived.
    ShuttingDown,
}

/// A tool server bound to one client session.
pub struct McpServer {
    state: ServerState,
    dispatcher: Dispatcher,
    handled: u64,
}

impl McpServer {
    /// Creates a server around a dispatcher.
    #[must_use]
    pub const fn new(dispatcher: Dispatcher) -> Self {
        Self {
            state: ServerState::Idle,
            dispatcher,
            handled: 0,
        }
    }

    /// Returns the current server state.
    #[must_use]
    pub const fn state(&self) -> ServerState {
        self.state
    }

    /// Number of requests answered so far.
    #[must_use]
    pub const fn handled(&self) -> u64 {
        self.handled
    }

    /// Serves the session over stdio with graceful shutdown handling.
    ///
    /// # Errors
    ///
    /// Returns an error if transport I/O fails.
    pub async fn run(&mut self) -> io::Result<()> {
        let mut transport = StdioTransport::stdio();
        self.run_with_shutdown(&mut transport).await
    }

    /// Runs the main loop and handles shutdown.
    #[cfg(unix)]
    async fn run_with_shutdown(&mut self, transport: &mut StdioTransport) -> io::Result<()> {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt()).map_err(io::Error::other)?;
        let mut sigterm = signal(SignalKind::terminate()).map_err(io::Error::other)?;

        self.state = ServerState::Running;
        loop {
            tokio::select! {
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT, initiating graceful shutdown");
                    self.state = ServerState::ShuttingDown;
                    return Ok(());
                }

                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM, initiating graceful shutdown");
                    self.state = ServerState::ShuttingDown;
                    return Ok(());
                }

                line_result = transport.read_line() => {
                    if self.handle_transport_result(transport, line_result).await? {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Runs the main loop and handles shutdown.
    #[cfg(windows)]
    async fn run_with_shutdown(&mut self, transport: &mut StdioTransport) -> io::Result<()> {
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        self.state = ServerState::Running;
        loop {
            tokio::select! {
                _ = &mut ctrl_c => {
                    tracing::info!("Received Ctrl+C, initiating graceful shutdown");
                    self.state = ServerState::ShuttingDown;
                    return Ok(());
                }

                line_result = transport.read_line() => {
                    if self.handle_transport_result(transport, line_result).await? {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Serves the session over an arbitrary transport until end-of-stream.
    ///
    /// # Errors
    ///
    /// Returns an error if transport I/O fails.
    pub async fn serve<R, W>(&mut self, transport: &mut LineTransport<R, W>) -> io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        self.state = ServerState::Running;
        loop {
            let line_result = transport.read_line().await;
            if self.handle_transport_result(transport, line_result).await? {
                return Ok(());
            }
        }
    }

    /// Handles the result from a transport read.
    ///
    /// Returns `true` if the server should shut down.
    async fn handle_transport_result<R, W>(
        &mut self,
        transport: &mut LineTransport<R, W>,
        line_result: io::Result<Option<Incoming>>,
    ) -> io::Result<bool>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let Some(incoming) = line_result? else {
            tracing::info!(handled = self.handled, "Input closed, ending session");
            self.state = ServerState::ShuttingDown;
            return Ok(true);
        };

        match incoming {
            Incoming::Line(line) if line.trim().is_empty() => return Ok(false),
            Incoming::Line(line) => self.handle_line(transport, &line).await?,
            Incoming::InvalidUtf8 => {
                tracing::warn!("Rejected request that is not valid UTF-8");
                let response = Response::error(
                    None,
                    ErrorBody::new(ErrorCode::ProtocolDecodeError, "message is not valid UTF-8"),
                );
                self.respond(transport, &response).await?;
            }
        }
        Ok(self.state == ServerState::ShuttingDown)
    }

    /// Handles a single line of input.
    async fn handle_line<R, W>(
        &mut self,
        transport: &mut LineTransport<R, W>,
        line: &str,
    ) -> io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let response = match parse_request(line) {
            Ok(request) => self.dispatcher.dispatch(request).await,
            Err(error) => {
                tracing::warn!(id = ?error.id, error = %error.message, "Rejected undecodable request");
                error.into_response()
            }
        };

        self.respond(transport, &response).await
    }

    async fn respond<R, W>(
        &mut self,
        transport: &mut LineTransport<R, W>,
        response: &Response,
    ) -> io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        transport.write_response(response).await?;
        self.handled += 1;
        Ok(())
    }
}
