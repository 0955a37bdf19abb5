//! Session control loop
//!
//! Each iteration flushes the session's current reply, reads one line and
//! dispatches it. The loop ends on QUIT, on a closed or failed control
//! connection, or when the shutdown signal fires. Shutdown also preempts a
//! command in progress, so a stalled transfer cannot hold the server open.

use log::{debug, info, warn};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::oneshot;

use crate::client::state::Session;
use crate::error::{ProtocolError, shutdown_reply};
use crate::protocol::{Command, Flow, Verb, dispatch, write_reply};
use crate::server::ServerContext;

enum Event<T> {
    Shutdown,
    Done(T),
}

/// Outcome of reading one control line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineRead {
    Complete,
    TooLong,
    Closed,
}

/// Reads control lines of at most `limit` bytes, terminator included.
///
/// An overlong line is reported as soon as the limit is crossed; the rest
/// of it is skipped on the following reads without being buffered.
pub struct LineReader<R> {
    reader: R,
    limit: usize,
    discarding: bool,
}

impl<R: AsyncBufRead + Unpin> LineReader<R> {
    pub fn new(reader: R, limit: usize) -> Self {
        Self {
            reader,
            limit,
            discarding: false,
        }
    }

    pub async fn next_line(&mut self, line: &mut Vec<u8>) -> io::Result<LineRead> {
        line.clear();
        while self.discarding {
            let buf = self.reader.fill_buf().await?;
            if buf.is_empty() {
                return Ok(LineRead::Closed);
            }
            let newline = buf.iter().position(|&b| b == b'\n');
            let available = buf.len();
            match newline {
                Some(end) => {
                    self.reader.consume(end + 1);
                    self.discarding = false;
                }
                None => self.reader.consume(available),
            }
        }

        let cap = self.limit as u64 + 1;
        let read = (&mut self.reader).take(cap).read_until(b'\n', line).await?;
        if read == 0 {
            return Ok(LineRead::Closed);
        }
        if line.len() <= self.limit {
            return Ok(LineRead::Complete);
        }
        if line.last() != Some(&b'\n') {
            self.discarding = true;
        }
        Ok(LineRead::TooLong)
    }
}

/// Drives one client's control connection until it ends.
///
/// Errors never escape: a failing socket just ends the session. Dropping
/// the session on the way out closes any data channel it still holds.
pub async fn handle_client(
    stream: TcpStream,
    peer: SocketAddr,
    ctx: Arc<ServerContext>,
    mut shutdown: oneshot::Receiver<()>,
) {
    let local = match stream.local_addr() {
        Ok(local) => local,
        Err(e) => {
            warn!("Client {}: cannot read local address: {}", peer, e);
            return;
        }
    };

    let (read_half, mut write_half) = stream.into_split();
    let mut reader = LineReader::new(BufReader::new(read_half), ctx.config.max_command_length);
    let mut session = Session::new(peer, local);
    let mut line = Vec::new();
    let mut closing = false;
    let mut shutting_down = false;

    info!("Client {} connected on {}", peer, local);

    loop {
        if let Err(e) = write_reply(&mut write_half, session.reply()).await {
            warn!("Failed to write to {}: {}", peer, e);
            break;
        }
        debug!("Sent to {}: {}", peer, session.reply());
        if closing {
            break;
        }

        let event = tokio::select! {
            biased;
            _ = &mut shutdown => Event::Shutdown,
            read = reader.next_line(&mut line) => Event::Done(read),
        };
        let read = match event {
            Event::Shutdown => {
                shutting_down = true;
                break;
            }
            Event::Done(read) => read,
        };

        match read {
            Ok(LineRead::Closed) => {
                info!("Connection closed by client {}", peer);
                break;
            }
            Err(e) => {
                warn!("Failed to read from {}: {}", peer, e);
                break;
            }
            Ok(LineRead::TooLong) => {
                warn!("Client {} sent a line over {} bytes", peer, ctx.config.max_command_length);
                session.set_reply(ProtocolError::CommandTooLong.reply());
            }
            Ok(LineRead::Complete) => {
                let text = String::from_utf8_lossy(&line);
                let command = Command::from_line(&text);
                if command.verb == Some(Verb::Pass) {
                    debug!("Received from {}: PASS ****", peer);
                } else {
                    debug!("Received from {}: {:?}", peer, command);
                }

                // Dropping an interrupted dispatch closes the data channel and
                // stream it owns.
                let event = tokio::select! {
                    biased;
                    _ = &mut shutdown => Event::Shutdown,
                    flow = dispatch(&mut session, &command, &ctx, &mut write_half) => Event::Done(flow),
                };
                match event {
                    Event::Shutdown => {
                        shutting_down = true;
                        break;
                    }
                    Event::Done(Ok(Flow::Continue)) => {}
                    Event::Done(Ok(Flow::Close)) => closing = true,
                    Event::Done(Err(e)) => {
                        warn!("Control connection to {} failed: {}", peer, e);
                        break;
                    }
                }
            }
        }
    }

    if shutting_down {
        info!("Closing session {} for server shutdown", peer);
        session.drop_data_channel();
        let _ = write_reply(&mut write_half, &shutdown_reply()).await;
    }

    let user = session.username().unwrap_or("-").to_string();
    drop(session);
    let _ = write_half.shutdown().await;
    info!("Client {} ({}) disconnected", peer, user);
}
