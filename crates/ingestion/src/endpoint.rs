//! Instrument-facing TCP endpoint
//!
//! Accepts instrument connections, acknowledges the low-level handshake
//! (ENQ, frames, EOT) and turns each completed transmission into one
//! `Message` on the queue. Checksums are carried in the raw frames and
//! never verified here.

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use contracts::record::{ACK, EOT, ENQ, ETB, ETX, LF, NAK, STX};
use contracts::Message;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, instrument, warn};

use crate::error::{IngestionError, Result};
use crate::metrics::IngestionMetrics;
use crate::queue::MessageProducer;

const READ_BUFFER_SIZE: usize = 4096;

/// Largest raw frame (STX..LF) accepted
pub const MAX_FRAME_SIZE: usize = 64 * 1024;

/// Largest transmission (sum of its frames) accepted
pub const MAX_TRANSMISSION_SIZE: usize = 16 * 1024 * 1024;

/// TCP endpoint feeding the message queue
pub struct AstmEndpoint {
    listener: TcpListener,
    producer: MessageProducer,
}

impl AstmEndpoint {
    /// Bind the listener
    ///
    /// # Errors
    /// The address cannot be bound
    #[instrument(name = "endpoint_bind", skip(producer))]
    pub async fn bind(host: &str, port: u16, producer: MessageProducer) -> Result<Self> {
        let listener = TcpListener::bind((host, port))
            .await
            .map_err(|source| IngestionError::Bind {
                addr: format!("{host}:{port}"),
                source,
            })?;

        Ok(Self { listener, producer })
    }

    /// Address actually bound (useful with port 0)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until the task is cancelled
    ///
    /// Connection tasks are owned by this future; cancelling it closes every
    /// open instrument connection.
    #[instrument(name = "endpoint_serve", skip(self))]
    pub async fn serve(self) {
        let metrics = self.producer.metrics();
        let mut connections = JoinSet::new();

        if let Ok(addr) = self.listener.local_addr() {
            info!(%addr, "Endpoint ready to handle connections");
        }

        loop {
            tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        metrics.record_connection();
                        debug!(%peer, "Instrument connected");
                        connections.spawn(handle_connection(
                            stream,
                            peer,
                            self.producer.clone(),
                            Arc::clone(&metrics),
                        ));
                    }
                    Err(e) => {
                        warn!(error = %e, "Accept failed");
                    }
                },
                Some(joined) = connections.join_next(), if !connections.is_empty() => {
                    if let Err(e) = joined {
                        if e.is_panic() {
                            error!(error = ?e, "Connection task panicked");
                        }
                    }
                }
            }
        }
    }

    /// Spawn the accept loop as a background task
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.serve())
    }
}

#[instrument(name = "endpoint_connection", skip_all, fields(peer = %peer))]
async fn handle_connection(
    mut stream: TcpStream,
    peer: SocketAddr,
    producer: MessageProducer,
    metrics: Arc<IngestionMetrics>,
) {
    let mut transmission = Transmission::default();
    let mut buf = [0u8; READ_BUFFER_SIZE];

    loop {
        let n = match stream.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                warn!(error = %e, "Read failed");
                break;
            }
        };

        for &byte in &buf[..n] {
            let frames_before = transmission.frames();
            let action = transmission.feed(byte);
            if transmission.frames() > frames_before {
                metrics.record_frame();
            }

            match action {
                Some(Action::Reply(code)) => {
                    if let Err(e) = stream.write_all(&[code]).await {
                        warn!(error = %e, "Write failed");
                        return;
                    }
                }
                Some(Action::Reject) => {
                    metrics.record_discarded();
                    warn!("Transmission exceeds size limit, discarding");
                    if let Err(e) = stream.write_all(&[NAK]).await {
                        warn!(error = %e, "Write failed");
                        return;
                    }
                }
                Some(Action::Deliver(message)) => {
                    debug!(lines = message.len(), "Transmission complete");
                    if producer.enqueue(message).is_err() {
                        warn!("Message queue closed, dropping connection");
                        return;
                    }
                }
                None => {}
            }
        }
    }

    if transmission.in_progress() {
        metrics.record_discarded();
        warn!(
            frames = transmission.frames(),
            "Connection closed mid-transmission, discarding"
        );
    }
    debug!("Instrument disconnected");
}

/// What the connection should do after a byte
#[derive(Debug, PartialEq)]
enum Action {
    /// Send a control byte back
    Reply(u8),
    /// Size limit exceeded: transmission dropped, reply NAK
    Reject,
    /// Transmission complete
    Deliver(Message),
}

/// Per-connection transmission state
#[derive(Debug, Default)]
struct Transmission {
    /// Between ENQ and EOT
    active: bool,
    /// Frame being received, if any
    frame: Option<BytesMut>,
    /// Saw ETX/ETB in the current frame
    frame_ended: bool,
    /// Completed frames of this transmission
    lines: Vec<Bytes>,
    /// Bytes held in `lines`
    size: usize,
}

impl Transmission {
    fn feed(&mut self, byte: u8) -> Option<Action> {
        if !self.active {
            if byte == ENQ {
                self.active = true;
                self.lines.clear();
                self.size = 0;
                return Some(Action::Reply(ACK));
            }
            return None;
        }

        if let Some(frame) = self.frame.as_mut() {
            if byte == EOT && !self.frame_ended {
                // Sender gave up mid-frame
                self.frame = None;
                return self.finish();
            }
            if frame.len() >= MAX_FRAME_SIZE {
                return self.reject();
            }
            frame.extend_from_slice(&[byte]);
            if byte == ETX || byte == ETB {
                self.frame_ended = true;
            } else if byte == LF && self.frame_ended {
                let line = self.frame.take().map(BytesMut::freeze).unwrap_or_default();
                if self.size + line.len() > MAX_TRANSMISSION_SIZE {
                    return self.reject();
                }
                self.size += line.len();
                self.lines.push(line);
                self.frame_ended = false;
                return Some(Action::Reply(ACK));
            }
            return None;
        }

        match byte {
            STX => {
                let mut frame = BytesMut::with_capacity(256);
                frame.extend_from_slice(&[STX]);
                self.frame = Some(frame);
                self.frame_ended = false;
                None
            }
            EOT => self.finish(),
            ENQ => Some(Action::Reply(ACK)),
            _ => None,
        }
    }

    /// Drop everything and wait for the next ENQ
    fn reject(&mut self) -> Option<Action> {
        *self = Self::default();
        Some(Action::Reject)
    }

    fn finish(&mut self) -> Option<Action> {
        self.active = false;
        self.frame_ended = false;
        self.size = 0;
        if self.lines.is_empty() {
            return None;
        }
        let lines = std::mem::take(&mut self.lines);
        Some(Action::Deliver(Message::new(lines)))
    }

    fn in_progress(&self) -> bool {
        self.active && (!self.lines.is_empty() || self.frame.is_some())
    }

    fn frames(&self) -> usize {
        self.lines.len()
    }
}
