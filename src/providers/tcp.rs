//! TCP provider for a live emostate server

use futures::StreamExt;
use tokio::net::TcpStream;
use tokio_util::codec::FramedRead;
use tracing::{debug, info, trace};

use crate::codec::{self, LineDecoder};
use crate::provider::Provider;
use crate::types::EmostatePacket;
use crate::{ClientConfig, ClientError, Result};

/// Provider reading newline-delimited packets from a TCP stream
pub struct TcpProvider {
    lines: FramedRead<TcpStream, LineDecoder>,
    peer: String,
    received: u64,
}

impl TcpProvider {
    /// Resolve `host`, connect, and wrap the stream in a line decoder
    pub async fn connect(host: &str, port: u16, config: &ClientConfig) -> Result<Self> {
        let timeout = config.connect_timeout();
        debug!(host, port, ?timeout, "Connecting to emostate server");

        let stream = match tokio::time::timeout(timeout, TcpStream::connect((host, port))).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                return Err(ClientError::connection_failed_with_source(
                    format!("{host}:{port}"),
                    Box::new(e),
                ));
            }
            Err(_) => return Err(ClientError::Timeout { duration: timeout }),
        };
        stream.set_nodelay(true)?;

        let peer = match stream.peer_addr() {
            Ok(addr) => addr.to_string(),
            Err(_) => format!("{host}:{port}"),
        };
        info!(%peer, "Connected to emostate server");

        let decoder = LineDecoder::new(config.max_frame_length);
        Ok(Self { lines: FramedRead::new(stream, decoder), peer, received: 0 })
    }
}

#[async_trait::async_trait]
impl Provider for TcpProvider {
    async fn next_packet(&mut self) -> Result<Option<EmostatePacket>> {
        loop {
            let line = match self.lines.next().await {
                Some(Ok(Ok(line))) => line,
                // Overlong or not UTF-8; the decoder has already moved past it
                Some(Ok(Err(e))) => return Err(e),
                Some(Err(e)) => return Err(e.into()),
                None => {
                    debug!(peer = %self.peer, received = self.received, "Server closed the stream");
                    return Ok(None);
                }
            };

            match codec::decode_line(&line)? {
                Some(packet) => {
                    self.received += 1;
                    trace!(peer = %self.peer, tick = packet.tick(), "Packet decoded");
                    return Ok(Some(packet));
                }
                None => {
                    trace!(peer = %self.peer, "Keep-alive");
                    continue;
                }
            }
        }
    }

    fn peer(&self) -> String {
        self.peer.clone()
    }
}
