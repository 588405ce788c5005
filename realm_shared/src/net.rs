//! Framed event transport.
//!
//! World events travel over TCP as length-prefixed frames: a big-endian
//! `u32` byte count followed by one JSON-encoded [`WorldEvent`]. TCP gives the
//! per-connection ordering the reconciler relies on.

use std::net::SocketAddr;

use anyhow::Context;
use bytes::{BufMut, Bytes, BytesMut};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
};

use crate::protocol::WorldEvent;

/// Largest frame a peer may announce.
pub const MAX_FRAME_LEN: usize = 4 * 1024 * 1024;

/// Reliable connection over TCP with length-prefixed frames.
#[derive(Debug)]
pub struct ReliableConn {
    stream: TcpStream,
}

impl ReliableConn {
    pub fn new(stream: TcpStream) -> Self {
        Self { stream }
    }

    pub async fn connect(addr: SocketAddr) -> anyhow::Result<Self> {
        let stream = TcpStream::connect(addr).await.context("tcp connect")?;
        Ok(Self::new(stream))
    }

    pub async fn send(&mut self, event: &WorldEvent) -> anyhow::Result<()> {
        let payload = encode_to_bytes(event)?;
        self.send_frame(&payload).await
    }

    /// Writes one frame around an already-encoded payload.
    pub async fn send_frame(&mut self, payload: &[u8]) -> anyhow::Result<()> {
        anyhow::ensure!(
            payload.len() <= MAX_FRAME_LEN,
            "frame too large: {} bytes",
            payload.len()
        );
        let mut buf = BytesMut::with_capacity(4 + payload.len());
        buf.put_u32(payload.len() as u32);
        buf.extend_from_slice(payload);
        self.stream.write_all(&buf).await.context("tcp write")?;
        Ok(())
    }

    /// Reads the next frame and decodes it. `Ok(None)` on a clean close
    /// between frames. A payload that fails to decode is an error here; use
    /// [`ReliableConn::recv_frame`] to tell it apart from a broken stream.
    pub async fn recv(&mut self) -> anyhow::Result<Option<WorldEvent>> {
        match self.recv_frame().await? {
            Some(payload) => decode_from_bytes(&payload).map(Some),
            None => Ok(None),
        }
    }

    /// Reads the next raw frame payload. Errors only for transport failures
    /// and oversized frames, after which the stream cannot be resynced.
    pub async fn recv_frame(&mut self) -> anyhow::Result<Option<Bytes>> {
        let mut len_buf = [0u8; 4];
        match self.stream.read_exact(&mut len_buf).await {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e).context("tcp read len"),
        }
        let len = u32::from_be_bytes(len_buf) as usize;
        anyhow::ensure!(len <= MAX_FRAME_LEN, "frame too large: {len} bytes");

        let mut payload = BytesMut::zeroed(len);
        self.stream
            .read_exact(&mut payload)
            .await
            .context("tcp read payload")?;
        Ok(Some(payload.freeze()))
    }

    pub fn peer_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.stream.peer_addr()?)
    }
}

/// TCP listener handing out framed connections. Servers and test harnesses
/// use it to feed clients.
pub struct ReliableListener {
    listener: TcpListener,
}

impl ReliableListener {
    pub async fn bind(addr: SocketAddr) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(addr).await.context("tcp bind")?;
        Ok(Self { listener })
    }

    pub async fn accept(&self) -> anyhow::Result<(ReliableConn, SocketAddr)> {
        let (stream, addr) = self.listener.accept().await.context("tcp accept")?;
        Ok((ReliableConn::new(stream), addr))
    }

    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }
}

pub fn encode_to_bytes(event: &WorldEvent) -> anyhow::Result<Bytes> {
    let payload = serde_json::to_vec(event).context("serialize event")?;
    Ok(Bytes::from(payload))
}

pub fn decode_from_bytes(b: &[u8]) -> anyhow::Result<WorldEvent> {
    serde_json::from_slice(b).context("deserialize event")
}
