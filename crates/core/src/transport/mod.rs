//! Network transport for RTP media delivery.
//!
//! One UDP socket per session, with two ways to learn where to send:
//!
//! - **Direct**: the destination is configured up front.
//! - **Rendezvous**: bind a known port and wait for the device to send
//!   any datagram; its source address becomes the destination.
//!
//! There is no RTCP and no retransmission. Send errors surface to the
//! caller and nothing is queued.

pub mod udp;

use std::net::SocketAddr;
use std::time::Duration;

use crate::error::{Result, StreamError};

pub use udp::{PeerState, UdpTransport};

/// Port the paired receiver targets by default.
pub const DEFAULT_PORT: u16 = 5004;

/// How long rendezvous waits for the hello datagram.
pub const RENDEZVOUS_TIMEOUT: Duration = Duration::from_secs(60);

/// How the session finds its peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerMode {
    /// Send to a fixed address; no handshake.
    Direct(SocketAddr),
    /// Listen on `port` and stream to whoever says hello first.
    Rendezvous { port: u16 },
}

impl PeerMode {
    pub fn validate(&self) -> Result<()> {
        let port = match self {
            Self::Direct(addr) => addr.port(),
            Self::Rendezvous { port } => *port,
        };
        if port == 0 {
            return Err(StreamError::Config("port must be in 1-65535".into()));
        }
        Ok(())
    }
}

impl Default for PeerMode {
    fn default() -> Self {
        Self::Rendezvous { port: DEFAULT_PORT }
    }
}

/// Destination for serialized RTP packets.
///
/// [`UdpTransport`] is the production sink; the
/// [`Streamer`](crate::Streamer) only depends on this trait.
pub trait PacketSink {
    /// Hand one complete packet to the network. Returns bytes written.
    fn send_packet(&mut self, packet: &[u8]) -> Result<usize>;
}

impl<S: PacketSink + ?Sized> PacketSink for &mut S {
    fn send_packet(&mut self, packet: &[u8]) -> Result<usize> {
        (**self).send_packet(packet)
    }
}
