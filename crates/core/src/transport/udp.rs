use std::io::ErrorKind;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};
use std::time::Duration;

use super::{PacketSink, PeerMode};
use crate::error::{Result, StreamError};

/// Read timeout applied after rendezvous. Stray datagrams from the device
/// are never read, so this only bounds an accidental receive.
const STREAMING_READ_TIMEOUT: Duration = Duration::from_millis(100);

/// The hello datagram is never inspected; this only needs to hold one.
const HELLO_BUF_LEN: usize = 1024;

/// Which phase the socket is in.
///
/// ```text
/// rendezvous(port) -> AwaitingPeer --hello datagram--> Streaming(peer)
/// direct(peer)     -> Streaming(peer)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerState {
    /// Bound and listening; no destination yet.
    AwaitingPeer,
    /// Destination known; packets may be sent.
    Streaming(SocketAddr),
}

/// UDP transport for outbound RTP packet delivery.
///
/// Owns exactly one socket for the session. In direct mode the socket is
/// bound to an ephemeral port and the peer is known up front; in
/// rendezvous mode it is bound to the configured port and the peer is
/// learned from the first inbound datagram. The socket is closed when the
/// transport is dropped.
#[derive(Debug)]
pub struct UdpTransport {
    socket: UdpSocket,
    state: PeerState,
}

impl UdpTransport {
    /// Open a transport for the configured peer-discovery mode.
    pub fn open(mode: &PeerMode) -> Result<Self> {
        mode.validate()?;
        match *mode {
            PeerMode::Direct(peer) => Self::direct(peer),
            PeerMode::Rendezvous { port } => Self::rendezvous(port),
        }
    }

    /// Bind an ephemeral socket that sends to a fixed `peer`.
    pub fn direct(peer: SocketAddr) -> Result<Self> {
        let wildcard = match peer {
            SocketAddr::V4(_) => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            SocketAddr::V6(_) => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
        };
        let socket = UdpSocket::bind(SocketAddr::new(wildcard, 0))?;
        tracing::debug!(local = ?socket.local_addr().ok(), %peer, "direct UDP transport bound");
        Ok(Self {
            socket,
            state: PeerState::Streaming(peer),
        })
    }

    /// Bind `0.0.0.0:port` and wait for a device to announce itself.
    pub fn rendezvous(port: u16) -> Result<Self> {
        let socket = UdpSocket::bind(SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port))?;
        tracing::info!(port, "RTP server listening for client hello");
        Ok(Self {
            socket,
            state: PeerState::AwaitingPeer,
        })
    }

    /// Block until any datagram arrives and adopt its sender as the peer.
    ///
    /// The datagram's content is ignored. Returns
    /// [`StreamError::RendezvousTimeout`] if nothing arrives within
    /// `timeout`. If the peer is already known this returns immediately.
    pub fn wait_for_peer(&mut self, timeout: Duration) -> Result<SocketAddr> {
        if let PeerState::Streaming(peer) = self.state {
            return Ok(peer);
        }
        if timeout.is_zero() {
            return Err(StreamError::Config(
                "rendezvous timeout must be non-zero".into(),
            ));
        }

        self.socket.set_read_timeout(Some(timeout))?;

        let mut buf = [0u8; HELLO_BUF_LEN];
        let (len, peer) = match self.socket.recv_from(&mut buf) {
            Ok(received) => received,
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                tracing::warn!(timeout_secs = timeout.as_secs(), "no client connected");
                return Err(StreamError::RendezvousTimeout { timeout });
            }
            Err(e) => return Err(e.into()),
        };

        self.socket.set_read_timeout(Some(STREAMING_READ_TIMEOUT))?;
        self.state = PeerState::Streaming(peer);
        tracing::info!(%peer, hello_len = len, "client connected");
        Ok(peer)
    }

    /// Make sure a peer is known before streaming starts.
    ///
    /// Direct transports already have one; rendezvous transports wait up
    /// to `timeout` for the hello datagram.
    pub fn resolve_peer(&mut self, timeout: Duration) -> Result<SocketAddr> {
        self.wait_for_peer(timeout)
    }

    /// Send one datagram to the peer.
    pub fn send(&self, packet: &[u8]) -> Result<usize> {
        match self.state {
            PeerState::Streaming(peer) => Ok(self.socket.send_to(packet, peer)?),
            PeerState::AwaitingPeer => Err(StreamError::NoPeer),
        }
    }

    pub fn phase(&self) -> PeerState {
        self.state
    }

    pub fn peer(&self) -> Option<SocketAddr> {
        match self.state {
            PeerState::Streaming(peer) => Some(peer),
            PeerState::AwaitingPeer => None,
        }
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }
}

impl PacketSink for UdpTransport {
    fn send_packet(&mut self, packet: &[u8]) -> Result<usize> {
        self.send(packet)
    }
}

/// Address this host would use to reach the wider network.
///
/// Connecting a UDP socket only selects a route; no packet is sent. Used
/// to tell the operator which address the device should target.
pub fn primary_local_ip() -> Option<IpAddr> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).ok()?;
    socket.connect((Ipv4Addr::new(8, 8, 8, 8), 80)).ok()?;
    socket.local_addr().ok().map(|addr| addr.ip())
}
