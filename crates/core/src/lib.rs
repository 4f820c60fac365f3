pub mod error;
pub mod media;
pub mod session;
pub mod streamer;
pub mod transport;

pub use error::{Result, StreamError};
pub use media::{AudioFrame, PcmFormat, PcmPacketizer, RtpHeader};
pub use session::StreamState;
pub use streamer::{StopHandle, StreamSummary, Streamer, StreamerConfig};
pub use transport::{PacketSink, PeerMode, UdpTransport};
