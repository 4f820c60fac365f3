//! Error types for the RTP audio sender.

use std::fmt;
use std::time::Duration;

/// Errors that can occur while preparing or running an audio stream.
///
/// Variants map to specific failure modes across the stack:
///
/// - **Setup**: [`Config`](Self::Config), [`Decode`](Self::Decode):
///   detected before any packet is built.
/// - **Rendezvous**: [`RendezvousTimeout`](Self::RendezvousTimeout):
///   no device announced itself in time.
/// - **Transport**: [`Transmission`](Self::Transmission),
///   [`NoPeer`](Self::NoPeer), [`Io`](Self::Io).
/// - **Wire**: [`Parse`](Self::Parse): malformed inbound RTP packet.
///
/// User cancellation is not an error; see
/// [`StreamSummary::cancelled`](crate::streamer::StreamSummary::cancelled).
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// Invalid file path, port, or stream parameter.
    #[error("configuration error: {0}")]
    Config(String),

    /// The decoding collaborator could not turn the input into PCM.
    #[error("decode error: {0}")]
    Decode(String),

    /// No hello datagram arrived within the rendezvous window.
    #[error("no client connected within {}s", .timeout.as_secs())]
    RendezvousTimeout { timeout: Duration },

    /// A send failed mid-stream. `sent` packets were delivered to the
    /// socket before the failure.
    #[error("transmission failed after {sent} packets: {source}")]
    Transmission {
        sent: u64,
        #[source]
        source: std::io::Error,
    },

    /// A packet was sent before the peer address was known.
    #[error("no peer address: rendezvous has not completed")]
    NoPeer,

    /// Underlying I/O or socket error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse an RTP packet (RFC 3550 §5.1).
    #[error("RTP parse error: {kind}")]
    Parse { kind: ParseErrorKind },
}

/// Specific kind of RTP parse failure.
#[derive(Debug, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// Fewer than 12 bytes.
    TooShort,
    /// Version field was not 2.
    BadVersion(u8),
    /// CSRC list, extension, or padding runs past the end of the packet.
    Truncated,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooShort => write!(f, "packet too small for RTP header"),
            Self::BadVersion(v) => write!(f, "invalid RTP version {v}"),
            Self::Truncated => write!(f, "truncated header"),
        }
    }
}

/// Convenience alias for `Result<T, StreamError>`.
pub type Result<T> = std::result::Result<T, StreamError>;
