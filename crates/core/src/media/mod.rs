//! Audio framing and RTP serialization.
//!
//! ## RTP overview (RFC 3550)
//!
//! Decoded audio is cut into equal-duration frames by
//! [`pcm::PcmPacketizer`], and every frame travels in one RTP packet.
//! Each packet carries a 12-byte fixed header ([`rtp::RtpHeader`])
//! containing:
//!
//! - **Sequence number** (16-bit, wrapping): for reordering and loss detection.
//! - **Timestamp** (32-bit): sample clock, advanced by samples per frame.
//! - **SSRC** (32-bit): identifies the sender for the whole session.
//! - **Marker bit**: set on the first packet of the session.
//!
//! The payload is raw 16-bit PCM (payload type 11, "L16"), mono, sent
//! without any codec-specific framing.

pub mod pcm;
pub mod rtp;

pub use pcm::{AudioFrame, PcmFormat, PcmPacketizer};
pub use rtp::{PAYLOAD_TYPE_L16, RTP_HEADER_LEN, RtpHeader};
