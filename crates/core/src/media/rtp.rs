use crate::error::{ParseErrorKind, Result, StreamError};

/// Length of the fixed RTP header in bytes.
pub const RTP_HEADER_LEN: usize = 12;

/// RTP version carried in the top two bits of the first byte.
pub const RTP_VERSION: u8 = 2;

/// Payload type for 16-bit linear PCM (RFC 3551 "L16").
///
/// RFC 3551 pairs PT 11 with 44.1 kHz mono; the paired receiver expects
/// PT 11 at 48 kHz, so the value is kept as-is.
pub const PAYLOAD_TYPE_L16: u8 = 11;

/// RTP fixed header (RFC 3550 §5.1).
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |V=2|P|X|  CC   |M|     PT      |       Sequence Number         |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                           Timestamp                           |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                             SSRC                              |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
///
/// The sender always writes version 2 with padding, extension, and CSRC
/// count cleared, so only the marker, payload type, sequence number,
/// timestamp, and SSRC are carried here. Sequence number and timestamp
/// are plain `u16`/`u32`; wrapping is the caller's arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RtpHeader {
    /// Marker bit. Set on the first packet of a session.
    pub marker: bool,
    /// RTP payload type (7-bit, RFC 3551).
    pub payload_type: u8,
    pub sequence: u16,
    pub timestamp: u32,
    /// Synchronization source identifier (RFC 3550 §8.1).
    pub ssrc: u32,
}

impl RtpHeader {
    /// Serialize the 12-byte fixed header, multi-byte fields big-endian.
    pub fn encode(&self) -> [u8; RTP_HEADER_LEN] {
        let first_byte: u8 = RTP_VERSION << 6;
        let second_byte: u8 = ((self.marker as u8) << 7) | (self.payload_type & 0x7f);

        let mut header = [0u8; RTP_HEADER_LEN];
        header[0] = first_byte;
        header[1] = second_byte;
        header[2..4].copy_from_slice(&self.sequence.to_be_bytes());
        header[4..8].copy_from_slice(&self.timestamp.to_be_bytes());
        header[8..12].copy_from_slice(&self.ssrc.to_be_bytes());
        header
    }

    /// Build a complete packet: encoded header followed by `payload`.
    pub fn packet(&self, payload: &[u8]) -> Vec<u8> {
        let mut packet = Vec::with_capacity(RTP_HEADER_LEN + payload.len());
        packet.extend_from_slice(&self.encode());
        packet.extend_from_slice(payload);
        packet
    }
}

/// Parse an RTP packet into its header and payload.
///
/// Accepts anything a conforming sender may emit, not only what
/// [`RtpHeader::encode`] writes: CSRC identifiers and a header extension
/// are skipped, and trailing padding is stripped when the P bit is set.
pub fn parse_packet(packet: &[u8]) -> Result<(RtpHeader, &[u8])> {
    if packet.len() < RTP_HEADER_LEN {
        return Err(StreamError::Parse {
            kind: ParseErrorKind::TooShort,
        });
    }

    let version = packet[0] >> 6;
    if version != RTP_VERSION {
        return Err(StreamError::Parse {
            kind: ParseErrorKind::BadVersion(version),
        });
    }

    let padding = packet[0] & 0x20 != 0;
    let extension = packet[0] & 0x10 != 0;
    let csrc_count = (packet[0] & 0x0f) as usize;

    let header = RtpHeader {
        marker: packet[1] & 0x80 != 0,
        payload_type: packet[1] & 0x7f,
        sequence: u16::from_be_bytes([packet[2], packet[3]]),
        timestamp: u32::from_be_bytes([packet[4], packet[5], packet[6], packet[7]]),
        ssrc: u32::from_be_bytes([packet[8], packet[9], packet[10], packet[11]]),
    };

    let truncated = || StreamError::Parse {
        kind: ParseErrorKind::Truncated,
    };

    let mut offset = RTP_HEADER_LEN + csrc_count * 4;
    if extension {
        // 16-bit profile, 16-bit length in 32-bit words, then the words.
        let ext = packet.get(offset..offset + 4).ok_or_else(truncated)?;
        let words = u16::from_be_bytes([ext[2], ext[3]]) as usize;
        offset += 4 + words * 4;
    }
    if offset > packet.len() {
        return Err(truncated());
    }

    let mut payload = &packet[offset..];
    if padding {
        let pad = *payload.last().ok_or_else(truncated)? as usize;
        if pad == 0 || pad > payload.len() {
            return Err(truncated());
        }
        payload = &payload[..payload.len() - pad];
    }

    Ok((header, payload))
}
