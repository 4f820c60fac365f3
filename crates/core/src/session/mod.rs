//! Per-stream RTP state.
//!
//! A session is one pass over one audio clip to one peer. It owns:
//!
//! - The sequence number, starting at 0 and wrapping at 65536.
//! - The RTP timestamp, starting at 0 and advancing by the number of
//!   samples in each frame, wrapping at 2^32.
//! - The SSRC, fixed for the session's lifetime.
//!
//! State is an ordinary value owned by whoever drives the stream, so two
//! sessions in the same process never share counters.
//!
//! ## Lifecycle
//!
//! ```text
//! new / with_random_ssrc -> (seq 0, ts 0)
//! envelope(frame)        -> header for the frame about to be sent
//! advance()              -> seq + 1, ts + samples_per_frame
//! ```

use crate::media::{AudioFrame, RtpHeader};

/// Sequence, timestamp, and SSRC for one RTP stream.
#[derive(Debug, Clone)]
pub struct StreamState {
    ssrc: u32,
    payload_type: u8,
    samples_per_frame: u32,
    sequence: u16,
    timestamp: u32,
}

impl StreamState {
    /// Create stream state with an explicit SSRC.
    pub fn new(ssrc: u32, payload_type: u8, samples_per_frame: u32) -> Self {
        tracing::debug!(
            payload_type,
            samples_per_frame,
            ssrc = format_args!("{:#010X}", ssrc),
            "RTP stream state created"
        );
        Self {
            ssrc,
            payload_type,
            samples_per_frame,
            sequence: 0,
            timestamp: 0,
        }
    }

    /// Create with a random SSRC.
    ///
    /// Per RFC 3550 §8.1, the SSRC should be chosen randomly to minimize
    /// the probability of collisions between independent sessions.
    pub fn with_random_ssrc(payload_type: u8, samples_per_frame: u32) -> Self {
        Self::new(rand::random::<u32>(), payload_type, samples_per_frame)
    }

    pub fn ssrc(&self) -> u32 {
        self.ssrc
    }

    pub fn payload_type(&self) -> u8 {
        self.payload_type
    }

    /// Sequence number the next packet will carry.
    pub fn sequence(&self) -> u16 {
        self.sequence
    }

    /// Timestamp the next packet will carry.
    pub fn timestamp(&self) -> u32 {
        self.timestamp
    }

    pub fn samples_per_frame(&self) -> u32 {
        self.samples_per_frame
    }

    /// Header for `frame` at the current position. Does not mutate state.
    pub fn envelope(&self, frame: &AudioFrame) -> RtpHeader {
        RtpHeader {
            marker: frame.is_first,
            payload_type: self.payload_type,
            sequence: self.sequence,
            timestamp: self.timestamp,
            ssrc: self.ssrc,
        }
    }

    /// Move past the frame just handed to the transport.
    pub fn advance(&mut self) {
        self.sequence = self.sequence.wrapping_add(1);
        self.timestamp = self.timestamp.wrapping_add(self.samples_per_frame);
    }
}
