use std::time::Duration;

use crate::error::{Result, StreamError};

/// Sample rate the paired receiver plays at.
pub const DEFAULT_SAMPLE_RATE: u32 = 48_000;

/// Packet duration used when none is configured.
pub const DEFAULT_FRAME_DURATION_MS: u32 = 20;

/// Layout of an interleaved raw PCM buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmFormat {
    pub sample_rate: u32,
    pub channels: u16,
    /// Bytes per sample (2 for 16-bit).
    pub sample_width: u16,
}

impl PcmFormat {
    /// 16-bit mono at `sample_rate`, the only format the stream carries.
    pub fn l16_mono(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            channels: 1,
            sample_width: 2,
        }
    }

    /// Bytes per sample frame (one sample for every channel).
    pub fn bytes_per_sample_frame(&self) -> usize {
        self.sample_width as usize * self.channels as usize
    }

    /// Playback duration of `len` bytes in this format.
    pub fn duration_of(&self, len: usize) -> Duration {
        let per_frame = self.bytes_per_sample_frame();
        if per_frame == 0 || self.sample_rate == 0 {
            return Duration::ZERO;
        }
        let samples = (len / per_frame) as f64;
        Duration::from_secs_f64(samples / self.sample_rate as f64)
    }
}

impl Default for PcmFormat {
    fn default() -> Self {
        Self::l16_mono(DEFAULT_SAMPLE_RATE)
    }
}

/// One fixed-size slice of audio ready to be wrapped in an RTP packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFrame {
    /// Exactly `frame_size_bytes` long; the last frame is zero-padded.
    pub payload: Vec<u8>,
    /// Only the first frame of a clip is flagged.
    pub is_first: bool,
}

/// Splits raw PCM into equal-duration frames.
///
/// `samples_per_frame = round(sample_rate * frame_duration_ms / 1000)`,
/// and each frame holds `samples_per_frame * sample_width * channels`
/// bytes. At 48 kHz, 20 ms frames carry 960 samples, i.e. 1920 bytes of
/// 16-bit mono.
#[derive(Debug, Clone)]
pub struct PcmPacketizer {
    format: PcmFormat,
    frame_duration_ms: u32,
    samples_per_frame: u32,
    frame_size_bytes: usize,
}

impl PcmPacketizer {
    /// Create a packetizer for `format` with frames of `frame_duration_ms`.
    ///
    /// Fails if any parameter is zero or the frame rounds down to no
    /// samples at all.
    pub fn new(format: PcmFormat, frame_duration_ms: u32) -> Result<Self> {
        if format.sample_rate == 0 || format.channels == 0 || format.sample_width == 0 {
            return Err(StreamError::Config(format!(
                "invalid PCM format: {format:?}"
            )));
        }
        if frame_duration_ms == 0 {
            return Err(StreamError::Config(
                "frame duration must be at least 1 ms".into(),
            ));
        }

        let samples = (format.sample_rate as u64 * frame_duration_ms as u64 + 500) / 1000;
        if samples == 0 || samples > u32::MAX as u64 {
            return Err(StreamError::Config(format!(
                "{frame_duration_ms} ms at {} Hz does not give a usable frame",
                format.sample_rate
            )));
        }
        let samples_per_frame = samples as u32;
        let frame_size_bytes = samples_per_frame as usize * format.bytes_per_sample_frame();

        tracing::debug!(
            sample_rate = format.sample_rate,
            frame_duration_ms,
            samples_per_frame,
            frame_size_bytes,
            "PCM packetizer created"
        );

        Ok(Self {
            format,
            frame_duration_ms,
            samples_per_frame,
            frame_size_bytes,
        })
    }

    pub fn format(&self) -> PcmFormat {
        self.format
    }

    pub fn frame_duration_ms(&self) -> u32 {
        self.frame_duration_ms
    }

    /// RTP timestamp increment per frame.
    pub fn samples_per_frame(&self) -> u32 {
        self.samples_per_frame
    }

    pub fn frame_size_bytes(&self) -> usize {
        self.frame_size_bytes
    }

    /// Lazily slice `pcm` into frames, in byte order.
    ///
    /// Empty input yields no frames.
    pub fn frames<'a>(&self, pcm: &'a [u8]) -> Frames<'a> {
        Frames {
            remaining: pcm,
            frame_size: self.frame_size_bytes,
            first: true,
        }
    }
}

/// Iterator returned by [`PcmPacketizer::frames`].
#[derive(Debug)]
pub struct Frames<'a> {
    remaining: &'a [u8],
    frame_size: usize,
    first: bool,
}

impl Iterator for Frames<'_> {
    type Item = AudioFrame;

    fn next(&mut self) -> Option<AudioFrame> {
        if self.remaining.is_empty() {
            return None;
        }

        let take = self.frame_size.min(self.remaining.len());
        let (chunk, rest) = self.remaining.split_at(take);
        self.remaining = rest;

        let mut payload = Vec::with_capacity(self.frame_size);
        payload.extend_from_slice(chunk);
        payload.resize(self.frame_size, 0);

        let is_first = std::mem::take(&mut self.first);
        Some(AudioFrame { payload, is_first })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.remaining.len().div_ceil(self.frame_size);
        (n, Some(n))
    }
}

impl ExactSizeIterator for Frames<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn packetizer() -> PcmPacketizer {
        PcmPacketizer::new(PcmFormat::l16_mono(48_000), 20).unwrap()
    }

    #[test]
    fn frame_geometry_48k_20ms() {
        let p = packetizer();
        assert_eq!(p.samples_per_frame(), 960);
        assert_eq!(p.frame_size_bytes(), 1920);
    }

    #[test]
    fn samples_per_frame_rounds() {
        // 66.15 -> 66, 8.5 -> 9
        let p = PcmPacketizer::new(PcmFormat::l16_mono(44_100), 10).unwrap();
        assert_eq!(p.samples_per_frame(), 441);
        let p = PcmPacketizer::new(PcmFormat::l16_mono(22_050), 3).unwrap();
        assert_eq!(p.samples_per_frame(), 66);
        let p = PcmPacketizer::new(PcmFormat::l16_mono(8_500), 1).unwrap();
        assert_eq!(p.samples_per_frame(), 9);
    }

    #[test]
    fn stereo_frame_size() {
        let format = PcmFormat {
            sample_rate: 48_000,
            channels: 2,
            sample_width: 2,
        };
        let p = PcmPacketizer::new(format, 20).unwrap();
        assert_eq!(p.frame_size_bytes(), 3840);
    }

    #[test]
    fn exact_single_frame() {
        let pcm = vec![0x11u8; 1920];
        let frames: Vec<_> = packetizer().frames(&pcm).collect();
        assert_eq!(frames.len(), 1);
        assert!(frames[0].is_first);
        assert_eq!(frames[0].payload, pcm);
    }

    #[test]
    fn short_tail_is_zero_padded() {
        let pcm = vec![0x7Fu8; 2500];
        let frames: Vec<_> = packetizer().frames(&pcm).collect();
        assert_eq!(frames.len(), 2);
        assert!(frames[0].is_first);
        assert!(!frames[1].is_first);

        let last = &frames[1].payload;
        assert_eq!(last.len(), 1920);
        assert!(last[..580].iter().all(|&b| b == 0x7F));
        assert!(last[580..].iter().all(|&b| b == 0));
        assert_eq!(last[580..].len(), 1340);
    }

    #[test]
    fn empty_input_yields_nothing() {
        let mut frames = packetizer().frames(&[]);
        assert_eq!(frames.len(), 0);
        assert!(frames.next().is_none());
    }

    #[test]
    fn frame_count_is_ceil() {
        let p = packetizer();
        for len in [1usize, 1919, 1920, 1921, 3840, 10_000] {
            let pcm = vec![1u8; len];
            let frames = p.frames(&pcm);
            let expected = len.div_ceil(1920);
            assert_eq!(frames.len(), expected, "len {len}");
            let collected: Vec<_> = frames.collect();
            assert_eq!(collected.len(), expected);
            assert!(collected.iter().all(|f| f.payload.len() == 1920));
            assert_eq!(collected.iter().filter(|f| f.is_first).count(), 1);
        }
    }

    #[test]
    fn frames_preserve_byte_order() {
        let pcm: Vec<u8> = (0..4000u32).map(|i| (i % 251) as u8).collect();
        let joined: Vec<u8> = packetizer().frames(&pcm).flat_map(|f| f.payload).collect();
        assert_eq!(&joined[..pcm.len()], &pcm[..]);
    }

    #[test]
    fn rejects_zero_parameters() {
        assert!(PcmPacketizer::new(PcmFormat::l16_mono(48_000), 0).is_err());
        assert!(PcmPacketizer::new(PcmFormat::l16_mono(0), 20).is_err());
        assert!(PcmPacketizer::new(PcmFormat::l16_mono(100), 1).is_err());
    }

    #[test]
    fn duration_of_bytes() {
        let format = PcmFormat::l16_mono(48_000);
        assert_eq!(format.duration_of(96_000), Duration::from_secs(1));
        assert_eq!(format.duration_of(0), Duration::ZERO);
    }
}
