use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{Result, StreamError};
use crate::media::pcm::DEFAULT_FRAME_DURATION_MS;
use crate::media::{AudioFrame, PAYLOAD_TYPE_L16, PcmFormat, PcmPacketizer};
use crate::session::StreamState;
use crate::transport::{PacketSink, RENDEZVOUS_TIMEOUT, UdpTransport};

/// Fraction of the frame duration slept between packets.
pub const DEFAULT_PACING_BIAS: f64 = 0.95;

/// Packets between progress log lines.
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 50;

/// Stream-level configuration.
#[derive(Debug, Clone)]
pub struct StreamerConfig {
    /// Audio carried per packet, in milliseconds.
    pub frame_duration_ms: u32,
    /// Multiplier applied to the frame duration for the inter-packet sleep.
    /// `0.0` disables pacing entirely.
    pub pacing_bias: f64,
    /// RTP payload type written into every header.
    pub payload_type: u8,
    /// Fixed SSRC. When `None`, a random one is chosen per session.
    pub ssrc: Option<u32>,
    /// How long rendezvous mode waits for the hello datagram.
    pub rendezvous_timeout: Duration,
    /// Log progress every this many packets. `0` disables progress logs.
    pub progress_interval: u64,
}

impl Default for StreamerConfig {
    fn default() -> Self {
        Self {
            frame_duration_ms: DEFAULT_FRAME_DURATION_MS,
            pacing_bias: DEFAULT_PACING_BIAS,
            payload_type: PAYLOAD_TYPE_L16,
            ssrc: None,
            rendezvous_timeout: RENDEZVOUS_TIMEOUT,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

impl StreamerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.frame_duration_ms == 0 {
            return Err(StreamError::Config(
                "frame duration must be at least 1 ms".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.pacing_bias) {
            return Err(StreamError::Config(format!(
                "pacing bias {} outside 0.0-1.0",
                self.pacing_bias
            )));
        }
        if self.payload_type > 0x7f {
            return Err(StreamError::Config(format!(
                "payload type {} does not fit in 7 bits",
                self.payload_type
            )));
        }
        if self.rendezvous_timeout.is_zero() {
            return Err(StreamError::Config(
                "rendezvous timeout must be non-zero".into(),
            ));
        }
        Ok(())
    }

    /// Sleep between consecutive packets.
    pub fn pacing_interval(&self) -> Duration {
        Duration::from_secs_f64(self.frame_duration_ms as f64 / 1000.0 * self.pacing_bias)
    }
}

/// Cloneable handle that asks a running [`Streamer`] to stop.
///
/// The loop finishes the packet it is sending, then returns a summary
/// with [`cancelled`](StreamSummary::cancelled) set.
#[derive(Debug, Clone)]
pub struct StopHandle {
    stopped: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

/// Outcome of a streaming session that did not fail.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamSummary {
    pub packets_sent: u64,
    /// Audio payload bytes sent, excluding RTP headers.
    pub payload_bytes: u64,
    pub elapsed: Duration,
    /// `true` if a [`StopHandle`] ended the stream early.
    pub cancelled: bool,
}

impl StreamSummary {
    /// Payload throughput in KiB/s.
    pub fn data_rate_kib_s(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        self.payload_bytes as f64 / secs / 1024.0
    }
}

/// Paced, single-threaded RTP sender.
///
/// For each frame, in order: build the header from the stream state,
/// serialize header and payload, hand the packet to the sink, advance the
/// state, then sleep for [`StreamerConfig::pacing_interval`]. Nothing is
/// retried; the first send failure ends the session.
pub struct Streamer {
    config: StreamerConfig,
    stopped: Arc<AtomicBool>,
}

impl Streamer {
    pub fn new(config: StreamerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            stopped: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn config(&self) -> &StreamerConfig {
        &self.config
    }

    /// Handle for cancelling this streamer from another thread or a signal
    /// handler.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            stopped: self.stopped.clone(),
        }
    }

    /// Stream `pcm` through `transport`: resolve the peer, then run the
    /// paced loop.
    ///
    /// In rendezvous mode this blocks for up to
    /// [`rendezvous_timeout`](StreamerConfig::rendezvous_timeout); on
    /// timeout no packet is built or sent.
    pub fn stream_pcm(
        &self,
        pcm: &[u8],
        format: PcmFormat,
        transport: &mut UdpTransport,
    ) -> Result<StreamSummary> {
        let packetizer = PcmPacketizer::new(format, self.config.frame_duration_ms)?;

        tracing::info!(
            sample_rate = format.sample_rate,
            channels = format.channels,
            bits = format.sample_width * 8,
            duration_secs = format.duration_of(pcm.len()).as_secs_f64(),
            "audio loaded"
        );

        let peer = transport.resolve_peer(self.config.rendezvous_timeout)?;

        let mut state = match self.config.ssrc {
            Some(ssrc) => StreamState::new(
                ssrc,
                self.config.payload_type,
                packetizer.samples_per_frame(),
            ),
            None => StreamState::with_random_ssrc(
                self.config.payload_type,
                packetizer.samples_per_frame(),
            ),
        };

        tracing::info!(
            %peer,
            packet_bytes = packetizer.frame_size_bytes(),
            frame_ms = self.config.frame_duration_ms,
            timestamp_increment = packetizer.samples_per_frame(),
            "streaming to client"
        );

        self.run(packetizer.frames(pcm), &mut state, transport)
    }

    /// Run the paced send loop over `frames`.
    ///
    /// `state` is advanced once per send attempt, including a failed one.
    /// A failed I/O send is reported as [`StreamError::Transmission`]
    /// carrying the number of packets sent before it.
    pub fn run<I, S>(
        &self,
        frames: I,
        state: &mut StreamState,
        mut sink: S,
    ) -> Result<StreamSummary>
    where
        I: IntoIterator<Item = AudioFrame>,
        S: PacketSink,
    {
        let interval = self.config.pacing_interval();
        let start = Instant::now();
        let mut packets_sent = 0u64;
        let mut payload_bytes = 0u64;
        let mut cancelled = false;

        for frame in frames {
            if self.stopped.load(Ordering::SeqCst) {
                cancelled = true;
                break;
            }

            let packet = state.envelope(&frame).packet(&frame.payload);
            let sent = sink.send_packet(&packet);
            state.advance();

            if let Err(e) = sent {
                tracing::warn!(packets_sent, error = %e, "send failed, stopping stream");
                return Err(match e {
                    StreamError::Io(source) => StreamError::Transmission {
                        sent: packets_sent,
                        source,
                    },
                    other => other,
                });
            }

            packets_sent += 1;
            payload_bytes += frame.payload.len() as u64;

            if self.config.progress_interval > 0
                && packets_sent % self.config.progress_interval == 0
            {
                let audio_secs =
                    packets_sent as f64 * self.config.frame_duration_ms as f64 / 1000.0;
                tracing::info!(
                    packets_sent,
                    audio_secs,
                    elapsed_secs = start.elapsed().as_secs_f64(),
                    "progress"
                );
            }

            if !interval.is_zero() {
                thread::sleep(interval);
            }
        }

        let summary = StreamSummary {
            packets_sent,
            payload_bytes,
            elapsed: start.elapsed(),
            cancelled,
        };

        if cancelled {
            tracing::warn!(packets_sent, "streaming stopped by user");
        }
        tracing::info!(
            packets_sent,
            elapsed_secs = summary.elapsed.as_secs_f64(),
            kib_per_sec = summary.data_rate_kib_s(),
            "streaming complete"
        );

        Ok(summary)
    }
}
