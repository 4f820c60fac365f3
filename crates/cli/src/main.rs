mod decode;

use std::net::{SocketAddr, ToSocketAddrs};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::Parser;
use rtp_audio::media::pcm::{DEFAULT_FRAME_DURATION_MS, DEFAULT_SAMPLE_RATE};
use rtp_audio::transport::DEFAULT_PORT;
use rtp_audio::transport::udp::primary_local_ip;
use rtp_audio::{
    PcmFormat, PeerMode, Result, StreamError, StreamSummary, Streamer, StreamerConfig,
    UdpTransport,
};
use tracing_subscriber::EnvFilter;

/// Exit status when Ctrl+C arrives before streaming started.
const EXIT_INTERRUPTED: i32 = 130;

#[derive(Parser)]
#[command(
    name = "rtp-audio-stream",
    about = "Stream an audio file to a device as paced RTP (L16 mono)"
)]
struct Args {
    /// Audio file to stream (wav, mp3, flac, aac, ogg)
    file: PathBuf,

    /// Device address. Without it, wait for the device's hello on --port
    #[arg(long, short)]
    target: Option<String>,

    /// UDP port: listen port for rendezvous, destination port with --target
    #[arg(long, short, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Sample rate the audio is resampled to
    #[arg(long, default_value_t = DEFAULT_SAMPLE_RATE)]
    sample_rate: u32,

    /// Audio per packet in milliseconds
    #[arg(long, default_value_t = DEFAULT_FRAME_DURATION_MS)]
    frame_ms: u32,

    /// Fixed SSRC, decimal or 0x-prefixed hex (random when omitted)
    #[arg(long, value_parser = parse_ssrc)]
    ssrc: Option<u32>,

    /// Seconds to wait for the device's hello datagram
    #[arg(long, default_value_t = 60)]
    timeout: u64,
}

fn parse_ssrc(s: &str) -> std::result::Result<u32, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid SSRC {s:?}: {e}"))
}

impl Args {
    fn peer_mode(&self) -> Result<PeerMode> {
        if self.port == 0 {
            return Err(StreamError::Config("port must be in 1-65535".into()));
        }
        let Some(host) = &self.target else {
            return Ok(PeerMode::Rendezvous { port: self.port });
        };
        let addr: SocketAddr = (host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|e| StreamError::Config(format!("cannot resolve {host}: {e}")))?
            .next()
            .ok_or_else(|| StreamError::Config(format!("no address for {host}")))?;
        Ok(PeerMode::Direct(addr))
    }

    fn streamer_config(&self) -> StreamerConfig {
        StreamerConfig {
            frame_duration_ms: self.frame_ms,
            ssrc: self.ssrc,
            rendezvous_timeout: Duration::from_secs(self.timeout),
            ..Default::default()
        }
    }
}

fn run(args: &Args) -> Result<StreamSummary> {
    if !args.file.is_file() {
        return Err(StreamError::Config(format!(
            "audio file not found: {}",
            args.file.display()
        )));
    }
    let mode = args.peer_mode()?;
    let config = args.streamer_config();
    let timeout = config.rendezvous_timeout;
    let streamer = Streamer::new(config)?;

    tracing::info!(file = %args.file.display(), "loading audio file");
    let pcm = decode::decode_file(&args.file, args.sample_rate)?;

    let mut transport = UdpTransport::open(&mode)?;

    let streaming = Arc::new(AtomicBool::new(false));
    let stop = streamer.stop_handle();
    let started = streaming.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        if started.load(Ordering::SeqCst) {
            stop.stop();
        } else {
            std::process::exit(EXIT_INTERRUPTED);
        }
    }) {
        tracing::warn!(error = %e, "could not install Ctrl+C handler");
    }

    if let PeerMode::Rendezvous { port } = mode {
        match primary_local_ip() {
            Some(ip) => tracing::info!("connect the device with: rtp start {ip} {port}"),
            None => tracing::info!("connect the device to this host on port {port}"),
        }
        tracing::info!(timeout_secs = timeout.as_secs(), "waiting for client");
    }
    transport.resolve_peer(timeout)?;

    streaming.store(true, Ordering::SeqCst);
    println!("Streaming... press Ctrl+C to stop");
    streamer.stream_pcm(&pcm, PcmFormat::l16_mono(args.sample_rate), &mut transport)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    match run(&args) {
        Ok(summary) => {
            println!(
                "Sent {} packets in {:.2}s ({:.2} KB/s){}",
                summary.packets_sent,
                summary.elapsed.as_secs_f64(),
                summary.data_rate_kib_s(),
                if summary.cancelled {
                    ", stopped by user"
                } else {
                    ""
                }
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["rtp-audio-stream", "clip.wav"];
        argv.extend_from_slice(extra);
        Args::parse_from(argv)
    }

    #[test]
    fn defaults_to_rendezvous_on_5004() {
        let a = args(&[]);
        assert_eq!(a.peer_mode().unwrap(), PeerMode::Rendezvous { port: 5004 });
        assert_eq!(a.sample_rate, 48_000);
        assert_eq!(a.streamer_config().rendezvous_timeout, Duration::from_secs(60));
    }

    #[test]
    fn target_selects_direct_mode() {
        let a = args(&["--target", "127.0.0.1", "--port", "6000"]);
        assert_eq!(
            a.peer_mode().unwrap(),
            PeerMode::Direct("127.0.0.1:6000".parse().unwrap())
        );
    }

    #[test]
    fn port_zero_is_rejected() {
        let a = args(&["--port", "0"]);
        assert!(matches!(a.peer_mode(), Err(StreamError::Config(_))));
    }

    #[test]
    fn ssrc_accepts_hex_and_decimal() {
        assert_eq!(parse_ssrc("0x12345678").unwrap(), 0x12345678);
        assert_eq!(parse_ssrc("42").unwrap(), 42);
        assert!(parse_ssrc("0xZZ").is_err());
    }

    #[test]
    fn missing_file_is_config_error() {
        let a = args(&["--target", "127.0.0.1"]);
        assert!(matches!(run(&a), Err(StreamError::Config(_))));
    }
}
