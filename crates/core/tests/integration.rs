//! Integration test: stream PCM over real loopback sockets in both peer
//! modes and check what arrives on the wire.
//!
//! The rendezvous test binds a fixed port, sends a hello from a client
//! socket, and verifies every received packet.

use std::net::UdpSocket;
use std::thread;
use std::time::Duration;

use rtp_audio::media::rtp::parse_packet;
use rtp_audio::{PcmFormat, PeerMode, StreamError, Streamer, StreamerConfig, UdpTransport};

/// Fixed port for the rendezvous test. The device must know it in advance.
const TEST_RENDEZVOUS_PORT: u16 = 15004;

fn fast_config() -> StreamerConfig {
    StreamerConfig {
        pacing_bias: 0.0,
        ssrc: Some(0x12345678),
        rendezvous_timeout: Duration::from_secs(2),
        ..Default::default()
    }
}

fn receive(socket: &UdpSocket, count: usize) -> Vec<Vec<u8>> {
    let mut packets = Vec::new();
    let mut buf = [0u8; 4096];
    while packets.len() < count {
        match socket.recv_from(&mut buf) {
            Ok((len, _)) => packets.push(buf[..len].to_vec()),
            Err(_) => break,
        }
    }
    packets
}

#[test]
fn rendezvous_streams_to_hello_sender() {
    let mut transport =
        UdpTransport::open(&PeerMode::Rendezvous { port: TEST_RENDEZVOUS_PORT }).expect("bind");
    let streamer = Streamer::new(fast_config()).unwrap();

    // 2.5 frames of audio at 48 kHz / 20 ms.
    let pcm: Vec<u8> = (0..4800u32).map(|i| (i % 200) as u8 + 1).collect();

    let client = thread::spawn(|| {
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        socket
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        thread::sleep(Duration::from_millis(50));
        socket
            .send_to(b"start", ("127.0.0.1", TEST_RENDEZVOUS_PORT))
            .unwrap();
        receive(&socket, 3)
    });

    let summary = streamer
        .stream_pcm(&pcm, PcmFormat::l16_mono(48_000), &mut transport)
        .expect("stream");
    assert_eq!(summary.packets_sent, 3);
    assert!(!summary.cancelled);

    let packets = client.join().unwrap();
    assert_eq!(packets.len(), 3, "client should receive every packet");

    let mut joined = Vec::new();
    for (i, packet) in packets.iter().enumerate() {
        assert_eq!(packet.len(), 12 + 1920);
        assert_eq!(packet[0], 0x80);
        let (header, payload) = parse_packet(packet).unwrap();
        assert_eq!(header.marker, i == 0, "marker only on first packet");
        assert_eq!(header.payload_type, 11);
        assert_eq!(header.sequence, i as u16);
        assert_eq!(header.timestamp, 960 * i as u32);
        assert_eq!(header.ssrc, 0x12345678);
        joined.extend_from_slice(payload);
    }

    assert_eq!(&joined[..pcm.len()], &pcm[..]);
    assert!(joined[pcm.len()..].iter().all(|&b| b == 0));
}

#[test]
fn direct_mode_needs_no_handshake() {
    let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
    receiver
        .set_read_timeout(Some(Duration::from_secs(2)))
        .unwrap();

    let mut transport =
        UdpTransport::open(&PeerMode::Direct(receiver.local_addr().unwrap())).unwrap();
    let streamer = Streamer::new(fast_config()).unwrap();

    let summary = streamer
        .stream_pcm(&[0x42; 1920], PcmFormat::l16_mono(48_000), &mut transport)
        .unwrap();
    assert_eq!(summary.packets_sent, 1);

    let packets = receive(&receiver, 1);
    assert_eq!(packets.len(), 1);
    let (header, payload) = parse_packet(&packets[0]).unwrap();
    assert!(header.marker);
    assert_eq!(payload, &[0x42; 1920][..]);
}

#[test]
fn rendezvous_timeout_sends_nothing() {
    let mut transport = UdpTransport::rendezvous(0).unwrap();
    let streamer = Streamer::new(StreamerConfig {
        rendezvous_timeout: Duration::from_millis(200),
        ..fast_config()
    })
    .unwrap();

    let err = streamer
        .stream_pcm(&[1; 9600], PcmFormat::l16_mono(48_000), &mut transport)
        .unwrap_err();
    assert!(matches!(err, StreamError::RendezvousTimeout { .. }));
    assert!(transport.peer().is_none());
}

#[test]
fn empty_clip_completes_without_packets() {
    let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
    receiver
        .set_read_timeout(Some(Duration::from_millis(200)))
        .unwrap();

    let mut transport = UdpTransport::direct(receiver.local_addr().unwrap()).unwrap();
    let streamer = Streamer::new(fast_config()).unwrap();

    let summary = streamer
        .stream_pcm(&[], PcmFormat::l16_mono(48_000), &mut transport)
        .unwrap();
    assert_eq!(summary.packets_sent, 0);
    assert!(receive(&receiver, 1).is_empty());
}
