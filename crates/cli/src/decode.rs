//! Decode an audio file into the raw L16 mono buffer the streamer sends.
//!
//! symphonia does the container/codec work; this module only downmixes,
//! resamples, and converts the decoded samples.

use std::fs::File;
use std::io;
use std::path::Path;

use rtp_audio::{Result, StreamError};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{CODEC_TYPE_NULL, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSourceStream, MediaSourceStreamOptions};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

fn decode_error(e: impl std::fmt::Display) -> StreamError {
    StreamError::Decode(e.to_string())
}

/// Decode `path` to 16-bit little-endian mono PCM at `target_rate`.
pub fn decode_file(path: &Path, target_rate: u32) -> Result<Vec<u8>> {
    let src = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(src), MediaSourceStreamOptions::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(decode_error)?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| decode_error("no supported audio tracks"))?;
    let track_id = track.id;
    let mut source_rate = track.codec_params.sample_rate;
    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(decode_error)?;

    let mut mono = Vec::new();
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(decode_error(e)),
        };
        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                source_rate = Some(spec.rate);
                let mut samples = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                samples.copy_interleaved_ref(decoded);
                downmix_into(samples.samples(), spec.channels.count(), &mut mono);
            }
            Err(SymphoniaError::DecodeError(e)) => {
                tracing::warn!(error = e, "skipping undecodable packet");
            }
            Err(e) => return Err(decode_error(e)),
        }
    }

    let source_rate =
        source_rate.ok_or_else(|| decode_error("stream does not declare a sample rate"))?;
    tracing::debug!(
        source_rate,
        target_rate,
        samples = mono.len(),
        "decoded audio"
    );

    let resampled = resample_linear(&mono, source_rate, target_rate);
    Ok(to_l16_le(&resampled))
}

/// Average interleaved `channels`-wide frames into mono samples.
pub fn downmix_into(interleaved: &[f32], channels: usize, out: &mut Vec<f32>) {
    if channels <= 1 {
        out.extend_from_slice(interleaved);
        return;
    }
    out.extend(
        interleaved
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32),
    );
}

/// Linear-interpolation sample rate conversion for mono audio.
pub fn resample_linear(input: &[f32], from: u32, to: u32) -> Vec<f32> {
    if from == to || input.is_empty() || from == 0 || to == 0 {
        return input.to_vec();
    }

    let out_len = ((input.len() as u64 * to as u64 + from as u64 / 2) / from as u64) as usize;
    let step = from as f64 / to as f64;
    let last = input.len() - 1;

    (0..out_len)
        .map(|i| {
            let pos = i as f64 * step;
            let idx = (pos.floor() as usize).min(last);
            let frac = (pos - idx as f64) as f32;
            let a = input[idx];
            let b = input[(idx + 1).min(last)];
            a + (b - a) * frac
        })
        .collect()
}

/// Clamp to [-1, 1] and write as 16-bit little-endian.
pub fn to_l16_le(samples: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(samples.len() * 2);
    for &s in samples {
        let v = (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        out.extend_from_slice(&v.to_le_bytes());
    }
    out
}
