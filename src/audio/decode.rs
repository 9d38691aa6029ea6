use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::buffer::AudioBuffer;
use crate::error::AudioError;

/// An encoded audio file held in memory, as read from disk.
///
/// Kept alongside the decoded buffer so a remote classifier can upload
/// the original bytes. Cloning shares the bytes.
#[derive(Clone, Debug)]
pub struct EncodedClip {
    pub file_name: String,
    pub bytes: Arc<[u8]>,
}

impl EncodedClip {
    pub fn read(path: &Path) -> Result<Self, AudioError> {
        let bytes = std::fs::read(path).map_err(|source| AudioError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "clip".to_string());
        Ok(Self {
            file_name,
            bytes: bytes.into(),
        })
    }

    fn extension(&self) -> Option<&str> {
        Path::new(&self.file_name).extension().and_then(|e| e.to_str())
    }
}

/// Decode a clip into a channel-separated [`AudioBuffer`].
///
/// With `max_frames` set, decoding stops once that many frames per channel
/// are available and the buffer is truncated to exactly that length.
pub fn decode_clip(clip: &EncodedClip, max_frames: Option<usize>) -> Result<AudioBuffer, AudioError> {
    let source = Cursor::new(Arc::clone(&clip.bytes));
    let mss = MediaSourceStream::new(Box::new(source), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = clip.extension() {
        hint.with_extension(ext);
    }

    let detected = symphonia::default::get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;

    let mut format = detected.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != symphonia::core::codecs::CODEC_TYPE_NULL)
        .ok_or(AudioError::NoTrack)?;

    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| AudioError::Decode("unknown sample rate".into()))?;

    let mut decoder =
        symphonia::default::get_codecs().make(&track.codec_params, &DecoderOptions::default())?;

    let mut channels: Vec<Vec<f32>> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => return Err(e.into()),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(symphonia::core::errors::Error::DecodeError(err)) => {
                log::debug!("Skipping undecodable packet in {}: {}", clip.file_name, err);
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let spec = *decoded.spec();
        let channel_count = spec.channels.count().max(1);
        if channels.is_empty() {
            channels = vec![Vec::new(); channel_count];
        }

        let mut sample_buf = SampleBuffer::<f32>::new(decoded.frames() as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);

        // Deinterleave
        for frame in sample_buf.samples().chunks(channel_count) {
            for (channel, &sample) in channels.iter_mut().zip(frame) {
                channel.push(sample);
            }
        }

        if let Some(limit) = max_frames {
            if channels[0].len() >= limit {
                for channel in &mut channels {
                    channel.truncate(limit);
                }
                break;
            }
        }
    }

    if channels.is_empty() {
        return Err(AudioError::Empty);
    }

    let buffer = AudioBuffer::new(sample_rate, channels)?;

    log::info!(
        "Decoded {}: {} frames x {} ch, {}Hz, {:.1}s",
        clip.file_name,
        buffer.frames(),
        buffer.channel_count(),
        sample_rate,
        buffer.duration_secs()
    );

    Ok(buffer)
}

/// Read and decode a file in one step.
pub fn decode_file(
    path: &Path,
    max_frames: Option<usize>,
) -> Result<(AudioBuffer, EncodedClip), AudioError> {
    let clip = EncodedClip::read(path)?;
    let buffer = decode_clip(&clip, max_frames)?;
    Ok((buffer, clip))
}

/// Encode interleaved 16-bit PCM as a RIFF/WAVE byte stream.
#[cfg(test)]
pub(crate) fn wav_bytes(sample_rate: u32, channels: &[Vec<f32>]) -> Vec<u8> {
    let channel_count = channels.len() as u16;
    let frames = channels.first().map_or(0, Vec::len);
    let data_len = (frames * channels.len() * 2) as u32;
    let block_align = channel_count * 2;

    let mut out = Vec::with_capacity(44 + data_len as usize);
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&channel_count.to_le_bytes());
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&(sample_rate * block_align as u32).to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&16u16.to_le_bytes());
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());
    for i in 0..frames {
        for channel in channels {
            let value = (channel[i].clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
            out.extend_from_slice(&value.to_le_bytes());
        }
    }
    out
}
