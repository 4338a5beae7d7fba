use std::fs::File;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::audio::types::AudioSignal;
use crate::error::{AudioError, Result};

/// Decodes audio files into mono [`AudioSignal`]s for the command-line tool.
///
/// The loop pipeline itself never touches files; this is the collaborator
/// that turns a path into samples before analysis starts.
pub struct AudioLoader;

impl AudioLoader {
    /// Load an audio file and downmix it to mono
    pub fn load<P: AsRef<Path>>(path: P) -> Result<AudioSignal> {
        let path = path.as_ref();
        let extension = Self::detect_format(path).unwrap_or_default();

        if !Self::is_format_supported(&extension) {
            return Err(AudioError::UnsupportedFormat { format: extension }.into());
        }

        match extension.as_str() {
            "wav" => Self::load_wav(path),
            _ => Self::load_with_symphonia(path),
        }
    }

    /// Load WAV files using the hound crate
    fn load_wav(path: &Path) -> Result<AudioSignal> {
        let load_failed = || AudioError::LoadFailed { path: path.display().to_string() };

        let reader = hound::WavReader::open(path).map_err(|_| load_failed())?;
        let spec = reader.spec();

        let interleaved: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .into_samples::<f32>()
                .collect::<std::result::Result<_, _>>()
                .map_err(|_| load_failed())?,
            hound::SampleFormat::Int => reader
                .into_samples::<i32>()
                .map(|sample| sample.map(|s| Self::int_to_float(s, spec.bits_per_sample)))
                .collect::<std::result::Result<_, _>>()
                .map_err(|_| load_failed())?,
        };

        tracing::debug!(
            "Decoded WAV: {} Hz, {} channels, {} bits",
            spec.sample_rate, spec.channels, spec.bits_per_sample
        );
        AudioSignal::from_interleaved(&interleaved, spec.channels, spec.sample_rate)
    }

    /// Load compressed formats using Symphonia
    fn load_with_symphonia(path: &Path) -> Result<AudioSignal> {
        let load_failed = || AudioError::LoadFailed { path: path.display().to_string() };

        let file = File::open(path).map_err(|_| load_failed())?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
            hint.with_extension(extension);
        }

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(|_| load_failed())?;
        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(load_failed)?;
        let track_id = track.id;

        let sample_rate = track.codec_params.sample_rate
            .ok_or_else(|| AudioError::InvalidInput {
                details: "no sample rate in stream".to_string()
            })?;
        let channels = track.codec_params.channels
            .ok_or_else(|| AudioError::InvalidInput {
                details: "no channel layout in stream".to_string()
            })?
            .count() as u16;

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|_| load_failed())?;

        let mut interleaved = Vec::new();
        let mut buffer: Option<SampleBuffer<f32>> = None;

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::ResetRequired) => {
                    decoder.reset();
                    continue;
                }
                // End of stream surfaces as an IO error
                Err(_) => break,
            };

            if packet.track_id() != track_id {
                continue;
            }

            match decoder.decode(&packet) {
                Ok(decoded) => {
                    let buf = buffer.get_or_insert_with(|| {
                        SampleBuffer::new(decoded.capacity() as u64, *decoded.spec())
                    });
                    if buf.capacity() < decoded.capacity() {
                        *buf = SampleBuffer::new(decoded.capacity() as u64, *decoded.spec());
                    }
                    buf.copy_interleaved_ref(decoded);
                    interleaved.extend_from_slice(buf.samples());
                }
                Err(SymphoniaError::DecodeError(reason)) => {
                    tracing::warn!("Skipping undecodable packet: {}", reason);
                }
                Err(_) => break,
            }
        }

        tracing::debug!(
            "Decoded {}: {} Hz, {} channels, {} samples",
            path.display(), sample_rate, channels, interleaved.len()
        );
        AudioSignal::from_interleaved(&interleaved, channels, sample_rate)
    }

    /// Convert integer sample to float (-1.0 to 1.0)
    fn int_to_float(sample: i32, bit_depth: u16) -> f32 {
        match bit_depth {
            8 => sample as f32 / 128.0,
            16 => sample as f32 / 32768.0,
            24 => sample as f32 / 8388608.0,
            32 => sample as f32 / 2147483648.0,
            _ => sample as f32 / 32768.0,
        }
    }

    /// Detect audio format from file extension
    pub fn detect_format<P: AsRef<Path>>(path: P) -> Option<String> {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
    }

    /// Check if a file format is supported
    pub fn is_format_supported(extension: &str) -> bool {
        matches!(
            extension.to_lowercase().as_str(),
            "wav" | "mp3" | "flac" | "ogg" | "m4a" | "aac"
        )
    }
}
