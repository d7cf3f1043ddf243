//! Audio clip asset
//!
//! Stores the encoded audio bytes together with the metadata the sound
//! lifecycle needs, chiefly the clip duration used for completion detection.
//! Decoding for playback happens in the backend.

use crate::assets::{Asset, AssetError};
use std::io::Cursor;
use std::time::Duration;

/// Sample rate used for synthesized clips
const SYNTH_SAMPLE_RATE: u32 = 8_000;

/// Audio clip containing encoded audio data
#[derive(Debug, Clone)]
pub struct AudioClip {
    name: String,
    /// Raw audio file data (encoded format)
    data: Vec<u8>,
    format: AudioFormat,
    duration: Duration,
}

/// Supported audio formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    /// WAV uncompressed
    Wav,
    /// OGG Vorbis compressed
    Ogg,
    /// MP3 compressed
    Mp3,
    /// FLAC lossless
    Flac,
    /// Unknown format
    Unknown,
}

impl AudioClip {
    /// Create a clip from already known parts
    pub fn new(name: impl Into<String>, data: Vec<u8>, format: AudioFormat, duration: Duration) -> Self {
        Self {
            name: name.into(),
            data,
            format,
            duration,
        }
    }

    /// Synthesize a silent mono WAV clip of the given length
    pub fn silent(name: impl Into<String>, duration: Duration) -> Self {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: SYNTH_SAMPLE_RATE,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let frames = (duration.as_secs_f64() * f64::from(SYNTH_SAMPLE_RATE)).round() as u32;

        let mut cursor = Cursor::new(Vec::new());
        let written = hound::WavWriter::new(&mut cursor, spec).and_then(|mut writer| {
            for _ in 0..frames {
                writer.write_sample(0i16)?;
            }
            writer.finalize()
        });
        if let Err(e) = written {
            // Writing into a Vec cannot fail short of allocation failure
            log::error!("Failed to synthesize silent clip: {e}");
        }

        Self::new(name, cursor.into_inner(), AudioFormat::Wav, duration)
    }

    /// Rename the clip (resolvers name clips after the key they came from)
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Clip name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the raw audio data
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Encoded format
    pub fn format(&self) -> AudioFormat {
        self.format
    }

    /// Playback length at pitch 1.0
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Detect audio format from magic bytes
    fn detect_format(bytes: &[u8]) -> AudioFormat {
        if bytes.len() < 4 {
            return AudioFormat::Unknown;
        }

        match &bytes[0..4] {
            b"RIFF" => AudioFormat::Wav,
            b"OggS" => AudioFormat::Ogg,
            b"fLaC" => AudioFormat::Flac,
            // MP3 can start with ID3 tag or frame sync
            [0xFF, 0xFB | 0xFA, _, _] | [b'I', b'D', b'3', _] => AudioFormat::Mp3,
            _ => AudioFormat::Unknown,
        }
    }

    fn wav_duration(bytes: &[u8]) -> Result<Duration, AssetError> {
        let reader = hound::WavReader::new(Cursor::new(bytes))
            .map_err(|e| AssetError::InvalidData(format!("Malformed WAV data: {e}")))?;
        let sample_rate = reader.spec().sample_rate;
        if sample_rate == 0 {
            return Err(AssetError::InvalidData("WAV sample rate is zero".to_string()));
        }
        Ok(Duration::from_secs_f64(f64::from(reader.duration()) / f64::from(sample_rate)))
    }

    #[cfg(feature = "rodio-backend")]
    fn decoded_duration(bytes: &[u8], format: AudioFormat) -> Result<Duration, AssetError> {
        use rodio::Source;

        let decoder = rodio::Decoder::new(Cursor::new(bytes.to_vec()))
            .map_err(|e| AssetError::InvalidData(format!("Failed to decode {format:?} data: {e}")))?;
        decoder
            .total_duration()
            .ok_or_else(|| AssetError::UnsupportedFormat(format!("{format:?} stream without a known length")))
    }

    #[cfg(not(feature = "rodio-backend"))]
    fn decoded_duration(_bytes: &[u8], format: AudioFormat) -> Result<Duration, AssetError> {
        Err(AssetError::UnsupportedFormat(format!(
            "{format:?} clips need the rodio-backend feature"
        )))
    }
}

impl Asset for AudioClip {
    fn from_bytes(bytes: &[u8]) -> Result<Self, AssetError> {
        if bytes.is_empty() {
            return Err(AssetError::InvalidData("Empty audio file".to_string()));
        }

        let format = Self::detect_format(bytes);
        let duration = match format {
            AudioFormat::Unknown => {
                return Err(AssetError::InvalidData("Unknown audio format".to_string()));
            }
            AudioFormat::Wav => Self::wav_duration(bytes)?,
            other => Self::decoded_duration(bytes, other)?,
        };

        Ok(Self::new(String::new(), bytes.to_vec(), format, duration))
    }
}
