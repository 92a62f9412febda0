use ffmpeg_next as ffmpeg;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use ffmpeg::codec::Id;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Mp4,
    Webm,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Mp4 => "mp4",
            OutputFormat::Webm => "webm",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            OutputFormat::Mp4 => "video/mp4",
            OutputFormat::Webm => "video/webm",
        }
    }

    /// Newest compression first, the container's baseline codec last.
    pub fn codec_preferences(self) -> &'static [Id] {
        match self {
            OutputFormat::Mp4 => &[Id::HEVC, Id::H264, Id::MPEG4],
            OutputFormat::Webm => &[Id::AV1, Id::VP9, Id::VP8],
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mp4" | "video/mp4" => Ok(OutputFormat::Mp4),
            "webm" | "video/webm" => Ok(OutputFormat::Webm),
            other => Err(format!("unsupported output format: {}", other)),
        }
    }
}

/// First codec in the preference list the `is_supported` probe accepts.
pub fn first_supported(format: OutputFormat, is_supported: impl Fn(Id) -> bool) -> Option<Id> {
    format
        .codec_preferences()
        .iter()
        .copied()
        .find(|&id| is_supported(id))
}

/// Encoder lookup against the linked FFmpeg build.
pub fn select_encoder(format: OutputFormat) -> Option<ffmpeg::Codec> {
    let id = first_supported(format, |id| ffmpeg::encoder::find(id).is_some())?;
    ffmpeg::encoder::find(id)
}

/// Target bitrate in bits per second for a quality in `[0, 1]`.
///
/// Scales linearly from 0.04 to 0.24 bits per pixel per frame.
pub fn target_bitrate(width: u32, height: u32, frame_rate: u32, quality: f64) -> usize {
    let quality = quality.clamp(0.0, 1.0);
    let bits_per_pixel = 0.04 + 0.20 * quality;
    let pixels_per_second = width as f64 * height as f64 * frame_rate as f64;
    (pixels_per_second * bits_per_pixel).round().max(100_000.0) as usize
}
