use ffmpeg_next as ffmpeg;
use std::path::Path;

/// Video properties of a clip, read from its container.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipInfo {
    pub width: u32,
    pub height: u32,
    pub duration_seconds: f64,
    pub frame_rate: Option<f64>,
}

impl ClipInfo {
    /// Blocking; call from `spawn_blocking` or an already blocking context.
    pub fn probe(path: &Path) -> Result<ClipInfo, ffmpeg::Error> {
        ffmpeg::init()?;
        let context = ffmpeg::format::input(&path)?;

        let stream = context
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or(ffmpeg::Error::StreamNotFound)?;
        let parameters = stream.parameters();
        let decoder = ffmpeg::codec::context::Context::from_parameters(parameters)?
            .decoder()
            .video()?;

        let frame_rate = {
            let rate = stream.avg_frame_rate();
            (rate.numerator() > 0 && rate.denominator() > 0).then(|| f64::from(rate))
        };

        Ok(ClipInfo {
            width: decoder.width(),
            height: decoder.height(),
            duration_seconds: declared_duration(&context, &stream).unwrap_or(0.0),
            frame_rate,
        })
    }

    pub async fn from_path(path: &Path) -> Result<ClipInfo, ffmpeg::Error> {
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || ClipInfo::probe(&path))
            .await
            .map_err(|_| ffmpeg::Error::Exit)?
    }
}

/// Stream duration if the container records one, else the format duration.
pub(crate) fn declared_duration(
    context: &ffmpeg::format::context::Input,
    stream: &ffmpeg::format::stream::Stream,
) -> Option<f64> {
    let time_base = stream.time_base();
    if stream.duration() > 0 && time_base.denominator() > 0 {
        return Some(stream.duration() as f64 * f64::from(time_base));
    }
    if context.duration() > 0 {
        return Some(context.duration() as f64 / f64::from(ffmpeg::ffi::AV_TIME_BASE));
    }
    None
}
