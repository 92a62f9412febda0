//! Sequential merge engine: decode each clip in order, composite its frames
//! onto a letterboxed canvas and feed one continuous encode.
//!
//! Everything here is blocking FFmpeg work; callers run it on
//! `spawn_blocking`. The output context, encoder and scalers are owned by a
//! single `merge_clips` call and dropped on every exit path.

use super::clock::FrameClock;
use super::codec::{select_encoder, target_bitrate, OutputFormat};
use super::letterbox::{FitRect, Rgb};
use super::probe::{declared_duration, ClipInfo};
use crate::error::{MergeError, ValidationError};
use ffmpeg_next as ffmpeg;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use ffmpeg::codec::Id;
use ffmpeg::format::Pixel;
use ffmpeg::software::scaling::{Context as Scaler, Flags as ScaleFlags};
use ffmpeg::util::error::EAGAIN;
use ffmpeg::util::frame::video::Video as VideoFrame;
use ffmpeg::{codec, Dictionary, Packet, Rational};

const CANVAS_FORMAT: Pixel = Pixel::YUV420P;

/// A clip already fetched to local disk, with the reference it came from.
#[derive(Debug, Clone)]
pub struct ClipInput {
    pub path: PathBuf,
    pub reference: String,
}

#[derive(Debug, Clone)]
pub struct MergeSettings {
    pub format: OutputFormat,
    pub quality: f64,
    pub frame_rate: u32,
    pub background: Rgb,
}

impl Default for MergeSettings {
    fn default() -> Self {
        Self {
            format: OutputFormat::Mp4,
            quality: 0.8,
            frame_rate: 30,
            background: Rgb::BLACK,
        }
    }
}

impl MergeSettings {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(0.0..=1.0).contains(&self.quality) {
            return Err(ValidationError::InvalidQuality(self.quality));
        }
        if self.frame_rate == 0 {
            return Err(ValidationError::InvalidFrameRate);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MergeReport {
    pub duration_seconds: f64,
    pub frame_count: i64,
    pub width: u32,
    pub height: u32,
    pub codec: String,
}

/// Merge `clips` in order into `output`.
///
/// Any clip that cannot be opened or decoded fails the whole merge, including
/// corruption found part way through a clip.
pub fn merge_clips(
    clips: &[ClipInput],
    output: &Path,
    settings: &MergeSettings,
) -> Result<MergeReport, MergeError> {
    let first = clips.first().ok_or(MergeError::NothingToMerge)?;
    settings.validate()?;
    ffmpeg::init().map_err(MergeError::encode)?;

    let info = ClipInfo::probe(&first.path).map_err(|e| MergeError::decode(0, &first.reference, e))?;
    let (width, height) = canvas_size(info.width, info.height);
    debug!(width, height, clips = clips.len(), "Canvas resolved from first clip");

    let mut encoder = CanvasEncoder::open(output, settings, width, height)?;
    let background = settings.background.to_yuv();
    let mut held = blank_canvas(width, height, background);
    let mut offset = 0.0;

    for (index, clip) in clips.iter().enumerate() {
        let duration = composite_clip(index, clip, &mut encoder, &mut held, offset, background)?;
        offset += duration;
        encoder.hold_until(&mut held, offset)?;
        info!(
            clip = index,
            duration_seconds = duration,
            timeline_seconds = offset,
            "Clip composited"
        );
    }

    encoder.finish()
}

/// Canvas follows the first clip, floored to even dimensions for 4:2:0.
fn canvas_size(width: u32, height: u32) -> (u32, u32) {
    ((width & !1).max(2), (height & !1).max(2))
}

fn blank_canvas(width: u32, height: u32, yuv: [u8; 3]) -> VideoFrame {
    let mut frame = VideoFrame::new(CANVAS_FORMAT, width, height);
    for (plane, value) in yuv.iter().enumerate() {
        frame.data_mut(plane).fill(*value);
    }
    frame
}

/// Copy a YUV420P frame of exactly `rect` size into the canvas at `rect`.
fn blit(canvas: &mut VideoFrame, scaled: &VideoFrame, rect: FitRect) {
    for plane in 0..3 {
        let shift = if plane == 0 { 0 } else { 1 };
        let x = (rect.x >> shift) as usize;
        let y = (rect.y >> shift) as usize;
        let width = (rect.width >> shift) as usize;
        let height = (rect.height >> shift) as usize;

        let src_stride = scaled.stride(plane);
        let dst_stride = canvas.stride(plane);
        let src = scaled.data(plane);
        let dst = canvas.data_mut(plane);

        for row in 0..height {
            let from = row * src_stride;
            let to = (y + row) * dst_stride + x;
            dst[to..to + width].copy_from_slice(&src[from..from + width]);
        }
    }
}

/// Decode one clip onto the canvas. Returns its natural duration.
fn composite_clip(
    index: usize,
    clip: &ClipInput,
    encoder: &mut CanvasEncoder,
    held: &mut VideoFrame,
    offset: f64,
    background: [u8; 3],
) -> Result<f64, MergeError> {
    let decode_err = |e: ffmpeg::Error| MergeError::decode(index, &clip.reference, e);

    let mut input = ffmpeg::format::input(&clip.path).map_err(decode_err)?;

    let (stream_index, time_base, start_time, declared, source_rate, decoder) = {
        let stream = input
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or_else(|| MergeError::decode(index, &clip.reference, "no video stream"))?;
        let context = codec::context::Context::from_parameters(stream.parameters()).map_err(decode_err)?;
        let codec = ffmpeg::decoder::find(context.id())
            .ok_or_else(|| MergeError::decode(index, &clip.reference, "no decoder for video stream"))?;
        let mut options = Dictionary::new();
        options.set("err_detect", "explode");
        let decoder = context
            .decoder()
            .open_as_with(codec, options)
            .map_err(decode_err)?
            .video()
            .map_err(decode_err)?;
        let start = stream.start_time();
        let rate = stream.avg_frame_rate();
        let source_rate = if rate.numerator() > 0 && rate.denominator() > 0 {
            f64::from(rate)
        } else {
            f64::from(encoder.frame_rate())
        };
        (
            stream.index(),
            stream.time_base(),
            if start == ffmpeg::ffi::AV_NOPTS_VALUE { 0 } else { start },
            declared_duration(&input, &stream),
            source_rate,
            decoder,
        )
    };

    let mut run = ClipRun {
        index,
        reference: &clip.reference,
        decoder,
        scaler: None,
        time_base,
        start_time,
        source_rate,
        offset,
        background,
        last_ts: None,
        frames: 0,
    };

    loop {
        let mut packet = Packet::empty();
        match packet.read(&mut input) {
            Ok(()) => {}
            Err(ffmpeg::Error::Eof) => break,
            Err(e) => return Err(decode_err(e)),
        }
        if packet.stream() != stream_index {
            continue;
        }
        run.decoder.send_packet(&packet).map_err(decode_err)?;
        run.receive_frames(encoder, held)?;
    }
    run.decoder.send_eof().map_err(decode_err)?;
    run.receive_frames(encoder, held)?;

    if run.frames == 0 {
        return Err(MergeError::decode(index, &clip.reference, "no decodable video frames"));
    }

    let measured = run.last_ts.unwrap_or(0.0) + 1.0 / source_rate;
    let natural = declared.filter(|d| *d > 0.0).unwrap_or(measured);
    debug!(clip = index, frames = run.frames, natural, "Clip decoded");
    Ok(natural)
}

struct ClipRun<'a> {
    index: usize,
    reference: &'a str,
    decoder: ffmpeg::decoder::Video,
    scaler: Option<(Scaler, (Pixel, u32, u32))>,
    time_base: Rational,
    start_time: i64,
    source_rate: f64,
    offset: f64,
    background: [u8; 3],
    last_ts: Option<f64>,
    frames: usize,
}

impl ClipRun<'_> {
    fn receive_frames(
        &mut self,
        encoder: &mut CanvasEncoder,
        held: &mut VideoFrame,
    ) -> Result<(), MergeError> {
        let mut decoded = VideoFrame::empty();
        while has_output(self.decoder.receive_frame(&mut decoded))
            .map_err(|e| MergeError::decode(self.index, self.reference, e))?
        {
            let ts = self.timestamp(&decoded);
            encoder.hold_until(held, self.offset + ts)?;
            *held = self.composite(&decoded, encoder.width, encoder.height)?;
            self.last_ts = Some(self.last_ts.map_or(ts, |last| last.max(ts)));
            self.frames += 1;
        }
        Ok(())
    }

    /// Seconds since the start of this clip.
    fn timestamp(&self, frame: &VideoFrame) -> f64 {
        match frame.timestamp().or(frame.pts()) {
            Some(pts) => ((pts - self.start_time) as f64 * f64::from(self.time_base)).max(0.0),
            None => self.frames as f64 / self.source_rate,
        }
    }

    fn composite(
        &mut self,
        frame: &VideoFrame,
        canvas_width: u32,
        canvas_height: u32,
    ) -> Result<VideoFrame, MergeError> {
        let rect = FitRect::fit(frame.width(), frame.height(), canvas_width, canvas_height).to_even();
        let key = (frame.format(), frame.width(), frame.height());

        let (mut scaler, _) = match self.scaler.take() {
            Some((scaler, cached)) if cached == key => (scaler, cached),
            _ => {
                let scaler = Scaler::get(
                    frame.format(),
                    frame.width(),
                    frame.height(),
                    CANVAS_FORMAT,
                    rect.width,
                    rect.height,
                    ScaleFlags::BILINEAR,
                )
                .map_err(|e| MergeError::decode(self.index, self.reference, e))?;
                (scaler, key)
            }
        };

        let mut scaled = VideoFrame::empty();
        scaler
            .run(frame, &mut scaled)
            .map_err(|e| MergeError::decode(self.index, self.reference, e))?;
        self.scaler = Some((scaler, key));

        let mut canvas = blank_canvas(canvas_width, canvas_height, self.background);
        blit(&mut canvas, &scaled, rect);
        Ok(canvas)
    }
}

/// `Ok(false)` once a codec wants more input or is fully drained.
fn has_output(result: Result<(), ffmpeg::Error>) -> Result<bool, ffmpeg::Error> {
    match result {
        Ok(()) => Ok(true),
        Err(ffmpeg::Error::Eof) => Ok(false),
        Err(ffmpeg::Error::Other { errno }) if errno == EAGAIN => Ok(false),
        Err(e) => Err(e),
    }
}

fn encoder_options(id: Id) -> Dictionary<'static> {
    let mut options = Dictionary::new();
    match id {
        Id::H264 | Id::HEVC => options.set("preset", "medium"),
        Id::VP8 | Id::VP9 => {
            options.set("deadline", "good");
            options.set("cpu-used", "4");
        }
        Id::AV1 => options.set("cpu-used", "6"),
        _ => {}
    }
    options
}

/// Output container plus the one video encoder feeding it.
pub(crate) struct CanvasEncoder {
    output: ffmpeg::format::context::Output,
    encoder: ffmpeg::encoder::video::Encoder,
    stream_index: usize,
    encoder_time_base: Rational,
    stream_time_base: Rational,
    clock: FrameClock,
    width: u32,
    height: u32,
    codec_name: String,
}

impl CanvasEncoder {
    fn open(
        path: &Path,
        settings: &MergeSettings,
        width: u32,
        height: u32,
    ) -> Result<Self, MergeError> {
        let codec = select_encoder(settings.format)
            .ok_or_else(|| MergeError::NoSupportedEncoder(settings.format.to_string()))?;
        Self::open_with_codec(path, codec, settings, width, height)
    }

    pub(crate) fn open_with_codec(
        path: &Path,
        codec: ffmpeg::Codec,
        settings: &MergeSettings,
        width: u32,
        height: u32,
    ) -> Result<Self, MergeError> {
        let mut output =
            ffmpeg::format::output_as(&path, settings.format.extension()).map_err(MergeError::encode)?;
        let global_header = output
            .format()
            .flags()
            .contains(ffmpeg::format::Flags::GLOBAL_HEADER);
        let time_base = Rational::new(1, settings.frame_rate as i32);

        let mut stream = output.add_stream(codec).map_err(MergeError::encode)?;
        let stream_index = stream.index();

        let mut context = codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()
            .map_err(MergeError::encode)?;
        context.set_width(width);
        context.set_height(height);
        context.set_format(CANVAS_FORMAT);
        context.set_time_base(time_base);
        context.set_frame_rate(Some(Rational::new(settings.frame_rate as i32, 1)));
        context.set_bit_rate(target_bitrate(width, height, settings.frame_rate, settings.quality));
        context.set_gop(settings.frame_rate * 2);
        if global_header {
            context.set_flags(codec::Flags::GLOBAL_HEADER);
        }

        let encoder = context
            .open_with(encoder_options(codec.id()))
            .map_err(MergeError::encode)?;
        stream.set_parameters(&encoder);
        stream.set_time_base(time_base);

        output.write_header().map_err(MergeError::encode)?;
        let stream_time_base = output
            .stream(stream_index)
            .map(|s| s.time_base())
            .ok_or_else(|| MergeError::encode("output stream vanished after header"))?;

        info!(codec = codec.name(), width, height, fps = settings.frame_rate, "Encoder opened");

        Ok(Self {
            output,
            encoder,
            stream_index,
            encoder_time_base: time_base,
            stream_time_base,
            clock: FrameClock::new(settings.frame_rate),
            width,
            height,
            codec_name: codec.name().to_string(),
        })
    }

    fn frame_rate(&self) -> i32 {
        self.encoder_time_base.denominator()
    }

    /// Repeat `frame` until the output timeline reaches `seconds`.
    pub(crate) fn hold_until(&mut self, frame: &mut VideoFrame, seconds: f64) -> Result<(), MergeError> {
        for _ in 0..self.clock.frames_until(seconds) {
            frame.set_pts(Some(self.clock.tick()));
            self.encoder.send_frame(frame).map_err(MergeError::encode)?;
            self.drain()?;
        }
        Ok(())
    }

    fn drain(&mut self) -> Result<(), MergeError> {
        let mut packet = Packet::empty();
        while has_output(self.encoder.receive_packet(&mut packet)).map_err(MergeError::encode)? {
            packet.set_stream(self.stream_index);
            packet.rescale_ts(self.encoder_time_base, self.stream_time_base);
            packet
                .write_interleaved(&mut self.output)
                .map_err(MergeError::encode)?;
        }
        Ok(())
    }

    /// Flush every buffered packet, then close the container.
    pub(crate) fn finish(mut self) -> Result<MergeReport, MergeError> {
        self.encoder.send_eof().map_err(MergeError::encode)?;
        self.drain()?;
        self.output.write_trailer().map_err(MergeError::encode)?;

        Ok(MergeReport {
            duration_seconds: self.clock.elapsed_seconds(),
            frame_count: self.clock.emitted(),
            width: self.width,
            height: self.height,
            codec: self.codec_name,
        })
    }
}
