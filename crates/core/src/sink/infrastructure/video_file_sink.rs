use std::path::{Path, PathBuf};

use crate::error::SinkError;
use crate::shared::frame::Frame;
use crate::shared::source_metadata::SourceMetadata;
use crate::sink::domain::display_sink::DisplaySink;

/// Encodes pushed frames into a video file via ffmpeg-next.
///
/// Uses MPEG4 as a widely compatible encoder. Live sources report no
/// frame rate, so the encoder falls back to 30 fps.
pub struct VideoFileSink {
    path: PathBuf,
    octx: Option<ffmpeg_next::format::context::Output>,
    encoder: Option<ffmpeg_next::codec::encoder::video::Encoder>,
    scaler: Option<ffmpeg_next::software::scaling::Context>,
    width: u32,
    height: u32,
    fps_i: i32,
    frame_count: usize,
}

// Safety: VideoFileSink is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for VideoFileSink {}

impl VideoFileSink {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            octx: None,
            encoder: None,
            scaler: None,
            width: 0,
            height: 0,
            fps_i: 30,
            frame_count: 0,
        }
    }
}

impl DisplaySink for VideoFileSink {
    fn open(&mut self, metadata: &SourceMetadata) -> Result<(), SinkError> {
        ffmpeg_next::init().map_err(|e| SinkError::Open(e.to_string()))?;

        self.width = metadata.width;
        self.height = metadata.height;
        let fps_i = metadata.fps.round() as i32;
        self.fps_i = if fps_i <= 0 { 30 } else { fps_i };

        let mut octx = ffmpeg_next::format::output(&self.path)
            .map_err(|e| SinkError::Open(format!("{}: {e}", self.path.display())))?;

        let global_header = octx
            .format()
            .flags()
            .contains(ffmpeg_next::format::Flags::GLOBAL_HEADER);

        let codec = ffmpeg_next::encoder::find(ffmpeg_next::codec::Id::MPEG4)
            .ok_or_else(|| SinkError::Open("MPEG4 encoder not found".into()))?;

        let mut ost = octx
            .add_stream(Some(codec))
            .map_err(|e| SinkError::Open(e.to_string()))?;

        let mut encoder_ctx = ffmpeg_next::codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()
            .map_err(|e| SinkError::Open(e.to_string()))?;

        encoder_ctx.set_width(metadata.width);
        encoder_ctx.set_height(metadata.height);
        encoder_ctx.set_format(ffmpeg_next::format::Pixel::YUV420P);
        encoder_ctx.set_time_base(ffmpeg_next::Rational(1, self.fps_i));
        encoder_ctx.set_frame_rate(Some(ffmpeg_next::Rational(self.fps_i, 1)));

        if global_header {
            encoder_ctx.set_flags(ffmpeg_next::codec::Flags::GLOBAL_HEADER);
        }

        let encoder = encoder_ctx
            .open_with(ffmpeg_next::Dictionary::new())
            .map_err(|e| SinkError::Open(e.to_string()))?;
        ost.set_parameters(&encoder);

        octx.write_header()
            .map_err(|e| SinkError::Open(e.to_string()))?;

        let scaler = ffmpeg_next::software::scaling::Context::get(
            ffmpeg_next::format::Pixel::RGB24,
            metadata.width,
            metadata.height,
            ffmpeg_next::format::Pixel::YUV420P,
            metadata.width,
            metadata.height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )
        .map_err(|e| SinkError::Open(e.to_string()))?;

        self.octx = Some(octx);
        self.encoder = Some(encoder);
        self.scaler = Some(scaler);
        self.frame_count = 0;

        Ok(())
    }

    fn push(&mut self, frame: &Frame) -> Result<(), SinkError> {
        let encoder = self
            .encoder
            .as_mut()
            .ok_or_else(|| SinkError::Push("sink not opened".into()))?;
        let scaler = self.scaler.as_mut().expect("scaler set alongside encoder");
        let octx = self.octx.as_mut().expect("octx set alongside encoder");

        let mut rgb_frame = ffmpeg_next::util::frame::video::Video::new(
            ffmpeg_next::format::Pixel::RGB24,
            self.width,
            self.height,
        );

        let stride = rgb_frame.stride(0);
        let data = rgb_frame.data_mut(0);
        let src = frame.data();

        // Copy pixel data, respecting stride
        for row in 0..self.height as usize {
            let src_start = row * self.width as usize * 3;
            let dst_start = row * stride;
            data[dst_start..dst_start + self.width as usize * 3]
                .copy_from_slice(&src[src_start..src_start + self.width as usize * 3]);
        }

        let mut yuv_frame = ffmpeg_next::util::frame::video::Video::empty();
        scaler
            .run(&rgb_frame, &mut yuv_frame)
            .map_err(|e| SinkError::Push(e.to_string()))?;
        yuv_frame.set_pts(Some(self.frame_count as i64));

        encoder
            .send_frame(&yuv_frame)
            .map_err(|e| SinkError::Push(e.to_string()))?;

        let ost_time_base = octx
            .stream(0)
            .expect("output stream registered in open")
            .time_base();

        let mut encoded = ffmpeg_next::Packet::empty();
        while encoder.receive_packet(&mut encoded).is_ok() {
            encoded.set_stream(0);
            encoded.rescale_ts(ffmpeg_next::Rational(1, self.fps_i), ost_time_base);
            encoded
                .write_interleaved(octx)
                .map_err(|e| SinkError::Push(e.to_string()))?;
        }

        self.frame_count += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<(), SinkError> {
        if let Some(ref mut encoder) = self.encoder {
            let octx = self.octx.as_mut().expect("octx set alongside encoder");
            let ost_time_base = octx
                .stream(0)
                .expect("output stream registered in open")
                .time_base();

            encoder
                .send_eof()
                .map_err(|e| SinkError::Push(e.to_string()))?;
            let mut encoded = ffmpeg_next::Packet::empty();
            while encoder.receive_packet(&mut encoded).is_ok() {
                encoded.set_stream(0);
                encoded.rescale_ts(ffmpeg_next::Rational(1, self.fps_i), ost_time_base);
                encoded
                    .write_interleaved(octx)
                    .map_err(|e| SinkError::Push(e.to_string()))?;
            }

            octx.write_trailer()
                .map_err(|e| SinkError::Push(e.to_string()))?;
        }

        self.octx = None;
        self.encoder = None;
        self.scaler = None;

        Ok(())
    }
}
