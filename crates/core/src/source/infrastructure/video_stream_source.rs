use std::path::Path;

use crate::error::SourceError;
use crate::shared::frame::Frame;
use crate::shared::source_metadata::SourceMetadata;
use crate::source::domain::frame_source::FrameSource;

/// Socket timeout for network streams, in microseconds. Keeps a stalled
/// RTSP read from blocking the loop indefinitely.
const NETWORK_TIMEOUT_US: &str = "5000000";

/// Decodes frames from local video files and network streams via
/// ffmpeg-next (libavformat + libavcodec).
///
/// Network targets (`rtsp://`, `http://`, ...) are opened with TCP
/// transport and an explicit socket timeout; local files are opened
/// directly. Each decoded frame is converted to RGB24.
pub struct VideoStreamSource {
    input_ctx: Option<ffmpeg_next::format::context::Input>,
    video_stream_index: usize,
    metadata: Option<SourceMetadata>,
}

// Safety: VideoStreamSource is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for VideoStreamSource {}

impl VideoStreamSource {
    pub fn new() -> Self {
        Self {
            input_ctx: None,
            video_stream_index: 0,
            metadata: None,
        }
    }
}

impl Default for VideoStreamSource {
    fn default() -> Self {
        Self::new()
    }
}

fn is_network_target(target: &Path) -> bool {
    let s = target.to_string_lossy();
    ["rtsp://", "rtmp://", "http://", "https://"]
        .iter()
        .any(|scheme| s.starts_with(scheme))
}

fn open_input(
    target: &Path,
) -> Result<ffmpeg_next::format::context::Input, ffmpeg_next::Error> {
    if is_network_target(target) {
        let mut options = ffmpeg_next::Dictionary::new();
        options.set("rtsp_transport", "tcp");
        options.set("stimeout", NETWORK_TIMEOUT_US);
        ffmpeg_next::format::input_with_dictionary(target, options)
    } else {
        ffmpeg_next::format::input(target)
    }
}

impl FrameSource for VideoStreamSource {
    fn open(&mut self, target: &Path) -> Result<SourceMetadata, SourceError> {
        ffmpeg_next::init().map_err(|e| SourceError::Unavailable(e.to_string()))?;

        let ictx = open_input(target).map_err(|e| {
            SourceError::Unavailable(format!("{}: {e}", target.display()))
        })?;

        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or_else(|| {
                SourceError::Unavailable(format!("{}: no video stream", target.display()))
            })?;

        let video_stream_index = stream.index();
        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())
            .map_err(|e| SourceError::Unavailable(e.to_string()))?;
        let decoder = codec_ctx
            .decoder()
            .video()
            .map_err(|e| SourceError::Unavailable(e.to_string()))?;

        let rate = stream.rate();
        let fps = if rate.denominator() != 0 {
            rate.numerator() as f64 / rate.denominator() as f64
        } else {
            0.0
        };

        // ffmpeg reports 0 frames for live streams and some containers;
        // treat anything non-positive as unbounded.
        let total_frames = match stream.frames() {
            n if n > 0 => Some(n as usize),
            _ => None,
        };

        let metadata = SourceMetadata {
            width: decoder.width(),
            height: decoder.height(),
            fps,
            total_frames,
            codec: decoder
                .codec()
                .map(|c| c.name().to_string())
                .unwrap_or_default(),
            origin: Some(target.to_string_lossy().into_owned()),
        };

        log::debug!(
            "opened {} ({}x{} @ {:.1} fps, {:?} frames)",
            target.display(),
            metadata.width,
            metadata.height,
            metadata.fps,
            metadata.total_frames
        );

        self.video_stream_index = video_stream_index;
        self.metadata = Some(metadata.clone());
        self.input_ctx = Some(ictx);

        Ok(metadata)
    }

    fn frames(&mut self) -> Box<dyn Iterator<Item = Result<Frame, SourceError>> + '_> {
        let Some(ictx) = self.input_ctx.as_mut() else {
            return Box::new(std::iter::once(Err(SourceError::NotOpened)));
        };

        let decoder = (|| {
            let stream = ictx
                .streams()
                .best(ffmpeg_next::media::Type::Video)
                .ok_or_else(|| ffmpeg_next::Error::StreamNotFound)?;
            ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?
                .decoder()
                .video()
        })();
        let decoder = match decoder {
            Ok(d) => d,
            Err(e) => {
                return Box::new(std::iter::once(Err(SourceError::Decode {
                    index: 0,
                    reason: e.to_string(),
                })))
            }
        };

        let width = decoder.width();
        let height = decoder.height();

        let scaler = ffmpeg_next::software::scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        );
        let scaler = match scaler {
            Ok(s) => s,
            Err(e) => {
                return Box::new(std::iter::once(Err(SourceError::Decode {
                    index: 0,
                    reason: e.to_string(),
                })))
            }
        };

        Box::new(DecodedFrameIter {
            ictx,
            decoder,
            scaler,
            width,
            height,
            video_stream_index: self.video_stream_index,
            frame_index: 0,
            flushing: false,
            done: false,
        })
    }

    fn close(&mut self) {
        self.input_ctx = None;
        self.metadata = None;
    }
}

/// Lazy iterator that decodes one frame per `next()` call, so unbounded
/// sources never require buffering the stream in memory.
struct DecodedFrameIter<'a> {
    ictx: &'a mut ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: ffmpeg_next::software::scaling::Context,
    width: u32,
    height: u32,
    video_stream_index: usize,
    frame_index: usize,
    flushing: bool,
    done: bool,
}

impl DecodedFrameIter<'_> {
    fn try_receive(&mut self) -> Option<Result<Frame, SourceError>> {
        let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
        if self.decoder.receive_frame(&mut decoded).is_ok() {
            let mut rgb_frame = ffmpeg_next::util::frame::video::Video::empty();
            if let Err(e) = self.scaler.run(&decoded, &mut rgb_frame) {
                return Some(Err(SourceError::Decode {
                    index: self.frame_index,
                    reason: e.to_string(),
                }));
            }

            let pixels = extract_rgb_pixels(&rgb_frame, self.width, self.height);
            let frame = Frame::new(pixels, self.width, self.height, 3, self.frame_index);
            self.frame_index += 1;
            Some(Ok(frame))
        } else {
            None
        }
    }
}

impl Iterator for DecodedFrameIter<'_> {
    type Item = Result<Frame, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        if let Some(result) = self.try_receive() {
            return Some(result);
        }

        if self.flushing {
            self.done = true;
            return None;
        }

        loop {
            let Some((stream, packet)) = self.ictx.packets().next() else {
                let _ = self.decoder.send_eof();
                self.flushing = true;
                if let Some(result) = self.try_receive() {
                    return Some(result);
                }
                self.done = true;
                return None;
            };

            if stream.index() != self.video_stream_index {
                continue;
            }

            if self.decoder.send_packet(&packet).is_err() {
                continue;
            }

            if let Some(result) = self.try_receive() {
                return Some(result);
            }
        }
    }
}

/// Copies pixel data from an ffmpeg frame into a contiguous RGB buffer,
/// stripping any per-row stride padding.
fn extract_rgb_pixels(
    rgb_frame: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let w = width as usize;
    let h = height as usize;

    let mut pixels = Vec::with_capacity(w * h * 3);
    for row in 0..h {
        let row_start = row * stride;
        pixels.extend_from_slice(&data[row_start..row_start + w * 3]);
    }
    pixels
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn create_test_video(path: &Path, num_frames: usize, width: u32, height: u32, fps: f64) {
        ffmpeg_next::init().unwrap();

        let mut octx = ffmpeg_next::format::output(path).unwrap();

        let global_header = octx
            .format()
            .flags()
            .contains(ffmpeg_next::format::Flags::GLOBAL_HEADER);

        let codec = ffmpeg_next::encoder::find(ffmpeg_next::codec::Id::MPEG4).unwrap();
        let mut ost = octx.add_stream(Some(codec)).unwrap();

        let mut encoder_ctx = ffmpeg_next::codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()
            .unwrap();

        encoder_ctx.set_width(width);
        encoder_ctx.set_height(height);
        encoder_ctx.set_format(ffmpeg_next::format::Pixel::YUV420P);
        encoder_ctx.set_time_base(ffmpeg_next::Rational(1, fps as i32));
        encoder_ctx.set_frame_rate(Some(ffmpeg_next::Rational(fps as i32, 1)));

        if global_header {
            encoder_ctx.set_flags(ffmpeg_next::codec::Flags::GLOBAL_HEADER);
        }

        let mut encoder = encoder_ctx
            .open_with(ffmpeg_next::Dictionary::new())
            .unwrap();
        ost.set_parameters(&encoder);

        octx.write_header().unwrap();

        let ost_time_base = octx.stream(0).unwrap().time_base();

        let mut scaler = ffmpeg_next::software::scaling::Context::get(
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            ffmpeg_next::format::Pixel::YUV420P,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )
        .unwrap();

        for i in 0..num_frames {
            let mut rgb_frame = ffmpeg_next::util::frame::video::Video::new(
                ffmpeg_next::format::Pixel::RGB24,
                width,
                height,
            );
            let stride = rgb_frame.stride(0);
            let data = rgb_frame.data_mut(0);
            let value = ((i * 40) % 256) as u8;
            for row in 0..height as usize {
                for col in 0..width as usize {
                    let offset = row * stride + col * 3;
                    data[offset] = value;
                    data[offset + 1] = value;
                    data[offset + 2] = value;
                }
            }

            let mut yuv_frame = ffmpeg_next::util::frame::video::Video::empty();
            scaler.run(&rgb_frame, &mut yuv_frame).unwrap();
            yuv_frame.set_pts(Some(i as i64));

            encoder.send_frame(&yuv_frame).unwrap();

            let mut encoded = ffmpeg_next::Packet::empty();
            while encoder.receive_packet(&mut encoded).is_ok() {
                encoded.set_stream(0);
                encoded.rescale_ts(ffmpeg_next::Rational(1, fps as i32), ost_time_base);
                encoded.write_interleaved(&mut octx).unwrap();
            }
        }

        encoder.send_eof().unwrap();
        let mut encoded = ffmpeg_next::Packet::empty();
        while encoder.receive_packet(&mut encoded).is_ok() {
            encoded.set_stream(0);
            encoded.rescale_ts(ffmpeg_next::Rational(1, fps as i32), ost_time_base);
            encoded.write_interleaved(&mut octx).unwrap();
        }

        octx.write_trailer().unwrap();
    }

    fn test_video_path(dir: &Path) -> PathBuf {
        dir.join("test.mp4")
    }

    #[test]
    fn test_open_returns_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = test_video_path(dir.path());
        create_test_video(&path, 5, 160, 120, 30.0);

        let mut source = VideoStreamSource::new();
        let meta = source.open(&path).unwrap();
        assert_eq!(meta.width, 160);
        assert_eq!(meta.height, 120);
        assert!(meta.fps > 0.0);
        assert!(!meta.is_live());
        assert_eq!(meta.origin, Some(path.to_string_lossy().into_owned()));
    }

    #[test]
    fn test_open_nonexistent_is_unavailable() {
        let mut source = VideoStreamSource::new();
        let err = source.open(Path::new("/nonexistent/test.mp4")).unwrap_err();
        assert!(matches!(err, SourceError::Unavailable(_)));
    }

    #[test]
    fn test_frames_yields_correct_count() {
        let dir = tempfile::tempdir().unwrap();
        let path = test_video_path(dir.path());
        create_test_video(&path, 5, 160, 120, 30.0);

        let mut source = VideoStreamSource::new();
        source.open(&path).unwrap();

        let frames: Vec<_> = source.frames().collect();
        assert_eq!(frames.len(), 5);
        for f in &frames {
            assert!(f.is_ok());
        }
    }

    #[test]
    fn test_frames_have_sequential_indices() {
        let dir = tempfile::tempdir().unwrap();
        let path = test_video_path(dir.path());
        create_test_video(&path, 5, 160, 120, 30.0);

        let mut source = VideoStreamSource::new();
        source.open(&path).unwrap();

        let frames: Vec<_> = source.frames().map(|f| f.unwrap()).collect();
        for (i, frame) in frames.iter().enumerate() {
            assert_eq!(frame.index(), i);
        }
    }

    #[test]
    fn test_frames_are_rgb24() {
        let dir = tempfile::tempdir().unwrap();
        let path = test_video_path(dir.path());
        create_test_video(&path, 2, 160, 120, 30.0);

        let mut source = VideoStreamSource::new();
        source.open(&path).unwrap();

        let frame = source.frames().next().unwrap().unwrap();
        assert_eq!(frame.channels(), 3);
        assert_eq!(frame.data().len(), 160 * 120 * 3);
    }

    #[test]
    fn test_frames_without_open_returns_not_opened() {
        let mut source = VideoStreamSource::new();
        let result = source.frames().next().unwrap();
        assert!(matches!(result, Err(SourceError::NotOpened)));
    }

    #[test]
    fn test_close_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = test_video_path(dir.path());
        create_test_video(&path, 1, 160, 120, 30.0);

        let mut source = VideoStreamSource::new();
        source.open(&path).unwrap();
        source.close();
        source.close();
    }

    #[test]
    fn test_close_without_open_is_safe() {
        let mut source = VideoStreamSource::new();
        source.close();
    }

    #[test]
    fn test_network_target_detection() {
        assert!(is_network_target(Path::new("rtsp://camera.local/stream")));
        assert!(is_network_target(Path::new("https://cdn.example.com/v.mp4")));
        assert!(!is_network_target(Path::new("/home/user/video.mp4")));
        assert!(!is_network_target(Path::new("video.mp4")));
    }

    #[test]
    fn test_reopen_after_close_restarts_stream() {
        let dir = tempfile::tempdir().unwrap();
        let path = test_video_path(dir.path());
        create_test_video(&path, 3, 160, 120, 30.0);

        let mut source = VideoStreamSource::new();
        source.open(&path).unwrap();
        let first: Vec<_> = source.frames().collect();
        source.close();

        source.open(&path).unwrap();
        let second: Vec<_> = source.frames().collect();
        assert_eq!(first.len(), second.len());
    }
}
