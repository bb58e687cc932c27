use std::path::Path;

use v4l::buffer::Type;
use v4l::io::traits::CaptureStream;
use v4l::prelude::MmapStream;
use v4l::video::Capture;

use crate::error::SourceError;
use crate::shared::frame::Frame;
use crate::shared::source_metadata::SourceMetadata;
use crate::source::domain::frame_source::FrameSource;

const BUFFER_COUNT: u32 = 4;

/// Captures frames from a local V4L2 device node such as `/dev/video0`.
///
/// RGB3 capture is requested up front; when the driver refuses, the
/// negotiated format is kept and each buffer is converted to RGB in
/// software (YUYV and MJPG are supported).
pub struct WebcamSource {
    device: Option<v4l::Device>,
    width: u32,
    height: u32,
    fourcc: v4l::FourCC,
}

impl WebcamSource {
    pub fn new() -> Self {
        Self {
            device: None,
            width: 0,
            height: 0,
            fourcc: v4l::FourCC::new(b"RGB3"),
        }
    }
}

impl Default for WebcamSource {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSource for WebcamSource {
    fn open(&mut self, target: &Path) -> Result<SourceMetadata, SourceError> {
        let device = v4l::Device::with_path(target)
            .map_err(|e| SourceError::Unavailable(format!("{}: {e}", target.display())))?;

        let mut format = device
            .format()
            .map_err(|e| SourceError::Unavailable(e.to_string()))?;
        format.fourcc = v4l::FourCC::new(b"RGB3");

        let format = match device.set_format(&format) {
            Ok(format) => format,
            Err(err) => {
                log::warn!("failed to set RGB3 on {}: {err}", target.display());
                device
                    .format()
                    .map_err(|e| SourceError::Unavailable(e.to_string()))?
            }
        };

        let fps = device
            .params()
            .ok()
            .map(|p| {
                if p.interval.numerator != 0 {
                    p.interval.denominator as f64 / p.interval.numerator as f64
                } else {
                    0.0
                }
            })
            .unwrap_or(0.0);

        let metadata = SourceMetadata {
            width: format.width,
            height: format.height,
            fps,
            total_frames: None,
            codec: format.fourcc.to_string(),
            origin: Some(target.to_string_lossy().into_owned()),
        };

        log::debug!(
            "opened {} ({}x{}, {})",
            target.display(),
            format.width,
            format.height,
            format.fourcc
        );

        self.width = format.width;
        self.height = format.height;
        self.fourcc = format.fourcc;
        self.device = Some(device);

        Ok(metadata)
    }

    fn frames(&mut self) -> Box<dyn Iterator<Item = Result<Frame, SourceError>> + '_> {
        let Some(device) = self.device.as_ref() else {
            return Box::new(std::iter::once(Err(SourceError::NotOpened)));
        };

        let stream = match MmapStream::with_buffers(device, Type::VideoCapture, BUFFER_COUNT) {
            Ok(s) => s,
            Err(e) => {
                return Box::new(std::iter::once(Err(SourceError::Decode {
                    index: 0,
                    reason: e.to_string(),
                })))
            }
        };

        Box::new(CaptureIter {
            stream,
            width: self.width,
            height: self.height,
            fourcc: self.fourcc,
            frame_index: 0,
        })
    }

    fn close(&mut self) {
        self.device = None;
    }
}

struct CaptureIter<'a> {
    stream: MmapStream<'a>,
    width: u32,
    height: u32,
    fourcc: v4l::FourCC,
    frame_index: usize,
}

impl Iterator for CaptureIter<'_> {
    type Item = Result<Frame, SourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.frame_index;
        let result = match self.stream.next() {
            Ok((buf, _meta)) => {
                decode_capture_buffer(buf, self.width, self.height, self.fourcc)
                    .map(|pixels| Frame::new(pixels, self.width, self.height, 3, index))
                    .map_err(|reason| SourceError::Decode { index, reason })
            }
            Err(e) => Err(SourceError::Decode {
                index,
                reason: e.to_string(),
            }),
        };
        self.frame_index += 1;
        Some(result)
    }
}

/// Converts one capture buffer to packed RGB8 according to its fourcc.
fn decode_capture_buffer(
    buf: &[u8],
    width: u32,
    height: u32,
    fourcc: v4l::FourCC,
) -> Result<Vec<u8>, String> {
    let expected = (width as usize) * (height as usize) * 3;
    match &fourcc.repr {
        b"RGB3" => {
            if buf.len() < expected {
                return Err(format!(
                    "short RGB3 buffer: {} bytes, expected {expected}",
                    buf.len()
                ));
            }
            Ok(buf[..expected].to_vec())
        }
        b"YUYV" => yuyv_to_rgb(buf, width, height),
        b"MJPG" => {
            let img = image::load_from_memory(buf).map_err(|e| e.to_string())?;
            Ok(img.to_rgb8().into_raw())
        }
        other => Err(format!(
            "unsupported capture format {}",
            String::from_utf8_lossy(other)
        )),
    }
}

/// Converts packed YUYV 4:2:2 to RGB8 using BT.601 coefficients.
fn yuyv_to_rgb(buf: &[u8], width: u32, height: u32) -> Result<Vec<u8>, String> {
    let pixel_count = (width as usize) * (height as usize);
    let expected = pixel_count * 2;
    if buf.len() < expected {
        return Err(format!(
            "short YUYV buffer: {} bytes, expected {expected}",
            buf.len()
        ));
    }

    let mut rgb = Vec::with_capacity(pixel_count * 3);
    for chunk in buf[..expected].chunks_exact(4) {
        let y0 = chunk[0] as f32;
        let u = chunk[1] as f32 - 128.0;
        let y1 = chunk[2] as f32;
        let v = chunk[3] as f32 - 128.0;

        for y in [y0, y1] {
            let r = y + 1.402 * v;
            let g = y - 0.344 * u - 0.714 * v;
            let b = y + 1.772 * u;
            rgb.push(r.clamp(0.0, 255.0) as u8);
            rgb.push(g.clamp(0.0, 255.0) as u8);
            rgb.push(b.clamp(0.0, 255.0) as u8);
        }
    }
    Ok(rgb)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb3_buffer_passthrough() {
        let buf = vec![42u8; 2 * 2 * 3];
        let pixels = decode_capture_buffer(&buf, 2, 2, v4l::FourCC::new(b"RGB3")).unwrap();
        assert_eq!(pixels, buf);
    }

    #[test]
    fn test_rgb3_trailing_padding_is_stripped() {
        let mut buf = vec![7u8; 2 * 2 * 3];
        buf.extend_from_slice(&[0, 0, 0, 0]);
        let pixels = decode_capture_buffer(&buf, 2, 2, v4l::FourCC::new(b"RGB3")).unwrap();
        assert_eq!(pixels.len(), 12);
    }

    #[test]
    fn test_rgb3_short_buffer_is_error() {
        let buf = vec![0u8; 5];
        let result = decode_capture_buffer(&buf, 2, 2, v4l::FourCC::new(b"RGB3"));
        assert!(result.is_err());
    }

    #[test]
    fn test_yuyv_gray_converts_to_gray() {
        // Y=128, U=V=128 is mid gray with no chroma.
        let buf = vec![128u8; 2 * 2 * 2];
        let rgb = yuyv_to_rgb(&buf, 2, 2).unwrap();
        assert_eq!(rgb.len(), 2 * 2 * 3);
        for &value in &rgb {
            assert_eq!(value, 128);
        }
    }

    #[test]
    fn test_yuyv_black_and_white_extremes() {
        // One macropixel: Y0=0 (black), Y1=255 (white), neutral chroma.
        let buf = [0u8, 128, 255, 128];
        let rgb = yuyv_to_rgb(&buf, 2, 1).unwrap();
        assert_eq!(&rgb[..3], &[0, 0, 0]);
        assert_eq!(&rgb[3..], &[255, 255, 255]);
    }

    #[test]
    fn test_yuyv_short_buffer_is_error() {
        let buf = vec![0u8; 3];
        assert!(yuyv_to_rgb(&buf, 2, 1).is_err());
    }

    #[test]
    fn test_unsupported_fourcc_is_error() {
        let buf = vec![0u8; 16];
        let result = decode_capture_buffer(&buf, 2, 2, v4l::FourCC::new(b"H264"));
        assert!(result.is_err());
    }

    #[test]
    fn test_frames_without_open_returns_not_opened() {
        let mut source = WebcamSource::new();
        let result = source.frames().next().unwrap();
        assert!(matches!(result, Err(SourceError::NotOpened)));
    }
}
