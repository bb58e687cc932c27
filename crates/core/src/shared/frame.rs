use ndarray::{ArrayView3, ArrayViewMut3};

/// A single raw frame: contiguous RGB bytes in row-major order.
///
/// Frames are ephemeral; each one lives for a single loop iteration.
/// Format conversion happens at I/O boundaries only; everything between
/// the source and the sink treats pixel data as opaque RGB8.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    index: usize,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
            index,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    /// Position of this frame within its run, starting at 0.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Writes one RGB pixel. Out-of-bounds coordinates are ignored, so
    /// annotation code can draw shapes that overlap the frame edge.
    pub fn set_pixel(&mut self, x: i64, y: i64, rgb: [u8; 3]) {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return;
        }
        let offset = (y as usize * self.width as usize + x as usize) * self.channels as usize;
        self.data[offset..offset + 3].copy_from_slice(&rgb);
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    pub fn as_ndarray_mut(&mut self) -> ArrayViewMut3<'_, u8> {
        ArrayViewMut3::from_shape(self.shape(), &mut self.data)
            .expect("Frame data length must match dimensions")
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank(width: u32, height: u32) -> Frame {
        Frame::new(
            vec![0u8; (width * height * 3) as usize],
            width,
            height,
            3,
            0,
        )
    }

    #[test]
    fn test_construction_and_accessors() {
        let data = vec![7u8; 12]; // 2x2x3
        let frame = Frame::new(data.clone(), 2, 2, 3, 4);
        assert_eq!(frame.width(), 2);
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.channels(), 3);
        assert_eq!(frame.index(), 4);
        assert_eq!(frame.data(), &data[..]);
    }

    #[test]
    #[should_panic(expected = "data length must equal width * height * channels")]
    fn test_mismatched_data_length_panics_in_debug() {
        Frame::new(vec![0u8; 10], 2, 2, 3, 0);
    }

    #[test]
    fn test_set_pixel_in_bounds() {
        let mut frame = blank(4, 4);
        frame.set_pixel(1, 2, [10, 20, 30]);
        let offset = (2 * 4 + 1) * 3;
        assert_eq!(&frame.data()[offset..offset + 3], &[10, 20, 30]);
    }

    #[test]
    fn test_set_pixel_out_of_bounds_is_ignored() {
        let mut frame = blank(4, 4);
        let before = frame.clone();
        frame.set_pixel(-1, 0, [255, 255, 255]);
        frame.set_pixel(0, -3, [255, 255, 255]);
        frame.set_pixel(4, 0, [255, 255, 255]);
        frame.set_pixel(0, 4, [255, 255, 255]);
        assert_eq!(frame, before);
    }

    #[test]
    fn test_clone_is_independent() {
        let frame = blank(2, 2);
        let mut cloned = frame.clone();
        cloned.data_mut()[0] = 99;
        assert_eq!(frame.data()[0], 0);
        assert_eq!(cloned.data()[0], 99);
    }

    #[test]
    fn test_as_ndarray_shape_is_hwc() {
        let frame = blank(4, 2);
        assert_eq!(frame.as_ndarray().shape(), &[2, 4, 3]);
    }

    #[test]
    fn test_as_ndarray_mut_modification() {
        let mut frame = blank(2, 2);
        {
            let mut arr = frame.as_ndarray_mut();
            arr[[0, 1, 2]] = 128;
        }
        assert_eq!(frame.as_ndarray()[[0, 1, 2]], 128);
    }
}
