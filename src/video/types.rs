use image::{ImageBuffer, Rgb, RgbImage};
use serde::{Deserialize, Serialize};

/// A single video frame
///
/// Frames are always held in RGB order internally; sinks that expect a
/// different layout get their bytes through [`Frame::to_channel_bytes`].
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    buffer: RgbImage,
}

impl Frame {
    /// Create a new frame from an RGB image buffer
    pub fn new(buffer: RgbImage) -> Self {
        Self { buffer }
    }

    /// Create a new frame with the given dimensions filled with black
    pub fn new_black(width: u32, height: u32) -> Self {
        Self {
            buffer: ImageBuffer::new(width, height),
        }
    }

    /// Create a new frame with the given dimensions filled with the specified color
    pub fn new_filled(width: u32, height: u32, color: [u8; 3]) -> Self {
        let buffer = ImageBuffer::from_fn(width, height, |_, _| Rgb(color));
        Self { buffer }
    }

    pub fn width(&self) -> u32 {
        self.buffer.width()
    }

    pub fn height(&self) -> u32 {
        self.buffer.height()
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.width(), self.height())
    }

    /// Get a pixel at the given coordinates (returns RGB array)
    pub fn get_pixel(&self, x: u32, y: u32) -> [u8; 3] {
        self.buffer.get_pixel(x, y).0
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, color: [u8; 3]) {
        self.buffer.put_pixel(x, y, Rgb(color));
    }

    /// Get the underlying image buffer
    pub fn as_image(&self) -> &RgbImage {
        &self.buffer
    }

    pub fn as_image_mut(&mut self) -> &mut RgbImage {
        &mut self.buffer
    }

    /// Raw interleaved bytes in RGB order
    pub fn as_rgb_bytes(&self) -> &[u8] {
        self.buffer.as_raw()
    }

    /// Raw interleaved bytes in the requested channel order
    pub fn to_channel_bytes(&self, order: ChannelOrder) -> Vec<u8> {
        let mut bytes = self.buffer.as_raw().clone();
        if order == ChannelOrder::Bgr {
            for pixel in bytes.chunks_exact_mut(3) {
                pixel.swap(0, 2);
            }
        }
        bytes
    }

    /// Pack the frame for a sink expecting `order`
    pub fn to_pixel_buffer(&self, order: ChannelOrder) -> PixelBuffer {
        PixelBuffer {
            dimensions: self.dimensions(),
            order,
            bytes: self.to_channel_bytes(order),
        }
    }

    /// Create a frame from raw RGB bytes
    ///
    /// Returns `None` when `data` does not hold exactly `width * height` pixels.
    pub fn from_rgb_bytes(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        if data.len() != Dimensions::new(width, height).byte_len() {
            return None;
        }
        ImageBuffer::from_raw(width, height, data).map(|buffer| Self { buffer })
    }

    /// Mean absolute difference per channel against another frame of the same size
    pub fn mean_abs_diff(&self, other: &Frame) -> Option<f64> {
        if self.dimensions() != other.dimensions() {
            return None;
        }
        let a = self.as_rgb_bytes();
        let b = other.as_rgb_bytes();
        if a.is_empty() {
            return Some(0.0);
        }
        let total: u64 = a
            .iter()
            .zip(b)
            .map(|(&x, &y)| (x as i16 - y as i16).unsigned_abs() as u64)
            .sum();
        Some(total as f64 / a.len() as f64)
    }
}

/// Interleaved frame bytes laid out for a specific sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    pub dimensions: Dimensions,
    pub order: ChannelOrder,
    pub bytes: Vec<u8>,
}

/// Width and height of a frame in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Size of one interleaved 3-channel frame in bytes
    pub fn byte_len(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }

    /// Scale both sides by `factor`, rounding, never below one pixel
    pub fn scaled(&self, factor: f64) -> Self {
        let scale = |side: u32| ((side as f64 * factor).round() as u32).max(1);
        Self::new(scale(self.width), scale(self.height))
    }
}

impl std::fmt::Display for Dimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl From<(u32, u32)> for Dimensions {
    fn from((width, height): (u32, u32)) -> Self {
        Self::new(width, height)
    }
}

/// Byte order of the three color channels a consumer expects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelOrder {
    #[default]
    Rgb,
    Bgr,
}

impl ChannelOrder {
    /// Pixel format name understood by ffmpeg
    pub fn ffmpeg_pix_fmt(&self) -> &'static str {
        match self {
            ChannelOrder::Rgb => "rgb24",
            ChannelOrder::Bgr => "bgr24",
        }
    }
}
