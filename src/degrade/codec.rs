use image::codecs::jpeg::JpegEncoder;
use image::{ColorType, ImageFormat};

use crate::error::{CodecError, Result};
use crate::video::types::Frame;

/// Lossy encode-then-decode of a single frame
///
/// Implementations must return a frame with the same dimensions as the input.
pub trait Compressor: Send + Sync {
    /// Returns the codec name used in logs
    fn name(&self) -> &str;

    /// Encode `frame` at `quality` (0-100) and decode it back to pixels
    fn round_trip(&self, frame: &Frame, quality: u8) -> Result<Frame>;
}

/// Baseline JPEG round trip through the `image` codecs
#[derive(Debug, Default, Clone, Copy)]
pub struct JpegCompressor;

impl JpegCompressor {
    pub fn new() -> Self {
        Self
    }

    /// Encode a frame to JPEG bytes
    pub fn encode(&self, frame: &Frame, quality: u8) -> Result<Vec<u8>> {
        // The encoder's lowest accepted quality is 1.
        let quality = quality.clamp(1, 100);
        let mut buffer = Vec::new();
        JpegEncoder::new_with_quality(&mut buffer, quality)
            .encode(frame.as_rgb_bytes(), frame.width(), frame.height(), ColorType::Rgb8)
            .map_err(|e| CodecError::EncodeFailed {
                reason: e.to_string(),
            })?;

        Ok(buffer)
    }

    pub fn decode(&self, bytes: &[u8]) -> Result<Frame> {
        let image = image::load_from_memory_with_format(bytes, ImageFormat::Jpeg).map_err(|e| {
            CodecError::DecodeFailed {
                reason: e.to_string(),
            }
        })?;
        Ok(Frame::new(image.to_rgb8()))
    }
}

impl Compressor for JpegCompressor {
    fn name(&self) -> &str {
        "jpeg"
    }

    fn round_trip(&self, frame: &Frame, quality: u8) -> Result<Frame> {
        let bytes = self.encode(frame, quality)?;
        self.decode(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32) -> Frame {
        let mut frame = Frame::new_black(width, height);
        for y in 0..height {
            for x in 0..width {
                let v = ((x * 7 + y * 13) % 256) as u8;
                frame.set_pixel(x, y, [v, 255 - v, (x * 3 % 256) as u8]);
            }
        }
        frame
    }

    #[test]
    fn test_round_trip_keeps_dimensions() {
        let codec = JpegCompressor::new();
        let frame = gradient(45, 34);

        let out = codec.round_trip(&frame, 30).unwrap();
        assert_eq!(out.dimensions(), frame.dimensions());
    }

    #[test]
    fn test_round_trip_is_actually_lossy() {
        let codec = JpegCompressor::new();
        let frame = gradient(64, 48);

        let out = codec.round_trip(&frame, 5).unwrap();
        assert!(out.mean_abs_diff(&frame).unwrap() > 0.0);
    }

    #[test]
    fn test_quality_zero_is_accepted() {
        let codec = JpegCompressor::new();
        let frame = gradient(16, 16);

        assert!(codec.round_trip(&frame, 0).is_ok());
    }

    #[test]
    fn test_higher_quality_is_closer_to_source() {
        let codec = JpegCompressor::new();
        let frame = gradient(64, 64);

        let rough = codec.round_trip(&frame, 0).unwrap();
        let fine = codec.round_trip(&frame, 100).unwrap();

        let rough_err = rough.mean_abs_diff(&frame).unwrap();
        let fine_err = fine.mean_abs_diff(&frame).unwrap();
        assert!(fine_err < rough_err, "q100 err {} vs q0 err {}", fine_err, rough_err);
    }

    #[test]
    fn test_higher_quality_encodes_larger() {
        let codec = JpegCompressor::new();
        let frame = gradient(64, 64);

        let small = codec.encode(&frame, 0).unwrap();
        let large = codec.encode(&frame, 100).unwrap();
        assert!(large.len() > small.len());
    }

    #[test]
    fn test_decode_garbage_fails() {
        let codec = JpegCompressor::new();
        assert!(codec.decode(&[0, 1, 2, 3]).is_err());
    }
}
