use image::imageops::{self, FilterType};
use rand::{Rng, RngCore};
use tracing::debug;

use crate::degrade::codec::{Compressor, JpegCompressor};
use crate::degrade::params::DegradationParams;
use crate::error::Result;
use crate::video::types::{Dimensions, Frame};

/// Injected noise values are drawn from `0..NOISE_CEILING`
pub const NOISE_CEILING: u8 = 100;

/// Filter used for both resampling stages
const RESAMPLE_FILTER: FilterType = FilterType::Triangle;

/// The four-stage degradation applied to every emitted frame
///
/// Stages run in a fixed order: downscale, noise, lossy round trip, upscale.
/// Later stages amplify the artifacts of earlier ones.
pub struct DegradationPipeline {
    params: DegradationParams,
    compressor: Box<dyn Compressor>,
}

impl DegradationPipeline {
    pub fn new(params: DegradationParams, compressor: Box<dyn Compressor>) -> Self {
        Self { params, compressor }
    }

    /// Pipeline backed by the real JPEG codec
    pub fn with_jpeg(params: DegradationParams) -> Self {
        Self::new(params, Box::new(JpegCompressor::new()))
    }

    pub fn params(&self) -> &DegradationParams {
        &self.params
    }

    /// Degrade `frame` and return it at `output` dimensions
    ///
    /// `rng` only feeds the noise stage; with `noise_level == 0` it is not touched.
    pub fn degrade(&self, frame: &Frame, output: Dimensions, rng: &mut dyn RngCore) -> Result<Frame> {
        let small = downscale(frame, self.params.scale_factor);
        let noisy = inject_noise(small, self.params.noise_level, rng);
        let compressed = self
            .compressor
            .round_trip(&noisy, self.params.compression_quality)?;
        let upscaled = resample(&compressed, output);

        debug!(
            "Degraded {} -> {} -> {} via {} q{}",
            frame.dimensions(),
            noisy.dimensions(),
            upscaled.dimensions(),
            self.compressor.name(),
            self.params.compression_quality
        );

        Ok(upscaled)
    }
}

/// Shrink a frame by `factor`, keeping at least one pixel per side
pub fn downscale(frame: &Frame, factor: f64) -> Frame {
    resample(frame, frame.dimensions().scaled(factor))
}

/// Resample a frame to exactly `target`
pub fn resample(frame: &Frame, target: Dimensions) -> Frame {
    let target = Dimensions::new(target.width.max(1), target.height.max(1));
    if frame.dimensions() == target {
        return frame.clone();
    }
    Frame::new(imageops::resize(
        frame.as_image(),
        target.width,
        target.height,
        RESAMPLE_FILTER,
    ))
}

/// Blend a uniform noise frame into `frame` with weight `level`
///
/// `out = (1 - level) * frame + level * noise`, rounded and saturated.
pub fn inject_noise(mut frame: Frame, level: f64, rng: &mut dyn RngCore) -> Frame {
    if level <= 0.0 {
        return frame;
    }
    let level = level.min(1.0);
    let keep = 1.0 - level;

    for channel in frame.as_image_mut().iter_mut() {
        let noise = rng.gen_range(0..NOISE_CEILING) as f64;
        let blended = keep * *channel as f64 + level * noise;
        *channel = blended.round().clamp(0.0, 255.0) as u8;
    }
    frame
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    struct PassThrough;

    impl Compressor for PassThrough {
        fn name(&self) -> &str {
            "passthrough"
        }

        fn round_trip(&self, frame: &Frame, _quality: u8) -> Result<Frame> {
            Ok(frame.clone())
        }
    }

    fn checkerboard(width: u32, height: u32, cell: u32) -> Frame {
        let mut frame = Frame::new_black(width, height);
        for y in 0..height {
            for x in 0..width {
                if (x / cell + y / cell) % 2 == 0 {
                    frame.set_pixel(x, y, [230, 200, 40]);
                } else {
                    frame.set_pixel(x, y, [20, 60, 180]);
                }
            }
        }
        frame
    }

    fn params(scale_factor: f64, noise_level: f64, compression_quality: u8) -> DegradationParams {
        DegradationParams {
            scale_factor,
            noise_level,
            compression_quality,
            ..DegradationParams::default()
        }
    }

    #[test]
    fn test_output_has_requested_dimensions() {
        let mut rng = StdRng::seed_from_u64(7);
        let frame = checkerboard(640, 480, 16);

        for scale in [0.07, 0.33, 0.5, 1.0] {
            let pipeline = DegradationPipeline::with_jpeg(params(scale, 0.2, 30));
            let out = pipeline
                .degrade(&frame, Dimensions::new(640, 480), &mut rng)
                .unwrap();
            assert_eq!(out.dimensions(), Dimensions::new(640, 480));
        }
    }

    #[test]
    fn test_tiny_scale_clamps_to_one_pixel() {
        let mut rng = StdRng::seed_from_u64(7);
        let frame = checkerboard(10, 10, 2);
        let pipeline = DegradationPipeline::with_jpeg(params(0.01, 0.0, 50));

        assert_eq!(downscale(&frame, 0.01).dimensions(), Dimensions::new(1, 1));
        let out = pipeline.degrade(&frame, Dimensions::new(10, 10), &mut rng).unwrap();
        assert_eq!(out.dimensions(), Dimensions::new(10, 10));
    }

    #[test]
    fn test_zero_noise_is_deterministic() {
        let frame = checkerboard(64, 48, 8);
        let pipeline = DegradationPipeline::with_jpeg(params(0.5, 0.0, 60));

        let a = pipeline
            .degrade(&frame, frame.dimensions(), &mut StdRng::seed_from_u64(1))
            .unwrap();
        let b = pipeline
            .degrade(&frame, frame.dimensions(), &mut StdRng::seed_from_u64(2))
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_zero_noise_equals_resample_compress_resample() {
        let frame = checkerboard(64, 48, 8);
        let codec = JpegCompressor::new();
        let pipeline = DegradationPipeline::with_jpeg(params(0.5, 0.0, 60));

        let expected = resample(
            &codec.round_trip(&downscale(&frame, 0.5), 60).unwrap(),
            frame.dimensions(),
        );
        let out = pipeline
            .degrade(&frame, frame.dimensions(), &mut StdRng::seed_from_u64(3))
            .unwrap();
        assert_eq!(out, expected);
    }

    #[test]
    fn test_zero_noise_is_identity_blend() {
        let frame = checkerboard(8, 8, 2);
        let out = inject_noise(frame.clone(), 0.0, &mut StdRng::seed_from_u64(4));
        assert_eq!(out, frame);
    }

    #[test]
    fn test_full_noise_ignores_input() {
        let bright = Frame::new_filled(32, 32, [255, 255, 255]);
        let dark = Frame::new_filled(32, 32, [0, 0, 0]);

        let a = inject_noise(bright, 1.0, &mut StdRng::seed_from_u64(9));
        let b = inject_noise(dark, 1.0, &mut StdRng::seed_from_u64(9));

        assert_eq!(a, b);
        assert!(a.as_rgb_bytes().iter().all(|&v| v < NOISE_CEILING));
    }

    #[test]
    fn test_partial_noise_stays_in_blend_range() {
        let frame = Frame::new_filled(16, 16, [200, 200, 200]);
        let out = inject_noise(frame, 0.2, &mut StdRng::seed_from_u64(5));

        // 0.8 * 200 + 0.2 * [0, 99] lies in [160, 179.8]
        assert!(out.as_rgb_bytes().iter().all(|&v| (160..=180).contains(&v)));
    }

    #[test]
    fn test_higher_quality_has_fewer_artifacts() {
        let frame = checkerboard(320, 240, 8);
        let mut rng = StdRng::seed_from_u64(11);

        let rough = DegradationPipeline::with_jpeg(params(0.5, 0.0, 0))
            .degrade(&frame, frame.dimensions(), &mut rng)
            .unwrap();
        let fine = DegradationPipeline::with_jpeg(params(0.5, 0.0, 100))
            .degrade(&frame, frame.dimensions(), &mut rng)
            .unwrap();

        let reference = DegradationPipeline::new(params(0.5, 0.0, 100), Box::new(PassThrough))
            .degrade(&frame, frame.dimensions(), &mut rng)
            .unwrap();

        let rough_err = rough.mean_abs_diff(&reference).unwrap();
        let fine_err = fine.mean_abs_diff(&reference).unwrap();
        assert!(fine_err < rough_err, "q100 err {} vs q0 err {}", fine_err, rough_err);
    }

    #[test]
    fn test_scale_one_with_passthrough_is_lossless() {
        let frame = checkerboard(32, 24, 4);
        let pipeline = DegradationPipeline::new(params(1.0, 0.0, 100), Box::new(PassThrough));

        let out = pipeline
            .degrade(&frame, frame.dimensions(), &mut StdRng::seed_from_u64(0))
            .unwrap();
        assert_eq!(out, frame);
    }

    #[test]
    fn test_output_dimensions_can_differ_from_input() {
        let frame = checkerboard(100, 50, 5);
        let pipeline = DegradationPipeline::with_jpeg(params(0.3, 0.5, 40));

        let out = pipeline
            .degrade(&frame, Dimensions::new(64, 64), &mut StdRng::seed_from_u64(0))
            .unwrap();
        assert_eq!(out.dimensions(), Dimensions::new(64, 64));
    }
}
