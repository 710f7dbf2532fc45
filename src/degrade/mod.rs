//! # Degradation Pipeline
//!
//! Turns a clean frame into what a struggling webcam on a lossy link would
//! deliver. Every emitted frame passes through four stages, in this order:
//!
//! 1. **Downscale** by `scale_factor` (bilinear), at least one pixel per side
//! 2. **Noise**: alpha-blend a uniform `0..100` noise frame at `noise_level`
//! 3. **Lossy round trip** through a real codec at `compression_quality`
//! 4. **Upscale** back to the requested output dimensions
//!
//! ## Usage
//!
//! ```rust,no_run
//! use lofi_cam::degrade::{DegradationParams, DegradationPipeline};
//! use lofi_cam::video::Frame;
//! use rand::SeedableRng;
//!
//! let pipeline = DegradationPipeline::with_jpeg(DegradationParams::default());
//! let frame = Frame::new_filled(640, 480, [120, 80, 200]);
//! let mut rng = rand::rngs::SmallRng::seed_from_u64(1);
//!
//! let degraded = pipeline.degrade(&frame, frame.dimensions(), &mut rng).unwrap();
//! assert_eq!(degraded.dimensions(), frame.dimensions());
//! ```

pub mod codec;
pub mod params;
pub mod pipeline;

pub use codec::{Compressor, JpegCompressor};
pub use params::DegradationParams;
pub use pipeline::{downscale, inject_noise, resample, DegradationPipeline, NOISE_CEILING};
