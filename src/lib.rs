//! # lofi-cam
//!
//! Make a good video feed look like a bad webcam on a bad network.
//!
//! This library reads a video, degrades every frame in a controlled,
//! parameterized way (low resolution, noise, compression artifacts) and
//! republishes it to a virtual camera while simulating network stutter with
//! dropped frames and jittered delay. Point a video-call client or an ML
//! pipeline at the virtual camera to see how it copes.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lofi_cam::{
//!     config::Config,
//!     sink::{HeadlessPreview, Preview, V4l2Camera, VirtualCamera},
//!     stream::{StreamScheduler, StreamSession},
//!     video::open_source,
//! };
//!
//! # fn main() -> lofi_cam::Result<()> {
//! let config = Config::default();
//! let source = open_source("input.mp4")?;
//!
//! let session = StreamSession::start(
//!     source,
//!     |info| {
//!         let camera = V4l2Camera::open(&config.camera.device, info.dimensions, info.fps, config.camera.channel_order)?;
//!         Ok(Box::new(camera) as Box<dyn VirtualCamera>)
//!     },
//!     |_| Ok(Box::new(HeadlessPreview::new()) as Box<dyn Preview>),
//! )?;
//!
//! let mut scheduler = StreamScheduler::with_params(config.degradation, config.session.seed);
//! let report = scheduler.run(session)?;
//! println!("stopped: {}", report.reason);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`degrade`] - The four-stage frame degradation pipeline
//! - [`stream`] - Session lifecycle and the drop/jitter scheduler
//! - [`video`] - Frames and frame sources
//! - [`sink`] - Virtual camera and preview window
//! - [`config`] - Configuration management

pub mod config;
pub mod degrade;
pub mod error;
pub mod sink;
pub mod stream;
pub mod video;

// Re-export commonly used types for convenience
pub use crate::{
    config::Config,
    degrade::{DegradationParams, DegradationPipeline},
    error::{LofiCamError, Result},
    stream::{StreamScheduler, StreamSession},
};
