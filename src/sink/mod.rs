//! # Sinks
//!
//! Consumers of degraded frames: the virtual camera other applications read
//! from, and the local preview window.

pub mod camera;
pub mod preview;

pub use camera::{FramePacer, V4l2Camera, VirtualCamera};
pub use preview::{FfplayPreview, HeadlessPreview, Preview, PreviewWindow};
