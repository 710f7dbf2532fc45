//! # Video Module
//!
//! Frame representation and the frame sources that feed a session.

pub mod source;
pub mod types;

pub use source::{open_source, FfmpegSource, FrameSource, SourceInfo, StillImageSource};
pub use types::{ChannelOrder, Dimensions, Frame, PixelBuffer};
