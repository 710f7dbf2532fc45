use thiserror::Error;

/// Main error type for the lofi-cam library
#[derive(Error, Debug)]
pub enum LofiCamError {
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while opening or probing a frame source
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Failed to open video source: {path} ({reason})")]
    OpenFailed { path: String, reason: String },
}

/// Errors raised while opening or feeding a sink
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Failed to open virtual camera {device}: {reason}")]
    CameraOpenFailed { device: String, reason: String },

    #[error("Failed to open preview window: {reason}")]
    PreviewOpenFailed { reason: String },

    #[error("Virtual camera rejected frame: {reason}")]
    SubmitFailed { reason: String },

    #[error("Frame is {actual_width}x{actual_height}, sink expects {width}x{height}")]
    DimensionMismatch {
        width: u32,
        height: u32,
        actual_width: u32,
        actual_height: u32,
    },
}

/// Errors raised by the lossy compression round trip
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Encoding failed: {reason}")]
    EncodeFailed { reason: String },

    #[error("Decoding failed: {reason}")]
    DecodeFailed { reason: String },
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration file: {path}")]
    ParseFailed { path: String },

    #[error("Invalid configuration value: {key} = {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },
}

/// Convenience type alias for Results using LofiCamError
pub type Result<T> = std::result::Result<T, LofiCamError>;

impl LofiCamError {
    /// Whether this error stopped the run before any frame was streamed
    pub fn is_startup_failure(&self) -> bool {
        matches!(
            self,
            Self::Source(SourceError::OpenFailed { .. })
                | Self::Sink(SinkError::CameraOpenFailed { .. })
                | Self::Sink(SinkError::PreviewOpenFailed { .. })
                | Self::Config(_)
        )
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Source(SourceError::OpenFailed { path, .. }) => {
                format!("Could not open video '{}'. Please check the file exists and ffmpeg/ffprobe are installed.", path)
            }
            Self::Sink(SinkError::CameraOpenFailed { device, .. }) => {
                format!("Could not open virtual camera '{}'. Is the v4l2loopback module loaded?", device)
            }
            Self::Config(ConfigError::FileNotFound { path }) => {
                format!("Configuration file '{}' not found.", path)
            }
            _ => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_failure_is_startup_failure() {
        let err: LofiCamError = SourceError::OpenFailed {
            path: "missing.mp4".to_string(),
            reason: "no such file".to_string(),
        }
        .into();

        assert!(err.is_startup_failure());
        assert!(err.user_message().contains("missing.mp4"));
    }

    #[test]
    fn test_codec_error_is_not_startup_failure() {
        let err: LofiCamError = CodecError::EncodeFailed {
            reason: "boom".to_string(),
        }
        .into();

        assert!(!err.is_startup_failure());
        assert_eq!(err.user_message(), "Codec error: Encoding failed: boom");
    }
}
