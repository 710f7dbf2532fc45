use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::{Result, SourceError};
use crate::video::types::{Dimensions, Frame};

/// Frame rate assumed when the container does not report a usable one
const FALLBACK_FPS: u32 = 30;

/// Native properties of a source, fixed for the lifetime of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceInfo {
    pub dimensions: Dimensions,
    pub fps: u32,
}

/// Sequential supplier of frames
///
/// `read_frame` returns `None` once the source is exhausted or a read fails;
/// both end the stream. `release` must be safe to call more than once.
pub trait FrameSource {
    fn info(&self) -> SourceInfo;

    fn read_frame(&mut self) -> Option<Frame>;

    fn release(&mut self);
}

/// Open the right kind of source for `path`
pub fn open_source<P: AsRef<Path>>(path: P) -> Result<Box<dyn FrameSource>> {
    let path = path.as_ref();

    if !path.is_file() {
        return Err(open_failed(path, "no such file"));
    }

    if StillImageSource::is_image_file(path) {
        Ok(Box::new(StillImageSource::open(path)?))
    } else {
        Ok(Box::new(FfmpegSource::open(path)?))
    }
}

fn open_failed(path: &Path, reason: impl Into<String>) -> crate::error::LofiCamError {
    SourceError::OpenFailed {
        path: path.display().to_string(),
        reason: reason.into(),
    }
    .into()
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
}

/// Parse an ffprobe rational such as `30000/1001`
fn parse_frame_rate(rate: &str) -> Option<f64> {
    let (num, den) = rate.split_once('/').unwrap_or((rate, "1"));
    let num: f64 = num.trim().parse().ok()?;
    let den: f64 = den.trim().parse().ok()?;
    if den == 0.0 {
        return None;
    }
    Some(num / den)
}

/// Turn ffprobe's JSON into source properties
///
/// The frame rate is truncated to a whole number of frames per second.
fn parse_probe_output(json: &str) -> std::result::Result<SourceInfo, String> {
    let probe: ProbeOutput =
        serde_json::from_str(json).map_err(|e| format!("invalid ffprobe output: {}", e))?;
    let stream = probe
        .streams
        .into_iter()
        .next()
        .ok_or_else(|| "no video stream".to_string())?;

    let (width, height) = match (stream.width, stream.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => return Err("video stream has no dimensions".to_string()),
    };

    let fps = [stream.avg_frame_rate, stream.r_frame_rate]
        .iter()
        .flatten()
        .filter_map(|rate| parse_frame_rate(rate))
        .map(|rate| rate as u32)
        .find(|&fps| fps > 0)
        .unwrap_or_else(|| {
            warn!("No usable frame rate reported, assuming {} fps", FALLBACK_FPS);
            FALLBACK_FPS
        });

    Ok(SourceInfo {
        dimensions: Dimensions::new(width, height),
        fps,
    })
}

/// Read one packed rgb24 frame; a short read or an I/O error ends the stream
fn read_raw_frame<R: Read>(reader: &mut R, dims: Dimensions, path: &Path) -> Option<Frame> {
    let mut buffer = vec![0u8; dims.byte_len()];

    match reader.read_exact(&mut buffer) {
        Ok(()) => Frame::from_rgb_bytes(dims.width, dims.height, buffer),
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
            debug!("End of stream reached for {:?}", path);
            None
        }
        Err(e) => {
            warn!("Read from {:?} failed, ending stream: {}", path, e);
            None
        }
    }
}

/// Video file decoded by an external `ffmpeg` process into raw RGB frames
pub struct FfmpegSource {
    path: PathBuf,
    info: SourceInfo,
    child: Option<Child>,
    stdout: Option<ChildStdout>,
}

impl FfmpegSource {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let info = Self::probe(path)?;

        let size = info.dimensions.to_string();
        let mut child = Command::new("ffmpeg")
            .args(["-v", "error", "-nostdin", "-i"])
            .arg(path)
            .args(["-f", "rawvideo", "-pix_fmt", "rgb24", "-s", &size, "-"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| open_failed(path, format!("cannot start ffmpeg: {}", e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| open_failed(path, "ffmpeg stdout unavailable"))?;

        info!(
            "Opened {:?}: {} @ {} fps",
            path, info.dimensions, info.fps
        );

        Ok(Self {
            path: path.to_path_buf(),
            info,
            child: Some(child),
            stdout: Some(stdout),
        })
    }

    fn probe(path: &Path) -> Result<SourceInfo> {
        let output = Command::new("ffprobe")
            .args([
                "-v", "quiet",
                "-print_format", "json",
                "-show_streams",
                "-select_streams", "v:0",
            ])
            .arg(path)
            .output()
            .map_err(|e| open_failed(path, format!("cannot run ffprobe: {}", e)))?;

        if !output.status.success() {
            return Err(open_failed(path, "ffprobe could not read the file"));
        }

        let json = String::from_utf8_lossy(&output.stdout);
        parse_probe_output(&json).map_err(|reason| open_failed(path, reason))
    }
}

impl FrameSource for FfmpegSource {
    fn info(&self) -> SourceInfo {
        self.info
    }

    fn read_frame(&mut self) -> Option<Frame> {
        let stdout = self.stdout.as_mut()?;
        read_raw_frame(stdout, self.info.dimensions, &self.path)
    }

    fn release(&mut self) {
        self.stdout = None;
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
            debug!("Released source {:?}", self.path);
        }
    }
}

impl Drop for FfmpegSource {
    fn drop(&mut self) {
        self.release();
    }
}

/// A still image played back as a one-frame stream
pub struct StillImageSource {
    info: SourceInfo,
    frame: Option<Frame>,
}

impl StillImageSource {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let image = image::open(path).map_err(|e| open_failed(path, e.to_string()))?;
        let frame = Frame::new(image.to_rgb8());

        info!("Opened still image {:?}: {}", path, frame.dimensions());
        Ok(Self::from_frame(frame))
    }

    pub fn from_frame(frame: Frame) -> Self {
        Self {
            info: SourceInfo {
                dimensions: frame.dimensions(),
                fps: FALLBACK_FPS,
            },
            frame: Some(frame),
        }
    }

    pub fn is_image_file(path: &Path) -> bool {
        matches!(
            path.extension().and_then(|ext| ext.to_str()),
            Some(ext) if matches!(
                ext.to_lowercase().as_str(),
                "jpg" | "jpeg" | "png"
            )
        )
    }
}

impl FrameSource for StillImageSource {
    fn info(&self) -> SourceInfo {
        self.info
    }

    fn read_frame(&mut self) -> Option<Frame> {
        self.frame.take()
    }

    fn release(&mut self) {
        self.frame = None;
    }
}
