use std::io::{ErrorKind, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::error::{Result, SinkError};
use crate::stream::clock::Clock;
use crate::video::types::{ChannelOrder, Dimensions, PixelBuffer};

/// Software camera device that other applications read from
pub trait VirtualCamera {
    /// Device the camera publishes to
    fn device(&self) -> &str;

    /// Channel order frames must be submitted in
    fn channel_order(&self) -> ChannelOrder;

    /// Submit one frame
    fn send(&mut self, frame: &PixelBuffer) -> Result<()>;

    /// Block until the next send slot at the camera's frame rate
    fn sleep_until_next_frame(&mut self, clock: &dyn Clock);

    fn close(&mut self);
}

/// Fixed-rate send slot scheduler
///
/// Each wait targets one frame interval after the previous slot. When the
/// caller has fallen more than a full interval behind, the schedule restarts
/// from the current time instead of bursting to catch up.
#[derive(Debug, Clone)]
pub struct FramePacer {
    interval: Duration,
    last_slot: Option<Duration>,
}

impl FramePacer {
    pub fn new(fps: u32) -> Self {
        Self {
            interval: Duration::from_secs_f64(1.0 / fps.max(1) as f64),
            last_slot: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Sleep until the next slot is due; returns how long it slept
    pub fn wait(&mut self, clock: &dyn Clock) -> Duration {
        let now = clock.now();
        let due = self.last_slot.unwrap_or(now) + self.interval;

        if due > now {
            let pause = due - now;
            clock.sleep(pause);
            self.last_slot = Some(due);
            pause
        } else {
            if now - due > self.interval {
                debug!("Pacer {:?} behind, resynchronising", now - due);
                self.last_slot = Some(now);
            } else {
                self.last_slot = Some(due);
            }
            Duration::ZERO
        }
    }
}

/// How long the writer gets to exit after its input closes
const CLOSE_GRACE: Duration = Duration::from_millis(500);

/// Reap a writer process, killing it if it has not exited within `grace`
fn stop_writer(mut child: Child, grace: Duration) {
    let deadline = Instant::now() + grace;
    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                debug!("Virtual camera writer exited: {}", status);
                return;
            }
            Ok(None) if Instant::now() < deadline => thread::sleep(Duration::from_millis(10)),
            Ok(None) => break,
            Err(e) => {
                warn!("Could not poll virtual camera writer: {}", e);
                break;
            }
        }
    }

    warn!("Virtual camera writer did not exit in {:?}, killing it", grace);
    let _ = child.kill();
    if let Err(e) = child.wait() {
        warn!("Could not reap virtual camera writer: {}", e);
    }
}

/// v4l2loopback device fed by an `ffmpeg` child process
pub struct V4l2Camera {
    device: String,
    dimensions: Dimensions,
    order: ChannelOrder,
    pacer: FramePacer,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
}

impl V4l2Camera {
    pub fn open(device: &str, dimensions: Dimensions, fps: u32, order: ChannelOrder) -> Result<Self> {
        let open_failed = |reason: String| SinkError::CameraOpenFailed {
            device: device.to_string(),
            reason,
        };

        if !Path::new(device).exists() {
            return Err(open_failed("device does not exist".to_string()).into());
        }

        let size = dimensions.to_string();
        let rate = fps.max(1).to_string();
        let mut child = Command::new("ffmpeg")
            .args(["-v", "error", "-nostdin"])
            .args(["-f", "rawvideo", "-pix_fmt", order.ffmpeg_pix_fmt()])
            .args(["-s", &size, "-r", &rate, "-i", "-"])
            .args(["-f", "v4l2", "-pix_fmt", "yuv420p", device])
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| open_failed(format!("cannot start ffmpeg: {}", e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| open_failed("ffmpeg stdin unavailable".to_string()))?;

        info!("Using virtual camera: {}", device);
        info!("   {} @ {} fps, {} input", dimensions, fps, order.ffmpeg_pix_fmt());

        Ok(Self {
            device: device.to_string(),
            dimensions,
            order,
            pacer: FramePacer::new(fps),
            child: Some(child),
            stdin: Some(stdin),
        })
    }
}

impl VirtualCamera for V4l2Camera {
    fn device(&self) -> &str {
        &self.device
    }

    fn channel_order(&self) -> ChannelOrder {
        self.order
    }

    fn send(&mut self, frame: &PixelBuffer) -> Result<()> {
        if frame.dimensions != self.dimensions {
            return Err(SinkError::DimensionMismatch {
                width: self.dimensions.width,
                height: self.dimensions.height,
                actual_width: frame.dimensions.width,
                actual_height: frame.dimensions.height,
            }
            .into());
        }
        debug_assert_eq!(frame.order, self.order);

        let stdin = self.stdin.as_mut().ok_or_else(|| SinkError::SubmitFailed {
            reason: "camera is closed".to_string(),
        })?;

        stdin.write_all(&frame.bytes).map_err(|e| {
            let reason = if e.kind() == ErrorKind::BrokenPipe {
                "ffmpeg exited".to_string()
            } else {
                e.to_string()
            };
            SinkError::SubmitFailed { reason }.into()
        })
    }

    fn sleep_until_next_frame(&mut self, clock: &dyn Clock) {
        self.pacer.wait(clock);
    }

    fn close(&mut self) {
        // Closing stdin lets ffmpeg flush and exit on its own.
        self.stdin = None;
        if let Some(child) = self.child.take() {
            stop_writer(child, CLOSE_GRACE);
        }
    }
}

impl Drop for V4l2Camera {
    fn drop(&mut self) {
        self.close();
    }
}
