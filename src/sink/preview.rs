use std::io::{ErrorKind, Write};
use std::process::{Child, ChildStdin, Command, Stdio};

use tracing::{debug, info, warn};

use crate::error::{Result, SinkError};
use crate::video::types::{ChannelOrder, Dimensions, PixelBuffer};

/// Local window showing the degraded stream
pub trait Preview {
    /// Whether the user still has the window open
    fn is_open(&mut self) -> bool;

    /// Channel order frames must be rendered in
    fn channel_order(&self) -> ChannelOrder;

    fn render(&mut self, frame: &PixelBuffer) -> Result<()>;

    /// Pump pending window events; returns a key code if one was pressed
    fn poll_input(&mut self) -> Option<u32>;

    fn close(&mut self);
}

/// Window title and on-screen size of the preview
#[derive(Debug, Clone)]
pub struct PreviewWindow {
    pub title: String,
    pub size: Dimensions,
}

/// Preview window drawn by an `ffplay` child process
///
/// Closing the window ends the child, which is how the session notices the
/// user wants to stop.
pub struct FfplayPreview {
    window: PreviewWindow,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    open: bool,
}

impl FfplayPreview {
    /// Channel order ffplay is told to expect
    pub const ORDER: ChannelOrder = ChannelOrder::Bgr;

    pub fn open(window: PreviewWindow, frame_size: Dimensions, fps: u32) -> Result<Self> {
        let size = frame_size.to_string();
        let rate = fps.max(1).to_string();
        let width = window.size.width.to_string();
        let height = window.size.height.to_string();

        let mut child = Command::new("ffplay")
            .args(["-loglevel", "error", "-fflags", "nobuffer"])
            .args(["-f", "rawvideo", "-pixel_format", Self::ORDER.ffmpeg_pix_fmt()])
            .args(["-video_size", &size, "-framerate", &rate])
            .args(["-window_title", &window.title, "-x", &width, "-y", &height])
            .args(["-i", "-"])
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| SinkError::PreviewOpenFailed {
                reason: format!("cannot start ffplay: {}", e),
            })?;

        let stdin = child.stdin.take().ok_or_else(|| SinkError::PreviewOpenFailed {
            reason: "ffplay stdin unavailable".to_string(),
        })?;

        info!("Opened preview window \"{}\" ({})", window.title, window.size);

        Ok(Self {
            window,
            child: Some(child),
            stdin: Some(stdin),
            open: true,
        })
    }

    fn reap(&mut self) {
        if let Some(child) = self.child.as_mut() {
            match child.try_wait() {
                Ok(Some(status)) => {
                    debug!("Preview \"{}\" exited: {}", self.window.title, status);
                    self.open = false;
                }
                Ok(None) => {}
                Err(e) => {
                    warn!("Could not query preview process: {}", e);
                    self.open = false;
                }
            }
        }
    }
}

impl Preview for FfplayPreview {
    fn is_open(&mut self) -> bool {
        if self.open {
            self.reap();
        }
        self.open
    }

    fn channel_order(&self) -> ChannelOrder {
        Self::ORDER
    }

    fn render(&mut self, frame: &PixelBuffer) -> Result<()> {
        let Some(stdin) = self.stdin.as_mut() else {
            return Ok(());
        };

        match stdin.write_all(&frame.bytes) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::BrokenPipe => {
                debug!("Preview pipe closed by the window");
                self.open = false;
                Ok(())
            }
            Err(e) => {
                warn!("Preview write failed: {}", e);
                self.open = false;
                Ok(())
            }
        }
    }

    fn poll_input(&mut self) -> Option<u32> {
        // ffplay handles its own keyboard; all we can observe is it going away.
        self.reap();
        None
    }

    fn close(&mut self) {
        self.stdin = None;
        self.open = false;
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
            debug!("Destroyed preview window \"{}\"", self.window.title);
        }
    }
}

impl Drop for FfplayPreview {
    fn drop(&mut self) {
        self.close();
    }
}

/// Preview that is always open and shows nothing
#[derive(Debug, Default)]
pub struct HeadlessPreview {
    rendered: u64,
}

impl HeadlessPreview {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rendered(&self) -> u64 {
        self.rendered
    }
}

impl Preview for HeadlessPreview {
    fn is_open(&mut self) -> bool {
        true
    }

    fn channel_order(&self) -> ChannelOrder {
        ChannelOrder::Rgb
    }

    fn render(&mut self, _frame: &PixelBuffer) -> Result<()> {
        self.rendered += 1;
        Ok(())
    }

    fn poll_input(&mut self) -> Option<u32> {
        None
    }

    fn close(&mut self) {
        debug!("Headless preview closed after {} frames", self.rendered);
    }
}
