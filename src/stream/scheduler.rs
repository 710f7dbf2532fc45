use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Local};
use rand::RngCore;
use tracing::{debug, info, warn};

use crate::degrade::{DegradationParams, DegradationPipeline};
use crate::error::Result;
use crate::sink::{Preview, VirtualCamera};
use crate::stream::clock::{Clock, SystemClock};
use crate::stream::dice::{small_rng, Dice, RandDice};
use crate::video::{FrameSource, SourceInfo};

/// Why a session stopped normally
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The source ran out of frames or a read failed
    EndOfStream,
    /// The preview window was closed by the user
    UserClosedPreview,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::EndOfStream => write!(f, "end of stream"),
            StopReason::UserClosedPreview => write!(f, "preview closed"),
        }
    }
}

/// Counters collected over one run
#[derive(Debug, Clone)]
pub struct SessionStats {
    pub frames_read: u64,
    pub frames_dropped: u64,
    pub frames_emitted: u64,
    /// Simulated latency injected by drops and jitter
    pub total_delay: Duration,
    pub started_at: DateTime<Local>,
    pub finished_at: Option<DateTime<Local>>,
}

impl SessionStats {
    fn new() -> Self {
        Self {
            frames_read: 0,
            frames_dropped: 0,
            frames_emitted: 0,
            total_delay: Duration::ZERO,
            started_at: Local::now(),
            finished_at: None,
        }
    }

    /// Fraction of read frames that were dropped
    pub fn drop_fraction(&self) -> f64 {
        if self.frames_read == 0 {
            0.0
        } else {
            self.frames_dropped as f64 / self.frames_read as f64
        }
    }
}

/// Outcome of a session that stopped normally
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub reason: StopReason,
    pub stats: SessionStats,
}

/// Source, camera and preview bound together for one run
///
/// Teardown (release source, close camera, close preview) happens exactly
/// once, either through [`StreamSession::teardown`] or on drop.
pub struct StreamSession {
    source: Box<dyn FrameSource>,
    camera: Box<dyn VirtualCamera>,
    preview: Box<dyn Preview>,
    info: SourceInfo,
    torn_down: bool,
}

impl StreamSession {
    /// Open the sinks for an already opened source
    ///
    /// The camera is opened at the source's native size and rate, then the
    /// preview. If either fails, everything opened so far is released.
    pub fn start<C, P>(mut source: Box<dyn FrameSource>, open_camera: C, open_preview: P) -> Result<Self>
    where
        C: FnOnce(SourceInfo) -> Result<Box<dyn VirtualCamera>>,
        P: FnOnce(SourceInfo) -> Result<Box<dyn Preview>>,
    {
        let info = source.info();

        let mut camera = match open_camera(info) {
            Ok(camera) => camera,
            Err(e) => {
                source.release();
                return Err(e);
            }
        };

        let preview = match open_preview(info) {
            Ok(preview) => preview,
            Err(e) => {
                source.release();
                camera.close();
                return Err(e);
            }
        };

        info!(
            "Session started: {} @ {} fps -> {}",
            info.dimensions,
            info.fps,
            camera.device()
        );

        Ok(Self {
            source,
            camera,
            preview,
            info,
            torn_down: false,
        })
    }

    pub fn info(&self) -> SourceInfo {
        self.info
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Release the source, close the camera and destroy the preview
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;

        self.source.release();
        self.camera.close();
        self.preview.close();
        debug!("Session torn down");
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Drives the per-frame loop: drop decision, degradation, fan-out, jitter
///
/// Everything runs on the calling thread. The three waits (drop stall,
/// camera pacing, jitter) block it on purpose to model wall-clock latency.
pub struct StreamScheduler {
    pipeline: DegradationPipeline,
    clock: Box<dyn Clock>,
    dice: Box<dyn Dice>,
    noise: Box<dyn RngCore>,
}

impl StreamScheduler {
    pub fn new(
        pipeline: DegradationPipeline,
        clock: Box<dyn Clock>,
        dice: Box<dyn Dice>,
        noise: Box<dyn RngCore>,
    ) -> Self {
        Self {
            pipeline,
            clock,
            dice,
            noise,
        }
    }

    /// Production scheduler: JPEG codec, wall clock, optional fixed seed
    pub fn with_params(params: DegradationParams, seed: Option<u64>) -> Self {
        // Offset the noise seed so it does not mirror the decision stream.
        let noise_seed = seed.map(|seed| seed.wrapping_add(0x9E37_79B9_7F4A_7C15));
        Self::new(
            DegradationPipeline::with_jpeg(params),
            Box::new(SystemClock::new()),
            Box::new(RandDice::seeded(seed)),
            Box::new(small_rng(noise_seed)),
        )
    }

    pub fn params(&self) -> &DegradationParams {
        self.pipeline.params()
    }

    /// Whether the next frame should be dropped
    pub fn should_drop(&mut self) -> bool {
        self.dice.roll() < self.pipeline.params().drop_rate
    }

    /// A fresh jitter delay, uniform in `[0, max_delay)`
    pub fn jitter(&mut self) -> Duration {
        self.pipeline.params().max_delay().mul_f64(self.dice.roll())
    }

    fn pause(&self, duration: Duration, stats: &mut SessionStats) {
        if !duration.is_zero() {
            self.clock.sleep(duration);
            stats.total_delay += duration;
        }
    }

    /// Run the session until it stops, then tear it down
    ///
    /// Normal stops come back as a [`SessionReport`]. Errors while streaming
    /// still tear the session down before being returned.
    pub fn run(&mut self, mut session: StreamSession) -> Result<SessionReport> {
        let mut stats = SessionStats::new();

        let outcome = loop {
            match self.step(&mut session, &mut stats) {
                Ok(Some(reason)) => break Ok(reason),
                Ok(None) => continue,
                Err(e) => break Err(e),
            }
        };

        session.teardown();
        stats.finished_at = Some(Local::now());

        match outcome {
            Ok(reason) => {
                info!("Session stopped: {}", reason);
                info!(
                    "   Frames read: {}, dropped: {} ({:.1}%), emitted: {}",
                    stats.frames_read,
                    stats.frames_dropped,
                    stats.drop_fraction() * 100.0,
                    stats.frames_emitted
                );
                info!("   Injected delay: {:.2}s", stats.total_delay.as_secs_f64());
                Ok(SessionReport { reason, stats })
            }
            Err(e) => {
                warn!("Session aborted after {} frames: {}", stats.frames_read, e);
                Err(e)
            }
        }
    }

    /// One loop iteration; `Some` means the session should stop
    fn step(&mut self, session: &mut StreamSession, stats: &mut SessionStats) -> Result<Option<StopReason>> {
        if !session.preview.is_open() {
            return Ok(Some(StopReason::UserClosedPreview));
        }

        let Some(frame) = session.source.read_frame() else {
            return Ok(Some(StopReason::EndOfStream));
        };
        stats.frames_read += 1;

        if self.should_drop() {
            // A dropped frame always costs the full stall.
            let stall = self.pipeline.params().max_delay();
            debug!("Dropped frame {} (stall {:?})", stats.frames_read, stall);
            stats.frames_dropped += 1;
            self.pause(stall, stats);
            return Ok(None);
        }

        let degraded = self
            .pipeline
            .degrade(&frame, session.info.dimensions, self.noise.as_mut())?;

        let camera_frame = degraded.to_pixel_buffer(session.camera.channel_order());
        session.camera.send(&camera_frame)?;
        session.camera.sleep_until_next_frame(self.clock.as_ref());

        let preview_frame = degraded.to_pixel_buffer(session.preview.channel_order());
        session.preview.render(&preview_frame)?;
        stats.frames_emitted += 1;

        let jitter = self.jitter();
        self.pause(jitter, stats);

        let _ = session.preview.poll_input();
        Ok(None)
    }
}
