//! # Stream Scheduling
//!
//! The per-frame loop that pulls from the source, decides drops, degrades,
//! fans out to the sinks and injects jitter. Time and randomness enter only
//! through [`Clock`] and [`Dice`], so whole sessions can be replayed in tests.

pub mod clock;
pub mod dice;
pub mod scheduler;

pub use clock::{Clock, ManualClock, SystemClock};
pub use dice::{small_rng, Dice, RandDice, ScriptedDice};
pub use scheduler::{SessionReport, SessionStats, StopReason, StreamScheduler, StreamSession};
