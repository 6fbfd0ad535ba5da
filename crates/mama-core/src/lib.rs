//! Core domain logic for the mama pregnancy tracker.
//!
//! This crate contains the fundamental types and logic for:
//! - Sessions: labor sessions and the contractions timed inside them
//! - Analytics: durations, intervals, labor phase, and the 5-1-1 check
//! - Lifecycle: the controller driving a session through its states
//! - Kicks: fetal movement counting
//! - Pregnancy: gestation week and trimester math

pub mod analytics;
pub mod clock;
pub mod controller;
pub mod kicks;
pub mod pregnancy;
pub mod session;
pub mod store;
pub mod ticker;
mod types;

pub use analytics::{
    LaborAnalysis, LaborPhase, average_duration, average_interval, classify_phase,
    should_seek_care,
};
pub use clock::{Clock, SystemClock, elapsed_seconds};
pub use controller::{
    ContractionStart, ContractionStop, ControllerError, ControllerState, SessionController,
    SessionEnd, SessionStart, SessionSummary,
};
pub use kicks::{DAILY_KICK_GOAL, KickCount, KickTally};
pub use pregnancy::{FULL_TERM_WEEKS, Trimester, days_until_due, gestation_week};
pub use session::{Contraction, ContractionSession, Intensity, SessionError};
pub use store::{KickStore, SessionStore, StoreError};
pub use ticker::{CONTRACTION_TICK, SESSION_TICK, Ticker};
pub use types::{ContractionId, KickId, SessionId, UserId, ValidationError};
