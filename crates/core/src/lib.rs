// crates/core/src/lib.rs
//! Hirelane domain core.
//!
//! Pure domain logic for interview sessions: the status state machine, the
//! anti-cheat answer analyzer, and client activity metadata. No I/O, no
//! async — everything here is safe to call from any context.

pub mod activity;
pub mod anticheat;
pub mod status;

pub use activity::ActivityLog;
pub use anticheat::{analyze, AnalyzerConfig, AntiCheatResult, Signal, SignalKind};
pub use status::{Recommendation, SessionStatus, Transition, TransitionError};

/// Current wall-clock time as unix milliseconds.
///
/// All timestamps in hirelane (storage and wire) are unix milliseconds;
/// millisecond precision matters because answer-timing signals compare
/// sub-second deltas.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
