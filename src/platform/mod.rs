//! Platform abstraction layer
//!
//! Time and timers. The host owns the real clock and feeds elapsed time in;
//! everything below runs on a virtual millisecond clock.

pub mod timer;

pub use timer::{Fired, TimerHandle, TimerId, TimerKind, TimerQueue};
