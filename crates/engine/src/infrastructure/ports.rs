//! Testability ports.
//!
//! Time and randomness are injected so session ids and start times can be
//! pinned in tests.

use chrono::{DateTime, Utc};

#[cfg_attr(test, mockall::automock)]
pub trait ClockPort: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[cfg_attr(test, mockall::automock)]
pub trait RandomPort: Send + Sync {
    /// Uniform index in `0..len`. Returns 0 when `len` is 0.
    fn gen_index(&self, len: usize) -> usize;
}
