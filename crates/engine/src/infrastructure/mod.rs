//! Infrastructure - settings, testability ports and the session actors.

pub mod app_settings;
pub mod clock;
pub mod ports;
pub mod session;
