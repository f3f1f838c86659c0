//! Application state and composition.

use std::sync::Arc;

use duelhall_domain::RulesEngine;

use crate::infrastructure::{
    app_settings::EngineSettings,
    clock::{SystemClock, SystemRandom},
    ports::{ClockPort, RandomPort},
    session::{RegistryConfig, RegistryHandle},
};

/// Main application state.
///
/// Passed to HTTP/WebSocket handlers via Axum state.
pub struct App {
    pub settings: EngineSettings,
    pub registry: RegistryHandle,
}

impl App {
    /// Build the application and start the registry loop.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(
        settings: EngineSettings,
        rules: Arc<dyn RulesEngine>,
        clock: Arc<dyn ClockPort>,
        random: Arc<dyn RandomPort>,
    ) -> Self {
        let registry = RegistryHandle::spawn(RegistryConfig {
            rules,
            clock,
            random,
            session_command_buffer: settings.session_command_buffer,
        });

        Self { settings, registry }
    }

    /// Production wiring: system clock and randomness.
    pub fn with_system_ports(settings: EngineSettings, rules: Arc<dyn RulesEngine>) -> Self {
        Self::new(
            settings,
            rules,
            Arc::new(SystemClock::new()),
            Arc::new(SystemRandom::new()),
        )
    }
}
