//! Engine settings loaded from the environment
//!
//! Every value has a default so the engine starts with an empty environment.
//! Values that fail to parse are logged and replaced by their default rather
//! than aborting startup.
//!
//! | variable | default |
//! |---|---|
//! | `SERVER_HOST` | `0.0.0.0` |
//! | `SERVER_PORT` (or `PORT`) | `8080` |
//! | `PING_PERIOD_SECS` | `54` |
//! | `PONG_WAIT_SECS` | `60` |
//! | `MAILBOX_CAPACITY` | `1` |
//! | `SESSION_COMMAND_BUFFER` | `1` |
//! | `CORS_ALLOWED_ORIGINS` | unset |

use std::net::{AddrParseError, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_PING_PERIOD: Duration = Duration::from_secs(54);
pub const DEFAULT_PONG_WAIT: Duration = Duration::from_secs(60);
pub const DEFAULT_MAILBOX_CAPACITY: usize = 1;
pub const DEFAULT_SESSION_COMMAND_BUFFER: usize = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    pub host: String,
    pub port: u16,
    /// Interval between liveness probes on an idle connection
    pub ping_period: Duration,
    /// Silence after which a connection is considered dead
    pub pong_wait: Duration,
    /// Per-participant outbound queue depth
    pub mailbox_capacity: usize,
    /// Per-session command queue depth
    pub session_command_buffer: usize,
    /// Comma separated origins, or `*`; `None` disables the CORS layer
    pub cors_allowed_origins: Option<String>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            ping_period: DEFAULT_PING_PERIOD,
            pong_wait: DEFAULT_PONG_WAIT,
            mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
            session_command_buffer: DEFAULT_SESSION_COMMAND_BUFFER,
            cors_allowed_origins: None,
        }
    }
}

impl EngineSettings {
    /// Read settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let value = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let host = value("SERVER_HOST").unwrap_or(defaults.host);
        let port = parse_or(
            "SERVER_PORT",
            value("SERVER_PORT").or_else(|| value("PORT")),
            defaults.port,
        );
        let ping_period = Duration::from_secs(parse_or(
            "PING_PERIOD_SECS",
            value("PING_PERIOD_SECS"),
            defaults.ping_period.as_secs(),
        ));
        let pong_wait = Duration::from_secs(parse_or(
            "PONG_WAIT_SECS",
            value("PONG_WAIT_SECS"),
            defaults.pong_wait.as_secs(),
        ));
        let mailbox_capacity = parse_or(
            "MAILBOX_CAPACITY",
            value("MAILBOX_CAPACITY"),
            defaults.mailbox_capacity,
        )
        .max(1);
        let session_command_buffer = parse_or(
            "SESSION_COMMAND_BUFFER",
            value("SESSION_COMMAND_BUFFER"),
            defaults.session_command_buffer,
        )
        .max(1);

        Self {
            host,
            port,
            ping_period,
            pong_wait,
            mailbox_capacity,
            session_command_buffer,
            cors_allowed_origins: value("CORS_ALLOWED_ORIGINS"),
        }
        .normalized()
    }

    /// Keep the probe interval strictly inside the liveness window.
    fn normalized(mut self) -> Self {
        if self.pong_wait.is_zero() {
            tracing::warn!("PONG_WAIT_SECS must be positive, using default");
            self.pong_wait = DEFAULT_PONG_WAIT;
        }
        if self.ping_period.is_zero() || self.ping_period >= self.pong_wait {
            let clamped = self.pong_wait * 9 / 10;
            tracing::warn!(
                ping_period = ?self.ping_period,
                pong_wait = ?self.pong_wait,
                clamped = ?clamped,
                "Ping period must be shorter than pong wait, clamping"
            );
            self.ping_period = clamped;
        }
        self
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}

fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> T
where
    T: FromStr + Copy + std::fmt::Debug,
{
    let Some(raw) = raw else {
        return default;
    };
    match raw.parse() {
        Ok(v) => v,
        Err(_) => {
            tracing::warn!(key, value = %raw, default = ?default, "Unparsable setting, using default");
            default
        }
    }
}
