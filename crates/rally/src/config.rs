//! Server configuration, loaded from `rally.toml` plus `RALLY_*` overrides.

use std::path::Path;
use std::time::Duration;

use rally_room::{AdmissionConfig, RoomConfig};
use serde::Deserialize;

use crate::RallyError;

/// Default file looked up in the working directory.
pub const CONFIG_FILE: &str = "rally.toml";

/// Top-level server configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// WebSocket listener.
    pub listen_addr: String,
    /// HTTP status listener (`/health`, `/debug/rooms`). Disabled when unset.
    pub status_addr: Option<String>,
    pub rooms: RoomsConfig,
    pub admission: AdmissionSection,
    pub liveness: LivenessSection,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            status_addr: Some("127.0.0.1:8081".to_string()),
            rooms: RoomsConfig::default(),
            admission: AdmissionSection::default(),
            liveness: LivenessSection::default(),
        }
    }
}

/// Room lifecycle configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RoomsConfig {
    pub default_max_players: usize,
    pub max_players_limit: usize,
    pub ttl_secs: u64,
    pub sweep_interval_secs: u64,
    pub starting_lives: u32,
    /// Capacity of each room actor's command queue.
    pub command_buffer: usize,
}

impl Default for RoomsConfig {
    fn default() -> Self {
        Self {
            default_max_players: 8,
            max_players_limit: 16,
            ttl_secs: 2 * 60 * 60,
            sweep_interval_secs: 30,
            starting_lives: 3,
            command_buffer: 64,
        }
    }
}

/// Score plausibility tuning.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AdmissionSection {
    pub max_rate_per_sec: f64,
    pub tolerance: f64,
    pub min_elapsed_ms: u64,
}

impl Default for AdmissionSection {
    fn default() -> Self {
        Self {
            max_rate_per_sec: 1000.0,
            tolerance: 1.5,
            min_elapsed_ms: 1000,
        }
    }
}

/// Connection liveness, in seconds.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LivenessSection {
    pub handshake_timeout_secs: u64,
    pub keepalive_interval_secs: u64,
    pub keepalive_timeout_secs: u64,
}

impl Default for LivenessSection {
    fn default() -> Self {
        Self {
            handshake_timeout_secs: 5,
            keepalive_interval_secs: 10,
            keepalive_timeout_secs: 30,
        }
    }
}

/// Liveness settings the connection handler runs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LivenessConfig {
    /// How long a new connection may take to send its handshake.
    pub handshake_timeout: Duration,
    /// Gap between server pings.
    pub keepalive_interval: Duration,
    /// A connection silent for longer than this is closed.
    pub keepalive_timeout: Duration,
}

impl Default for LivenessConfig {
    fn default() -> Self {
        LivenessSection::default().to_liveness()
    }
}

impl LivenessSection {
    fn to_liveness(&self) -> LivenessConfig {
        LivenessConfig {
            handshake_timeout: Duration::from_secs(self.handshake_timeout_secs),
            keepalive_interval: Duration::from_secs(self.keepalive_interval_secs),
            keepalive_timeout: Duration::from_secs(self.keepalive_timeout_secs),
        }
    }
}

impl ServerConfig {
    /// Loads `rally.toml` from the working directory if it exists, then
    /// applies environment overrides and validation.
    ///
    /// A missing file means defaults. A file that fails to parse is an
    /// error rather than a silent fallback.
    pub fn load() -> Result<Self, RallyError> {
        let mut config = Self::load_file(Path::new(CONFIG_FILE))?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate();
        Ok(config)
    }

    /// Parses `path`, or returns defaults if it does not exist.
    pub fn load_file(path: &Path) -> Result<Self, RallyError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let config = Self::from_toml(&content)?;
                tracing::info!(path = %path.display(), "loaded configuration");
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "no config file found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn from_toml(content: &str) -> Result<Self, RallyError> {
        Ok(toml::from_str(content)?)
    }

    /// Applies `RALLY_*` overrides. Empty or unparsable values are ignored
    /// with a warning.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(addr) = var("RALLY_LISTEN_ADDR") {
            self.listen_addr = addr;
        }
        if let Some(addr) = var("RALLY_STATUS_ADDR") {
            self.status_addr = match addr.as_str() {
                "off" | "none" => None,
                _ => Some(addr),
            };
        }
        if let Some(secs) = parse_env(&var, "RALLY_ROOM_TTL_SECS") {
            self.rooms.ttl_secs = secs;
        }
        if let Some(secs) = parse_env(&var, "RALLY_SWEEP_INTERVAL_SECS") {
            self.rooms.sweep_interval_secs = secs;
        }
    }

    /// Replaces nonsensical values with defaults, logging each change.
    pub fn validate(&mut self) {
        let rooms = RoomsConfig::default();
        if self.rooms.max_players_limit == 0 {
            tracing::warn!("rooms.max_players_limit must be > 0, using default");
            self.rooms.max_players_limit = rooms.max_players_limit;
        }
        if self.rooms.default_max_players == 0
            || self.rooms.default_max_players > self.rooms.max_players_limit
        {
            tracing::warn!(
                default_max_players = self.rooms.default_max_players,
                limit = self.rooms.max_players_limit,
                "rooms.default_max_players out of range, clamping"
            );
            self.rooms.default_max_players = rooms
                .default_max_players
                .min(self.rooms.max_players_limit);
        }
        if self.rooms.ttl_secs == 0 {
            tracing::warn!("rooms.ttl_secs must be > 0, using default");
            self.rooms.ttl_secs = rooms.ttl_secs;
        }
        if self.rooms.sweep_interval_secs == 0 {
            tracing::warn!("rooms.sweep_interval_secs must be > 0, using default");
            self.rooms.sweep_interval_secs = rooms.sweep_interval_secs;
        }
        if self.rooms.command_buffer == 0 {
            tracing::warn!("rooms.command_buffer must be > 0, using default");
            self.rooms.command_buffer = rooms.command_buffer;
        }

        let admission = AdmissionSection::default();
        if !self.admission.max_rate_per_sec.is_finite() || self.admission.max_rate_per_sec <= 0.0 {
            tracing::warn!("admission.max_rate_per_sec must be > 0, using default");
            self.admission.max_rate_per_sec = admission.max_rate_per_sec;
        }
        if !self.admission.tolerance.is_finite() || self.admission.tolerance < 1.0 {
            tracing::warn!("admission.tolerance must be >= 1.0, using default");
            self.admission.tolerance = admission.tolerance;
        }

        let liveness = LivenessSection::default();
        if self.liveness.handshake_timeout_secs == 0 {
            tracing::warn!("liveness.handshake_timeout_secs must be > 0, using default");
            self.liveness.handshake_timeout_secs = liveness.handshake_timeout_secs;
        }
        if self.liveness.keepalive_interval_secs == 0 {
            tracing::warn!("liveness.keepalive_interval_secs must be > 0, using default");
            self.liveness.keepalive_interval_secs = liveness.keepalive_interval_secs;
        }
        if self.liveness.keepalive_timeout_secs <= self.liveness.keepalive_interval_secs {
            tracing::warn!(
                timeout = self.liveness.keepalive_timeout_secs,
                interval = self.liveness.keepalive_interval_secs,
                "liveness.keepalive_timeout_secs must exceed the interval, clamping"
            );
            self.liveness.keepalive_timeout_secs = self.liveness.keepalive_interval_secs * 3;
        }
    }

    /// Settings for the room registry.
    pub fn room_config(&self) -> RoomConfig {
        RoomConfig {
            default_max_players: self.rooms.default_max_players,
            max_players_limit: self.rooms.max_players_limit,
            ttl: Duration::from_secs(self.rooms.ttl_secs),
            starting_lives: self.rooms.starting_lives,
            channel_size: self.rooms.command_buffer,
            admission: AdmissionConfig {
                max_rate_per_sec: self.admission.max_rate_per_sec,
                tolerance: self.admission.tolerance,
                min_elapsed: Duration::from_millis(self.admission.min_elapsed_ms),
            },
        }
    }

    pub fn liveness_config(&self) -> LivenessConfig {
        self.liveness.to_liveness()
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.rooms.sweep_interval_secs)
    }
}

fn parse_env(var: &impl Fn(&str) -> Option<String>, key: &str) -> Option<u64> {
    let raw = var(key)?;
    match raw.parse() {
        Ok(n) => Some(n),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparsable override");
            None
        }
    }
}
