//! Room and admission settings.

use std::time::Duration;

// ---------------------------------------------------------------------------
// AdmissionConfig
// ---------------------------------------------------------------------------

/// Tuning for the score plausibility check.
///
/// A score is rejected when it exceeds
/// `max_rate_per_sec × max(elapsed, min_elapsed) × tolerance`.
/// These are heuristics against casual tampering, not a guarantee.
#[derive(Debug, Clone, PartialEq)]
pub struct AdmissionConfig {
    /// Fastest sustained scoring a legitimate player can reach.
    pub max_rate_per_sec: f64,

    /// Multiplier on top of the rate for bursts and clock skew.
    pub tolerance: f64,

    /// Elapsed time is never taken as less than this, so the first
    /// updates after the start are not rejected for rounding.
    pub min_elapsed: Duration,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            max_rate_per_sec: 1000.0,
            tolerance: 1.5,
            min_elapsed: Duration::from_secs(1),
        }
    }
}

// ---------------------------------------------------------------------------
// RoomConfig
// ---------------------------------------------------------------------------

/// Settings applied to every room the registry creates.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomConfig {
    /// Capacity when `create_room` does not ask for one.
    pub default_max_players: usize,

    /// Largest capacity a client may ask for.
    pub max_players_limit: usize,

    /// Rooms older than this are reclaimed even if players remain.
    pub ttl: Duration,

    /// Lives every player starts the match with.
    pub starting_lives: u32,

    /// Capacity of each room actor's command queue.
    pub channel_size: usize,

    pub admission: AdmissionConfig,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            default_max_players: 8,
            max_players_limit: 16,
            ttl: Duration::from_secs(2 * 60 * 60),
            starting_lives: 3,
            channel_size: 64,
            admission: AdmissionConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_config_default() {
        let config = RoomConfig::default();
        assert_eq!(config.default_max_players, 8);
        assert_eq!(config.max_players_limit, 16);
        assert_eq!(config.ttl, Duration::from_secs(7200));
        assert_eq!(config.starting_lives, 3);
    }

    #[test]
    fn test_admission_config_default() {
        let config = AdmissionConfig::default();
        assert_eq!(config.max_rate_per_sec, 1000.0);
        assert_eq!(config.tolerance, 1.5);
        assert_eq!(config.min_elapsed, Duration::from_secs(1));
    }
}
