//! Client tuning parsed from environment variables.

use std::time::Duration;

use crate::transform::Thresholds;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_SEND_RATE: f32 = 30.0;
pub const DEFAULT_POSITION_THRESHOLD: f32 = 0.01;
pub const DEFAULT_ROTATION_THRESHOLD_DEG: f32 = 0.5;
pub const DEFAULT_SCALE_THRESHOLD: f32 = 0.01;
pub const DEFAULT_INTERPOLATION_SPEED: f32 = 10.0;
pub const DEFAULT_RELEASE_COOLDOWN_MS: u64 = 200;
pub const DEFAULT_RECV_POLL_MS: u64 = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct SyncConfig {
    /// Relay host: a literal address or a name to resolve.
    pub host: String,
    pub port: u16,
    /// Transform broadcasts per second while locally controlled.
    pub send_rate: f32,
    pub thresholds: Thresholds,
    /// Exponential smoothing rate toward the remote target, per second.
    pub interpolation_speed: f32,
    /// Cooldown applied when `stop_local_control` is called without one.
    pub release_cooldown: Duration,
    /// Receive worker read timeout; bounds how long `stop()` waits.
    pub recv_poll: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_owned(),
            port: DEFAULT_PORT,
            send_rate: DEFAULT_SEND_RATE,
            thresholds: Thresholds::default(),
            interpolation_speed: DEFAULT_INTERPOLATION_SPEED,
            release_cooldown: Duration::from_millis(DEFAULT_RELEASE_COOLDOWN_MS),
            recv_poll: Duration::from_millis(DEFAULT_RECV_POLL_MS),
        }
    }
}

impl SyncConfig {
    /// Build config from environment variables.
    ///
    /// Optional (defaults in parentheses):
    /// - `ROOMSYNC_HOST` (`127.0.0.1`), `ROOMSYNC_PORT` (5000)
    /// - `ROOMSYNC_SEND_RATE` (30)
    /// - `ROOMSYNC_POSITION_THRESHOLD` (0.01), `ROOMSYNC_ROTATION_THRESHOLD_DEG` (0.5),
    ///   `ROOMSYNC_SCALE_THRESHOLD` (0.01)
    /// - `ROOMSYNC_INTERPOLATION_SPEED` (10)
    /// - `ROOMSYNC_RELEASE_COOLDOWN_MS` (200)
    /// - `ROOMSYNC_RECV_POLL_MS` (100)
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`SyncConfig::from_env`] but reading through `lookup`.
    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            host: lookup("ROOMSYNC_HOST")
                .map(|h| h.trim().to_owned())
                .filter(|h| !h.is_empty())
                .unwrap_or_else(|| DEFAULT_HOST.to_owned()),
            port: parse_or(lookup("ROOMSYNC_PORT"), DEFAULT_PORT),
            send_rate: parse_or(lookup("ROOMSYNC_SEND_RATE"), DEFAULT_SEND_RATE),
            thresholds: Thresholds {
                position: parse_or(lookup("ROOMSYNC_POSITION_THRESHOLD"), DEFAULT_POSITION_THRESHOLD),
                rotation_degrees: parse_or(lookup("ROOMSYNC_ROTATION_THRESHOLD_DEG"), DEFAULT_ROTATION_THRESHOLD_DEG),
                scale: parse_or(lookup("ROOMSYNC_SCALE_THRESHOLD"), DEFAULT_SCALE_THRESHOLD),
            },
            interpolation_speed: parse_or(lookup("ROOMSYNC_INTERPOLATION_SPEED"), DEFAULT_INTERPOLATION_SPEED),
            release_cooldown: Duration::from_millis(parse_or(
                lookup("ROOMSYNC_RELEASE_COOLDOWN_MS"),
                DEFAULT_RELEASE_COOLDOWN_MS,
            )),
            recv_poll: Duration::from_millis(parse_or(lookup("ROOMSYNC_RECV_POLL_MS"), DEFAULT_RECV_POLL_MS).max(1)),
        }
    }

    /// Minimum time between two transform broadcasts.
    ///
    /// A rate that is non-positive, non-finite, or so small its interval
    /// does not fit a `Duration` falls back to the default rate.
    #[must_use]
    pub fn send_interval(&self) -> Duration {
        let default = Duration::from_secs_f32(1.0 / DEFAULT_SEND_RATE);
        if !(self.send_rate.is_finite() && self.send_rate > 0.0) {
            return default;
        }
        Duration::try_from_secs_f32(1.0 / self.send_rate).unwrap_or(default)
    }
}

fn parse_or<T>(raw: Option<String>, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    raw.and_then(|v| v.trim().parse::<T>().ok()).unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
