//! Relay settings from the environment.

pub const DEFAULT_BIND: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_ROOM_CODE_LEN: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    pub bind: String,
    pub port: u16,
    pub room_code_len: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self { bind: DEFAULT_BIND.to_owned(), port: DEFAULT_PORT, room_code_len: DEFAULT_ROOM_CODE_LEN }
    }
}

impl RelayConfig {
    /// `ROOMSYNC_SERVER_BIND` (`0.0.0.0`), `ROOMSYNC_SERVER_PORT` (5000),
    /// `ROOMSYNC_ROOM_CODE_LEN` (5). Bad values fall back to defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let bind = lookup("ROOMSYNC_SERVER_BIND")
            .map(|b| b.trim().to_owned())
            .filter(|b| !b.is_empty())
            .unwrap_or_else(|| DEFAULT_BIND.to_owned());
        let room_code_len = env_parse(lookup("ROOMSYNC_ROOM_CODE_LEN"), DEFAULT_ROOM_CODE_LEN);

        Self {
            bind,
            port: env_parse(lookup("ROOMSYNC_SERVER_PORT"), DEFAULT_PORT),
            room_code_len: if room_code_len == 0 { DEFAULT_ROOM_CODE_LEN } else { room_code_len },
        }
    }

    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

fn env_parse<T>(raw: Option<String>, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    raw.and_then(|v| v.trim().parse::<T>().ok()).unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
