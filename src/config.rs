//! Client configuration.

use std::time::Duration;

/// Configuration for one IRC connection.
#[derive(Clone, Debug)]
pub struct Config {
    /// Initial nickname (required).
    pub nickname: String,
    /// Username (ident) for the USER command. Defaults to the nickname.
    pub username: Option<String>,
    /// Real name / GECOS, the trailing of USER.
    pub realname: Option<String>,
    /// Server host.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Server password, sent via PASS before NICK when present.
    pub password: Option<String>,
    /// Connect over TLS.
    pub tls: bool,
    /// Outbound queue drain period.
    pub send_interval: Duration,
}

/// Default pacing between queued outbound lines.
pub const DEFAULT_SEND_INTERVAL: Duration = Duration::from_millis(100);

impl Config {
    /// A configuration with the required fields and defaults for the rest.
    pub fn new(nickname: impl Into<String>, host: impl Into<String>) -> Config {
        Config {
            nickname: nickname.into(),
            username: None,
            realname: None,
            host: host.into(),
            port: 6667,
            password: None,
            tls: false,
            send_interval: DEFAULT_SEND_INTERVAL,
        }
    }

    /// The ident to register with: `username`, or the nickname when unset.
    pub fn username(&self) -> &str {
        self.username.as_deref().unwrap_or(&self.nickname)
    }

    /// The real name to register with: `realname`, or the nickname.
    pub fn realname(&self) -> &str {
        self.realname.as_deref().unwrap_or(&self.nickname)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::new("bot", "irc.example.com");
        assert_eq!(config.port, 6667);
        assert_eq!(config.username(), "bot");
        assert_eq!(config.realname(), "bot");
        assert_eq!(config.send_interval, Duration::from_millis(100));
        assert!(!config.tls);
    }

    #[test]
    fn test_username_override() {
        let mut config = Config::new("bot", "irc.example.com");
        config.username = Some("ident".into());
        config.realname = Some("A Bot".into());
        assert_eq!(config.username(), "ident");
        assert_eq!(config.realname(), "A Bot");
    }
}
