//! IRC message source (hostmask) types.

/// A message source in `nick!user@host` form.
///
/// Parsed by splitting on the first `!`, then the first `@`. A missing
/// delimiter leaves the corresponding field empty and the remainder in
/// the preceding field, so a bare server name parses as all-nick.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Hostmask {
    /// The prefix exactly as it appeared on the wire.
    pub raw: String,
    /// Nickname portion (the whole prefix when no `!`/`@` is present).
    pub nick: String,
    /// Username (ident) portion, empty if absent.
    pub user: String,
    /// Host portion, empty if absent.
    pub host: String,
}

impl Hostmask {
    /// Parse a raw prefix into its triple.
    pub fn parse(raw: &str) -> Hostmask {
        let (nick, rest) = raw.split_once('!').unwrap_or((raw, ""));
        let (user, host) = rest.split_once('@').unwrap_or((rest, ""));
        Hostmask {
            raw: raw.to_string(),
            nick: nick.to_string(),
            user: user.to_string(),
            host: host.to_string(),
        }
    }
}

impl std::fmt::Display for Hostmask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_hostmask() {
        let h = Hostmask::parse("nick!user@host.example.com");
        assert_eq!(h.nick, "nick");
        assert_eq!(h.user, "user");
        assert_eq!(h.host, "host.example.com");
        assert_eq!(h.raw, "nick!user@host.example.com");
    }

    #[test]
    fn test_server_prefix_is_all_nick() {
        let h = Hostmask::parse("irc.example.com");
        assert_eq!(h.nick, "irc.example.com");
        assert_eq!(h.user, "");
        assert_eq!(h.host, "");
    }

    #[test]
    fn test_missing_host() {
        let h = Hostmask::parse("nick!user");
        assert_eq!(h.nick, "nick");
        assert_eq!(h.user, "user");
        assert_eq!(h.host, "");
    }
}
