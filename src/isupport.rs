//! ISUPPORT (RPL_ISUPPORT, numeric 005) tracking.
//!
//! Servers advertise their capabilities as `KEY` / `KEY=VALUE` tokens
//! spread over several 005 lines. [`Isupport`] accumulates them for the
//! lifetime of a connection.

use std::collections::HashMap;

/// Accumulated ISUPPORT tokens for one connection.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Isupport {
    entries: HashMap<String, Option<String>>,
}

impl Isupport {
    /// Merge the tokens of one 005 line.
    ///
    /// `params` are the numeric's parameters with the leading client
    /// nickname already removed; the trailing ("are supported by this
    /// server") must not be included.
    pub fn merge_params<S: AsRef<str>>(&mut self, params: &[S]) {
        for p in params {
            let p = p.as_ref();
            if p.is_empty() {
                continue;
            }
            let (key, value) = match p.find('=') {
                Some(eq) => (&p[..eq], Some(p[eq + 1..].to_string())),
                None => (p, None),
            };
            self.entries.insert(key.to_string(), value);
        }
    }

    /// Look up a key. `Some(None)` means the key was advertised bare.
    pub fn get(&self, key: &str) -> Option<Option<&str>> {
        self.entries.get(key).map(|v| v.as_deref())
    }

    /// Number of accumulated tokens.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether anything has been advertised yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot of the full map.
    pub fn to_map(&self) -> HashMap<String, Option<String>> {
        self.entries.clone()
    }

    /// The PREFIX mapping from mode letters to nickname sigils.
    pub fn prefix(&self) -> PrefixMap {
        self.get("PREFIX")
            .flatten()
            .map(PrefixMap::parse)
            .unwrap_or_default()
    }

    /// Maximum topic length, when the server advertises TOPICLEN.
    pub fn topic_len(&self) -> Option<usize> {
        self.get("TOPICLEN").flatten().and_then(|s| s.parse().ok())
    }

    /// Channel name prefixes, when the server advertises CHANTYPES.
    pub fn chantypes(&self) -> Option<&str> {
        self.get("CHANTYPES").flatten()
    }

    /// Network name, when advertised.
    pub fn network(&self) -> Option<&str> {
        self.get("NETWORK").flatten()
    }

    /// Reset for a fresh connection.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// The PREFIX mapping: mode letters paired with nickname prefix sigils.
///
/// Parsed from the `(modes)prefixes` form, e.g. `(ov)@+`. Modes and
/// sigils pair by index. Absent or unparseable input yields an empty map.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PrefixMap {
    pairs: Vec<(char, char)>,
}

impl PrefixMap {
    /// Parse a PREFIX value.
    pub fn parse(s: &str) -> PrefixMap {
        let Some(rest) = s.strip_prefix('(') else {
            return PrefixMap::default();
        };
        let Some((modes, prefixes)) = rest.split_once(')') else {
            return PrefixMap::default();
        };
        PrefixMap {
            pairs: modes.chars().zip(prefixes.chars()).collect(),
        }
    }

    /// The sigil for a mode letter, e.g. `o` → `@`.
    pub fn sigil(&self, mode: char) -> Option<char> {
        self.pairs.iter().find(|(m, _)| *m == mode).map(|(_, s)| *s)
    }

    /// The mode letter for a sigil, e.g. `@` → `o`.
    pub fn mode(&self, sigil: char) -> Option<char> {
        self.pairs.iter().find(|(_, s)| *s == sigil).map(|(m, _)| *m)
    }

    /// Whether a mode letter grants a nickname prefix.
    pub fn is_membership_mode(&self, mode: char) -> bool {
        self.sigil(mode).is_some()
    }

    /// Iterate over `(mode, sigil)` pairs in advertised order.
    pub fn iter(&self) -> impl Iterator<Item = (char, char)> + '_ {
        self.pairs.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_key_value_tokens() {
        let mut isupport = Isupport::default();
        isupport.merge_params(&["CHANTYPES=#", "EXCEPTS", "TOPICLEN=307"]);

        assert_eq!(isupport.get("CHANTYPES"), Some(Some("#")));
        assert_eq!(isupport.get("EXCEPTS"), Some(None));
        assert_eq!(isupport.topic_len(), Some(307));
        assert_eq!(isupport.get("MISSING"), None);
    }

    #[test]
    fn test_merge_across_lines() {
        let mut isupport = Isupport::default();
        isupport.merge_params(&["NICKLEN=30"]);
        isupport.merge_params(&["NICKLEN=16", "NETWORK=ExampleNet"]);

        // Later advertisements win
        assert_eq!(isupport.get("NICKLEN"), Some(Some("16")));
        assert_eq!(isupport.network(), Some("ExampleNet"));
    }

    #[test]
    fn test_prefix_map_pairing() {
        let map = PrefixMap::parse("(qohv)~@%+");
        assert_eq!(map.sigil('o'), Some('@'));
        assert_eq!(map.sigil('q'), Some('~'));
        assert_eq!(map.mode('+'), Some('v'));
        assert_eq!(map.mode('%'), Some('h'));
        assert!(map.is_membership_mode('h'));
        assert!(!map.is_membership_mode('b'));
    }

    #[test]
    fn test_prefix_map_malformed_is_empty() {
        assert_eq!(PrefixMap::parse("ov@+"), PrefixMap::default());
        assert_eq!(PrefixMap::parse("(ov"), PrefixMap::default());
        assert_eq!(PrefixMap::parse(""), PrefixMap::default());
    }

    #[test]
    fn test_prefix_from_isupport() {
        let mut isupport = Isupport::default();
        isupport.merge_params(&["PREFIX=(ov)@+"]);
        let map = isupport.prefix();
        assert_eq!(map.sigil('v'), Some('+'));
        assert_eq!(map.mode('@'), Some('o'));
    }
}
