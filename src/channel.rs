//! Channel membership state.
//!
//! A [`Channel`] tracks the topic, the ban list, and five disjoint role
//! sets. Every mutation goes through [`Channel::insert`] /
//! [`Channel::remove`] / [`Channel::rename`], which uphold the invariant
//! that a nickname lives in at most one role set at a time.

use std::collections::{BTreeSet, HashSet};

/// A per-channel membership bucket.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    /// `~` / mode `q`.
    Owner,
    /// `@` / mode `o`.
    Op,
    /// `%` / mode `h`.
    HalfOp,
    /// `+` / mode `v`.
    Voice,
    /// No prefix.
    Member,
}

impl Role {
    /// The role granted by a membership mode letter.
    pub fn from_mode(mode: char) -> Option<Role> {
        match mode {
            'q' => Some(Role::Owner),
            'o' => Some(Role::Op),
            'h' => Some(Role::HalfOp),
            'v' => Some(Role::Voice),
            _ => None,
        }
    }

    /// The role indicated by a NAMES/WHOIS nickname sigil.
    pub fn from_sigil(sigil: char) -> Option<Role> {
        match sigil {
            '~' => Some(Role::Owner),
            '@' => Some(Role::Op),
            '%' => Some(Role::HalfOp),
            '+' => Some(Role::Voice),
            _ => None,
        }
    }
}

/// State of one channel we are in.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Channel {
    name: String,
    topic: Option<String>,
    owners: HashSet<String>,
    ops: HashSet<String>,
    halfops: HashSet<String>,
    voices: HashSet<String>,
    members: HashSet<String>,
    bans: BTreeSet<String>,
}

impl Channel {
    /// Create an empty channel record.
    pub fn new(name: impl Into<String>) -> Channel {
        Channel {
            name: name.into(),
            ..Channel::default()
        }
    }

    /// The channel name, including its `#`/`&`/`+`/`!` prefix.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The current topic, if one is known.
    pub fn topic(&self) -> Option<&str> {
        self.topic.as_deref()
    }

    pub(crate) fn set_topic(&mut self, topic: impl Into<String>) {
        self.topic = Some(topic.into());
    }

    fn set_mut(&mut self, role: Role) -> &mut HashSet<String> {
        match role {
            Role::Owner => &mut self.owners,
            Role::Op => &mut self.ops,
            Role::HalfOp => &mut self.halfops,
            Role::Voice => &mut self.voices,
            Role::Member => &mut self.members,
        }
    }

    fn set_of(&self, role: Role) -> &HashSet<String> {
        match role {
            Role::Owner => &self.owners,
            Role::Op => &self.ops,
            Role::HalfOp => &self.halfops,
            Role::Voice => &self.voices,
            Role::Member => &self.members,
        }
    }

    const ALL_ROLES: [Role; 5] = [
        Role::Owner,
        Role::Op,
        Role::HalfOp,
        Role::Voice,
        Role::Member,
    ];

    /// Put `nick` into exactly `role`, removing it from every other set.
    pub fn insert(&mut self, nick: &str, role: Role) {
        self.remove(nick);
        self.set_mut(role).insert(nick.to_string());
    }

    /// Remove `nick` from every role set. Returns whether it was present.
    pub fn remove(&mut self, nick: &str) -> bool {
        let mut removed = false;
        for role in Self::ALL_ROLES {
            removed |= self.set_mut(role).remove(nick);
        }
        removed
    }

    /// The role `nick` currently holds, if it is in the channel.
    pub fn role_of(&self, nick: &str) -> Option<Role> {
        Self::ALL_ROLES
            .into_iter()
            .find(|&role| self.set_of(role).contains(nick))
    }

    /// Whether `nick` is in the channel under any role.
    pub fn contains(&self, nick: &str) -> bool {
        self.role_of(nick).is_some()
    }

    /// Move `old` to `new`, keeping its role. No-op when `old` is absent.
    pub fn rename(&mut self, old: &str, new: &str) {
        if let Some(role) = self.role_of(old) {
            self.remove(old);
            self.set_mut(role).insert(new.to_string());
        }
    }

    /// Nicknames holding `role`.
    pub fn users(&self, role: Role) -> &HashSet<String> {
        self.set_of(role)
    }

    /// All nicknames in the channel, across roles.
    pub fn all_users(&self) -> impl Iterator<Item = &str> {
        Self::ALL_ROLES
            .into_iter()
            .flat_map(|role| self.set_of(role).iter().map(String::as_str))
    }

    /// The ban list as glob hostmasks, in sorted order.
    pub fn bans(&self) -> impl Iterator<Item = &str> {
        self.bans.iter().map(String::as_str)
    }

    pub(crate) fn add_ban(&mut self, mask: impl Into<String>) {
        self.bans.insert(mask.into());
    }

    pub(crate) fn clear_bans(&mut self) {
        self.bans.clear();
    }
}
