//! Channel mode-change strings.

use crate::error::ModeParseError;

/// A parsed mode-change string: mode letters either all added or all
/// removed, by the leading `+`/`-` sign. At most one side is non-empty.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ModeChange {
    /// Mode letters switched on (`+`).
    pub added: Vec<char>,
    /// Mode letters switched off (`-`).
    pub removed: Vec<char>,
}

impl ModeChange {
    /// Parse a `+x…` / `-x…` mode string.
    ///
    /// Anything without a leading sign, or with a non-letter mode
    /// character, is rejected with [`ModeParseError::InvalidMode`].
    pub fn parse(input: &str) -> Result<ModeChange, ModeParseError> {
        let invalid = || ModeParseError::InvalidMode(input.to_string());

        let mut chars = input.chars();
        let sign = chars.next().ok_or_else(invalid)?;
        let letters: Vec<char> = chars.collect();
        if !letters.iter().all(|c| c.is_ascii_alphabetic()) {
            return Err(invalid());
        }

        match sign {
            '+' => Ok(ModeChange {
                added: letters,
                removed: Vec::new(),
            }),
            '-' => Ok(ModeChange {
                added: Vec::new(),
                removed: letters,
            }),
            _ => Err(invalid()),
        }
    }

    /// All letters this change touches, with their sign.
    pub fn entries(&self) -> impl Iterator<Item = (char, bool)> + '_ {
        self.added
            .iter()
            .map(|&c| (c, true))
            .chain(self.removed.iter().map(|&c| (c, false)))
    }
}

impl std::fmt::Display for ModeChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if !self.added.is_empty() {
            write!(f, "+{}", self.added.iter().collect::<String>())?;
        }
        if !self.removed.is_empty() {
            write!(f, "-{}", self.removed.iter().collect::<String>())?;
        }
        Ok(())
    }
}
