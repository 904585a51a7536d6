//! IRCv3 tag value escaping.
//!
//! Tag values travel inside the space-delimited tag block at the front
//! of a line, so `;`, spaces, backslashes, and line terminators are
//! carried as two-byte escape sequences on the wire.

use std::borrow::Cow;

/// The wire escape for a tag-value character, if it needs one.
fn escape_of(c: char) -> Option<&'static str> {
    match c {
        ';' => Some("\\:"),
        ' ' => Some("\\s"),
        '\\' => Some("\\\\"),
        '\r' => Some("\\r"),
        '\n' => Some("\\n"),
        _ => None,
    }
}

/// Escape a tag value for serialization.
///
/// Values without reserved characters are passed through unchanged.
pub fn escape_tag_value(value: &str) -> Cow<'_, str> {
    if !value.contains([';', ' ', '\\', '\r', '\n']) {
        return Cow::Borrowed(value);
    }
    let mut out = String::with_capacity(value.len() + 4);
    for c in value.chars() {
        match escape_of(c) {
            Some(seq) => out.push_str(seq),
            None => out.push(c),
        }
    }
    Cow::Owned(out)
}

/// Undo [`escape_tag_value`] on a wire value.
///
/// A lone trailing backslash is dropped, and an unknown escape yields
/// the escaped character itself, per the message-tags spec.
pub(crate) fn unescape_tag_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some(':') => out.push(';'),
            Some('s') => out.push(' '),
            Some('r') => out.push('\r'),
            Some('n') => out.push('\n'),
            // `\\` and unknown escapes both resolve to the escaped char
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}
