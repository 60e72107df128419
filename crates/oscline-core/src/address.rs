//! Address classification and pattern matching
//!
//! OSC addresses look like:
//! ```text
//! /synth/1/freq
//! /avatar/parameters/VelocityX
//! ```
//!
//! Address patterns (for handler registration):
//! - `?` matches any single character except `/`
//! - `*` matches any run of characters except `/`
//! - `[abc]`, `[a-z]`, `[!abc]` match one character from (or outside) a set
//! - `{foo,bar}` matches any of the listed strings
//!
//! Patterns compile to anchored regular expressions.

use crate::{Error, Result};

/// Characters that turn an address into a pattern
const PATTERN_CHARS: &[u8] = b"*?[]{}";

/// What kind of address a string is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressKind {
    /// A literal address, matched byte for byte
    Exact,
    /// Contains wildcard metacharacters
    Pattern,
    /// Not usable as an OSC address
    Invalid,
}

/// Classify an address string
pub fn classify(address: &str) -> AddressKind {
    let bytes = address.as_bytes();
    if bytes.first() != Some(&b'/') {
        return AddressKind::Invalid;
    }

    let mut kind = AddressKind::Exact;
    let mut in_braces = false;
    for &byte in bytes {
        if PATTERN_CHARS.contains(&byte) {
            kind = AddressKind::Pattern;
            match byte {
                b'{' => in_braces = true,
                b'}' => in_braces = false,
                _ => {}
            }
        } else if byte == b',' && in_braces {
            // alternative separator inside {a,b}
        } else if !is_address_char(byte) {
            return AddressKind::Invalid;
        }
    }
    kind
}

/// Check whether a character may appear in a literal address
#[inline]
pub fn is_address_char(byte: u8) -> bool {
    byte.is_ascii_graphic() && !matches!(byte, b'#' | b',' | b'*' | b'?' | b'[' | b']' | b'{' | b'}')
}

/// Check whether a string is a valid literal (non-pattern) address
pub fn is_valid_address(address: &str) -> bool {
    classify(address) == AddressKind::Exact
}

/// A compiled address pattern
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    regex: regex_lite::Regex,
}

impl Pattern {
    /// Compile an OSC address pattern
    pub fn compile(pattern: &str) -> Result<Self> {
        if classify(pattern) == AddressKind::Invalid {
            return Err(Error::InvalidAddress(pattern.to_string()));
        }

        let regex_str = translate(pattern)?;
        let regex = regex_lite::Regex::new(&regex_str)
            .map_err(|e| Error::InvalidPattern(e.to_string()))?;

        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    /// Check if an address matches this pattern
    #[inline]
    pub fn matches(&self, address: &str) -> bool {
        self.regex.is_match(address)
    }

    /// The pattern as registered
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl std::fmt::Display for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.source)
    }
}

/// Translate OSC wildcard syntax into an anchored regex
fn translate(pattern: &str) -> Result<String> {
    let mut out = String::with_capacity(pattern.len() * 2 + 2);
    out.push('^');

    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => out.push_str("[^/]*"),
            '?' => out.push_str("[^/]"),
            '[' => {
                out.push('[');
                if chars.peek() == Some(&'!') {
                    chars.next();
                    out.push('^');
                }
                let mut closed = false;
                for c in chars.by_ref() {
                    match c {
                        ']' => {
                            closed = true;
                            break;
                        }
                        '-' => out.push('-'),
                        '\\' | '[' | '^' | '&' | '~' => {
                            out.push('\\');
                            out.push(c);
                        }
                        _ => out.push(c),
                    }
                }
                if !closed {
                    return Err(Error::InvalidPattern(format!(
                        "unclosed '[' in {}",
                        pattern
                    )));
                }
                out.push(']');
            }
            '{' => {
                let mut alternatives = Vec::new();
                let mut current = String::new();
                let mut closed = false;
                for c in chars.by_ref() {
                    match c {
                        '}' => {
                            closed = true;
                            break;
                        }
                        ',' => alternatives.push(std::mem::take(&mut current)),
                        _ => current.push(c),
                    }
                }
                if !closed {
                    return Err(Error::InvalidPattern(format!(
                        "unclosed '{{' in {}",
                        pattern
                    )));
                }
                alternatives.push(current);

                out.push_str("(?:");
                for (i, alt) in alternatives.iter().enumerate() {
                    if i > 0 {
                        out.push('|');
                    }
                    out.push_str(&regex_lite::escape(alt));
                }
                out.push(')');
            }
            ']' | '}' => {
                return Err(Error::InvalidPattern(format!(
                    "unexpected '{}' in {}",
                    c, pattern
                )));
            }
            _ => {
                let mut buf = [0u8; 4];
                out.push_str(&regex_lite::escape(c.encode_utf8(&mut buf)));
            }
        }
    }

    out.push('$');
    Ok(out)
}
