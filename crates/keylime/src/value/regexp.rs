use std::fmt;

use regex::Regex;

use crate::error::{KeylimeError, Result};

/// Flags accepted on a regex literal. Only `i`, `m` and `s` change matching;
/// the rest are carried so a copy reports the same flags as its source.
const KNOWN_FLAGS: &str = "dgimsuvy";

/// A compiled regular expression together with its literal source, flags and
/// the `last_index` cursor used by stateful (`g`/`y`) matching.
#[derive(Debug, Clone)]
pub struct RegexValue {
    source: String,
    flags: String,
    regex: Regex,
    pub last_index: usize,
}

impl RegexValue {
    pub fn new(source: &str, flags: &str) -> Result<Self> {
        let mut inline = String::new();
        for (i, flag) in flags.char_indices() {
            if !KNOWN_FLAGS.contains(flag) {
                return Err(KeylimeError::Validation(format!(
                    "unknown regex flag '{}' in /{}/{}",
                    flag, source, flags
                )));
            }
            if flags[..i].contains(flag) {
                return Err(KeylimeError::Validation(format!(
                    "duplicate regex flag '{}' in /{}/{}",
                    flag, source, flags
                )));
            }
            if matches!(flag, 'i' | 'm' | 's') {
                inline.push(flag);
            }
        }

        let pattern = if inline.is_empty() {
            source.to_string()
        } else {
            format!("(?{}){}", inline, source)
        };
        let regex = Regex::new(&pattern).map_err(|e| {
            KeylimeError::Validation(format!("invalid regex /{}/{}: {}", source, flags, e))
        })?;

        Ok(Self {
            source: source.to_string(),
            flags: flags.to_string(),
            regex,
            last_index: 0,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn flags(&self) -> &str {
        &self.flags
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

impl PartialEq for RegexValue {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
            && self.flags == other.flags
            && self.last_index == other.last_index
    }
}

impl fmt::Display for RegexValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/{}", self.source, self.flags)
    }
}
