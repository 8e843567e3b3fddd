// SPDX-License-Identifier: AGPL-3.0-or-later
//! Simple `*`/`?` name masks for directory listings

use regex::{Regex, RegexBuilder};

use crate::error::{StorageError, StorageResult};

/// A file-name mask, matched against the whole name, ignoring case
#[derive(Debug, Clone)]
pub struct NameMask {
    pattern: String,
    regex: Regex,
}

impl NameMask {
    pub fn new(pattern: &str) -> StorageResult<Self> {
        let mut translated = String::with_capacity(pattern.len() + 8);
        translated.push('^');
        for c in pattern.chars() {
            match c {
                '*' => translated.push_str(".*"),
                '?' => translated.push('.'),
                other => translated.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
            }
        }
        translated.push('$');

        let regex = RegexBuilder::new(&translated)
            .case_insensitive(true)
            .dot_matches_new_line(true)
            .build()
            .map_err(|e| StorageError::InvalidArgument(format!("bad pattern '{pattern}': {e}")))?;

        Ok(Self { pattern: pattern.to_string(), regex })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn is_match(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }
}
