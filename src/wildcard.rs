//! ANT-style wildcard patterns compiled to regular expressions.
//!
//! - `*` matches zero or more characters, never the directory separator
//! - `?` matches exactly one character, never the directory separator
//! - `**` matches anything; `**/` matches zero or more whole directories
//! - `/` and `\` in the pattern both stand for the directory separator
//!
//! The directory separator is chosen per pattern. Resource keys use `.`.

use regex::Regex;

use crate::error::{CoverageError, Result};

#[derive(Debug, Clone)]
pub struct WildcardPattern {
    pattern: String,
    regex: Regex,
}

impl WildcardPattern {
    /// Compile `pattern` with `separator` as the directory separator.
    /// A trailing `/` is shorthand for `/**`.
    pub fn compile(pattern: &str, separator: char) -> Result<Self> {
        let mut pattern = pattern.trim().to_string();
        if pattern.ends_with('/') || pattern.ends_with('\\') {
            pattern.push_str("**");
        }
        let regex = Regex::new(&to_regex(&pattern, separator)).map_err(|e| {
            CoverageError::Config(format!("invalid pattern '{pattern}': {e}"))
        })?;
        Ok(Self { pattern, regex })
    }

    pub fn matches(&self, value: &str) -> bool {
        self.regex.is_match(value)
    }

    pub fn as_str(&self) -> &str {
        &self.pattern
    }
}

fn is_slash(ch: char) -> bool {
    ch == '/' || ch == '\\'
}

fn to_regex(pattern: &str, separator: char) -> String {
    let sep = regex::escape(&separator.to_string());
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len() * 2);
    out.push('^');

    let mut i = usize::from(chars.first().is_some_and(|&c| is_slash(c)));
    while i < chars.len() {
        let ch = chars[i];
        match ch {
            '*' if chars.get(i + 1) == Some(&'*') => {
                if chars.get(i + 2).is_some_and(|&c| is_slash(c)) {
                    out.push_str(&format!("(?:.*{sep}|)"));
                    i += 2;
                } else {
                    out.push_str(".*");
                    i += 1;
                }
            }
            '*' => out.push_str(&format!("[^{sep}]*?")),
            '?' => out.push_str(&format!("[^{sep}]")),
            c if is_slash(c) => out.push_str(&sep),
            c => out.push_str(&regex::escape(&c.to_string())),
        }
        i += 1;
    }

    out.push('$');
    out
}
