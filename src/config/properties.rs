use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;

/// Contents of a Java `.properties` file
///
/// This covers the parts of the format that show up in practice: `key=value`, `key: value`, and
/// `key value` pairs, `#` and `!` comments, lines continued with a trailing backslash, and the
/// usual backslash escapes (including `\uXXXX`). When a key repeats, the last value wins.
///
/// [0]: https://docs.oracle.com/javase/8/docs/api/java/util/Properties.html#load-java.io.Reader-
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Properties {
    entries: HashMap<String, String>,
}

impl Properties {
    pub fn new() -> Properties {
        Properties::default()
    }

    /// Read properties from a file
    pub fn load<P: AsRef<Path>>(path: P) -> io::Result<Properties> {
        Ok(Properties::parse(&fs::read_to_string(path)?))
    }

    pub fn parse(source: &str) -> Properties {
        let mut entries = HashMap::new();
        let mut lines = source.lines();
        while let Some(line) = lines.next() {
            let line = line.trim_start();
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }

            // Glue continued lines together, dropping leading whitespace on the continuations
            let mut logical = String::from(line);
            while ends_with_continuation(&logical) {
                logical.pop();
                match lines.next() {
                    Some(next) => logical.push_str(next.trim_start()),
                    None => break,
                }
            }

            let (key, value) = split_key_value(&logical);
            entries.insert(unescape(key), unescape(value));
        }
        Properties { entries }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Same rules as `Boolean.parseBoolean`: only `true` (ignoring case) is true
    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.get(key) {
            Some(value) => value.trim().eq_ignore_ascii_case("true"),
            None => default,
        }
    }

    /// Comma separated list, with entries trimmed and empty entries dropped
    pub fn get_list(&self, key: &str) -> Option<Vec<String>> {
        self.get(key).map(split_list)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Split a comma-separated list, trimming entries and dropping empty ones
pub fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(String::from)
        .collect()
}

/// A line is continued when it ends in an odd number of backslashes
fn ends_with_continuation(line: &str) -> bool {
    line.chars().rev().take_while(|c| *c == '\\').count() % 2 == 1
}

/// Split on the first unescaped `=`, `:`, or whitespace (whitespace around the separator is
/// skipped)
fn split_key_value(line: &str) -> (&str, &str) {
    let mut escaped = false;
    let mut key_end = line.len();
    for (idx, c) in line.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == '=' || c == ':' || c.is_whitespace() {
            key_end = idx;
            break;
        }
    }

    let key = &line[..key_end];
    let mut rest = line[key_end..].trim_start();
    if let Some(stripped) = rest.strip_prefix(|c| c == '=' || c == ':') {
        rest = stripped.trim_start();
    }
    (key, rest)
}

fn unescape(escaped: &str) -> String {
    let mut unescaped = String::with_capacity(escaped.len());
    let mut chars = escaped.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            unescaped.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => unescaped.push('\t'),
            Some('n') => unescaped.push('\n'),
            Some('r') => unescaped.push('\r'),
            Some('f') => unescaped.push('\u{000C}'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) => unescaped.push(decoded),
                    None => {
                        unescaped.push_str("\\u");
                        unescaped.push_str(&hex);
                    }
                }
            }
            Some(other) => unescaped.push(other),
            None => (),
        }
    }
    unescaped
}
