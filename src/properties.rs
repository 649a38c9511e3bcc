//! Line-oriented `key=value` property files.
//!
//! The format follows the usual text-properties convention: `#` and `!`
//! start comment lines, a backslash at the end of a line continues the
//! logical line, keys are separated from values by `=`, `:` or whitespace,
//! and `\t`, `\n`, `\r`, `\f`, `\\` and `\uXXXX` escapes are honored.
//! Files are read and written as UTF-8 with `\n` terminators; saving
//! writes the keys sorted and never emits a timestamp comment.

use crate::error::Result;
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// A bridge between string maps and properties files.
pub struct PropertiesFile {
    path: PathBuf,
    required: bool,
}

impl PropertiesFile {
    /// Creates an accessor that returns an empty result rather than failing
    /// when the file is missing.
    pub fn optional(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            required: false,
        }
    }

    /// Creates an accessor that fails when the file is missing.
    pub fn required(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            required: true,
        }
    }

    /// Returns `true` if the file exists.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Returns the path to the file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the file and returns the data.
    pub fn load(&self) -> Result<BTreeMap<String, String>> {
        let mut result = BTreeMap::new();
        self.merge_into(&mut result)?;
        Ok(result)
    }

    /// Loads the file and updates entries of the given map with the entries
    /// from the file. A missing optional file performs no change.
    pub fn merge_into(&self, result: &mut BTreeMap<String, String>) -> Result<()> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound && !self.required => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        for (key, value) in parse(&text) {
            result.insert(key, value);
        }

        Ok(())
    }

    /// Loads the file and fills only the entries missing from the given map,
    /// keeping values that are already present.
    pub fn restore_into(&self, result: &mut BTreeMap<String, String>) -> Result<()> {
        let mut loaded = BTreeMap::new();
        self.merge_into(&mut loaded)?;

        for (key, value) in loaded {
            result.entry(key).or_insert(value);
        }

        Ok(())
    }

    /// Saves the data to the file.
    pub fn save(&self, data: &BTreeMap<String, String>) -> Result<()> {
        save(data, &self.path)
    }
}

/// Saves the data to the given file with sorted keys.
pub fn save(data: &BTreeMap<String, String>, path: &Path) -> Result<()> {
    fs::write(path, format(data))?;
    Ok(())
}

/// Formats the data in the properties file syntax with sorted keys.
pub fn format(data: &BTreeMap<String, String>) -> String {
    let mut result = String::new();

    for (key, value) in data {
        escape_into(&mut result, key, true);
        result.push('=');
        escape_into(&mut result, value, false);
        result.push('\n');
    }

    result
}

/// Parses the properties file syntax into key/value pairs.
pub fn parse(text: &str) -> Vec<(String, String)> {
    let mut result = Vec::new();
    let mut lines = text.lines();

    while let Some(line) = lines.next() {
        let line = line.trim_start();
        if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
            continue;
        }

        let mut logical = String::from(line);
        while ends_with_odd_backslashes(&logical) {
            logical.pop();
            match lines.next() {
                Some(next) => logical.push_str(next.trim_start()),
                None => break,
            }
        }

        result.push(split_entry(&logical));
    }

    result
}

fn ends_with_odd_backslashes(line: &str) -> bool {
    let trailing = line.chars().rev().take_while(|c| *c == '\\').count();
    trailing % 2 == 1
}

/// Splits a logical line into the unescaped key and value.
fn split_entry(line: &str) -> (String, String) {
    let mut key = String::new();
    let mut chars = line.char_indices();
    let mut value_from = line.len();

    while let Some((at, c)) = chars.next() {
        match c {
            '\\' => {
                if let Some((_, escaped)) = chars.next() {
                    key.push(unescaped(escaped, &mut chars));
                }
            }
            '=' | ':' => {
                value_from = at + c.len_utf8();
                break;
            }
            c if c.is_whitespace() => {
                // Whitespace separates too, but may just pad `=` or `:`
                let rest = line[at..].trim_start();
                value_from = line.len() - rest.len();
                if let Some(separator) = rest.chars().next()
                    && (separator == '=' || separator == ':')
                {
                    value_from += separator.len_utf8();
                }
                break;
            }
            c => key.push(c),
        }
    }

    let mut value = String::new();
    let mut chars = line[value_from..].trim_start().char_indices();
    while let Some((_, c)) = chars.next() {
        if c == '\\' {
            if let Some((_, escaped)) = chars.next() {
                value.push(unescaped(escaped, &mut chars));
            }
        } else {
            value.push(c);
        }
    }

    (key, value)
}

fn unescaped(c: char, chars: &mut std::str::CharIndices<'_>) -> char {
    match c {
        't' => '\t',
        'n' => '\n',
        'r' => '\r',
        'f' => '\u{000C}',
        'u' => {
            let mut code = 0u32;
            for _ in 0..4 {
                match chars.next().and_then(|(_, d)| d.to_digit(16)) {
                    Some(digit) => code = code * 16 + digit,
                    None => return '\u{FFFD}',
                }
            }
            char::from_u32(code).unwrap_or('\u{FFFD}')
        }
        c => c,
    }
}

fn escape_into(result: &mut String, text: &str, key: bool) {
    for (at, c) in text.char_indices() {
        match c {
            '\\' => result.push_str("\\\\"),
            '\t' => result.push_str("\\t"),
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\u{000C}' => result.push_str("\\f"),
            '=' | ':' | '#' | '!' if key => {
                result.push('\\');
                result.push(c);
            }
            ' ' if key || at == 0 => result.push_str("\\ "),
            c => result.push(c),
        }
    }
}
