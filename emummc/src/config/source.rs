//! Key/value configuration source
//!
//! The ini engine itself lives outside this crate. It hands over a list
//! of sections per source file, each with its key/value pairs in file
//! order.

use alloc::string::String;
use alloc::vec::Vec;

/// Kind of section produced by the ini engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    /// Regular `[name]` section with key/value pairs
    Choice,
    /// `{caption}` line
    Caption,
}

/// One parsed section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IniSection {
    /// Section name
    pub name: String,
    /// Section kind
    pub kind: SectionKind,
    /// Key/value pairs in file order
    pub entries: Vec<(String, String)>,
}

impl IniSection {
    /// Create an empty `[name]` section
    pub fn new(name: &str) -> Self {
        Self {
            name: String::from(name),
            kind: SectionKind::Choice,
            entries: Vec::new(),
        }
    }

    /// Create a caption pseudo-section
    pub fn caption(name: &str) -> Self {
        Self {
            kind: SectionKind::Caption,
            ..Self::new(name)
        }
    }

    /// Append a key/value pair
    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.entries.push((String::from(key), String::from(value)));
        self
    }

    /// Iterate over key/value pairs
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Source of parsed configuration files
pub trait IniSource {
    /// Sections of the file `name`, or `None` if it could not be found
    /// or parsed
    fn sections(&self, name: &str) -> Option<&[IniSection]>;
}

/// In-memory configuration source
#[derive(Debug, Clone, Default)]
pub struct MemoryIni {
    files: Vec<(String, Vec<IniSection>)>,
}

impl MemoryIni {
    /// Create an empty source
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parsed file
    pub fn with_file(mut self, name: &str, sections: Vec<IniSection>) -> Self {
        self.files.push((String::from(name), sections));
        self
    }
}

impl IniSource for MemoryIni {
    fn sections(&self, name: &str) -> Option<&[IniSection]> {
        self.files
            .iter()
            .find(|(file, _)| file == name)
            .map(|(_, sections)| sections.as_slice())
    }
}

/// Parse a decimal integer the way C `atoi` does.
///
/// Leading whitespace and a sign are accepted, parsing stops at the first
/// non-digit, and input without digits yields 0.
pub fn parse_dec(value: &str) -> i32 {
    let bytes = value.trim_start().as_bytes();
    let (negative, digits) = match bytes.first() {
        Some(b'-') => (true, &bytes[1..]),
        Some(b'+') => (false, &bytes[1..]),
        _ => (false, bytes),
    };

    let mut result: i32 = 0;
    for &b in digits.iter().take_while(|b| b.is_ascii_digit()) {
        result = result.wrapping_mul(10).wrapping_add((b - b'0') as i32);
    }

    if negative {
        result.wrapping_neg()
    } else {
        result
    }
}

/// Parse a hexadecimal integer the way C `strtol(value, NULL, 16)` does.
///
/// Accepts leading whitespace, a sign and an optional `0x` prefix.
/// Parsing stops at the first non-hex character. Values above `u32::MAX`
/// saturate.
pub fn parse_hex(value: &str) -> u32 {
    let bytes = value.trim_start().as_bytes();
    let (negative, rest) = match bytes.first() {
        Some(b'-') => (true, &bytes[1..]),
        Some(b'+') => (false, &bytes[1..]),
        _ => (false, bytes),
    };
    let digits = match rest {
        [b'0', b'x' | b'X', tail @ ..] if tail.first().is_some_and(u8::is_ascii_hexdigit) => tail,
        _ => rest,
    };

    let mut result: u32 = 0;
    for &b in digits.iter().take_while(|b| b.is_ascii_hexdigit()) {
        let nibble = match b {
            b'0'..=b'9' => b - b'0',
            b'a'..=b'f' => b - b'a' + 10,
            _ => b - b'A' + 10,
        };
        result = result.saturating_mul(16).saturating_add(nibble as u32);
    }

    if negative {
        result.wrapping_neg()
    } else {
        result
    }
}
