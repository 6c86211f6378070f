//! Key-value property source
//!
//! The selection run is configured through a `.properties` style file:
//!
//! ```text
//! # where the list of wanted names lives
//! select_file_list = /data/select.txt
//! file_location = /data/audio
//! destination_file_name: /data/selected
//! ```
//!
//! Lines starting with `#` or `!` are comments, blank lines are ignored, and the first `=` or `:`
//! separates a key from its value. Whitespace around keys and values is trimmed. A later
//! definition of the same key replaces an earlier one.

use anyhow::Context;
use std::collections::HashMap;
use std::path::Path;

/// Anything that can answer `get_property(key)`.
pub trait PropertySource {
    fn get_property(&self, key: &str) -> Option<&str>;
}

/// Properties loaded from a file or a string.
#[derive(Debug, Clone, Default)]
pub struct Properties {
    values: HashMap<String, String>,
}

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read and parse a properties file.
    pub fn from_file(path: &Path) -> Result<Self, anyhow::Error> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read properties file: {:?}", path))?;
        Ok(Self::parse_content(&content))
    }

    /// Parse properties from a string (properties file format)
    pub fn parse_content(content: &str) -> Self {
        let mut properties = Self::new();
        for line in content.lines() {
            let line = line.trim();
            // skip empty lines and comments
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }
            let (key, value) = match line.find(['=', ':']) {
                Some(pos) => (&line[..pos], &line[pos + 1..]),
                // a bare key is defined with an empty value
                None => (line, ""),
            };
            properties.set(key.trim(), value.trim());
        }
        properties
    }

    pub fn set(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl PropertySource for Properties {
    fn get_property(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }
}
