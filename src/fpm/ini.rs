//! Minimal ini document model and the php-fpm config renderer.
//!
//! php-fpm reads its configuration from an ini file. [`fpm_document`] builds
//! the two-section document the supervisor needs (global daemon settings plus
//! one `dynamic` pool); [`IniDocument::save_to`] persists it.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use tracing::debug;

use crate::{AppError, Result};

/// Name of the single pool section.
pub const POOL_NAME: &str = "www";

/// Process manager mode for the pool.
pub const PM_MODE: &str = "dynamic";
/// `pm.max_children`.
pub const PM_MAX_CHILDREN: u32 = 5;
/// `pm.start_servers`.
pub const PM_START_SERVERS: u32 = 2;
/// `pm.min_spare_servers`.
pub const PM_MIN_SPARE_SERVERS: u32 = 1;
/// `pm.max_spare_servers`.
pub const PM_MAX_SPARE_SERVERS: u32 = 3;

/// One `[name]` block with its keys in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IniSection {
    name: String,
    entries: Vec<(String, String)>,
}

impl IniSection {
    /// Create an empty section.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    /// Section name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Append a key. Duplicate keys are kept and rendered in order.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.entries.push((key.into(), value.into()));
        self
    }

    /// Value of the first entry named `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Entries in insertion order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the section has no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Ordered collection of ini sections.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IniDocument {
    sections: Vec<IniSection>,
}

impl IniDocument {
    /// Create an empty document.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a section and return a handle to fill it.
    pub fn add_section(&mut self, name: impl Into<String>) -> &mut IniSection {
        self.sections.push(IniSection::new(name));
        let last = self.sections.len() - 1;
        &mut self.sections[last]
    }

    /// First section named `name`.
    #[must_use]
    pub fn section(&self, name: &str) -> Option<&IniSection> {
        self.sections.iter().find(|s| s.name == name)
    }

    /// All sections in order.
    #[must_use]
    pub fn sections(&self) -> &[IniSection] {
        &self.sections
    }

    /// Render to ini text: `[name]` headers, `key = value` lines, and a blank
    /// line between sections.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (idx, section) in self.sections.iter().enumerate() {
            if idx > 0 {
                out.push('\n');
            }
            // Writing to a String cannot fail.
            let _ = writeln!(out, "[{}]", section.name);
            for (key, value) in section.entries() {
                let _ = writeln!(out, "{key} = {}", quote_value(value));
            }
        }
        out
    }

    /// Write the rendered document to `path`, creating its parent directory.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Io` if the directory or file cannot be written.
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| {
                AppError::Io(format!(
                    "failed to create config dir {}: {err}",
                    parent.display()
                ))
            })?;
        }

        fs::write(path, self.render()).map_err(|err| {
            AppError::Io(format!("failed to write config {}: {err}", path.display()))
        })?;

        debug!(path = %path.display(), sections = self.sections.len(), "ini document saved");
        Ok(())
    }
}

/// Build the php-fpm document: `[global]` with the pid and error-log paths,
/// and one `dynamic` pool listening on `listen` with fixed tuning.
#[must_use]
pub fn fpm_document(pid_file: &str, error_log: &str, listen: &str) -> IniDocument {
    let mut doc = IniDocument::new();

    doc.add_section("global")
        .insert("pid", pid_file)
        .insert("error_log", error_log);

    doc.add_section(POOL_NAME)
        .insert("listen", listen)
        .insert("pm", PM_MODE)
        .insert("pm.max_children", PM_MAX_CHILDREN.to_string())
        .insert("pm.start_servers", PM_START_SERVERS.to_string())
        .insert("pm.min_spare_servers", PM_MIN_SPARE_SERVERS.to_string())
        .insert("pm.max_spare_servers", PM_MAX_SPARE_SERVERS.to_string());

    doc
}

/// Characters the ini parser treats as comments, operators, or quoting in an
/// unquoted value.
const INI_SPECIAL_CHARS: [char; 13] = [
    ';', '#', '$', '(', ')', '!', '&', '|', '^', '~', '\'', '"', '=',
];

/// Quote values the ini parser would otherwise truncate, trim, or reject.
fn quote_value(value: &str) -> String {
    let needs_quotes = value.contains(INI_SPECIAL_CHARS)
        || value.starts_with(char::is_whitespace)
        || value.ends_with(char::is_whitespace);

    if needs_quotes {
        format!("\"{}\"", value.replace('"', "\\\""))
    } else {
        value.to_owned()
    }
}
