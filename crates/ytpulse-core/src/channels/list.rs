use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use super::reference::{parse_reference, EntityReference};

/// The tracked-channel list file: one reference per line.
///
/// Blank lines and `#` comments are dropped on load and not written back.
#[derive(Debug, Clone)]
pub struct ChannelList {
    path: PathBuf,
    entries: Vec<String>,
}

impl ChannelList {
    /// Load the list from disk. A missing file is an empty list.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = if path.exists() {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read channel list: {:?}", path))?;
            parse_entries(&content)
        } else {
            Vec::new()
        };
        Ok(Self { path, entries })
    }

    /// Raw entries, in file order
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parsed references; entries that parse to nothing are skipped
    pub fn references(&self) -> Vec<EntityReference> {
        self.entries
            .iter()
            .filter_map(|e| parse_reference(e))
            .collect()
    }

    /// Append an entry unless it is already present. Returns whether it was added.
    pub fn add(&mut self, entry: &str) -> bool {
        let entry = entry.trim();
        if entry.is_empty() || self.entries.iter().any(|e| e == entry) {
            return false;
        }
        self.entries.push(entry.to_string());
        true
    }

    /// Remove an entry if present. Returns whether it was removed.
    pub fn remove(&mut self, entry: &str) -> bool {
        let entry = entry.trim();
        let before = self.entries.len();
        self.entries.retain(|e| e != entry);
        self.entries.len() != before
    }

    /// Rewrite the file with the current entries
    pub fn save(&self) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("Failed to create directory: {:?}", dir))?;
            }
        }
        let mut content = String::new();
        for entry in &self.entries {
            content.push_str(entry);
            content.push('\n');
        }
        std::fs::write(&self.path, content)
            .with_context(|| format!("Failed to write channel list: {:?}", self.path))
    }
}

fn parse_entries(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect()
}
