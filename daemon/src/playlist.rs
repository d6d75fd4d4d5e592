use anyhow::{Context, Result};
use common::{PlaylistEntry, PlaylistItemInfo, SourceVariant};
use std::path::{Path, PathBuf};

use crate::classifier;

/// Source of playlist entries.
///
/// Loading is the only I/O the player does on its own; everything else is
/// driven by events.
pub trait PlaylistLoader: Send {
    fn load(&self) -> Result<Vec<PlaylistEntry>>;

    /// Human readable description of where entries come from
    fn describe(&self) -> String;
}

/// Loads the playlist from a JSON file holding an array of entries
#[derive(Debug, Clone)]
pub struct JsonFileLoader {
    path: PathBuf,
}

impl JsonFileLoader {
    pub fn new(path: impl AsRef<str>) -> Self {
        let expanded = shellexpand::tilde(path.as_ref());
        Self {
            path: PathBuf::from(expanded.as_ref()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PlaylistLoader for JsonFileLoader {
    fn load(&self) -> Result<Vec<PlaylistEntry>> {
        let contents = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read playlist: {}", self.path.display()))?;

        let entries: Vec<PlaylistEntry> = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse playlist: {}", self.path.display()))?;

        Ok(entries)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Ordered playlist plus the active index.
///
/// The entry list is only ever replaced wholesale.
#[derive(Debug, Clone, Default)]
pub struct PlaylistStore {
    /// Entries paired with their classified variant
    entries: Vec<(PlaylistEntry, SourceVariant)>,

    /// Index of the active entry (None while the playlist is empty)
    active: Option<usize>,
}

impl PlaylistStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load entries through `loader`. Any failure yields an empty list.
    pub fn load(loader: &dyn PlaylistLoader) -> Vec<PlaylistEntry> {
        match loader.load() {
            Ok(entries) => {
                log::info!(
                    "Loaded playlist with {} entries from {}",
                    entries.len(),
                    loader.describe()
                );
                entries
            }
            Err(e) => {
                log::warn!("Playlist load failed: {:#}. Using an empty playlist.", e);
                Vec::new()
            }
        }
    }

    /// Replace the whole list. The active index moves to the first entry.
    pub fn replace(&mut self, entries: Vec<PlaylistEntry>) {
        self.entries = entries
            .into_iter()
            .map(|entry| {
                let variant = classifier::classify(&entry.url);
                if !declared_matches(&entry, variant) {
                    log::debug!(
                        "Entry '{}' declares type '{}' but classifies as {}",
                        entry.display_name,
                        entry.declared_type.label(),
                        variant.name()
                    );
                }
                (entry, variant)
            })
            .collect();
        self.active = if self.entries.is_empty() { None } else { Some(0) };
    }

    /// Make `index` active. Out-of-range indices are ignored.
    ///
    /// Returns true when the index was accepted (re-selecting the active entry
    /// counts).
    pub fn select(&mut self, index: usize) -> bool {
        if index >= self.entries.len() {
            log::debug!(
                "Ignoring out-of-range selection {} (playlist has {} entries)",
                index,
                self.entries.len()
            );
            return false;
        }
        self.active = Some(index);
        true
    }

    /// The active entry, if any
    pub fn current(&self) -> Option<&PlaylistEntry> {
        self.active
            .and_then(|i| self.entries.get(i))
            .map(|(entry, _)| entry)
    }

    /// Classified variant of the active entry
    pub fn current_variant(&self) -> Option<SourceVariant> {
        self.active
            .and_then(|i| self.entries.get(i))
            .map(|(_, variant)| *variant)
    }

    pub fn active_index(&self) -> Option<usize> {
        self.active
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Selector view of the playlist
    pub fn items(&self) -> Vec<PlaylistItemInfo> {
        self.entries
            .iter()
            .enumerate()
            .map(|(index, (entry, variant))| PlaylistItemInfo {
                index,
                name: entry.display_name.clone(),
                url: entry.url.clone(),
                declared_type: entry.declared_type.clone(),
                variant: *variant,
                active: self.active == Some(index),
            })
            .collect()
    }
}

fn declared_matches(entry: &PlaylistEntry, variant: SourceVariant) -> bool {
    use common::DeclaredType;
    matches!(
        (&entry.declared_type, variant),
        (DeclaredType::EmbedA, SourceVariant::ExternalEmbedA)
            | (DeclaredType::EmbedB, SourceVariant::ExternalEmbedB)
            | (DeclaredType::Standard, SourceVariant::Direct)
    )
}
