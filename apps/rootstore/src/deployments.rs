//! # Address Book
//!
//! A flat JSON object mapping component names to addresses or paths, kept
//! next to the store as `rootstore.deployments.json`. Written by `init` and
//! `upgrade` so operators can see what is deployed where. The registry
//! itself never reads it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// File name of the address book.
pub const DEPLOYMENTS_FILE: &str = "rootstore.deployments.json";

/// Component name -> address or path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AddressBook {
    entries: BTreeMap<String, String>,
}

impl AddressBook {
    /// Location of the address book for a given store file.
    pub fn path_for(store: &Path) -> PathBuf {
        store
            .parent()
            .map(|dir| dir.join(DEPLOYMENTS_FILE))
            .unwrap_or_else(|| PathBuf::from(DEPLOYMENTS_FILE))
    }

    /// Load the address book, treating a missing file as empty.
    pub fn load(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(&content)
            .map_err(|e| format!("Malformed address book {}: {}", path.display(), e))
    }

    /// Write the address book as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<(), String> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize address book: {}", e))?;
        std::fs::write(path, json + "\n")
            .map_err(|e| format!("Failed to write {}: {}", path.display(), e))
    }

    pub fn get(&self, component: &str) -> Option<&str> {
        self.entries.get(component).map(String::as_str)
    }

    /// Record `component`, replacing any earlier value.
    pub fn set(&mut self, component: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(component.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// =============================================================================
// TESTS
// =============================================================================
