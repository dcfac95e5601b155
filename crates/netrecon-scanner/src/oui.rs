//! OUI Resolver (C3): MAC → vendor lookup over a local IEEE OUI database.
//!
//! This module owns the in-memory map and `lookup()`. The on-disk half —
//! deciding when the file is stale and fetching a fresh copy — lives in
//! `netrecon_platform::oui_refresh`; the two are wired together by whichever
//! crate owns startup (§10.1).

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Thread-safe, write-once-at-startup-plus-atomic-swap map from a
/// normalized 6-hex-digit MAC prefix to vendor name. Clones share the same
/// underlying table, so a refresh is visible to every holder.
#[derive(Clone, Default)]
pub struct OuiTable {
    inner: Arc<RwLock<HashMap<String, String>>>,
}

impl OuiTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse IEEE OUI text (`AA-BB-CC   (hex)   Vendor`) and replace the
    /// table's contents atomically.
    pub fn load(&self, text: &str) {
        let map = parse_oui_text(text);
        *self.inner.write().expect("oui table lock poisoned") = map;
    }

    pub fn len(&self) -> usize {
        self.inner.read().expect("oui table lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Normalize `mac` (strip separators, upper-case, first 6 hex digits)
    /// and look up its vendor.
    pub fn lookup(&self, mac: &str) -> Option<String> {
        let key = normalize_mac_prefix(mac)?;
        self.inner
            .read()
            .expect("oui table lock poisoned")
            .get(&key)
            .cloned()
    }
}

/// Strip non-hex characters, upper-case, and keep the first 6 digits (the
/// OUI octet triplet). `None` if fewer than 6 hex digits remain.
pub fn normalize_mac_prefix(mac: &str) -> Option<String> {
    let cleaned: String = mac.chars().filter(|c| c.is_ascii_hexdigit()).collect();
    if cleaned.len() < 6 {
        return None;
    }
    Some(cleaned[..6].to_ascii_uppercase())
}

fn parse_oui_text(text: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in text.lines() {
        let mut parts = line.split_whitespace();
        let Some(prefix) = parts.next() else { continue };
        let Some(marker) = parts.next() else { continue };
        if marker != "(hex)" {
            continue;
        }
        let vendor: String = parts.collect::<Vec<_>>().join(" ");
        if vendor.is_empty() {
            continue;
        }
        let Some(key) = normalize_mac_prefix(prefix) else { continue };
        map.insert(key, vendor);
    }
    map
}
