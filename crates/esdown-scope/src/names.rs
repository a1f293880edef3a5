//! Fresh identifier allocation.

use std::collections::{HashMap, HashSet};

/// Every name in use within one compilation unit, plus the memo of
/// token-keyed names.
///
/// The registry is seeded with all identifiers spelled in the source, so a
/// minted `base$N` can never capture or shadow a user binding.
#[derive(Debug, Clone, Default)]
pub struct NameRegistry {
    used: HashSet<String>,
    next_suffix: HashMap<String, u32>,
    by_token: HashMap<String, String>,
}

impl NameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reserve(&mut self, name: &str) {
        if !self.used.contains(name) {
            self.used.insert(name.to_string());
        }
    }

    pub fn is_used(&self, name: &str) -> bool {
        self.used.contains(name)
    }

    /// First `base$N` not in use. Declaring reserves it immediately, so the
    /// next request for the same base gets a different name.
    pub fn unique(&mut self, base: &str, is_declaration: bool) -> String {
        let mut suffix = self.next_suffix.get(base).copied().unwrap_or(0);
        let name = loop {
            let candidate = format!("{}${}", base, suffix);
            suffix += 1;
            if !self.used.contains(&candidate) {
                break candidate;
            }
        };
        if is_declaration {
            self.next_suffix.insert(base.to_string(), suffix);
            self.used.insert(name.clone());
            log::trace!("minted {}", name);
        }
        name
    }

    /// One name per `token` for the whole unit: the first request mints it
    /// from `base`, later requests return the same name.
    pub fn unique_by_token(&mut self, token: &str, base: &str) -> String {
        if let Some(name) = self.by_token.get(token) {
            return name.clone();
        }
        let name = self.unique(base, true);
        self.by_token.insert(token.to_string(), name.clone());
        name
    }

    pub fn clear(&mut self) {
        self.used.clear();
        self.next_suffix.clear();
        self.by_token.clear();
    }
}
