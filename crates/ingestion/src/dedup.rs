//! Activity deduplication.

use std::collections::HashSet;

/// Identifiers of activities already taken in one run.
///
/// Created fresh per run; never cleared while the run is in progress.
#[derive(Debug, Clone, Default)]
pub struct DedupContext {
    seen: HashSet<String>,
}

impl DedupContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an identifier. Returns `false` if it was already seen.
    pub fn first_sighting(&mut self, identifier: &str) -> bool {
        if self.seen.contains(identifier) {
            return false;
        }
        self.seen.insert(identifier.to_string())
    }

    /// Number of distinct identifiers seen.
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
