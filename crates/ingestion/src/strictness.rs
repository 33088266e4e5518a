//! COVID-19 strictness classification.
//!
//! A record is strict when any of its humanitarian scopes, tags, sectors or
//! narratives carries a configured COVID-19 marker.

use iati_core::config::{CodeMarker, StrictnessConfig};
use iati_core::{ActivityRecord, CodedEntry, SplitEntry, TransactionRecord};
use std::collections::HashSet;

/// The parts of a record the classifier looks at.
#[derive(Debug, Clone, Copy, Default)]
pub struct StrictnessSignals<'a> {
    pub scopes: &'a [CodedEntry],
    pub tags: &'a [CodedEntry],
    pub sectors: &'a [SplitEntry],
    pub narratives: &'a [String],
}

impl<'a> StrictnessSignals<'a> {
    /// Activity level: scopes, tags, sectors and title.
    pub fn for_activity(activity: &'a ActivityRecord) -> Self {
        Self {
            scopes: &activity.humanitarian_scopes,
            tags: &activity.tags,
            sectors: &activity.sectors,
            narratives: &activity.title,
        }
    }

    /// Transaction level: its own sectors and description.
    pub fn for_transaction(transaction: &'a TransactionRecord) -> Self {
        Self {
            sectors: &transaction.sectors,
            narratives: &transaction.description,
            ..Self::default()
        }
    }
}

/// Strictness classifier.
#[derive(Debug, Clone)]
pub struct StrictnessClassifier {
    scope_markers: Vec<CodeMarker>,
    tag_markers: Vec<CodeMarker>,
    sector_codes: HashSet<String>,
    /// Upper-cased narrative terms.
    narrative_terms: Vec<String>,
}

impl StrictnessClassifier {
    /// Create a new classifier from the configured marker lists.
    pub fn new(config: &StrictnessConfig) -> Self {
        Self {
            scope_markers: config.scope_markers.clone(),
            tag_markers: config.tag_markers.clone(),
            sector_codes: config.sector_codes.iter().map(|c| c.trim().to_string()).collect(),
            narrative_terms: config
                .narrative_terms
                .iter()
                .map(|t| t.trim().to_uppercase())
                .filter(|t| !t.is_empty())
                .collect(),
        }
    }

    /// Whether any signal marks the record as COVID-19 specific.
    pub fn is_strict(&self, signals: &StrictnessSignals<'_>) -> bool {
        self.has_scope(signals.scopes)
            || self.has_tag(signals.tags)
            || self.has_sector(signals.sectors)
            || self.is_narrative(signals.narratives)
    }

    /// Humanitarian scope matches a marker.
    pub fn has_scope(&self, scopes: &[CodedEntry]) -> bool {
        scopes.iter().any(|scope| matches_marker(&self.scope_markers, scope))
    }

    /// Tag matches a marker.
    pub fn has_tag(&self, tags: &[CodedEntry]) -> bool {
        tags.iter().any(|tag| matches_marker(&self.tag_markers, tag))
    }

    /// Sector code is one of the designated codes.
    pub fn has_sector(&self, sectors: &[SplitEntry]) -> bool {
        sectors
            .iter()
            .any(|sector| self.sector_codes.contains(sector.code.trim()))
    }

    /// Narrative text contains one of the terms.
    pub fn is_narrative(&self, narratives: &[String]) -> bool {
        narratives.iter().any(|text| {
            let text = text.to_uppercase();
            self.narrative_terms.iter().any(|term| text.contains(term.as_str()))
        })
    }
}

fn matches_marker(markers: &[CodeMarker], entry: &CodedEntry) -> bool {
    let vocabulary = entry.vocabulary.as_deref().unwrap_or("").trim();
    let code = entry.code.trim();
    markers
        .iter()
        .any(|m| m.vocabulary == vocabulary && m.code.eq_ignore_ascii_case(code))
}
