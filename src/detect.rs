//! Source-system detection from column-header evidence.
//!
//! Each registered profile is scored by how many of its expected source
//! columns appear verbatim among the table's headers. Detection never
//! fails: the best guess is always returned, and confidences below
//! [`LOW_CONFIDENCE`] are flagged for the caller to surface as a warning.

use std::collections::HashSet;

use log::debug;

use crate::registry::Registry;

/// Confidence below which a detection is reported as a best guess only.
pub const LOW_CONFIDENCE: f64 = 0.5;

#[derive(Debug, Clone)]
pub struct Detection {
    pub profile: String,
    /// Expected columns found verbatim in the table headers.
    pub matches: usize,
    /// `matches` over the profile's declared mapping size, 0.0..=1.0.
    pub confidence: f64,
}

impl Detection {
    pub fn is_low_confidence(&self) -> bool {
        self.confidence < LOW_CONFIDENCE
    }
}

/// Scores every registered profile against `headers` and returns the one
/// with the most verbatim column hits. Ties keep the first profile in
/// registry declaration order; callers wanting a different winner pass an
/// explicit profile name to the pipeline instead.
pub fn detect(registry: &Registry, headers: &[String]) -> Detection {
    let header_set: HashSet<&str> = headers.iter().map(String::as_str).collect();
    let mut best: Option<Detection> = None;

    for profile in registry.profiles() {
        let matches = profile
            .columns
            .iter()
            .filter(|entry| header_set.contains(entry.column.as_str()))
            .count();
        let confidence = matches as f64 / profile.columns.len() as f64;
        debug!(
            "Profile '{}' matched {matches}/{} expected columns",
            profile.name,
            profile.columns.len()
        );
        if best.as_ref().is_none_or(|b| matches > b.matches) {
            best = Some(Detection {
                profile: profile.name.clone(),
                matches,
                confidence,
            });
        }
    }

    // The registry guarantees at least one profile, so `best` is always
    // set; the fallback keeps this total without a panic path.
    best.unwrap_or_else(|| Detection {
        profile: String::new(),
        matches: 0,
        confidence: 0.0,
    })
}
