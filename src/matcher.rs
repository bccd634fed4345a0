//! Exact-then-fuzzy resolution of source columns onto canonical fields.
//!
//! For each profile mapping entry, in declared order: a verbatim header
//! match binds at score 100; otherwise every not-yet-consumed header is
//! scored with a token-sort similarity and the best candidate wins if it
//! clears the acceptance threshold. A header is consumed by at most one
//! canonical field, so the resulting mapping is injective.
//!
//! Similarity is a token-sort indel ratio: both names are lowercased,
//! split on non-alphanumeric boundaries, token-sorted and rejoined, then
//! compared with `rapidfuzz::fuzz::ratio` on a 0-100 scale. Monotonic
//! score semantics are all the pipeline relies on; the threshold is a
//! caller-supplied knob defaulting to [`DEFAULT_FUZZY_THRESHOLD`].

use std::collections::BTreeMap;

use rapidfuzz::fuzz;

use crate::registry::SourceProfile;

pub const DEFAULT_FUZZY_THRESHOLD: f64 = 70.0;
pub const EXACT_SCORE: f64 = 100.0;

/// One accepted binding of a source column to a canonical field.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMatch {
    pub source_column: String,
    pub field: String,
    /// 0-100; exactly 100 for verbatim header matches.
    pub score: f64,
}

impl ColumnMatch {
    pub fn is_fuzzy(&self) -> bool {
        self.score < EXACT_SCORE
    }
}

#[derive(Debug, Clone, Default)]
pub struct MatchOutcome {
    pub matches: Vec<ColumnMatch>,
    /// Canonical fields left without a column, in profile order.
    pub unmatched: Vec<String>,
}

impl MatchOutcome {
    /// Source column -> canonical field, for renaming table headers.
    pub fn rename_map(&self) -> BTreeMap<String, String> {
        self.matches
            .iter()
            .map(|m| (m.source_column.clone(), m.field.clone()))
            .collect()
    }

    pub fn fuzzy_matches(&self) -> impl Iterator<Item = &ColumnMatch> {
        self.matches.iter().filter(|m| m.is_fuzzy())
    }
}

/// Token-sort similarity between two column names, 0-100.
pub fn token_sort_ratio(left: &str, right: &str) -> f64 {
    let left = normalize(left);
    let right = normalize(right);
    if left == right {
        return EXACT_SCORE;
    }
    fuzz::ratio(left.chars(), right.chars()) * 100.0
}

fn normalize(name: &str) -> String {
    let mut tokens: Vec<String> = name
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect();
    tokens.sort();
    tokens.join(" ")
}

/// Resolves each of `profile`'s expected columns to an actual header.
/// Unmatched canonical fields are reported, never fatal.
pub fn match_columns(
    headers: &[String],
    profile: &SourceProfile,
    threshold: f64,
) -> MatchOutcome {
    let mut outcome = MatchOutcome::default();
    let mut consumed = vec![false; headers.len()];

    for entry in &profile.columns {
        let exact = headers
            .iter()
            .enumerate()
            .find(|(index, header)| !consumed[*index] && **header == entry.column)
            .map(|(index, _)| index);
        if let Some(index) = exact {
            consumed[index] = true;
            outcome.matches.push(ColumnMatch {
                source_column: headers[index].clone(),
                field: entry.field.clone(),
                score: EXACT_SCORE,
            });
            continue;
        }

        let best = headers
            .iter()
            .enumerate()
            .filter(|(index, _)| !consumed[*index])
            .map(|(index, header)| (index, token_sort_ratio(&entry.column, header)))
            .max_by(|a, b| a.1.total_cmp(&b.1));

        match best {
            Some((index, score)) if score >= threshold => {
                consumed[index] = true;
                outcome.matches.push(ColumnMatch {
                    source_column: headers[index].clone(),
                    field: entry.field.clone(),
                    score,
                });
            }
            _ => outcome.unmatched.push(entry.field.clone()),
        }
    }

    outcome
}
