//! Resolve free-form knowledge-point labels against the closed catalog.

use std::collections::BTreeSet;

use crate::models::{CleanedKnowledgeMap, RawKnowledgeMap};
use crate::taxonomy::{normalize_key, TaxonomyIndex};

/// A question keeps at most this many knowledge points.
pub const MAX_POINTS_PER_QUESTION: usize = 2;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WhitelistOutcome {
    pub cleaned: CleanedKnowledgeMap,
    /// Raw labels of questions that resolved to nothing.
    pub unknown: BTreeSet<String>,
    /// Question keys that are not positive integers.
    pub skipped_keys: Vec<String>,
}

/// Exact match on the canonical name first, then on an alias. No fuzzy matching.
pub fn normalize<'a>(label: &str, index: &'a TaxonomyIndex) -> Option<&'a str> {
    let key = normalize_key(label);
    if key.is_empty() {
        return None;
    }
    index.lookup_name(&key).or_else(|| index.lookup_alias(&key))
}

/// First two distinct resolutions, in input order.
pub fn normalize_list<S: AsRef<str>>(labels: &[S], index: &TaxonomyIndex) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(MAX_POINTS_PER_QUESTION);
    for label in labels {
        if let Some(canonical) = normalize(label.as_ref(), index) {
            if !out.iter().any(|existing| existing == canonical) {
                out.push(canonical.to_string());
            }
        }
        if out.len() >= MAX_POINTS_PER_QUESTION {
            break;
        }
    }
    out
}

fn parse_question_key(key: &str) -> Option<u32> {
    key.trim().parse::<u32>().ok().filter(|q| *q >= 1)
}

/// Keep only questions whose labels resolve; unresolved labels go to `unknown`.
pub fn whitelist_map(raw: &RawKnowledgeMap, index: &TaxonomyIndex) -> WhitelistOutcome {
    let mut outcome = WhitelistOutcome::default();

    for (key, labels) in raw {
        let Some(question) = parse_question_key(key) else {
            tracing::warn!("ignoring knowledge map entry with non-numeric question key '{key}'");
            outcome.skipped_keys.push(key.clone());
            continue;
        };

        let resolved = normalize_list(labels.as_slice(), index);
        if resolved.is_empty() {
            outcome
                .unknown
                .extend(labels.iter().filter(|l| !l.trim().is_empty()).cloned());
        } else {
            outcome.cleaned.entry(question).or_default().extend(resolved);
        }
    }

    // "01" and "1" land on the same question
    for points in outcome.cleaned.values_mut() {
        let mut seen = BTreeSet::new();
        points.retain(|p| seen.insert(p.clone()));
        points.truncate(MAX_POINTS_PER_QUESTION);
    }

    if !outcome.unknown.is_empty() {
        tracing::warn!(
            "{} knowledge labels not in catalog, excluded: {:?}",
            outcome.unknown.len(),
            outcome.unknown
        );
    }
    tracing::debug!(
        "whitelisted {} of {} questions",
        outcome.cleaned.len(),
        raw.len()
    );
    outcome
}
