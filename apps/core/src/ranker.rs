use std::cmp::Ordering;
use std::collections::HashSet;

use crate::model::ApplicationRecord;

/// Hard bound on every result list, empty query included.
pub const MAX_RESULTS: usize = 50;

pub const SCORE_ALL: f32 = 1.0;
pub const SCORE_NAME_PREFIX: f32 = 1.0;
pub const SCORE_NAME_CONTAINS: f32 = 0.8;
pub const SCORE_ID_CONTAINS: f32 = 0.6;
pub const SCORE_SECONDARY_CONTAINS: f32 = 0.4;

pub fn normalize_query(query: &str) -> String {
    query.trim().to_lowercase()
}

/// Relevance of `record` for `query`, or `None` when it should not be listed.
/// Rules are checked in order and the first match wins.
pub fn score(query: &str, record: &ApplicationRecord) -> Option<f32> {
    score_normalized(&normalize_query(query), record)
}

fn score_normalized(query: &str, record: &ApplicationRecord) -> Option<f32> {
    if !record.enabled {
        return None;
    }
    if query.is_empty() {
        return Some(SCORE_ALL);
    }

    let name = record.display_name.to_lowercase();
    if name.starts_with(query) {
        return Some(SCORE_NAME_PREFIX);
    }
    if name.contains(query) {
        return Some(SCORE_NAME_CONTAINS);
    }
    if record.id.to_lowercase().contains(query) {
        return Some(SCORE_ID_CONTAINS);
    }
    let secondary_hit = record
        .secondary_name
        .as_deref()
        .is_some_and(|secondary| secondary.to_lowercase().contains(query));
    if secondary_hit {
        return Some(SCORE_SECONDARY_CONTAINS);
    }
    None
}

/// Scores, orders and caps `records` for `query`. Each returned record carries its
/// `transient_score`.
pub fn rank(records: &[ApplicationRecord], query: &str) -> Vec<ApplicationRecord> {
    let normalized = normalize_query(query);
    let mut seen = HashSet::with_capacity(records.len());

    let mut scored: Vec<(f32, &ApplicationRecord)> = records
        .iter()
        .filter_map(|record| score_normalized(&normalized, record).map(|score| (score, record)))
        .filter(|(_, record)| seen.insert(record.id.as_str()))
        .collect();

    scored.sort_by(|(left_score, left), (right_score, right)| compare(*left_score, left, *right_score, right));

    scored
        .into_iter()
        .take(MAX_RESULTS)
        .map(|(score, record)| {
            let mut ranked = record.clone();
            ranked.transient_score = Some(score);
            ranked
        })
        .collect()
}

/// Favorites, then score, then launch count, then name; id breaks any remaining tie.
fn compare(
    left_score: f32,
    left: &ApplicationRecord,
    right_score: f32,
    right: &ApplicationRecord,
) -> Ordering {
    right
        .is_favorite
        .cmp(&left.is_favorite)
        .then_with(|| right_score.total_cmp(&left_score))
        .then_with(|| right.launch_count.cmp(&left.launch_count))
        .then_with(|| {
            left.display_name
                .to_lowercase()
                .cmp(&right.display_name.to_lowercase())
        })
        .then_with(|| left.id.cmp(&right.id))
}
