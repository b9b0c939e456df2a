use crate::{DueStatus, ReviewCard};
use chrono::{DateTime, Utc};

/// Cards ready for review as of `as_of`: not suspended, `due_at <= as_of`.
/// Ordered by (due_at, created_at) ascending; callers and tests rely on it.
pub fn due_cards(cards: &[ReviewCard], as_of: DateTime<Utc>) -> Vec<ReviewCard> {
    let mut v: Vec<ReviewCard> = cards
        .iter()
        .filter(|c| !c.suspended && c.due_at <= as_of)
        .cloned()
        .collect();
    v.sort_by_key(|c| (c.due_at, c.created_at));
    v
}

pub fn filter_by_text(cards: &[ReviewCard], query: &str) -> Vec<ReviewCard> {
    let q = query.trim().to_lowercase();
    if q.is_empty() {
        return cards.to_vec();
    }
    cards
        .iter()
        .filter(|c| {
            c.front.to_lowercase().contains(&q)
                || c.back.to_lowercase().contains(&q)
                || c.transliteration
                    .as_ref()
                    .map(|t| t.to_lowercase().contains(&q))
                    .unwrap_or(false)
                || c.tags.iter().any(|t| t.to_lowercase().contains(&q))
        })
        .cloned()
        .collect()
}

pub fn filter_by_tag(cards: &[ReviewCard], tag: &str) -> Vec<ReviewCard> {
    let q = tag.trim().to_lowercase();
    cards
        .iter()
        .filter(|c| c.tags.iter().any(|t| t.to_lowercase() == q))
        .cloned()
        .collect()
}

pub fn filter_by_due(cards: &[ReviewCard], now: DateTime<Utc>, want: DueStatus) -> Vec<ReviewCard> {
    cards
        .iter()
        .filter(|c| c.due_status(now) == want)
        .cloned()
        .collect()
}

pub fn filter_not_suspended(cards: &[ReviewCard]) -> Vec<ReviewCard> {
    cards.iter().filter(|c| !c.suspended).cloned().collect()
}
