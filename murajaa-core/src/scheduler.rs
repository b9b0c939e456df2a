use crate::{CoreError, ReviewCard, ReviewEvent, EF_MIN, PASS_THRESHOLD, QUALITY_MAX};
use chrono::{DateTime, Duration, Utc};

#[derive(Debug)]
pub struct ReviewOutcome {
    pub updated_card: ReviewCard,
    pub event: ReviewEvent,
}

/// SM-2 update for one graded review.
///
/// Pure function of (card, quality, now): no clock reads, no I/O. Persisting
/// the returned card and event is the caller's job. `quality` outside 0..=5
/// fails with `CoreError::Invalid`.
pub fn record_review(
    mut card: ReviewCard,
    quality: u8,
    now: DateTime<Utc>,
) -> Result<ReviewOutcome, CoreError> {
    if quality > QUALITY_MAX {
        return Err(CoreError::Invalid("quality must be between 0 and 5"));
    }

    // EF' = EF + (0.1 - (5 - q) * (0.08 + (5 - q) * 0.02)), floored, no ceiling.
    // Applied on failures too; only the streak resets.
    let new_ef = {
        let q = quality as f32;
        let delta = 0.1 - (5.0 - q) * (0.08 + (5.0 - q) * 0.02);
        (card.ef + delta).max(EF_MIN)
    };

    let new_reps;
    let new_interval;

    if quality < PASS_THRESHOLD {
        new_reps = 0;
        new_interval = 1;
    } else {
        new_reps = card.reps + 1;
        new_interval = if new_reps == 1 {
            1
        } else if new_reps == 2 {
            6
        } else {
            let base = card.interval_days.max(1) as f32;
            (base * new_ef).round().max(1.0) as u32
        };
    }

    card.ef = new_ef;
    card.reps = new_reps;
    card.interval_days = new_interval;
    card.due_at = now + Duration::days(new_interval as i64);
    card.last_quality = Some(quality);
    card.last_reviewed_at = Some(now);

    let event = ReviewEvent::new(card.id, quality, now, new_interval as i32, new_ef);

    Ok(ReviewOutcome { updated_card: card, event })
}
