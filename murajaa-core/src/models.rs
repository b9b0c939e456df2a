use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type LearnerId = Uuid;
pub type ItemId = Uuid;
pub type CardId = Uuid;
pub type EventId = Uuid;

pub const EF_MIN: f32 = 1.3;
pub const EF_DEFAULT: f32 = 2.5;
pub const QUALITY_MAX: u8 = 5;
pub const PASS_THRESHOLD: u8 = 3;
pub const MASTERY_THRESHOLD_DAYS: u32 = 21;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DueStatus {
    New,
    DueToday,
    Lapsed,
    Future,
}

/// Roster entry for one student. Deleting a learner cascades to all of
/// their cards and review events (the account-deletion path).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Learner {
    pub id: LearnerId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Learner {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            created_at: Utc::now(),
        }
    }
}

/// One learner's tracked state for one vocabulary item.
///
/// Identity is the (learner_id, item_id) pair; `id` is the surfaced handle.
/// Scheduling fields are mutated only by `scheduler::record_review`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReviewCard {
    pub id: CardId,
    pub learner_id: LearnerId,
    pub item_id: ItemId,
    pub front: String,
    pub back: String,
    pub transliteration: Option<String>,
    pub tags: Vec<String>,

    pub reps: u32,
    pub interval_days: u32,
    pub ef: f32,
    pub due_at: DateTime<Utc>,
    pub last_quality: Option<u8>,
    pub last_reviewed_at: Option<DateTime<Utc>>,
    pub suspended: bool,

    pub created_at: DateTime<Utc>,
}

impl ReviewCard {
    pub fn new(
        learner_id: LearnerId,
        item_id: ItemId,
        front: impl Into<String>,
        back: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            learner_id,
            item_id,
            front: front.into(),
            back: back.into(),
            transliteration: None,
            tags: Vec::new(),
            reps: 0,
            interval_days: 0,
            ef: EF_DEFAULT,
            due_at: Utc::now(),
            last_quality: None,
            last_reviewed_at: None,
            suspended: false,
            created_at: Utc::now(),
        }
    }

    /// Never reviewed. A failed card has `reps == 0` too, so this checks the
    /// review timestamp, not the streak.
    pub fn is_new(&self) -> bool {
        self.last_reviewed_at.is_none()
    }

    pub fn is_mastered(&self) -> bool {
        !self.is_new() && self.interval_days >= MASTERY_THRESHOLD_DAYS
    }

    pub fn due_status(&self, now: DateTime<Utc>) -> crate::DueStatus {
        if self.is_new() {
            crate::DueStatus::New
        } else if self.due_at > now {
            crate::DueStatus::Future
        } else {
            let elapsed = now - self.due_at;
            if elapsed.num_hours() >= 24 {
                crate::DueStatus::Lapsed
            } else {
                crate::DueStatus::DueToday
            }
        }
    }
}

/// Append-only audit record of a single graded review.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReviewEvent {
    pub id: EventId,
    pub card_id: CardId,
    pub quality: u8,
    pub reviewed_at: DateTime<Utc>,
    pub interval_applied: i32,
    pub ef_after: f32,
}

impl ReviewEvent {
    pub fn new(
        card_id: CardId,
        quality: u8,
        reviewed_at: DateTime<Utc>,
        interval_applied: i32,
        ef_after: f32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            card_id,
            quality,
            reviewed_at,
            interval_applied,
            ef_after,
        }
    }
}
