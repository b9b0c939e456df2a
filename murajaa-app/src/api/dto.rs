use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Serialize)]
pub struct LearnerOut {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct CardOut {
    pub id: Uuid,
    pub learner_id: Uuid,
    pub item_id: Uuid,
    pub front: String,
    pub back: String,
    pub transliteration: Option<String>,
    pub tags: Vec<String>,
    pub due_at: DateTime<Utc>,
    pub suspended: bool,
}

#[derive(Serialize)]
pub struct StatsOut {
    pub learner_id: Uuid,
    pub total: u32,
    pub new: u32,
    pub learning: u32,
    pub mastered: u32,
    pub reviews: u32,
    pub accuracy: f32,
    pub streak_days: u32,
}

#[derive(Deserialize)]
pub struct ReviewIn {
    pub card_id: Uuid,
    /// Recall quality, 0 (blackout) to 5 (perfect)
    pub quality: u8,
}
