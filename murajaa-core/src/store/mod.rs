use crate::{CardId, CoreError, ItemId, Learner, LearnerId, ReviewCard, ReviewEvent};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub mod memory;

pub use memory::MemoryStore;

/// Persistence contract for review state. The scheduler itself performs no
/// I/O; everything stateful goes through an injected implementation of this
/// trait. Writes are last-write-wins; there is no compare-and-swap.
#[async_trait]
pub trait RecordStore: Send + Sync {
    // Learners
    async fn create_learner(&self, name: &str) -> Result<Learner, CoreError>;
    async fn get_learner(&self, id: LearnerId) -> Result<Learner, CoreError>;
    async fn list_learners(&self) -> Result<Vec<Learner>, CoreError>;
    /// Cascades to the learner's cards and events.
    async fn delete_learner(&self, id: LearnerId) -> Result<(), CoreError>;

    // Cards
    async fn add_card(
        &self,
        learner_id: LearnerId,
        item_id: ItemId,
        front: &str,
        back: &str,
        transliteration: Option<&str>,
        tags: &[String],
    ) -> Result<ReviewCard, CoreError>;

    async fn get_card(&self, id: CardId) -> Result<ReviewCard, CoreError>;
    async fn find_card(&self, learner_id: LearnerId, item_id: ItemId)
        -> Result<ReviewCard, CoreError>;
    async fn list_cards(&self, learner_id: Option<LearnerId>) -> Result<Vec<ReviewCard>, CoreError>;
    async fn due_cards(
        &self,
        learner_id: LearnerId,
        as_of: DateTime<Utc>,
    ) -> Result<Vec<ReviewCard>, CoreError>;
    async fn save_card(&self, card: &ReviewCard) -> Result<ReviewCard, CoreError>;
    async fn delete_card(&self, id: CardId) -> Result<(), CoreError>;
    async fn set_suspended(&self, id: CardId, suspended: bool) -> Result<(), CoreError>;

    // Review events
    async fn insert_event(&self, event: &ReviewEvent) -> Result<(), CoreError>;
    async fn list_events_for_card(&self, card_id: CardId) -> Result<Vec<ReviewEvent>, CoreError>;
    async fn list_events(&self, learner_id: Option<LearnerId>) -> Result<Vec<ReviewEvent>, CoreError>;
}
