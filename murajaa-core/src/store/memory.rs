use crate::{CardId, CoreError, ItemId, Learner, LearnerId, ReviewCard, ReviewEvent};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;

#[derive(Default)]
pub struct MemoryStore {
    learners: RwLock<HashMap<LearnerId, Learner>>,
    cards: RwLock<HashMap<CardId, ReviewCard>>,
    events: RwLock<HashMap<CardId, Vec<ReviewEvent>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl crate::store::RecordStore for MemoryStore {
    async fn create_learner(&self, name: &str) -> Result<Learner, CoreError> {
        let learner = Learner::new(name);
        let mut m = self.learners.write();
        if m.values().any(|l| l.name.eq_ignore_ascii_case(name)) {
            return Err(CoreError::Conflict("learner name already exists"));
        }
        m.insert(learner.id, learner.clone());
        Ok(learner)
    }

    async fn get_learner(&self, id: LearnerId) -> Result<Learner, CoreError> {
        self.learners
            .read()
            .get(&id)
            .cloned()
            .ok_or(CoreError::NotFound("learner"))
    }

    async fn list_learners(&self) -> Result<Vec<Learner>, CoreError> {
        Ok(self.learners.read().values().cloned().collect())
    }

    async fn delete_learner(&self, id: LearnerId) -> Result<(), CoreError> {
        self.learners
            .write()
            .remove(&id)
            .ok_or(CoreError::NotFound("learner"))?;
        let mut cards = self.cards.write();
        let ids: Vec<CardId> = cards
            .values()
            .filter(|c| c.learner_id == id)
            .map(|c| c.id)
            .collect();
        for cid in ids {
            cards.remove(&cid);
            self.events.write().remove(&cid);
        }
        Ok(())
    }

    async fn add_card(
        &self,
        learner_id: LearnerId,
        item_id: ItemId,
        front: &str,
        back: &str,
        transliteration: Option<&str>,
        tags: &[String],
    ) -> Result<ReviewCard, CoreError> {
        if !self.learners.read().contains_key(&learner_id) {
            return Err(CoreError::NotFound("learner"));
        }
        let mut m = self.cards.write();
        if m.values()
            .any(|c| c.learner_id == learner_id && c.item_id == item_id)
        {
            return Err(CoreError::Conflict("card exists for learner and item"));
        }
        let mut card = ReviewCard::new(learner_id, item_id, front, back);
        card.transliteration = transliteration.map(|s| s.to_string());
        card.tags = tags.to_vec();
        m.insert(card.id, card.clone());
        Ok(card)
    }

    async fn get_card(&self, id: CardId) -> Result<ReviewCard, CoreError> {
        self.cards
            .read()
            .get(&id)
            .cloned()
            .ok_or(CoreError::NotFound("card"))
    }

    async fn find_card(
        &self,
        learner_id: LearnerId,
        item_id: ItemId,
    ) -> Result<ReviewCard, CoreError> {
        self.cards
            .read()
            .values()
            .find(|c| c.learner_id == learner_id && c.item_id == item_id)
            .cloned()
            .ok_or(CoreError::NotFound("card"))
    }

    async fn list_cards(&self, learner_id: Option<LearnerId>) -> Result<Vec<ReviewCard>, CoreError> {
        let cards = self.cards.read();
        let mut v: Vec<ReviewCard> = cards.values().cloned().collect();
        if let Some(lid) = learner_id {
            v.retain(|c| c.learner_id == lid);
        }
        Ok(v)
    }

    async fn due_cards(
        &self,
        learner_id: LearnerId,
        as_of: DateTime<Utc>,
    ) -> Result<Vec<ReviewCard>, CoreError> {
        let cards: Vec<ReviewCard> = self
            .cards
            .read()
            .values()
            .filter(|c| c.learner_id == learner_id)
            .cloned()
            .collect();
        Ok(crate::filters::due_cards(&cards, as_of))
    }

    async fn save_card(&self, card: &ReviewCard) -> Result<ReviewCard, CoreError> {
        let mut m = self.cards.write();
        if !m.contains_key(&card.id) {
            return Err(CoreError::NotFound("card"));
        }
        m.insert(card.id, card.clone());
        Ok(card.clone())
    }

    async fn delete_card(&self, id: CardId) -> Result<(), CoreError> {
        self.cards
            .write()
            .remove(&id)
            .ok_or(CoreError::NotFound("card"))?;
        self.events.write().remove(&id);
        Ok(())
    }

    async fn set_suspended(&self, id: CardId, suspended: bool) -> Result<(), CoreError> {
        let mut m = self.cards.write();
        let Some(card) = m.get_mut(&id) else {
            return Err(CoreError::NotFound("card"));
        };
        card.suspended = suspended;
        Ok(())
    }

    async fn insert_event(&self, event: &ReviewEvent) -> Result<(), CoreError> {
        let mut m = self.events.write();
        m.entry(event.card_id).or_default().push(event.clone());
        Ok(())
    }

    async fn list_events_for_card(&self, card_id: CardId) -> Result<Vec<ReviewEvent>, CoreError> {
        Ok(self
            .events
            .read()
            .get(&card_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_events(&self, learner_id: Option<LearnerId>) -> Result<Vec<ReviewEvent>, CoreError> {
        let events = self.events.read();
        match learner_id {
            None => Ok(events.values().flatten().cloned().collect()),
            Some(lid) => {
                let cards = self.cards.read();
                Ok(events
                    .iter()
                    .filter(|(cid, _)| cards.get(*cid).map(|c| c.learner_id == lid).unwrap_or(false))
                    .flat_map(|(_, v)| v.clone())
                    .collect())
            }
        }
    }
}
