use chrono::{Duration, Utc};
use murajaa_core::{record_review, CoreError, MemoryStore, RecordStore};
use uuid::Uuid;

#[tokio::test]
async fn card_identity_is_learner_plus_item() {
    let store = MemoryStore::new();
    let learner = store.create_learner("Amira").await.unwrap();
    let item = Uuid::new_v4();

    let card = store
        .add_card(learner.id, item, "كتاب", "book", Some("kitab"), &[])
        .await
        .unwrap();

    let found = store.find_card(learner.id, item).await.unwrap();
    assert_eq!(found.id, card.id);

    let err = store
        .add_card(learner.id, item, "كتاب", "book", None, &[])
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Conflict(_)));

    // A different learner may track the same item.
    let other = store.create_learner("Omar").await.unwrap();
    store
        .add_card(other.id, item, "كتاب", "book", None, &[])
        .await
        .unwrap();
}

#[tokio::test]
async fn review_roundtrip_through_store() {
    let store = MemoryStore::new();
    let learner = store.create_learner("Amira").await.unwrap();
    let card = store
        .add_card(learner.id, Uuid::new_v4(), "قلم", "pen", None, &[])
        .await
        .unwrap();

    let now = Utc::now();
    let out = record_review(card, 4, now).unwrap();
    store.save_card(&out.updated_card).await.unwrap();
    store.insert_event(&out.event).await.unwrap();

    let stored = store.get_card(out.updated_card.id).await.unwrap();
    assert_eq!(stored.reps, 1);
    assert_eq!(stored.last_reviewed_at, Some(now));

    let events = store.list_events_for_card(stored.id).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].quality, 4);

    // Not due again until the interval elapses.
    let due_now = store.due_cards(learner.id, now).await.unwrap();
    assert!(due_now.is_empty());
    let due_later = store
        .due_cards(learner.id, now + Duration::days(1))
        .await
        .unwrap();
    assert_eq!(due_later.len(), 1);
}

#[tokio::test]
async fn unknown_learner_yields_empty_due_queue() {
    let store = MemoryStore::new();
    let due = store.due_cards(Uuid::new_v4(), Utc::now()).await.unwrap();
    assert!(due.is_empty());
}

#[tokio::test]
async fn learner_deletion_cascades() {
    let store = MemoryStore::new();
    let learner = store.create_learner("Amira").await.unwrap();
    let card = store
        .add_card(learner.id, Uuid::new_v4(), "باب", "door", None, &[])
        .await
        .unwrap();

    let out = record_review(card, 5, Utc::now()).unwrap();
    store.save_card(&out.updated_card).await.unwrap();
    store.insert_event(&out.event).await.unwrap();

    store.delete_learner(learner.id).await.unwrap();

    assert!(matches!(
        store.get_card(out.updated_card.id).await.unwrap_err(),
        CoreError::NotFound(_)
    ));
    assert!(store.list_cards(None).await.unwrap().is_empty());
    assert!(store.list_events(None).await.unwrap().is_empty());
}
