use chrono::{DateTime, Duration, TimeZone, Utc};
use murajaa_core::{
    daily_streak, due_cards, filter_by_due, filter_by_tag, filter_by_text, per_learner_totals,
    record_review, student_stats, summarize, DueStatus, Learner, ReviewCard, ReviewEvent,
    MASTERY_THRESHOLD_DAYS,
};
use std::collections::HashMap;
use uuid::Uuid;

fn day(n: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap() + Duration::days(n)
}

fn card_for(learner: &Learner, front: &str, back: &str) -> ReviewCard {
    ReviewCard::new(learner.id, Uuid::new_v4(), front, back)
}

#[test]
fn due_selection_matches_reference_instant() {
    let learner = Learner::new("Amira");

    let mut early = card_for(&learner, "قلم", "pen");
    early.due_at = day(5);
    let mut mid = card_for(&learner, "باب", "door");
    mid.due_at = day(9);
    let mut late = card_for(&learner, "بيت", "house");
    late.due_at = day(12);

    // Shuffled input; output must come back ordered by due date.
    let v = vec![late.clone(), early.clone(), mid.clone()];
    let due = due_cards(&v, day(10));
    assert_eq!(due.len(), 2);
    assert_eq!(due[0].id, early.id);
    assert_eq!(due[1].id, mid.id);

    assert!(due_cards(&[], day(10)).is_empty());
}

#[test]
fn due_selection_skips_suspended() {
    let learner = Learner::new("Amira");
    let mut a = card_for(&learner, "قلم", "pen");
    a.due_at = day(1);
    let mut b = card_for(&learner, "باب", "door");
    b.due_at = day(1);
    b.suspended = true;

    let due = due_cards(&[a.clone(), b], day(2));
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].id, a.id);
}

#[test]
fn stats_partition_is_complete() {
    let learner = Learner::new("Omar");

    let untouched = card_for(&learner, "شمس", "sun");

    let mut learning = card_for(&learner, "قمر", "moon");
    learning = record_review(learning, 4, day(0)).unwrap().updated_card;
    assert!(learning.interval_days < MASTERY_THRESHOLD_DAYS);

    let mut mastered = card_for(&learner, "نجم", "star");
    mastered = record_review(mastered, 5, day(0)).unwrap().updated_card;
    mastered.interval_days = MASTERY_THRESHOLD_DAYS;

    // A failed card has reps == 0 but must count as learning, not new.
    let mut failed = card_for(&learner, "بحر", "sea");
    failed = record_review(failed, 1, day(0)).unwrap().updated_card;
    assert_eq!(failed.reps, 0);

    let v = vec![untouched, learning, mastered, failed];
    let s = student_stats(&v);
    assert_eq!(s.total, 4);
    assert_eq!(s.new, 1);
    assert_eq!(s.learning, 2);
    assert_eq!(s.mastered, 1);
    assert_eq!(s.total, s.new + s.learning + s.mastered);

    // Idempotent: no review in between, identical result.
    assert_eq!(student_stats(&v), s);

    let empty = student_stats(&[]);
    assert_eq!(empty.total, 0);
    assert_eq!(empty.new + empty.learning + empty.mastered, 0);
}

#[test]
fn filters_text_and_tag() {
    let learner = Learner::new("Lina");
    let mut c1 = card_for(&learner, "مرحبا", "hello");
    c1.transliteration = Some("marhaban".into());
    c1.tags = vec!["greeting".into(), "level-1".into()];
    let c2 = card_for(&learner, "وداعا", "goodbye");

    let v = vec![c1.clone(), c2.clone()];

    let by_text = filter_by_text(&v, "marhab");
    assert_eq!(by_text.len(), 1);
    assert_eq!(by_text[0].front, "مرحبا");

    let by_tag = filter_by_tag(&v, "level-1");
    assert_eq!(by_tag.len(), 1);
    assert_eq!(by_tag[0].front, "مرحبا");
}

#[test]
fn filters_due_status() {
    let learner = Learner::new("Lina");
    let now = day(10);

    let new_card = card_for(&learner, "مرحبا", "hello");

    let mut due_card = card_for(&learner, "وداعا", "goodbye");
    due_card = record_review(due_card, 4, now - Duration::days(1)).unwrap().updated_card;
    assert_eq!(due_card.due_at, now);

    let mut lapsed_card = card_for(&learner, "شكرا", "thanks");
    lapsed_card = record_review(lapsed_card, 4, now - Duration::days(4)).unwrap().updated_card;

    let mut future_card = card_for(&learner, "نعم", "yes");
    future_card = record_review(future_card, 4, now).unwrap().updated_card;

    let v = vec![new_card, due_card, lapsed_card, future_card];

    assert_eq!(filter_by_due(&v, now, DueStatus::New).len(), 1);
    assert_eq!(filter_by_due(&v, now, DueStatus::DueToday).len(), 1);
    assert_eq!(filter_by_due(&v, now, DueStatus::Lapsed).len(), 1);
    assert_eq!(filter_by_due(&v, now, DueStatus::Future).len(), 1);
}

#[test]
fn event_summary_and_streak() {
    let learner = Learner::new("Sami");
    let card = card_for(&learner, "مرحبا", "hello");

    let e0 = ReviewEvent::new(card.id, 5, day(0), 1, 2.6);
    let e1 = ReviewEvent::new(card.id, 4, day(1), 6, 2.6);
    let e2 = ReviewEvent::new(card.id, 1, day(2), 1, 2.3);

    let s = summarize(&[e0.clone(), e1.clone(), e2.clone()]);
    assert_eq!(s.totals.total, 3);
    assert_eq!(s.totals.failed, 1);
    assert_eq!(s.totals.perfect, 1);
    assert!((s.totals.accuracy() - 2.0 / 3.0).abs() < 1e-6);
    assert_eq!(s.per_day.len(), 3);

    let streak = daily_streak(&[e0.clone(), e1.clone(), e2.clone()], day(2).date_naive());
    assert_eq!(streak, 3);

    let mut card_to_learner = HashMap::new();
    card_to_learner.insert(card.id, learner.id);
    let per = per_learner_totals(&[e0, e1, e2], &card_to_learner);
    assert_eq!(per.get(&learner.id).unwrap().total, 3);
}
