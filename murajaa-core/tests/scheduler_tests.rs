use chrono::{DateTime, Duration, TimeZone, Utc};
use murajaa_core::{record_review, CoreError, Learner, ReviewCard, EF_MIN};
use uuid::Uuid;

fn day(n: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap() + Duration::days(n)
}

fn fresh_card() -> ReviewCard {
    let learner = Learner::new("Amira");
    ReviewCard::new(learner.id, Uuid::new_v4(), "كتاب", "book")
}

#[test]
fn perfect_recall_from_new() {
    let card = fresh_card();
    let out = record_review(card, 5, day(0)).unwrap();
    let c = out.updated_card;

    assert_eq!(c.reps, 1);
    assert_eq!(c.interval_days, 1);
    assert!(c.ef > 2.5);
    assert_eq!(c.due_at, day(0) + Duration::days(1));
    assert_eq!(c.last_quality, Some(5));
    assert_eq!(c.last_reviewed_at, Some(day(0)));
    assert_eq!(out.event.interval_applied, 1);
    assert_eq!(out.event.quality, 5);
}

#[test]
fn first_three_successes_follow_fixed_intervals() {
    let mut card = fresh_card();

    let out1 = record_review(card, 5, day(0)).unwrap();
    card = out1.updated_card;
    assert_eq!(card.reps, 1);
    assert_eq!(card.interval_days, 1);

    let out2 = record_review(card, 5, day(1)).unwrap();
    card = out2.updated_card;
    assert_eq!(card.reps, 2);
    assert_eq!(card.interval_days, 6);

    let ef_before_third = card.ef;
    let out3 = record_review(card, 5, day(7)).unwrap();
    card = out3.updated_card;
    assert_eq!(card.reps, 3);
    // Third interval scales the 6-day interval by the freshly updated ease.
    let expected = (6.0 * (ef_before_third + 0.1)).round() as u32;
    assert_eq!(card.interval_days, expected);
}

#[test]
fn failure_resets_streak_but_not_content() {
    let mut card = fresh_card();
    for n in 0..4 {
        card = record_review(card, 5, day(n)).unwrap().updated_card;
    }
    assert!(card.reps >= 3);

    let out = record_review(card.clone(), 1, day(30)).unwrap();
    let c = out.updated_card;
    assert_eq!(c.reps, 0);
    assert_eq!(c.interval_days, 1);
    assert_eq!(c.due_at, day(30) + Duration::days(1));
    assert!(c.ef < card.ef);
    assert!(c.ef >= EF_MIN);
    assert_eq!(c.front, "كتاب");
    assert_eq!(c.back, "book");
    assert_eq!(c.id, card.id);
}

#[test]
fn every_failing_quality_resets() {
    for q in [0u8, 1, 2] {
        let mut card = fresh_card();
        card.reps = 7;
        card.interval_days = 40;
        let c = record_review(card, q, day(0)).unwrap().updated_card;
        assert_eq!(c.reps, 0, "quality {q}");
        assert_eq!(c.interval_days, 1, "quality {q}");
    }
}

#[test]
fn ease_never_drops_below_floor() {
    let mut card = fresh_card();
    for n in 0..20 {
        card = record_review(card, 0, day(n)).unwrap().updated_card;
        assert!(card.ef >= EF_MIN);
    }
    assert!((card.ef - EF_MIN).abs() < 1e-4);

    // Mixed sequences hold the floor too.
    let mut card = fresh_card();
    for (n, q) in [0u8, 3, 1, 5, 0, 2, 4, 0, 0, 3].iter().enumerate() {
        card = record_review(card, *q, day(n as i64)).unwrap().updated_card;
        assert!(card.ef >= EF_MIN);
    }
}

#[test]
fn due_date_is_last_review_plus_interval() {
    let mut card = fresh_card();
    for (n, q) in [5u8, 4, 2, 3, 5, 0, 4].iter().enumerate() {
        card = record_review(card, *q, day(3 * n as i64)).unwrap().updated_card;
        let reviewed = card.last_reviewed_at.unwrap();
        assert_eq!(card.due_at, reviewed + Duration::days(card.interval_days as i64));
        assert!(card.due_at >= reviewed);
    }
}

#[test]
fn worked_example_success_then_failure() {
    // interval=6, ef=2.5, reps=2, reviewed at day 6.
    let mut card = fresh_card();
    card.reps = 2;
    card.interval_days = 6;
    card.ef = 2.5;

    // q=4 leaves ease at 2.5 exactly, so interval = round(6 * 2.5) = 15.
    let c = record_review(card.clone(), 4, day(6)).unwrap().updated_card;
    assert_eq!(c.reps, 3);
    assert!((c.ef - 2.5).abs() < 1e-6);
    assert_eq!(c.interval_days, 15);
    assert_eq!(c.due_at, day(21));

    // Same starting card, q=1: reset to a one-day interval, ease drops.
    let c = record_review(card, 1, day(6)).unwrap().updated_card;
    assert_eq!(c.reps, 0);
    assert_eq!(c.interval_days, 1);
    assert_eq!(c.due_at, day(7));
    assert!(c.ef < 2.5 && c.ef >= EF_MIN);
}

#[test]
fn interval_keeps_growing_under_good_recall() {
    let mut card = fresh_card();
    let mut at = day(0);
    for _ in 0..5 {
        card = record_review(card, 4, at).unwrap().updated_card;
        at = card.due_at;
    }
    assert!(card.interval_days > 30);
}

#[test]
fn out_of_range_quality_is_rejected() {
    for q in [6u8, 7, 255] {
        let err = record_review(fresh_card(), q, day(0)).unwrap_err();
        assert!(matches!(err, CoreError::Invalid(_)), "quality {q}");
    }
}
