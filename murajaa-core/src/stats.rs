use crate::{ReviewCard, ReviewEvent, PASS_THRESHOLD};
use chrono::{Duration, NaiveDate};
use std::collections::{BTreeMap, HashMap};

/// Partition of a learner's card set by scheduling state.
/// `total == new + learning + mastered` for every card set, including empty.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StudentStats {
    pub total: u32,
    pub new: u32,
    pub learning: u32,
    pub mastered: u32,
}

pub fn student_stats(cards: &[ReviewCard]) -> StudentStats {
    let mut s = StudentStats::default();
    for c in cards {
        s.total += 1;
        if c.is_new() {
            s.new += 1;
        } else if c.is_mastered() {
            s.mastered += 1;
        } else {
            s.learning += 1;
        }
    }
    s
}

#[derive(Clone, Debug, Default)]
pub struct Totals {
    pub total: u32,
    pub failed: u32,
    pub hard: u32,
    pub good: u32,
    pub perfect: u32,
}

impl Totals {
    pub fn record(&mut self, quality: u8) {
        self.total += 1;
        if quality < PASS_THRESHOLD {
            self.failed += 1;
        } else {
            match quality {
                3 => self.hard += 1,
                4 => self.good += 1,
                _ => self.perfect += 1,
            }
        }
    }

    pub fn accuracy(&self) -> f32 {
        if self.total == 0 {
            0.0
        } else {
            (self.total - self.failed) as f32 / self.total as f32
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct StatsSummary {
    pub totals: Totals,
    pub per_day: BTreeMap<NaiveDate, Totals>,
}

pub fn summarize(events: &[ReviewEvent]) -> StatsSummary {
    let mut summary = StatsSummary::default();
    for e in events {
        summary.totals.record(e.quality);
        let d = e.reviewed_at.date_naive();
        summary.per_day.entry(d).or_default().record(e.quality);
    }
    summary
}

pub fn daily_streak(events: &[ReviewEvent], today: NaiveDate) -> u32 {
    let per_day = summarize(events).per_day;
    let mut streak = 0u32;
    let mut day = today;
    loop {
        if per_day.get(&day).map(|t| t.total > 0).unwrap_or(false) {
            streak += 1;
            day -= Duration::days(1);
        } else {
            break;
        }
    }
    streak
}

pub fn per_learner_totals(
    events: &[ReviewEvent],
    card_to_learner: &HashMap<uuid::Uuid, uuid::Uuid>,
) -> HashMap<uuid::Uuid, Totals> {
    let mut map: HashMap<uuid::Uuid, Totals> = HashMap::new();
    for e in events {
        if let Some(learner_id) = card_to_learner.get(&e.card_id) {
            map.entry(*learner_id).or_default().record(e.quality);
        }
    }
    map
}
