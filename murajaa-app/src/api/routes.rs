use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use murajaa_core::{
    daily_streak, scheduler::record_review, student_stats, summarize, RecordStore, ReviewCard,
};

use crate::api::dto::{CardOut, LearnerOut, ReviewIn, StatsOut};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
}

#[derive(Deserialize)]
pub struct DueQuery {
    learner: String,
    max: Option<usize>,
}

#[derive(Deserialize)]
pub struct StatsQuery {
    learner: String,
}

pub async fn list_learners(
    State(st): State<Arc<AppState>>,
) -> Result<Json<Vec<LearnerOut>>, StatusCode> {
    let mut learners = st
        .store
        .list_learners()
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    learners.sort_by_key(|l| l.created_at);
    Ok(Json(
        learners
            .into_iter()
            .map(|l| LearnerOut { id: l.id, name: l.name, created_at: l.created_at })
            .collect(),
    ))
}

pub async fn due_cards(
    State(st): State<Arc<AppState>>,
    Query(q): Query<DueQuery>,
) -> Result<Json<Vec<CardOut>>, StatusCode> {
    let now = chrono::Utc::now();
    let learner = super::server::resolve_learner(&*st.store, &q.learner)
        .await
        .map_err(|_| StatusCode::BAD_REQUEST)?;

    // Already ordered by (due_at, created_at); new cards are due at creation.
    let mut pool = st
        .store
        .due_cards(learner.id, now)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    if let Some(m) = q.max { pool.truncate(m); }

    Ok(Json(pool.into_iter().map(card_out).collect()))
}

pub async fn post_review(
    State(st): State<Arc<AppState>>,
    Json(body): Json<ReviewIn>,
) -> Result<StatusCode, StatusCode> {
    let card = st
        .store
        .get_card(body.card_id)
        .await
        .map_err(|_| StatusCode::BAD_REQUEST)?;
    let out = record_review(card, body.quality, chrono::Utc::now())
        .map_err(|_| StatusCode::BAD_REQUEST)?;
    st.store
        .save_card(&out.updated_card)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    st.store
        .insert_event(&out.event)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn learner_stats(
    State(st): State<Arc<AppState>>,
    Query(q): Query<StatsQuery>,
) -> Result<Json<StatsOut>, StatusCode> {
    let learner = super::server::resolve_learner(&*st.store, &q.learner)
        .await
        .map_err(|_| StatusCode::BAD_REQUEST)?;

    let cards = st
        .store
        .list_cards(Some(learner.id))
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    let s = student_stats(&cards);

    let events = st
        .store
        .list_events(Some(learner.id))
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    let summary = summarize(&events);
    let streak = daily_streak(&events, chrono::Utc::now().date_naive());

    Ok(Json(StatsOut {
        learner_id: learner.id,
        total: s.total,
        new: s.new,
        learning: s.learning,
        mastered: s.mastered,
        reviews: summary.totals.total,
        accuracy: summary.totals.accuracy(),
        streak_days: streak,
    }))
}

fn card_out(c: ReviewCard) -> CardOut {
    CardOut {
        id: c.id,
        learner_id: c.learner_id,
        item_id: c.item_id,
        front: c.front,
        back: c.back,
        transliteration: c.transliteration,
        tags: c.tags,
        due_at: c.due_at,
        suspended: c.suspended,
    }
}
