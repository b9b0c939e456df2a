use axum::{
    routing::{get, post},
    Router,
};
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::api::routes::{due_cards, learner_stats, list_learners, post_review, AppState};
use murajaa_core::{Learner, RecordStore};

pub async fn run(store: Arc<dyn RecordStore>, addr: SocketAddr) -> anyhow::Result<()> {
    let state = Arc::new(AppState { store });

    let app = Router::new()
        .route("/learners", get(list_learners))
        .route("/due", get(due_cards))
        .route("/review", post(post_review))
        .route("/stats", get(learner_stats))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}

pub async fn resolve_learner<S: RecordStore + ?Sized>(store: &S, sel: &str) -> anyhow::Result<Learner> {
    if let Ok(id) = uuid::Uuid::parse_str(sel) {
        if let Ok(l) = store.get_learner(id).await { return Ok(l); }
    }
    let learners = store.list_learners().await?;
    if let Some(l) = learners.into_iter().find(|l| l.name.eq_ignore_ascii_case(sel)) {
        return Ok(l);
    }
    anyhow::bail!("learner not found")
}
