use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use super::AppState;
use crate::error::EngineError;
use crate::explain::{Attribution, ScoreBreakdown};
use crate::recommendation::RecommendOptions;
use crate::snapshot::Snapshot;
use crate::store::Publication;
use crate::types::{FallbackReason, ItemId, RecommendationOrigin, UserId};

/// Catalog fields attached to every item in a response
///
/// Items known only from events carry their id alone.
#[derive(Debug, Serialize)]
pub struct ItemView {
    pub item_id: ItemId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
}

impl ItemView {
    fn from_snapshot(snapshot: &Snapshot, item_id: &ItemId) -> Self {
        let item = snapshot.item(item_id.as_str());
        Self {
            item_id: item_id.clone(),
            title: item.map(|i| i.title.clone()),
            content_type: item.map(|i| i.content_type.clone()),
            genre: item.map(|i| i.genre.clone()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub snapshot: Publication,
    pub skipped_events: usize,
    pub unknown_items: usize,
}

/// GET /api/v1/health
pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    let snapshot = state.store.current();
    let diagnostics = snapshot.diagnostics();

    HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        service: "streamrec-service".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        snapshot: state.store.publication(),
        skipped_events: diagnostics.skipped_events(),
        unknown_items: diagnostics.unknown_items.len(),
    })
}

/// Query parameters for the popular endpoint
#[derive(Debug, Deserialize)]
pub struct PopularQuery {
    pub k: Option<usize>,
    pub content_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PopularEntry {
    #[serde(flatten)]
    pub item: ItemView,
    pub score: f64,
}

#[derive(Debug, Serialize)]
pub struct PopularResponse {
    pub items: Vec<PopularEntry>,
}

/// GET /api/v1/popular - Global popularity ranking
///
/// Query parameters:
/// - k: Number of items (default: configured default_k)
/// - content_type: Optional content type filter
pub async fn get_popular(
    state: web::Data<AppState>,
    params: web::Query<PopularQuery>,
) -> Result<HttpResponse, EngineError> {
    let snapshot = state.store.current();
    let k = params.k.unwrap_or(snapshot.default_k());

    let items = snapshot
        .popular(k, params.content_type.as_deref())?
        .into_iter()
        .map(|entry| PopularEntry {
            item: ItemView::from_snapshot(&snapshot, &entry.item_id),
            score: entry.score,
        })
        .collect();

    Ok(HttpResponse::Ok().json(PopularResponse { items }))
}

/// Query parameters for the recommendations endpoint
#[derive(Debug, Deserialize)]
pub struct RecommendationsQuery {
    pub user_id: String,
    pub k: Option<usize>,
    pub content_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RecommendationEntry {
    #[serde(flatten)]
    pub item: ItemView,
    pub score: f64,
    pub origin: RecommendationOrigin,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_item: Option<ItemView>,
}

#[derive(Debug, Serialize)]
pub struct RecommendationsResponse {
    pub user_id: UserId,
    pub fallback_used: bool,
    pub fallback_reason: Option<FallbackReason>,
    pub recommendations: Vec<RecommendationEntry>,
}

/// GET /api/v1/recommendations - Personalized recommendations
///
/// Unknown users and users without history receive the popularity ranking
/// with `fallback_used` set and the reason attached.
pub async fn get_recommendations(
    state: web::Data<AppState>,
    params: web::Query<RecommendationsQuery>,
) -> Result<HttpResponse, EngineError> {
    let snapshot = state.store.current();
    let params = params.into_inner();
    let options = RecommendOptions {
        k: params.k,
        content_type: params.content_type,
    };

    let list = snapshot.recommend_with(&params.user_id, &options)?;
    info!(
        user_id = %list.user_id,
        count = list.items.len(),
        fallback = list.is_fallback(),
        "Served recommendations"
    );

    let recommendations = list
        .items
        .iter()
        .map(|rec| RecommendationEntry {
            item: ItemView::from_snapshot(&snapshot, &rec.item_id),
            score: rec.score,
            origin: rec.origin,
            source_item: rec
                .source_item
                .as_ref()
                .map(|source| ItemView::from_snapshot(&snapshot, source)),
        })
        .collect();

    Ok(HttpResponse::Ok().json(RecommendationsResponse {
        fallback_used: list.is_fallback(),
        fallback_reason: list.fallback_reason(),
        user_id: list.user_id,
        recommendations,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ExplainQuery {
    pub user_id: String,
    pub item_id: String,
}

#[derive(Debug, Serialize)]
pub struct ExplainResponse {
    pub attribution: Option<Attribution>,
    pub breakdown: ScoreBreakdown,
}

/// GET /api/v1/explain - Why an item scores the way it does for a user
pub async fn explain(
    state: web::Data<AppState>,
    params: web::Query<ExplainQuery>,
) -> Result<HttpResponse, EngineError> {
    let snapshot = state.store.current();

    let attribution = snapshot.explain(&params.user_id, &params.item_id)?;
    let breakdown = snapshot.score_breakdown(&params.user_id, &params.item_id)?;

    Ok(HttpResponse::Ok().json(ExplainResponse {
        attribution,
        breakdown,
    }))
}

#[derive(Debug, Deserialize)]
pub struct UserHistoryQuery {
    pub user_id: String,
    /// Scored items to return
    #[serde(default = "default_history_limit")]
    pub limit: usize,
    /// Raw events to return
    #[serde(default = "default_events_limit")]
    pub events: usize,
}

fn default_history_limit() -> usize {
    50
}

fn default_events_limit() -> usize {
    20
}

#[derive(Debug, Serialize)]
pub struct HistoryItem {
    #[serde(flatten)]
    pub item: ItemView,
    pub score: f64,
}

#[derive(Debug, Serialize)]
pub struct HistoryEvent {
    #[serde(flatten)]
    pub item: ItemView,
    pub event_type: String,
    pub watch_seconds: f64,
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct UserHistoryResponse {
    pub user_id: String,
    pub total_events: usize,
    pub items: Vec<HistoryItem>,
    pub events: Vec<HistoryEvent>,
}

/// GET /api/v1/user_history - What a user has watched
///
/// Query parameters:
/// - limit: Scored items, highest interaction score first (default: 50)
/// - events: Raw events, longest watch first (default: 20)
pub async fn get_user_history(
    state: web::Data<AppState>,
    params: web::Query<UserHistoryQuery>,
) -> Result<HttpResponse, EngineError> {
    let snapshot = state.store.current();

    let items = snapshot
        .user_history(&params.user_id, params.limit)?
        .into_iter()
        .map(|entry| HistoryItem {
            item: ItemView::from_snapshot(&snapshot, &entry.item_id),
            score: entry.score,
        })
        .collect();

    let activity = snapshot.user_activity(&params.user_id, params.events)?;
    let events = activity
        .events
        .into_iter()
        .map(|event| HistoryEvent {
            item: ItemView::from_snapshot(&snapshot, &event.item_id),
            event_type: event.event_type,
            watch_seconds: event.watch_seconds,
            timestamp: event.timestamp,
        })
        .collect();

    Ok(HttpResponse::Ok().json(UserHistoryResponse {
        user_id: params.user_id.clone(),
        total_events: activity.total_events,
        items,
        events,
    }))
}

/// POST /api/v1/admin/refresh - Reload the dataset and swap in a new snapshot
///
/// The rebuild runs on the blocking pool; queries keep using the active
/// snapshot until the new one is published.
pub async fn refresh_snapshot(state: web::Data<AppState>) -> Result<HttpResponse, EngineError> {
    let store = state.store.clone();
    let engine = state.engine.clone();
    let dataset = state.dataset.clone();

    let publication = web::block(move || {
        store.refresh(|| AppState::build_snapshot(&engine, &dataset))
    })
    .await
    .map_err(|e| {
        error!(error = %e, "Snapshot refresh task failed");
        EngineError::Dataset(format!("refresh task failed: {}", e))
    })??;

    Ok(HttpResponse::Ok().json(publication))
}
