use axum::{
    extract::{RawQuery, State},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::admission::AdmissionController;
use crate::domains::{EventSearch, IdolSearch, SearchDomain, SearchService, TagSearch};
use crate::error::Result;
use crate::query::{RawParams, ResultEnvelope, Store};
use crate::response::HealthResponse;

/// Record storage shared by every listing.
pub type DocumentStore = Arc<dyn Store<Record = Value>>;

/// Application state shared by handlers and middleware
#[derive(Clone)]
pub struct AppState {
    pub admission: Arc<AdmissionController>,
    pub trust_forwarded_headers: bool,
    pub idols: Arc<SearchService<IdolSearch, DocumentStore>>,
    pub events: Arc<SearchService<EventSearch, DocumentStore>>,
    pub tags: Arc<SearchService<TagSearch, DocumentStore>>,
}

/// List idols matching the query string
pub async fn list_idols(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Result<Json<ResultEnvelope<Value>>> {
    run_search(&state.idols, query).await
}

/// List events matching the query string
pub async fn list_events(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Result<Json<ResultEnvelope<Value>>> {
    run_search(&state.events, query).await
}

/// List tags matching the query string
pub async fn list_tags(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Result<Json<ResultEnvelope<Value>>> {
    run_search(&state.tags, query).await
}

async fn run_search<D, S>(
    service: &SearchService<D, S>,
    query: Option<String>,
) -> Result<Json<ResultEnvelope<S::Record>>>
where
    D: SearchDomain,
    S: Store,
    S::Record: Serialize,
{
    let params = RawParams::from_query(query.as_deref().unwrap_or_default());

    // A client that disconnects drops this future; the guard then cancels
    // the in-flight store calls.
    let cancel = CancellationToken::new();
    let _guard: DropGuard = cancel.clone().drop_guard();

    let envelope = service.search(&params, &cancel).await?;
    Ok(Json(envelope))
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(
        state.admission.tracked_clients(),
        state.admission.settings().clone(),
    ))
}
