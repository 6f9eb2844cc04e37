//! Key-value endpoint routes.

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};

use crate::auth::AuthUser;
use crate::error::Result;
use crate::handlers::{
    handle_get, handle_list, handle_put, EntryResponse, ListQuery, ListResponse, PutRequest,
    PutResponse,
};
use crate::AppState;

/// Create key-value routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/kv", get(list_handler))
        .route("/kv/{key}", get(get_handler).put(put_handler))
}

/// GET /kv?prefix=P - List rows by key prefix.
async fn list_handler(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListResponse>> {
    let response = handle_list(&state.pool, query).await?;
    Ok(Json(response))
}

/// GET /kv/{key} - Fetch one row.
async fn get_handler(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(key): Path<String>,
) -> Result<Json<EntryResponse>> {
    let response = handle_get(&state.pool, &key).await?;
    Ok(Json(response))
}

/// PUT /kv/{key} - Insert or overwrite one row.
async fn put_handler(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(key): Path<String>,
    Json(request): Json<PutRequest>,
) -> Result<Json<PutResponse>> {
    let response = handle_put(&state.pool, &key, request).await?;
    Ok(Json(response))
}
