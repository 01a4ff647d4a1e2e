use axum::extract::{Query, State};
use axum::Json;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use devcircle_shared::errors::{AppError, AppResult};
use devcircle_shared::types::ApiResponse;

use crate::schema::{contents, groups};
use crate::AppState;

const HITS_PER_ENTITY: i64 = 3;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    q: String,
}

#[derive(Debug, Serialize)]
pub struct SearchHit {
    pub id: Uuid,
    pub title: String,
    /// POST/MEETUP/PODCAST for content hits, absent for group hits.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

/// GET /api/search?q= — merged title match over groups and content,
/// at most three hits from each.
pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> AppResult<Json<ApiResponse<Vec<SearchHit>>>> {
    let query = params.q.trim().to_string();
    if query.is_empty() {
        return Ok(Json(ApiResponse::ok(vec![])));
    }

    let pattern = format!("%{query}%");
    let mut conn = state.db.get().map_err(|e| AppError::internal(e.to_string()))?;

    let group_hits: Vec<(Uuid, String)> = groups::table
        .filter(groups::name.ilike(&pattern))
        .limit(HITS_PER_ENTITY)
        .select((groups::id, groups::name))
        .load(&mut conn)?;

    let content_hits: Vec<(Uuid, String, String)> = contents::table
        .filter(contents::title.ilike(&pattern))
        .limit(HITS_PER_ENTITY)
        .select((contents::id, contents::title, contents::content_type))
        .load(&mut conn)?;

    let mut hits: Vec<SearchHit> = group_hits
        .into_iter()
        .map(|(id, title)| SearchHit { id, title, content_type: None })
        .collect();
    hits.extend(content_hits.into_iter().map(|(id, title, content_type)| SearchHit {
        id,
        title,
        content_type: Some(content_type),
    }));

    Ok(Json(ApiResponse::ok(hits)))
}
