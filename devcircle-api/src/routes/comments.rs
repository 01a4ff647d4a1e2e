use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use devcircle_shared::clients::db::DbConn;
use devcircle_shared::errors::{AppError, AppResult};
use devcircle_shared::types::ApiResponse;

use crate::models::{Comment, NewComment};
use crate::services::{comments, engagement};
use crate::AppState;

fn get_conn(state: &AppState) -> AppResult<DbConn> {
    state.db.get().map_err(|e| AppError::internal(e.to_string()))
}

// --- POST /comment ---

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCommentRequest {
    #[validate(length(min = 3, message = "comment must be at least 3 characters long"))]
    pub body: String,
    pub author_id: Uuid,
    pub content_id: Uuid,
    pub replying_to_id: Option<Uuid>,
}

pub async fn create_comment(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateCommentRequest>,
) -> AppResult<Json<ApiResponse<Comment>>> {
    req.validate().map_err(|e| AppError::Validation(e.to_string()))?;

    let mut conn = get_conn(&state)?;
    let comment = comments::create_comment(
        &mut conn,
        NewComment {
            body: req.body,
            author_id: req.author_id,
            content_id: req.content_id,
            replying_to_id: req.replying_to_id,
        },
    )?;

    Ok(Json(ApiResponse::ok(comment)))
}

// --- PATCH /comment/update ---

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCommentRequest {
    pub comment_id: Uuid,
    pub author_id: Uuid,
    #[validate(length(min = 3, message = "comment must be at least 3 characters long"))]
    pub body: String,
}

pub async fn update_comment(
    State(state): State<Arc<AppState>>,
    Json(req): Json<UpdateCommentRequest>,
) -> AppResult<Json<ApiResponse<Comment>>> {
    req.validate().map_err(|e| AppError::Validation(e.to_string()))?;

    let mut conn = get_conn(&state)?;
    let updated = comments::update_comment(&mut conn, req.comment_id, req.author_id, req.body)?;
    Ok(Json(ApiResponse::ok(updated)))
}

// --- DELETE /comment/delete ---

#[derive(Debug, Deserialize)]
pub struct DeleteCommentRequest {
    pub comment_id: Uuid,
    pub author_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub deleted: bool,
}

pub async fn delete_comment(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DeleteCommentRequest>,
) -> AppResult<Json<ApiResponse<DeletedResponse>>> {
    let mut conn = get_conn(&state)?;
    comments::delete_comment(&mut conn, req.comment_id, req.author_id)?;
    Ok(Json(ApiResponse::ok(DeletedResponse { deleted: true })))
}

// --- GET /:id/comment ---

#[derive(Debug, Deserialize)]
pub struct CommentListParams {
    pub viewer_id: Option<Uuid>,
}

pub async fn list_comments(
    State(state): State<Arc<AppState>>,
    Path(content_id): Path<Uuid>,
    Query(params): Query<CommentListParams>,
) -> AppResult<Json<ApiResponse<Vec<comments::CommentView>>>> {
    let mut conn = get_conn(&state)?;
    let threaded = comments::comments_for_content(&mut conn, content_id, params.viewer_id)?;
    Ok(Json(ApiResponse::ok(threaded)))
}

// --- POST /comment/like, DELETE /comment/like ---

#[derive(Debug, Deserialize)]
pub struct CommentLikeRequest {
    pub comment_id: Uuid,
    pub user_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct LikedResponse {
    pub liked: bool,
}

pub async fn like_comment(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CommentLikeRequest>,
) -> AppResult<Json<ApiResponse<LikedResponse>>> {
    let mut conn = get_conn(&state)?;
    engagement::like_comment(&mut conn, req.user_id, req.comment_id)?;
    Ok(Json(ApiResponse::ok(LikedResponse { liked: true })))
}

pub async fn unlike_comment(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CommentLikeRequest>,
) -> AppResult<Json<ApiResponse<LikedResponse>>> {
    let mut conn = get_conn(&state)?;
    engagement::unlike_comment(&mut conn, req.user_id, req.comment_id)?;
    Ok(Json(ApiResponse::ok(LikedResponse { liked: false })))
}
