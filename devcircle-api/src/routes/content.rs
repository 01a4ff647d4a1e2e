use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use devcircle_shared::clients::db::DbConn;
use devcircle_shared::errors::{AppError, AppResult};
use devcircle_shared::types::{ApiResponse, PageParams, Paginated};

use crate::models::{Content, ContentKind, NewContent, Tag, UpdateContent};
use crate::services::{content, engagement, feed, tags};
use crate::AppState;

const DEFAULT_CONTENT_PER_PAGE: i64 = 4;
const SIDEBAR_MEETUPS: i64 = 3;
const SIDEBAR_PODCASTS: i64 = 3;
const SIDEBAR_POSTS: i64 = 2;

fn get_conn(state: &AppState) -> AppResult<DbConn> {
    state.db.get().map_err(|e| AppError::internal(e.to_string()))
}

// --- GET / ---

#[derive(Debug, Deserialize)]
pub struct ContentFeedParams {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub sort_by: Option<feed::FeedSort>,
    pub viewer_id: Option<Uuid>,
}

pub async fn get_content_feed(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ContentFeedParams>,
) -> AppResult<Json<ApiResponse<Paginated<feed::ContentView>>>> {
    let kind = match params.kind {
        Some(ref raw) => Some(ContentKind::parse(raw)?),
        None => None,
    };

    let mut conn = get_conn(&state)?;
    let page = feed::content_feed(
        &mut conn,
        &feed::ContentFilter {
            kind,
            viewer_id: params.viewer_id,
            ..Default::default()
        },
        params.sort_by,
        &PageParams::new(params.page, params.limit, DEFAULT_CONTENT_PER_PAGE),
    )?;

    Ok(Json(ApiResponse::ok(page)))
}

// --- GET /stats ---

#[derive(Debug, Serialize)]
pub struct ContentStatsResponse {
    pub meetups: Vec<feed::ContentView>,
    pub podcasts: Vec<feed::ContentView>,
    pub posts: Vec<feed::ContentView>,
}

pub async fn get_content_stats(
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<ContentStatsResponse>>> {
    let mut conn = get_conn(&state)?;

    let meetups = feed::latest_of_kind(&mut conn, ContentKind::Meetup, SIDEBAR_MEETUPS)?;
    let podcasts = feed::latest_of_kind(&mut conn, ContentKind::Podcast, SIDEBAR_PODCASTS)?;
    let posts = feed::latest_of_kind(&mut conn, ContentKind::Post, SIDEBAR_POSTS)?;

    Ok(Json(ApiResponse::ok(ContentStatsResponse { meetups, podcasts, posts })))
}

// --- GET /tags ---

#[derive(Debug, Deserialize)]
pub struct TagSearchParams {
    pub title: Option<String>,
    pub limit: Option<i64>,
}

pub async fn get_tags(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TagSearchParams>,
) -> AppResult<Json<ApiResponse<Vec<Tag>>>> {
    let mut conn = get_conn(&state)?;
    let needle = params.title.unwrap_or_default();
    let limit = params.limit.unwrap_or(20).clamp(1, 50);
    let found = tags::search_by_title(&mut conn, needle.trim(), limit)?;
    Ok(Json(ApiResponse::ok(found)))
}

// --- GET /:id ---

#[derive(Debug, Serialize)]
pub struct ContentDetail {
    #[serde(flatten)]
    pub content: Content,
    pub tags: Vec<Tag>,
    pub author: Option<feed::AuthorCard>,
}

pub async fn get_content_by_id(
    State(state): State<Arc<AppState>>,
    Path(content_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<ContentDetail>>> {
    let mut conn = get_conn(&state)?;

    let item = content::view_content(&mut conn, content_id)?;
    let attached = tags::tags_for_content(&mut conn, content_id)?;
    let author = feed::author_cards(&mut conn, std::iter::once(item.author_id))?
        .remove(&item.author_id);

    Ok(Json(ApiResponse::ok(ContentDetail {
        content: item,
        tags: attached,
        author,
    })))
}

// --- POST /post /meetup /podcast ---

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePostRequest {
    #[validate(length(min = 2, message = "title must be at least 2 characters long"))]
    pub title: String,
    #[validate(length(min = 3, message = "description must be at least 3 characters long"))]
    pub description: String,
    pub cover_image: Option<String>,
    pub author_id: Uuid,
    pub group_id: Option<Uuid>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ContentResponse {
    #[serde(flatten)]
    pub content: Content,
    pub tags: Vec<Tag>,
}

pub async fn create_post(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreatePostRequest>,
) -> AppResult<Json<ApiResponse<ContentResponse>>> {
    req.validate().map_err(|e| AppError::Validation(e.to_string()))?;

    let mut conn = get_conn(&state)?;
    let (created, attached) = content::create_with_tags(
        &mut conn,
        NewContent {
            content_type: ContentKind::Post.as_str().to_string(),
            title: req.title,
            description: req.description,
            cover_image: req.cover_image,
            author_id: req.author_id,
            group_id: req.group_id,
            meetup_location: None,
            meetup_location_image: None,
            meetup_date: None,
            podcast_file: None,
            podcast_title: None,
        },
        &req.tags,
    )?;

    Ok(Json(ApiResponse::ok(ContentResponse { content: created, tags: attached })))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateMeetupRequest {
    #[validate(length(min = 2, message = "title must be at least 2 characters long"))]
    pub title: String,
    #[validate(length(min = 3, message = "description must be at least 3 characters long"))]
    pub description: String,
    pub cover_image: Option<String>,
    pub author_id: Uuid,
    pub group_id: Option<Uuid>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[validate(length(min = 1, message = "location must not be empty"))]
    pub meetup_location: String,
    pub meetup_location_image: Option<String>,
    pub meetup_date: DateTime<Utc>,
}

pub async fn create_meetup(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateMeetupRequest>,
) -> AppResult<Json<ApiResponse<ContentResponse>>> {
    req.validate().map_err(|e| AppError::Validation(e.to_string()))?;

    let mut conn = get_conn(&state)?;
    let (created, attached) = content::create_with_tags(
        &mut conn,
        NewContent {
            content_type: ContentKind::Meetup.as_str().to_string(),
            title: req.title,
            description: req.description,
            cover_image: req.cover_image,
            author_id: req.author_id,
            group_id: req.group_id,
            meetup_location: Some(req.meetup_location),
            meetup_location_image: req.meetup_location_image,
            meetup_date: Some(req.meetup_date),
            podcast_file: None,
            podcast_title: None,
        },
        &req.tags,
    )?;

    Ok(Json(ApiResponse::ok(ContentResponse { content: created, tags: attached })))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePodcastRequest {
    #[validate(length(min = 2, message = "title must be at least 2 characters long"))]
    pub title: String,
    #[validate(length(min = 3, message = "description must be at least 3 characters long"))]
    pub description: String,
    pub cover_image: Option<String>,
    pub author_id: Uuid,
    pub group_id: Option<Uuid>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[validate(url(message = "podcast file must be a valid URL"))]
    pub podcast_file: String,
    #[validate(length(min = 2, message = "podcast title must be at least 2 characters long"))]
    pub podcast_title: String,
}

pub async fn create_podcast(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreatePodcastRequest>,
) -> AppResult<Json<ApiResponse<ContentResponse>>> {
    req.validate().map_err(|e| AppError::Validation(e.to_string()))?;

    let mut conn = get_conn(&state)?;
    let (created, attached) = content::create_with_tags(
        &mut conn,
        NewContent {
            content_type: ContentKind::Podcast.as_str().to_string(),
            title: req.title,
            description: req.description,
            cover_image: req.cover_image,
            author_id: req.author_id,
            group_id: req.group_id,
            meetup_location: None,
            meetup_location_image: None,
            meetup_date: None,
            podcast_file: Some(req.podcast_file),
            podcast_title: Some(req.podcast_title),
        },
        &req.tags,
    )?;

    Ok(Json(ApiResponse::ok(ContentResponse { content: created, tags: attached })))
}

// --- PATCH /post/:id /meetup/:id /podcast/:id ---

#[derive(Debug, Deserialize)]
pub struct UpdatePostRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub cover_image: Option<String>,
    pub tags: Option<Vec<String>>,
}

pub async fn update_post(
    State(state): State<Arc<AppState>>,
    Path(content_id): Path<Uuid>,
    Json(req): Json<UpdatePostRequest>,
) -> AppResult<Json<ApiResponse<ContentResponse>>> {
    let mut conn = get_conn(&state)?;
    let (updated, attached) = content::update_with_tags(
        &mut conn,
        content_id,
        ContentKind::Post,
        UpdateContent {
            title: req.title,
            description: req.description,
            cover_image: req.cover_image,
            ..Default::default()
        },
        req.tags.as_deref(),
    )?;

    Ok(Json(ApiResponse::ok(ContentResponse { content: updated, tags: attached })))
}

#[derive(Debug, Deserialize)]
pub struct UpdateMeetupRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub cover_image: Option<String>,
    pub tags: Option<Vec<String>>,
    pub meetup_location: Option<String>,
    pub meetup_location_image: Option<String>,
    pub meetup_date: Option<DateTime<Utc>>,
}

pub async fn update_meetup(
    State(state): State<Arc<AppState>>,
    Path(content_id): Path<Uuid>,
    Json(req): Json<UpdateMeetupRequest>,
) -> AppResult<Json<ApiResponse<ContentResponse>>> {
    let mut conn = get_conn(&state)?;
    let (updated, attached) = content::update_with_tags(
        &mut conn,
        content_id,
        ContentKind::Meetup,
        UpdateContent {
            title: req.title,
            description: req.description,
            cover_image: req.cover_image,
            meetup_location: req.meetup_location,
            meetup_location_image: req.meetup_location_image,
            meetup_date: req.meetup_date,
            ..Default::default()
        },
        req.tags.as_deref(),
    )?;

    Ok(Json(ApiResponse::ok(ContentResponse { content: updated, tags: attached })))
}

#[derive(Debug, Deserialize)]
pub struct UpdatePodcastRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub cover_image: Option<String>,
    pub tags: Option<Vec<String>>,
    pub podcast_file: Option<String>,
    pub podcast_title: Option<String>,
}

pub async fn update_podcast(
    State(state): State<Arc<AppState>>,
    Path(content_id): Path<Uuid>,
    Json(req): Json<UpdatePodcastRequest>,
) -> AppResult<Json<ApiResponse<ContentResponse>>> {
    let mut conn = get_conn(&state)?;
    let (updated, attached) = content::update_with_tags(
        &mut conn,
        content_id,
        ContentKind::Podcast,
        UpdateContent {
            title: req.title,
            description: req.description,
            cover_image: req.cover_image,
            podcast_file: req.podcast_file,
            podcast_title: req.podcast_title,
            ..Default::default()
        },
        req.tags.as_deref(),
    )?;

    Ok(Json(ApiResponse::ok(ContentResponse { content: updated, tags: attached })))
}

// --- DELETE /:id/delete ---

#[derive(Debug, Deserialize)]
pub struct ViewerBody {
    pub viewer_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub deleted: bool,
}

pub async fn delete_content(
    State(state): State<Arc<AppState>>,
    Path(content_id): Path<Uuid>,
    Json(req): Json<ViewerBody>,
) -> AppResult<Json<ApiResponse<DeletedResponse>>> {
    let mut conn = get_conn(&state)?;
    content::delete_content(&mut conn, content_id, req.viewer_id)?;
    Ok(Json(ApiResponse::ok(DeletedResponse { deleted: true })))
}

// --- POST /:id/like, DELETE /:id/dislike ---

#[derive(Debug, Deserialize)]
pub struct LikeBody {
    pub user_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct LikedResponse {
    pub liked: bool,
}

pub async fn like_content(
    State(state): State<Arc<AppState>>,
    Path(content_id): Path<Uuid>,
    Json(req): Json<LikeBody>,
) -> AppResult<Json<ApiResponse<LikedResponse>>> {
    let mut conn = get_conn(&state)?;
    engagement::like_content(&mut conn, req.user_id, content_id)?;
    Ok(Json(ApiResponse::ok(LikedResponse { liked: true })))
}

pub async fn dislike_content(
    State(state): State<Arc<AppState>>,
    Path(content_id): Path<Uuid>,
    Json(req): Json<LikeBody>,
) -> AppResult<Json<ApiResponse<LikedResponse>>> {
    let mut conn = get_conn(&state)?;
    engagement::unlike_content(&mut conn, req.user_id, content_id)?;
    Ok(Json(ApiResponse::ok(LikedResponse { liked: false })))
}
