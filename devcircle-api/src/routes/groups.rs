use axum::extract::{Path, Query, State};
use axum::Json;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use devcircle_shared::clients::db::DbConn;
use devcircle_shared::errors::{AppError, AppResult};
use devcircle_shared::types::{ApiResponse, PageParams, Paginated};

use crate::models::{ContentKind, Group, GroupMember, MemberRole, NewGroup, UpdateGroup};
use crate::services::{feed, membership};
use crate::AppState;

const DEFAULT_GROUPS_PER_PAGE: i64 = 4;
const DEFAULT_MEMBERS_PER_PAGE: i64 = 15;
const DEFAULT_CONTENT_PER_PAGE: i64 = 4;
const DETAIL_MEMBER_PREVIEW: i64 = 15;
const DETAIL_MEETUPS: i64 = 3;
const SIDEBAR_GROUPS: i64 = 5;
const SIDEBAR_MEETUPS: i64 = 3;
const SIDEBAR_PODCASTS: i64 = 3;
const SIDEBAR_POSTS: i64 = 2;

fn get_conn(state: &AppState) -> AppResult<DbConn> {
    state.db.get().map_err(|e| AppError::internal(e.to_string()))
}

// --- GET / ---

#[derive(Debug, Deserialize)]
pub struct GroupFeedParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub q: Option<String>,
    pub sort_by: Option<feed::GroupSort>,
    pub viewer_id: Option<Uuid>,
    #[serde(default)]
    pub members: bool,
}

pub async fn list_groups(
    State(state): State<Arc<AppState>>,
    Query(params): Query<GroupFeedParams>,
) -> AppResult<Json<ApiResponse<Paginated<feed::GroupCard>>>> {
    let mut conn = get_conn(&state)?;

    let page = feed::group_feed(
        &mut conn,
        &feed::GroupFilter {
            name_query: params.q,
            viewer_id: params.viewer_id,
        },
        params.sort_by,
        params.members,
        &PageParams::new(params.page, params.limit, DEFAULT_GROUPS_PER_PAGE),
    )?;

    Ok(Json(ApiResponse::ok(page)))
}

// --- GET /stats ---

#[derive(Debug, Serialize)]
pub struct GroupStatsResponse {
    pub top_ranked_groups: Vec<feed::GroupRankCard>,
    pub top_active_groups: Vec<feed::GroupRankCard>,
    pub meetups: Vec<feed::ContentView>,
    pub podcasts: Vec<feed::ContentView>,
    pub posts: Vec<feed::ContentView>,
}

pub async fn group_stats(
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<GroupStatsResponse>>> {
    let mut conn = get_conn(&state)?;

    Ok(Json(ApiResponse::ok(GroupStatsResponse {
        top_ranked_groups: feed::top_ranked_groups(&mut conn, SIDEBAR_GROUPS)?,
        top_active_groups: feed::top_active_groups(&mut conn, SIDEBAR_GROUPS)?,
        meetups: feed::latest_of_kind(&mut conn, ContentKind::Meetup, SIDEBAR_MEETUPS)?,
        podcasts: feed::latest_of_kind(&mut conn, ContentKind::Podcast, SIDEBAR_PODCASTS)?,
        posts: feed::latest_of_kind(&mut conn, ContentKind::Post, SIDEBAR_POSTS)?,
    })))
}

// --- POST / ---

#[derive(Debug, Deserialize, Validate)]
pub struct CreateGroupRequest {
    pub author_id: Uuid,
    #[validate(length(min = 1, message = "group name must not be empty"))]
    pub name: String,
    #[validate(length(min = 3, message = "bio must be at least 3 characters long"))]
    pub bio: String,
    pub profile_image: Option<String>,
    pub cover_image: Option<String>,
    #[serde(default)]
    pub members: Vec<membership::SeedMember>,
}

pub async fn create_group(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateGroupRequest>,
) -> AppResult<Json<ApiResponse<Group>>> {
    req.validate().map_err(|e| AppError::Validation(e.to_string()))?;

    let mut conn = get_conn(&state)?;
    let group = membership::create_group(
        &mut conn,
        NewGroup {
            author_id: req.author_id,
            name: req.name,
            bio: req.bio,
            profile_image: req.profile_image,
            cover_image: req.cover_image,
        },
        req.members,
    )?;

    Ok(Json(ApiResponse::ok(group)))
}

// --- GET /:id ---

/// The detail endpoint resolves its optional sections from one struct of
/// named flags; each flag maps to one named section of the response.
#[derive(Debug, Deserialize)]
pub struct GroupDetailQuery {
    #[serde(default)]
    pub members: bool,
    #[serde(default)]
    pub stats: bool,
    #[serde(default)]
    pub meetups: bool,
    #[serde(default)]
    pub top_ranked_groups: bool,
    pub viewer_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct GroupStats {
    pub members_count: i32,
    pub contents_count: i32,
}

#[derive(Debug, Serialize)]
pub struct GroupDetailResponse {
    pub group: Group,
    pub author_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<GroupStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub members: Option<Vec<feed::MemberCard>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meetups: Option<Vec<feed::ContentView>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_ranked_groups: Option<Vec<feed::GroupRankCard>>,
    pub is_group_owner: bool,
    pub is_group_admin: bool,
    pub is_group_member: bool,
}

pub async fn get_group(
    State(state): State<Arc<AppState>>,
    Path(group_id): Path<Uuid>,
    Query(query): Query<GroupDetailQuery>,
) -> AppResult<Json<ApiResponse<GroupDetailResponse>>> {
    let mut conn = get_conn(&state)?;
    let group = membership::find_group(&mut conn, group_id)?;

    let author_name: Option<String> = crate::schema::users::table
        .find(group.author_id)
        .select(crate::schema::users::user_name)
        .first(&mut conn)
        .optional()?;

    let stats = query.stats.then(|| GroupStats {
        members_count: group.members_count,
        contents_count: group.contents_count,
    });

    let members = if query.members {
        let page = feed::group_members_page(
            &mut conn,
            group_id,
            None,
            &PageParams::new(Some(1), Some(DETAIL_MEMBER_PREVIEW), DETAIL_MEMBER_PREVIEW),
        )?;
        Some(page.items)
    } else {
        None
    };

    let meetups = if query.meetups {
        Some(feed::group_meetups(&mut conn, group_id, DETAIL_MEETUPS)?)
    } else {
        None
    };

    let top_ranked_groups = if query.top_ranked_groups {
        Some(feed::top_ranked_groups(&mut conn, SIDEBAR_GROUPS)?)
    } else {
        None
    };

    let (is_group_owner, is_group_admin, is_group_member) = match query.viewer_id {
        Some(viewer_id) => {
            let viewer = membership::find_member(&mut conn, group_id, viewer_id)?;
            let viewer_role = viewer.as_ref().and_then(|m| MemberRole::from_stored(&m.role));
            (
                group.author_id == viewer_id,
                viewer_role == Some(MemberRole::Admin),
                viewer.is_some(),
            )
        }
        None => (false, false, false),
    };

    Ok(Json(ApiResponse::ok(GroupDetailResponse {
        group,
        author_name,
        stats,
        members,
        meetups,
        top_ranked_groups,
        is_group_owner,
        is_group_admin,
        is_group_member,
    })))
}

// --- PATCH /:id ---

#[derive(Debug, Deserialize)]
pub struct UpdateGroupRequest {
    pub viewer_id: Uuid,
    pub name: Option<String>,
    pub bio: Option<String>,
    pub profile_image: Option<String>,
    pub cover_image: Option<String>,
}

pub async fn update_group(
    State(state): State<Arc<AppState>>,
    Path(group_id): Path<Uuid>,
    Json(req): Json<UpdateGroupRequest>,
) -> AppResult<Json<ApiResponse<Group>>> {
    let mut conn = get_conn(&state)?;
    let updated = membership::update_group(
        &mut conn,
        group_id,
        req.viewer_id,
        UpdateGroup {
            name: req.name,
            bio: req.bio,
            profile_image: req.profile_image,
            cover_image: req.cover_image,
        },
    )?;
    Ok(Json(ApiResponse::ok(updated)))
}

// --- GET /:id/members ---

#[derive(Debug, Deserialize)]
pub struct GroupMembersParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub role: Option<MemberRole>,
}

pub async fn get_group_members(
    State(state): State<Arc<AppState>>,
    Path(group_id): Path<Uuid>,
    Query(params): Query<GroupMembersParams>,
) -> AppResult<Json<ApiResponse<Paginated<feed::MemberCard>>>> {
    let mut conn = get_conn(&state)?;
    membership::find_group(&mut conn, group_id)?;

    let page = feed::group_members_page(
        &mut conn,
        group_id,
        params.role,
        &PageParams::new(params.page, params.limit, DEFAULT_MEMBERS_PER_PAGE),
    )?;

    Ok(Json(ApiResponse::ok(page)))
}

// --- GET /:id/content ---

#[derive(Debug, Deserialize)]
pub struct GroupContentParams {
    #[serde(rename = "type")]
    pub kind: String,
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub viewer_id: Option<Uuid>,
}

pub async fn get_group_content(
    State(state): State<Arc<AppState>>,
    Path(group_id): Path<Uuid>,
    Query(params): Query<GroupContentParams>,
) -> AppResult<Json<ApiResponse<Paginated<feed::ContentView>>>> {
    let mut conn = get_conn(&state)?;
    membership::find_group(&mut conn, group_id)?;

    let kind = ContentKind::parse(&params.kind)?;
    let page = feed::content_feed(
        &mut conn,
        &feed::ContentFilter {
            kind: Some(kind),
            group_id: Some(group_id),
            viewer_id: params.viewer_id,
            ..Default::default()
        },
        Some(feed::FeedSort::Recent),
        &PageParams::new(params.page, params.limit, DEFAULT_CONTENT_PER_PAGE),
    )?;

    Ok(Json(ApiResponse::ok(page)))
}

// --- Membership mutations ---

#[derive(Debug, Deserialize)]
pub struct MemberSelfBody {
    pub user_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct MemberActionBody {
    pub viewer_id: Uuid,
    pub user_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct RemovedResponse {
    pub removed: bool,
}

pub async fn join_group(
    State(state): State<Arc<AppState>>,
    Path(group_id): Path<Uuid>,
    Json(req): Json<MemberSelfBody>,
) -> AppResult<Json<ApiResponse<GroupMember>>> {
    let mut conn = get_conn(&state)?;
    let member = membership::join_group(&mut conn, group_id, req.user_id)?;
    Ok(Json(ApiResponse::ok(member)))
}

pub async fn leave_group(
    State(state): State<Arc<AppState>>,
    Path(group_id): Path<Uuid>,
    Json(req): Json<MemberSelfBody>,
) -> AppResult<Json<ApiResponse<RemovedResponse>>> {
    let mut conn = get_conn(&state)?;
    membership::leave_group(&mut conn, group_id, req.user_id)?;
    Ok(Json(ApiResponse::ok(RemovedResponse { removed: true })))
}

pub async fn remove_member(
    State(state): State<Arc<AppState>>,
    Path(group_id): Path<Uuid>,
    Json(req): Json<MemberActionBody>,
) -> AppResult<Json<ApiResponse<RemovedResponse>>> {
    let mut conn = get_conn(&state)?;
    membership::remove_member(&mut conn, group_id, req.viewer_id, req.user_id)?;
    Ok(Json(ApiResponse::ok(RemovedResponse { removed: true })))
}

pub async fn assign_admin(
    State(state): State<Arc<AppState>>,
    Path(group_id): Path<Uuid>,
    Json(req): Json<MemberActionBody>,
) -> AppResult<Json<ApiResponse<GroupMember>>> {
    let mut conn = get_conn(&state)?;
    let member = membership::assign_admin(&mut conn, group_id, req.viewer_id, req.user_id)?;
    Ok(Json(ApiResponse::ok(member)))
}

pub async fn remove_admin(
    State(state): State<Arc<AppState>>,
    Path(group_id): Path<Uuid>,
    Json(req): Json<MemberActionBody>,
) -> AppResult<Json<ApiResponse<GroupMember>>> {
    let mut conn = get_conn(&state)?;
    let member = membership::remove_admin(&mut conn, group_id, req.viewer_id, req.user_id)?;
    Ok(Json(ApiResponse::ok(member)))
}

// --- DELETE /:id/delete ---

pub async fn delete_group(
    State(state): State<Arc<AppState>>,
    Path(group_id): Path<Uuid>,
    Json(req): Json<MemberSelfBody>,
) -> AppResult<Json<ApiResponse<RemovedResponse>>> {
    let mut conn = get_conn(&state)?;
    membership::delete_group(&mut conn, group_id, req.user_id)?;
    Ok(Json(ApiResponse::ok(RemovedResponse { removed: true })))
}
