use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::extract::{Path, Query, State};
use axum::Json;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use devcircle_shared::clients::db::DbConn;
use devcircle_shared::errors::{AppError, AppResult, ErrorCode};
use devcircle_shared::types::{ApiResponse, PageParams, Paginated};

use crate::models::{ContentKind, NewUser, UpdateOnboarding, UpdateProfile, User};
use crate::schema::{group_members, groups, users};
use crate::services::{engagement, feed};
use crate::AppState;

const DEFAULT_CONTENT_PER_PAGE: i64 = 4;
const LATEST_CONTENT_LEN: i64 = 3;

fn get_conn(state: &AppState) -> AppResult<DbConn> {
    state.db.get().map_err(|e| AppError::internal(e.to_string()))
}

fn find_user(conn: &mut PgConnection, user_id: Uuid) -> AppResult<User> {
    users::table
        .find(user_id)
        .first::<User>(conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::UserNotFound, "user not found"))
}

fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::internal(format!("password hashing failed: {e}")))
}

fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| AppError::internal(format!("invalid password hash: {e}")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

// --- POST /register ---

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    pub user_name: String,
    #[validate(email(message = "invalid email format"))]
    pub email: String,
    pub password: String,
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> AppResult<Json<ApiResponse<User>>> {
    req.validate()
        .map_err(|e| AppError::new(ErrorCode::ValidationError, e.to_string()))?;

    let mut conn = get_conn(&state)?;
    let email = req.email.to_lowercase();

    let exists: bool = users::table
        .filter(users::email.eq(&email))
        .count()
        .get_result::<i64>(&mut conn)
        .map(|c| c > 0)
        .unwrap_or(false);
    if exists {
        return Err(AppError::new(
            ErrorCode::EmailAlreadyExists,
            "user with provided email already exists",
        ));
    }

    let password_hash = hash_password(&req.password)?;
    let user: User = diesel::insert_into(users::table)
        .values(&NewUser {
            user_name: req.user_name,
            name: None,
            email,
            password: Some(password_hash),
            avatar_img: None,
        })
        .get_result(&mut conn)?;

    tracing::info!(user_id = %user.id, "user registered");
    Ok(Json(ApiResponse::ok(user)))
}

// --- POST /login ---

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<ApiResponse<User>>> {
    let mut conn = get_conn(&state)?;

    let user: User = users::table
        .filter(users::email.eq(req.email.to_lowercase()))
        .first(&mut conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::UserNotFound, "user with provided email not found"))?;

    let Some(ref hash) = user.password else {
        return Err(AppError::new(
            ErrorCode::PasswordMissing,
            "account was created through a provider and has no password",
        ));
    };

    if !verify_password(&req.password, hash)? {
        return Err(AppError::new(ErrorCode::WrongPassword, "you have entered a wrong password"));
    }

    Ok(Json(ApiResponse::ok(user)))
}

// --- POST /login-provider ---

#[derive(Debug, Deserialize, Validate)]
pub struct ProviderLoginRequest {
    #[validate(email(message = "invalid email format"))]
    pub email: String,
    pub name: String,
    pub avatar_img: Option<String>,
}

/// Find-or-provision for OAuth logins: an existing account is returned as
/// is, otherwise a password-less user is created from the provider profile.
pub async fn login_provider(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ProviderLoginRequest>,
) -> AppResult<Json<ApiResponse<User>>> {
    req.validate()
        .map_err(|e| AppError::new(ErrorCode::ValidationError, e.to_string()))?;

    let mut conn = get_conn(&state)?;
    let email = req.email.to_lowercase();

    if let Some(existing) = users::table
        .filter(users::email.eq(&email))
        .first::<User>(&mut conn)
        .optional()?
    {
        return Ok(Json(ApiResponse::ok(existing)));
    }

    let user: User = diesel::insert_into(users::table)
        .values(&NewUser {
            user_name: req.name.clone(),
            name: Some(req.name),
            email,
            password: None,
            avatar_img: req.avatar_img,
        })
        .get_result(&mut conn)?;

    tracing::info!(user_id = %user.id, "provider user provisioned");
    Ok(Json(ApiResponse::ok(user)))
}

// --- GET /email/:email ---

pub async fn get_user_by_email(
    State(state): State<Arc<AppState>>,
    Path(email): Path<String>,
) -> AppResult<Json<ApiResponse<User>>> {
    let mut conn = get_conn(&state)?;

    let user: User = users::table
        .filter(users::email.eq(email.to_lowercase()))
        .first(&mut conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::UserNotFound, "user not found"))?;

    Ok(Json(ApiResponse::ok(user)))
}

// --- GET /:id ---

#[derive(Debug, Serialize)]
pub struct UserProfileResponse {
    pub user: User,
    pub latest_content: Vec<feed::ContentView>,
}

pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<UserProfileResponse>>> {
    let mut conn = get_conn(&state)?;
    let user = find_user(&mut conn, user_id)?;

    let latest = feed::content_feed(
        &mut conn,
        &feed::ContentFilter {
            author_id: Some(user_id),
            ..Default::default()
        },
        Some(feed::FeedSort::Recent),
        &PageParams::new(Some(1), Some(LATEST_CONTENT_LEN), LATEST_CONTENT_LEN),
    )?;

    Ok(Json(ApiResponse::ok(UserProfileResponse {
        user,
        latest_content: latest.items,
    })))
}

// --- GET /:id/content ---

#[derive(Debug, Deserialize)]
pub struct UserContentParams {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub viewer_id: Option<Uuid>,
}

pub async fn get_user_content(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
    Query(params): Query<UserContentParams>,
) -> AppResult<Json<ApiResponse<Paginated<feed::ContentView>>>> {
    let mut conn = get_conn(&state)?;
    find_user(&mut conn, user_id)?;

    let kind = match params.kind {
        Some(ref raw) => Some(ContentKind::parse(raw)?),
        None => Some(ContentKind::Post),
    };

    let page = feed::content_feed(
        &mut conn,
        &feed::ContentFilter {
            kind,
            author_id: Some(user_id),
            viewer_id: params.viewer_id,
            ..Default::default()
        },
        Some(feed::FeedSort::Recent),
        &PageParams::new(params.page, params.limit, DEFAULT_CONTENT_PER_PAGE),
    )?;

    Ok(Json(ApiResponse::ok(page)))
}

// --- GET /:id/groups ---

#[derive(Debug, Serialize)]
pub struct UserGroupCard {
    pub id: Uuid,
    pub name: String,
    pub profile_image: Option<String>,
    pub members_count: i32,
    pub role: String,
}

pub async fn get_user_groups(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Vec<UserGroupCard>>>> {
    let mut conn = get_conn(&state)?;
    find_user(&mut conn, user_id)?;

    let rows: Vec<(Uuid, String, Option<String>, i32, String)> = group_members::table
        .inner_join(groups::table)
        .filter(group_members::user_id.eq(user_id))
        .order(group_members::joined_at.desc())
        .select((
            groups::id,
            groups::name,
            groups::profile_image,
            groups::members_count,
            group_members::role,
        ))
        .load(&mut conn)?;

    let cards = rows
        .into_iter()
        .map(|(id, name, profile_image, members_count, role)| UserGroupCard {
            id,
            name,
            profile_image,
            members_count,
            role,
        })
        .collect();

    Ok(Json(ApiResponse::ok(cards)))
}

// --- PATCH /:id ---

pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
    Json(changes): Json<UpdateProfile>,
) -> AppResult<Json<ApiResponse<User>>> {
    let mut conn = get_conn(&state)?;
    find_user(&mut conn, user_id)?;

    let updated = diesel::update(users::table.find(user_id))
        .set((&changes, users::updated_at.eq(chrono::Utc::now())))
        .get_result::<User>(&mut conn)?;

    Ok(Json(ApiResponse::ok(updated)))
}

// --- PATCH /:id/onboarding ---

pub async fn update_onboarding(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
    Json(changes): Json<UpdateOnboarding>,
) -> AppResult<Json<ApiResponse<User>>> {
    let mut conn = get_conn(&state)?;
    find_user(&mut conn, user_id)?;

    let updated = diesel::update(users::table.find(user_id))
        .set((&changes, users::updated_at.eq(chrono::Utc::now())))
        .get_result::<User>(&mut conn)?;

    tracing::info!(user_id = %user_id, "onboarding updated");
    Ok(Json(ApiResponse::ok(updated)))
}

// --- DELETE /:id ---

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub deleted: bool,
}

pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<DeletedResponse>>> {
    let mut conn = get_conn(&state)?;
    find_user(&mut conn, user_id)?;

    diesel::delete(users::table.find(user_id)).execute(&mut conn)?;

    tracing::info!(user_id = %user_id, "user deleted");
    Ok(Json(ApiResponse::ok(DeletedResponse { deleted: true })))
}

// --- POST /:id/follow, DELETE /:id/follow ---

#[derive(Debug, Deserialize)]
pub struct FollowRequest {
    pub follower_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct FollowResponse {
    pub following: bool,
}

pub async fn follow_user(
    State(state): State<Arc<AppState>>,
    Path(target_id): Path<Uuid>,
    Json(req): Json<FollowRequest>,
) -> AppResult<Json<ApiResponse<FollowResponse>>> {
    let mut conn = get_conn(&state)?;
    engagement::follow_user(&mut conn, req.follower_id, target_id)?;
    Ok(Json(ApiResponse::ok(FollowResponse { following: true })))
}

pub async fn unfollow_user(
    State(state): State<Arc<AppState>>,
    Path(target_id): Path<Uuid>,
    Json(req): Json<FollowRequest>,
) -> AppResult<Json<ApiResponse<FollowResponse>>> {
    let mut conn = get_conn(&state)?;
    engagement::unfollow_user(&mut conn, req.follower_id, target_id)?;
    Ok(Json(ApiResponse::ok(FollowResponse { following: false })))
}
