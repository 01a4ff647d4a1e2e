use axum::{
    routing::{delete, get, patch, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

mod config;
mod models;
mod routes;
mod schema;
mod services;

use config::AppConfig;
use devcircle_shared::clients::db::{create_pool, DbPool};

pub struct AppState {
    pub db: DbPool,
    pub config: AppConfig,
    pub metrics_handle: PrometheusHandle,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    devcircle_shared::middleware::init_tracing("devcircle-api");

    let config = AppConfig::load()?;
    let port = config.port;

    let db = create_pool(&config.database_url);
    let metrics_handle = devcircle_shared::middleware::init_metrics();

    let state = Arc::new(AppState { db, config, metrics_handle });

    let user_routes = Router::new()
        .route("/register", post(routes::users::register))
        .route("/login", post(routes::users::login))
        .route("/login-provider", post(routes::users::login_provider))
        .route("/email/:email", get(routes::users::get_user_by_email))
        .route("/:id", get(routes::users::get_user)
            .patch(routes::users::update_profile)
            .delete(routes::users::delete_user))
        .route("/:id/onboarding", patch(routes::users::update_onboarding))
        .route("/:id/content", get(routes::users::get_user_content))
        .route("/:id/groups", get(routes::users::get_user_groups))
        .route("/:id/follow", post(routes::users::follow_user)
            .delete(routes::users::unfollow_user));

    let content_routes = Router::new()
        .route("/", get(routes::content::get_content_feed))
        .route("/stats", get(routes::content::get_content_stats))
        .route("/tags", get(routes::content::get_tags))
        .route("/post", post(routes::content::create_post))
        .route("/meetup", post(routes::content::create_meetup))
        .route("/podcast", post(routes::content::create_podcast))
        .route("/post/:id", patch(routes::content::update_post))
        .route("/meetup/:id", patch(routes::content::update_meetup))
        .route("/podcast/:id", patch(routes::content::update_podcast))
        .route("/comment", post(routes::comments::create_comment))
        .route("/comment/update", patch(routes::comments::update_comment))
        .route("/comment/delete", delete(routes::comments::delete_comment))
        .route("/comment/like", post(routes::comments::like_comment)
            .delete(routes::comments::unlike_comment))
        .route("/:id/comment", get(routes::comments::list_comments))
        .route("/:id/like", post(routes::content::like_content))
        .route("/:id/dislike", delete(routes::content::dislike_content))
        .route("/:id/delete", delete(routes::content::delete_content))
        .route("/:id", get(routes::content::get_content_by_id));

    let group_routes = Router::new()
        .route("/", get(routes::groups::list_groups).post(routes::groups::create_group))
        .route("/stats", get(routes::groups::group_stats))
        .route("/:id", get(routes::groups::get_group).patch(routes::groups::update_group))
        .route("/:id/members", get(routes::groups::get_group_members))
        .route("/:id/content", get(routes::groups::get_group_content))
        .route("/:id/join", post(routes::groups::join_group))
        .route("/:id/leave", delete(routes::groups::leave_group))
        .route("/:id/user", delete(routes::groups::remove_member))
        .route("/:id/admin", post(routes::groups::assign_admin)
            .delete(routes::groups::remove_admin))
        .route("/:id/delete", delete(routes::groups::delete_group));

    let app = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/metrics", get(routes::health::metrics))
        .nest("/api/user", user_routes)
        .nest("/api/content", content_routes)
        .nest("/api/groups", group_routes)
        .route("/api/search", get(routes::search::search))
        .layer(axum::middleware::from_fn(
            devcircle_shared::middleware::metrics_middleware,
        ))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "devcircle-api starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
