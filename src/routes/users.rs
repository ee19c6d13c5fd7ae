use actix_web::{web, HttpResponse, Responder};
use std::sync::Arc;
use validator::Validate;

use crate::core::{DiscoveryError, DiscoveryService};
use crate::models::{DiscoverUsersResponse, ErrorResponse, HealthResponse, UserId, UserParams};
use crate::services::{Store, StoreError};

/// Response header carrying page metadata as JSON
pub const PAGINATION_HEADER: &str = "Pagination";

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub discovery: DiscoveryService<dyn Store>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, default_page_size: usize, max_page_size: usize) -> Self {
        let discovery =
            DiscoveryService::with_page_limits(Arc::clone(&store), default_page_size, max_page_size);
        Self { store, discovery }
    }
}

/// Configure all user-related routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/users", web::get().to(discover_users))
        .route("/users/{id}", web::get().to(get_user))
        .route("/users/{id}/photos/main", web::get().to(get_main_photo))
        .route("/users/{id}/like/{recipient_id}", web::post().to(like_user))
        .route("/users/{id}/like/{recipient_id}", web::delete().to(unlike_user));
}

fn error_response(error: &str, err: &StoreError) -> HttpResponse {
    let (mut builder, status_code) = match err {
        StoreError::NotFound(_) => (HttpResponse::NotFound(), 404),
        StoreError::InvalidInput(_) => (HttpResponse::BadRequest(), 400),
        StoreError::Conflict(_) => (HttpResponse::Conflict(), 409),
        StoreError::Unavailable(_) => (HttpResponse::ServiceUnavailable(), 503),
        _ => (HttpResponse::InternalServerError(), 500),
    };

    builder.json(ErrorResponse {
        error: error.to_string(),
        message: err.to_string(),
        status_code,
    })
}

fn not_found(error: &str, message: String) -> HttpResponse {
    HttpResponse::NotFound().json(ErrorResponse {
        error: error.to_string(),
        message,
        status_code: 404,
    })
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let store_healthy = state.store.health_check().await.unwrap_or(false);

    let status = if store_healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Discover users endpoint
///
/// GET /api/v1/users?userId=1&gender=female&likers=true&minAge=21&maxAge=30&orderBy=created&pageNumber=1&pageSize=10
///
/// Page metadata is returned both in the body and in the `Pagination` header.
async fn discover_users(
    state: web::Data<AppState>,
    query: web::Query<UserParams>,
) -> impl Responder {
    let params = query.into_inner();

    if let Err(errors) = params.validate() {
        tracing::info!("Validation failed for discover_users request: field_errors={:?}", errors);
        return HttpResponse::BadRequest().json(ErrorResponse {
            error: "Validation failed".to_string(),
            message: errors.to_string(),
            status_code: 400,
        });
    }

    tracing::info!(
        "Discovering users for user: {}, page: {}",
        params.user_id,
        params.page_number
    );

    let page = match state.discovery.discover_users(&params).await {
        Ok(page) => page,
        Err(DiscoveryError::Store(e)) => {
            tracing::error!("Failed to discover users for {}: {}", params.user_id, e);
            return error_response("Failed to discover users", &e);
        }
    };

    // Best-effort, the page is served even if this fails
    if let Err(e) = state
        .store
        .record_activity(params.user_id, chrono::Utc::now())
        .await
    {
        tracing::warn!("Failed to record activity for {}: {}", params.user_id, e);
    }

    let pagination = page.header();
    tracing::info!(
        "Returning {} users for user {} (page {}/{}, {} total)",
        page.items.len(),
        params.user_id,
        pagination.current_page,
        pagination.total_pages,
        pagination.total_items
    );

    let mut response = HttpResponse::Ok();
    match serde_json::to_string(&pagination) {
        Ok(header) => {
            response.insert_header((PAGINATION_HEADER, header));
        }
        Err(e) => tracing::warn!("Failed to encode pagination header: {}", e),
    }

    response.json(DiscoverUsersResponse {
        users: page.items,
        pagination,
    })
}

/// Get a single user
///
/// GET /api/v1/users/{id}
async fn get_user(state: web::Data<AppState>, path: web::Path<UserId>) -> impl Responder {
    let id = path.into_inner();

    match state.store.find_user(id).await {
        Ok(Some(user)) => HttpResponse::Ok().json(user),
        Ok(None) => not_found("User not found", format!("user {} does not exist", id)),
        Err(e) => {
            tracing::error!("Failed to fetch user {}: {}", id, e);
            error_response("Failed to fetch user", &e)
        }
    }
}

/// Get a user's main photo
///
/// GET /api/v1/users/{id}/photos/main
async fn get_main_photo(state: web::Data<AppState>, path: web::Path<UserId>) -> impl Responder {
    let id = path.into_inner();

    match state.store.find_main_photo(id).await {
        Ok(Some(photo)) => HttpResponse::Ok().json(photo),
        Ok(None) => not_found("Photo not found", format!("user {} has no main photo", id)),
        Err(e) => {
            tracing::error!("Failed to fetch main photo for {}: {}", id, e);
            error_response("Failed to fetch photo", &e)
        }
    }
}

/// Like another user
///
/// POST /api/v1/users/{id}/like/{recipient_id}
async fn like_user(
    state: web::Data<AppState>,
    path: web::Path<(UserId, UserId)>,
) -> impl Responder {
    let (id, recipient_id) = path.into_inner();

    match state.store.add_like(id, recipient_id).await {
        Ok(like) => {
            tracing::debug!("Recorded like: {} -> {}", id, recipient_id);
            HttpResponse::Ok().json(like)
        }
        Err(e) => {
            tracing::info!("Rejected like {} -> {}: {}", id, recipient_id, e);
            error_response("Failed to like user", &e)
        }
    }
}

/// Remove a like
///
/// DELETE /api/v1/users/{id}/like/{recipient_id}
async fn unlike_user(
    state: web::Data<AppState>,
    path: web::Path<(UserId, UserId)>,
) -> impl Responder {
    let (id, recipient_id) = path.into_inner();

    match state.store.delete_like(id, recipient_id).await {
        Ok(true) => HttpResponse::NoContent().finish(),
        Ok(false) => not_found(
            "Like not found",
            format!("user {} does not like user {}", id, recipient_id),
        ),
        Err(e) => {
            tracing::error!("Failed to remove like {} -> {}: {}", id, recipient_id, e);
            error_response("Failed to remove like", &e)
        }
    }
}
