use serde::{Deserialize, Serialize};
use crate::core::pagination::PaginationHeader;
use crate::models::domain::User;

/// Response for the user discovery endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoverUsersResponse {
    pub users: Vec<User>,
    pub pagination: PaginationHeader,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
