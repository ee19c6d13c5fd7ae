use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

use crate::core::filters::{UserFilter, UserOrder};
use crate::models::{Like, NewPhoto, NewUser, Photo, PhotoId, User, UserId};

/// Errors that can occur when interacting with an entity store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Read side of the entity store
///
/// Absent entities are `Ok(None)`. Errors are reserved for the store
/// itself failing.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// User with photos, likers and likees loaded
    async fn find_user(&self, id: UserId) -> Result<Option<User>, StoreError>;

    async fn find_photo(&self, id: PhotoId) -> Result<Option<Photo>, StoreError>;

    async fn find_main_photo(&self, user_id: UserId) -> Result<Option<Photo>, StoreError>;

    async fn find_like(&self, liker_id: UserId, likee_id: UserId) -> Result<Option<Like>, StoreError>;

    /// Users matching `filter`, sorted by `order`, with photos loaded
    async fn enumerate_users(
        &self,
        filter: &UserFilter,
        order: UserOrder,
    ) -> Result<Vec<User>, StoreError>;

    /// Whether the store can currently serve requests
    async fn health_check(&self) -> Result<bool, StoreError> {
        Ok(true)
    }
}

/// Write side of the entity store, one operation per aggregate
#[async_trait]
pub trait EntityWriter: Send + Sync {
    async fn add_user(&self, user: NewUser) -> Result<User, StoreError>;

    /// The first photo added for a user becomes the main photo
    async fn add_photo(&self, photo: NewPhoto) -> Result<Photo, StoreError>;

    /// Flag `photo_id` as main and clear the previous main photo
    async fn set_main_photo(&self, user_id: UserId, photo_id: PhotoId) -> Result<Photo, StoreError>;

    /// Main photos cannot be deleted. Returns false when nothing matched.
    async fn delete_photo(&self, user_id: UserId, photo_id: PhotoId) -> Result<bool, StoreError>;

    async fn add_like(&self, liker_id: UserId, likee_id: UserId) -> Result<Like, StoreError>;

    async fn delete_like(&self, liker_id: UserId, likee_id: UserId) -> Result<bool, StoreError>;

    async fn record_activity(&self, user_id: UserId, at: DateTime<Utc>) -> Result<(), StoreError>;
}

/// Read and write access combined, for callers holding one trait object
pub trait Store: EntityStore + EntityWriter {}

impl<T: EntityStore + EntityWriter + ?Sized> Store for T {}

/// Reject registrations without a username or gender, or born in the future
pub fn validate_new_user(user: &NewUser, today: NaiveDate) -> Result<(), StoreError> {
    if user.username.trim().is_empty() {
        return Err(StoreError::InvalidInput("username must not be empty".to_string()));
    }
    if user.gender.trim().is_empty() {
        return Err(StoreError::InvalidInput("gender must not be empty".to_string()));
    }
    if user.date_of_birth > today {
        return Err(StoreError::InvalidInput(format!(
            "date of birth {} is in the future",
            user.date_of_birth
        )));
    }
    Ok(())
}

/// Self-likes are not part of the like relation
pub fn validate_like(liker_id: UserId, likee_id: UserId) -> Result<(), StoreError> {
    if liker_id == likee_id {
        return Err(StoreError::InvalidInput(format!("user {} cannot like themselves", liker_id)));
    }
    Ok(())
}
