use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, QueryBuilder, Row};

use crate::core::filters::{UserFilter, UserOrder};
use crate::models::{Like, NewPhoto, NewUser, Photo, PhotoId, User, UserId};
use crate::services::store::{validate_like, validate_new_user, EntityStore, EntityWriter, StoreError};

const USER_COLUMNS: &str =
    "id, username, known_as, gender, date_of_birth, created, last_active, city, country";
const PHOTO_COLUMNS: &str = "id, user_id, url, description, date_added, is_main";

/// PostgreSQL-backed entity store
///
/// Discovery filters are translated into a single `SELECT` so filtering
/// and ordering run in the database. Photos are loaded with one extra
/// query per call.
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a new store from a connection string and run migrations
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout: Duration,
        idle_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(acquire_timeout)
            .idle_timeout(idle_timeout)
            .test_before_acquire(true)
            .connect(database_url)
            .await
            .map_err(unavailable)?;

        // Run migrations on startup
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Create a new store from settings
    pub async fn from_settings(
        url: &str,
        max_connections: Option<u32>,
        min_connections: Option<u32>,
        acquire_timeout_secs: Option<u64>,
        idle_timeout_secs: Option<u64>,
    ) -> Result<Self, StoreError> {
        tracing::info!("Connecting to PostgreSQL");

        Self::new(
            url,
            max_connections.unwrap_or(10),
            min_connections.unwrap_or(1),
            Duration::from_secs(acquire_timeout_secs.unwrap_or(5)),
            Duration::from_secs(idle_timeout_secs.unwrap_or(600)),
        )
        .await
    }

    async fn photos_for(&self, user_ids: &[UserId]) -> Result<HashMap<UserId, Vec<Photo>>, StoreError> {
        let query = format!(
            "SELECT {} FROM photos WHERE user_id = ANY($1) ORDER BY id",
            PHOTO_COLUMNS
        );

        let rows = sqlx::query(&query)
            .bind(user_ids)
            .fetch_all(&self.pool)
            .await
            .map_err(unavailable)?;

        let mut grouped: HashMap<UserId, Vec<Photo>> = HashMap::new();
        for row in &rows {
            let photo = photo_from_row(row)?;
            grouped.entry(photo.user_id).or_default().push(photo);
        }
        Ok(grouped)
    }

    async fn likes_where(&self, column: &str, user_id: UserId) -> Result<Vec<Like>, StoreError> {
        let query = format!(
            "SELECT liker_id, likee_id FROM likes WHERE {} = $1 ORDER BY liker_id, likee_id",
            column
        );

        let rows = sqlx::query(&query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(unavailable)?;

        rows.iter()
            .map(|row| -> Result<Like, StoreError> {
                Ok(Like {
                    liker_id: row.try_get("liker_id")?,
                    likee_id: row.try_get("likee_id")?,
                })
            })
            .collect()
    }
}

/// Push the filter clauses onto a `SELECT ... FROM users`
fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &UserFilter) {
    builder.push(" WHERE id <> ").push_bind(filter.exclude_id);

    if let Some(gender) = &filter.gender {
        builder.push(" AND gender = ").push_bind(gender.clone());
    }

    if let Some(connected) = &filter.connected {
        let ids: Vec<UserId> = connected.iter().copied().collect();
        builder.push(" AND id = ANY(").push_bind(ids).push(")");
    }

    if let Some(window) = &filter.dob_window {
        builder
            .push(" AND date_of_birth BETWEEN ")
            .push_bind(window.min_date_of_birth)
            .push(" AND ")
            .push_bind(window.max_date_of_birth);
    }
}

fn order_clause(order: UserOrder) -> &'static str {
    match order {
        UserOrder::Created => " ORDER BY created DESC, id ASC",
        UserOrder::LastActive => " ORDER BY last_active DESC, id ASC",
    }
}

fn user_from_row(row: &PgRow) -> Result<User, sqlx::Error> {
    Ok(User {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        known_as: row.try_get("known_as")?,
        gender: row.try_get("gender")?,
        date_of_birth: row.try_get("date_of_birth")?,
        created: row.try_get("created")?,
        last_active: row.try_get("last_active")?,
        city: row.try_get("city")?,
        country: row.try_get("country")?,
        photos: vec![],
        likers: vec![],
        likees: vec![],
    })
}

fn photo_from_row(row: &PgRow) -> Result<Photo, sqlx::Error> {
    Ok(Photo {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        url: row.try_get("url")?,
        description: row.try_get("description")?,
        date_added: row.try_get("date_added")?,
        is_main: row.try_get("is_main")?,
    })
}

/// Connection-level failures surface as `Unavailable`
fn unavailable(err: sqlx::Error) -> StoreError {
    if matches!(
        err,
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)
    ) {
        StoreError::Unavailable(err.to_string())
    } else {
        StoreError::Database(err)
    }
}

/// Constraint violations surface as domain errors
fn constraint(err: sqlx::Error, what: &str) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return StoreError::Conflict(format!("{} already exists", what));
        }
        if db.is_foreign_key_violation() {
            return StoreError::NotFound(format!("{} references a missing user", what));
        }
    }
    unavailable(err)
}

#[async_trait]
impl EntityStore for PostgresStore {
    async fn find_user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let query = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);

        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unavailable)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut user = user_from_row(&row)?;
        user.photos = self.photos_for(&[id]).await?.remove(&id).unwrap_or_default();
        user.likers = self.likes_where("likee_id", id).await?;
        user.likees = self.likes_where("liker_id", id).await?;

        Ok(Some(user))
    }

    async fn find_photo(&self, id: PhotoId) -> Result<Option<Photo>, StoreError> {
        let query = format!("SELECT {} FROM photos WHERE id = $1", PHOTO_COLUMNS);

        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unavailable)?;

        Ok(row.as_ref().map(photo_from_row).transpose()?)
    }

    async fn find_main_photo(&self, user_id: UserId) -> Result<Option<Photo>, StoreError> {
        let query = format!(
            "SELECT {} FROM photos WHERE user_id = $1 AND is_main",
            PHOTO_COLUMNS
        );

        let row = sqlx::query(&query)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unavailable)?;

        Ok(row.as_ref().map(photo_from_row).transpose()?)
    }

    async fn find_like(&self, liker_id: UserId, likee_id: UserId) -> Result<Option<Like>, StoreError> {
        let row = sqlx::query("SELECT 1 FROM likes WHERE liker_id = $1 AND likee_id = $2")
            .bind(liker_id)
            .bind(likee_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unavailable)?;

        Ok(row.map(|_| Like::new(liker_id, likee_id)))
    }

    async fn enumerate_users(
        &self,
        filter: &UserFilter,
        order: UserOrder,
    ) -> Result<Vec<User>, StoreError> {
        let mut builder = QueryBuilder::<Postgres>::new(format!("SELECT {} FROM users", USER_COLUMNS));
        push_filter(&mut builder, filter);
        builder.push(order_clause(order));

        let rows = builder
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(unavailable)?;

        let mut users = rows
            .iter()
            .map(user_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        let ids: Vec<UserId> = users.iter().map(|u| u.id).collect();
        let mut photos = self.photos_for(&ids).await?;
        for user in &mut users {
            user.photos = photos.remove(&user.id).unwrap_or_default();
        }

        tracing::debug!("Enumerated {} users ({})", users.len(), order.as_str());
        Ok(users)
    }

    /// Health check for the database connection
    async fn health_check(&self) -> Result<bool, StoreError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(unavailable)
    }
}

#[async_trait]
impl EntityWriter for PostgresStore {
    async fn add_user(&self, user: NewUser) -> Result<User, StoreError> {
        validate_new_user(&user, Utc::now().date_naive())?;

        let query = format!(
            r#"
            INSERT INTO users (username, known_as, gender, date_of_birth, created, last_active, city, country)
            VALUES ($1, $2, $3, $4, $5, $5, $6, $7)
            RETURNING {}
            "#,
            USER_COLUMNS
        );

        let row = sqlx::query(&query)
            .bind(&user.username)
            .bind(&user.known_as)
            .bind(&user.gender)
            .bind(user.date_of_birth)
            .bind(user.created)
            .bind(&user.city)
            .bind(&user.country)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| constraint(e, &format!("username {}", user.username)))?;

        let created = user_from_row(&row)?;
        tracing::debug!("Added user {} ({})", created.id, created.username);
        Ok(created)
    }

    async fn add_photo(&self, photo: NewPhoto) -> Result<Photo, StoreError> {
        let mut tx = self.pool.begin().await.map_err(unavailable)?;

        let owner = sqlx::query("SELECT 1 FROM users WHERE id = $1")
            .bind(photo.user_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(unavailable)?;
        if owner.is_none() {
            return Err(StoreError::NotFound(format!("user {}", photo.user_id)));
        }

        let query = format!(
            r#"
            INSERT INTO photos (user_id, url, description, date_added, is_main)
            VALUES ($1, $2, $3, NOW(), NOT EXISTS (SELECT 1 FROM photos WHERE user_id = $1))
            RETURNING {}
            "#,
            PHOTO_COLUMNS
        );

        let row = sqlx::query(&query)
            .bind(photo.user_id)
            .bind(&photo.url)
            .bind(&photo.description)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| constraint(e, "photo"))?;

        let created = photo_from_row(&row)?;
        tx.commit().await.map_err(unavailable)?;
        Ok(created)
    }

    async fn set_main_photo(&self, user_id: UserId, photo_id: PhotoId) -> Result<Photo, StoreError> {
        let mut tx = self.pool.begin().await.map_err(unavailable)?;

        let owned = sqlx::query("SELECT 1 FROM photos WHERE id = $1 AND user_id = $2")
            .bind(photo_id)
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(unavailable)?;
        if owned.is_none() {
            return Err(StoreError::NotFound(format!("photo {} of user {}", photo_id, user_id)));
        }

        sqlx::query("UPDATE photos SET is_main = FALSE WHERE user_id = $1 AND is_main")
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(unavailable)?;

        let query = format!(
            "UPDATE photos SET is_main = TRUE WHERE id = $1 RETURNING {}",
            PHOTO_COLUMNS
        );
        let row = sqlx::query(&query)
            .bind(photo_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(unavailable)?;

        let main = photo_from_row(&row)?;
        tx.commit().await.map_err(unavailable)?;
        Ok(main)
    }

    async fn delete_photo(&self, user_id: UserId, photo_id: PhotoId) -> Result<bool, StoreError> {
        let row = sqlx::query("SELECT is_main FROM photos WHERE id = $1 AND user_id = $2")
            .bind(photo_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(unavailable)?;

        let Some(row) = row else {
            return Ok(false);
        };
        if row.try_get::<bool, _>("is_main")? {
            return Err(StoreError::InvalidInput("cannot delete the main photo".to_string()));
        }

        let result = sqlx::query("DELETE FROM photos WHERE id = $1 AND user_id = $2 AND NOT is_main")
            .bind(photo_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(unavailable)?;

        Ok(result.rows_affected() > 0)
    }

    async fn add_like(&self, liker_id: UserId, likee_id: UserId) -> Result<Like, StoreError> {
        validate_like(liker_id, likee_id)?;

        sqlx::query("INSERT INTO likes (liker_id, likee_id) VALUES ($1, $2)")
            .bind(liker_id)
            .bind(likee_id)
            .execute(&self.pool)
            .await
            .map_err(|e| constraint(e, &format!("like {} -> {}", liker_id, likee_id)))?;

        tracing::debug!("Recorded like: {} -> {}", liker_id, likee_id);
        Ok(Like::new(liker_id, likee_id))
    }

    async fn delete_like(&self, liker_id: UserId, likee_id: UserId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM likes WHERE liker_id = $1 AND likee_id = $2")
            .bind(liker_id)
            .bind(likee_id)
            .execute(&self.pool)
            .await
            .map_err(unavailable)?;

        Ok(result.rows_affected() > 0)
    }

    async fn record_activity(&self, user_id: UserId, at: DateTime<Utc>) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE users SET last_active = $2 WHERE id = $1")
            .bind(user_id)
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(unavailable)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("user {}", user_id)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::filters::DobWindow;
    use chrono::NaiveDate;
    use std::collections::HashSet;

    #[test]
    fn test_filter_translates_to_sql() {
        let mut filter = UserFilter::excluding(1);
        filter.gender = Some("female".to_string());
        filter.connected = Some(HashSet::from([2]));
        filter.dob_window = Some(DobWindow::from_age_range(
            20,
            30,
            NaiveDate::from_ymd_opt(2026, 10, 16).unwrap(),
        ));

        let mut builder = QueryBuilder::<Postgres>::new("SELECT id FROM users");
        push_filter(&mut builder, &filter);
        builder.push(order_clause(UserOrder::Created));

        assert_eq!(
            builder.sql(),
            "SELECT id FROM users WHERE id <> $1 AND gender = $2 AND id = ANY($3) \
             AND date_of_birth BETWEEN $4 AND $5 ORDER BY created DESC, id ASC"
        );
    }

    #[test]
    fn test_minimal_filter_sql() {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT id FROM users");
        push_filter(&mut builder, &UserFilter::excluding(9));
        builder.push(order_clause(UserOrder::LastActive));

        assert_eq!(
            builder.sql(),
            "SELECT id FROM users WHERE id <> $1 ORDER BY last_active DESC, id ASC"
        );
    }

    async fn connect() -> PostgresStore {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        PostgresStore::from_settings(&url, Some(2), Some(1), None, None)
            .await
            .expect("Failed to connect")
    }

    async fn add_named(store: &PostgresStore, name: &str, gender: &str, dob: NaiveDate) -> User {
        let suffix = Utc::now().timestamp_nanos_opt().unwrap_or_default();
        store
            .add_user(NewUser::new(&format!("{}{}", name, suffix), gender, dob))
            .await
            .unwrap()
    }

    fn photo(user_id: UserId, url: &str) -> NewPhoto {
        NewPhoto {
            user_id,
            url: url.to_string(),
            description: None,
        }
    }

    #[tokio::test]
    #[ignore = "Requires PostgreSQL"]
    async fn test_like_round_trip() {
        let store = connect().await;

        let dob = NaiveDate::from_ymd_opt(1990, 1, 1).unwrap();
        let a = add_named(&store, "a", "male", dob).await;
        let b = add_named(&store, "b", "female", dob).await;

        store.add_like(a.id, b.id).await.unwrap();
        assert!(matches!(store.add_like(a.id, b.id).await, Err(StoreError::Conflict(_))));

        let loaded = store.find_user(b.id).await.unwrap().unwrap();
        assert_eq!(loaded.likers, vec![Like::new(a.id, b.id)]);
    }

    #[tokio::test]
    #[ignore = "Requires PostgreSQL"]
    async fn test_main_photo_rules() {
        let store = connect().await;
        let dob = NaiveDate::from_ymd_opt(1992, 5, 20).unwrap();
        let user = add_named(&store, "photos", "female", dob).await;

        let first = store.add_photo(photo(user.id, "a.jpg")).await.unwrap();
        let second = store.add_photo(photo(user.id, "b.jpg")).await.unwrap();
        assert!(first.is_main);
        assert!(!second.is_main);

        let main = store.set_main_photo(user.id, second.id).await.unwrap();
        assert_eq!(main.id, second.id);
        assert!(main.is_main);
        assert!(!store.find_photo(first.id).await.unwrap().unwrap().is_main);

        let loaded = store.find_user(user.id).await.unwrap().unwrap();
        assert_eq!(loaded.photos.iter().filter(|p| p.is_main).count(), 1);
        assert_eq!(
            store.find_main_photo(user.id).await.unwrap().map(|p| p.id),
            Some(second.id)
        );

        assert!(matches!(
            store.delete_photo(user.id, second.id).await,
            Err(StoreError::InvalidInput(_))
        ));
        assert!(store.delete_photo(user.id, first.id).await.unwrap());
        assert!(!store.delete_photo(user.id, first.id).await.unwrap());
        assert!(store.find_photo(second.id).await.unwrap().is_some());
    }

    #[tokio::test]
    #[ignore = "Requires PostgreSQL"]
    async fn test_enumerate_with_window_and_likes() {
        let store = connect().await;
        let today = Utc::now().date_naive();
        let years_ago = |years: u32| today.checked_sub_months(chrono::Months::new(12 * years)).unwrap();

        let requester = add_named(&store, "req", "male", years_ago(30)).await;
        let young = add_named(&store, "young", "female", years_ago(22)).await;
        let older = add_named(&store, "older", "female", years_ago(45)).await;
        let edge = add_named(&store, "edge", "female", years_ago(35)).await;

        for liker in [young.id, older.id, edge.id] {
            store.add_like(liker, requester.id).await.unwrap();
        }

        let mut filter = UserFilter::excluding(requester.id);
        filter.connected = Some(HashSet::from([young.id, older.id, edge.id]));
        filter.dob_window = Some(DobWindow::from_age_range(20, 35, today));

        let users = store.enumerate_users(&filter, UserOrder::Created).await.unwrap();
        let mut ids: Vec<UserId> = users.iter().map(|u| u.id).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![young.id, edge.id]);

        // An empty like set matches nobody
        filter.connected = Some(HashSet::new());
        filter.dob_window = None;
        let users = store.enumerate_users(&filter, UserOrder::LastActive).await.unwrap();
        assert!(users.is_empty());
    }
}
