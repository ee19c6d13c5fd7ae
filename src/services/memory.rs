use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::core::filters::{UserFilter, UserOrder};
use crate::models::{Like, NewPhoto, NewUser, Photo, PhotoId, User, UserId};
use crate::services::store::{validate_like, validate_new_user, EntityStore, EntityWriter, StoreError};

#[derive(Debug, Default)]
struct StoreData {
    /// Users without relations; photos and likes are joined on read
    users: BTreeMap<UserId, User>,
    photos: BTreeMap<PhotoId, Photo>,
    likes: BTreeSet<(UserId, UserId)>,
    next_user_id: UserId,
    next_photo_id: PhotoId,
}

impl StoreData {
    fn photos_of(&self, user_id: UserId) -> Vec<Photo> {
        self.photos
            .values()
            .filter(|photo| photo.user_id == user_id)
            .cloned()
            .collect()
    }

    fn with_photos(&self, user: &User) -> User {
        User {
            photos: self.photos_of(user.id),
            ..user.clone()
        }
    }

    fn with_relations(&self, user: &User) -> User {
        let mut full = self.with_photos(user);
        full.likers = self
            .likes
            .iter()
            .filter(|(_, likee)| *likee == user.id)
            .map(|&(liker, likee)| Like::new(liker, likee))
            .collect();
        full.likees = self
            .likes
            .iter()
            .filter(|(liker, _)| *liker == user.id)
            .map(|&(liker, likee)| Like::new(liker, likee))
            .collect();
        full
    }
}

/// Entity store held in process memory
///
/// Every read takes a consistent snapshot under a read lock. Availability
/// can be toggled to exercise store-failure paths.
#[derive(Debug)]
pub struct InMemoryStore {
    data: RwLock<StoreData>,
    available: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            data: RwLock::new(StoreData {
                next_user_id: 1,
                next_photo_id: 1,
                ..StoreData::default()
            }),
            available: AtomicBool::new(true),
        }
    }

    /// Make every subsequent call fail with `StoreError::Unavailable`
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Insert a fully-formed user, keeping its id. Used to seed fixtures.
    pub async fn insert_user(&self, user: User) -> Result<(), StoreError> {
        self.ensure_available()?;
        let mut data = self.data.write().await;
        if data.users.contains_key(&user.id) {
            return Err(StoreError::Conflict(format!("user {} already exists", user.id)));
        }
        if user.id == UserId::MAX {
            return Err(StoreError::InvalidInput(format!("user id {} is out of range", user.id)));
        }
        data.next_user_id = data.next_user_id.max(user.id + 1);
        let user = User {
            photos: vec![],
            likers: vec![],
            likees: vec![],
            ..user
        };
        data.users.insert(user.id, user);
        Ok(())
    }

    pub async fn user_count(&self) -> usize {
        self.data.read().await.users.len()
    }

    fn ensure_available(&self) -> Result<(), StoreError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("in-memory store is offline".to_string()))
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EntityStore for InMemoryStore {
    async fn find_user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        self.ensure_available()?;
        let data = self.data.read().await;
        Ok(data.users.get(&id).map(|user| data.with_relations(user)))
    }

    async fn find_photo(&self, id: PhotoId) -> Result<Option<Photo>, StoreError> {
        self.ensure_available()?;
        Ok(self.data.read().await.photos.get(&id).cloned())
    }

    async fn find_main_photo(&self, user_id: UserId) -> Result<Option<Photo>, StoreError> {
        self.ensure_available()?;
        let data = self.data.read().await;
        Ok(data
            .photos
            .values()
            .find(|photo| photo.user_id == user_id && photo.is_main)
            .cloned())
    }

    async fn find_like(&self, liker_id: UserId, likee_id: UserId) -> Result<Option<Like>, StoreError> {
        self.ensure_available()?;
        let data = self.data.read().await;
        Ok(data
            .likes
            .contains(&(liker_id, likee_id))
            .then(|| Like::new(liker_id, likee_id)))
    }

    async fn enumerate_users(
        &self,
        filter: &UserFilter,
        order: UserOrder,
    ) -> Result<Vec<User>, StoreError> {
        self.ensure_available()?;
        let data = self.data.read().await;

        let mut users: Vec<User> = data
            .users
            .values()
            .filter(|user| filter.matches(user))
            .map(|user| data.with_photos(user))
            .collect();
        drop(data);

        users.sort_by(|a, b| order.compare(a, b));
        Ok(users)
    }

    async fn health_check(&self) -> Result<bool, StoreError> {
        Ok(self.available.load(Ordering::SeqCst))
    }
}

#[async_trait]
impl EntityWriter for InMemoryStore {
    async fn add_user(&self, user: NewUser) -> Result<User, StoreError> {
        self.ensure_available()?;
        validate_new_user(&user, Utc::now().date_naive())?;

        let mut data = self.data.write().await;
        if data.users.values().any(|existing| existing.username == user.username) {
            return Err(StoreError::Conflict(format!("username {} is taken", user.username)));
        }

        let id = data.next_user_id;
        data.next_user_id += 1;

        let created = User {
            id,
            username: user.username,
            known_as: user.known_as,
            gender: user.gender,
            date_of_birth: user.date_of_birth,
            created: user.created,
            last_active: user.created,
            city: user.city,
            country: user.country,
            photos: vec![],
            likers: vec![],
            likees: vec![],
        };
        data.users.insert(id, created.clone());

        tracing::debug!("Added user {} ({})", id, created.username);
        Ok(created)
    }

    async fn add_photo(&self, photo: NewPhoto) -> Result<Photo, StoreError> {
        self.ensure_available()?;
        let mut data = self.data.write().await;
        if !data.users.contains_key(&photo.user_id) {
            return Err(StoreError::NotFound(format!("user {}", photo.user_id)));
        }

        let is_main = !data.photos.values().any(|p| p.user_id == photo.user_id);
        let id = data.next_photo_id;
        data.next_photo_id += 1;

        let created = Photo {
            id,
            user_id: photo.user_id,
            url: photo.url,
            description: photo.description,
            date_added: Utc::now(),
            is_main,
        };
        data.photos.insert(id, created.clone());
        Ok(created)
    }

    async fn set_main_photo(&self, user_id: UserId, photo_id: PhotoId) -> Result<Photo, StoreError> {
        self.ensure_available()?;
        let mut data = self.data.write().await;
        let owned = data
            .photos
            .get(&photo_id)
            .is_some_and(|photo| photo.user_id == user_id);
        if !owned {
            return Err(StoreError::NotFound(format!("photo {} of user {}", photo_id, user_id)));
        }

        let mut main = None;
        for photo in data.photos.values_mut().filter(|p| p.user_id == user_id) {
            photo.is_main = photo.id == photo_id;
            if photo.is_main {
                main = Some(photo.clone());
            }
        }
        main.ok_or_else(|| StoreError::NotFound(format!("photo {}", photo_id)))
    }

    async fn delete_photo(&self, user_id: UserId, photo_id: PhotoId) -> Result<bool, StoreError> {
        self.ensure_available()?;
        let mut data = self.data.write().await;
        let is_main = data
            .photos
            .get(&photo_id)
            .filter(|photo| photo.user_id == user_id)
            .map(|photo| photo.is_main);

        match is_main {
            Some(true) => Err(StoreError::InvalidInput("cannot delete the main photo".to_string())),
            Some(false) => {
                data.photos.remove(&photo_id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn add_like(&self, liker_id: UserId, likee_id: UserId) -> Result<Like, StoreError> {
        self.ensure_available()?;
        validate_like(liker_id, likee_id)?;

        let mut data = self.data.write().await;
        for id in [liker_id, likee_id] {
            if !data.users.contains_key(&id) {
                return Err(StoreError::NotFound(format!("user {}", id)));
            }
        }
        if !data.likes.insert((liker_id, likee_id)) {
            return Err(StoreError::Conflict(format!(
                "user {} already likes user {}",
                liker_id, likee_id
            )));
        }
        Ok(Like::new(liker_id, likee_id))
    }

    async fn delete_like(&self, liker_id: UserId, likee_id: UserId) -> Result<bool, StoreError> {
        self.ensure_available()?;
        Ok(self.data.write().await.likes.remove(&(liker_id, likee_id)))
    }

    async fn record_activity(&self, user_id: UserId, at: DateTime<Utc>) -> Result<(), StoreError> {
        self.ensure_available()?;
        let mut data = self.data.write().await;
        let user = data
            .users
            .get_mut(&user_id)
            .ok_or_else(|| StoreError::NotFound(format!("user {}", user_id)))?;
        user.last_active = at;
        Ok(())
    }
}
