use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Store-assigned identifier shared by users, photos and likes
pub type UserId = i32;
pub type PhotoId = i32;

/// User profile with its photos and both sides of the like relation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    #[serde(rename = "knownAs")]
    pub known_as: String,
    pub gender: String,
    #[serde(rename = "dateOfBirth")]
    pub date_of_birth: NaiveDate,
    pub created: DateTime<Utc>,
    #[serde(rename = "lastActive")]
    pub last_active: DateTime<Utc>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub photos: Vec<Photo>,
    /// Incoming likes: records whose likee is this user
    #[serde(default, skip_serializing)]
    pub likers: Vec<Like>,
    /// Outgoing likes: records whose liker is this user
    #[serde(default, skip_serializing)]
    pub likees: Vec<Like>,
}

impl User {
    /// The photo flagged as main, if any
    pub fn main_photo(&self) -> Option<&Photo> {
        self.photos.iter().find(|photo| photo.is_main)
    }

    /// Age in whole years on the given day
    pub fn age_on(&self, today: NaiveDate) -> u32 {
        today.years_since(self.date_of_birth).unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Photo {
    pub id: PhotoId,
    #[serde(rename = "userId")]
    pub user_id: UserId,
    pub url: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "dateAdded")]
    pub date_added: DateTime<Utc>,
    #[serde(rename = "isMain")]
    pub is_main: bool,
}

/// Directed like edge: `liker_id` expressed interest in `likee_id`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Like {
    #[serde(rename = "likerId")]
    pub liker_id: UserId,
    #[serde(rename = "likeeId")]
    pub likee_id: UserId,
}

impl Like {
    pub fn new(liker_id: UserId, likee_id: UserId) -> Self {
        Self { liker_id, likee_id }
    }
}

/// Direction to traverse the like relation from a given user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LikeDirection {
    /// Users who like the given user
    Incoming,
    /// Users the given user likes
    Outgoing,
}

/// User fields supplied on registration; the store assigns the id
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub known_as: String,
    pub gender: String,
    pub date_of_birth: NaiveDate,
    pub city: Option<String>,
    pub country: Option<String>,
    pub created: DateTime<Utc>,
}

impl NewUser {
    pub fn new(username: &str, gender: &str, date_of_birth: NaiveDate) -> Self {
        Self {
            username: username.to_string(),
            known_as: username.to_string(),
            gender: gender.to_string(),
            date_of_birth,
            city: None,
            country: None,
            created: Utc::now(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewPhoto {
    pub user_id: UserId,
    pub url: String,
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn user_born(dob: NaiveDate) -> User {
        User {
            id: 1,
            username: "sam".to_string(),
            known_as: "Sam".to_string(),
            gender: "female".to_string(),
            date_of_birth: dob,
            created: Utc::now(),
            last_active: Utc::now(),
            city: None,
            country: None,
            photos: vec![],
            likers: vec![],
            likees: vec![],
        }
    }

    #[test]
    fn test_age_before_and_after_birthday() {
        let user = user_born(date(2000, 6, 15));
        assert_eq!(user.age_on(date(2026, 6, 14)), 25);
        assert_eq!(user.age_on(date(2026, 6, 15)), 26);
    }

    #[test]
    fn test_main_photo_lookup() {
        let mut user = user_born(date(2000, 1, 1));
        assert!(user.main_photo().is_none());

        user.photos.push(Photo {
            id: 7,
            user_id: 1,
            url: "https://img/7".to_string(),
            description: None,
            date_added: Utc::now(),
            is_main: true,
        });
        assert_eq!(user.main_photo().map(|p| p.id), Some(7));
    }

    #[test]
    fn test_like_edges_not_serialized() {
        let mut user = user_born(date(2000, 1, 1));
        user.likers.push(Like::new(2, 1));
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("likers").is_none());
        assert_eq!(json["dateOfBirth"], "2000-01-01");
    }
}
