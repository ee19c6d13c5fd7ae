use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::domain::UserId;

pub const DEFAULT_MIN_AGE: u32 = 18;
pub const DEFAULT_MAX_AGE: u32 = 99;

/// Query parameters for one discovery request
///
/// Every filter is optional. Paging values are coerced by
/// [`UserParams::normalized`] before the query runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UserParams {
    #[validate(range(min = 1))]
    #[serde(alias = "user_id")]
    pub user_id: UserId,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub likers: bool,
    #[serde(default)]
    pub likees: bool,
    #[validate(range(max = 150))]
    #[serde(default = "default_min_age")]
    pub min_age: u32,
    #[validate(range(max = 150))]
    #[serde(default = "default_max_age")]
    pub max_age: u32,
    #[serde(default)]
    pub order_by: Option<String>,
    #[serde(default = "default_page_number")]
    pub page_number: usize,
    #[serde(default)]
    pub page_size: Option<usize>,
}

fn default_min_age() -> u32 { DEFAULT_MIN_AGE }
fn default_max_age() -> u32 { DEFAULT_MAX_AGE }
fn default_page_number() -> usize { 1 }

impl UserParams {
    pub fn for_user(user_id: UserId) -> Self {
        Self {
            user_id,
            gender: None,
            likers: false,
            likees: false,
            min_age: DEFAULT_MIN_AGE,
            max_age: DEFAULT_MAX_AGE,
            order_by: None,
            page_number: 1,
            page_size: None,
        }
    }

    /// Coerce paging values into range: page number at least 1, page size
    /// defaulted when absent and kept within `1..=max_page_size`
    pub fn normalized(mut self, default_page_size: usize, max_page_size: usize) -> Self {
        let max_page_size = max_page_size.max(1);
        self.page_number = self.page_number.max(1);
        self.page_size = Some(
            self.page_size
                .unwrap_or(default_page_size)
                .clamp(1, max_page_size),
        );
        self
    }

    /// Whether the age bounds differ from the 18..=99 defaults
    pub fn has_age_filter(&self) -> bool {
        self.min_age != DEFAULT_MIN_AGE || self.max_age != DEFAULT_MAX_AGE
    }

    /// Gender filter, treating an empty string as absent
    pub fn gender_filter(&self) -> Option<&str> {
        self.gender.as_deref().filter(|g| !g.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_query_string() {
        let params: UserParams = serde_json::from_str(r#"{"userId": 4}"#).unwrap();
        assert_eq!(params.min_age, 18);
        assert_eq!(params.max_age, 99);
        assert_eq!(params.page_number, 1);
        assert!(params.page_size.is_none());
        assert!(!params.has_age_filter());
    }

    #[test]
    fn test_normalized_coerces_paging() {
        let mut params = UserParams::for_user(1);
        params.page_number = 0;
        params.page_size = Some(500);

        let params = params.normalized(10, 50);
        assert_eq!(params.page_number, 1);
        assert_eq!(params.page_size, Some(50));

        let params = UserParams::for_user(1).normalized(10, 50);
        assert_eq!(params.page_size, Some(10));

        let mut params = UserParams::for_user(1);
        params.page_size = Some(0);
        assert_eq!(params.normalized(10, 50).page_size, Some(1));
    }

    #[test]
    fn test_empty_gender_is_no_filter() {
        let mut params = UserParams::for_user(1);
        params.gender = Some(String::new());
        assert!(params.gender_filter().is_none());

        params.gender = Some("male".to_string());
        assert_eq!(params.gender_filter(), Some("male"));
    }

    #[test]
    fn test_validation_rejects_bad_user_id() {
        let params = UserParams::for_user(0);
        assert!(params.validate().is_err());
        assert!(UserParams::for_user(3).validate().is_ok());
    }
}
