use std::cmp::Ordering;
use std::collections::HashSet;

use chrono::{Months, NaiveDate};

use crate::models::{User, UserId, UserParams};

/// Inclusive date-of-birth bounds derived from an age range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DobWindow {
    pub min_date_of_birth: NaiveDate,
    pub max_date_of_birth: NaiveDate,
}

impl DobWindow {
    /// Convert `[min_age, max_age]` into birth dates relative to `today`
    ///
    /// The lower bound goes back `max_age + 1` years so that someone who
    /// is still `max_age` until their next birthday stays inside.
    pub fn from_age_range(min_age: u32, max_age: u32, today: NaiveDate) -> Self {
        Self {
            min_date_of_birth: years_before(today, max_age.saturating_add(1)),
            max_date_of_birth: years_before(today, min_age),
        }
    }

    #[inline]
    pub fn contains(&self, date_of_birth: NaiveDate) -> bool {
        date_of_birth >= self.min_date_of_birth && date_of_birth <= self.max_date_of_birth
    }
}

/// Calendar subtraction; Feb 29 falls back to Feb 28 in non-leap years
fn years_before(today: NaiveDate, years: u32) -> NaiveDate {
    years
        .checked_mul(12)
        .and_then(|months| today.checked_sub_months(Months::new(months)))
        .unwrap_or(NaiveDate::MIN)
}

/// Predicate over users, assembled once from the query parameters
///
/// Each clause is optional except self-exclusion. Stores may evaluate it
/// with [`UserFilter::matches`] or translate the clauses into their own
/// query language.
#[derive(Debug, Clone, PartialEq)]
pub struct UserFilter {
    pub exclude_id: UserId,
    pub gender: Option<String>,
    /// Candidate ids must belong to this set when present
    pub connected: Option<HashSet<UserId>>,
    pub dob_window: Option<DobWindow>,
}

impl UserFilter {
    /// Only self-exclusion, no optional clauses
    pub fn excluding(user_id: UserId) -> Self {
        Self {
            exclude_id: user_id,
            gender: None,
            connected: None,
            dob_window: None,
        }
    }

    /// Build the filter from the query parameters
    ///
    /// `likers` and `likees` carry the resolved like-graph sets for the
    /// flags that were requested. When both flags are set a candidate must
    /// be in both sets.
    pub fn build(
        params: &UserParams,
        likers: Option<HashSet<UserId>>,
        likees: Option<HashSet<UserId>>,
        today: NaiveDate,
    ) -> Self {
        let connected = match (likers, likees) {
            (Some(likers), Some(likees)) => {
                Some(likers.intersection(&likees).copied().collect())
            }
            (likers, likees) => likers.or(likees),
        };

        let dob_window = params
            .has_age_filter()
            .then(|| DobWindow::from_age_range(params.min_age, params.max_age, today));

        Self {
            exclude_id: params.user_id,
            gender: params.gender_filter().map(str::to_string),
            connected,
            dob_window,
        }
    }

    #[inline]
    pub fn matches(&self, user: &User) -> bool {
        if user.id == self.exclude_id {
            return false;
        }

        if let Some(gender) = &self.gender {
            if &user.gender != gender {
                return false;
            }
        }

        if let Some(connected) = &self.connected {
            if !connected.contains(&user.id) {
                return false;
            }
        }

        if let Some(window) = &self.dob_window {
            if !window.contains(user.date_of_birth) {
                return false;
            }
        }

        true
    }
}

/// Ordering applied to filtered users before pagination
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UserOrder {
    /// Newest accounts first
    Created,
    /// Most recently active first
    #[default]
    LastActive,
}

impl UserOrder {
    /// Parse an order key. Unknown or missing keys fall back to `LastActive`.
    pub fn from_key(key: Option<&str>) -> Self {
        match key {
            Some("created") => UserOrder::Created,
            _ => UserOrder::LastActive,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UserOrder::Created => "created",
            UserOrder::LastActive => "lastActive",
        }
    }

    /// Descending by the order key, then ascending by id
    pub fn compare(&self, a: &User, b: &User) -> Ordering {
        let primary = match self {
            UserOrder::Created => b.created.cmp(&a.created),
            UserOrder::LastActive => b.last_active.cmp(&a.last_active),
        };
        primary.then_with(|| a.id.cmp(&b.id))
    }
}
