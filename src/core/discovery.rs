use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use thiserror::Error;

use crate::core::filters::{UserFilter, UserOrder};
use crate::core::like_graph::resolve_connected;
use crate::core::pagination::PagedList;
use crate::models::{LikeDirection, User, UserParams};
use crate::services::{EntityStore, StoreError};

pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const MAX_PAGE_SIZE: usize = 50;

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Discovery orchestrator - runs one query against the entity store
///
/// # Pipeline Stages
/// 1. Like-graph resolution for the requested directions
/// 2. Filter assembly from the query parameters
/// 3. Filtered, ordered enumeration in the store
/// 4. Pagination
///
/// Holds no per-request state; concurrent calls are independent.
pub struct DiscoveryService<S: ?Sized> {
    store: Arc<S>,
    default_page_size: usize,
    max_page_size: usize,
}

impl<S: ?Sized> Clone for DiscoveryService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            default_page_size: self.default_page_size,
            max_page_size: self.max_page_size,
        }
    }
}

impl<S> DiscoveryService<S>
where
    S: EntityStore + ?Sized,
{
    pub fn new(store: Arc<S>) -> Self {
        Self::with_page_limits(store, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE)
    }

    pub fn with_page_limits(store: Arc<S>, default_page_size: usize, max_page_size: usize) -> Self {
        Self {
            store,
            default_page_size,
            max_page_size,
        }
    }

    /// Discover users for today's date (UTC)
    pub async fn discover_users(&self, params: &UserParams) -> Result<PagedList<User>, DiscoveryError> {
        self.discover_users_on(params, Utc::now().date_naive()).await
    }

    /// Discover users with age bounds evaluated against `today`
    pub async fn discover_users_on(
        &self,
        params: &UserParams,
        today: NaiveDate,
    ) -> Result<PagedList<User>, DiscoveryError> {
        let params = params
            .clone()
            .normalized(self.default_page_size, self.max_page_size);

        let likers = if params.likers {
            Some(resolve_connected(&*self.store, params.user_id, LikeDirection::Incoming).await?)
        } else {
            None
        };

        let likees = if params.likees {
            Some(resolve_connected(&*self.store, params.user_id, LikeDirection::Outgoing).await?)
        } else {
            None
        };

        let filter = UserFilter::build(&params, likers, likees, today);
        let order = UserOrder::from_key(params.order_by.as_deref());

        tracing::debug!(
            "Discovery filter for user {}: gender={:?}, connected={:?}, dob_window={:?}, order={}",
            params.user_id,
            filter.gender,
            filter.connected.as_ref().map(|c| c.len()),
            filter.dob_window,
            order.as_str()
        );

        let users = self.store.enumerate_users(&filter, order).await?;

        let page = PagedList::create(
            users,
            params.page_number,
            params.page_size.unwrap_or(self.default_page_size),
        );

        tracing::debug!(
            "Page {}/{} for user {}: {} of {} users",
            page.current_page,
            page.total_pages,
            params.user_id,
            page.items.len(),
            page.total_count
        );

        Ok(page)
    }
}
