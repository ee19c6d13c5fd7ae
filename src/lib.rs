//! Lume Discovery - user discovery query engine for Lume dating app
//!
//! Given a store of user profiles, their photos and the directed like
//! relation, this library produces a filtered, ordered and paginated set of
//! candidate profiles for a requesting user.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use self::core::{DiscoveryService, DiscoveryError, PagedList, PaginationHeader, UserFilter, UserOrder};
pub use models::{User, Photo, Like, LikeDirection, UserParams};
pub use services::{EntityStore, EntityWriter, InMemoryStore, PostgresStore, StoreError};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        // Verify that the library exports work correctly
        let page = PagedList::create(vec![1, 2, 3], 1, 2);
        assert_eq!(page.total_pages, 2);
        assert_eq!(UserOrder::from_key(None), UserOrder::LastActive);
    }
}
