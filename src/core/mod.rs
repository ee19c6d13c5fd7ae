// Core algorithm exports
pub mod discovery;
pub mod filters;
pub mod like_graph;
pub mod pagination;

pub use discovery::{DiscoveryService, DiscoveryError};
pub use filters::{UserFilter, UserOrder, DobWindow};
pub use like_graph::{resolve_connected, connected_ids, connected_in};
pub use pagination::{PagedList, PaginationHeader};
