// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{User, UserId, Photo, PhotoId, Like, LikeDirection, NewUser, NewPhoto};
pub use requests::{UserParams, DEFAULT_MIN_AGE, DEFAULT_MAX_AGE};
pub use responses::{DiscoverUsersResponse, HealthResponse, ErrorResponse};
