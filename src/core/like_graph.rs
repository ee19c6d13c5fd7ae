use std::collections::HashSet;

use crate::models::{Like, LikeDirection, User, UserId};
use crate::services::{EntityStore, StoreError};

/// Resolve the users connected to `user_id` through the like relation
///
/// `Incoming` yields the likers of `user_id`, `Outgoing` the users it likes.
/// A missing user or one without likes yields an empty set. Only store
/// failures are returned as errors.
pub async fn resolve_connected<S>(
    store: &S,
    user_id: UserId,
    direction: LikeDirection,
) -> Result<HashSet<UserId>, StoreError>
where
    S: EntityStore + ?Sized,
{
    let connected = match store.find_user(user_id).await? {
        Some(user) => connected_ids(&user, direction),
        None => {
            tracing::debug!("User {} not found, no {:?} likes", user_id, direction);
            HashSet::new()
        }
    };

    tracing::debug!(
        "Resolved {} {:?} likes for user {}",
        connected.len(),
        direction,
        user_id
    );

    Ok(connected)
}

/// Connected ids from a user's loaded like collections
pub fn connected_ids(user: &User, direction: LikeDirection) -> HashSet<UserId> {
    connected_in(user.likers.iter().chain(&user.likees), user.id, direction)
}

/// Same resolution over a flat list of like records
pub fn connected_in<'a, I>(likes: I, user_id: UserId, direction: LikeDirection) -> HashSet<UserId>
where
    I: IntoIterator<Item = &'a Like>,
{
    likes
        .into_iter()
        .filter_map(|like| match direction {
            LikeDirection::Incoming if like.likee_id == user_id => Some(like.liker_id),
            LikeDirection::Outgoing if like.liker_id == user_id => Some(like.likee_id),
            _ => None,
        })
        .collect()
}
