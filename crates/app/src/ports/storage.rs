//! Storage ports — repository traits for the fall log and account links.

use std::future::Future;

use falldetect_domain::account::{AccountLink, UserId};
use falldetect_domain::error::FallDetectError;
use falldetect_domain::fall_event::FallEvent;

/// Append-only per-account fall log.
pub trait FallEventRepository {
    /// Append `event` to `owner`'s log.
    fn append(
        &self,
        owner: &UserId,
        event: FallEvent,
    ) -> impl Future<Output = Result<FallEvent, FallDetectError>> + Send;

    /// All events in `owner`'s log, oldest first.
    fn list(&self, owner: &UserId)
    -> impl Future<Output = Result<Vec<FallEvent>, FallDetectError>> + Send;
}

/// Caregiver links between accounts.
pub trait LinkRepository {
    /// Store a bidirectional link, replacing any previous link of either side.
    fn link(&self, link: &AccountLink) -> impl Future<Output = Result<(), FallDetectError>> + Send;

    /// The account linked to `user`, if any.
    fn linked_user(
        &self,
        user: &UserId,
    ) -> impl Future<Output = Result<Option<UserId>, FallDetectError>> + Send;
}
