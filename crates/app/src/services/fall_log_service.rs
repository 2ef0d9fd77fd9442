//! Fall log service — records accepted falls and keeps the caregiver informed.

use std::collections::HashSet;

use falldetect_domain::account::{AccountLink, UserId};
use falldetect_domain::error::FallDetectError;
use falldetect_domain::fall_event::FallEvent;

use crate::ports::{AlertNotifier, EventSink, FallAlert, FallEventRepository, LinkRepository};

/// Application service for the per-account fall log.
///
/// As an [`EventSink`] it records every accepted fall for the monitored
/// account, copies it to the linked caregiver's log, and alerts the
/// caregiver (or the owner when nobody is linked).
pub struct FallLogService<R, L, N> {
    owner: UserId,
    events: R,
    links: L,
    notifier: N,
}

impl<R, L, N> FallLogService<R, L, N>
where
    R: FallEventRepository + Send + Sync,
    L: LinkRepository + Send + Sync,
    N: AlertNotifier + Send + Sync,
{
    /// Create a service recording falls for `owner`.
    pub fn new(owner: UserId, events: R, links: L, notifier: N) -> Self {
        Self {
            owner,
            events,
            links,
            notifier,
        }
    }

    /// The monitored account.
    #[must_use]
    pub fn owner(&self) -> &UserId {
        &self.owner
    }

    /// Record `event` and alert whoever should hear about it.
    ///
    /// # Errors
    ///
    /// Returns a storage error when the owner's log, the link lookup, or the
    /// linked log fails. The owner's entry is written first and survives a
    /// later failure. Notifier failures are logged and swallowed.
    #[tracing::instrument(skip(self, event), fields(owner = %self.owner, fall_type = event.fall_type()))]
    pub async fn record(&self, event: FallEvent) -> Result<(), FallDetectError> {
        let alert = FallAlert::for_event(&event);
        let stored = self.events.append(&self.owner, event).await?;

        let linked = self.links.linked_user(&self.owner).await?;
        if let Some(linked) = &linked {
            self.events.append(linked, stored).await?;
            tracing::debug!(%linked, "fall event copied to linked account");
        }

        let recipient = linked.as_ref().unwrap_or(&self.owner);
        if let Err(err) = self.notifier.notify(recipient, &alert).await {
            tracing::warn!(%err, %recipient, "failed to send fall alert");
        }
        Ok(())
    }

    /// The fall history visible to `user`: their own log followed by the
    /// linked account's log, without repeated `(date, time, severity)`
    /// entries. The first occurrence wins.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repositories.
    #[tracing::instrument(skip(self))]
    pub async fn history(&self, user: &UserId) -> Result<Vec<FallEvent>, FallDetectError> {
        let mut events = self.events.list(user).await?;
        if let Some(linked) = self.links.linked_user(user).await? {
            events.extend(self.events.list(&linked).await?);
        }

        let mut seen = HashSet::new();
        events.retain(|event| {
            let (date, time, severity) = event.dedup_key();
            seen.insert((date.to_string(), time.to_string(), severity.to_string()))
        });
        Ok(events)
    }

    /// Link two accounts by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`FallDetectError::Validation`] when either id is blank or
    /// both are the same, or a storage error from the repository.
    #[tracing::instrument(skip(self))]
    pub async fn link_users(
        &self,
        current: &str,
        other: &str,
    ) -> Result<AccountLink, FallDetectError> {
        let link = AccountLink::new(UserId::new(current)?, UserId::new(other)?)?;
        self.links.link(&link).await?;
        tracing::info!("accounts linked");
        Ok(link)
    }
}

impl<R, L, N> EventSink for FallLogService<R, L, N>
where
    R: FallEventRepository + Send + Sync,
    L: LinkRepository + Send + Sync,
    N: AlertNotifier + Send + Sync,
{
    async fn deliver(&self, event: FallEvent) -> Result<(), FallDetectError> {
        self.record(event).await
    }
}
