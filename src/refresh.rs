//! Cache refresh policy
//!
//! Decides whether a cached profile can be served as-is or has to be fetched
//! again, and writes fetch results back into the [`ProfileStore`].
//!
//! Concurrent lookups of the same username are not coalesced: both may fetch
//! and both upsert. The store keeps one row per username and the later write
//! wins.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::cache::{ProfileStore, StoreError};
use crate::config::{Config, REFRESH_TIMEOUT_SECS};
use crate::data::{CachedProfile, FetchError, ProfileSource};
use crate::identity::{is_valid_username, Identity, IdentityError, Service};

/// Errors that can occur while resolving a username
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Rejected before touching the store or the network
    #[error(transparent)]
    InvalidIdentity(#[from] IdentityError),

    /// The FOAF request failed; nothing was written
    #[error("Failed to fetch profile for {identity}: {source}")]
    FetchFailed {
        identity: String,
        #[source]
        source: FetchError,
        /// The row as it was before the attempt, if there was one
        stale: Option<Box<CachedProfile>>,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Outcome of a lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A row exists for the username (it may be blocked or empty)
    Found(CachedProfile),
    /// No usable row after the lookup
    NotFound,
}

impl Resolution {
    pub fn profile(&self) -> Option<&CachedProfile> {
        match self {
            Resolution::Found(profile) => Some(profile),
            Resolution::NotFound => None,
        }
    }
}

impl From<Option<CachedProfile>> for Resolution {
    fn from(row: Option<CachedProfile>) -> Self {
        row.map_or(Resolution::NotFound, Resolution::Found)
    }
}

/// Freshness of a cached row at a point in time
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheState {
    /// Never fetched
    Missing,
    /// Administratively blocked; served as-is
    Blocked(CachedProfile),
    /// Younger than the refresh timeout
    Fresh(CachedProfile),
    /// At or past the refresh timeout
    Stale(CachedProfile),
}

/// Classifies a row. A row is stale once `now - refreshed_at >= ttl`.
pub fn classify(row: Option<CachedProfile>, now: i64, ttl: i64) -> CacheState {
    match row {
        None => CacheState::Missing,
        Some(row) if row.blocked => CacheState::Blocked(row),
        Some(row) if now - row.refreshed_at < ttl => CacheState::Fresh(row),
        Some(row) => CacheState::Stale(row),
    }
}

/// Result of an explicit refresh request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Blocked,
    Failed,
    Refreshed,
}

impl fmt::Display for RefreshOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RefreshOutcome::Blocked => "Blocked.",
            RefreshOutcome::Failed => "Failed.",
            RefreshOutcome::Refreshed => "Refreshed.",
        })
    }
}

fn now_secs() -> i64 {
    Utc::now().timestamp()
}

/// Resolves usernames through the cache, fetching FOAF documents as needed
pub struct Resolver<S> {
    store: Arc<ProfileStore>,
    source: S,
    service: Service,
    ttl: i64,
}

impl<S: ProfileSource> Resolver<S> {
    /// Creates a resolver with the default one-week refresh timeout
    pub fn new(store: Arc<ProfileStore>, source: S, service: Service) -> Self {
        Self {
            store,
            source,
            service,
            ttl: REFRESH_TIMEOUT_SECS,
        }
    }

    /// Creates a resolver using the service and timeout from `config`
    pub fn from_config(store: Arc<ProfileStore>, source: S, config: &Config) -> Self {
        Self::new(store, source, config.service()).with_ttl(config.refresh_timeout_secs)
    }

    /// Overrides the refresh timeout in seconds
    pub fn with_ttl(mut self, ttl: i64) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn store(&self) -> &ProfileStore {
        &self.store
    }

    pub fn service(&self) -> &Service {
        &self.service
    }

    /// Looks up a username or journal URL, refreshing it if needed.
    ///
    /// Validation happens first; invalid input never reaches the store.
    pub async fn resolve(&self, raw: &str) -> Result<Resolution, ResolveError> {
        let identity = self.service.normalize(raw)?;
        self.resolve_at(&identity, now_secs()).await
    }

    /// Like [`Resolver::resolve`], but a failed fetch degrades to the stale
    /// row if there is one, or to [`Resolution::NotFound`] if there isn't.
    pub async fn resolve_or_stale(&self, raw: &str) -> Result<Resolution, ResolveError> {
        match self.resolve(raw).await {
            Err(ResolveError::FetchFailed { identity, stale, .. }) => {
                debug!(%identity, has_stale = stale.is_some(), "serving after failed fetch");
                Ok(stale.map(|row| *row).into())
            }
            other => other,
        }
    }

    /// Resolves `identity` as of `now` (epoch seconds).
    pub async fn resolve_at(
        &self,
        identity: &Identity,
        now: i64,
    ) -> Result<Resolution, ResolveError> {
        let row = self.store.get(identity.as_str())?;
        match classify(row, now, self.ttl) {
            CacheState::Fresh(row) => {
                debug!(%identity, "cache fresh");
                Ok(Resolution::Found(row))
            }
            CacheState::Blocked(row) => {
                debug!(%identity, "blocked, serving cached row");
                Ok(Resolution::Found(row))
            }
            CacheState::Missing => {
                debug!(%identity, "cache miss");
                Ok(self.fetch_and_store(identity, None, now).await?.into())
            }
            CacheState::Stale(row) => {
                debug!(%identity, age = now - row.refreshed_at, "cache stale");
                Ok(self.fetch_and_store(identity, Some(row), now).await?.into())
            }
        }
    }

    /// Fetches `identity` regardless of the cached row's age.
    ///
    /// Returns `Ok(None)` when the document was malformed or did not describe
    /// `identity`; an empty row is cached in both cases.
    pub async fn refresh_at(
        &self,
        identity: &Identity,
        now: i64,
    ) -> Result<Option<CachedProfile>, ResolveError> {
        let previous = self.store.get(identity.as_str())?;
        self.fetch_and_store(identity, previous, now).await
    }

    /// Explicit refresh request, reported as plain text by the caller.
    pub async fn refresh_command(&self, raw: &str) -> Result<RefreshOutcome, ResolveError> {
        let identity = self.service.normalize(raw)?;
        if let Some(row) = self.store.get(identity.as_str())? {
            if row.blocked {
                return Ok(RefreshOutcome::Blocked);
            }
        }

        match self.refresh_at(&identity, now_secs()).await {
            Ok(Some(_)) => Ok(RefreshOutcome::Refreshed),
            Ok(None) | Err(ResolveError::FetchFailed { .. }) => Ok(RefreshOutcome::Failed),
            Err(e) => Err(e),
        }
    }

    /// Marks a user as blocked. Users never seen before get an empty blocked row.
    pub fn block(&self, raw: &str) -> Result<Identity, ResolveError> {
        let identity = self.service.normalize(raw)?;
        if !self.store.set_blocked(identity.as_str(), true)? {
            self.store.upsert(&CachedProfile {
                blocked: true,
                ..CachedProfile::empty(identity.as_str(), 0)
            })?;
        }
        info!(%identity, "blocked");
        Ok(identity)
    }

    /// Clears the block flag. The flag is false if the user has no cached row.
    pub fn unblock(&self, raw: &str) -> Result<(Identity, bool), ResolveError> {
        let identity = self.service.normalize(raw)?;
        let changed = self.store.set_blocked(identity.as_str(), false)?;
        info!(%identity, changed, "unblocked");
        Ok((identity, changed))
    }

    async fn fetch_and_store(
        &self,
        identity: &Identity,
        previous: Option<CachedProfile>,
        now: i64,
    ) -> Result<Option<CachedProfile>, ResolveError> {
        let url = self.service.foaflink(identity.as_str());
        info!(%identity, %url, "fetching profile");

        let people = match self.source.fetch(&url).await {
            Ok(people) => people,
            Err(FetchError::MalformedDocument(reason)) => {
                warn!(%identity, %reason, "malformed profile document, caching empty result");
                self.store_unless_blocked(&CachedProfile::empty(identity.as_str(), now))?;
                return Ok(None);
            }
            Err(source) => {
                warn!(%identity, error = %source, "profile fetch failed");
                return Err(ResolveError::FetchFailed {
                    identity: identity.to_string(),
                    source,
                    stale: previous.map(Box::new),
                });
            }
        };

        info!(%identity, people = people.len(), "profile document parsed");
        for person in people.values() {
            if !is_valid_username(&person.nick) {
                debug!(nick = %person.nick, "skipping person with invalid nick");
                continue;
            }
            self.store_unless_blocked(&CachedProfile::from_person(person, now))?;
        }

        if !people.contains_key(identity.as_str()) {
            debug!(%identity, "document does not describe requested user");
            self.store_unless_blocked(&CachedProfile::empty(identity.as_str(), now))?;
            return Ok(None);
        }

        Ok(self.store.get(identity.as_str())?)
    }

    /// Upserts `profile` unless its row is blocked. Blocked rows only change
    /// through [`ProfileStore::set_blocked`].
    fn store_unless_blocked(&self, profile: &CachedProfile) -> Result<(), StoreError> {
        if !self.store.upsert_unless_blocked(profile)? {
            debug!(identity = %profile.identity, "skipping blocked row");
        }
        Ok(())
    }
}
