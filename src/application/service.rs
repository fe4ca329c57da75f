use crate::application::session::SessionManager;
use crate::domain::cycle::{self, CycleDay};
use crate::domain::models::{
    DailyEntry, DailyEntryUpdate, DashboardData, Profile, ProfileUpdate, RemoteCycleDay,
};
use crate::infrastructure::api_client::{ApiHttpClient, ReqwestApiClient};
use crate::infrastructure::auth_client::{AuthHttpClient, ReqwestAuthClient};
use crate::infrastructure::config::ClientConfig;
use crate::infrastructure::error::ClientError;
use crate::infrastructure::response_cache::{ResponseCache, SqliteResponseCache};
use crate::infrastructure::token_store::{KeyringTokenStore, TokenStore};
use chrono::{NaiveDate, Utc};
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// Cached API resources and their invalidation scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachedResource {
    Profile,
    DailyEntry,
    Calendar,
    Dashboard,
}

impl CachedResource {
    fn key(self) -> &'static str {
        match self {
            Self::Profile => "profile",
            Self::DailyEntry => "daily-entry",
            Self::Calendar => "calendar",
            Self::Dashboard => "dashboard",
        }
    }
}

/// Authenticated facade over the CycleSync REST API.
///
/// Every data operation attaches the current bearer credential, performs the
/// single refresh-then-retry cycle on a 401-class rejection, and reads
/// through an explicit cache instead of re-fetching on every caller. Writes
/// invalidate the resources they affect; logout drops everything.
pub struct CycleSyncService<S, A, C, R>
where
    S: TokenStore,
    A: AuthHttpClient,
    C: ApiHttpClient,
    R: ResponseCache,
{
    session: Arc<SessionManager<S, A>>,
    api: Arc<C>,
    cache: Arc<R>,
    cache_ttl: chrono::Duration,
}

impl CycleSyncService<KeyringTokenStore, ReqwestAuthClient, ReqwestApiClient, SqliteResponseCache> {
    /// Builds the production stack: keychain token storage, reqwest clients
    /// against the configured base URL, and a SQLite-backed cache.
    pub fn from_config(config: &ClientConfig, cache_db_path: &Path) -> Result<Self, ClientError> {
        let base_url = config.api_base()?;
        let token_store = Arc::new(KeyringTokenStore::new(config.credential_service.clone()));
        let auth_client = Arc::new(ReqwestAuthClient::new(base_url.clone()));
        let session = Arc::new(SessionManager::new(token_store, Arc::clone(&auth_client)));
        Ok(Self {
            session,
            api: Arc::new(ReqwestApiClient::new(base_url)),
            cache: Arc::new(SqliteResponseCache::new(cache_db_path)?),
            cache_ttl: chrono::Duration::seconds(i64::from(config.cache_ttl_seconds)),
        })
    }
}

impl<S, A, C, R> CycleSyncService<S, A, C, R>
where
    S: TokenStore,
    A: AuthHttpClient,
    C: ApiHttpClient,
    R: ResponseCache,
{
    pub fn new(
        session: Arc<SessionManager<S, A>>,
        api: Arc<C>,
        cache: Arc<R>,
        cache_ttl: chrono::Duration,
    ) -> Self {
        Self {
            session,
            api,
            cache,
            cache_ttl,
        }
    }

    pub fn session(&self) -> &SessionManager<S, A> {
        &self.session
    }

    pub async fn profile(&self) -> Result<Profile, ClientError> {
        self.cached(CachedResource::Profile, || self.fetch_profile())
            .await
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<Profile, ClientError> {
        let profile = self
            .with_refresh_retry(|access| async move {
                self.api.update_profile(access.as_deref(), update).await
            })
            .await?;
        self.evict(CachedResource::Profile)?;
        Ok(profile)
    }

    pub async fn daily_entry(&self) -> Result<DailyEntry, ClientError> {
        self.cached(CachedResource::DailyEntry, || self.fetch_daily_entry())
            .await
    }

    /// Saves today's symptom entry and invalidates everything derived from it.
    pub async fn save_daily_entry(&self, entry: &DailyEntryUpdate) -> Result<DailyEntry, ClientError> {
        let saved = self
            .with_refresh_retry(|access| async move {
                self.api.save_daily_entry(access.as_deref(), entry).await
            })
            .await?;
        self.evict(CachedResource::DailyEntry)?;
        self.evict(CachedResource::Calendar)?;
        self.evict(CachedResource::Dashboard)?;
        Ok(saved)
    }

    pub async fn calendar(&self) -> Result<Vec<RemoteCycleDay>, ClientError> {
        self.cached(CachedResource::Calendar, || self.fetch_calendar())
            .await
    }

    pub async fn dashboard(&self) -> Result<DashboardData, ClientError> {
        self.cached(CachedResource::Dashboard, || self.fetch_dashboard())
            .await
    }

    /// Explicit invalidation trigger for route entry or a user-driven
    /// refresh action.
    pub fn evict(&self, resource: CachedResource) -> Result<(), ClientError> {
        self.cache.invalidate(resource.key())
    }

    /// Ends the session and drops every cached payload.
    pub async fn logout(&self) -> Result<(), ClientError> {
        self.session.logout().await?;
        self.cache.clear()
    }

    /// Projects the current cycle from the profile's recorded parameters.
    /// The local projector is the authoritative phase source; the remote
    /// `calendar/` payload is served separately and never mixed in.
    pub fn projected_cycle(
        &self,
        profile: &Profile,
        as_of: NaiveDate,
    ) -> Result<Vec<CycleDay>, ClientError> {
        let anchor = profile.last_cycle_start.ok_or_else(|| {
            ClientError::Validation("profile has no recorded cycle start".to_string())
        })?;
        let cycle_length = profile
            .cycle_length
            .filter(|length| *length > 0)
            .ok_or_else(|| ClientError::Validation("profile has no cycle length".to_string()))?;
        let period_length = profile
            .period_length
            .ok_or_else(|| ClientError::Validation("profile has no period length".to_string()))?;

        let start = cycle::current_cycle_start(anchor, cycle_length, as_of);
        Ok(cycle::project(start, cycle_length, period_length, as_of))
    }

    async fn fetch_profile(&self) -> Result<Profile, ClientError> {
        self.with_refresh_retry(|access| async move { self.api.get_profile(access.as_deref()).await })
            .await
    }

    async fn fetch_daily_entry(&self) -> Result<DailyEntry, ClientError> {
        self.with_refresh_retry(
            |access| async move { self.api.get_daily_entry(access.as_deref()).await },
        )
        .await
    }

    async fn fetch_calendar(&self) -> Result<Vec<RemoteCycleDay>, ClientError> {
        self.with_refresh_retry(|access| async move { self.api.get_calendar(access.as_deref()).await })
            .await
    }

    async fn fetch_dashboard(&self) -> Result<DashboardData, ClientError> {
        self.with_refresh_retry(
            |access| async move { self.api.get_dashboard(access.as_deref()).await },
        )
        .await
    }

    /// Runs one API call with the current credential, refreshing and
    /// retrying exactly once when the access token is rejected. A second
    /// rejection propagates; the session manager has already torn the
    /// session down if the refresh itself failed.
    async fn with_refresh_retry<T, F, Fut>(&self, call: F) -> Result<T, ClientError>
    where
        F: Fn(Option<String>) -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        let access = self.session.access_token()?;
        match call(access.clone()).await {
            Err(ClientError::Unauthorized(_)) => {
                debug!("access token rejected; refreshing and retrying once");
                let refreshed = self.session.refresh_after(access.as_deref()).await?;
                call(Some(refreshed)).await
            }
            other => other,
        }
    }

    /// Cache-or-fetch with a freshness window. A stale payload is served
    /// only when the fetch fails with a transport error; authentication
    /// failures always propagate so the caller sees the forced
    /// unauthenticated state.
    async fn cached<T, F, Fut>(&self, resource: CachedResource, fetch: F) -> Result<T, ClientError>
    where
        T: serde::Serialize + serde::de::DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        let key = resource.key();
        let now = Utc::now();
        let entry = self.cache.load(key)?;

        if let Some(entry) = &entry {
            if now - entry.stored_at <= self.cache_ttl {
                match serde_json::from_str(&entry.payload) {
                    Ok(value) => return Ok(value),
                    Err(error) => debug!(key, %error, "discarding undecodable cache entry"),
                }
            }
        }

        match fetch().await {
            Ok(value) => {
                let payload = serde_json::to_string(&value)?;
                self.cache.store(key, &payload, now)?;
                Ok(value)
            }
            Err(error) => {
                if matches!(error, ClientError::Transport(_)) {
                    if let Some(entry) = entry {
                        if let Ok(value) = serde_json::from_str(&entry.payload) {
                            warn!(key, "serving stale cached payload after transport failure");
                            return Ok(value);
                        }
                    }
                }
                Err(error)
            }
        }
    }
}
