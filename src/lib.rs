//! Client core for the CycleSync menstrual-cycle tracking service.
//!
//! Two pieces carry the weight: the session manager, which owns the
//! access/refresh token pair and transparently recovers from access-token
//! expiry, and the cycle projector, which turns a cycle's anchor date and
//! length parameters into a classified, angularly positioned day sequence
//! for grid and radial calendar rendering. Everything else is the REST
//! plumbing around them.

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::service::{CachedResource, CycleSyncService};
pub use application::session::SessionManager;
pub use domain::cycle::{CycleDay, current_cycle_start, local_today, project};
pub use domain::models::{
    AuthResponse, CyclePhase, DailyEntry, DailyEntryUpdate, DashboardData, Profile, ProfileUpdate,
    RegistrationRequest, RemoteCycleDay, SessionTokens, User,
};
pub use infrastructure::api_client::{ApiHttpClient, ReqwestApiClient};
pub use infrastructure::auth_client::{AuthHttpClient, ReqwestAuthClient};
pub use infrastructure::config::{ClientConfig, ensure_default_config, load_config};
pub use infrastructure::error::ClientError;
pub use infrastructure::response_cache::{
    CachedResponse, InMemoryResponseCache, ResponseCache, SqliteResponseCache,
};
pub use infrastructure::token_store::{InMemoryTokenStore, KeyringTokenStore, TokenStore};
