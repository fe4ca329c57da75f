use crate::domain::models::{RegistrationRequest, SessionTokens, User};
use crate::infrastructure::auth_client::AuthHttpClient;
use crate::infrastructure::error::ClientError;
use crate::infrastructure::token_store::TokenStore;
use std::sync::Arc;
use tracing::{debug, warn};

/// Owns the access/refresh token pair and recovers from access-token expiry.
///
/// The session is an explicit handle with injected collaborators rather than
/// ambient global state: construct it at app start, share it behind an `Arc`,
/// and every HTTP-calling layer reads the bearer credential through it.
///
/// States are unauthenticated (no stored pair) and authenticated (complete
/// pair); any refresh failure drops straight back to unauthenticated.
pub struct SessionManager<S, A>
where
    S: TokenStore,
    A: AuthHttpClient,
{
    token_store: Arc<S>,
    auth_client: Arc<A>,
    refresh_lock: tokio::sync::Mutex<()>,
}

impl<S, A> SessionManager<S, A>
where
    S: TokenStore,
    A: AuthHttpClient,
{
    pub fn new(token_store: Arc<S>, auth_client: Arc<A>) -> Self {
        Self {
            token_store,
            auth_client,
            refresh_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn set_tokens(&self, access: &str, refresh: &str) -> Result<(), ClientError> {
        let tokens = SessionTokens::new(access, refresh);
        tokens.validate().map_err(ClientError::Validation)?;
        self.token_store.save_tokens(&tokens)
    }

    pub fn access_token(&self) -> Result<Option<String>, ClientError> {
        Ok(self.token_store.load_tokens()?.map(|tokens| tokens.access))
    }

    pub fn refresh_token(&self) -> Result<Option<String>, ClientError> {
        Ok(self.token_store.load_tokens()?.map(|tokens| tokens.refresh))
    }

    pub fn is_authenticated(&self) -> Result<bool, ClientError> {
        Ok(self.token_store.load_tokens()?.is_some())
    }

    pub fn clear_tokens(&self) -> Result<(), ClientError> {
        self.token_store.delete_tokens()
    }

    /// Creates an account and establishes the session from the returned pair.
    pub async fn register(&self, request: &RegistrationRequest) -> Result<User, ClientError> {
        request.validate().map_err(ClientError::Validation)?;
        let response = self.auth_client.register(request).await?;
        self.set_tokens(&response.access, &response.refresh)?;
        Ok(response.user)
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<User, ClientError> {
        let response = self.auth_client.login(username, password).await?;
        self.set_tokens(&response.access, &response.refresh)?;
        Ok(response.user)
    }

    /// Invalidates the refresh token server-side, then clears local state.
    /// The local teardown happens even when the server call fails; worst
    /// case is a forced return to the unauthenticated state.
    pub async fn logout(&self) -> Result<(), ClientError> {
        if let Some(tokens) = self.token_store.load_tokens()? {
            if let Err(error) = self
                .auth_client
                .logout(&tokens.access, &tokens.refresh)
                .await
            {
                warn!(%error, "server-side logout failed; clearing local session anyway");
            }
        }
        self.clear_tokens()
    }

    /// Exchanges the refresh token for a new pair, returning the new access
    /// token. Not retried: a single failure tears the session down.
    pub async fn refresh(&self) -> Result<String, ClientError> {
        self.refresh_after(None).await
    }

    /// Refresh for callers reacting to a rejected request. `stale_access` is
    /// the token the caller saw fail; refreshes are serialized, and a waiter
    /// that finds the stored token already replaced returns it without a
    /// second exchange.
    pub async fn refresh_after(&self, stale_access: Option<&str>) -> Result<String, ClientError> {
        let _guard = self.refresh_lock.lock().await;

        let Some(current) = self.token_store.load_tokens()? else {
            self.token_store.delete_tokens()?;
            return Err(ClientError::SessionExpired);
        };

        if let Some(stale) = stale_access {
            if current.access != stale {
                debug!("token already refreshed by a concurrent caller");
                return Ok(current.access);
            }
        }

        match self.auth_client.refresh(&current.refresh).await {
            Ok(tokens) => {
                self.token_store.save_tokens(&tokens)?;
                debug!("token pair refreshed");
                Ok(tokens.access)
            }
            Err(error) => {
                warn!(%error, "token refresh failed; tearing down session");
                self.token_store.delete_tokens()?;
                match error {
                    ClientError::Unauthorized(_) | ClientError::Api { .. } => {
                        Err(ClientError::SessionExpired)
                    }
                    other => Err(other),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::AuthResponse;
    use crate::infrastructure::token_store::InMemoryTokenStore;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone)]
    enum FakeTokenResponse {
        Success(SessionTokens),
        Rejected(String),
        Unreachable(String),
    }

    impl Default for FakeTokenResponse {
        fn default() -> Self {
            Self::Success(SessionTokens::new("fake_access", "fake_refresh"))
        }
    }

    #[derive(Debug, Default)]
    struct FakeAuthClient {
        refresh_response: Mutex<FakeTokenResponse>,
        reject_logout: Mutex<bool>,
        register_calls: AtomicUsize,
        login_calls: AtomicUsize,
        logout_calls: AtomicUsize,
        refresh_calls: AtomicUsize,
    }

    impl FakeAuthClient {
        fn set_refresh_response(&self, response: FakeTokenResponse) {
            *self.refresh_response.lock().expect("refresh mutex poisoned") = response;
        }

        fn reject_logout(&self) {
            *self.reject_logout.lock().expect("logout mutex poisoned") = true;
        }

        fn sample_user() -> User {
            User {
                id: 3,
                username: "amara".to_string(),
                email: None,
            }
        }
    }

    #[async_trait]
    impl AuthHttpClient for FakeAuthClient {
        async fn register(
            &self,
            _request: &RegistrationRequest,
        ) -> Result<AuthResponse, ClientError> {
            self.register_calls.fetch_add(1, Ordering::SeqCst);
            Ok(AuthResponse {
                access: "registered_access".to_string(),
                refresh: "registered_refresh".to_string(),
                user: Self::sample_user(),
            })
        }

        async fn login(&self, _username: &str, _password: &str) -> Result<AuthResponse, ClientError> {
            self.login_calls.fetch_add(1, Ordering::SeqCst);
            Ok(AuthResponse {
                access: "login_access".to_string(),
                refresh: "login_refresh".to_string(),
                user: Self::sample_user(),
            })
        }

        async fn logout(&self, _access_token: &str, _refresh_token: &str) -> Result<(), ClientError> {
            self.logout_calls.fetch_add(1, Ordering::SeqCst);
            if *self.reject_logout.lock().expect("logout mutex poisoned") {
                return Err(ClientError::Api {
                    status: 400,
                    message: "Token is blacklisted".to_string(),
                });
            }
            Ok(())
        }

        async fn refresh(&self, _refresh_token: &str) -> Result<SessionTokens, ClientError> {
            self.refresh_calls.fetch_add(1, Ordering::SeqCst);
            match self
                .refresh_response
                .lock()
                .expect("refresh mutex poisoned")
                .clone()
            {
                FakeTokenResponse::Success(tokens) => Ok(tokens),
                FakeTokenResponse::Rejected(message) => Err(ClientError::Unauthorized(message)),
                FakeTokenResponse::Unreachable(message) => Err(ClientError::Transport(message)),
            }
        }
    }

    fn manager() -> (
        SessionManager<InMemoryTokenStore, FakeAuthClient>,
        Arc<InMemoryTokenStore>,
        Arc<FakeAuthClient>,
    ) {
        let store = Arc::new(InMemoryTokenStore::default());
        let client = Arc::new(FakeAuthClient::default());
        (
            SessionManager::new(Arc::clone(&store), Arc::clone(&client)),
            store,
            client,
        )
    }

    #[tokio::test]
    async fn set_get_clear_roundtrip() {
        let (session, _store, _client) = manager();

        session.set_tokens("A1", "R1").expect("set tokens");
        assert_eq!(session.access_token().expect("read"), Some("A1".to_string()));
        assert_eq!(session.refresh_token().expect("read"), Some("R1".to_string()));
        assert!(session.is_authenticated().expect("read"));

        session.clear_tokens().expect("first clear");
        session.clear_tokens().expect("idempotent clear");
        assert_eq!(session.access_token().expect("read"), None);
        assert_eq!(session.refresh_token().expect("read"), None);
    }

    #[tokio::test]
    async fn set_tokens_rejects_empty_values() {
        let (session, _store, _client) = manager();
        assert!(session.set_tokens("", "R1").is_err());
        assert!(session.set_tokens("A1", "  ").is_err());
        assert!(!session.is_authenticated().expect("read"));
    }

    #[tokio::test]
    async fn refresh_replaces_the_whole_pair() {
        let (session, _store, client) = manager();
        session.set_tokens("A1", "R1").expect("set tokens");
        client.set_refresh_response(FakeTokenResponse::Success(SessionTokens::new("A2", "R2")));

        let access = session.refresh().await.expect("refresh");
        assert_eq!(access, "A2");
        assert_eq!(session.access_token().expect("read"), Some("A2".to_string()));
        assert_eq!(session.refresh_token().expect("read"), Some("R2".to_string()));
    }

    #[tokio::test]
    async fn rejected_refresh_tears_down_the_session() {
        let (session, _store, client) = manager();
        session.set_tokens("A1", "R1").expect("set tokens");
        client.set_refresh_response(FakeTokenResponse::Rejected("invalid_grant".to_string()));

        let result = session.refresh().await;
        assert!(matches!(result, Err(ClientError::SessionExpired)));
        assert_eq!(session.access_token().expect("read"), None);
        assert_eq!(session.refresh_token().expect("read"), None);
    }

    #[tokio::test]
    async fn transport_failure_during_refresh_also_clears_tokens() {
        let (session, _store, client) = manager();
        session.set_tokens("A1", "R1").expect("set tokens");
        client.set_refresh_response(FakeTokenResponse::Unreachable("connection refused".to_string()));

        let result = session.refresh().await;
        assert!(matches!(result, Err(ClientError::Transport(_))));
        assert_eq!(session.access_token().expect("read"), None);
    }

    #[tokio::test]
    async fn refresh_without_a_session_makes_no_network_call() {
        let (session, _store, client) = manager();
        let result = session.refresh().await;
        assert!(matches!(result, Err(ClientError::SessionExpired)));
        assert_eq!(client.refresh_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn concurrent_refreshes_coalesce_into_one_exchange() {
        let (session, _store, client) = manager();
        session.set_tokens("A1", "R1").expect("set tokens");
        client.set_refresh_response(FakeTokenResponse::Success(SessionTokens::new("A2", "R2")));

        let (first, second) = tokio::join!(
            session.refresh_after(Some("A1")),
            session.refresh_after(Some("A1"))
        );

        assert_eq!(first.expect("first refresh"), "A2");
        assert_eq!(second.expect("second refresh"), "A2");
        assert_eq!(client.refresh_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn login_establishes_the_session() {
        let (session, _store, client) = manager();
        let user = session.login("amara", "correct-horse").await.expect("login");
        assert_eq!(user.username, "amara");
        assert_eq!(
            session.access_token().expect("read"),
            Some("login_access".to_string())
        );
        assert_eq!(client.login_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn register_validates_before_any_network_call() {
        let (session, _store, client) = manager();
        let request = RegistrationRequest {
            username: "amara".to_string(),
            password: "short".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(1994, 6, 2),
            country: None,
            cycle_type: None,
            last_cycle_start: None,
            cycle_length: Some(28),
            period_length: Some(5),
            preferences: Vec::new(),
        };

        let result = session.register(&request).await;
        assert!(matches!(result, Err(ClientError::Validation(_))));
        assert_eq!(client.register_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn register_establishes_the_session() {
        let (session, _store, client) = manager();
        let request = RegistrationRequest {
            username: "amara".to_string(),
            password: "correct-horse".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(1994, 6, 2),
            country: Some("NL".to_string()),
            cycle_type: Some("regular".to_string()),
            last_cycle_start: NaiveDate::from_ymd_opt(2024, 1, 1),
            cycle_length: Some(28),
            period_length: Some(5),
            preferences: vec!["cycle".to_string()],
        };

        session.register(&request).await.expect("register");
        assert_eq!(
            session.access_token().expect("read"),
            Some("registered_access".to_string())
        );
        assert_eq!(client.register_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn logout_clears_tokens_even_when_the_server_rejects() {
        let (session, _store, client) = manager();
        session.set_tokens("A1", "R1").expect("set tokens");
        client.reject_logout();

        session.logout().await.expect("logout");
        assert_eq!(session.access_token().expect("read"), None);
        assert_eq!(client.logout_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn logout_without_a_session_skips_the_server_call() {
        let (session, _store, client) = manager();
        session.logout().await.expect("logout");
        assert_eq!(client.logout_calls.load(Ordering::SeqCst), 0);
    }
}
