use crate::domain::models::{AuthResponse, RegistrationRequest, SessionTokens};
use crate::infrastructure::error::ClientError;
use async_trait::async_trait;
use reqwest::Client;
use url::Url;

const REGISTER_PATH: &str = "register/";
const LOGIN_PATH: &str = "login/";
const LOGOUT_PATH: &str = "logout/";
const TOKEN_REFRESH_PATH: &str = "token/refresh/";

/// Auth endpoints of the CycleSync backend. The session manager drives this
/// trait; tests substitute a fake.
#[async_trait]
pub trait AuthHttpClient: Send + Sync {
    async fn register(&self, request: &RegistrationRequest) -> Result<AuthResponse, ClientError>;

    async fn login(&self, username: &str, password: &str) -> Result<AuthResponse, ClientError>;

    async fn logout(&self, access_token: &str, refresh_token: &str) -> Result<(), ClientError>;

    async fn refresh(&self, refresh_token: &str) -> Result<SessionTokens, ClientError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestAuthClient {
    client: Client,
    base_url: Url,
}

#[derive(Debug, serde::Serialize)]
struct LoginRequestPayload<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, serde::Serialize)]
struct RefreshRequestPayload<'a> {
    refresh: &'a str,
}

#[derive(Debug, Default, serde::Deserialize)]
struct ApiErrorPayload {
    error: Option<String>,
    detail: Option<String>,
}

impl ReqwestAuthClient {
    pub fn new(base_url: Url) -> Self {
        Self {
            client: Client::new(),
            base_url,
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        self.base_url
            .join(path)
            .map_err(|error| ClientError::InvalidConfig(format!("invalid endpoint {path}: {error}")))
    }

    async fn send_json<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        context: &str,
    ) -> Result<T, ClientError> {
        let body = self.send_raw(request, context).await?;
        serde_json::from_str(&body).map_err(|error| {
            ClientError::Transport(format!("invalid {context} payload: {error}; body={body}"))
        })
    }

    async fn send_raw(
        &self,
        request: reqwest::RequestBuilder,
        context: &str,
    ) -> Result<String, ClientError> {
        let response = request
            .send()
            .await
            .map_err(|error| ClientError::Transport(format!("network error during {context}: {error}")))?;

        let status = response.status();
        let body = response.text().await.map_err(|error| {
            ClientError::Transport(format!("failed reading {context} response: {error}"))
        })?;

        if status.is_success() {
            return Ok(body);
        }

        let message = decode_error_message(&body, status.as_u16());
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ClientError::Unauthorized(message));
        }
        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

pub(crate) fn decode_error_message(body: &str, status: u16) -> String {
    let parsed = serde_json::from_str::<ApiErrorPayload>(body).unwrap_or_default();
    parsed
        .error
        .or(parsed.detail)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| format!("http_{status}"))
}

#[async_trait]
impl AuthHttpClient for ReqwestAuthClient {
    async fn register(&self, request: &RegistrationRequest) -> Result<AuthResponse, ClientError> {
        let endpoint = self.endpoint(REGISTER_PATH)?;
        self.send_json(self.client.post(endpoint).json(request), "registration")
            .await
    }

    async fn login(&self, username: &str, password: &str) -> Result<AuthResponse, ClientError> {
        let endpoint = self.endpoint(LOGIN_PATH)?;
        let payload = LoginRequestPayload { username, password };
        self.send_json(self.client.post(endpoint).json(&payload), "login")
            .await
    }

    async fn logout(&self, access_token: &str, refresh_token: &str) -> Result<(), ClientError> {
        let endpoint = self.endpoint(LOGOUT_PATH)?;
        let payload = RefreshRequestPayload {
            refresh: refresh_token,
        };
        self.send_raw(
            self.client
                .post(endpoint)
                .bearer_auth(access_token)
                .json(&payload),
            "logout",
        )
        .await?;
        Ok(())
    }

    async fn refresh(&self, refresh_token: &str) -> Result<SessionTokens, ClientError> {
        let endpoint = self.endpoint(TOKEN_REFRESH_PATH)?;
        let payload = RefreshRequestPayload {
            refresh: refresh_token,
        };
        let tokens: SessionTokens = self
            .send_json(self.client.post(endpoint).json(&payload), "token refresh")
            .await?;
        tokens.validate().map_err(ClientError::Validation)?;
        Ok(tokens)
    }
}
