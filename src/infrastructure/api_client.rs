use crate::domain::models::{
    DailyEntry, DailyEntryUpdate, DashboardData, Profile, ProfileUpdate, RemoteCycleDay,
};
use crate::infrastructure::auth_client::decode_error_message;
use crate::infrastructure::error::ClientError;
use async_trait::async_trait;
use reqwest::Client;
use url::Url;

const PROFILE_PATH: &str = "profile/";
const DAILY_ENTRY_PATH: &str = "daily-entry/";
const CALENDAR_PATH: &str = "calendar/";
const DASHBOARD_PATH: &str = "dashboard/";

/// Data endpoints of the CycleSync backend. Each call carries the bearer
/// credential when one is present and goes out unauthenticated otherwise;
/// the service layer owns the refresh-and-retry policy.
#[async_trait]
pub trait ApiHttpClient: Send + Sync {
    async fn get_profile(&self, access_token: Option<&str>) -> Result<Profile, ClientError>;

    async fn update_profile(
        &self,
        access_token: Option<&str>,
        update: &ProfileUpdate,
    ) -> Result<Profile, ClientError>;

    async fn get_daily_entry(&self, access_token: Option<&str>) -> Result<DailyEntry, ClientError>;

    async fn save_daily_entry(
        &self,
        access_token: Option<&str>,
        entry: &DailyEntryUpdate,
    ) -> Result<DailyEntry, ClientError>;

    async fn get_calendar(
        &self,
        access_token: Option<&str>,
    ) -> Result<Vec<RemoteCycleDay>, ClientError>;

    async fn get_dashboard(&self, access_token: Option<&str>) -> Result<DashboardData, ClientError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestApiClient {
    client: Client,
    base_url: Url,
}

#[derive(Debug, serde::Deserialize)]
struct CalendarResponsePayload {
    days_list: Vec<RemoteCycleDay>,
}

impl ReqwestApiClient {
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

    fn apply_auth(
        request: reqwest::RequestBuilder,
        access_token: Option<&str>,
    ) -> reqwest::RequestBuilder {
        match access_token.map(str::trim).filter(|token| !token.is_empty()) {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn execute<T: serde::de::DeserializeOwned>(
        request: reqwest::RequestBuilder,
        context: &str,
    ) -> Result<T, ClientError> {
        let response = request
            .send()
            .await
            .map_err(|error| ClientError::Transport(format!("network error during {context}: {error}")))?;

        let status = response.status();
        let body = response.text().await.map_err(|error| {
            ClientError::Transport(format!("failed reading {context} response: {error}"))
        })?;

        if !status.is_success() {
            let message = decode_error_message(&body, status.as_u16());
            if status == reqwest::StatusCode::UNAUTHORIZED {
                return Err(ClientError::Unauthorized(message));
            }
            return Err(ClientError::Api {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&body).map_err(|error| {
            ClientError::Transport(format!("invalid {context} payload: {error}; body={body}"))
        })
    }
}

#[async_trait]
impl ApiHttpClient for ReqwestApiClient {
    async fn get_profile(&self, access_token: Option<&str>) -> Result<Profile, ClientError> {
        let endpoint = self.endpoint(PROFILE_PATH)?;
        let request = Self::apply_auth(self.client.get(endpoint), access_token);
        Self::execute(request, "profile fetch").await
    }

    async fn update_profile(
        &self,
        access_token: Option<&str>,
        update: &ProfileUpdate,
    ) -> Result<Profile, ClientError> {
        update.validate().map_err(ClientError::Validation)?;
        let endpoint = self.endpoint(PROFILE_PATH)?;
        let request = Self::apply_auth(self.client.put(endpoint).json(update), access_token);
        Self::execute(request, "profile update").await
    }

    async fn get_daily_entry(&self, access_token: Option<&str>) -> Result<DailyEntry, ClientError> {
        let endpoint = self.endpoint(DAILY_ENTRY_PATH)?;
        let request = Self::apply_auth(self.client.get(endpoint), access_token);
        Self::execute(request, "daily entry fetch").await
    }

    async fn save_daily_entry(
        &self,
        access_token: Option<&str>,
        entry: &DailyEntryUpdate,
    ) -> Result<DailyEntry, ClientError> {
        let endpoint = self.endpoint(DAILY_ENTRY_PATH)?;
        let request = Self::apply_auth(self.client.post(endpoint).json(entry), access_token);
        Self::execute(request, "daily entry save").await
    }

    async fn get_calendar(
        &self,
        access_token: Option<&str>,
    ) -> Result<Vec<RemoteCycleDay>, ClientError> {
        let endpoint = self.endpoint(CALENDAR_PATH)?;
        let request = Self::apply_auth(self.client.get(endpoint), access_token);
        let payload: CalendarResponsePayload = Self::execute(request, "calendar fetch").await?;
        Ok(payload.days_list)
    }

    async fn get_dashboard(&self, access_token: Option<&str>) -> Result<DashboardData, ClientError> {
        let endpoint = self.endpoint(DASHBOARD_PATH)?;
        let request = Self::apply_auth(self.client.get(endpoint), access_token);
        let data: DashboardData = Self::execute(request, "dashboard fetch").await?;
        data.validate().map_err(ClientError::Validation)?;
        Ok(data)
    }
}
