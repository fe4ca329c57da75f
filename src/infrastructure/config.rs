use crate::infrastructure::error::ClientError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use url::Url;

const CLIENT_JSON: &str = "client.json";
const SUPPORTED_SCHEMA: u8 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    pub schema: u8,
    pub base_url: String,
    pub timezone: String,
    pub cache_ttl_seconds: u32,
    pub credential_service: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            schema: SUPPORTED_SCHEMA,
            base_url: "http://localhost:8000/api/".to_string(),
            timezone: "UTC".to_string(),
            cache_ttl_seconds: 300,
            credential_service: "cyclesync.session".to_string(),
        }
    }
}

impl ClientConfig {
    /// Parses and normalizes the configured API base. The base must end in a
    /// slash so relative endpoint joins keep its path.
    pub fn api_base(&self) -> Result<Url, ClientError> {
        let trimmed = self.base_url.trim();
        if trimmed.is_empty() {
            return Err(ClientError::InvalidConfig("baseUrl must not be empty".to_string()));
        }
        let normalized = if trimmed.ends_with('/') {
            trimmed.to_string()
        } else {
            format!("{trimmed}/")
        };
        Url::parse(&normalized)
            .map_err(|error| ClientError::InvalidConfig(format!("invalid baseUrl: {error}")))
    }

    fn validate(&self) -> Result<(), ClientError> {
        if self.schema != SUPPORTED_SCHEMA {
            return Err(ClientError::InvalidConfig(format!(
                "unsupported schema {}",
                self.schema
            )));
        }
        self.api_base()?;
        if self.timezone.trim().is_empty() {
            return Err(ClientError::InvalidConfig("timezone must not be empty".to_string()));
        }
        if self.credential_service.trim().is_empty() {
            return Err(ClientError::InvalidConfig(
                "credentialService must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

pub fn ensure_default_config(config_dir: &Path) -> Result<(), ClientError> {
    let path = config_dir.join(CLIENT_JSON);
    if !path.exists() {
        let formatted = serde_json::to_string_pretty(&ClientConfig::default())?;
        fs::write(path, format!("{formatted}\n"))?;
    }
    Ok(())
}

pub fn load_config(config_dir: &Path) -> Result<ClientConfig, ClientError> {
    let path = config_dir.join(CLIENT_JSON);
    let raw = fs::read_to_string(&path)?;
    let config: ClientConfig = serde_json::from_str(&raw)?;
    config.validate()?;
    Ok(config)
}
