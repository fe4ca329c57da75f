use crate::domain::models::SessionTokens;
use crate::infrastructure::error::ClientError;
use std::sync::Mutex;

/// Durable storage for the session's access/refresh token pair.
pub trait TokenStore: Send + Sync {
    fn save_tokens(&self, tokens: &SessionTokens) -> Result<(), ClientError>;
    fn load_tokens(&self) -> Result<Option<SessionTokens>, ClientError>;
    fn delete_tokens(&self) -> Result<(), ClientError>;
}

const ACCESS_TOKEN_KEY: &str = "access_token";
const REFRESH_TOKEN_KEY: &str = "refresh_token";

/// Keeps the pair in the platform keychain as two entries under a fixed
/// service name.
#[derive(Debug, Clone)]
pub struct KeyringTokenStore {
    service_name: String,
}

impl KeyringTokenStore {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }

    fn entry(&self, key: &str) -> Result<keyring::Entry, ClientError> {
        keyring::Entry::new(&self.service_name, key)
            .map_err(|error| ClientError::Credential(error.to_string()))
    }

    fn read_entry(&self, key: &str) -> Result<Option<String>, ClientError> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(error) => Err(ClientError::Credential(error.to_string())),
        }
    }

    fn delete_entry(&self, key: &str) -> Result<(), ClientError> {
        match self.entry(key)?.delete_credential() {
            Ok(_) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(error) => Err(ClientError::Credential(error.to_string())),
        }
    }
}

impl Default for KeyringTokenStore {
    fn default() -> Self {
        Self::new("cyclesync.session")
    }
}

impl TokenStore for KeyringTokenStore {
    fn save_tokens(&self, tokens: &SessionTokens) -> Result<(), ClientError> {
        self.entry(ACCESS_TOKEN_KEY)?
            .set_password(&tokens.access)
            .map_err(|error| ClientError::Credential(error.to_string()))?;
        self.entry(REFRESH_TOKEN_KEY)?
            .set_password(&tokens.refresh)
            .map_err(|error| ClientError::Credential(error.to_string()))
    }

    fn load_tokens(&self) -> Result<Option<SessionTokens>, ClientError> {
        let access = self.read_entry(ACCESS_TOKEN_KEY)?;
        let refresh = self.read_entry(REFRESH_TOKEN_KEY)?;
        // A torn pair reads as no session.
        match (access, refresh) {
            (Some(access), Some(refresh)) => Ok(Some(SessionTokens { access, refresh })),
            _ => Ok(None),
        }
    }

    fn delete_tokens(&self) -> Result<(), ClientError> {
        self.delete_entry(ACCESS_TOKEN_KEY)?;
        self.delete_entry(REFRESH_TOKEN_KEY)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryTokenStore {
    tokens: Mutex<Option<SessionTokens>>,
}

impl TokenStore for InMemoryTokenStore {
    fn save_tokens(&self, tokens: &SessionTokens) -> Result<(), ClientError> {
        let mut guard = self
            .tokens
            .lock()
            .map_err(|error| ClientError::Credential(format!("in-memory lock poisoned: {error}")))?;
        *guard = Some(tokens.clone());
        Ok(())
    }

    fn load_tokens(&self) -> Result<Option<SessionTokens>, ClientError> {
        let guard = self
            .tokens
            .lock()
            .map_err(|error| ClientError::Credential(format!("in-memory lock poisoned: {error}")))?;
        Ok(guard.clone())
    }

    fn delete_tokens(&self) -> Result<(), ClientError> {
        let mut guard = self
            .tokens
            .lock()
            .map_err(|error| ClientError::Credential(format!("in-memory lock poisoned: {error}")))?;
        *guard = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn delete_is_idempotent() {
        let store = InMemoryTokenStore::default();
        store
            .save_tokens(&SessionTokens::new("a1", "r1"))
            .expect("save tokens");
        store.delete_tokens().expect("first delete");
        store.delete_tokens().expect("second delete");
        assert!(store.load_tokens().expect("load tokens").is_none());
    }

    fn token_pattern() -> impl Strategy<Value = String> {
        "[A-Za-z0-9._\\-]{1,64}".prop_map(|value| value.to_string())
    }

    proptest! {
        #[test]
        fn token_pair_roundtrip(access in token_pattern(), refresh in token_pattern()) {
            let store = InMemoryTokenStore::default();
            let tokens = SessionTokens::new(access, refresh);
            store.save_tokens(&tokens).expect("save tokens");
            let loaded = store.load_tokens().expect("load tokens").expect("tokens exist");
            prop_assert_eq!(loaded, tokens);
        }
    }
}
