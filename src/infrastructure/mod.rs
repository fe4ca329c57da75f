pub mod api_client;
pub mod auth_client;
pub mod config;
pub mod error;
pub mod response_cache;
pub mod token_store;
