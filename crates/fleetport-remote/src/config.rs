use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Remote platform configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemotePlatformConfig {
    /// Base URL of the remote platform dashboard API
    pub base_url: String,
    /// Service account used for all gateway calls
    pub username: String,
    pub password: String,
    /// Device profile applied to every created device
    pub device_profile_id: String,
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
    /// Lifetime of a cached auth token; refreshed proactively before expiry
    pub token_ttl_secs: u64,
}

impl Default for RemotePlatformConfig {
    fn default() -> Self {
        Self {
            base_url: "https://dashboard.senselive.io".to_string(),
            username: String::new(),
            password: String::new(),
            device_profile_id: "1b5e3410-50fa-11f0-9c46-b702b4c0da00".to_string(),
            request_timeout_secs: 15,
            token_ttl_secs: 900,
        }
    }
}

impl RemotePlatformConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl_secs)
    }
}
