use std::time::{Duration, Instant};

use reqwest::Client;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use fleetport_domain::{RemotePlatformError, RemoteResult};

use crate::api::{LoginRequest, LoginResponse};
use crate::config::RemotePlatformConfig;

struct CachedToken {
    token: String,
    fetched_at: Instant,
}

/// Process-wide cache for the remote platform's bearer token.
///
/// One login serves all gateway calls. Tokens are refreshed proactively
/// before the configured TTL runs out; a 401 from any call invalidates the
/// cache so the next call authenticates again.
pub struct AuthTokenCache {
    http: Client,
    base_url: String,
    username: String,
    password: String,
    /// Refresh happens at 90% of the TTL so in-flight requests never carry a
    /// token at the edge of expiry.
    refresh_after: Duration,
    cached: RwLock<Option<CachedToken>>,
}

impl AuthTokenCache {
    pub fn new(http: Client, config: &RemotePlatformConfig) -> Self {
        let ttl = config.token_ttl();
        Self {
            http,
            base_url: config.base_url.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
            refresh_after: ttl - ttl / 10,
            cached: RwLock::new(None),
        }
    }

    /// Current token, logging in if the cache is empty or stale.
    pub async fn token(&self) -> RemoteResult<String> {
        {
            let cached = self.cached.read().await;
            if let Some(cached) = cached.as_ref() {
                if cached.fetched_at.elapsed() < self.refresh_after {
                    return Ok(cached.token.clone());
                }
            }
        }

        let mut cached = self.cached.write().await;
        // Another caller may have refreshed while we waited for the lock.
        if let Some(existing) = cached.as_ref() {
            if existing.fetched_at.elapsed() < self.refresh_after {
                return Ok(existing.token.clone());
            }
        }

        debug!("authenticating with remote platform");
        let token = self.login().await?;
        *cached = Some(CachedToken {
            token: token.clone(),
            fetched_at: Instant::now(),
        });
        Ok(token)
    }

    /// Drop the cached token, e.g. after the platform rejected it.
    pub async fn invalidate(&self) {
        warn!("invalidating cached remote platform token");
        let mut cached = self.cached.write().await;
        *cached = None;
    }

    async fn login(&self) -> RemoteResult<String> {
        let response = self
            .http
            .post(format!("{}/api/auth/login", self.base_url))
            .json(&LoginRequest {
                username: &self.username,
                password: &self.password,
            })
            .send()
            .await
            .map_err(|e| RemotePlatformError::Auth(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(RemotePlatformError::Auth(format!(
                "login returned status {status}: {detail}"
            )));
        }

        let body: LoginResponse = response
            .json()
            .await
            .map_err(|e| RemotePlatformError::Auth(e.to_string()))?;

        if body.token.is_empty() {
            return Err(RemotePlatformError::Auth(
                "no token received from login".to_string(),
            ));
        }

        Ok(body.token)
    }
}
