use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use reqwest::Client;
use tracing::{debug, info, warn};

use crate::models::credential::{Credential, TokenGrant, TokenResponse};

/// Source of the current time, injectable for tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Exchanges client credentials for a bearer token.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn fetch_token(&self) -> Result<TokenGrant, AuthError>;
}

/// OAuth client-credentials exchange against the provider's token endpoint.
pub struct HttpTokenProvider {
    http: Client,
    token_url: String,
    client_id: String,
    client_secret: String,
}

impl HttpTokenProvider {
    pub fn new(
        token_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        timeout: StdDuration,
    ) -> Result<Self, AuthError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AuthError::Request(e.to_string()))?;

        Ok(Self {
            http,
            token_url: token_url.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        })
    }
}

#[async_trait]
impl TokenProvider for HttpTokenProvider {
    async fn fetch_token(&self) -> Result<TokenGrant, AuthError> {
        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];

        let response = self
            .http
            .post(&self.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AuthError::Timeout
                } else {
                    AuthError::Request(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::Request(format!("token endpoint returned HTTP {}", status)));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Request(format!("unreadable token response: {}", e)))?;

        if let Some(error) = body.error {
            return Err(AuthError::Provider(body.error_description.unwrap_or(error)));
        }

        let access_token = body
            .access_token
            .filter(|token| !token.is_empty())
            .ok_or(AuthError::MissingToken)?;

        let expires_in = body.expires_in.unwrap_or_else(|| {
            warn!("Token response carried no expires_in; treating token as single-use");
            0
        });

        let lifetime = Duration::try_seconds(expires_in).ok_or_else(|| {
            AuthError::Provider(format!("expires_in {} is out of range", expires_in))
        })?;

        Ok(TokenGrant {
            access_token,
            lifetime,
        })
    }
}

type RefreshFuture = Shared<BoxFuture<'static, Result<Credential, AuthError>>>;

#[derive(Default)]
struct CacheState {
    credential: Option<Credential>,
    in_flight: Option<RefreshFuture>,
}

/// Lazily refreshed bearer-token cache with single-flight refresh.
///
/// Concurrent callers that find the credential missing or expired all await
/// the same in-flight refresh instead of each calling the token endpoint.
pub struct CredentialCache {
    provider: Arc<dyn TokenProvider>,
    clock: Arc<dyn Clock>,
    safety_margin: Duration,
    state: Arc<Mutex<CacheState>>,
}

impl CredentialCache {
    pub fn new(provider: Arc<dyn TokenProvider>, safety_margin: StdDuration) -> Self {
        Self::with_clock(provider, Arc::new(SystemClock), safety_margin)
    }

    pub fn with_clock(
        provider: Arc<dyn TokenProvider>,
        clock: Arc<dyn Clock>,
        safety_margin: StdDuration,
    ) -> Self {
        Self {
            provider,
            clock,
            safety_margin: Duration::from_std(safety_margin).unwrap_or_else(|_| Duration::zero()),
            state: Arc::new(Mutex::new(CacheState::default())),
        }
    }

    /// Return the cached credential, refreshing it first if it has expired.
    pub async fn get_credential(&self) -> Result<Credential, AuthError> {
        let refresh = {
            let mut state = lock(&self.state);

            if let Some(credential) = &state.credential {
                if credential.is_valid_at(self.clock.now()) {
                    return Ok(credential.clone());
                }
            }

            match &state.in_flight {
                Some(refresh) => {
                    debug!("Joining in-flight credential refresh");
                    refresh.clone()
                }
                None => {
                    let refresh = self.start_refresh();
                    state.in_flight = Some(refresh.clone());
                    refresh
                }
            }
        };

        refresh.await
    }

    /// Drop the cached credential so the next call refreshes it.
    pub fn invalidate(&self) {
        let mut state = lock(&self.state);
        if state.credential.take().is_some() {
            info!("Cached credential invalidated");
        }
    }

    /// Currently cached credential, without refreshing.
    pub fn cached(&self) -> Option<Credential> {
        lock(&self.state).credential.clone()
    }

    fn start_refresh(&self) -> RefreshFuture {
        let provider = Arc::clone(&self.provider);
        let clock = Arc::clone(&self.clock);
        let state = Arc::clone(&self.state);
        let safety_margin = self.safety_margin;

        async move {
            debug!("Refreshing provider credential");
            let result = provider
                .fetch_token()
                .await
                .map(|grant| Credential::issue(grant, clock.now(), safety_margin));

            let mut state = lock(&state);
            state.in_flight = None;
            match &result {
                Ok(credential) => {
                    info!(expires_at = %credential.expires_at, "Provider credential refreshed");
                    state.credential = Some(credential.clone());
                }
                Err(e) => {
                    warn!(error = %e, "Provider credential refresh failed");
                    state.credential = None;
                }
            }
            result
        }
        .boxed()
        .shared()
    }
}

fn lock(state: &Mutex<CacheState>) -> MutexGuard<'_, CacheState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Token request failed: {0}")]
    Request(String),

    #[error("Token request timed out")]
    Timeout,

    #[error("Provider rejected credentials: {0}")]
    Provider(String),

    #[error("Provider returned an empty access token")]
    MissingToken,
}
