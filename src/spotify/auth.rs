use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use tracing::{debug, info};

use crate::{
    IngestError, Res,
    spotify::{
        retry::{Attempt, RetryPolicy, Sleeper, ThreadSleeper, is_retryable_status},
        transport::HttpTransport,
    },
    types::{Credentials, DEFAULT_TOKEN_LIFETIME_SECS, Token, TokenResponse},
};

/// Client-credentials token cache.
///
/// Holds at most one bearer token. [`TokenCache::get_token`] hands out the cached
/// token while it is more than 30 seconds away from expiry and otherwise performs
/// a `grant_type=client_credentials` request against the identity endpoint.
///
/// The token slot is guarded by a mutex that stays locked for the whole refresh,
/// so threads sharing one cache never refresh concurrently: late arrivals wait and
/// then pick up the freshly stored token.
pub struct TokenCache {
    credentials: Credentials,
    token_url: String,
    transport: Arc<dyn HttpTransport>,
    sleeper: Arc<dyn Sleeper>,
    token: Mutex<Option<Token>>,
}

impl TokenCache {
    pub fn new(credentials: Credentials, token_url: impl Into<String>, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            credentials,
            token_url: token_url.into(),
            transport,
            sleeper: Arc::new(ThreadSleeper),
            token: Mutex::new(None),
        }
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Returns a valid bearer token, refreshing it when needed.
    ///
    /// # Errors
    ///
    /// [`IngestError::Auth`] once the policy runs out of attempts, or immediately
    /// on a non-retryable status or an unusable response body.
    pub fn get_token(&self, policy: &RetryPolicy) -> Res<String> {
        let mut slot = self.lock();

        if let Some(token) = slot.as_ref() {
            if token.is_fresh(Utc::now()) {
                debug!("using cached token, expires at {}", token.expires_at);
                return Ok(token.access_token.clone());
            }
        }

        let token = self.refresh(policy)?;
        let access_token = token.access_token.clone();
        *slot = Some(token);
        Ok(access_token)
    }

    /// Drops the cached token so the next call refreshes.
    pub fn invalidate(&self) {
        *self.lock() = None;
    }

    pub fn cached(&self) -> Option<Token> {
        self.lock().clone()
    }

    fn refresh(&self, policy: &RetryPolicy) -> Res<Token> {
        let form = [("grant_type", "client_credentials")];
        let auth = (
            self.credentials.client_id(),
            self.credentials.client_secret(),
        );

        let result = policy.run(self.sleeper.as_ref(), "token refresh", |attempt| {
            info!(
                "requesting token from {} ({}/{})",
                self.token_url,
                attempt,
                policy.max_attempts()
            );

            let response = match self.transport.post_form(&self.token_url, auth, &form) {
                Ok(response) => response,
                Err(e) => return Attempt::Retry(e.to_string()),
            };

            if is_retryable_status(response.status) {
                return Attempt::Retry(format!("token endpoint returned {}", response.status));
            }
            if !response.is_success() {
                return Attempt::Fail(format!(
                    "token endpoint returned {}: {}",
                    response.status, response.body
                ));
            }

            let payload = match serde_json::from_str::<TokenResponse>(&response.body) {
                Ok(payload) => payload,
                Err(e) => return Attempt::Fail(format!("malformed token response: {e}")),
            };

            let expires_in = payload.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);
            match Token::new(payload.access_token, expires_in, Utc::now()) {
                Some(token) => Attempt::Done(token),
                None => Attempt::Fail(format!("invalid expires_in: {expires_in}")),
            }
        });

        let token = result.map_err(|e| IngestError::Auth {
            attempts: e.attempts,
            cause: e.cause,
        })?;

        info!("obtained token, expires at {}", token.expires_at);
        Ok(token)
    }

    fn lock(&self) -> MutexGuard<'_, Option<Token>> {
        // A panic while holding the lock leaves at worst a stale token.
        self.token.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
