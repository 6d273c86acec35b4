use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use crate::{
    IngestError, Res,
    spotify::{
        auth::TokenCache,
        retry::{Attempt, RetryPolicy, Sleeper, ThreadSleeper, is_retryable_status},
        transport::HttpTransport,
    },
    types::{SearchPage, SearchRequest},
};

/// Issues search requests with a bearer token from the owned [`TokenCache`].
///
/// Rate limits (429), server errors (5xx) and transport failures are retried with
/// linear backoff. Any other non-2xx status fails straight away.
pub struct ApiFetcher {
    tokens: TokenCache,
    search_url: String,
    transport: Arc<dyn HttpTransport>,
    sleeper: Arc<dyn Sleeper>,
}

impl ApiFetcher {
    pub fn new(tokens: TokenCache, search_url: impl Into<String>, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            tokens,
            search_url: search_url.into(),
            transport,
            sleeper: Arc::new(ThreadSleeper),
        }
    }

    /// Replaces the sleeper here and in the owned token cache.
    pub fn with_sleeper(self, sleeper: Arc<dyn Sleeper>) -> Self {
        Self {
            tokens: self.tokens.with_sleeper(Arc::clone(&sleeper)),
            sleeper,
            ..self
        }
    }

    pub fn tokens(&self) -> &TokenCache {
        &self.tokens
    }

    /// Fetch one page of search results.
    ///
    /// The token is obtained with the same policy before the request; an auth
    /// failure surfaces as [`IngestError::Auth`]. The returned page keeps the exact
    /// body text next to its decoded document.
    pub fn search(&self, request: &SearchRequest, policy: &RetryPolicy) -> Res<SearchPage> {
        let token = self.tokens.get_token(policy)?;
        let query = request.query_params();

        let result = policy.run(self.sleeper.as_ref(), "search", |attempt| {
            info!(
                "calling {} q={} type={} offset={} ({}/{})",
                self.search_url,
                request.query,
                request.search_type,
                request.offset,
                attempt,
                policy.max_attempts()
            );

            let response = match self.transport.get(&self.search_url, &token, &query) {
                Ok(response) => response,
                Err(e) => return Attempt::Retry(e.to_string()),
            };

            if is_retryable_status(response.status) {
                return Attempt::Retry(format!("search endpoint returned {}", response.status));
            }
            if !response.is_success() {
                return Attempt::Fail(format!(
                    "search endpoint returned {}: {}",
                    response.status, response.body
                ));
            }

            match serde_json::from_str::<Value>(&response.body) {
                Ok(document) => Attempt::Done(SearchPage {
                    raw: response.body,
                    document,
                }),
                Err(e) => Attempt::Fail(format!("search response is not JSON: {e}")),
            }
        });

        result.map_err(|e| IngestError::Fetch {
            attempts: e.attempts,
            cause: e.cause,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::{
        spotify::{
            retry::testing::RecordingSleeper,
            transport::testing::{Call, ScriptedTransport},
        },
        types::Credentials,
    };

    const SEARCH_URL: &str = "https://api.example/v1/search";
    const TOKEN_BODY: &str = r#"{"access_token":"tok","expires_in":3600}"#;
    const PAGE_BODY: &str = r#"{"artists":{"items":[{"name":"A"}],"next":null}}"#;

    fn fetcher(transport: Arc<ScriptedTransport>, sleeper: Arc<RecordingSleeper>) -> ApiFetcher {
        let tokens = TokenCache::new(
            Credentials::new("client", "secret").unwrap(),
            "https://accounts.example/api/token",
            transport.clone(),
        )
        .with_sleeper(sleeper.clone());
        ApiFetcher::new(tokens, SEARCH_URL, transport).with_sleeper(sleeper)
    }

    fn request() -> SearchRequest {
        SearchRequest::new("videoclub", "artist", 50, 100)
    }

    fn policy() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_secs(1))
    }

    #[test]
    fn sends_query_params_and_bearer() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .respond(200, TOKEN_BODY)
                .respond(200, PAGE_BODY),
        );
        let api = fetcher(transport.clone(), Arc::new(RecordingSleeper::default()));

        let page = api.search(&request(), &policy()).unwrap();

        assert_eq!(page.raw, PAGE_BODY);
        assert_eq!(page.document, json!({"artists":{"items":[{"name":"A"}],"next":null}}));
        assert_eq!(
            transport.calls()[1],
            Call::Get {
                url: SEARCH_URL.to_string(),
                bearer: "tok".to_string(),
                query: vec![
                    ("q".to_string(), "videoclub".to_string()),
                    ("type".to_string(), "artist".to_string()),
                    ("limit".to_string(), "50".to_string()),
                    ("offset".to_string(), "100".to_string()),
                ],
            }
        );
    }

    #[test]
    fn token_is_reused_across_searches() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .respond(200, TOKEN_BODY)
                .respond(200, PAGE_BODY)
                .respond(200, PAGE_BODY),
        );
        let api = fetcher(transport.clone(), Arc::new(RecordingSleeper::default()));

        api.search(&request(), &policy()).unwrap();
        api.search(&request(), &policy()).unwrap();

        let posts = transport
            .calls()
            .iter()
            .filter(|c| matches!(c, Call::Post { .. }))
            .count();
        assert_eq!(posts, 1);
        assert_eq!(transport.call_count(), 3);
    }

    #[test]
    fn retries_rate_limit_and_server_errors() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .respond(200, TOKEN_BODY)
                .respond(429, "")
                .respond(503, "")
                .respond(200, PAGE_BODY),
        );
        let sleeper = Arc::new(RecordingSleeper::default());
        let api = fetcher(transport.clone(), sleeper.clone());
        let policy = RetryPolicy::new(4, Duration::from_millis(500));

        let page = api.search(&request(), &policy).unwrap();

        assert_eq!(page.raw, PAGE_BODY);
        assert_eq!(sleeper.total(), Duration::from_millis(500 + 1000));
    }

    #[test]
    fn client_error_fails_immediately() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .respond(200, TOKEN_BODY)
                .respond(400, r#"{"error":"bad query"}"#),
        );
        let sleeper = Arc::new(RecordingSleeper::default());
        let api = fetcher(transport.clone(), sleeper.clone());

        match api.search(&request(), &policy()) {
            Err(IngestError::Fetch { attempts, cause }) => {
                assert_eq!(attempts, 1);
                assert!(cause.contains("400"));
            }
            other => panic!("expected fetch error, got {:?}", other),
        }
        assert_eq!(sleeper.count(), 0);
        assert_eq!(transport.call_count(), 2);
    }

    #[test]
    fn transport_failures_exhaust_into_fetch_error() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .respond(200, TOKEN_BODY)
                .fail("timed out")
                .fail("timed out")
                .fail("connection refused"),
        );
        let sleeper = Arc::new(RecordingSleeper::default());
        let api = fetcher(transport, sleeper.clone());

        match api.search(&request(), &policy()) {
            Err(IngestError::Fetch { attempts, cause }) => {
                assert_eq!(attempts, 3);
                assert!(cause.contains("connection refused"));
            }
            other => panic!("expected fetch error, got {:?}", other),
        }
        assert_eq!(sleeper.total(), Duration::from_secs(1 + 2));
    }

    #[test]
    fn auth_failure_surfaces_before_search() {
        let transport = Arc::new(ScriptedTransport::new().respond(403, "forbidden"));
        let api = fetcher(transport.clone(), Arc::new(RecordingSleeper::default()));

        assert!(matches!(
            api.search(&request(), &policy()),
            Err(IngestError::Auth { .. })
        ));
        assert_eq!(transport.call_count(), 1);
    }

    #[test]
    fn non_json_body_is_a_fetch_error() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .respond(200, TOKEN_BODY)
                .respond(200, "<html>oops</html>"),
        );
        let api = fetcher(transport, Arc::new(RecordingSleeper::default()));

        assert!(matches!(
            api.search(&request(), &policy()),
            Err(IngestError::Fetch { attempts: 1, .. })
        ));
    }
}
