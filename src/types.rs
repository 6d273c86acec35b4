use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tabled::Tabled;

use crate::{IngestError, Res};

/// Seconds before expiry at which a cached token stops being handed out.
pub const TOKEN_EXPIRY_MARGIN_SECS: i64 = 30;

/// Lifetime assumed when the identity endpoint omits `expires_in`.
pub const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

/// Client-credentials pair. Both values must be non-empty.
#[derive(Clone)]
pub struct Credentials {
    client_id: String,
    client_secret: String,
}

impl Credentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Res<Self> {
        let client_id = client_id.into();
        let client_secret = client_secret.into();
        if client_id.trim().is_empty() || client_secret.trim().is_empty() {
            return Err(IngestError::Config(
                "missing SPOTIFY_CLIENT_ID / SPOTIFY_CLIENT_SECRET".to_string(),
            ));
        }
        Ok(Self {
            client_id,
            client_secret,
        })
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Bearer token held by the token cache.
#[derive(Debug, Clone)]
pub struct Token {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

impl Token {
    /// `None` when `now + expires_in` is not a representable instant.
    pub fn new(access_token: String, expires_in: i64, now: DateTime<Utc>) -> Option<Self> {
        let expires_at = Duration::try_seconds(expires_in).and_then(|d| now.checked_add_signed(d))?;
        Some(Token {
            access_token,
            expires_at,
        })
    }

    /// True while `now` is more than the safety margin before expiry.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at
            .checked_sub_signed(Duration::seconds(TOKEN_EXPIRY_MARGIN_SECS))
            .is_some_and(|deadline| now < deadline)
    }
}

/// Body of a successful client-credentials grant.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: Option<i64>,
}

/// One search call: `GET /v1/search?q=..&type=..&limit=..&offset=..`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub query: String,
    pub search_type: String,
    pub limit: u32,
    pub offset: u32,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>, search_type: impl Into<String>, limit: u32, offset: u32) -> Self {
        Self {
            query: query.into(),
            search_type: search_type.into(),
            limit,
            offset,
        }
    }

    pub fn query_params(&self) -> Vec<(String, String)> {
        vec![
            ("q".to_string(), self.query.clone()),
            ("type".to_string(), self.search_type.clone()),
            ("limit".to_string(), self.limit.to_string()),
            ("offset".to_string(), self.offset.to_string()),
        ]
    }
}

/// A search response as received: the exact body text plus its decoded form.
#[derive(Debug, Clone)]
pub struct SearchPage {
    pub raw: String,
    pub document: Value,
}

impl SearchPage {
    /// Whether the provider advertises another page after this one.
    pub fn has_next(&self) -> bool {
        self.document
            .get("artists")
            .and_then(|a| a.get("next"))
            .is_some_and(|next| !next.is_null())
    }
}

/// Manifest sidecar describing one landed page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LandedArtifact {
    pub dataset: String,
    pub path: String,
    pub partitions: Map<String, Value>,
    pub run_id: String,
    pub page: u32,
    pub record_count: u64,
    pub checksum_md5: String,
    pub fetched_at: String,
}

/// Externally displayed locations of the three artifacts of one landing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LandedPaths {
    pub data: String,
    pub manifest: String,
    pub checksum: String,
    /// False when an existing data file was kept because overwrite was off.
    pub data_written: bool,
    /// For a kept data file: whether its content equals the incoming payload.
    pub existing_matches: Option<bool>,
}

#[derive(Tabled)]
pub struct LandedTableRow {
    pub page: u32,
    pub artifact: String,
    pub path: String,
}

impl LandedTableRow {
    pub fn rows(page: u32, paths: &LandedPaths) -> Vec<LandedTableRow> {
        vec![
            LandedTableRow {
                page,
                artifact: "data".to_string(),
                path: paths.data.clone(),
            },
            LandedTableRow {
                page,
                artifact: "manifest".to_string(),
                path: paths.manifest.clone(),
            },
            LandedTableRow {
                page,
                artifact: "checksum".to_string(),
                path: paths.checksum.clone(),
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_credentials_are_a_config_error() {
        assert!(matches!(
            Credentials::new("", "secret"),
            Err(IngestError::Config(_))
        ));
        assert!(matches!(
            Credentials::new("id", "  "),
            Err(IngestError::Config(_))
        ));
        assert!(Credentials::new("id", "secret").is_ok());
    }

    #[test]
    fn credentials_debug_hides_secret() {
        let creds = Credentials::new("id", "hunter2").unwrap();
        let shown = format!("{:?}", creds);
        assert!(shown.contains("id"));
        assert!(!shown.contains("hunter2"));
    }

    #[test]
    fn token_freshness_honours_margin() {
        let now = Utc::now();
        let token = Token::new("t".to_string(), 60, now).unwrap();
        assert!(token.is_fresh(now));
        assert!(token.is_fresh(now + Duration::seconds(29)));
        assert!(!token.is_fresh(now + Duration::seconds(30)));
        assert!(!token.is_fresh(now + Duration::seconds(61)));
    }

    #[test]
    fn out_of_range_lifetime_is_rejected() {
        let now = Utc::now();
        assert!(Token::new("t".to_string(), i64::MAX, now).is_none());
        assert!(Token::new("t".to_string(), i64::MIN, now).is_none());
        assert!(Token::new("t".to_string(), 0, now).is_some_and(|t| !t.is_fresh(now)));
    }

    #[test]
    fn has_next_follows_artists_next() {
        let page = |doc: Value| SearchPage {
            raw: doc.to_string(),
            document: doc,
        };
        assert!(page(serde_json::json!({"artists": {"next": "https://x"}})).has_next());
        assert!(!page(serde_json::json!({"artists": {"next": null}})).has_next());
        assert!(!page(serde_json::json!({"artists": {}})).has_next());
    }
}
