//! # Spotify Integration Module
//!
//! This module is the integration layer between the ingestion pipeline and the
//! Spotify Web API. It covers exactly two endpoints and the failure handling
//! around them.
//!
//! ## Architecture
//!
//! ```text
//! Pipeline
//!    ↓
//! ApiFetcher ──owns──> TokenCache
//!    ↓                    ↓
//! RetryPolicy (linear backoff, 429/5xx/transport retryable)
//!    ↓
//! HttpTransport (reqwest blocking, 20 s timeout)
//!    ↓
//! Spotify Web API
//! ```
//!
//! ## Core Modules
//!
//! - [`auth`] - Client-credentials token cache with a 30 second expiry margin.
//!   Refresh is single-flight for threads sharing one cache.
//! - [`search`] - `GET /v1/search` with bearer auth. Returns the raw body text
//!   alongside the decoded document so the bronze layer stores what the provider
//!   actually sent.
//! - [`retry`] - The one retry loop both endpoints use. Sleeping goes through the
//!   [`retry::Sleeper`] trait.
//! - [`transport`] - The blocking HTTP seam.
//!
//! ## API Coverage
//!
//! - `POST /api/token` with `grant_type=client_credentials` and basic auth
//! - `GET /v1/search?q=&type=&limit=&offset=` with `Authorization: Bearer <token>`
//!
//! ## Error Types
//!
//! - [`crate::IngestError::Auth`] - token refresh gave up or was rejected
//! - [`crate::IngestError::Fetch`] - search gave up or hit a non-retryable status

pub mod auth;
pub mod retry;
pub mod search;
pub mod transport;

pub use auth::TokenCache;
pub use retry::{RetryPolicy, Sleeper, ThreadSleeper};
pub use search::ApiFetcher;
pub use transport::{HttpTransport, ReqwestTransport};
