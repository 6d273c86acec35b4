//! Ingest-and-land pipeline.
//!
//! `TokenCache -> ApiFetcher -> ResponseValidator -> RawLander`, one page at a
//! time. The first fatal error halts the run; pages landed before it stay on disk.

use std::{sync::Arc, time::Duration};

use chrono::Utc;
use tracing::{info, warn};

use crate::{
    Res,
    bronze::{LandRequest, RawLander},
    config::Settings,
    schema::ResponseValidator,
    spotify::{ApiFetcher, HttpTransport, ReqwestTransport, RetryPolicy, Sleeper, TokenCache},
    types::{LandedPaths, SearchRequest},
    utils,
};

pub const DEFAULT_QUERY: &str = "videoclub";
pub const DEFAULT_SEARCH_TYPE: &str = "artist";
pub const DEFAULT_LIMIT: u32 = 50;
pub const DEFAULT_DATASET: &str = "spotify_search";

/// One ingestion run.
#[derive(Debug, Clone)]
pub struct IngestJob {
    pub query: String,
    pub search_type: String,
    pub limit: u32,
    pub offset: u32,
    /// Upper bound on pages; fewer are fetched when the provider runs out.
    pub pages: u32,
    pub dataset: String,
    pub run_id: Option<String>,
    pub overwrite: bool,
    pub retry: RetryPolicy,
}

impl Default for IngestJob {
    fn default() -> Self {
        Self {
            query: DEFAULT_QUERY.to_string(),
            search_type: DEFAULT_SEARCH_TYPE.to_string(),
            limit: DEFAULT_LIMIT,
            offset: 0,
            pages: 1,
            dataset: DEFAULT_DATASET.to_string(),
            run_id: None,
            overwrite: false,
            retry: RetryPolicy::new(3, Duration::from_secs(1)),
        }
    }
}

/// Result of landing a single page.
#[derive(Debug, Clone)]
pub struct LandedPage {
    pub page: u32,
    pub offset: u32,
    pub paths: LandedPaths,
}

pub struct IngestPipeline {
    fetcher: ApiFetcher,
    lander: RawLander,
}

impl IngestPipeline {
    pub fn new(fetcher: ApiFetcher, lander: RawLander) -> Self {
        Self { fetcher, lander }
    }

    /// Build the production pipeline: blocking reqwest transport and the
    /// storage backend implied by the base directory.
    pub fn from_settings(settings: &Settings) -> Res<Self> {
        let transport: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::new()?);
        Ok(Self::with_transport(settings, transport))
    }

    pub fn with_transport(settings: &Settings, transport: Arc<dyn HttpTransport>) -> Self {
        let tokens = TokenCache::new(
            settings.credentials.clone(),
            settings.token_url.clone(),
            Arc::clone(&transport),
        );
        let fetcher = ApiFetcher::new(tokens, settings.search_url.clone(), transport);
        Self::new(fetcher, RawLander::new(&settings.base_dir))
    }

    pub fn with_sleeper(self, sleeper: Arc<dyn Sleeper>) -> Self {
        Self {
            fetcher: self.fetcher.with_sleeper(sleeper),
            lander: self.lander,
        }
    }

    /// Fetch, validate and land up to `job.pages` pages under one run id.
    pub fn run(&self, job: &IngestJob) -> Res<Vec<LandedPage>> {
        let run_id = job
            .run_id
            .clone()
            .unwrap_or_else(|| utils::generate_run_id(Utc::now()));
        info!(
            query = %job.query,
            search_type = %job.search_type,
            run_id = %run_id,
            "starting ingest of up to {} page(s)",
            job.pages
        );

        let mut landed = Vec::new();
        for page in 0..job.pages {
            let Some(offset) = page_offset(job.offset, page, job.limit) else {
                warn!("offset for page {} exceeds {}; stopping", page, u32::MAX);
                break;
            };
            let request = SearchRequest::new(&job.query, &job.search_type, job.limit, offset);

            let result = self.fetcher.search(&request, &job.retry)?;
            ResponseValidator::validate(&result.document)?;

            let land_request = LandRequest::new(&job.dataset)
                .partition("q", &job.query)
                .partition("type", &job.search_type)
                .run_id(&run_id)
                .page(page)
                .overwrite(job.overwrite);
            let paths = self.lander.land(&result.raw, &land_request)?;
            landed.push(LandedPage {
                page,
                offset,
                paths,
            });

            if !result.has_next() {
                info!("no further pages after page {}", page);
                break;
            }
        }

        Ok(landed)
    }
}

/// `start + page * limit`, `None` past `u32::MAX`.
fn page_offset(start: u32, page: u32, limit: u32) -> Option<u32> {
    page.checked_mul(limit)?.checked_add(start)
}

#[cfg(test)]
mod tests {
    use crate::{
        spotify::transport::testing::ScriptedTransport,
        types::Credentials,
    };

    use super::*;

    const TOKEN_BODY: &str = r#"{"access_token":"tok","expires_in":3600}"#;
    const PAGE_BODY: &str = r#"{"artists":{"items":[{"followers":{},"genres":[],"name":"A","popularity":1,"type":"artist"}],"next":"https://api/next"}}"#;

    #[test]
    fn page_offsets_step_by_limit() {
        assert_eq!(page_offset(0, 0, 50), Some(0));
        assert_eq!(page_offset(10, 2, 50), Some(110));
        assert_eq!(page_offset(u32::MAX, 0, 50), Some(u32::MAX));
        assert_eq!(page_offset(u32::MAX, 1, 50), None);
        assert_eq!(page_offset(0, u32::MAX, 2), None);
    }

    #[test]
    fn paging_stops_when_offset_would_overflow() {
        let tmp = tempfile::tempdir().unwrap();
        let settings = Settings {
            credentials: Credentials::new("client", "secret").unwrap(),
            token_url: "https://accounts.example/api/token".to_string(),
            search_url: "https://api.example/v1/search".to_string(),
            base_dir: tmp.path().to_string_lossy().into_owned(),
        };
        let transport = Arc::new(
            ScriptedTransport::new()
                .respond(200, TOKEN_BODY)
                .respond(200, PAGE_BODY),
        );
        let pipeline = IngestPipeline::with_transport(&settings, transport.clone());
        let job = IngestJob {
            offset: u32::MAX,
            pages: 2,
            run_id: Some("r".to_string()),
            ..IngestJob::default()
        };

        let landed = pipeline.run(&job).unwrap();

        assert_eq!(landed.len(), 1);
        assert_eq!(landed[0].offset, u32::MAX);
        assert_eq!(transport.call_count(), 2);
    }
}
