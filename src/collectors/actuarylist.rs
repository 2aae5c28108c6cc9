use async_trait::async_trait;
use chrono::{DateTime, Utc};
use scraper::Html;
use url::Url;

use super::fields::FieldExtractor;
use super::locator::ListingLocator;
use super::session::PageSource;
use super::JobCollector;
use crate::error::AppError;
use crate::models::job::NewJob;

pub const DEFAULT_URL: &str = "https://www.actuarylist.com";

pub struct ActuaryList {
    url: String,
}

impl ActuaryList {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl JobCollector for ActuaryList {
    fn name(&self) -> &str {
        "actuarylist"
    }

    async fn collect(
        &self,
        source: &dyn PageSource,
        max_jobs: usize,
    ) -> Result<Vec<NewJob>, AppError> {
        tracing::info!("Navigating to {}", self.url);
        let html = source.load(&self.url).await?;
        Ok(scrape_listings(&html, &self.url, max_jobs, Utc::now()))
    }
}

/// Accepted-record count for one run, checked before each candidate.
struct RunState {
    accepted: usize,
    max_jobs: usize,
}

impl RunState {
    fn new(max_jobs: usize) -> Self {
        Self {
            accepted: 0,
            max_jobs,
        }
    }

    fn is_full(&self) -> bool {
        self.accepted >= self.max_jobs
    }
}

/// Locate listing candidates in `html` and extract records from them, in
/// document order, stopping once `max_jobs` records have been accepted.
pub fn scrape_listings(
    html: &str,
    page_url: &str,
    max_jobs: usize,
    now: DateTime<Utc>,
) -> Vec<NewJob> {
    let document = Html::parse_document(html);
    let base = Url::parse(page_url).ok();
    let locator = ListingLocator::default();
    let extractor = FieldExtractor::default();

    let located = locator.locate(&document);
    let total = located.candidates.len();
    tracing::info!(
        tier = located.tier.unwrap_or("none"),
        "Total potential job elements found: {total}"
    );

    let mut state = RunState::new(max_jobs);
    let mut jobs = Vec::new();

    for (i, candidate) in located.candidates.into_iter().enumerate() {
        if state.is_full() {
            tracing::info!("Reached max jobs ({max_jobs}), stopping");
            break;
        }

        let fields = extractor.extract(candidate, base.as_ref());
        let misses = fields.misses.clone();
        match fields.into_job(now) {
            Some(job) => {
                state.accepted += 1;
                tracing::debug!(
                    "Scraped job {}: {} at {}",
                    state.accepted,
                    job.title,
                    job.company
                );
                jobs.push(job);
            }
            None => {
                tracing::debug!(
                    ?misses,
                    "Could not extract job data from element {}/{total}",
                    i + 1
                );
            }
        }
    }

    tracing::info!("Total jobs successfully scraped: {}", jobs.len());
    jobs
}
