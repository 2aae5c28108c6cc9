use std::time::Duration;

use sqlx::PgPool;
use tracing::Instrument;
use uuid::Uuid;

use crate::collectors::gateway::{JobGateway, PersistSummary, PgGateway, persist};
use crate::collectors::session::{PageSource, open_session};
use crate::collectors::{JobCollector, get_collector};
use crate::config::ScrapeArgs;
use crate::error::AppError;

#[derive(Debug)]
pub struct RunReport {
    pub run_id: Uuid,
    pub scraped: usize,
    /// `None` when nothing was written (dry run or zero records).
    pub summary: Option<PersistSummary>,
}

/// Run one scrape from the command line. The page session lives for the
/// duration of this call and is closed on every exit path.
pub async fn run(pool: Option<PgPool>, args: &ScrapeArgs) -> anyhow::Result<RunReport> {
    let collector = get_collector(&args.collector, &args.url)
        .ok_or_else(|| anyhow::anyhow!("Unknown collector: {}", args.collector))?;
    let run_id = Uuid::new_v4();
    let span = tracing::info_span!("scrape", %run_id, collector = collector.name());

    async {
        let session = open_session(args.browser, Duration::from_secs(args.timeout_secs))
            .inspect_err(|e| tracing::error!("Failed to open page session: {e}"))?;
        let gateway = pool.map(PgGateway::new);
        let report = run_once(
            run_id,
            &*collector,
            &*session,
            gateway.as_ref().map(|g| g as &dyn JobGateway),
            args.max_jobs,
        )
        .await?;
        Ok::<_, anyhow::Error>(report)
    }
    .instrument(span)
    .await
}

/// Scrape once through `source` and hand the records to `gateway`.
/// Scrape failures yield zero records; only gateway failures are returned.
pub async fn run_once(
    run_id: Uuid,
    collector: &dyn JobCollector,
    source: &dyn PageSource,
    gateway: Option<&dyn JobGateway>,
    max_jobs: usize,
) -> Result<RunReport, AppError> {
    let jobs = match collector.collect(source, max_jobs).await {
        Ok(jobs) => jobs,
        Err(e) => {
            tracing::warn!("Error during scraping: {e}");
            Vec::new()
        }
    };

    let mut report = RunReport {
        run_id,
        scraped: jobs.len(),
        summary: None,
    };

    if jobs.is_empty() {
        tracing::warn!(
            "No jobs were scraped; the site may be unreachable or its markup may have changed"
        );
        return Ok(report);
    }

    let Some(gateway) = gateway else {
        for job in &jobs {
            tracing::info!(
                title = %job.title,
                company = %job.company,
                location = job.location.as_deref().unwrap_or(""),
                job_type = %job.job_type.map(|t| t.as_str()).unwrap_or(""),
                posting_date = %job.posting_date,
                "Dry run"
            );
        }
        return Ok(report);
    };

    report.summary = Some(persist(gateway, &jobs).await?);
    Ok(report)
}
