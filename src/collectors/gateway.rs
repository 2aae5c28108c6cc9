//! Dedup-and-persist step for a scrape run.

use async_trait::async_trait;
use sqlx::{Acquire, PgPool, Postgres, Transaction};

use crate::error::AppError;
use crate::models::job::{Job, NewJob};

/// Opens one all-or-nothing batch per run.
#[async_trait]
pub trait JobGateway: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn JobBatch>, AppError>;
}

/// A pending batch. Dropping it without `commit` discards every insert.
#[async_trait]
pub trait JobBatch: Send {
    /// True if (title, company) is stored or was inserted earlier in this batch.
    async fn exists(&mut self, title: &str, company: &str) -> Result<bool, AppError>;

    /// Insert one record. A failure leaves the rest of the batch intact.
    async fn insert(&mut self, job: &NewJob) -> Result<i32, AppError>;

    async fn commit(self: Box<Self>) -> Result<(), AppError>;
}

pub struct PgGateway {
    pool: PgPool,
}

impl PgGateway {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobGateway for PgGateway {
    async fn begin(&self) -> Result<Box<dyn JobBatch>, AppError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgBatch { tx }))
    }
}

struct PgBatch {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl JobBatch for PgBatch {
    async fn exists(&mut self, title: &str, company: &str) -> Result<bool, AppError> {
        Job::exists(&mut *self.tx, title, company).await
    }

    async fn insert(&mut self, job: &NewJob) -> Result<i32, AppError> {
        // Savepoint per row so a failed insert does not abort the transaction.
        let mut savepoint = Acquire::begin(&mut self.tx).await?;
        let stored = Job::insert(&mut *savepoint, job).await?;
        savepoint.commit().await?;
        Ok(stored.id)
    }

    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        self.tx.commit().await?;
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PersistSummary {
    pub found: usize,
    pub saved: usize,
    pub duplicates: usize,
    pub failed: usize,
}

/// Store every record whose (title, company) is not already present.
/// Per-record failures are skipped; a commit failure discards the whole
/// batch and is returned.
pub async fn persist(gateway: &dyn JobGateway, jobs: &[NewJob]) -> Result<PersistSummary, AppError> {
    let mut summary = PersistSummary {
        found: jobs.len(),
        ..Default::default()
    };
    let mut batch = gateway.begin().await?;

    for job in jobs {
        match batch.exists(&job.title, &job.company).await {
            Ok(true) => {
                summary.duplicates += 1;
                tracing::debug!("Duplicate job found: {} at {}", job.title, job.company);
                continue;
            }
            Ok(false) => {}
            Err(e) => {
                summary.failed += 1;
                tracing::warn!("Error checking job {} at {}: {e}", job.title, job.company);
                continue;
            }
        }

        match batch.insert(job).await {
            Ok(id) => {
                summary.saved += 1;
                tracing::debug!("Saved job {id}: {} at {}", job.title, job.company);
            }
            Err(e) => {
                summary.failed += 1;
                tracing::warn!("Error saving job {} at {}: {e}", job.title, job.company);
            }
        }
    }

    if let Err(e) = batch.commit().await {
        tracing::error!("Error committing to database, batch rolled back: {e}");
        return Err(e);
    }

    tracing::info!(
        "Successfully saved {} new jobs, skipped {} duplicates, {} failed",
        summary.saved,
        summary.duplicates,
        summary.failed
    );
    Ok(summary)
}
