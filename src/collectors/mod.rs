// Collectors load a listing page and turn it into normalized job records.

pub mod actuarylist;
pub mod dates;
pub mod fields;
pub mod gateway;
pub mod job_type;
pub mod locator;
pub mod runner;
pub mod session;
pub mod text;

use async_trait::async_trait;

use crate::error::AppError;
use crate::models::job::NewJob;
use session::PageSource;

/// Trait that all job collectors must implement.
/// Each collector loads its listing page through the given session and
/// returns at most `max_jobs` records with non-empty title and company.
#[async_trait]
pub trait JobCollector: Send + Sync {
    /// Name used to select the collector on the command line.
    fn name(&self) -> &str;

    async fn collect(
        &self,
        source: &dyn PageSource,
        max_jobs: usize,
    ) -> Result<Vec<NewJob>, AppError>;
}

/// Look up a collector by name, pointed at `url`.
pub fn get_collector(name: &str, url: &str) -> Option<Box<dyn JobCollector>> {
    match name {
        "actuarylist" => Some(Box::new(actuarylist::ActuaryList::new(url))),
        _ => None,
    }
}
