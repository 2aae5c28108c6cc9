//! Employment-type inference from listing text.

use crate::models::job::JobType;

/// Ranked keyword rules; the first rule with any keyword present wins.
/// "contract" sits under Part-Time and ahead of the Contract rule, so a
/// listing mentioning both "contract" and "consultant" is Part-Time.
pub const RULES: [(JobType, &[&str]); 3] = [
    (JobType::Intern, &["intern", "internship"]),
    (JobType::PartTime, &["part-time", "part time", "contract"]),
    (JobType::Contract, &["freelance", "consultant"]),
];

pub const DEFAULT: JobType = JobType::FullTime;

/// Classify a listing from its title, description and space-joined tags.
pub fn classify(title: &str, description: &str, tags: &str) -> JobType {
    let text = format!("{title} {description} {tags}").to_lowercase();
    RULES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| text.contains(*k)))
        .map(|(job_type, _)| *job_type)
        .unwrap_or(DEFAULT)
}
