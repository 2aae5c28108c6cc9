use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sqlx::{PgExecutor, PgPool};

use crate::error::AppError;

/// Separator used for the stored tag column.
pub const TAG_SEPARATOR: &str = ",";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobType {
    #[serde(rename = "Full-Time")]
    FullTime,
    #[serde(rename = "Part-Time")]
    PartTime,
    #[serde(rename = "Contract")]
    Contract,
    #[serde(rename = "Intern")]
    Intern,
}

impl JobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::FullTime => "Full-Time",
            JobType::PartTime => "Part-Time",
            JobType::Contract => "Contract",
            JobType::Intern => "Intern",
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct Job {
    pub id: i32,
    pub title: String,
    pub company: String,
    pub location: String,
    pub posting_date: DateTime<Utc>,
    pub job_type: Option<String>,
    #[serde(serialize_with = "serialize_tags")]
    pub tags: Option<String>,
    pub description: Option<String>,
    pub salary: Option<String>,
    pub url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn serialize_tags<S: Serializer>(tags: &Option<String>, serializer: S) -> Result<S::Ok, S::Error> {
    let list: Vec<&str> = tags
        .as_deref()
        .filter(|t| !t.is_empty())
        .map(|t| t.split(TAG_SEPARATOR).collect())
        .unwrap_or_default();
    list.serialize(serializer)
}

/// A normalized record ready for insertion.
#[derive(Debug, Clone, PartialEq)]
pub struct NewJob {
    pub title: String,
    pub company: String,
    pub location: Option<String>,
    pub posting_date: DateTime<Utc>,
    pub job_type: Option<JobType>,
    pub tags: Vec<String>,
    pub description: Option<String>,
    pub salary: Option<String>,
    pub url: Option<String>,
}

impl NewJob {
    /// Tags joined for the stored column, `None` when there are none.
    pub fn joined_tags(&self) -> Option<String> {
        join_tags(&self.tags)
    }

    /// Location as stored; the column is NOT NULL so a missing one is rejected.
    pub fn stored_location(&self) -> Result<&str, AppError> {
        self.location
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .ok_or_else(|| AppError::BadRequest("location is required".to_string()))
    }
}

fn join_tags(tags: &[String]) -> Option<String> {
    if tags.is_empty() {
        None
    } else {
        Some(tags.join(TAG_SEPARATOR))
    }
}

/// Tags arrive either as a list or as an already joined string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TagsInput {
    List(Vec<String>),
    Joined(String),
}

impl TagsInput {
    fn into_list(self) -> Vec<String> {
        match self {
            TagsInput::List(tags) => tags,
            TagsInput::Joined(joined) => joined
                .split(TAG_SEPARATOR)
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(String::from)
                .collect(),
        }
    }
}

/// Request body shared by create and update.
///
/// The outer `Option` records whether a key was sent at all; an explicit
/// `null` arrives as `Some(None)`.
#[derive(Debug, Default, Deserialize)]
pub struct JobInput {
    #[serde(default, deserialize_with = "sent")]
    pub title: Option<Option<String>>,
    #[serde(default, deserialize_with = "sent")]
    pub company: Option<Option<String>>,
    #[serde(default, deserialize_with = "sent")]
    pub location: Option<Option<String>>,
    /// `YYYY-MM-DD`
    pub posting_date: Option<String>,
    #[serde(default, deserialize_with = "sent")]
    pub job_type: Option<Option<JobType>>,
    #[serde(default, deserialize_with = "sent")]
    pub tags: Option<Option<TagsInput>>,
    #[serde(default, deserialize_with = "sent")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "sent")]
    pub salary: Option<Option<String>>,
    #[serde(default, deserialize_with = "sent")]
    pub url: Option<Option<String>>,
}

fn sent<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

const FIELD_LIMITS: [(&str, usize); 6] = [
    ("title", 40),
    ("company", 40),
    ("location", 200),
    ("salary", 100),
    ("url", 500),
    ("job_type", 100),
];

impl JobInput {
    fn field(&self, name: &str) -> Option<&str> {
        match name {
            "title" => self.title.as_ref()?.as_deref(),
            "company" => self.company.as_ref()?.as_deref(),
            "location" => self.location.as_ref()?.as_deref(),
            "salary" => self.salary.as_ref()?.as_deref(),
            "url" => self.url.as_ref()?.as_deref(),
            "job_type" => self.job_type.flatten().map(|t| t.as_str()),
            _ => None,
        }
    }

    /// Field-level validation. `required` fields must be present and non-blank.
    pub fn validate(&self, required: &[&str]) -> Result<(), AppError> {
        let mut errors = BTreeMap::new();

        for name in required {
            if self.field(name).is_none_or(|v| v.trim().is_empty()) {
                errors.insert(
                    name.to_string(),
                    format!("{name} is required and cannot be empty"),
                );
            }
        }

        for (name, limit) in FIELD_LIMITS {
            if let Some(value) = self.field(name)
                && value.trim().chars().count() > limit
            {
                errors.insert(
                    name.to_string(),
                    format!("{name} must be {limit} characters or less"),
                );
            }
        }

        if let Some(date) = self.posting_date.as_deref()
            && parse_posting_date(date).is_none()
        {
            errors.insert(
                "posting_date".to_string(),
                "Invalid date format. Use YYYY-MM-DD".to_string(),
            );
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(errors))
        }
    }

    /// Validate as a create request and build the record to insert.
    pub fn into_new_job(self, now: DateTime<Utc>) -> Result<NewJob, AppError> {
        self.validate(&["title", "company", "location"])?;

        let posting_date = self
            .posting_date
            .as_deref()
            .and_then(parse_posting_date)
            .unwrap_or(now);

        Ok(NewJob {
            title: trimmed(self.title.flatten()).unwrap_or_default(),
            company: trimmed(self.company.flatten()).unwrap_or_default(),
            location: trimmed(self.location.flatten()),
            posting_date,
            job_type: self.job_type.flatten(),
            tags: self
                .tags
                .flatten()
                .map(TagsInput::into_list)
                .unwrap_or_default(),
            description: trimmed(self.description.flatten()),
            salary: trimmed(self.salary.flatten()),
            url: trimmed(self.url.flatten()),
        })
    }

    /// Apply the keys present in an update body to `job`. A sent `null` or
    /// blank value clears an optional column; absent keys leave it alone.
    fn apply_to(self, mut job: Job) -> Job {
        if let Some(title) = trimmed(self.title.flatten()) {
            job.title = title;
        }
        if let Some(company) = trimmed(self.company.flatten()) {
            job.company = company;
        }
        if let Some(location) = trimmed(self.location.flatten()) {
            job.location = location;
        }
        if let Some(date) = self.posting_date.as_deref().and_then(parse_posting_date) {
            job.posting_date = date;
        }
        if let Some(job_type) = self.job_type {
            job.job_type = job_type.map(|t| t.as_str().to_string());
        }
        if let Some(tags) = self.tags {
            job.tags = tags.and_then(|t| join_tags(&t.into_list()));
        }
        if let Some(description) = self.description {
            job.description = trimmed(description);
        }
        if let Some(salary) = self.salary {
            job.salary = trimmed(salary);
        }
        if let Some(url) = self.url {
            job.url = trimmed(url);
        }
        job
    }

    /// Required fields whose keys appear in an update body, `null` included.
    fn present_required(&self) -> Vec<&'static str> {
        let mut required = Vec::new();
        if self.title.is_some() {
            required.push("title");
        }
        if self.company.is_some() {
            required.push("company");
        }
        if self.location.is_some() {
            required.push("location");
        }
        required
    }
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_posting_date(date: &str) -> Option<DateTime<Utc>> {
    NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

#[derive(Debug, Default, Deserialize)]
pub struct JobFilters {
    pub job_type: Option<String>,
    pub location: Option<String>,
    pub tag: Option<String>,
    pub sort: Option<String>,
}

impl JobFilters {
    fn order(&self) -> &'static str {
        match self.sort.as_deref() {
            Some("posting_date_asc") => "ASC",
            _ => "DESC",
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl Job {
    pub async fn list(pool: &PgPool, filters: &JobFilters) -> Result<Vec<Job>, AppError> {
        let sql = format!(
            "SELECT * FROM jobs WHERE ($1::text IS NULL OR job_type = $1) AND ($2::text IS NULL OR location ILIKE '%' || $2 || '%') AND ($3::text IS NULL OR tags ILIKE '%' || $3 || '%') ORDER BY posting_date {}, id",
            filters.order()
        );
        let jobs = sqlx::query_as::<_, Job>(&sql)
            .bind(non_empty(&filters.job_type))
            .bind(non_empty(&filters.location))
            .bind(non_empty(&filters.tag))
            .fetch_all(pool)
            .await?;
        Ok(jobs)
    }

    pub async fn get(pool: &PgPool, id: i32) -> Result<Job, AppError> {
        sqlx::query_as::<_, Job>("SELECT * FROM jobs WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Job {id} not found")))
    }

    /// True if a row with this exact (title, company) pair is stored.
    pub async fn exists<'e, E: PgExecutor<'e>>(
        executor: E,
        title: &str,
        company: &str,
    ) -> Result<bool, AppError> {
        let row: (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM jobs WHERE title = $1 AND company = $2)",
        )
        .bind(title)
        .bind(company)
        .fetch_one(executor)
        .await?;
        Ok(row.0)
    }

    pub async fn insert<'e, E: PgExecutor<'e>>(executor: E, input: &NewJob) -> Result<Job, AppError> {
        let location = input.stored_location()?;

        let job = sqlx::query_as::<_, Job>(
            "INSERT INTO jobs (title, company, location, posting_date, job_type, tags, description, salary, url) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING *",
        )
        .bind(&input.title)
        .bind(&input.company)
        .bind(location)
        .bind(input.posting_date)
        .bind(input.job_type.map(|t| t.as_str()))
        .bind(input.joined_tags())
        .bind(&input.description)
        .bind(&input.salary)
        .bind(&input.url)
        .fetch_one(executor)
        .await?;
        Ok(job)
    }

    pub async fn update(pool: &PgPool, id: i32, input: JobInput) -> Result<Job, AppError> {
        input.validate(&input.present_required())?;

        let patched = input.apply_to(Self::get(pool, id).await?);

        let job = sqlx::query_as::<_, Job>(
            "UPDATE jobs SET title = $2, company = $3, location = $4, posting_date = $5, job_type = $6, tags = $7, description = $8, salary = $9, url = $10, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(&patched.title)
        .bind(&patched.company)
        .bind(&patched.location)
        .bind(patched.posting_date)
        .bind(&patched.job_type)
        .bind(&patched.tags)
        .bind(&patched.description)
        .bind(&patched.salary)
        .bind(&patched.url)
        .fetch_one(pool)
        .await?;
        Ok(job)
    }

    pub async fn delete(pool: &PgPool, id: i32) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM jobs WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Job {id} not found")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn errors_of(result: Result<(), AppError>) -> BTreeMap<String, String> {
        match result {
            Err(AppError::Validation(errors)) => errors,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn job_type_serializes_with_hyphen() {
        let json = serde_json::to_string(&JobType::FullTime).unwrap();
        assert_eq!(json, "\"Full-Time\"");
        let parsed: JobType = serde_json::from_str("\"Part-Time\"").unwrap();
        assert_eq!(parsed, JobType::PartTime);
        assert!(serde_json::from_str::<JobType>("\"Temporary\"").is_err());
    }

    #[test]
    fn create_requires_title_company_location() {
        let errors = errors_of(JobInput::default().validate(&["title", "company", "location"]));
        assert_eq!(errors.len(), 3);
        assert!(errors["title"].contains("required"));
    }

    fn input(body: serde_json::Value) -> JobInput {
        serde_json::from_value(body).unwrap()
    }

    fn stored_job() -> Job {
        Job {
            id: 1,
            title: "Pricing Actuary".into(),
            company: "Acme Re".into(),
            location: "NY".into(),
            posting_date: Utc::now(),
            job_type: Some("Full-Time".into()),
            tags: Some("Life,Pricing".into()),
            description: Some("Build pricing models.".into()),
            salary: Some("150k".into()),
            url: Some("https://www.actuarylist.com/jobs/1".into()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn blank_required_field_is_rejected() {
        let input = input(serde_json::json!({
            "title": "   ",
            "company": "Acme Re",
            "location": "NY"
        }));
        let errors = errors_of(input.validate(&["title", "company", "location"]));
        assert_eq!(errors.keys().collect::<Vec<_>>(), vec!["title"]);
    }

    #[test]
    fn length_limits_and_date_format() {
        let input = input(serde_json::json!({
            "title": "x".repeat(41),
            "company": "Acme Re",
            "location": "NY",
            "posting_date": "03/04/2024"
        }));
        let errors = errors_of(input.validate(&[]));
        assert!(errors["title"].contains("40"));
        assert!(errors["posting_date"].contains("YYYY-MM-DD"));
        assert!(!errors.contains_key("company"));
    }

    #[test]
    fn into_new_job_trims_and_splits_tags() {
        let now = Utc::now();
        let input = input(serde_json::json!({
            "title": "  Pricing Actuary ",
            "company": "Acme Re",
            "location": "NY",
            "posting_date": "2024-03-01",
            "job_type": "Contract",
            "tags": "Life, Pricing",
            "description": ""
        }));

        let job = input.into_new_job(now).unwrap();
        assert_eq!(job.title, "Pricing Actuary");
        assert_eq!(job.tags, vec!["Life", "Pricing"]);
        assert_eq!(job.job_type, Some(JobType::Contract));
        assert_eq!(job.description, None);
        assert_eq!(job.posting_date.date_naive().to_string(), "2024-03-01");
        assert_eq!(job.joined_tags().as_deref(), Some("Life,Pricing"));
    }

    #[test]
    fn posting_date_defaults_to_now() {
        let now = Utc::now();
        let input = input(serde_json::json!({
            "title": "Pricing Actuary",
            "company": "Acme Re",
            "location": "NY"
        }));
        assert_eq!(input.into_new_job(now).unwrap().posting_date, now);
    }

    #[test]
    fn update_only_requires_present_fields() {
        let input = input(serde_json::json!({ "salary": "100k" }));
        assert!(input.present_required().is_empty());
        assert!(input.validate(&input.present_required()).is_ok());
    }

    #[test]
    fn update_rejects_null_title() {
        let input = input(serde_json::json!({ "title": null, "salary": "100k" }));
        assert_eq!(input.present_required(), vec!["title"]);
        let errors = errors_of(input.validate(&input.present_required()));
        assert_eq!(errors.keys().collect::<Vec<_>>(), vec!["title"]);
    }

    #[test]
    fn update_clears_optional_fields_sent_empty_or_null() {
        let patched = input(serde_json::json!({
            "salary": "",
            "description": null,
            "job_type": null,
            "tags": null
        }))
        .apply_to(stored_job());

        assert_eq!(patched.salary, None);
        assert_eq!(patched.description, None);
        assert_eq!(patched.job_type, None);
        assert_eq!(patched.tags, None);
        assert_eq!(patched.url.as_deref(), Some("https://www.actuarylist.com/jobs/1"));
        assert_eq!(patched.title, "Pricing Actuary");
    }

    #[test]
    fn update_keeps_absent_fields_and_trims_sent_ones() {
        let before = stored_job();
        let posted = before.posting_date;
        let patched = input(serde_json::json!({
            "title": "  Reserving Actuary ",
            "job_type": "Contract",
            "tags": ["Health"],
            "posting_date": "2024-03-01"
        }))
        .apply_to(before);

        assert_eq!(patched.title, "Reserving Actuary");
        assert_eq!(patched.company, "Acme Re");
        assert_eq!(patched.job_type.as_deref(), Some("Contract"));
        assert_eq!(patched.tags.as_deref(), Some("Health"));
        assert_eq!(patched.salary.as_deref(), Some("150k"));
        assert_ne!(patched.posting_date, posted);
        assert_eq!(patched.posting_date.date_naive().to_string(), "2024-03-01");
    }

    #[test]
    fn tags_serialize_as_list() {
        let value = serde_json::to_value(stored_job()).unwrap();
        assert_eq!(value["tags"], serde_json::json!(["Life", "Pricing"]));
    }

    #[test]
    fn sort_defaults_to_descending() {
        assert_eq!(JobFilters::default().order(), "DESC");
        let asc = JobFilters {
            sort: Some("posting_date_asc".into()),
            ..Default::default()
        };
        assert_eq!(asc.order(), "ASC");
    }
}
