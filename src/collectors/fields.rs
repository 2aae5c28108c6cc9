//! Per-candidate field extraction.
//!
//! Every field is best effort: a missing match leaves the field empty and
//! records a miss, nothing here returns an error.

use chrono::{DateTime, Utc};
use scraper::{ElementRef, Selector};
use url::Url;

use super::dates;
use super::job_type;
use super::text::{SelectorChain, collapse_whitespace, visible_text};
use crate::models::job::NewJob;

const TITLE_SELECTORS: [&str; 9] = [
    "h1",
    "h2",
    "h3",
    "h4",
    ".job-title",
    ".title",
    "[class*=\"title\"]",
    ".job-name",
    ".position-title",
];

const COMPANY_SELECTORS: [&str; 5] = [
    ".company",
    ".employer",
    "[class*=\"company\"]",
    ".organization",
    ".firm",
];

const LOCATION_SELECTORS: [&str; 5] = [
    ".location",
    ".city",
    "[class*=\"location\"]",
    ".address",
    ".place",
];

const DATE_SELECTORS: [&str; 5] = [".date", ".posted", "[class*=\"date\"]", ".time", ".timestamp"];

const TAG_SELECTORS: [&str; 6] = [
    ".tag",
    ".keyword",
    ".category",
    "[class*=\"tag\"]",
    ".skill",
    ".technology",
];

const DESCRIPTION_SELECTORS: [&str; 5] = [
    ".description",
    ".summary",
    "[class*=\"desc\"]",
    ".details",
    ".content",
];

/// Text-bearing nodes scanned when no title selector matches.
const TITLE_SCAN_SELECTOR: &str = "p, span, div";

const ROLE_KEYWORDS: [&str; 6] = [
    "actuary",
    "analyst",
    "manager",
    "director",
    "consultant",
    "specialist",
];

/// Raw fields pulled from one candidate node.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ExtractedFields {
    pub title: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    /// Text of the first date-like node, if any node matched.
    pub date_text: Option<String>,
    pub tags: Vec<String>,
    pub description: String,
    pub url: Option<String>,
    /// Fields that no strategy could fill.
    pub misses: Vec<&'static str>,
}

impl ExtractedFields {
    /// Normalize into an insertable record. `None` unless both title and
    /// company are present.
    pub fn into_job(self, now: DateTime<Utc>) -> Option<NewJob> {
        let title = self.title.filter(|t| !t.trim().is_empty())?;
        let company = self.company.filter(|c| !c.trim().is_empty())?;

        let posting_date = dates::normalize_at(self.date_text.as_deref(), now);
        let job_type = job_type::classify(&title, &self.description, &self.tags.join(" "));

        Some(NewJob {
            title,
            company,
            location: self.location,
            posting_date,
            job_type: Some(job_type),
            tags: self.tags,
            description: Some(self.description).filter(|d| !d.is_empty()),
            salary: None,
            url: self.url,
        })
    }
}

pub struct FieldExtractor {
    title: SelectorChain,
    company: SelectorChain,
    location: SelectorChain,
    date: SelectorChain,
    tags: SelectorChain,
    description: SelectorChain,
    title_scan: SelectorChain,
    link: Option<Selector>,
}

impl Default for FieldExtractor {
    fn default() -> Self {
        Self {
            title: SelectorChain::new(&TITLE_SELECTORS),
            company: SelectorChain::new(&COMPANY_SELECTORS),
            location: SelectorChain::new(&LOCATION_SELECTORS),
            date: SelectorChain::new(&DATE_SELECTORS),
            tags: SelectorChain::new(&TAG_SELECTORS),
            description: SelectorChain::new(&DESCRIPTION_SELECTORS),
            title_scan: SelectorChain::new(&[TITLE_SCAN_SELECTOR]),
            link: Selector::parse("a").ok(),
        }
    }
}

impl FieldExtractor {
    /// Pull every field out of `candidate`. Relative links are resolved
    /// against `page_url` when given.
    pub fn extract(&self, candidate: ElementRef<'_>, page_url: Option<&Url>) -> ExtractedFields {
        let mut fields = ExtractedFields {
            title: self
                .title
                .first_text(candidate)
                .or_else(|| self.scan_title(candidate)),
            company: self.company.first_text(candidate),
            location: self.location.first_text(candidate),
            date_text: self.date.first_match_text(candidate),
            tags: self.tags.all_texts(candidate),
            url: self.link(candidate, page_url),
            ..Default::default()
        };

        fields.description = self
            .description
            .first_text(candidate)
            .unwrap_or_else(|| residual_text(candidate, &fields));

        for (name, missing) in [
            ("title", fields.title.is_none()),
            ("company", fields.company.is_none()),
            ("location", fields.location.is_none()),
            ("posting_date", fields.date_text.is_none()),
            ("url", fields.url.is_none()),
        ] {
            if missing {
                fields.misses.push(name);
            }
        }

        fields
    }

    /// First descendant whose text is 6 to 99 characters and names a role.
    fn scan_title(&self, candidate: ElementRef<'_>) -> Option<String> {
        self.title_scan
            .iter()
            .flat_map(|(_, selector)| candidate.select(selector))
            .map(visible_text)
            .find(|text| {
                let len = text.chars().count();
                len > 5 && len < 100 && {
                    let lower = text.to_lowercase();
                    ROLE_KEYWORDS.iter().any(|k| lower.contains(*k))
                }
            })
    }

    fn link(&self, candidate: ElementRef<'_>, page_url: Option<&Url>) -> Option<String> {
        let href = candidate
            .select(self.link.as_ref()?)
            .next()?
            .value()
            .attr("href")?
            .trim();
        if href.is_empty() {
            return None;
        }
        let resolved = page_url
            .and_then(|base| base.join(href).ok())
            .map(String::from)
            .unwrap_or_else(|| href.to_string());
        Some(resolved)
    }
}

/// Candidate text with the first occurrence of title, company and location
/// removed.
fn residual_text(candidate: ElementRef<'_>, fields: &ExtractedFields) -> String {
    let mut text = visible_text(candidate);
    for part in [&fields.title, &fields.company, &fields.location]
        .into_iter()
        .flatten()
    {
        text = text.replacen(part.as_str(), "", 1);
    }
    collapse_whitespace(&text)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use scraper::Html;

    use super::*;
    use crate::models::job::JobType;

    fn extract(html: &str) -> ExtractedFields {
        let document = Html::parse_fragment(html);
        let candidate = document.root_element();
        let base = Url::parse("https://www.actuarylist.com/").unwrap();
        FieldExtractor::default().extract(candidate, Some(&base))
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn structured_card() {
        let fields = extract(
            r#"<div class="job-card">
                 <a href="/jobs/pricing-actuary-123"><h3>Pricing Actuary</h3></a>
                 <span class="company">Acme Re</span>
                 <span class="location">NY</span>
                 <span class="date">3 days ago</span>
                 <span class="tag">Life</span><span class="tag">Pricing</span>
                 <p class="description">Build pricing models.</p>
               </div>"#,
        );

        assert_eq!(fields.title.as_deref(), Some("Pricing Actuary"));
        assert_eq!(fields.company.as_deref(), Some("Acme Re"));
        assert_eq!(fields.location.as_deref(), Some("NY"));
        assert_eq!(fields.date_text.as_deref(), Some("3 days ago"));
        assert_eq!(fields.tags, vec!["Life", "Pricing"]);
        assert_eq!(fields.description, "Build pricing models.");
        assert_eq!(
            fields.url.as_deref(),
            Some("https://www.actuarylist.com/jobs/pricing-actuary-123")
        );
        assert!(fields.misses.is_empty());
    }

    #[test]
    fn inline_markup_keeps_title_and_company_whole() {
        let fields = extract(
            r#"<div><h2>Pricing Act<em>uary</em></h2><span class="company">Acme<b>Re</b></span>
               <span class="location">New <i>York</i></span> Pricing models for <b>Acme</b>Re.</div>"#,
        );
        assert_eq!(fields.title.as_deref(), Some("Pricing Actuary"));
        assert_eq!(fields.company.as_deref(), Some("AcmeRe"));
        assert_eq!(fields.location.as_deref(), Some("New York"));
        assert_eq!(fields.description, "Pricing models for AcmeRe.");
    }

    #[test]
    fn heading_beats_title_class() {
        let fields = extract(r#"<div><span class="job-title">Class Title</span><h4>Heading Title</h4></div>"#);
        assert_eq!(fields.title.as_deref(), Some("Heading Title"));
    }

    #[test]
    fn title_falls_back_to_role_keyword_scan() {
        let fields = extract(
            r#"<section>
                 <span>New</span>
                 <p>Great benefits and a friendly team culture</p>
                 <span>Senior Reserving Actuary</span>
               </section>"#,
        );
        assert_eq!(fields.title.as_deref(), Some("Senior Reserving Actuary"));
    }

    #[test]
    fn title_scan_respects_length_bounds() {
        let long = format!("Actuary {}", "x".repeat(120));
        let fields = extract(&format!("<div><p>{long}</p><span>CFO</span></div>"));
        assert_eq!(fields.title, None);
        assert!(fields.misses.contains(&"title"));
    }

    #[test]
    fn tags_accumulate_across_selectors() {
        let fields = extract(
            r#"<div><b class="tag">Life</b><b class="category">Health</b>
               <b class="skill">Life</b><b class="technology">R</b></div>"#,
        );
        assert_eq!(fields.tags, vec!["Life", "Health", "R"]);
    }

    #[test]
    fn description_falls_back_to_residual_text() {
        let fields = extract(
            r#"<div><h2>Pricing Actuary</h2><span class="company">Acme Re</span>
               <span class="location">NY</span> Join our pricing team today.</div>"#,
        );
        assert_eq!(fields.description, "Join our pricing team today.");
    }

    #[test]
    fn residual_removes_first_occurrence_only() {
        let fields = extract(
            r#"<div><h2>Actuary</h2><span class="company">Acme</span> Actuary wanted at Acme</div>"#,
        );
        assert_eq!(fields.description, "Actuary wanted at Acme");
    }

    #[test]
    fn missing_link_and_date() {
        let fields = extract(r#"<div><h2>Pricing Actuary</h2></div>"#);
        assert_eq!(fields.url, None);
        assert_eq!(fields.date_text, None);
        assert!(fields.misses.contains(&"url"));
        assert!(fields.misses.contains(&"company"));
    }

    #[test]
    fn absolute_links_kept() {
        let fields = extract(r#"<div><a href="https://jobs.example.com/1">Apply</a></div>"#);
        assert_eq!(fields.url.as_deref(), Some("https://jobs.example.com/1"));
    }

    #[test]
    fn into_job_requires_title_and_company() {
        let missing_company = ExtractedFields {
            title: Some("Pricing Actuary".into()),
            location: Some("NY".into()),
            ..Default::default()
        };
        assert!(missing_company.into_job(now()).is_none());

        let missing_title = ExtractedFields {
            company: Some("Acme Re".into()),
            location: Some("NY".into()),
            description: "Lots of text".into(),
            ..Default::default()
        };
        assert!(missing_title.into_job(now()).is_none());

        let blank_title = ExtractedFields {
            title: Some("  ".into()),
            company: Some("Acme Re".into()),
            ..Default::default()
        };
        assert!(blank_title.into_job(now()).is_none());
    }

    #[test]
    fn into_job_normalizes_date_and_type() {
        let fields = ExtractedFields {
            title: Some("Actuarial Intern".into()),
            company: Some("Acme Re".into()),
            location: Some("NY".into()),
            date_text: Some("2 weeks ago".into()),
            tags: vec!["Life".into()],
            ..Default::default()
        };
        let job = fields.into_job(now()).unwrap();
        assert_eq!(job.job_type, Some(JobType::Intern));
        assert_eq!(job.posting_date, now() - chrono::TimeDelta::weeks(2));
        assert_eq!(job.description, None);
        assert_eq!(job.salary, None);
    }

    #[test]
    fn into_job_without_date_is_now() {
        let fields = ExtractedFields {
            title: Some("Pricing Actuary".into()),
            company: Some("Acme Re".into()),
            ..Default::default()
        };
        assert_eq!(fields.into_job(now()).unwrap().posting_date, now());
    }
}
