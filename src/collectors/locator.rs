//! Discovery of the DOM nodes that look like individual job postings.
//!
//! Tiers run in order and the first tier that yields any candidate wins;
//! results are never merged across tiers.

use scraper::{ElementRef, Html};

use super::text::{SelectorChain, visible_text};

/// Class-based patterns, most specific first.
pub const STRUCTURAL_SELECTORS: [&str; 9] = [
    ".job-listing",
    ".job-card",
    ".job-item",
    "[class*=\"job\"]",
    ".listing",
    ".card",
    ".post",
    ".position",
    ".opportunity",
];

pub const LISTING_KEYWORDS: [&str; 6] = [
    "actuary",
    "analyst",
    "job",
    "position",
    "opportunity",
    "career",
];

const HEURISTIC_MIN_CHARS: usize = 50;
const BULK_MIN_CHARS: usize = 100;
const BULK_LIMIT: usize = 20;

/// One strategy in the locator cascade.
pub trait LocatorTier: Send + Sync {
    fn name(&self) -> &'static str;

    fn locate<'a>(&self, document: &'a Html) -> Vec<ElementRef<'a>>;
}

/// Every match of the first selector that matches anything.
pub struct StructuralTier {
    selectors: SelectorChain,
}

impl StructuralTier {
    pub fn new(patterns: &[&str]) -> Self {
        Self {
            selectors: SelectorChain::new(patterns),
        }
    }
}

impl LocatorTier for StructuralTier {
    fn name(&self) -> &'static str {
        "structural"
    }

    fn locate<'a>(&self, document: &'a Html) -> Vec<ElementRef<'a>> {
        for (pattern, selector) in self.selectors.iter() {
            let found: Vec<_> = document.select(selector).collect();
            if !found.is_empty() {
                tracing::info!("Found {} job elements using selector: {pattern}", found.len());
                return found;
            }
        }
        Vec::new()
    }
}

/// Containers filtered by visible text length and, optionally, keywords.
pub struct ContentTier {
    name: &'static str,
    scope: SelectorChain,
    min_chars: usize,
    keywords: &'static [&'static str],
    limit: Option<usize>,
}

impl ContentTier {
    /// Generic `div`s over 50 characters mentioning a listing keyword.
    pub fn heuristic() -> Self {
        Self {
            name: "heuristic-content",
            scope: SelectorChain::new(&["div"]),
            min_chars: HEURISTIC_MIN_CHARS,
            keywords: &LISTING_KEYWORDS,
            limit: None,
        }
    }

    /// The first 20 containers over 100 characters.
    pub fn bulk() -> Self {
        Self {
            name: "bulk-content",
            scope: SelectorChain::new(&["div, article, section"]),
            min_chars: BULK_MIN_CHARS,
            keywords: &[],
            limit: Some(BULK_LIMIT),
        }
    }

    fn accepts(&self, element: ElementRef<'_>) -> bool {
        let text = visible_text(element);
        if text.chars().count() <= self.min_chars {
            return false;
        }
        if self.keywords.is_empty() {
            return true;
        }
        let lower = text.to_lowercase();
        self.keywords.iter().any(|k| lower.contains(*k))
    }
}

impl LocatorTier for ContentTier {
    fn name(&self) -> &'static str {
        self.name
    }

    fn locate<'a>(&self, document: &'a Html) -> Vec<ElementRef<'a>> {
        let matches = self
            .scope
            .iter()
            .flat_map(|(_, selector)| document.select(selector))
            .filter(|element| self.accepts(*element));
        let found: Vec<_> = match self.limit {
            Some(limit) => matches.take(limit).collect(),
            None => matches.collect(),
        };
        tracing::info!("Found {} potential job elements using {}", found.len(), self.name);
        found
    }
}

/// Candidates plus the tier that produced them.
#[derive(Debug)]
pub struct Located<'a> {
    pub tier: Option<&'static str>,
    pub candidates: Vec<ElementRef<'a>>,
}

pub struct ListingLocator {
    tiers: Vec<Box<dyn LocatorTier>>,
}

impl Default for ListingLocator {
    fn default() -> Self {
        Self::new(vec![
            Box::new(StructuralTier::new(&STRUCTURAL_SELECTORS)),
            Box::new(ContentTier::heuristic()),
            Box::new(ContentTier::bulk()),
        ])
    }
}

impl ListingLocator {
    pub fn new(tiers: Vec<Box<dyn LocatorTier>>) -> Self {
        Self { tiers }
    }

    pub fn locate<'a>(&self, document: &'a Html) -> Located<'a> {
        for tier in &self.tiers {
            let candidates = tier.locate(document);
            if !candidates.is_empty() {
                return Located {
                    tier: Some(tier.name()),
                    candidates,
                };
            }
            tracing::info!("No candidates from {} tier, widening search", tier.name());
        }
        Located {
            tier: None,
            candidates: Vec::new(),
        }
    }
}
