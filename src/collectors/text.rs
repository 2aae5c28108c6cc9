//! Text and selector helpers shared by the locator and the field extractor.

use scraper::{ElementRef, Selector};

/// Elements whose text never renders.
const HIDDEN_ELEMENTS: [&str; 4] = ["script", "style", "noscript", "template"];

/// Elements that start a new line of rendered text.
const BLOCK_ELEMENTS: [&str; 29] = [
    "address", "article", "aside", "blockquote", "br", "dd", "div", "dl", "dt", "footer",
    "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main", "nav", "ol", "p",
    "section", "table", "td", "th", "tr", "ul",
];

/// Rendered text of an element, whitespace collapsed to single spaces.
/// Inline markup joins its text to its neighbours; block elements break it.
pub fn visible_text(element: ElementRef<'_>) -> String {
    let mut raw = String::new();
    push_text(element, &mut raw);
    collapse_whitespace(&raw)
}

fn push_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
            continue;
        }
        let Some(child_element) = ElementRef::wrap(child) else {
            continue;
        };
        let name = child_element.value().name();
        if HIDDEN_ELEMENTS.contains(&name) {
            continue;
        }
        let block = BLOCK_ELEMENTS.contains(&name);
        if block {
            out.push(' ');
        }
        push_text(child_element, out);
        if block {
            out.push(' ');
        }
    }
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// An ordered list of CSS selectors tried against one element.
#[derive(Debug)]
pub struct SelectorChain {
    selectors: Vec<(String, Selector)>,
}

impl SelectorChain {
    /// Compile the patterns in order. Patterns that fail to parse are dropped.
    pub fn new(patterns: &[&str]) -> Self {
        let selectors = patterns
            .iter()
            .filter_map(|pattern| match Selector::parse(pattern) {
                Ok(selector) => Some((pattern.to_string(), selector)),
                Err(e) => {
                    tracing::warn!("Ignoring invalid selector '{pattern}': {e:?}");
                    None
                }
            })
            .collect();
        Self { selectors }
    }

    /// Patterns with their compiled selectors, in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Selector)> {
        self.selectors
            .iter()
            .map(|(pattern, selector)| (pattern.as_str(), selector))
    }

    /// Text of the first selector whose first match has non-empty text.
    pub fn first_text(&self, element: ElementRef<'_>) -> Option<String> {
        self.iter().find_map(|(_, selector)| {
            element
                .select(selector)
                .next()
                .map(visible_text)
                .filter(|text| !text.is_empty())
        })
    }

    /// Text of the first element matched by any selector, even if empty.
    pub fn first_match_text(&self, element: ElementRef<'_>) -> Option<String> {
        self.iter()
            .find_map(|(_, selector)| element.select(selector).next())
            .map(visible_text)
    }

    /// Non-empty texts of every match of every selector, first occurrence kept.
    pub fn all_texts(&self, element: ElementRef<'_>) -> Vec<String> {
        let mut texts: Vec<String> = Vec::new();
        for (_, selector) in self.iter() {
            for matched in element.select(selector) {
                let text = visible_text(matched);
                if !text.is_empty() && !texts.contains(&text) {
                    texts.push(text);
                }
            }
        }
        texts
    }
}
