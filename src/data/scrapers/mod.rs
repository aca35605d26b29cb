//! Page extractors
//!
//! One extractor per (entity kind, page type). Each turns a document into
//! raw name → text fields. Surface text is normalised (whitespace, currency,
//! ordinal dates) but no business meaning is assigned here; that is the
//! preprocessors' job.

pub mod event;
pub mod fantasy;
pub mod player;
pub mod ranking;
pub mod team;

use crate::{FantasyError, Result};
use chrono::NaiveDate;
use regex::Regex;
use scraper::{ElementRef, Selector};
use std::collections::BTreeMap;

/// Raw fields extracted from one page or one table row.
/// A missing optional node is simply an absent field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
    fields: BTreeMap<String, String>,
}

impl RawRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Option<String>) {
        if let Some(value) = value {
            self.fields.insert(name.into(), value);
        }
    }

    pub fn with(mut self, name: &str, value: &str) -> Self {
        self.fields.insert(name.to_string(), value.to_string());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Compile a CSS selector
pub(crate) fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| FantasyError::Selector(format!("{}: {}", css, e)))
}

/// Text content of an element with whitespace runs collapsed
pub(crate) fn element_text(element: &ElementRef) -> String {
    element
        .text()
        .flat_map(|t| t.split_whitespace())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text of the first descendant matching `selector`
pub(crate) fn select_text(element: &ElementRef, selector: &Selector) -> Option<String> {
    element.select(selector).next().map(|e| element_text(&e))
}

/// Whether an element carries a class
pub(crate) fn has_class(element: &ElementRef, class: &str) -> bool {
    element.value().classes().any(|c| c == class)
}

/// Drop ordinal suffixes: "Jun 12th 2024" → "Jun 12 2024"
pub fn strip_ordinals(text: &str) -> String {
    match Regex::new(r"(\d+)(st|nd|rd|th)\b") {
        Ok(re) => re.replace_all(text, "$1").to_string(),
        Err(_) => text.to_string(),
    }
}

/// Parse dates written like "Jun 12th 2024", "12th Jun 2024" or "2024-06-12"
pub fn parse_ordinal_date(text: &str) -> Option<NaiveDate> {
    let cleaned = strip_ordinals(text.trim()).replace(',', "");
    let cleaned = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    ["%b %d %Y", "%B %d %Y", "%d %b %Y", "%d %B %Y", "%Y-%m-%d", "%d/%m/%Y"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(&cleaned, fmt).ok())
}

/// Strip currency symbols and thousands separators: "$200,000" → "200000"
pub fn strip_currency(text: &str) -> Option<String> {
    let digits: String = text
        .trim()
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    if digits.is_empty() {
        None
    } else {
        Some(digits)
    }
}

/// Path segments of a link, ignoring the query string
pub(crate) fn href_segments(href: &str) -> Vec<String> {
    let path = href.split('?').next().unwrap_or(href);
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    #[test]
    fn test_parse_ordinal_dates() {
        let expected = NaiveDate::from_ymd_opt(2024, 6, 12);
        assert_eq!(parse_ordinal_date("Jun 12th 2024"), expected);
        assert_eq!(parse_ordinal_date("12th Jun 2024"), expected);
        assert_eq!(parse_ordinal_date(" Jun 12th, 2024 "), expected);
        assert_eq!(
            parse_ordinal_date("Mar 1st 2023"),
            NaiveDate::from_ymd_opt(2023, 3, 1)
        );
        assert_eq!(parse_ordinal_date("TBA"), None);
    }

    #[test]
    fn test_strip_currency() {
        assert_eq!(strip_currency("$1,250,000").as_deref(), Some("1250000"));
        assert_eq!(strip_currency("Other"), None);
    }

    #[test]
    fn test_href_segments() {
        assert_eq!(
            href_segments("/stats/players/7998/s1mple?startDate=2024-01-01"),
            vec!["stats", "players", "7998", "s1mple"]
        );
    }

    #[test]
    fn test_select_text_collapses_whitespace() {
        let html = Html::parse_fragment("<div><span class=\"x\">  Natus \n  Vincere </span></div>");
        let sel = selector("span.x").unwrap();
        let root = html.root_element();
        assert_eq!(select_text(&root, &sel).as_deref(), Some("Natus Vincere"));
        assert!(selector("span[").is_err());
    }

    #[test]
    fn test_raw_record_drops_missing_nodes() {
        let mut record = RawRecord::new();
        record.insert("name", Some("BLAST".to_string()));
        record.insert("prize", None);
        assert_eq!(record.get("name"), Some("BLAST"));
        assert_eq!(record.get("prize"), None);
        assert_eq!(record.len(), 1);
    }
}
