//! Player statistics page extractors

use super::{element_text, has_class, select_text, selector, RawRecord};
use crate::Result;
use scraper::{ElementRef, Html};

/// Field names of the six summary values, in page order
pub const SUMMARY_FIELDS: [&str; 6] = ["rating", "dpr", "kast", "impact", "adr", "kpr"];

/// Collect consecutive (label, value) span pairs
fn span_pairs(scope: &ElementRef, record: &mut RawRecord) -> Result<()> {
    let span_selector = selector("span")?;
    let spans: Vec<String> = scope.select(&span_selector).map(|s| element_text(&s)).collect();
    for pair in spans.chunks_exact(2) {
        record.insert(pair[0].clone(), Some(pair[1].clone()));
    }
    Ok(())
}

/// Overview page: the summary breakdown under [`SUMMARY_FIELDS`] plus
/// every label/value pair from the stat boxes
pub fn extract_overview(html: &str) -> Result<RawRecord> {
    let document = Html::parse_document(html);
    let mut record = RawRecord::new();

    let summary: Vec<String> = document
        .select(&selector("div.summaryStatBreakdownDataValue")?)
        .map(|e| element_text(&e))
        .collect();
    if summary.len() == SUMMARY_FIELDS.len() {
        for (name, value) in SUMMARY_FIELDS.iter().zip(summary) {
            record.insert(*name, Some(value));
        }
    } else if !summary.is_empty() {
        log::warn!("Unexpected summary breakdown with {} values", summary.len());
    }

    for stat_box in document.select(&selector("div.col.stats-rows.standard-box")?) {
        span_pairs(&stat_box, &mut record)?;
    }
    Ok(record)
}

/// Individual page: label/value pairs of every stats row
pub fn extract_individual(html: &str) -> Result<RawRecord> {
    let document = Html::parse_document(html);
    let mut record = RawRecord::new();
    for row in document.select(&selector("div.stats-row")?) {
        span_pairs(&row, &mut record)?;
    }
    Ok(record)
}

/// 1on1 clutches page: `won` and `lost` from the summary, empty when the
/// page has no summary
pub fn extract_clutches(html: &str) -> Result<RawRecord> {
    let document = Html::parse_document(html);
    let mut record = RawRecord::new();
    if let Some(summary) = document.select(&selector("div.summary")?).next() {
        let values: Vec<String> = summary
            .select(&selector("div.value")?)
            .map(|v| element_text(&v))
            .collect();
        record.insert("won", values.first().cloned());
        record.insert("lost", values.get(1).cloned());
    }
    Ok(record)
}

/// Matches page: one record per map, newest first, carrying `first`,
/// `won` ("1"/"0") and the map `rating`
pub fn extract_matches(html: &str) -> Result<Vec<RawRecord>> {
    let document = Html::parse_document(html);
    let Some(table) = document.select(&selector("table.stats-table")?).next() else {
        return Ok(Vec::new());
    };

    let row_selector = selector("tbody tr")?;
    let date_selector = selector("td.time")?;
    let won_selector = selector("[class*=\"match-won\"]")?;
    let rating_selector = selector("[class*=\"rating\"]")?;

    let mut maps = Vec::new();
    for row in table.select(&row_selector) {
        let mut record = RawRecord::new();
        record.insert("date", select_text(&row, &date_selector));
        let first = if has_class(&row, "first") { "1" } else { "0" };
        record.insert("first", Some(first.to_string()));
        let won = if row.select(&won_selector).next().is_some() { "1" } else { "0" };
        record.insert("won", Some(won.to_string()));
        record.insert("rating", select_text(&row, &rating_selector));
        maps.push(record);
    }
    Ok(maps)
}
