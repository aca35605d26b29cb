//! World ranking page extractor

use super::{element_text, select_text, selector, RawRecord};
use crate::Result;
use scraper::Html;

/// One record per ranked team: name, position, points, change
pub fn extract_ranking(html: &str) -> Result<Vec<RawRecord>> {
    let document = Html::parse_document(html);
    let team_selector = selector("div.ranked-team.standard-box")?;
    let name_selector = selector("span.name")?;
    let position_selector = selector("span.position")?;
    let points_selector = selector("span.points")?;
    let change_selector = selector("div.change")?;

    Ok(document
        .select(&team_selector)
        .map(|team| {
            let mut record = RawRecord::new();
            record.insert("name", select_text(&team, &name_selector));
            record.insert("position", select_text(&team, &position_selector));
            record.insert("points", select_text(&team, &points_selector));
            record.insert(
                "change",
                team.select(&change_selector).next().map(|c| element_text(&c)),
            );
            record
        })
        .collect())
}

/// Lowercase, turn runs of `-_^*` into a space and trim
pub fn normalize_team_name(name: &str) -> String {
    let mut normalized = String::with_capacity(name.len());
    let mut in_separator = false;
    for c in name.to_lowercase().chars() {
        if matches!(c, '-' | '_' | '^' | '*') {
            if !in_separator {
                normalized.push(' ');
            }
            in_separator = true;
        } else {
            normalized.push(c);
            in_separator = false;
        }
    }
    normalized.trim().to_string()
}

/// The ranking row of a team, matched on normalised name
pub fn find_team<'a>(rows: &'a [RawRecord], team_name: &str) -> Option<&'a RawRecord> {
    let wanted = normalize_team_name(team_name);
    rows.iter()
        .find(|row| row.get("name").map(normalize_team_name).as_deref() == Some(wanted.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <div class="ranked-team standard-box">
          <span class="position">#1</span><span class="name">Vitality</span>
          <span class="points">(977 points)</span><div class="change">-</div>
        </div>
        <div class="ranked-team standard-box">
          <span class="position">#4</span><span class="name">Natus Vincere</span>
          <span class="points">(612 points)</span><div class="change negative">-2</div>
        </div>"#;

    #[test]
    fn test_extract_and_find() {
        let rows = extract_ranking(PAGE).unwrap();
        assert_eq!(rows.len(), 2);
        let navi = find_team(&rows, "natus-vincere").unwrap();
        assert_eq!(navi.get("position"), Some("#4"));
        assert_eq!(navi.get("points"), Some("(612 points)"));
        assert_eq!(navi.get("change"), Some("-2"));
        assert!(find_team(&rows, "faze").is_none());
    }

    #[test]
    fn test_normalize_team_name() {
        assert_eq!(normalize_team_name("Natus--Vincere"), "natus vincere");
        assert_eq!(normalize_team_name(" _G2*_ "), "g2");
    }
}
