//! Team statistics page extractors

use super::{element_text, has_class, href_segments, select_text, selector, RawRecord};
use crate::{EntityKind, FantasyError, Result, TeamId};
use scraper::{ElementRef, Html};

/// Raw content of one lineup block
#[derive(Debug, Clone, PartialEq)]
pub struct LineupBlock {
    /// period_start, period_end (absent when still active), the
    /// matching `*_unix` stamps, and the block's stat boxes by label
    pub fields: RawRecord,
    /// (key, name) for each linked player
    pub players: Vec<(u32, String)>,
}

/// Label → value pairs from the big stat boxes
fn stat_boxes(scope: &ElementRef) -> Result<RawRecord> {
    let box_selector = selector("div.col.standard-box.big-padding")?;
    let label_selector = selector("div.small-label-below")?;
    let value_selector = selector("div.large-strong")?;

    let mut record = RawRecord::new();
    for stat in scope.select(&box_selector) {
        if let Some(label) = select_text(&stat, &label_selector) {
            record.insert(label, select_text(&stat, &value_selector));
        }
    }
    Ok(record)
}

/// Overview page: stat boxes keyed by their label ("Maps played", ...)
pub fn extract_overview(html: &str) -> Result<RawRecord> {
    let document = Html::parse_document(html);
    stat_boxes(&document.root_element())
}

/// Matches page: one record per map, newest first.
/// `first` is "1" on the row that opens a match.
pub fn extract_matches(html: &str) -> Result<Vec<RawRecord>> {
    let document = Html::parse_document(html);
    let Some(table) = document
        .select(&selector("table.stats-table.no-sort")?)
        .next()
    else {
        return Ok(Vec::new());
    };

    let row_selector = selector("tbody tr")?;
    let time_selector = selector("td.time")?;
    let span_selector = selector("span")?;
    let opponent_selector = selector("td:not([class])")?;
    let map_selector = selector("td.statsMapPlayed span")?;
    let rounds_selector = selector("span.statsDetail")?;
    let td_selector = selector("td")?;

    let mut maps = Vec::new();
    for row in table.select(&row_selector) {
        let mut record = RawRecord::new();
        record.insert("time", select_text(&row, &time_selector));
        record.insert("event", select_text(&row, &span_selector));
        record.insert("opponent", select_text(&row, &opponent_selector));
        record.insert("map", select_text(&row, &map_selector));
        record.insert("rounds", select_text(&row, &rounds_selector));
        record.insert("result", row.select(&td_selector).last().map(|td| element_text(&td)));
        let first = if has_class(&row, "first") { "1" } else { "0" };
        record.insert("first", Some(first.to_string()));
        maps.push(record);
    }
    Ok(maps)
}

/// Event history page: placement and event name per row
pub fn extract_events(html: &str) -> Result<Vec<RawRecord>> {
    let document = Html::parse_document(html);
    let Some(table) = document.select(&selector("table.stats-table")?).next() else {
        return Ok(Vec::new());
    };

    let row_selector = selector("tbody tr")?;
    let placement_selector = selector("td.statsCenterText")?;
    let span_selector = selector("span")?;

    Ok(table
        .select(&row_selector)
        .map(|row| {
            let mut record = RawRecord::new();
            record.insert("placement", select_text(&row, &placement_selector));
            record.insert("event", select_text(&row, &span_selector));
            record
        })
        .collect())
}

/// Lineups page. The roster section is structural: without any lineup
/// block the team cannot be resolved.
pub fn extract_lineups(html: &str, team: TeamId) -> Result<Vec<LineupBlock>> {
    let document = Html::parse_document(html);
    let container_selector = selector("div.lineup-container")?;
    let period_selector = selector("div.lineup-year span:not([class])")?;
    let player_selector = selector("div.teammate-info.standard-box a.image-and-label")?;

    let mut blocks = Vec::new();
    for container in document.select(&container_selector) {
        let mut fields = stat_boxes(&container)?;
        let spans: Vec<ElementRef> = container.select(&period_selector).collect();
        if let Some(start) = spans.first() {
            fields.insert("period_start", Some(element_text(start)));
            fields.insert("period_start_unix", start.value().attr("data-unix").map(String::from));
        }
        if let Some(end) = spans.get(1) {
            fields.insert("period_end", Some(element_text(end)));
            fields.insert("period_end_unix", end.value().attr("data-unix").map(String::from));
        }

        let mut players = Vec::new();
        for link in container.select(&player_selector) {
            let Some(href) = link.value().attr("href") else {
                log::warn!("Team {}: lineup player without link", team);
                continue;
            };
            let segments = href_segments(href);
            match (segments.get(2).and_then(|k| k.trim().parse::<u32>().ok()), segments.get(3)) {
                (Some(key), Some(name)) => players.push((key, name.trim().to_lowercase())),
                _ => log::warn!("Team {}: skipping player link '{}'", team, href),
            }
        }

        blocks.push(LineupBlock { fields, players });
    }

    if blocks.is_empty() {
        return Err(FantasyError::InvalidEntity {
            kind: EntityKind::Team,
            key: team.0,
            reason: "roster section not found".to_string(),
        });
    }
    Ok(blocks)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MATCHES: &str = r#"<table class="stats-table no-sort"><tbody>
        <tr class="group-1 first"><td class="time"><a>14/06/24</a></td>
            <td class="gtSmartphone-only"><span>BLAST Premier</span></td>
            <td>FaZe</td><td class="statsMapPlayed"><span>Mirage</span></td>
            <td><span class="statsDetail">13 - 9</span></td><td class="text-center match-won">W</td></tr>
        <tr class="group-1"><td class="time"><a>14/06/24</a></td>
            <td class="gtSmartphone-only"><span>BLAST Premier</span></td>
            <td>FaZe</td><td class="statsMapPlayed"><span>Inferno</span></td>
            <td><span class="statsDetail">10 - 13</span></td><td class="text-center match-lost">L</td></tr>
    </tbody></table>"#;

    #[test]
    fn test_extract_matches() {
        let maps = extract_matches(MATCHES).unwrap();
        assert_eq!(maps.len(), 2);
        assert_eq!(maps[0].get("time"), Some("14/06/24"));
        assert_eq!(maps[0].get("event"), Some("BLAST Premier"));
        assert_eq!(maps[0].get("opponent"), Some("FaZe"));
        assert_eq!(maps[0].get("map"), Some("Mirage"));
        assert_eq!(maps[0].get("rounds"), Some("13 - 9"));
        assert_eq!(maps[0].get("result"), Some("W"));
        assert_eq!(maps[0].get("first"), Some("1"));
        assert_eq!(maps[1].get("first"), Some("0"));
    }

    #[test]
    fn test_missing_matches_table_is_empty() {
        assert!(extract_matches("<html></html>").unwrap().is_empty());
    }

    #[test]
    fn test_extract_overview() {
        let html = r#"<div class="col standard-box big-padding">
              <div class="large-strong">42</div><div class="small-label-below">Maps played</div></div>
            <div class="col standard-box big-padding">
              <div class="large-strong">25 / 1 / 16</div><div class="small-label-below">Wins / draws / losses</div></div>"#;
        let overview = extract_overview(html).unwrap();
        assert_eq!(overview.get("Maps played"), Some("42"));
        assert_eq!(overview.get("Wins / draws / losses"), Some("25 / 1 / 16"));
    }

    #[test]
    fn test_extract_lineups() {
        let html = r#"<div class="lineup-container">
              <div class="lineup-year"><span data-unix="1704067200000">Jan 2024</span> - <span class="sep">x</span></div>
              <div class="col standard-box big-padding"><div class="large-strong">50</div>
                <div class="small-label-below">Maps played</div></div>
              <div class="teammate-info standard-box"><a class="image-and-label" href="/stats/players/11893/ZywOo?startDate=all">ZywOo</a></div>
              <div class="teammate-info standard-box"><a class="image-and-label" href="/stats/players/9216/apEX">apEX</a></div>
            </div>"#;
        let blocks = extract_lineups(html, TeamId(9565)).unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].fields.get("period_start"), Some("Jan 2024"));
        assert_eq!(blocks[0].fields.get("period_start_unix"), Some("1704067200000"));
        assert_eq!(blocks[0].fields.get("period_end"), None);
        assert_eq!(blocks[0].fields.get("Maps played"), Some("50"));
        assert_eq!(
            blocks[0].players,
            vec![(11893, "zywoo".to_string()), (9216, "apex".to_string())]
        );
    }

    #[test]
    fn test_missing_roster_is_invalid_entity() {
        let err = extract_lineups("<html><body></body></html>", TeamId(9565)).unwrap_err();
        assert!(matches!(
            err,
            FantasyError::InvalidEntity {
                kind: EntityKind::Team,
                key: 9565,
                ..
            }
        ));
    }
}
