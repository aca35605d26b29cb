//! Event main page extractor

use super::{element_text, href_segments, select_text, selector, RawRecord};
use crate::{EntityKind, EventId, FantasyError, Result};
use scraper::Html;

/// Number of cells in the event info table: start, end, teams, prize, location
const META_CELLS: usize = 5;

/// Raw content of an event main page
#[derive(Debug, Clone, PartialEq)]
pub struct EventPage {
    /// name, start, end, prize, location
    pub fields: RawRecord,
    /// (key, name) of attending teams in page order, deduplicated
    pub teams: Vec<(u32, String)>,
    /// World-rank badges shown next to the teams, e.g. "#4"
    pub world_ranks: Vec<String>,
}

/// Extract the event main page. The info table is structural: a missing
/// table or an unexpected cell count rejects the whole event.
pub fn extract_event_page(html: &str, key: EventId) -> Result<EventPage> {
    let document = Html::parse_document(html);
    let root = document.root_element();
    let invalid = |reason: String| FantasyError::InvalidEntity {
        kind: EntityKind::Event,
        key: key.0,
        reason,
    };

    let name = select_text(&root, &selector("h1.event-hub-title")?)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| invalid("event title not found".to_string()))?;

    let table = document
        .select(&selector("table.eventMeta")?)
        .next()
        .ok_or_else(|| invalid("info table not found".to_string()))?;
    let cells: Vec<String> = table
        .select(&selector("td")?)
        .map(|td| element_text(&td))
        .collect();
    if cells.len() != META_CELLS {
        return Err(invalid(format!(
            "info table has {} cells, expected {}",
            cells.len(),
            META_CELLS
        )));
    }

    let mut fields = RawRecord::new();
    fields.insert("name", Some(name));
    fields.insert("start", Some(cells[0].clone()));
    fields.insert("end", Some(cells[1].clone()));
    fields.insert("prize", Some(cells[3].clone()));
    fields.insert("location", Some(cells[4].clone()));

    let mut teams: Vec<(u32, String)> = Vec::new();
    let link_selector = selector("div.team-name a")?;
    for link in document.select(&link_selector) {
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        let segments = href_segments(href);
        match (segments.get(1).and_then(|k| k.parse::<u32>().ok()), segments.get(2)) {
            (Some(team_key), Some(team_name)) if segments[0] == "team" => {
                if !teams.iter().any(|(k, _)| *k == team_key) {
                    teams.push((team_key, team_name.clone()));
                }
            }
            _ => log::warn!("Event {}: skipping team link '{}'", key, href),
        }
    }

    let world_ranks = document
        .select(&selector("div.event-world-rank")?)
        .map(|e| element_text(&e))
        .collect();

    Ok(EventPage {
        fields,
        teams,
        world_ranks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r##"<html><body>
        <h1 class="event-hub-title">BLAST Premier Spring Final 2024</h1>
        <table class="table eventMeta"><tbody>
          <tr><th>Start date</th><td>Jun 12th 2024</td></tr>
          <tr><th>End date</th><td>Jun 16th 2024</td></tr>
          <tr><th>Teams</th><td>8</td></tr>
          <tr><th>Prize pool</th><td>$425,000</td></tr>
          <tr><th>Location</th><td>London, United Kingdom</td></tr>
        </tbody></table>
        <div class="team-box"><div class="team-name"><a href="/team/9565/vitality">Vitality</a></div>
          <div class="event-world-rank">#1</div></div>
        <div class="team-box"><div class="team-name"><a href="/team/4608/natus-vincere">NAVI</a></div>
          <div class="event-world-rank">#4</div></div>
        <div class="team-box"><div class="team-name"><a href="/team/9565/vitality">Vitality</a></div></div>
    </body></html>"##;

    #[test]
    fn test_extract_event_page() {
        let page = extract_event_page(PAGE, EventId(7552)).unwrap();
        assert_eq!(page.fields.get("name"), Some("BLAST Premier Spring Final 2024"));
        assert_eq!(page.fields.get("start"), Some("Jun 12th 2024"));
        assert_eq!(page.fields.get("prize"), Some("$425,000"));
        assert_eq!(
            page.teams,
            vec![
                (9565, "vitality".to_string()),
                (4608, "natus-vincere".to_string())
            ]
        );
        assert_eq!(page.world_ranks, vec!["#1", "#4"]);
    }

    #[test]
    fn test_wrong_cell_count_is_invalid_entity() {
        let broken = PAGE.replace("<tr><th>Teams</th><td>8</td></tr>", "");
        let err = extract_event_page(&broken, EventId(7552)).unwrap_err();
        assert!(matches!(
            err,
            FantasyError::InvalidEntity {
                kind: EntityKind::Event,
                key: 7552,
                ..
            }
        ));
    }

    #[test]
    fn test_missing_table_is_invalid_entity() {
        let html = "<html><h1 class=\"event-hub-title\">X</h1></html>";
        assert!(matches!(
            extract_event_page(html, EventId(1)),
            Err(FantasyError::InvalidEntity { .. })
        ));
    }
}
