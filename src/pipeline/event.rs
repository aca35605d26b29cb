//! Event pipeline: the discovery root for teams and players

use super::{Progress, Session, Stage, TeamPipeline};
use crate::data::cache::PageDescriptor;
use crate::data::scrapers::event::{extract_event_page, EventPage};
use crate::data::scrapers::{parse_ordinal_date, strip_currency};
use crate::{EntityKind, Event, EventId, FantasyError, PlayerId, Result, Team, TeamId};
use std::collections::HashMap;

/// Builds one [`Event`] and resolves its rosters
pub struct EventPipeline {
    key: EventId,
    event: Option<Event>,
    /// Teams whose roster could not be fetched, with the reason
    unresolved: Vec<(TeamId, String)>,
    progress: Progress,
}

impl EventPipeline {
    pub fn new(key: EventId) -> Self {
        EventPipeline {
            key,
            event: None,
            unresolved: Vec::new(),
            progress: Progress::new(Stage::Uninitialized),
        }
    }

    pub fn stage(&self) -> Stage {
        self.progress.stage
    }

    pub fn event(&self) -> Option<&Event> {
        self.event.as_ref()
    }

    pub fn unresolved(&self) -> &[(TeamId, String)] {
        &self.unresolved
    }

    /// Fetch and parse the main page. A malformed page rejects the event.
    pub fn fetch_main_page(&mut self, session: &mut Session) -> Result<&Event> {
        let url = session.links.event(self.key);
        let html = session.page(&PageDescriptor::Event { event: self.key }, &url)?;
        let page = extract_event_page(&html, self.key)?;
        let event = build_event(self.key, &page);
        log::info!(
            "Event {}: {} teams, {:?} to {:?}",
            event,
            event.teams.len(),
            event.starts_at,
            event.ends_at
        );
        self.progress.stage = Stage::MainPageFetched;
        Ok(self.event.insert(event))
    }

    /// Resolve every team's active roster. A previously stored event with
    /// rosters is reused as is. A team whose lineups page is unavailable is
    /// kept without players and listed in [`EventPipeline::unresolved`].
    pub fn resolve_rosters(&mut self, session: &mut Session) -> Result<&Event> {
        if self.event.is_none() {
            if let Some(stored) = session.store.load_event(self.key)? {
                if stored.teams.iter().all(|t| !t.players.is_empty()) {
                    log::debug!("Event {} loaded from store", stored);
                    self.progress.stage = Stage::RosterResolved;
                    return Ok(self.event.insert(stored));
                }
            }
            self.fetch_main_page(session)?;
        }
        let Some(event) = self.event.as_mut() else {
            return Err(FantasyError::NoData(format!("event {} not loaded", self.key)));
        };

        let mut resolved = Vec::with_capacity(event.teams.len());
        self.unresolved.clear();
        for team in &event.teams {
            let mut pipeline = TeamPipeline::new(event.key, team.clone());
            match pipeline.resolve_roster(session) {
                Ok(()) => {}
                Err(e) if e.is_recoverable() => {
                    log::warn!("Event {}: roster of {} unavailable: {}", event.key, team, e);
                    self.unresolved.push((team.key, e.to_string()));
                }
                Err(e) => return Err(e),
            }
            resolved.push(pipeline.into_team());
        }
        event.teams = resolved;
        check_unique_players(event)?;

        session.store.save_event(event)?;
        self.progress.stage = Stage::RosterResolved;
        Ok(event)
    }
}

/// Turn raw main-page fields into an event
pub fn build_event(key: EventId, page: &EventPage) -> Event {
    let field = |name: &str| page.fields.get(name).unwrap_or_default().trim();

    let date = |name: &str| {
        let text = field(name);
        if text.is_empty() || text.eq_ignore_ascii_case("tba") {
            return None;
        }
        let parsed = parse_ordinal_date(text);
        if parsed.is_none() {
            log::warn!("Event {}: unparseable {} date '{}'", key, name, text);
        }
        parsed
    };
    let starts_at = date("start");
    let ends_at = date("end");

    let prize = field("prize");
    let is_qual = !prize.starts_with('$');
    let prize_pool = if is_qual {
        0.0
    } else {
        strip_currency(prize)
            .and_then(|p| p.parse::<f64>().ok())
            .unwrap_or(0.0)
    };

    let ranks: Vec<f64> = page
        .world_ranks
        .iter()
        .filter_map(|r| r.trim().trim_start_matches('#').parse::<f64>().ok())
        .collect();
    let rank = if ranks.is_empty() {
        None
    } else {
        Some(ranks.iter().sum::<f64>() / ranks.len() as f64)
    };

    Event {
        key,
        name: field("name").to_string(),
        rank,
        is_lan: !field("location").to_lowercase().contains("online"),
        is_qual,
        prize_pool,
        starts_at,
        ends_at,
        duration: match (starts_at, ends_at) {
            (Some(start), Some(end)) => Some((end - start).num_days()),
            _ => None,
        },
        teams: page
            .teams
            .iter()
            .map(|(team_key, name)| Team::new(*team_key, name))
            .collect(),
    }
}

/// A player may belong to exactly one team per event
fn check_unique_players(event: &Event) -> Result<()> {
    let mut seen: HashMap<PlayerId, TeamId> = HashMap::new();
    for (team, player) in event.players() {
        if let Some(other) = seen.insert(player.key, team.key) {
            if other != team.key {
                return Err(FantasyError::InvalidEntity {
                    kind: EntityKind::Event,
                    key: event.key.0,
                    reason: format!(
                        "player {} is listed by teams {} and {}",
                        player, other, team.key
                    ),
                });
            }
        }
    }
    Ok(())
}
