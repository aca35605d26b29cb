//! URL catalogue for the results site

use crate::{Config, EventId, Player, Team};
use chrono::NaiveDate;

/// Team statistics pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TeamPage {
    Overview,
    Matches,
    Events,
    Lineups,
}

impl TeamPage {
    /// Name used as the cache file prefix
    pub fn name(&self) -> &'static str {
        match self {
            TeamPage::Overview => "overview",
            TeamPage::Matches => "matches",
            TeamPage::Events => "events",
            TeamPage::Lineups => "lineups",
        }
    }

    fn segment(&self) -> &'static str {
        match self {
            TeamPage::Overview => "",
            TeamPage::Matches => "matches/",
            TeamPage::Events => "events/",
            TeamPage::Lineups => "lineups/",
        }
    }
}

/// Player statistics pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayerPage {
    Overview,
    Individual,
    Matches,
    Clutches,
}

impl PlayerPage {
    pub fn name(&self) -> &'static str {
        match self {
            PlayerPage::Overview => "overview",
            PlayerPage::Individual => "individual",
            PlayerPage::Matches => "matches",
            PlayerPage::Clutches => "clutches",
        }
    }
}

/// Builds page URLs against a configurable base
#[derive(Debug, Clone)]
pub struct Links {
    base: String,
}

impl Links {
    pub fn new(base_url: &str) -> Self {
        Links {
            base: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Event main page with the attending teams
    pub fn event(&self, event: EventId) -> String {
        format!("{}/events/{}/event", self.base, event)
    }

    /// Team statistics page; `event` narrows the page to one event's matches
    pub fn team_stats(
        &self,
        team: &Team,
        page: TeamPage,
        config: &Config,
        event: Option<EventId>,
    ) -> String {
        let mut url = format!(
            "{}/stats/teams/{}{}/{}?{}",
            self.base,
            page.segment(),
            team.key,
            team.name,
            config.query()
        );
        if let Some(event) = event {
            url.push_str(&format!("&event={}", event));
        }
        url
    }

    /// Lineup history as of a given event
    pub fn team_lineups(&self, team: &Team, event: EventId) -> String {
        format!(
            "{}/stats/teams/{}{}/{}?event={}",
            self.base,
            TeamPage::Lineups.segment(),
            team.key,
            team.name,
            event
        )
    }

    pub fn player_stats(
        &self,
        player: &Player,
        page: PlayerPage,
        config: &Config,
        event: Option<EventId>,
    ) -> String {
        let path = match page {
            PlayerPage::Overview => format!("{}/{}", player.key, player.name),
            PlayerPage::Individual => format!("individual/{}/{}", player.key, player.name),
            PlayerPage::Matches => format!("matches/{}/{}", player.key, player.name),
            PlayerPage::Clutches => format!("clutches/{}/1on1/{}", player.key, player.name),
        };
        let mut url = format!("{}/stats/players/{}?{}", self.base, path, config.query());
        if let Some(event) = event {
            url.push_str(&format!("&event={}", event));
        }
        url
    }

    /// World ranking published on `date`
    pub fn ranking(&self, date: NaiveDate) -> String {
        format!(
            "{}/ranking/teams/{}/{}/{}",
            self.base,
            date.format("%Y"),
            date.format("%B").to_string().to_lowercase(),
            date.format("%-d")
        )
    }

    /// Fantasy game page listing player prices
    pub fn fantasy_game(&self, fantasy_id: u32) -> String {
        format!("{}/fantasy/{}/overview", self.base, fantasy_id)
    }
}
