//! Competitive-match statistics harvester
//!
//! Scrapes per-entity statistics pages (events, teams, players), turns the
//! heterogeneous markup into typed feature rows and assembles event-scoped
//! training corpora labelled with a computed outcome.

pub mod config;
pub mod data;
pub mod features;
pub mod lineup;
pub mod pipeline;

pub use config::{Config, EventFilter, RankingFilter};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use thiserror::Error;

/// Unique identifier for an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventId(pub u32);

/// Unique identifier for a team
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TeamId(pub u32);

/// Unique identifier for a player
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub u32);

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of entity a page or feature row belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Event,
    Team,
    Player,
}

impl EntityKind {
    /// Directory name used under an event directory
    pub fn dir_name(&self) -> &'static str {
        match self {
            EntityKind::Event => "events",
            EntityKind::Team => "teams",
            EntityKind::Player => "players",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Event => write!(f, "event"),
            EntityKind::Team => write!(f, "team"),
            EntityKind::Player => write!(f, "player"),
        }
    }
}

/// A player. Equality is by key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub key: PlayerId,
    pub name: String,
}

impl Player {
    pub fn new(key: u32, name: &str) -> Self {
        Player {
            key: PlayerId(key),
            name: name.trim().to_lowercase(),
        }
    }
}

impl PartialEq for Player {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for Player {}

impl Hash for Player {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.key)
    }
}

/// One identified roster period of a team
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lineup {
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// True when the period is still running ("today")
    pub is_active: bool,
    pub players: Vec<Player>,
    pub maps_played: Option<u32>,
    pub wins: Option<u32>,
    pub draws: Option<u32>,
    pub losses: Option<u32>,
    pub lan_top3_placings: Option<u32>,
}

/// A team. Equality is by key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    pub key: TeamId,
    pub name: String,
    /// Current (active) roster, empty until the roster is resolved
    pub players: Vec<Player>,
    pub lineups: Vec<Lineup>,
}

impl Team {
    pub fn new(key: u32, name: &str) -> Self {
        Team {
            key: TeamId(key),
            name: name.trim().to_string(),
            players: Vec::new(),
            lineups: Vec::new(),
        }
    }

    /// Install a lineup history; the active lineup becomes the current roster
    pub fn set_lineups(&mut self, lineups: Vec<Lineup>) {
        if let Some(active) = lineups.iter().rev().find(|l| l.is_active) {
            self.players = active.players.clone();
        }
        self.lineups = lineups;
    }

    pub fn has_player(&self, player: PlayerId) -> bool {
        self.players.iter().any(|p| p.key == player)
    }
}

impl PartialEq for Team {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for Team {}

impl Hash for Team {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.key)
    }
}

/// An event: the discovery root for teams and players
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub key: EventId,
    pub name: String,
    /// Average world rank of the attending teams
    pub rank: Option<f64>,
    pub is_lan: bool,
    pub is_qual: bool,
    pub prize_pool: f64,
    pub starts_at: Option<NaiveDate>,
    pub ends_at: Option<NaiveDate>,
    /// Days between start and end
    pub duration: Option<i64>,
    pub teams: Vec<Team>,
}

impl Event {
    /// The event's own date window with no filters, used for labels
    pub fn target_config(&self) -> Result<Config> {
        match (self.starts_at, self.ends_at) {
            (Some(start), Some(end)) => Config::event_window(start, end),
            _ => Err(FantasyError::InvalidEntity {
                kind: EntityKind::Event,
                key: self.key.0,
                reason: "event dates are not announced".to_string(),
            }),
        }
    }

    pub fn team(&self, key: TeamId) -> Option<&Team> {
        self.teams.iter().find(|t| t.key == key)
    }

    /// Team that lists the player in its active roster
    pub fn team_of(&self, player: PlayerId) -> Option<&Team> {
        self.teams.iter().find(|t| t.has_player(player))
    }

    pub fn players(&self) -> impl Iterator<Item = (&Team, &Player)> {
        self.teams
            .iter()
            .flat_map(|t| t.players.iter().map(move |p| (t, p)))
    }
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for Event {}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.key)
    }
}

/// A match: consecutive maps against one opponent on one date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub opponent: Option<String>,
    pub date: Option<NaiveDate>,
    pub event: Option<String>,
    pub maps_played: u32,
    pub maps_won: u32,
    pub maps_lost: u32,
    /// Per-map results in page order, e.g. "wlw"
    pub map_results: String,
    pub rounds_played: u32,
    pub rounds_won: u32,
    pub rounds_lost: u32,
    pub is_winner: bool,
}

impl MatchRecord {
    /// Rounds won per round lost, guarded against a clean sweep
    pub fn intensity(&self) -> f64 {
        self.rounds_won as f64 / self.rounds_lost.max(1) as f64
    }
}

/// Application-wide errors
#[derive(Debug, Error)]
pub enum FantasyError {
    #[error("Fetch failed for {url}: {message}")]
    Fetch { url: String, message: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid {kind} {key}: {reason}")]
    InvalidEntity {
        kind: EntityKind,
        key: u32,
        reason: String,
    },

    #[error("No data found: {0}")]
    NoData(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Selector error: {0}")]
    Selector(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Build cancelled")]
    Cancelled,
}

impl FantasyError {
    /// Errors that mean "data unavailable for this (entity, Config)".
    /// The assembler skips these and keeps going.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            FantasyError::Fetch { .. } | FantasyError::Http(_) | FantasyError::NoData(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, FantasyError>;

/// Current calendar date used to resolve "today" in page text
pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Application settings loaded from fantasy.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub fetch: FetchSettings,
    pub data: DataSettings,
    pub build: BuildSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchSettings {
    pub base_url: String,
    pub user_agent: String,
    /// Minimum gap between two network requests
    pub min_interval_ms: u64,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSettings {
    pub events_dir: String,
    pub rankings_dir: String,
    pub database_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildSettings {
    pub windows: Vec<WindowSettings>,
}

/// A statistics window expressed relative to an event's start date
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowSettings {
    pub lookback_weeks: u32,
    pub event_filter: EventFilter,
    pub ranking_filter: RankingFilter,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            fetch: FetchSettings {
                base_url: "https://www.hltv.org".to_string(),
                user_agent: "Mozilla/5.0 (X11; Linux x86_64) fantasy-harvester/0.1".to_string(),
                min_interval_ms: 2000,
                timeout_secs: 30,
            },
            data: DataSettings {
                events_dir: "data/events".to_string(),
                rankings_dir: "data/rankings".to_string(),
                database_path: "data/fantasy.db".to_string(),
            },
            build: BuildSettings {
                windows: vec![
                    WindowSettings {
                        lookback_weeks: 12,
                        event_filter: EventFilter::All,
                        ranking_filter: RankingFilter::All,
                    },
                    WindowSettings {
                        lookback_weeks: 12,
                        event_filter: EventFilter::BigEvents,
                        ranking_filter: RankingFilter::Top30,
                    },
                    WindowSettings {
                        lookback_weeks: 26,
                        event_filter: EventFilter::Lan,
                        ranking_filter: RankingFilter::All,
                    },
                ],
            },
        }
    }
}

impl Settings {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            FantasyError::Settings(format!("Failed to read settings file {}: {}", path, e))
        })?;
        toml::from_str(&content)
            .map_err(|e| FantasyError::Settings(format!("Failed to parse settings: {}", e)))
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| FantasyError::Settings(format!("Failed to serialize settings: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lineup(active: bool, players: &[(u32, &str)]) -> Lineup {
        Lineup {
            start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            is_active: active,
            players: players.iter().map(|(k, n)| Player::new(*k, n)).collect(),
            maps_played: None,
            wins: None,
            draws: None,
            losses: None,
            lan_top3_placings: None,
        }
    }

    #[test]
    fn test_entity_equality_is_by_key() {
        assert_eq!(Player::new(7, "s1mple"), Player::new(7, "renamed"));
        assert_ne!(Team::new(1, "Vitality"), Team::new(2, "Vitality"));
    }

    #[test]
    fn test_active_lineup_becomes_roster() {
        let mut team = Team::new(4608, "Natus Vincere");
        team.set_lineups(vec![
            lineup(false, &[(1, "old")]),
            lineup(true, &[(2, "a"), (3, "b")]),
        ]);
        assert_eq!(team.players.len(), 2);
        assert!(team.has_player(PlayerId(3)));
        assert!(!team.has_player(PlayerId(1)));
    }

    #[test]
    fn test_intensity_guards_zero_losses() {
        let m = MatchRecord {
            opponent: None,
            date: None,
            event: None,
            maps_played: 1,
            maps_won: 1,
            maps_lost: 0,
            map_results: "w".to_string(),
            rounds_played: 16,
            rounds_won: 16,
            rounds_lost: 0,
            is_winner: true,
        };
        assert_eq!(m.intensity(), 16.0);
    }

    #[test]
    fn test_recoverable_errors() {
        assert!(FantasyError::NoData("x".into()).is_recoverable());
        assert!(FantasyError::Fetch {
            url: "u".into(),
            message: "m".into()
        }
        .is_recoverable());
        assert!(!FantasyError::InvalidArguments("x".into()).is_recoverable());
        assert!(!FantasyError::InvalidEntity {
            kind: EntityKind::Event,
            key: 1,
            reason: "r".into()
        }
        .is_recoverable());
    }

    #[test]
    fn test_settings_round_trip_through_toml() {
        let settings = Settings::default();
        let text = toml::to_string_pretty(&settings).unwrap();
        let parsed: Settings = toml::from_str(&text).unwrap();
        assert_eq!(parsed.fetch.min_interval_ms, 2000);
        assert_eq!(parsed.build.windows.len(), 3);
        assert_eq!(parsed.build.windows[1].event_filter, EventFilter::BigEvents);
    }
}
