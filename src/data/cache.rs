//! Content-addressed page cache and feature store
//!
//! Every page is stored under a path that is a pure function of what was
//! asked for (entity, page type, Config), so an interrupted build resumes
//! by simply asking again.

use crate::data::fetch::Fetcher;
use crate::data::links::{PlayerPage, TeamPage};
use crate::features::FeatureRow;
use crate::{Config, EntityKind, Event, EventId, PlayerId, Result, TeamId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::path::{Path, PathBuf};

const EVENT_PAGE: &str = "overview.html";
const EVENT_FILE: &str = "event.json";
const TARGET_FILE: &str = "target.json";
const LINEUPS_PAGE: &str = "lineups.html";
const EVENT_MATCHES_PAGE: &str = "event_matches.html";

/// On-disk layout of events and shared ranking pages
#[derive(Debug, Clone)]
pub struct Layout {
    events_dir: PathBuf,
    rankings_dir: PathBuf,
}

impl Layout {
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(events_dir: P, rankings_dir: Q) -> Self {
        Layout {
            events_dir: events_dir.as_ref().to_path_buf(),
            rankings_dir: rankings_dir.as_ref().to_path_buf(),
        }
    }

    pub fn events_dir(&self) -> &Path {
        &self.events_dir
    }

    pub fn event_dir(&self, event: EventId) -> PathBuf {
        self.events_dir.join(event.to_string())
    }

    /// `{events_dir}/{event}/{teams|players}/{key}`
    pub fn entity_dir(&self, event: EventId, kind: EntityKind, key: u32) -> PathBuf {
        self.event_dir(event).join(kind.dir_name()).join(key.to_string())
    }

    pub fn ranking_page(&self, date: NaiveDate) -> PathBuf {
        self.rankings_dir
            .join(format!("ranking_{}.html", date.format("%Y-%m-%d")))
    }
}

/// What a cached page is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageDescriptor {
    Event {
        event: EventId,
    },
    TeamLineups {
        event: EventId,
        team: TeamId,
    },
    Team {
        event: EventId,
        team: TeamId,
        page: TeamPage,
        config: Config,
    },
    Player {
        event: EventId,
        player: PlayerId,
        page: PlayerPage,
        config: Config,
    },
    /// Matches played at the event itself, independent of any stats Config
    TeamEventMatches {
        event: EventId,
        team: TeamId,
    },
    PlayerEventMatches {
        event: EventId,
        player: PlayerId,
    },
    Ranking {
        date: NaiveDate,
    },
}

impl PageDescriptor {
    pub fn path(&self, layout: &Layout) -> PathBuf {
        match self {
            PageDescriptor::Event { event } => layout.event_dir(*event).join(EVENT_PAGE),
            PageDescriptor::TeamLineups { event, team } => layout
                .entity_dir(*event, EntityKind::Team, team.0)
                .join(LINEUPS_PAGE),
            PageDescriptor::Team {
                event,
                team,
                page,
                config,
            } => layout
                .entity_dir(*event, EntityKind::Team, team.0)
                .join(config.page_file_name(page.name())),
            PageDescriptor::Player {
                event,
                player,
                page,
                config,
            } => layout
                .entity_dir(*event, EntityKind::Player, player.0)
                .join(config.page_file_name(page.name())),
            PageDescriptor::TeamEventMatches { event, team } => layout
                .entity_dir(*event, EntityKind::Team, team.0)
                .join(EVENT_MATCHES_PAGE),
            PageDescriptor::PlayerEventMatches { event, player } => layout
                .entity_dir(*event, EntityKind::Player, player.0)
                .join(EVENT_MATCHES_PAGE),
            PageDescriptor::Ranking { date } => layout.ranking_page(*date),
        }
    }
}

/// Fetch-or-serve page cache
pub struct PageCache {
    layout: Layout,
    hits: Cell<usize>,
}

impl PageCache {
    pub fn new(layout: Layout) -> Self {
        PageCache {
            layout,
            hits: Cell::new(0),
        }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Serve the page from disk, or fetch it once and store it.
    /// Failed fetches are not stored.
    pub fn get(
        &self,
        fetcher: &mut Fetcher,
        descriptor: &PageDescriptor,
        url: &str,
    ) -> Result<String> {
        let path = descriptor.path(&self.layout);
        if let Some(html) = self.load_from_cache(&path) {
            self.hits.set(self.hits.get() + 1);
            return Ok(html);
        }

        let html = fetcher.fetch(url)?;

        if let Err(e) = self.save_to_cache(&path, &html) {
            log::warn!("Failed to cache {}: {}", url, e);
        }

        Ok(html)
    }

    /// Whether a page is already on disk
    pub fn contains(&self, descriptor: &PageDescriptor) -> bool {
        descriptor.path(&self.layout).exists()
    }

    /// Pages served from disk so far
    pub fn hits(&self) -> usize {
        self.hits.get()
    }

    fn load_from_cache(&self, path: &Path) -> Option<String> {
        if path.exists() {
            log::debug!("Loading from cache: {}", path.display());
            std::fs::read_to_string(path).ok()
        } else {
            None
        }
    }

    fn save_to_cache(&self, path: &Path, html: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, html)?;
        log::debug!("Saved to cache: {}", path.display());
        Ok(())
    }
}

/// Persisted label for one entity at one event
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub target: f64,
}

/// JSON store for feature rows, labels and event metadata
pub struct FeatureStore {
    layout: Layout,
}

impl FeatureStore {
    pub fn new(layout: Layout) -> Self {
        FeatureStore { layout }
    }

    fn features_path(&self, event: EventId, kind: EntityKind, key: u32, config: &Config) -> PathBuf {
        self.layout
            .entity_dir(event, kind, key)
            .join(config.features_file_name())
    }

    pub fn has_features(&self, event: EventId, kind: EntityKind, key: u32, config: &Config) -> bool {
        self.features_path(event, kind, key, config).exists()
    }

    pub fn load_features(
        &self,
        event: EventId,
        kind: EntityKind,
        key: u32,
        config: &Config,
    ) -> Result<Option<FeatureRow>> {
        read_json(&self.features_path(event, kind, key, config))
    }

    pub fn save_features(
        &self,
        event: EventId,
        kind: EntityKind,
        key: u32,
        config: &Config,
        row: &FeatureRow,
    ) -> Result<()> {
        write_json(&self.features_path(event, kind, key, config), row)
    }

    pub fn load_target(&self, event: EventId, kind: EntityKind, key: u32) -> Result<Option<Label>> {
        read_json(&self.layout.entity_dir(event, kind, key).join(TARGET_FILE))
    }

    pub fn save_target(&self, event: EventId, kind: EntityKind, key: u32, target: f64) -> Result<()> {
        write_json(
            &self.layout.entity_dir(event, kind, key).join(TARGET_FILE),
            &Label { target },
        )
    }

    pub fn load_event(&self, event: EventId) -> Result<Option<Event>> {
        read_json(&self.layout.event_dir(event).join(EVENT_FILE))
    }

    pub fn save_event(&self, event: &Event) -> Result<()> {
        write_json(&self.layout.event_dir(event.key).join(EVENT_FILE), event)
    }
}

/// Read a JSON file, `None` when it does not exist
pub fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)?;
    Ok(Some(serde_json::from_str(&content)?))
}

pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}
