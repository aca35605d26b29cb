//! Entity pipelines
//!
//! Each entity kind is one concrete type implementing the capability
//! traits below. A pipeline walks a linear state machine:
//!
//! ```text
//! Uninitialized → MainPageFetched → RosterResolved (teams) → StatsFetched(cfg)*
//!               → FeatureComputed(cfg)* → TargetComputed
//! ```
//!
//! The per-Config stages are independent: a Config that yields no data
//! leaves the entity and its other Configs untouched.

pub mod event;
pub mod player;
pub mod team;

pub use event::EventPipeline;
pub use player::PlayerPipeline;
pub use team::TeamPipeline;

use crate::data::cache::{FeatureStore, Layout, PageCache, PageDescriptor};
use crate::data::fetch::Fetcher;
use crate::data::links::Links;
use crate::features::target::{ExpectedPoints, ScoringPolicy};
use crate::features::FeatureRow;
use crate::{Config, EntityKind, Event, Result, Settings};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Process-scoped services shared by every pipeline of a run
pub struct Session {
    pub fetcher: Fetcher,
    pub cache: PageCache,
    pub store: FeatureStore,
    pub links: Links,
    /// Date that "today" in page text resolves to
    pub today: NaiveDate,
    pub policy: Box<dyn ScoringPolicy>,
}

impl Session {
    pub fn new(fetcher: Fetcher, layout: Layout, links: Links, today: NaiveDate) -> Self {
        Session {
            fetcher,
            cache: PageCache::new(layout.clone()),
            store: FeatureStore::new(layout),
            links,
            today,
            policy: Box::new(ExpectedPoints::default()),
        }
    }

    /// HTTP session over the configured directories
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Ok(Self::new(
            Fetcher::from_settings(&settings.fetch)?,
            Layout::new(&settings.data.events_dir, &settings.data.rankings_dir),
            Links::new(&settings.fetch.base_url),
            crate::today(),
        ))
    }

    pub fn with_policy(mut self, policy: Box<dyn ScoringPolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Cache-first page retrieval
    pub fn page(&mut self, descriptor: &PageDescriptor, url: &str) -> Result<String> {
        self.cache.get(&mut self.fetcher, descriptor, url)
    }
}

/// Entity-level stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Uninitialized,
    MainPageFetched,
    RosterResolved,
    TargetComputed,
}

/// Stage of one (entity, Config) unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigStage {
    StatsFetched,
    FeatureComputed,
    /// The Config yielded no usable data
    Unavailable,
}

/// Where a feature row or label came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Computed,
    /// Already persisted by an earlier run
    Stored,
}

/// Pipeline progress
#[derive(Debug, Clone)]
pub struct Progress {
    pub stage: Stage,
    pub configs: BTreeMap<Config, ConfigStage>,
}

impl Progress {
    pub fn new(stage: Stage) -> Self {
        Progress {
            stage,
            configs: BTreeMap::new(),
        }
    }

    pub fn config_stage(&self, config: &Config) -> Option<ConfigStage> {
        self.configs.get(config).copied()
    }

    fn advance(&mut self, stage: Stage) {
        if stage > self.stage {
            self.stage = stage;
        }
    }
}

/// Retrieval of an entity's pages
pub trait Fetchable {
    /// Page types the entity exposes
    type Page: Copy;

    /// Fetch one page for a Config, served from the page cache when present
    fn fetch(&self, session: &mut Session, page: Self::Page, config: &Config) -> Result<String>;
}

/// Extraction and preprocessing of an entity's pages
pub trait Extractable: Fetchable {
    /// Typed bundle of everything known under one Config
    type Stats;

    /// Fetch, extract and preprocess every page of a Config
    fn collect_stats(&self, session: &mut Session, config: &Config) -> Result<Self::Stats>;
}

/// Feature rows and labels, persisted as they are computed
pub trait Featurizable: Extractable {
    fn kind(&self) -> EntityKind;

    fn key(&self) -> u32;

    fn progress(&mut self) -> &mut Progress;

    fn features_of(stats: &Self::Stats) -> FeatureRow;

    /// Label over the event's own window
    fn label(&self, session: &mut Session, event: &Event) -> Result<f64>;

    /// Feature row for one Config. A stored row is reused; a fresh row is
    /// stored before returning.
    fn compute_features(&mut self, session: &mut Session, event: &Event, config: &Config) -> Result<Origin> {
        let (kind, key) = (self.kind(), self.key());
        if session.store.has_features(event.key, kind, key, config) {
            log::debug!("Features of {} {} for {} already stored", kind, key, config);
            self.progress().configs.insert(*config, ConfigStage::FeatureComputed);
            return Ok(Origin::Stored);
        }

        let stats = match self.collect_stats(session, config) {
            Ok(stats) => stats,
            Err(e) => {
                if e.is_recoverable() {
                    self.progress().configs.insert(*config, ConfigStage::Unavailable);
                }
                return Err(e);
            }
        };
        self.progress().configs.insert(*config, ConfigStage::StatsFetched);

        let row = Self::features_of(&stats);
        session.store.save_features(event.key, kind, key, config, &row)?;
        self.progress().configs.insert(*config, ConfigStage::FeatureComputed);
        Ok(Origin::Computed)
    }

    /// Label for the event, computed once and stored
    fn compute_target(&mut self, session: &mut Session, event: &Event) -> Result<(f64, Origin)> {
        let (kind, key) = (self.kind(), self.key());
        if let Some(label) = session.store.load_target(event.key, kind, key)? {
            self.progress().advance(Stage::TargetComputed);
            return Ok((label.target, Origin::Stored));
        }
        let target = self.label(session, event)?;
        session.store.save_target(event.key, kind, key, target)?;
        self.progress().advance(Stage::TargetComputed);
        Ok((target, Origin::Computed))
    }
}
