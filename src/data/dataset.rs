//! Dataset assembly
//!
//! Drives the entity pipelines over a list of events. Every feature row and
//! label is persisted as soon as it is computed, so a rerun only does the
//! work that is still missing.

use crate::data::database::Database;
use crate::data::loader::{load_dataset, Corpus};
use crate::pipeline::{EventPipeline, Featurizable, Origin, PlayerPipeline, Session, TeamPipeline};
use crate::{Config, EntityKind, Event, EventId, FantasyError, Result, Settings, TeamId, WindowSettings};
use chrono::{Duration, NaiveDate};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Ledger config column for skipped roster lookups
const ROSTER: &str = "roster";

/// Running totals of (entity, Config) pairs for one build
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildAudit {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Succeeded pairs that were already stored
    pub cached: usize,
}

impl BuildAudit {
    fn record(&mut self, outcome: &Result<Origin>) {
        self.attempted += 1;
        match outcome {
            Ok(Origin::Stored) => {
                self.succeeded += 1;
                self.cached += 1;
            }
            Ok(Origin::Computed) => self.succeeded += 1,
            Err(_) => self.failed += 1,
        }
    }

    pub fn merge(&mut self, other: &BuildAudit) {
        self.attempted += other.attempted;
        self.succeeded += other.succeeded;
        self.failed += other.failed;
        self.cached += other.cached;
    }
}

impl fmt::Display for BuildAudit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} attempted, {} succeeded, {} failed, {} cached",
            self.attempted, self.succeeded, self.failed, self.cached
        )
    }
}

/// Which Configs to build for an event
#[derive(Debug, Clone)]
pub enum ConfigPlan {
    /// The same Configs for every event
    Explicit(Vec<Config>),
    /// Windows ending the day before each event starts, or today for
    /// events that have not started yet
    BeforeEvent(Vec<WindowSettings>),
}

impl ConfigPlan {
    pub fn from_settings(settings: &Settings) -> Self {
        ConfigPlan::BeforeEvent(settings.build.windows.clone())
    }

    pub fn resolve(&self, event: &Event, today: NaiveDate) -> Result<Vec<Config>> {
        match self {
            ConfigPlan::Explicit(configs) => Ok(configs.clone()),
            ConfigPlan::BeforeEvent(windows) => {
                let start = event.starts_at.ok_or_else(|| FantasyError::InvalidEntity {
                    kind: EntityKind::Event,
                    key: event.key.0,
                    reason: "start date is not announced".to_string(),
                })?;
                let anchor = start.min(today + Duration::days(1));
                if anchor < start {
                    log::info!("Event {} starts {}, windows end today", event.key, start);
                }
                Ok(windows.iter().map(|w| Config::before_event(anchor, w)).collect())
            }
        }
    }
}

/// Builds event corpora through a shared session
pub struct DatasetAssembler {
    session: Session,
    ledger: Option<Database>,
    cancel: Arc<AtomicBool>,
}

impl DatasetAssembler {
    pub fn new(session: Session) -> Self {
        DatasetAssembler {
            session,
            ledger: None,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Record every event build in a ledger
    pub fn with_ledger(mut self, ledger: Database) -> Self {
        self.ledger = Some(ledger);
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Flag that stops scheduling new work once set
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancel.load(Ordering::SeqCst) {
            Err(FantasyError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Build every event, then load the corpus of the events that were
    /// built. A rejected event is logged and left out; the build only fails
    /// when cancelled or when no event could be built at all.
    pub fn build(&mut self, events: &[EventId], plan: &ConfigPlan) -> Result<Corpus> {
        let mut total = BuildAudit::default();
        let mut built = Vec::with_capacity(events.len());
        let mut first_error = None;
        for &event in events {
            match self.build_event(event, plan) {
                Ok(audit) => {
                    total.merge(&audit);
                    built.push(event);
                }
                Err(FantasyError::Cancelled) => return Err(FantasyError::Cancelled),
                Err(e) => {
                    log::error!("Event {} rejected: {}", event, e);
                    first_error.get_or_insert(e);
                }
            }
        }
        log::info!("Built {} of {} events: {}", built.len(), events.len(), total);

        if built.is_empty() {
            if let Some(e) = first_error {
                return Err(e);
            }
        }
        let layout = self.session.cache.layout();
        let dirs: Vec<_> = built.iter().map(|e| layout.event_dir(*e)).collect();
        load_dataset(&dirs)
    }

    /// Resolve an event's rosters, then compute every (entity, Config)
    /// feature row and every entity label.
    ///
    /// A malformed event page or an invalid Config aborts the event.
    /// Unavailable data for one team roster or one (entity, Config) is
    /// logged and skipped.
    pub fn build_event(&mut self, key: EventId, plan: &ConfigPlan) -> Result<BuildAudit> {
        self.check_cancelled()?;

        let mut pipeline = EventPipeline::new(key);
        let event = pipeline.resolve_rosters(&mut self.session)?.clone();
        let configs = plan.resolve(&event, self.session.today)?;
        for config in &configs {
            config.validate(self.session.today)?;
        }

        let build_id = match &self.ledger {
            Some(ledger) => Some(ledger.start_build(key)?),
            None => None,
        };
        if let (Some(ledger), Some(id)) = (&self.ledger, build_id) {
            for (team, reason) in pipeline.unresolved() {
                ledger.record_skip(id, EntityKind::Team, team.0, ROSTER, reason)?;
            }
        }

        let mut audit = BuildAudit::default();
        let outcome = self.featurize_event(&event, pipeline.unresolved(), &configs, build_id, &mut audit);

        if let (Some(ledger), Some(id)) = (&self.ledger, build_id) {
            let status = match &outcome {
                Ok(()) => "completed",
                Err(FantasyError::Cancelled) => "cancelled",
                Err(_) => "failed",
            };
            ledger.finish_build(id, &audit, status)?;
        }
        log::info!("Event {}: {}", event, audit);

        outcome.map(|()| audit)
    }

    fn featurize_event(
        &mut self,
        event: &Event,
        unresolved: &[(TeamId, String)],
        configs: &[Config],
        build_id: Option<i64>,
        audit: &mut BuildAudit,
    ) -> Result<()> {
        let mut teams: Vec<TeamPipeline> = event
            .teams
            .iter()
            .filter(|t| unresolved.iter().all(|(key, _)| *key != t.key))
            .map(|t| TeamPipeline::new(event.key, t.clone()))
            .collect();
        let mut players: Vec<PlayerPipeline> = event
            .players()
            .map(|(t, p)| PlayerPipeline::new(event.key, t.key, p.clone()))
            .collect();

        for config in configs {
            for team in teams.iter_mut() {
                self.check_cancelled()?;
                self.featurize(team, event, config, build_id, audit)?;
            }
            for player in players.iter_mut() {
                self.check_cancelled()?;
                self.featurize(player, event, config, build_id, audit)?;
            }
        }

        if let Err(e) = event.target_config() {
            log::warn!("Event {}: labels skipped: {}", event.key, e);
            return Ok(());
        }
        for team in teams.iter_mut() {
            self.check_cancelled()?;
            self.label(team, event)?;
        }
        for player in players.iter_mut() {
            self.check_cancelled()?;
            self.label(player, event)?;
        }
        Ok(())
    }

    fn featurize<P: Featurizable>(
        &mut self,
        pipeline: &mut P,
        event: &Event,
        config: &Config,
        build_id: Option<i64>,
        audit: &mut BuildAudit,
    ) -> Result<()> {
        let outcome = pipeline.compute_features(&mut self.session, event, config);
        audit.record(&outcome);
        match outcome {
            Ok(_) => Ok(()),
            Err(e) if e.is_recoverable() => {
                log::warn!(
                    "Skipping event {} {} {} config {}: {}",
                    event.key,
                    pipeline.kind(),
                    pipeline.key(),
                    config.stem(),
                    e
                );
                if let (Some(ledger), Some(id)) = (&self.ledger, build_id) {
                    ledger.record_skip(id, pipeline.kind(), pipeline.key(), &config.stem(), &e.to_string())?;
                }
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn label<P: Featurizable>(&mut self, pipeline: &mut P, event: &Event) -> Result<()> {
        match pipeline.compute_target(&mut self.session, event) {
            Ok((target, _)) => {
                log::debug!("Label of {} {}: {:.3}", pipeline.kind(), pipeline.key(), target);
                Ok(())
            }
            Err(e) if e.is_recoverable() => {
                log::warn!(
                    "No label for event {} {} {}: {}",
                    event.key,
                    pipeline.kind(),
                    pipeline.key(),
                    e
                );
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}
