//! Player pipeline

use super::{Extractable, Featurizable, Fetchable, Progress, Session, Stage};
use crate::data::cache::PageDescriptor;
use crate::data::links::PlayerPage;
use crate::data::scrapers::player::{extract_clutches, extract_individual, extract_matches, extract_overview};
use crate::features::preprocess::{
    regroup_player_matches, ClutchRecord, PlayerIndividual, PlayerOverview,
};
use crate::features::{FeatureRow, PlayerStats};
use crate::{Config, EntityKind, Event, EventId, Player, Result, TeamId};

pub struct PlayerPipeline {
    event: EventId,
    player: Player,
    team: TeamId,
    progress: Progress,
}

impl PlayerPipeline {
    /// Players are only discovered through a resolved roster, so a new
    /// pipeline starts past its main page.
    pub fn new(event: EventId, team: TeamId, player: Player) -> Self {
        PlayerPipeline {
            event,
            player,
            team,
            progress: Progress::new(Stage::MainPageFetched),
        }
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn team(&self) -> TeamId {
        self.team
    }

    pub fn stage(&self) -> Stage {
        self.progress.stage
    }

    fn descriptor(&self, page: PlayerPage, config: Config) -> PageDescriptor {
        PageDescriptor::Player {
            event: self.event,
            player: self.player.key,
            page,
            config,
        }
    }
}

impl Fetchable for PlayerPipeline {
    type Page = PlayerPage;

    fn fetch(&self, session: &mut Session, page: PlayerPage, config: &Config) -> Result<String> {
        let url = session.links.player_stats(&self.player, page, config, None);
        session.page(&self.descriptor(page, *config), &url)
    }
}

impl Extractable for PlayerPipeline {
    type Stats = PlayerStats;

    /// Pages are fetched and checked one at a time so that a Config with
    /// no activity stops after the overview.
    fn collect_stats(&self, session: &mut Session, config: &Config) -> Result<PlayerStats> {
        let html = self.fetch(session, PlayerPage::Overview, config)?;
        let overview = PlayerOverview::from_raw(&extract_overview(&html)?)?;

        let html = self.fetch(session, PlayerPage::Individual, config)?;
        let individual = PlayerIndividual::from_raw(&extract_individual(&html)?)?;

        let html = self.fetch(session, PlayerPage::Clutches, config)?;
        let clutches = ClutchRecord::from_raw(&extract_clutches(&html)?)?;

        Ok(PlayerStats {
            overview,
            individual,
            clutches,
        })
    }
}

impl Featurizable for PlayerPipeline {
    fn kind(&self) -> EntityKind {
        EntityKind::Player
    }

    fn key(&self) -> u32 {
        self.player.key.0
    }

    fn progress(&mut self) -> &mut Progress {
        &mut self.progress
    }

    fn features_of(stats: &PlayerStats) -> FeatureRow {
        stats.features()
    }

    /// Expected points over the player's matches at the event
    fn label(&self, session: &mut Session, event: &Event) -> Result<f64> {
        let config = event.target_config()?;
        let url = session
            .links
            .player_stats(&self.player, PlayerPage::Matches, &config, Some(event.key));
        let descriptor = PageDescriptor::PlayerEventMatches {
            event: self.event,
            player: self.player.key,
        };
        let html = session.page(&descriptor, &url)?;
        let matches = regroup_player_matches(&extract_matches(&html)?)?;
        session.policy.expected_points(&matches)
    }
}
