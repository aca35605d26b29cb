//! Team pipeline

use super::{Extractable, Featurizable, Fetchable, Progress, Session, Stage};
use crate::data::cache::PageDescriptor;
use crate::data::links::TeamPage;
use crate::data::scrapers::ranking::{extract_ranking, find_team};
use crate::data::scrapers::team::{extract_events, extract_lineups, extract_matches, extract_overview};
use crate::features::preprocess::{
    preprocess_events, preprocess_lineups, regroup_matches, MapRecord, RankingRecord, TeamOverview,
};
use crate::features::target::team_target;
use crate::features::{FeatureRow, TeamStats};
use crate::{Config, EntityKind, Event, EventId, MatchRecord, Result, Team};

/// Stats pages fetched for every Config
const STATS_PAGES: [TeamPage; 3] = [TeamPage::Overview, TeamPage::Matches, TeamPage::Events];

pub struct TeamPipeline {
    event: EventId,
    team: Team,
    progress: Progress,
}

impl TeamPipeline {
    /// Pipeline for a team discovered on an event page
    pub fn new(event: EventId, team: Team) -> Self {
        let stage = if team.players.is_empty() {
            Stage::Uninitialized
        } else {
            Stage::RosterResolved
        };
        TeamPipeline {
            event,
            team,
            progress: Progress::new(stage),
        }
    }

    pub fn team(&self) -> &Team {
        &self.team
    }

    pub fn into_team(self) -> Team {
        self.team
    }

    pub fn stage(&self) -> Stage {
        self.progress.stage
    }

    /// Fetch the lineups page and install the lineup history. The active
    /// lineup becomes the current roster.
    pub fn resolve_roster(&mut self, session: &mut Session) -> Result<()> {
        let url = session.links.team_lineups(&self.team, self.event);
        let descriptor = PageDescriptor::TeamLineups {
            event: self.event,
            team: self.team.key,
        };
        let html = session.page(&descriptor, &url)?;
        self.progress.stage = Stage::MainPageFetched;

        let blocks = extract_lineups(&html, self.team.key)?;
        let lineups = preprocess_lineups(&blocks, session.today);
        self.team.set_lineups(lineups);
        if self.team.players.is_empty() {
            log::warn!("Team {}: no active lineup found", self.team);
        } else {
            log::debug!("Team {}: {} active players", self.team, self.team.players.len());
        }
        self.progress.stage = Stage::RosterResolved;
        Ok(())
    }

    /// Regrouped matches played at the event itself
    fn event_matches(&self, session: &mut Session, event: &Event) -> Result<Vec<MatchRecord>> {
        let config = event.target_config()?;
        let url = session
            .links
            .team_stats(&self.team, TeamPage::Matches, &config, Some(event.key));
        let descriptor = PageDescriptor::TeamEventMatches {
            event: self.event,
            team: self.team.key,
        };
        let html = session.page(&descriptor, &url)?;
        let maps: Vec<MapRecord> = extract_matches(&html)?.iter().map(MapRecord::from_raw).collect();
        regroup_matches(&maps)
    }

    /// World-ranking standing at the end of the window. The ranking page is
    /// auxiliary: when it is unavailable the standing is missing.
    fn ranking(&self, session: &mut Session, config: &Config) -> RankingRecord {
        let date = config.end_time;
        let url = session.links.ranking(date);
        let rows = session
            .page(&PageDescriptor::Ranking { date }, &url)
            .and_then(|html| extract_ranking(&html));
        match rows {
            Ok(rows) => RankingRecord::from_raw(find_team(&rows, &self.team.name)),
            Err(e) => {
                log::warn!("Ranking for {} unavailable: {}", date, e);
                RankingRecord::default()
            }
        }
    }
}

impl Fetchable for TeamPipeline {
    type Page = TeamPage;

    fn fetch(&self, session: &mut Session, page: TeamPage, config: &Config) -> Result<String> {
        let url = session.links.team_stats(&self.team, page, config, None);
        let descriptor = PageDescriptor::Team {
            event: self.event,
            team: self.team.key,
            page,
            config: *config,
        };
        session.page(&descriptor, &url)
    }
}

impl Extractable for TeamPipeline {
    type Stats = TeamStats;

    fn collect_stats(&self, session: &mut Session, config: &Config) -> Result<TeamStats> {
        let mut pages = Vec::with_capacity(STATS_PAGES.len());
        for page in STATS_PAGES {
            pages.push(self.fetch(session, page, config)?);
        }
        let overview = TeamOverview::from_raw(&extract_overview(&pages[0])?);
        let maps: Vec<MapRecord> = extract_matches(&pages[1])?.iter().map(MapRecord::from_raw).collect();
        let matches = regroup_matches(&maps)?;
        let events = preprocess_events(&extract_events(&pages[2])?);

        Ok(TeamStats {
            ranking: self.ranking(session, config),
            overview,
            matches,
            events,
            lineups: self.team.lineups.clone(),
        })
    }
}

impl Featurizable for TeamPipeline {
    fn kind(&self) -> EntityKind {
        EntityKind::Team
    }

    fn key(&self) -> u32 {
        self.team.key.0
    }

    fn progress(&mut self) -> &mut Progress {
        &mut self.progress
    }

    fn features_of(stats: &TeamStats) -> FeatureRow {
        stats.features()
    }

    /// Win-rate over the team's matches at the event
    fn label(&self, session: &mut Session, event: &Event) -> Result<f64> {
        team_target(&self.event_matches(session, event)?)
    }
}
