//! Team statistics computation
//!
//! Aggregates a team's regrouped match history and the other preprocessed
//! pages of one Config into a flat feature row.

use crate::features::preprocess::{EventPlacement, RankingRecord, TeamOverview};
use crate::features::FeatureRow;
use crate::{Lineup, MatchRecord};

/// Match-history statistics for a team.
/// Matches are fed newest first so the streak counts back from the latest.
#[derive(Debug, Clone, Default)]
pub struct TeamStatistics {
    /// Total matches played
    pub matches_played: usize,
    /// Matches won
    pub wins: usize,
    /// Matches not won
    pub losses: usize,
    /// Consecutive most recent wins
    pub winstreak: usize,
    streak_broken: bool,
    intensity_sum: f64,
    win_intensity_sum: f64,
    loss_intensity_sum: f64,
}

impl TeamStatistics {
    /// Create new empty statistics
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_matches(matches: &[MatchRecord]) -> Self {
        let mut stats = Self::new();
        for record in matches {
            stats.update(record);
        }
        stats
    }

    /// Update statistics with the next older match
    pub fn update(&mut self, record: &MatchRecord) {
        let intensity = record.intensity();
        self.matches_played += 1;
        self.intensity_sum += intensity;

        if record.is_winner {
            self.wins += 1;
            self.win_intensity_sum += intensity;
            if !self.streak_broken {
                self.winstreak += 1;
            }
        } else {
            self.losses += 1;
            self.loss_intensity_sum += intensity;
            self.streak_broken = true;
        }
    }

    /// Win ratio (0-1), 0 without matches
    pub fn win_ratio(&self) -> f64 {
        self.wins as f64 / self.matches_played.max(1) as f64
    }

    pub fn avg_match_intensity(&self) -> f64 {
        self.intensity_sum / self.matches_played.max(1) as f64
    }

    pub fn avg_win_intensity(&self) -> f64 {
        self.win_intensity_sum / self.wins.max(1) as f64
    }

    pub fn avg_loss_intensity(&self) -> f64 {
        self.loss_intensity_sum / self.losses.max(1) as f64
    }
}

/// Win ratio over a match list, 0 when empty
pub fn winrate(matches: &[MatchRecord]) -> f64 {
    TeamStatistics::from_matches(matches).win_ratio()
}

/// Mean of every number in a placement text: "12-14th" → 13.
/// Text without digits ("TBD") gives 0.
pub fn avg_place(placement: &str) -> f64 {
    let numbers: Vec<f64> = placement
        .split(|c: char| !c.is_ascii_digit())
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse::<f64>().ok())
        .collect();
    if numbers.is_empty() {
        return 0.0;
    }
    numbers.iter().sum::<f64>() / numbers.len() as f64
}

/// Everything known about a team under one Config
#[derive(Debug, Clone, Default)]
pub struct TeamStats {
    pub ranking: RankingRecord,
    pub overview: TeamOverview,
    /// Regrouped matches, newest first
    pub matches: Vec<MatchRecord>,
    pub events: Vec<EventPlacement>,
    pub lineups: Vec<Lineup>,
}

impl TeamStats {
    /// Flat feature row over the team schema
    pub fn features(&self) -> FeatureRow {
        let stats = TeamStatistics::from_matches(&self.matches);
        let mut row = FeatureRow::new();

        row.set("has_roster_change", self.lineups.len() > 1);
        row.set("world_ranking", self.ranking.world_ranking);
        row.set("ranking_change", self.ranking.ranking_change);
        row.set("ranking_points", self.ranking.points);

        let avg_place = if self.events.is_empty() {
            None
        } else {
            let total: f64 = self.events.iter().map(|e| avg_place(&e.placement)).sum();
            Some(total / self.events.len() as f64)
        };
        row.set("avg_place", avg_place);

        row.set("winrate", stats.win_ratio());
        row.set("avg_match_intensity", stats.avg_match_intensity());
        row.set("avg_win_intensity", stats.avg_win_intensity());
        row.set("avg_loss_intensity", stats.avg_loss_intensity());
        row.set("winstreak", stats.winstreak);
        row.set("matches_played", stats.matches_played);

        row.set("maps_played", self.overview.maps_played);
        row.set("wins", self.overview.wins);
        row.set("draws", self.overview.draws);
        row.set("losses", self.overview.losses);
        row.set("kills", self.overview.kills);
        row.set("deaths", self.overview.deaths);
        row.set("rounds_played", self.overview.rounds_played);
        row.set("kd", self.overview.kd);
        row
    }
}
