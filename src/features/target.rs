//! Target labels
//!
//! Teams are labelled with their match win-rate over the event window,
//! players with expected fantasy points under a [`ScoringPolicy`].

use crate::features::preprocess::PlayerMatch;
use crate::features::team::winrate;
use crate::{FantasyError, MatchRecord, Result};

/// Points for one map: floor(50·(rating − 1)), computed on hundredths of
/// the rating so 1.10 scores 5 rather than 4.
pub fn map_points(rating: f64) -> i64 {
    ((rating * 100.0).round() as i64 - 100).div_euclid(2)
}

/// Turns a player's match history over the event window into a label
pub trait ScoringPolicy {
    fn expected_points(&self, matches: &[PlayerMatch]) -> Result<f64>;
}

/// Mean per-map points and mean per-match team bonus, averaged together
#[derive(Debug, Clone, Copy)]
pub struct ExpectedPoints {
    pub win_bonus: i64,
    pub loss_bonus: i64,
}

impl Default for ExpectedPoints {
    fn default() -> Self {
        ExpectedPoints {
            win_bonus: 6,
            loss_bonus: -3,
        }
    }
}

impl ExpectedPoints {
    fn bonus(&self, won: bool) -> i64 {
        if won {
            self.win_bonus
        } else {
            self.loss_bonus
        }
    }
}

impl ScoringPolicy for ExpectedPoints {
    fn expected_points(&self, matches: &[PlayerMatch]) -> Result<f64> {
        let ratings: Vec<f64> = matches.iter().flat_map(|m| m.ratings.iter().copied()).collect();
        if matches.is_empty() || ratings.is_empty() {
            return Err(FantasyError::NoData("no rated maps in window".to_string()));
        }
        let map_mean =
            ratings.iter().map(|r| map_points(*r) as f64).sum::<f64>() / ratings.len() as f64;
        let bonus_mean =
            matches.iter().map(|m| self.bonus(m.won) as f64).sum::<f64>() / matches.len() as f64;
        Ok((map_mean + bonus_mean) / 2.0)
    }
}

/// Per-match total (all map points plus the bonus), averaged over matches
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchTotals {
    pub bonus: ExpectedPoints,
}

impl ScoringPolicy for MatchTotals {
    fn expected_points(&self, matches: &[PlayerMatch]) -> Result<f64> {
        if matches.is_empty() {
            return Err(FantasyError::NoData("no rated maps in window".to_string()));
        }
        let total: i64 = matches
            .iter()
            .map(|m| m.ratings.iter().map(|r| map_points(*r)).sum::<i64>() + self.bonus.bonus(m.won))
            .sum();
        Ok(total as f64 / matches.len() as f64)
    }
}

/// Team label: win-rate over the event's matches
pub fn team_target(matches: &[MatchRecord]) -> Result<f64> {
    if matches.is_empty() {
        return Err(FantasyError::NoData("no matches in window".to_string()));
    }
    Ok(winrate(matches))
}

/// Combined fantasy score of a player given their team's win-rate
pub fn fantasy_target(expected_points: f64, team_winrate: f64) -> f64 {
    expected_points + 9.0 * team_winrate - 3.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn played(won: bool, ratings: &[f64]) -> PlayerMatch {
        PlayerMatch {
            won,
            ratings: ratings.to_vec(),
        }
    }

    #[test]
    fn test_map_points() {
        assert_eq!(map_points(1.0), 0);
        assert_eq!(map_points(1.10), 5);
        assert_eq!(map_points(1.45), 22);
        assert_eq!(map_points(0.88), -6);
        assert_eq!(map_points(0.99), -1);
    }

    #[test]
    fn test_expected_points() {
        let matches = vec![played(true, &[1.40, 1.20]), played(false, &[0.80])];
        // map points 20, 10, -10 -> mean 20/3; bonus 6, -3 -> mean 1.5
        let points = ExpectedPoints::default().expected_points(&matches).unwrap();
        assert!((points - (20.0 / 3.0 + 1.5) / 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_policies_are_interchangeable() {
        let matches = vec![played(true, &[1.40, 1.20]), played(false, &[0.80])];
        let policies: Vec<Box<dyn ScoringPolicy>> =
            vec![Box::new(ExpectedPoints::default()), Box::new(MatchTotals::default())];
        let values: Vec<f64> = policies
            .iter()
            .map(|p| p.expected_points(&matches).unwrap())
            .collect();
        // (30 + 6) and (-10 - 3) over two matches
        assert_eq!(values[1], 11.5);
        assert!(values[0] != values[1]);
    }

    #[test]
    fn test_empty_history_is_no_data() {
        assert!(matches!(
            ExpectedPoints::default().expected_points(&[]),
            Err(FantasyError::NoData(_))
        ));
        assert!(matches!(team_target(&[]), Err(FantasyError::NoData(_))));
    }

    #[test]
    fn test_fantasy_target() {
        assert_eq!(fantasy_target(10.0, 0.5), 11.5);
    }
}
