//! Preprocessing, feature building and labels
//!
//! Raw extracted fields become typed records, typed records become one flat
//! [`FeatureRow`] per (entity, Config), and match histories become labels.

pub mod player;
pub mod preprocess;
pub mod target;
pub mod team;

pub use player::PlayerStats;
pub use target::{ExpectedPoints, ScoringPolicy};
pub use team::{TeamStatistics, TeamStats};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Feature columns of a team row, in output order
pub const TEAM_FEATURES: &[&str] = &[
    "has_roster_change",
    "world_ranking",
    "ranking_change",
    "ranking_points",
    "avg_place",
    "winrate",
    "avg_match_intensity",
    "avg_win_intensity",
    "avg_loss_intensity",
    "winstreak",
    "matches_played",
    "maps_played",
    "wins",
    "draws",
    "losses",
    "kills",
    "deaths",
    "rounds_played",
    "kd",
];

/// Feature columns of a player row, in output order
pub const PLAYER_FEATURES: &[&str] = &[
    "rating",
    "dpr",
    "kast",
    "impact",
    "adr",
    "kpr",
    "total_kills",
    "headshots",
    "kd",
    "grenade_dmg",
    "maps_played",
    "avg_rounds_played",
    "apr",
    "opening_ratio",
    "opening_rating",
    "is_awp",
    "clutch_1v1_winrate",
];

/// One cell of a feature row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl FeatureValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FeatureValue::Null)
    }

    /// Numeric view; booleans count as 0/1
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FeatureValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            FeatureValue::Int(i) => Some(*i as f64),
            FeatureValue::Float(f) => Some(*f),
            FeatureValue::Null | FeatureValue::Text(_) => None,
        }
    }
}

impl fmt::Display for FeatureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureValue::Null => Ok(()),
            FeatureValue::Bool(b) => write!(f, "{}", u8::from(*b)),
            FeatureValue::Int(i) => write!(f, "{}", i),
            FeatureValue::Float(x) => write!(f, "{}", x),
            FeatureValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<bool> for FeatureValue {
    fn from(value: bool) -> Self {
        FeatureValue::Bool(value)
    }
}

impl From<f64> for FeatureValue {
    fn from(value: f64) -> Self {
        if value.is_finite() {
            FeatureValue::Float(value)
        } else {
            FeatureValue::Null
        }
    }
}

impl From<i64> for FeatureValue {
    fn from(value: i64) -> Self {
        FeatureValue::Int(value)
    }
}

impl From<u32> for FeatureValue {
    fn from(value: u32) -> Self {
        FeatureValue::Int(value as i64)
    }
}

impl From<usize> for FeatureValue {
    fn from(value: usize) -> Self {
        FeatureValue::Int(value as i64)
    }
}

impl From<&str> for FeatureValue {
    fn from(value: &str) -> Self {
        FeatureValue::Text(value.to_string())
    }
}

impl From<String> for FeatureValue {
    fn from(value: String) -> Self {
        FeatureValue::Text(value)
    }
}

impl<T: Into<FeatureValue>> From<Option<T>> for FeatureValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(FeatureValue::Null)
    }
}

/// Flat named feature mapping for one (entity, Config)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureRow {
    values: BTreeMap<String, FeatureValue>,
}

impl FeatureRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: &str, value: impl Into<FeatureValue>) {
        self.values.insert(name.to_string(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&FeatureValue> {
        self.values.get(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Values in schema order. Unknown keys are dropped and absent keys are null.
    pub fn conform(&self, schema: &[&str]) -> Vec<FeatureValue> {
        schema
            .iter()
            .map(|name| self.values.get(*name).cloned().unwrap_or(FeatureValue::Null))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conform_fills_and_drops() {
        let mut row = FeatureRow::new();
        row.set("winrate", 0.5);
        row.set("unexpected", "x");
        let values = row.conform(&["winrate", "winstreak"]);
        assert_eq!(values, vec![FeatureValue::Float(0.5), FeatureValue::Null]);
    }

    #[test]
    fn test_values_survive_json() {
        let mut row = FeatureRow::new();
        row.set("is_awp", true);
        row.set("winstreak", 3u32);
        row.set("rating", 1.05);
        row.set("world_ranking", None::<u32>);
        let json = serde_json::to_string(&row).unwrap();
        let back: FeatureRow = serde_json::from_str(&json).unwrap();
        assert_eq!(back, row);
    }

    #[test]
    fn test_non_finite_floats_become_null() {
        assert!(FeatureValue::from(f64::NAN).is_null());
        assert_eq!(FeatureValue::from(Some(2u32)).as_f64(), Some(2.0));
    }

    #[test]
    fn test_schemas_have_unique_columns() {
        for schema in [TEAM_FEATURES, PLAYER_FEATURES] {
            let mut names: Vec<&str> = schema.to_vec();
            names.sort_unstable();
            names.dedup();
            assert_eq!(names.len(), schema.len());
        }
    }
}
