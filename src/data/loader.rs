//! Dataset loader
//!
//! Turns persisted event directories into two tables (teams, players) whose
//! column names and order are fixed, whatever was found on disk.

use crate::data::cache::{read_json, Label};
use crate::features::target::fantasy_target;
use crate::features::{FeatureRow, FeatureValue, PLAYER_FEATURES, TEAM_FEATURES};
use crate::{Config, EntityKind, Event, FantasyError, Result};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

const EVENT_FILE: &str = "event.json";
const TARGET_FILE: &str = "target.json";
const ROSTER_SIZE: usize = 5;

/// Event-level columns broadcast to every row of an event
pub const EVENT_COLUMNS: &[&str] = &[
    "event_id",
    "rank",
    "prize_pool",
    "duration",
    "is_lan",
    "is_qual",
    "starts_at",
    "ends_at",
];

pub const CONFIG_COLUMNS: &[&str] = &["start_time", "end_time", "event_filter", "ranking_filter"];

pub const TEAM_TARGET: &str = "wr_target";
pub const PLAYER_TARGET: &str = "expected_pts_target";
pub const FANTASY_TARGET: &str = "fantasy_target";

/// Column-stable table of feature values
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<FeatureValue>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Table {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<FeatureValue>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn push(&mut self, row: Vec<FeatureValue>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(FantasyError::InvalidArguments(format!(
                "row has {} values for {} columns",
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// All values of one column
    pub fn column(&self, name: &str) -> Option<Vec<&FeatureValue>> {
        let index = self.column_index(name)?;
        Some(self.rows.iter().map(|row| &row[index]).collect())
    }

    pub fn value(&self, row: usize, name: &str) -> Option<&FeatureValue> {
        let index = self.column_index(name)?;
        self.rows.get(row).map(|r| &r[index])
    }

    pub fn to_csv(&self) -> Result<String> {
        let mut out = Vec::new();
        self.write_rows(&mut out)?;
        Ok(String::from_utf8_lossy(&out).into_owned())
    }

    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = std::io::BufWriter::new(std::fs::File::create(path)?);
        self.write_rows(&mut file)?;
        file.flush()?;
        log::info!("Wrote {} rows to {}", self.rows.len(), path.display());
        Ok(())
    }

    fn write_rows<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        write_csv_row(w, self.columns.iter().map(String::as_str))?;
        for row in &self.rows {
            let cells: Vec<String> = row.iter().map(|v| v.to_string()).collect();
            write_csv_row(w, cells.iter().map(String::as_str))?;
        }
        Ok(())
    }
}

fn write_csv_row<'a, W: Write>(w: &mut W, cells: impl Iterator<Item = &'a str>) -> std::io::Result<()> {
    for (i, cell) in cells.enumerate() {
        if i > 0 {
            write!(w, ",")?;
        }
        if cell.contains([',', '"', '\n', '\r']) {
            write!(w, "\"{}\"", cell.replace('"', "\"\""))?;
        } else {
            write!(w, "{}", cell)?;
        }
    }
    writeln!(w)
}

/// Team and player tables of a set of events
#[derive(Debug, Clone, PartialEq)]
pub struct Corpus {
    pub teams: Table,
    pub players: Table,
}

impl Corpus {
    pub fn empty() -> Self {
        Corpus {
            teams: Table::new(team_columns()),
            players: Table::new(player_columns()),
        }
    }

    /// Player rows joined with their team's row for the same event and
    /// Config, plus the combined fantasy target
    pub fn joined_players(&self) -> Result<Table> {
        let team_values: Vec<&str> = std::iter::once("team_name")
            .chain(TEAM_FEATURES.iter().copied())
            .chain(std::iter::once(TEAM_TARGET))
            .collect();

        let mut columns = self.players.columns.clone();
        columns.extend(team_values.iter().map(|c| format!("team_{}", c)));
        columns.push(FANTASY_TARGET.to_string());
        let mut joined = Table::new(columns);

        let join_columns: Vec<&str> = ["event_id", "team_id"]
            .iter()
            .chain(CONFIG_COLUMNS.iter())
            .copied()
            .collect();
        let key_of = |table: &Table, row: usize| -> Vec<String> {
            join_columns
                .iter()
                .map(|c| table.value(row, c).map(|v| v.to_string()).unwrap_or_default())
                .collect()
        };

        let mut teams: HashMap<Vec<String>, usize> = HashMap::new();
        for row in 0..self.teams.len() {
            teams.insert(key_of(&self.teams, row), row);
        }

        for row in 0..self.players.len() {
            let mut values = self.players.rows[row].clone();
            let team_row = teams.get(&key_of(&self.players, row)).copied();
            for name in &team_values {
                values.push(
                    team_row
                        .and_then(|t| self.teams.value(t, name))
                        .cloned()
                        .unwrap_or(FeatureValue::Null),
                );
            }

            let points = self.players.value(row, PLAYER_TARGET).and_then(FeatureValue::as_f64);
            let winrate = team_row
                .and_then(|t| self.teams.value(t, TEAM_TARGET))
                .and_then(FeatureValue::as_f64);
            values.push(match (points, winrate) {
                (Some(p), Some(w)) => fantasy_target(p, w).into(),
                _ => FeatureValue::Null,
            });
            joined.push(values)?;
        }
        Ok(joined)
    }
}

pub fn team_columns() -> Vec<String> {
    let mut columns: Vec<String> = EVENT_COLUMNS.iter().map(|c| c.to_string()).collect();
    columns.push("team_id".to_string());
    columns.push("team_name".to_string());
    columns.extend((1..=ROSTER_SIZE).map(|i| format!("player_id_{}", i)));
    columns.extend(CONFIG_COLUMNS.iter().map(|c| c.to_string()));
    columns.extend(TEAM_FEATURES.iter().map(|c| c.to_string()));
    columns.push(TEAM_TARGET.to_string());
    columns
}

pub fn player_columns() -> Vec<String> {
    let mut columns: Vec<String> = EVENT_COLUMNS.iter().map(|c| c.to_string()).collect();
    columns.push("player_id".to_string());
    columns.push("player_name".to_string());
    columns.push("team_id".to_string());
    columns.extend(CONFIG_COLUMNS.iter().map(|c| c.to_string()));
    columns.extend(PLAYER_FEATURES.iter().map(|c| c.to_string()));
    columns.push(PLAYER_TARGET.to_string());
    columns
}

/// Load every event directory into one corpus.
/// Directories without an `event.json` are skipped with a warning.
pub fn load_dataset<P: AsRef<Path>>(event_dirs: &[P]) -> Result<Corpus> {
    let mut corpus = Corpus::empty();
    for dir in event_dirs {
        let dir = dir.as_ref();
        let Some(event) = read_json::<Event>(&dir.join(EVENT_FILE))? else {
            log::warn!("No event metadata in {}, skipping", dir.display());
            continue;
        };
        load_event(dir, &event, &mut corpus)?;
    }
    log::info!(
        "Loaded {} team rows and {} player rows from {} events",
        corpus.teams.len(),
        corpus.players.len(),
        event_dirs.len()
    );
    Ok(corpus)
}

fn event_values(event: &Event) -> Vec<FeatureValue> {
    vec![
        event.key.0.into(),
        event.rank.into(),
        event.prize_pool.into(),
        event.duration.into(),
        event.is_lan.into(),
        event.is_qual.into(),
        event.starts_at.map(|d| d.to_string()).into(),
        event.ends_at.map(|d| d.to_string()).into(),
    ]
}

fn config_values(config: &Config) -> Vec<FeatureValue> {
    vec![
        config.start_time.to_string().into(),
        config.end_time.to_string().into(),
        config.event_filter.code().into(),
        config.ranking_filter.code().into(),
    ]
}

fn load_event(dir: &Path, event: &Event, corpus: &mut Corpus) -> Result<()> {
    let event_cols = event_values(event);

    for (key, entity_dir) in entity_dirs(dir, EntityKind::Team)? {
        let Some(team) = event.teams.iter().find(|t| t.key.0 == key) else {
            log::warn!("Team {} is not part of event {}, skipping", key, event.key);
            continue;
        };
        let target = load_target(&entity_dir)?;
        for (config, row) in feature_rows(&entity_dir)? {
            let mut values = event_cols.clone();
            values.push(team.key.0.into());
            values.push(team.name.as_str().into());
            for i in 0..ROSTER_SIZE {
                values.push(team.players.get(i).map(|p| p.key.0).into());
            }
            values.extend(config_values(&config));
            values.extend(row.conform(TEAM_FEATURES));
            values.push(target.into());
            corpus.teams.push(values)?;
        }
    }

    for (key, entity_dir) in entity_dirs(dir, EntityKind::Player)? {
        let Some((team, player)) = event.players().find(|(_, p)| p.key.0 == key) else {
            log::warn!("Player {} is not on a roster of event {}, skipping", key, event.key);
            continue;
        };
        let target = load_target(&entity_dir)?;
        for (config, row) in feature_rows(&entity_dir)? {
            let mut values = event_cols.clone();
            values.push(player.key.0.into());
            values.push(player.name.as_str().into());
            values.push(team.key.0.into());
            values.extend(config_values(&config));
            values.extend(row.conform(PLAYER_FEATURES));
            values.push(target.into());
            corpus.players.push(values)?;
        }
    }
    Ok(())
}

/// Numeric subdirectories of `{event}/{teams|players}`, by key
fn entity_dirs(event_dir: &Path, kind: EntityKind) -> Result<Vec<(u32, PathBuf)>> {
    let root = event_dir.join(kind.dir_name());
    if !root.is_dir() {
        return Ok(Vec::new());
    }
    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(&root)? {
        let path = entry?.path();
        let key = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.parse::<u32>().ok());
        match key {
            Some(key) if path.is_dir() => dirs.push((key, path)),
            _ => log::debug!("Ignoring {}", path.display()),
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// Stored feature rows of one entity, by Config
fn feature_rows(entity_dir: &Path) -> Result<Vec<(Config, FeatureRow)>> {
    let mut rows = Vec::new();
    for entry in std::fs::read_dir(entity_dir)? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !name.ends_with(".json") || name == TARGET_FILE {
            continue;
        }
        let config = match Config::from_features_file_name(name) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Ignoring {}: {}", path.display(), e);
                continue;
            }
        };
        if let Some(row) = read_json::<FeatureRow>(&path)? {
            rows.push((config, row));
        }
    }
    rows.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(rows)
}

fn load_target(entity_dir: &Path) -> Result<Option<f64>> {
    Ok(read_json::<Label>(&entity_dir.join(TARGET_FILE))?.map(|l| l.target))
}
