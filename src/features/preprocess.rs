//! Raw fields → typed records
//!
//! Field-level parse failures never raise: they degrade to `None` with a
//! warning. Only structurally empty inputs (no completed matches, no
//! recorded activity) become [`FantasyError::NoData`].

use crate::data::scrapers::team::LineupBlock;
use crate::data::scrapers::{parse_ordinal_date, RawRecord};
use crate::{FantasyError, Lineup, MatchRecord, Player, Result};
use chrono::{DateTime, NaiveDate, Utc};

const MATCH_DATE_FORMAT: &str = "%d/%m/%y";

/// Sentinel texts the site prints instead of a value
const SENTINELS: [&str; 2] = ["-", "0.00"];

/// Parse a numeric stat, treating sentinels and garbage as missing
pub fn parse_number(field: &str, raw: Option<&str>) -> Option<f64> {
    let text = raw?.trim();
    if text.is_empty() || SENTINELS.contains(&text) {
        return None;
    }
    let cleaned = text.trim_end_matches('%').replace(',', "");
    match cleaned.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => Some(value),
        _ => {
            log::warn!("Unparseable {} '{}'", field, text);
            None
        }
    }
}

/// Parse a non-negative count; sentinels and garbage are missing
pub fn parse_count(field: &str, raw: Option<&str>) -> Option<u32> {
    let text = raw?.trim();
    if text.is_empty() || text == "-" {
        return None;
    }
    match text.replace(',', "").parse::<u32>() {
        Ok(value) => Some(value),
        Err(_) => {
            log::warn!("Unparseable {} '{}'", field, text);
            None
        }
    }
}

/// "74.2%" → 0.742
pub fn parse_percentage(field: &str, raw: Option<&str>) -> Option<f64> {
    parse_number(field, raw).map(|v| v / 100.0)
}

/// Canonical lower-cased code for free-text categories
pub fn canonical_code(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// First run of digits in a text: "#4" → 4, "(612 points)" → 612
fn first_digits(text: &str) -> Option<u32> {
    let digits: String = text
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// Resolve one end of a lineup period. A `data-unix` stamp (milliseconds)
/// wins over the printed text; the literal "today" is `today`.
fn period_date(text: Option<&str>, unix_ms: Option<&str>, today: NaiveDate) -> Option<NaiveDate> {
    if let Some(date) = unix_ms
        .and_then(|ms| ms.trim().parse::<i64>().ok())
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map(|dt| dt.date_naive())
    {
        return Some(date);
    }
    let text = text?.trim();
    if text.eq_ignore_ascii_case("today") {
        return Some(today);
    }
    parse_ordinal_date(text).or_else(|| {
        // Month-only periods such as "Jan 2024"
        NaiveDate::parse_from_str(&format!("1 {}", text), "%d %b %Y")
            .or_else(|_| NaiveDate::parse_from_str(&format!("1 {}", text), "%d %B %Y"))
            .ok()
    })
}

/// Lineup period → (start, end, is_active); a missing end means "today"
pub fn parse_lineup_period(fields: &RawRecord, today: NaiveDate) -> Option<(NaiveDate, NaiveDate, bool)> {
    let start = period_date(fields.get("period_start"), fields.get("period_start_unix"), today);
    let end_text = fields.get("period_end").unwrap_or("today");
    let is_active = end_text.trim().eq_ignore_ascii_case("today");
    let end = if is_active {
        Some(today)
    } else {
        period_date(Some(end_text), fields.get("period_end_unix"), today)
    };
    match (start, end) {
        (Some(start), Some(end)) => Some((start, end, is_active)),
        _ => {
            log::warn!(
                "Unparseable lineup period '{:?} - {}'",
                fields.get("period_start"),
                end_text
            );
            None
        }
    }
}

/// "W / D / L" → (wins, draws, losses)
fn split_results(raw: Option<&str>) -> (Option<u32>, Option<u32>, Option<u32>) {
    let Some(text) = raw else {
        return (None, None, None);
    };
    let parts: Vec<&str> = text.split('/').map(str::trim).collect();
    if parts.len() != 3 {
        log::warn!("Unparseable results '{}'", text);
        return (None, None, None);
    }
    (
        parse_count("wins", Some(parts[0])),
        parse_count("draws", Some(parts[1])),
        parse_count("losses", Some(parts[2])),
    )
}

/// A team's standing in the world ranking
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RankingRecord {
    pub world_ranking: Option<u32>,
    pub ranking_change: Option<i64>,
    pub points: Option<u32>,
}

impl RankingRecord {
    /// A team absent from the ranking has every field missing
    pub fn from_raw(raw: Option<&RawRecord>) -> Self {
        let Some(raw) = raw else {
            return Self::default();
        };
        let ranking_change = raw.get("change").map(str::trim).and_then(|change| {
            if change == "-" || change.is_empty() {
                return Some(0);
            }
            let magnitude = first_digits(change)? as i64;
            Some(if change.starts_with('-') { -magnitude } else { magnitude })
        });
        RankingRecord {
            world_ranking: raw.get("position").and_then(first_digits),
            ranking_change,
            points: raw.get("points").and_then(first_digits),
        }
    }
}

/// Team overview counts
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TeamOverview {
    pub maps_played: Option<u32>,
    pub wins: Option<u32>,
    pub draws: Option<u32>,
    pub losses: Option<u32>,
    pub kills: Option<u32>,
    pub deaths: Option<u32>,
    pub rounds_played: Option<u32>,
    pub kd: Option<f64>,
}

impl TeamOverview {
    pub fn from_raw(raw: &RawRecord) -> Self {
        let (wins, draws, losses) = split_results(raw.get("Wins / draws / losses"));
        TeamOverview {
            maps_played: parse_count("maps_played", raw.get("Maps played")),
            wins,
            draws,
            losses,
            kills: parse_count("kills", raw.get("Total kills")),
            deaths: parse_count("deaths", raw.get("Total deaths")),
            rounds_played: parse_count("rounds_played", raw.get("Rounds played")),
            kd: parse_number("kd", raw.get("K/D Ratio")),
        }
    }
}

/// One row of a team's event history
#[derive(Debug, Clone, PartialEq)]
pub struct EventPlacement {
    pub event: String,
    pub placement: String,
}

pub fn preprocess_events(raw: &[RawRecord]) -> Vec<EventPlacement> {
    raw.iter()
        .map(|r| EventPlacement {
            event: canonical_code(r.get("event").unwrap_or_default()),
            placement: r.get("placement").unwrap_or_default().trim().to_string(),
        })
        .collect()
}

/// Outcome of a single map
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapOutcome {
    Win,
    Loss,
    Tie,
}

impl MapOutcome {
    fn code(&self) -> char {
        match self {
            MapOutcome::Win => 'w',
            MapOutcome::Loss => 'l',
            MapOutcome::Tie => 't',
        }
    }
}

/// One map from a team's match history
#[derive(Debug, Clone, PartialEq)]
pub struct MapRecord {
    pub date: Option<NaiveDate>,
    pub event: Option<String>,
    pub opponent: Option<String>,
    pub map: Option<String>,
    pub rounds_won: u32,
    pub rounds_lost: u32,
    pub outcome: Option<MapOutcome>,
    /// Marks the first map of a match in page order
    pub opens_match: bool,
}

impl MapRecord {
    pub fn from_raw(raw: &RawRecord) -> Self {
        let date = raw.get("time").and_then(|t| {
            let parsed = NaiveDate::parse_from_str(t.trim(), MATCH_DATE_FORMAT).ok();
            if parsed.is_none() {
                log::warn!("Unparseable map date '{}'", t);
            }
            parsed
        });
        let (rounds_won, rounds_lost) = match raw.get("rounds") {
            Some(rounds) => match rounds.split_once('-') {
                Some((won, lost)) => (
                    parse_count("rounds_won", Some(won)).unwrap_or(0),
                    parse_count("rounds_lost", Some(lost)).unwrap_or(0),
                ),
                None => {
                    log::warn!("Unparseable rounds '{}'", rounds);
                    (0, 0)
                }
            },
            None => (0, 0),
        };
        let outcome = match raw.get("result").map(|r| r.trim().to_lowercase()).as_deref() {
            Some("w") => Some(MapOutcome::Win),
            Some("l") => Some(MapOutcome::Loss),
            Some("t") | Some("d") => Some(MapOutcome::Tie),
            other => {
                log::warn!("Unknown map result {:?}", other);
                None
            }
        };
        MapRecord {
            date,
            event: raw.get("event").map(canonical_code),
            opponent: raw.get("opponent").map(canonical_code),
            map: raw.get("map").map(canonical_code),
            rounds_won,
            rounds_lost,
            outcome,
            opens_match: raw.get("first") == Some("1"),
        }
    }
}

/// Group per-map rows into matches.
///
/// Rows are taken in page order (newest first). A marked row opens a new
/// match and the following unmarked rows join it; rows before the first
/// marker cannot be attributed and are dropped. Matches come out newest
/// first.
pub fn regroup_matches(maps: &[MapRecord]) -> Result<Vec<MatchRecord>> {
    let mut matches: Vec<MatchRecord> = Vec::new();
    let mut orphans = 0usize;

    for map in maps {
        if map.opens_match {
            matches.push(MatchRecord {
                opponent: map.opponent.clone(),
                date: map.date,
                event: map.event.clone(),
                maps_played: 0,
                maps_won: 0,
                maps_lost: 0,
                map_results: String::new(),
                rounds_played: 0,
                rounds_won: 0,
                rounds_lost: 0,
                is_winner: false,
            });
        }
        let Some(current) = matches.last_mut() else {
            orphans += 1;
            continue;
        };
        current.maps_played += 1;
        match map.outcome {
            Some(MapOutcome::Win) => current.maps_won += 1,
            Some(MapOutcome::Loss) => current.maps_lost += 1,
            _ => {}
        }
        if let Some(outcome) = map.outcome {
            current.map_results.push(outcome.code());
        }
        current.rounds_won += map.rounds_won;
        current.rounds_lost += map.rounds_lost;
        current.rounds_played += map.rounds_won + map.rounds_lost;
        current.is_winner = current.maps_won > current.maps_lost;
    }

    if orphans > 0 {
        log::warn!("Dropped {} maps preceding the first match marker", orphans);
    }
    if matches.is_empty() {
        return Err(FantasyError::NoData("no completed matches".to_string()));
    }
    Ok(matches)
}

/// Lineup blocks → typed lineup history
pub fn preprocess_lineups(blocks: &[LineupBlock], today: NaiveDate) -> Vec<Lineup> {
    blocks
        .iter()
        .filter_map(|block| {
            let (start, end, is_active) = parse_lineup_period(&block.fields, today)?;
            let (wins, draws, losses) = split_results(block.fields.get("Wins / draws / losses"));
            Some(Lineup {
                start,
                end,
                is_active,
                players: block
                    .players
                    .iter()
                    .map(|(key, name)| Player::new(*key, name))
                    .collect(),
                maps_played: parse_count("maps_played", block.fields.get("Maps played")),
                wins,
                draws,
                losses,
                lan_top3_placings: parse_count(
                    "lan_top3_placings",
                    block.fields.get("LAN top 3 placings"),
                ),
            })
        })
        .collect()
}

/// A player's overview page
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlayerOverview {
    pub rating: Option<f64>,
    pub dpr: Option<f64>,
    /// Fraction of rounds with a kill, assist, survival or trade
    pub kast: Option<f64>,
    pub impact: Option<f64>,
    pub adr: Option<f64>,
    pub kpr: Option<f64>,
    pub total_kills: Option<u32>,
    /// Fraction of kills that were headshots
    pub headshots: Option<f64>,
    pub kd: Option<f64>,
    pub grenade_dmg: Option<f64>,
    pub maps_played: Option<u32>,
    pub rounds_played: Option<u32>,
    pub apr: Option<f64>,
}

impl PlayerOverview {
    /// Fails with NoData when the page shows no maps played
    pub fn from_raw(raw: &RawRecord) -> Result<Self> {
        let overview = PlayerOverview {
            rating: parse_number("rating", raw.get("rating")),
            dpr: parse_number("dpr", raw.get("dpr")),
            kast: parse_percentage("kast", raw.get("kast")),
            impact: parse_number("impact", raw.get("impact")),
            adr: parse_number("adr", raw.get("adr")),
            kpr: parse_number("kpr", raw.get("kpr")),
            total_kills: parse_count("total_kills", raw.get("Total kills")),
            headshots: parse_percentage("headshots", raw.get("Headshot %")),
            kd: parse_number("kd", raw.get("K/D Ratio")),
            grenade_dmg: parse_number("grenade_dmg", raw.get("Grenade dmg / Round")),
            maps_played: parse_count("maps_played", raw.get("Maps played")),
            rounds_played: parse_count("rounds_played", raw.get("Rounds played")),
            apr: parse_number("apr", raw.get("Assists / round")),
        };
        match overview.maps_played {
            Some(maps) if maps > 0 => Ok(overview),
            _ => Err(FantasyError::NoData("no maps played".to_string())),
        }
    }

    /// Rounds per map, guarded against zero maps
    pub fn avg_rounds_played(&self) -> Option<f64> {
        let rounds = self.rounds_played?;
        Some(rounds as f64 / self.maps_played.unwrap_or(0).max(1) as f64)
    }
}

/// A player's individual page
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlayerIndividual {
    pub kills: Option<u32>,
    pub opening_ratio: Option<f64>,
    pub opening_rating: Option<f64>,
    pub rifle_kills: Option<u32>,
    pub sniper_kills: Option<u32>,
}

/// Sniper kills above this share of rifle kills mark a dedicated AWPer
const AWP_SHARE: f64 = 0.4;

impl PlayerIndividual {
    /// Fails with NoData when the page shows zero kills
    pub fn from_raw(raw: &RawRecord) -> Result<Self> {
        let individual = PlayerIndividual {
            kills: parse_count("kills", raw.get("Kills")),
            opening_ratio: parse_number("opening_ratio", raw.get("Opening kill ratio")),
            opening_rating: parse_number("opening_rating", raw.get("Opening kill rating")),
            rifle_kills: parse_count("rifle_kills", raw.get("Rifle kills")),
            sniper_kills: parse_count("sniper_kills", raw.get("Sniper kills")),
        };
        match individual.kills {
            Some(kills) if kills > 0 => Ok(individual),
            _ => Err(FantasyError::NoData("no kills recorded".to_string())),
        }
    }

    pub fn is_awp(&self) -> Option<bool> {
        let sniper = self.sniper_kills? as f64;
        let rifle = self.rifle_kills? as f64;
        Some(sniper / rifle.max(1.0) > AWP_SHARE)
    }
}

/// 1on1 clutch tally
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ClutchRecord {
    pub won: u32,
    pub lost: u32,
}

impl ClutchRecord {
    /// Fails with NoData when the page has no clutch summary
    pub fn from_raw(raw: &RawRecord) -> Result<Self> {
        match (
            parse_count("clutches_won", raw.get("won")),
            parse_count("clutches_lost", raw.get("lost")),
        ) {
            (Some(won), Some(lost)) => Ok(ClutchRecord { won, lost }),
            _ => Err(FantasyError::NoData("no clutch summary".to_string())),
        }
    }

    /// Won share, rounded to three decimals
    pub fn winrate(&self) -> f64 {
        let rate = self.won as f64 / (self.won + self.lost).max(1) as f64;
        (rate * 1000.0).round() / 1000.0
    }
}

/// One match from a player's history: team result and per-map ratings
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerMatch {
    pub won: bool,
    pub ratings: Vec<f64>,
}

/// Group a player's per-map rows into matches, same rules as
/// [`regroup_matches`]. Maps without a readable rating are skipped.
pub fn regroup_player_matches(raw: &[RawRecord]) -> Result<Vec<PlayerMatch>> {
    let mut matches: Vec<PlayerMatch> = Vec::new();
    let mut orphans = 0usize;

    for map in raw {
        if map.get("first") == Some("1") {
            matches.push(PlayerMatch {
                won: map.get("won") == Some("1"),
                ratings: Vec::new(),
            });
        }
        let Some(current) = matches.last_mut() else {
            orphans += 1;
            continue;
        };
        if let Some(rating) = parse_number("map_rating", map.get("rating")) {
            current.ratings.push(rating);
        }
    }

    if orphans > 0 {
        log::warn!("Dropped {} maps preceding the first match marker", orphans);
    }
    matches.retain(|m| !m.ratings.is_empty());
    if matches.is_empty() {
        return Err(FantasyError::NoData("no completed matches".to_string()));
    }
    Ok(matches)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(opens: bool, result: &str, rounds: &str) -> MapRecord {
        MapRecord::from_raw(
            &RawRecord::new()
                .with("time", "14/06/24")
                .with("opponent", "FaZe")
                .with("event", "BLAST Premier")
                .with("rounds", rounds)
                .with("result", result)
                .with("first", if opens { "1" } else { "0" }),
        )
    }

    #[test]
    fn test_sentinels_are_missing() {
        assert_eq!(parse_number("rating", Some("0.00")), None);
        assert_eq!(parse_number("impact", Some("-")), None);
        assert_eq!(parse_number("adr", Some("abc")), None);
        assert_eq!(parse_number("adr", Some("85.3")), Some(85.3));
        assert_eq!(parse_count("kills", Some("1,502")), Some(1502));
        assert_eq!(parse_count("draws", Some("0")), Some(0));
    }

    #[test]
    fn test_percentage_becomes_fraction() {
        let kast = parse_percentage("kast", Some("74.5%")).unwrap();
        assert!((kast - 0.745).abs() < 1e-9);
    }

    #[test]
    fn test_regroup_six_maps_into_two_matches() {
        let maps = vec![
            map(true, "W", "13 - 9"),
            map(false, "L", "10 - 13"),
            map(false, "W", "13 - 7"),
            map(true, "L", "5 - 13"),
            map(false, "W", "16 - 14"),
            map(false, "L", "11 - 13"),
        ];
        let matches = regroup_matches(&maps).unwrap();
        assert_eq!(matches.len(), 2);
        for m in &matches {
            assert_eq!(m.maps_played, 3);
            assert_eq!(m.is_winner, m.maps_won > m.maps_lost);
        }
        assert!(matches[0].is_winner);
        assert!(!matches[1].is_winner);
        assert_eq!(matches[0].map_results, "wlw");
        assert_eq!(matches[0].rounds_won, 36);
        assert_eq!(matches[0].rounds_lost, 29);
        assert_eq!(matches[0].opponent.as_deref(), Some("faze"));
    }

    #[test]
    fn test_regroup_drops_leading_orphans() {
        let maps = vec![map(false, "W", "13 - 2"), map(true, "L", "3 - 13")];
        let matches = regroup_matches(&maps).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].maps_played, 1);
    }

    #[test]
    fn test_empty_regroup_is_no_data() {
        assert!(matches!(regroup_matches(&[]), Err(FantasyError::NoData(_))));
        let unmarked = vec![map(false, "W", "13 - 2")];
        assert!(matches!(
            regroup_matches(&unmarked),
            Err(FantasyError::NoData(_))
        ));
    }

    #[test]
    fn test_ranking_record() {
        let raw = RawRecord::new()
            .with("position", "#4")
            .with("points", "(612 points)")
            .with("change", "-2");
        let record = RankingRecord::from_raw(Some(&raw));
        assert_eq!(record.world_ranking, Some(4));
        assert_eq!(record.points, Some(612));
        assert_eq!(record.ranking_change, Some(-2));

        let steady = RawRecord::new().with("position", "#1").with("change", "-");
        assert_eq!(RankingRecord::from_raw(Some(&steady)).ranking_change, Some(0));
        assert_eq!(RankingRecord::from_raw(None), RankingRecord::default());
    }

    #[test]
    fn test_team_overview_splits_results() {
        let raw = RawRecord::new()
            .with("Maps played", "42")
            .with("Wins / draws / losses", "25 / 1 / 16")
            .with("K/D Ratio", "1.08");
        let overview = TeamOverview::from_raw(&raw);
        assert_eq!(overview.maps_played, Some(42));
        assert_eq!((overview.wins, overview.draws, overview.losses), (Some(25), Some(1), Some(16)));
        assert_eq!(overview.kd, Some(1.08));
        assert_eq!(overview.kills, None);
    }

    #[test]
    fn test_lineup_period_today_is_active() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 20).unwrap();
        let fields = RawRecord::new().with("period_start", "Jan 2024");
        let (start, end, active) = parse_lineup_period(&fields, today).unwrap();
        assert_eq!(start, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(end, today);
        assert!(active);

        let closed = RawRecord::new()
            .with("period_start", "Jan 2023")
            .with("period_end", "Dec 2023");
        let (_, end, active) = parse_lineup_period(&closed, today).unwrap();
        assert_eq!(end, NaiveDate::from_ymd_opt(2023, 12, 1).unwrap());
        assert!(!active);
    }

    #[test]
    fn test_unix_stamp_wins_over_text() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 20).unwrap();
        let fields = RawRecord::new()
            .with("period_start", "garbage")
            .with("period_start_unix", "1704067200000");
        let (start, _, _) = parse_lineup_period(&fields, today).unwrap();
        assert_eq!(start, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    }

    #[test]
    fn test_player_overview_without_maps_is_no_data() {
        let raw = RawRecord::new().with("rating", "0.00").with("Maps played", "0");
        assert!(matches!(
            PlayerOverview::from_raw(&raw),
            Err(FantasyError::NoData(_))
        ));
    }

    #[test]
    fn test_clutch_winrate_rounds() {
        let clutch = ClutchRecord { won: 2, lost: 1 };
        assert_eq!(clutch.winrate(), 0.667);
        assert_eq!(ClutchRecord::default().winrate(), 0.0);
    }

    #[test]
    fn test_awp_share() {
        let individual = PlayerIndividual {
            kills: Some(100),
            rifle_kills: Some(40),
            sniper_kills: Some(50),
            ..Default::default()
        };
        assert_eq!(individual.is_awp(), Some(true));
    }

    #[test]
    fn test_regroup_player_matches() {
        let rows = vec![
            RawRecord::new().with("first", "1").with("won", "1").with("rating", "1.45"),
            RawRecord::new().with("first", "0").with("won", "1").with("rating", "0.88"),
            RawRecord::new().with("first", "1").with("won", "0").with("rating", "0.70"),
        ];
        let matches = regroup_player_matches(&rows).unwrap();
        assert_eq!(matches.len(), 2);
        assert!(matches[0].won);
        assert_eq!(matches[0].ratings, vec![1.45, 0.88]);
        assert!(!matches[1].won);
    }
}
