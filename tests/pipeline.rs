//! End-to-end build of a mock event against canned pages

use chrono::NaiveDate;
use fantasy::data::fetch::{Fetcher, RecordingTransport};
use fantasy::data::links::{Links, PlayerPage, TeamPage};
use fantasy::data::{ConfigPlan, DatasetAssembler, Database, Layout};
use fantasy::features::FeatureValue;
use fantasy::pipeline::Session;
use fantasy::{Config, EntityKind, EventFilter, EventId, FantasyError, Player, RankingFilter, Team};
use std::path::Path;
use std::time::Duration;

const BASE: &str = "http://stats.test";
const EVENT: EventId = EventId(7148);

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn today() -> NaiveDate {
    date(2024, 7, 1)
}

fn stats_config() -> Config {
    Config::new(date(2024, 3, 1), date(2024, 6, 11), EventFilter::All, RankingFilter::All, today()).unwrap()
}

fn target_config() -> Config {
    Config::event_window(date(2024, 6, 12), date(2024, 6, 16)).unwrap()
}

fn teams() -> Vec<(Team, Vec<Player>)> {
    let alpha = (1..=5).map(|k| Player::new(k, &format!("a{}", k))).collect();
    let bravo = (6..=10).map(|k| Player::new(k, &format!("b{}", k))).collect();
    vec![(Team::new(101, "alpha"), alpha), (Team::new(102, "bravo"), bravo)]
}

fn event_page() -> String {
    let mut boxes = String::new();
    for (i, (team, _)) in teams().iter().enumerate() {
        boxes.push_str(&format!(
            r#"<div class="team-box"><div class="team-name"><a href="/team/{}/{}">{}</a></div>
               <div class="event-world-rank">#{}</div></div>"#,
            team.key,
            team.name,
            team.name,
            i * 2 + 1
        ));
    }
    format!(
        r#"<html><body><h1 class="event-hub-title">Test Major 2024</h1>
        <table class="table eventMeta"><tbody>
          <tr><th>Start date</th><td>Jun 12th 2024</td></tr>
          <tr><th>End date</th><td>Jun 16th 2024</td></tr>
          <tr><th>Teams</th><td>2</td></tr>
          <tr><th>Prize pool</th><td>$250,000</td></tr>
          <tr><th>Location</th><td>Stockholm, Sweden</td></tr>
        </tbody></table>{}</body></html>"#,
        boxes
    )
}

fn lineups_page(players: &[Player]) -> String {
    let links: String = players
        .iter()
        .map(|p| {
            format!(
                r#"<div class="teammate-info standard-box"><a class="image-and-label" href="/stats/players/{}/{}">{}</a></div>"#,
                p.key, p.name, p.name
            )
        })
        .collect();
    format!(
        r#"<div class="lineup-container">
             <div class="lineup-year"><span>Jan 2024</span></div>
             <div class="col standard-box big-padding"><div class="large-strong">40</div>
               <div class="small-label-below">Maps played</div></div>
             {}</div>"#,
        links
    )
}

const TEAM_OVERVIEW: &str = r#"
    <div class="col standard-box big-padding"><div class="large-strong">42</div><div class="small-label-below">Maps played</div></div>
    <div class="col standard-box big-padding"><div class="large-strong">25 / 1 / 16</div><div class="small-label-below">Wins / draws / losses</div></div>
    <div class="col standard-box big-padding"><div class="large-strong">1.08</div><div class="small-label-below">K/D Ratio</div></div>"#;

fn map_row(first: bool, result: &str, rounds: &str) -> String {
    format!(
        r#"<tr class="group-1{}"><td class="time"><a>14/06/24</a></td>
             <td class="gtSmartphone-only"><span>Test Major</span></td>
             <td>Opponent</td><td class="statsMapPlayed"><span>Mirage</span></td>
             <td><span class="statsDetail">{}</span></td><td class="text-center">{}</td></tr>"#,
        if first { " first" } else { "" },
        rounds,
        result
    )
}

/// Two won matches, as the unfiltered window shows them
fn all_wins_page() -> String {
    format!(
        r#"<table class="stats-table no-sort"><tbody>{}{}</tbody></table>"#,
        map_row(true, "W", "13 - 2"),
        map_row(true, "W", "13 - 5"),
    )
}

fn team_matches_page() -> String {
    format!(
        r#"<table class="stats-table no-sort"><tbody>{}{}{}{}</tbody></table>"#,
        map_row(true, "W", "13 - 9"),
        map_row(false, "W", "13 - 11"),
        map_row(true, "L", "7 - 13"),
        map_row(false, "W", "13 - 4"),
    )
}

const TEAM_EVENTS: &str = r#"<table class="stats-table"><tbody>
    <tr><td class="statsCenterText">3-4th</td><td><span>IEM Dallas 2024</span></td></tr>
    <tr><td class="statsCenterText">1st</td><td><span>ESL Pro League S19</span></td></tr>
</tbody></table>"#;

const RANKING: &str = r#"<div class="ranked-team standard-box">
    <span class="position">#1</span><span class="name">Alpha</span>
    <span class="points">(977 points)</span><div class="change">+2</div></div>"#;

const PLAYER_OVERVIEW: &str = r#"
    <div class="summaryStatBreakdownDataValue">1.21</div>
    <div class="summaryStatBreakdownDataValue">0.61</div>
    <div class="summaryStatBreakdownDataValue">74.2%</div>
    <div class="summaryStatBreakdownDataValue">1.30</div>
    <div class="summaryStatBreakdownDataValue">85.3</div>
    <div class="summaryStatBreakdownDataValue">0.82</div>
    <div class="col stats-rows standard-box">
      <div class="stats-row"><span>Total kills</span><span>1502</span></div>
      <div class="stats-row"><span>Maps played</span><span>70</span></div>
      <div class="stats-row"><span>Rounds played</span><span>1830</span></div>
    </div>"#;

const PLAYER_INDIVIDUAL: &str = r#"
    <div class="stats-row"><span>Kills</span><span>1502</span></div>
    <div class="stats-row"><span>Rifle kills</span><span>700</span></div>
    <div class="stats-row"><span>Sniper kills</span><span>600</span></div>"#;

const PLAYER_CLUTCHES: &str = r#"<div class="summary"><div class="value">7</div><div class="value">5</div></div>"#;

const PLAYER_MATCHES: &str = r#"<table class="stats-table"><tbody>
    <tr class="first"><td class="time">14/06/24</td><td><div class="match-won">13 - 9</div></td><td class="ratingPositive">1.45</td></tr>
    <tr><td class="time">14/06/24</td><td><div class="match-won">13 - 11</div></td><td class="ratingNegative">0.88</td></tr>
    <tr class="first"><td class="time">13/06/24</td><td><div class="match-lost">7 - 13</div></td><td class="ratingNegative">0.70</td></tr>
</tbody></table>"#;

/// Every page the build of the mock event asks for
fn site() -> RecordingTransport {
    let links = Links::new(BASE);
    let transport = RecordingTransport::new();
    let stats = stats_config();
    let target = target_config();

    transport.insert(links.event(EVENT), event_page());
    transport.insert(links.ranking(stats.end_time), RANKING);

    for (team, players) in teams() {
        transport.insert(links.team_lineups(&team, EVENT), lineups_page(&players));
        transport.insert(links.team_stats(&team, TeamPage::Overview, &stats, None), TEAM_OVERVIEW);
        transport.insert(links.team_stats(&team, TeamPage::Matches, &stats, None), team_matches_page());
        transport.insert(links.team_stats(&team, TeamPage::Events, &stats, None), TEAM_EVENTS);
        transport.insert(
            links.team_stats(&team, TeamPage::Matches, &target, Some(EVENT)),
            team_matches_page(),
        );

        for player in &players {
            transport.insert(links.player_stats(player, PlayerPage::Overview, &stats, None), PLAYER_OVERVIEW);
            transport.insert(links.player_stats(player, PlayerPage::Individual, &stats, None), PLAYER_INDIVIDUAL);
            transport.insert(links.player_stats(player, PlayerPage::Clutches, &stats, None), PLAYER_CLUTCHES);
            transport.insert(
                links.player_stats(player, PlayerPage::Matches, &target, Some(EVENT)),
                PLAYER_MATCHES,
            );
        }
    }
    transport
}

fn assembler(dir: &Path, transport: &RecordingTransport) -> DatasetAssembler {
    let session = Session::new(
        Fetcher::new(Box::new(transport.clone()), Duration::ZERO),
        Layout::new(dir.join("events"), dir.join("rankings")),
        Links::new(BASE),
        today(),
    );
    DatasetAssembler::new(session)
}

fn plan() -> ConfigPlan {
    ConfigPlan::Explicit(vec![stats_config()])
}

fn numeric(value: &FeatureValue) -> Option<f64> {
    value.as_f64()
}

#[test]
fn test_build_mock_event() {
    let dir = tempfile::tempdir().unwrap();
    let transport = site();
    let mut assembler = assembler(dir.path(), &transport);

    let corpus = assembler.build(&[EVENT], &plan()).unwrap();

    assert_eq!(corpus.teams.len(), 2);
    assert_eq!(corpus.players.len(), 10);
    for target in corpus.teams.column("wr_target").unwrap() {
        assert_eq!(numeric(target), Some(0.5));
    }
    for target in corpus.players.column("expected_pts_target").unwrap() {
        assert!(numeric(target).is_some());
    }

    // Broadcast event columns and the ranking join
    assert_eq!(corpus.teams.value(0, "prize_pool"), Some(&FeatureValue::Float(250_000.0)));
    assert_eq!(corpus.teams.value(0, "rank"), Some(&FeatureValue::Float(2.0)));
    assert_eq!(corpus.teams.value(0, "world_ranking"), Some(&FeatureValue::Int(1)));
    assert_eq!(corpus.teams.value(1, "world_ranking"), Some(&FeatureValue::Null));
    assert_eq!(corpus.players.value(9, "team_id"), Some(&FeatureValue::Int(102)));

    let joined = corpus.joined_players().unwrap();
    assert_eq!(joined.len(), 10);
    for target in joined.column("fantasy_target").unwrap() {
        assert!(numeric(target).is_some());
    }
}

#[test]
fn test_rebuild_is_served_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let transport = site();

    let first = assembler(dir.path(), &transport).build_event(EVENT, &plan()).unwrap();
    assert_eq!(first.attempted, 12);
    assert_eq!(first.succeeded, 12);
    assert_eq!(first.cached, 0);
    let calls = transport.total_calls();

    let second = assembler(dir.path(), &transport).build_event(EVENT, &plan()).unwrap();
    assert_eq!(second.cached, 12);
    assert_eq!(transport.total_calls(), calls);
}

#[test]
fn test_missing_page_skips_only_that_pair() {
    let dir = tempfile::tempdir().unwrap();
    let transport = site();
    // Overwrite one player's clutches page with an empty document
    let victim = Player::new(3, "a3");
    transport.insert(
        Links::new(BASE).player_stats(&victim, PlayerPage::Clutches, &stats_config(), None),
        "<html></html>",
    );

    let ledger = Database::in_memory().unwrap();
    let mut assembler = assembler(dir.path(), &transport).with_ledger(ledger);
    let audit = assembler.build_event(EVENT, &plan()).unwrap();
    assert_eq!(audit.failed, 1);
    assert_eq!(audit.succeeded, 11);

    let corpus = fantasy::data::load_dataset(&[dir.path().join("events").join(EVENT.to_string())]).unwrap();
    assert_eq!(corpus.teams.len(), 2);
    assert_eq!(corpus.players.len(), 9);
}

#[test]
fn test_malformed_event_page_rejects_event() {
    let dir = tempfile::tempdir().unwrap();
    let transport = site();
    transport.insert(
        Links::new(BASE).event(EVENT),
        event_page().replace("<tr><th>Teams</th><td>2</td></tr>", ""),
    );

    let result = assembler(dir.path(), &transport).build_event(EVENT, &plan());
    assert!(matches!(
        result,
        Err(FantasyError::InvalidEntity {
            kind: EntityKind::Event,
            ..
        })
    ));
}

#[test]
fn test_labels_ignore_stats_over_the_event_window() {
    let dir = tempfile::tempdir().unwrap();
    let transport = site();
    let links = Links::new(BASE);
    let window = target_config();

    transport.insert(links.ranking(window.end_time), RANKING);
    for (team, players) in teams() {
        transport.insert(links.team_stats(&team, TeamPage::Overview, &window, None), TEAM_OVERVIEW);
        transport.insert(links.team_stats(&team, TeamPage::Matches, &window, None), all_wins_page());
        transport.insert(links.team_stats(&team, TeamPage::Events, &window, None), TEAM_EVENTS);
        for player in &players {
            transport.insert(links.player_stats(player, PlayerPage::Overview, &window, None), PLAYER_OVERVIEW);
            transport.insert(links.player_stats(player, PlayerPage::Individual, &window, None), PLAYER_INDIVIDUAL);
            transport.insert(links.player_stats(player, PlayerPage::Clutches, &window, None), PLAYER_CLUTCHES);
        }
    }

    let mut assembler = assembler(dir.path(), &transport);
    let corpus = assembler.build(&[EVENT], &ConfigPlan::Explicit(vec![window])).unwrap();

    assert_eq!(corpus.teams.len(), 2);
    for winrate in corpus.teams.column("winrate").unwrap() {
        assert_eq!(numeric(winrate), Some(1.0));
    }
    for target in corpus.teams.column("wr_target").unwrap() {
        assert_eq!(numeric(target), Some(0.5));
    }
    let bravo = Team::new(102, "bravo");
    assert_eq!(
        transport.calls_for(&links.team_stats(&bravo, TeamPage::Matches, &window, Some(EVENT))),
        1
    );
}

#[test]
fn test_missing_lineups_page_skips_only_that_team() {
    let dir = tempfile::tempdir().unwrap();
    let transport = site();
    let links = Links::new(BASE);
    let bravo = Team::new(102, "bravo");
    transport.remove(&links.team_lineups(&bravo, EVENT));

    let ledger_path = dir.path().join("fantasy.db");
    let mut assembler = assembler(dir.path(), &transport).with_ledger(Database::open(&ledger_path).unwrap());
    let corpus = assembler.build(&[EVENT], &plan()).unwrap();

    assert_eq!(corpus.teams.len(), 1);
    assert_eq!(corpus.teams.value(0, "team_id"), Some(&FeatureValue::Int(101)));
    assert_eq!(corpus.players.len(), 5);
    assert_eq!(transport.calls_for(&links.team_stats(&bravo, TeamPage::Overview, &stats_config(), None)), 0);

    let ledger = Database::open(&ledger_path).unwrap();
    let builds = ledger.recent_builds(1).unwrap();
    assert_eq!(builds[0].status, "completed");
    let skipped = ledger.skipped(builds[0].id).unwrap();
    assert_eq!(skipped.len(), 1);
    assert_eq!(skipped[0].0, "team");
    assert_eq!(skipped[0].1, 102);
}

#[test]
fn test_rejected_event_does_not_drop_the_others() {
    let dir = tempfile::tempdir().unwrap();
    let transport = site();

    let mut assembler = assembler(dir.path(), &transport);
    let corpus = assembler.build(&[EventId(404), EVENT], &plan()).unwrap();
    assert_eq!(corpus.teams.len(), 2);
    assert_eq!(corpus.players.len(), 10);

    assert!(assembler.build(&[EventId(404)], &plan()).is_err());
}
