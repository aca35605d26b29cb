//! Statistics views
//!
//! A [`Config`] is a (time window, event-tier filter, opponent-rank filter)
//! tuple identifying one statistics view of an entity. Its file stem is the
//! cache key for every page and feature row fetched under it, so encoding
//! must be injective and decodable.

use crate::{FantasyError, Result, WindowSettings};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Event-tier filter accepted by the stats pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EventFilter {
    #[serde(rename = "ALL")]
    All,
    Lan,
    BigEvents,
    Majors,
}

impl EventFilter {
    pub fn code(&self) -> &'static str {
        match self {
            EventFilter::All => "ALL",
            EventFilter::Lan => "Lan",
            EventFilter::BigEvents => "BigEvents",
            EventFilter::Majors => "Majors",
        }
    }
}

impl FromStr for EventFilter {
    type Err = FantasyError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ALL" => Ok(EventFilter::All),
            "Lan" => Ok(EventFilter::Lan),
            "BigEvents" => Ok(EventFilter::BigEvents),
            "Majors" => Ok(EventFilter::Majors),
            other => Err(FantasyError::InvalidArguments(format!(
                "unknown event filter '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for EventFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Opponent world-rank filter accepted by the stats pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RankingFilter {
    #[serde(rename = "ALL")]
    All,
    Top5,
    Top10,
    Top20,
    Top30,
    Top50,
}

impl RankingFilter {
    pub fn code(&self) -> &'static str {
        match self {
            RankingFilter::All => "ALL",
            RankingFilter::Top5 => "Top5",
            RankingFilter::Top10 => "Top10",
            RankingFilter::Top20 => "Top20",
            RankingFilter::Top30 => "Top30",
            RankingFilter::Top50 => "Top50",
        }
    }
}

impl FromStr for RankingFilter {
    type Err = FantasyError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ALL" => Ok(RankingFilter::All),
            "Top5" => Ok(RankingFilter::Top5),
            "Top10" => Ok(RankingFilter::Top10),
            "Top20" => Ok(RankingFilter::Top20),
            "Top30" => Ok(RankingFilter::Top30),
            "Top50" => Ok(RankingFilter::Top50),
            other => Err(FantasyError::InvalidArguments(format!(
                "unknown ranking filter '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for RankingFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// One statistics view of an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Config {
    pub start_time: NaiveDate,
    pub end_time: NaiveDate,
    pub event_filter: EventFilter,
    pub ranking_filter: RankingFilter,
}

impl Config {
    /// Build a Config, rejecting windows that end before they start or
    /// that end after `today`
    pub fn new(
        start_time: NaiveDate,
        end_time: NaiveDate,
        event_filter: EventFilter,
        ranking_filter: RankingFilter,
        today: NaiveDate,
    ) -> Result<Self> {
        let config = Config {
            start_time,
            end_time,
            event_filter,
            ranking_filter,
        };
        config.validate(today)?;
        Ok(config)
    }

    /// An unfiltered view over an event's own dates
    pub fn event_window(start_time: NaiveDate, end_time: NaiveDate) -> Result<Self> {
        if end_time < start_time {
            return Err(FantasyError::InvalidArguments(format!(
                "window ends ({}) before it starts ({})",
                end_time, start_time
            )));
        }
        Ok(Config {
            start_time,
            end_time,
            event_filter: EventFilter::All,
            ranking_filter: RankingFilter::All,
        })
    }

    /// Window of `lookback_weeks` ending the day before the event starts
    pub fn before_event(event_start: NaiveDate, window: &WindowSettings) -> Self {
        let end_time = event_start - Duration::days(1);
        let start_time = event_start - Duration::weeks(window.lookback_weeks as i64);
        Config {
            start_time: start_time.min(end_time),
            end_time,
            event_filter: window.event_filter,
            ranking_filter: window.ranking_filter,
        }
    }

    pub fn validate(&self, today: NaiveDate) -> Result<()> {
        if self.end_time < self.start_time {
            return Err(FantasyError::InvalidArguments(format!(
                "window ends ({}) before it starts ({})",
                self.end_time, self.start_time
            )));
        }
        if self.end_time > today {
            return Err(FantasyError::InvalidArguments(format!(
                "window ends ({}) after today ({})",
                self.end_time, today
            )));
        }
        Ok(())
    }

    /// `{start}_{end}_{event_filter}_{ranking_filter}`
    pub fn stem(&self) -> String {
        format!(
            "{}_{}_{}_{}",
            self.start_time.format(DATE_FORMAT),
            self.end_time.format(DATE_FORMAT),
            self.event_filter.code(),
            self.ranking_filter.code()
        )
    }

    /// File name of the feature row stored for this view
    pub fn features_file_name(&self) -> String {
        format!("{}.json", self.stem())
    }

    /// File name of a cached page fetched under this view
    pub fn page_file_name(&self, page: &str) -> String {
        format!("{}_{}.html", page, self.stem())
    }

    /// Recover the Config from a feature file name
    pub fn from_features_file_name(name: &str) -> Result<Self> {
        let stem = name.strip_suffix(".json").ok_or_else(|| {
            FantasyError::InvalidArguments(format!("'{}' is not a feature file", name))
        })?;
        stem.parse()
    }

    /// Recover (page, Config) from a cached page file name
    pub fn from_page_file_name(name: &str) -> Result<(String, Self)> {
        let stem = name.strip_suffix(".html").ok_or_else(|| {
            FantasyError::InvalidArguments(format!("'{}' is not a page file", name))
        })?;
        let (page, rest) = stem.split_once('_').ok_or_else(|| {
            FantasyError::InvalidArguments(format!("'{}' has no page prefix", name))
        })?;
        Ok((page.to_string(), rest.parse()?))
    }

    /// Query string understood by the stats pages
    pub fn query(&self) -> String {
        format!(
            "startDate={}&endDate={}&matchType={}&rankingFilter={}",
            self.start_time.format(DATE_FORMAT),
            self.end_time.format(DATE_FORMAT),
            self.event_filter.code(),
            self.ranking_filter.code()
        )
    }
}

impl FromStr for Config {
    type Err = FantasyError;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split('_').collect();
        if parts.len() != 4 {
            return Err(FantasyError::InvalidArguments(format!(
                "expected 4 parts in '{}', found {}",
                s,
                parts.len()
            )));
        }
        let date = |text: &str| {
            NaiveDate::parse_from_str(text, DATE_FORMAT).map_err(|e| {
                FantasyError::InvalidArguments(format!("bad date '{}': {}", text, e))
            })
        };
        let config = Config {
            start_time: date(parts[0])?,
            end_time: date(parts[1])?,
            event_filter: parts[2].parse()?,
            ranking_filter: parts[3].parse()?,
        };
        if config.end_time < config.start_time {
            return Err(FantasyError::InvalidArguments(format!(
                "window ends ({}) before it starts ({})",
                config.end_time, config.start_time
            )));
        }
        Ok(config)
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.stem())
    }
}
