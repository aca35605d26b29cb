//! Fantasy stats harvester CLI
//!
//! Builds event-scoped training corpora from per-entity statistics pages.

use clap::{Parser, Subcommand};
use fantasy::{Result, Settings};

#[derive(Parser)]
#[command(name = "fantasy")]
#[command(about = "Esports statistics harvester and fantasy dataset builder", long_about = None)]
struct Cli {
    /// Settings file path
    #[arg(short, long, default_value = "fantasy.toml")]
    settings: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write default settings and create data directories
    Init,
    /// Fetch, featurize and label events
    Build {
        /// Event id (repeatable)
        #[arg(long = "event", required = true)]
        events: Vec<u32>,
        /// Config stem `{start}_{end}_{event_filter}_{ranking_filter}`
        /// (repeatable); defaults to the configured windows
        #[arg(long = "config")]
        configs: Vec<String>,
    },
    /// Load persisted event directories into team and player tables
    Load {
        /// Event directories
        #[arg(required = true)]
        dirs: Vec<String>,
        /// Directory to write teams.csv, players.csv and joined.csv into
        #[arg(long)]
        csv: Option<String>,
    },
    /// Show the build ledger
    Status {
        /// Number of builds to list
        #[arg(long, default_value = "10")]
        limit: usize,
    },
    /// Fetch a fantasy game's price list as JSON
    Prices {
        /// Fantasy game id
        #[arg(long)]
        game: u32,
        /// Output JSON file
        #[arg(long)]
        out: String,
    },
    /// Pick the best affordable five-player lineup
    Pick {
        /// Prices: JSON map of name to price in thousands, or a saved fantasy page
        #[arg(long)]
        prices: String,
        /// JSON map of name to predicted points
        #[arg(long)]
        points: String,
        /// Budget in thousands
        #[arg(long, default_value = "1000")]
        budget: u32,
    },
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load or create settings
    let settings = if std::path::Path::new(&cli.settings).exists() {
        match Settings::load(&cli.settings) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("Error loading settings: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        Settings::default()
    };

    let result = match cli.command {
        Commands::Init => commands::init(&cli.settings),
        Commands::Build { events, configs } => commands::build(&settings, &events, &configs),
        Commands::Load { dirs, csv } => commands::load(&dirs, csv.as_deref()),
        Commands::Status { limit } => commands::status(&settings, limit),
        Commands::Prices { game, out } => commands::prices(&settings, game, &out),
        Commands::Pick {
            prices,
            points,
            budget,
        } => commands::pick(&prices, &points, budget),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

mod commands {
    use super::*;
    use fantasy::data::cache::{read_json, write_json};
    use fantasy::data::scrapers::fantasy::extract_prices;
    use fantasy::data::{ConfigPlan, DatasetAssembler, Database, Fetcher, Links};
    use fantasy::lineup::{Candidate, LineupPicker};
    use fantasy::pipeline::Session;
    use fantasy::{Config, EventId, FantasyError};
    use std::collections::BTreeMap;
    use std::path::Path;

    pub fn init(settings_path: &str) -> Result<()> {
        let settings = Settings::default();
        settings.save(settings_path)?;
        println!("Created default settings at {}", settings_path);

        std::fs::create_dir_all(&settings.data.events_dir)?;
        std::fs::create_dir_all(&settings.data.rankings_dir)?;
        println!(
            "Created {} and {}",
            settings.data.events_dir, settings.data.rankings_dir
        );

        println!("\nNext steps:");
        println!("  1. Edit {} to customize windows and throttle", settings_path);
        println!("  2. Run 'fantasy build --event <id>' to harvest an event");
        println!("  3. Run 'fantasy load {}/<id> --csv out' to export tables", settings.data.events_dir);

        Ok(())
    }

    pub fn build(settings: &Settings, events: &[u32], configs: &[String]) -> Result<()> {
        let plan = if configs.is_empty() {
            ConfigPlan::from_settings(settings)
        } else {
            ConfigPlan::Explicit(
                configs
                    .iter()
                    .map(|c| c.parse::<Config>())
                    .collect::<Result<Vec<_>>>()?,
            )
        };

        let ledger = Database::open(&settings.data.database_path)?;
        let mut assembler = DatasetAssembler::new(Session::from_settings(settings)?).with_ledger(ledger);

        let events: Vec<EventId> = events.iter().map(|e| EventId(*e)).collect();
        let corpus = assembler.build(&events, &plan)?;

        let session = assembler.session();
        println!("Build complete");
        println!("───────────────────────────────");
        println!("  Events:       {}", events.len());
        println!("  Team rows:    {}", corpus.teams.len());
        println!("  Player rows:  {}", corpus.players.len());
        println!("  Requests:     {}", session.fetcher.request_count());
        println!("  Cache hits:   {}", session.cache.hits());

        Ok(())
    }

    pub fn load(dirs: &[String], csv: Option<&str>) -> Result<()> {
        let corpus = fantasy::data::load_dataset(dirs)?;
        println!(
            "Loaded {} team rows and {} player rows",
            corpus.teams.len(),
            corpus.players.len()
        );

        if let Some(out) = csv {
            let out = Path::new(out);
            corpus.teams.write_csv(out.join("teams.csv"))?;
            corpus.players.write_csv(out.join("players.csv"))?;
            corpus.joined_players()?.write_csv(out.join("joined.csv"))?;
            println!("Wrote tables to {}", out.display());
        }

        Ok(())
    }

    pub fn status(settings: &Settings, limit: usize) -> Result<()> {
        let db = Database::open(&settings.data.database_path)?;
        let stats = db.get_stats()?;

        println!("Build Ledger");
        println!("───────────────────────────────");
        println!("  Path:     {}", settings.data.database_path);
        println!("  Builds:   {}", stats.build_count);
        println!("  Events:   {}", stats.event_count);
        println!("  Skipped:  {}", stats.skipped_count);
        if let Some(last) = stats.last_finished {
            println!("  Last:     {}", last);
        }

        let builds = db.recent_builds(limit)?;
        if !builds.is_empty() {
            println!();
            for build in builds {
                println!(
                    "  #{:<4} event {:<6} {:<10} {}",
                    build.id, build.event, build.status, build.audit
                );
            }
        }

        Ok(())
    }

    pub fn prices(settings: &Settings, game: u32, out: &str) -> Result<()> {
        let mut fetcher = Fetcher::from_settings(&settings.fetch)?;
        let url = Links::new(&settings.fetch.base_url).fantasy_game(game);
        let prices = extract_prices(&fetcher.fetch(&url)?)?;
        if prices.is_empty() {
            return Err(FantasyError::NoData(format!("no priced players on {}", url)));
        }
        write_json(Path::new(out), &prices)?;
        println!("Wrote {} prices to {}", prices.len(), out);
        Ok(())
    }

    pub fn pick(prices_path: &str, points_path: &str, budget: u32) -> Result<()> {
        let prices: BTreeMap<String, u32> = if prices_path.ends_with(".html") {
            extract_prices(&std::fs::read_to_string(prices_path)?)?
        } else {
            read_json(Path::new(prices_path))?
                .ok_or_else(|| FantasyError::InvalidArguments(format!("{} not found", prices_path)))?
        };
        let points: BTreeMap<String, f64> = read_json(Path::new(points_path))?
            .ok_or_else(|| FantasyError::InvalidArguments(format!("{} not found", points_path)))?;

        let candidates: Vec<Candidate> = points
            .iter()
            .filter_map(|(name, pts)| {
                let cost = prices.get(&name.to_lowercase()).copied();
                if cost.is_none() {
                    log::warn!("No price for {}, skipping", name);
                }
                cost.map(|cost| Candidate {
                    name: name.clone(),
                    points: *pts,
                    cost,
                })
            })
            .collect();

        let picker = LineupPicker {
            budget,
            ..LineupPicker::default()
        };
        let best = picker.pick(&candidates).ok_or_else(|| {
            FantasyError::NoData(format!(
                "no affordable lineup among {} priced players",
                candidates.len()
            ))
        })?;

        println!("Best Lineup");
        println!("───────────────────────────────");
        for &i in &best.picks {
            let c = &candidates[i];
            println!("  {:<16} {:>4}k {:>8.2}", c.name, c.cost, c.points);
        }
        println!("  Total: {}k, {:.2} points", best.cost, best.points);

        Ok(())
    }
}
