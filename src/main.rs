//! Chess winning-streak analysis CLI
//!
//! Fetches chess.com archives, imports PGN games into SQLite, and produces
//! streak and frequency reports per tracked player.

use clap::{Parser, Subcommand};
use chess_streaks::{Config, Result};

#[derive(Parser)]
#[command(name = "chess-streaks")]
#[command(about = "Winning streak analysis over chess.com game archives", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Data management commands
    Data {
        #[command(subcommand)]
        action: DataCommands,
    },
    /// Compute streaks, frequency tables, and summary statistics
    Analyze {
        /// Only analyze one player (username or display name)
        #[arg(long)]
        player: Option<String>,
        /// Time class to analyze (defaults to the configured one)
        #[arg(long)]
        time_class: Option<String>,
    },
    /// Combine per-player frequency files into one CSV
    Combine,
    /// Initialize a new project with default config
    Init,
}

#[derive(Subcommand)]
enum DataCommands {
    /// Download monthly archives from chess.com
    Sync {
        /// Only sync one player (username or display name)
        #[arg(long)]
        player: Option<String>,
        /// Use only archives already on disk (no network requests)
        #[arg(long)]
        offline: bool,
        /// Re-download months already on disk
        #[arg(long)]
        force: bool,
    },
    /// Parse downloaded archives into the database
    Import {
        /// Only import one player (username or display name)
        #[arg(long)]
        player: Option<String>,
    },
    /// Show database status
    Status,
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load or create config
    let config = if std::path::Path::new(&cli.config).exists() {
        match Config::load(&cli.config) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        Config::default()
    };

    // Run command
    let result = match cli.command {
        Commands::Data { action } => match action {
            DataCommands::Sync {
                player,
                offline,
                force,
            } => commands::data_sync(&config, player, offline, force),
            DataCommands::Import { player } => commands::data_import(&config, player),
            DataCommands::Status => commands::data_status(&config),
        },
        Commands::Analyze { player, time_class } => {
            commands::analyze(&config, player, time_class)
        }
        Commands::Combine => commands::combine(&config),
        Commands::Init => commands::init(&cli.config),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

mod commands {
    use super::*;
    use chess_streaks::classify::TimeControlClassifier;
    use chess_streaks::data::{pgn, ArchiveClient, Database};
    use chess_streaks::report::ReportWriter;
    use chess_streaks::streaks::{
        scan, DistributionSummary, FrequencyTable, RecordTable,
    };
    use chess_streaks::{ChessError, PlayerConfig, TimeClass};

    /// Players selected by an optional `--player` filter
    fn selected_players<'a>(
        config: &'a Config,
        player: &Option<String>,
    ) -> Result<Vec<&'a PlayerConfig>> {
        match player {
            Some(name) => {
                let p = config
                    .find_player(name)
                    .ok_or_else(|| ChessError::UnknownPlayer(name.clone()))?;
                Ok(vec![p])
            }
            None => Ok(config.players.iter().collect()),
        }
    }

    pub fn init(config_path: &str) -> Result<()> {
        let config = Config::default();
        config.save(config_path)?;
        println!("Created default config at {}", config_path);

        std::fs::create_dir_all(&config.data.archive_dir)?;
        std::fs::create_dir_all(&config.data.output_dir)?;
        println!(
            "Created {} and {} directories",
            config.data.archive_dir, config.data.output_dir
        );

        println!("\nNext steps:");
        println!("  1. Edit {} to customize players and paths", config_path);
        println!("  2. Run 'chess-streaks data sync' to download archives");
        println!("  3. Run 'chess-streaks data import' to build the database");
        println!("  4. Run 'chess-streaks analyze' to compute streaks");

        Ok(())
    }

    pub fn data_sync(
        config: &Config,
        player: Option<String>,
        offline: bool,
        force: bool,
    ) -> Result<()> {
        let client = ArchiveClient::new(&config.data.api_base, &config.data.archive_dir)?
            .offline_only(offline);

        if offline {
            println!("Offline mode: using archives already on disk");
        }

        for p in selected_players(config, &player)? {
            println!("Syncing archives for {}...", p.display_name);
            let downloaded = client.sync_player(&p.username, force)?;
            let valid = client.validate_player(&p.username)?;
            if valid {
                println!(
                    "  {} new file(s), archives present in {}",
                    downloaded,
                    client.player_dir(&p.username).display()
                );
            } else {
                println!("  No archives found for {}", p.username);
            }
        }
        Ok(())
    }

    pub fn data_import(config: &Config, player: Option<String>) -> Result<()> {
        let db = Database::open(&config.data.database_path)?;
        let classifier = TimeControlClassifier::load_or_default(&config.data.time_control_rules)?;
        let reports = ReportWriter::new(&config.data.output_dir)?;
        let archive_dir = std::path::Path::new(&config.data.archive_dir);

        for p in selected_players(config, &player)? {
            let dir = archive_dir.join(&p.username);
            if !dir.exists() {
                println!(
                    "No archives for {}. Run 'chess-streaks data sync' first.",
                    p.display_name
                );
                continue;
            }

            println!("Importing games for {}...", p.display_name);
            let db_player = db.get_or_create_player(p)?;

            let mut games = pgn::load_directory(&dir)?;
            pgn::sort_games(&mut games);

            let (records, import_log) = pgn::process_games(&games, &db_player, &classifier);
            let count = db.upsert_games(db_player.id, &records)?;
            let log_path = reports.write_import_log(&p.display_name, &import_log)?;

            println!("  Total games parsed:  {}", import_log.total);
            println!("  Stored in database:  {}", count);
            println!("  Skipped:             {}", import_log.skipped.len());
            println!("  Player not found:    {}", import_log.not_found.len());
            println!("  Import log:          {}", log_path.display());
        }
        Ok(())
    }

    pub fn data_status(config: &Config) -> Result<()> {
        let db = Database::open(&config.data.database_path)?;
        let stats = db.get_stats()?;

        println!("Database Status");
        println!("───────────────────────────────");
        println!("  Path:     {}", config.data.database_path);
        println!("  Players:  {}", stats.player_count);
        println!("  Games:    {}", stats.game_count);
        for (class, count) in &stats.class_counts {
            println!("    {:<10} {}", class, count);
        }
        if let (Some(earliest), Some(latest)) = (stats.earliest_game, stats.latest_game) {
            println!("  Range:    {} to {}", earliest, latest);
        }

        Ok(())
    }

    pub fn analyze(
        config: &Config,
        player: Option<String>,
        time_class: Option<String>,
    ) -> Result<()> {
        let class = match &time_class {
            Some(code) => TimeClass::from_code(code).ok_or_else(|| {
                ChessError::Config(format!("Unknown time class '{}'", code))
            })?,
            None => config.analysis_time_class()?,
        };

        let db = Database::open(&config.data.database_path)?;
        let reports = ReportWriter::new(&config.data.output_dir)?;
        let single = player.is_some();

        for p in selected_players(config, &player)? {
            println!("\nAnalyzing {} ({} games)...", p.display_name, class);
            let db_player = db.get_or_create_player(p)?;
            let games = db.get_player_games(db_player.id, Some(class))?;
            log::info!(
                "{}: {} {} games in database",
                p.display_name,
                games.len(),
                class
            );

            let table = RecordTable::from_games(&games, &p.winner_name);
            let output = scan(&table)?;

            let frequencies = match FrequencyTable::from_lengths(&output.lengths) {
                Ok(f) => f,
                Err(e) if !single => {
                    log::warn!("{}: {}", p.display_name, e);
                    continue;
                }
                Err(e) => return Err(e),
            };

            reports.write_streaks(&p.display_name, &output.lengths)?;
            reports.write_details(&p.display_name, &output.details)?;
            reports.write_frequencies(&p.display_name, &frequencies)?;

            let summary = DistributionSummary::from_table(&frequencies)?;
            println!("  Streaks found:  {}", output.lengths.len());
            println!("  Mean:           {}", summary.mean);
            println!("  Median:         {}", summary.median);
            println!("  Mode:           {}", summary.mode);
            println!("  P1:             {}", summary.p1);
            println!("  P5:             {}", summary.p5);
            println!("  Q1:             {}", summary.q1);
            println!("  Q2 (Median):    {}", summary.median);
            println!("  Q3:             {}", summary.q3);
            println!("  P99:            {}", summary.p99);
            println!("  Highest streak: {}", summary.max_value);
            println!("  Its frequency:  {}", summary.max_frequency);
        }
        Ok(())
    }

    pub fn combine(config: &Config) -> Result<()> {
        let reports = ReportWriter::new(&config.data.output_dir)?;

        let mut entries = Vec::new();
        for p in &config.players {
            match reports.read_frequencies(&p.display_name) {
                Ok(table) => entries.push((p.display_name.clone(), table)),
                Err(e) => {
                    log::warn!(
                        "No frequency file for {} ({}). Run 'chess-streaks analyze' first.",
                        p.display_name,
                        e
                    );
                }
            }
        }

        if entries.is_empty() {
            return Err(ChessError::Config(
                "No frequency files found. Run 'chess-streaks analyze' first.".to_string(),
            ));
        }

        let path = reports.write_combined(&entries)?;
        println!("Combined frequencies written to {}", path.display());
        Ok(())
    }
}
