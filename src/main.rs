//! Binary entrypoint for the stablemaster admin CLI.
//!
//! Commands work on a stored horse database while the game server is stopped
//! (sled holds an exclusive lock while a server has it open):
//! - `init` - write a starter `stablemaster.toml` and create the database
//! - `status` - record counts and backups
//! - `levels <horse>` - levels and remaining effort of one horse
//! - `inspect [horse]` - stored document of a horse, or all stored ids
//! - `top <ability> [-n N]` - leaderboard by ability
//! - `owned <owner>` - horses owned by a player
//! - `swap <a> <b>` - exchange the training of two horses
//! - `set-level <horse> <ability> <level>` - force a level
//! - `rider-speed <rider> [level]` - set or clear a rider's speed cap
//! - `backup [name]`, `backups`, `restore <id> <dest>` - database snapshots
//!
//! See the library crate docs for module-level details: `stablemaster::`.
use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use log::info;
use uuid::Uuid;

use stablemaster::config::Config;
use stablemaster::storage::backup::{BackupManager, BackupType};
use stablemaster::storage::{HorseStore, RecordStore};
use stablemaster::training::commands;
use stablemaster::training::{Ability, AbilityCurves, HorseRegistry, RiderPrefs, TrainingEngine};

#[derive(Parser)]
#[command(name = "stablemaster")]
#[command(about = "Horse training records: levels, ownership and backups")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "stablemaster.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration and create the database
    Init,
    /// Show record counts and backups
    Status,
    /// Show the levels and training progress of a horse
    Levels { horse: Uuid },
    /// Print the stored document of a horse; without an id, list stored horse ids
    Inspect { horse: Option<Uuid> },
    /// List the best trained horses for an ability (speed, jump, health)
    Top {
        ability: String,
        #[arg(short = 'n', long, default_value_t = 10)]
        count: usize,
    },
    /// List the horses a player owns
    Owned { owner: Uuid },
    /// Exchange levels and effort between two horses
    Swap { first: Uuid, second: Uuid },
    /// Force an ability level on a horse
    SetLevel { horse: Uuid, ability: String, level: u32 },
    /// Set the highest Speed level a rider rides at; omit the level to clear it
    RiderSpeed { rider: Uuid, level: Option<u32> },
    /// Create a manual backup of the database
    Backup { name: Option<String> },
    /// List backups
    Backups,
    /// Restore a backup into a directory
    Restore { id: String, destination: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if matches!(cli.command, Commands::Init) {
        init_logging(&None, cli.verbose);
        return init(&cli.config).await;
    }

    let config = Config::load(&cli.config).await?;
    init_logging(&Some(config.clone()), cli.verbose);

    match cli.command {
        // Runs before a configuration exists
        Commands::Init => {}
        Commands::Status => {
            let (registry, _) = open_registry(&config)?;
            let owned = registry.iter().filter(|h| h.owner().is_some()).count();
            let restricted = registry.iter().filter(|h| h.is_restricted_kind()).count();
            let riders = registry.store().load_riders()?.len();
            println!("Stablemaster v{}", env!("CARGO_PKG_VERSION"));
            println!("Database: {}", config.storage.db_path().display());
            println!("Horses: {} ({} owned, {} undead/skeletal)", registry.len(), owned, restricted);
            println!("Riders with preferences: {}", riders);
            let backups = backup_manager(&config)?.list_backups();
            match backups.first() {
                Some(latest) => println!(
                    "Backups: {} (latest {} at {})",
                    backups.len(),
                    latest.id,
                    latest.created_at.format("%Y-%m-%d %H:%M:%S")
                ),
                None => println!("Backups: none"),
            }
        }
        Commands::Levels { horse } => {
            let (registry, engine) = open_registry(&config)?;
            let record = registry.get(horse)?;
            println!("{}", commands::format_levels(record));
            println!("{}", commands::format_upgrades(record, &engine));
        }
        Commands::Inspect { horse } => {
            let store = HorseStore::open(config.storage.db_path())?;
            match horse {
                Some(id) => {
                    let document = store
                        .raw_document(id)?
                        .ok_or_else(|| anyhow!("Horse {} is not stored", id))?;
                    println!("{}", serde_json::to_string_pretty(&document)?);
                    println!("{}", commands::format_levels(&store.get_horse(id)?));
                }
                None => {
                    let ids = store.list_horse_ids()?;
                    for id in &ids {
                        println!("{}", id);
                    }
                    println!("{} stored horses", ids.len());
                }
            }
        }
        Commands::Top { ability, count } => {
            let ability = parse_ability(&ability)?;
            let (registry, _) = open_registry(&config)?;
            let top = commands::top_horses(&registry, ability, count);
            println!("{}", commands::format_top(&top, ability));
        }
        Commands::Owned { owner } => {
            let (registry, _) = open_registry(&config)?;
            let owned = commands::owned_horses(&registry, owner);
            println!("{}", commands::format_owned(&owned));
        }
        Commands::Swap { first, second } => {
            let (mut registry, _) = open_registry(&config)?;
            registry.swap_training_stats(first, second)?;
            registry.save_all()?;
            println!("Swapped training of {} and {}", first, second);
        }
        Commands::SetLevel { horse, ability, level } => {
            let ability = parse_ability(&ability)?;
            let (mut registry, engine) = open_registry(&config)?;
            commands::set_level(&mut registry, &engine, horse, ability, level)?;
            registry.save_all()?;
            println!("{}", commands::format_levels(registry.get(horse)?));
        }
        Commands::RiderSpeed { rider, level } => {
            let store = HorseStore::open(config.storage.db_path())?;
            let prefs = RiderPrefs {
                max_speed_level: level.filter(|l| *l > 0),
            };
            store.write_riders(&[(rider, prefs.clone())])?;
            match prefs.max_speed_level {
                Some(level) => println!("Rider {} limited to Speed level {}", rider, level),
                None => println!("Rider {} speed limit cleared", rider),
            }
        }
        Commands::Backup { name } => {
            let mut manager = backup_manager(&config)?;
            let meta = manager.create_backup(name, BackupType::Manual)?;
            println!("Backup {} written ({} bytes, sha256 {})", meta.id, meta.size_bytes, meta.checksum);
        }
        Commands::Backups => {
            let manager = backup_manager(&config)?;
            let backups = manager.list_backups();
            if backups.is_empty() {
                println!("No backups.");
            }
            for meta in backups {
                println!(
                    "{}  {:?}  {}  {} bytes{}",
                    meta.id,
                    meta.backup_type,
                    meta.created_at.format("%Y-%m-%d %H:%M:%S"),
                    meta.size_bytes,
                    if meta.verified { "  verified" } else { "" }
                );
            }
        }
        Commands::Restore { id, destination } => {
            let mut manager = backup_manager(&config)?;
            if !manager.verify_backup(&id)? {
                return Err(anyhow!("Backup {} failed checksum verification", id));
            }
            manager.restore_backup(&id, std::path::Path::new(&destination))?;
            println!("Backup {} restored into {}", id, destination);
        }
    }

    Ok(())
}

async fn init(config_path: &str) -> Result<()> {
    info!("Initializing new stablemaster configuration");
    Config::create_default(config_path).await?;
    let config = Config::load(config_path).await?;
    HorseStore::open(config.storage.db_path())?;
    info!(
        "Configuration written to {}, database at {}",
        config_path,
        config.storage.db_path().display()
    );
    Ok(())
}

fn parse_ability(text: &str) -> Result<Ability> {
    Ability::parse(text).ok_or_else(|| anyhow!("Unknown ability '{}' (expected speed, jump or health)", text))
}

fn open_registry(config: &Config) -> Result<(HorseRegistry, TrainingEngine)> {
    let curves: AbilityCurves = config.build_curves()?;
    let store = HorseStore::open(config.storage.db_path())?;
    let mut registry = HorseRegistry::new(Box::new(store));
    registry.load_all()?;
    Ok((registry, TrainingEngine::new(curves, config.training.clone())))
}

fn backup_manager(config: &Config) -> Result<BackupManager> {
    Ok(BackupManager::new(
        config.storage.db_path(),
        config.storage.backup_path(),
        config.backup.retention.clone(),
    )?)
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // CLI verbosity overrides the configured level
    let base_level = match verbosity {
        0 => config
            .as_ref()
            .and_then(|cfg| cfg.logging.level.parse::<log::LevelFilter>().ok())
            .unwrap_or(log::LevelFilter::Info),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);

    let log_file = config
        .as_ref()
        .and_then(|cfg| cfg.logging.file.as_ref())
        .and_then(|file| std::fs::OpenOptions::new().create(true).append(true).open(file).ok());

    if let Some(f) = log_file {
        let write_mutex = std::sync::Arc::new(std::sync::Mutex::new(f));
        // Echo to the console only when attached to a terminal
        let is_tty = atty::is(atty::Stream::Stdout);
        builder.format(move |fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            let line = format!("{} [{}] {}", ts, record.level(), record.args());
            if let Ok(mut guard) = write_mutex.lock() {
                let _ = writeln!(guard, "{}", line);
            }
            if is_tty {
                writeln!(fmt, "{}", line)
            } else {
                Ok(())
            }
        });
    } else {
        builder.format(|fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            writeln!(fmt, "{} [{}] {}", ts, record.level(), record.args())
        });
    }
    let _ = builder.try_init();
}
