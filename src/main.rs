use anyhow::{Context, Result};
use chrono::{Duration, Local, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use call_screen::config::AppConfig;
use call_screen::digest::{self, DailyDigest};
use call_screen::logging::{init_logging, OperationTimer};
use call_screen::metrics::ScreeningMetrics;
use call_screen::models::{BlockedEvent, IncomingCall, Presentation, Settings};
use call_screen::normalizer::to_e164;
use call_screen::policy::ScreeningPolicy;
use call_screen::repository::{EventLog, RuleRepository};
use call_screen::service::ScreeningService;
use call_screen::validation::InputValidator;
use call_screen::{Database, EmergencyNumbers};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Extra configuration file, layered over the default locations
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decide an incoming call and log it if blocked
    Screen {
        /// Caller id as delivered by the network (omit for no caller id)
        number: Option<String>,

        /// Presentation flag: allowed, restricted, unknown or payphone
        #[arg(short, long, default_value = "allowed")]
        presentation: String,

        /// Decide only, do not write a blocked-call event
        #[arg(long)]
        dry_run: bool,
    },
    /// Add a number to the block list
    AddNumber {
        /// Number in national or international form
        number: String,

        /// Region used for numbers without a country code (defaults to the configured region)
        #[arg(short, long)]
        region: Option<String>,
    },
    /// Remove a number from the block list
    RemoveNumber {
        /// Number as listed, or any form that normalizes to it
        number: String,
    },
    /// Show the block list
    ListNumbers,
    /// Add a prefix rule
    AddPrefix {
        /// Leading digits of the national significant number
        prefix: String,

        /// Country calling code, with or without '+'; omit to match any country
        #[arg(short = 'k', long)]
        country: Option<String>,
    },
    /// Remove a prefix rule by id
    RemovePrefix {
        /// Rule id as shown by list-prefixes
        id: i64,
    },
    /// Show the prefix rules
    ListPrefixes,
    /// Show or change the screening settings
    Settings {
        /// Block callers without a usable caller id
        #[arg(long)]
        block_unknown: Option<bool>,

        /// Keep blocked calls out of the call log
        #[arg(long)]
        skip_call_log: Option<bool>,

        /// Suppress notifications for blocked calls
        #[arg(long)]
        skip_notification: Option<bool>,
    },
    /// Show blocked calls
    Events {
        /// Look back this many hours instead of since midnight
        #[arg(long)]
        hours: Option<i64>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: EventFormat,
    },
    /// Print today's digest of blocked calls
    Digest,
    /// Print the effective configuration
    ShowConfig,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum EventFormat {
    Text,
    Json,
    Csv,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    // Load configuration
    let config = AppConfig::load_with(cli.config.as_deref())?;

    // Initialize logging; the guard keeps the file writer flushing until exit
    let _log_guard = init_logging(
        Some(&config.get_log_level()),
        config.logging.file_path.as_deref().map(Path::new),
        &config.logging.format,
    )?;

    if let Err(e) = ScreeningMetrics::init() {
        debug!(error = %e, "Metrics recorder not installed");
    }

    info!("Starting call-screen");

    match cli.command {
        Commands::Screen {
            number,
            presentation,
            dry_run,
        } => screen_call(&config, open_database(&config)?, number, &presentation, dry_run).await?,
        Commands::AddNumber { number, region } => {
            add_number(&config, &open_database(&config)?, &number, region.as_deref())?;
        },
        Commands::RemoveNumber { number } => remove_number(&config, &open_database(&config)?, &number)?,
        Commands::ListNumbers => list_numbers(&open_database(&config)?)?,
        Commands::AddPrefix { prefix, country } => add_prefix(&open_database(&config)?, &prefix, country.as_deref())?,
        Commands::RemovePrefix { id } => remove_prefix(&open_database(&config)?, id)?,
        Commands::ListPrefixes => list_prefixes(&open_database(&config)?)?,
        Commands::Settings {
            block_unknown,
            skip_call_log,
            skip_notification,
        } => update_settings(&open_database(&config)?, block_unknown, skip_call_log, skip_notification)?,
        Commands::Events { hours, format } => show_events(&open_database(&config)?, hours, format).await?,
        Commands::Digest => show_digest(&config, &open_database(&config)?).await?,
        Commands::ShowConfig => show_config(&config)?,
    }

    Ok(())
}

/// Open the rule database, honouring a `DATABASE_URL` override
fn open_database(config: &AppConfig) -> Result<Database> {
    let mut database = config.database.clone();
    database.url = config.get_database_url();
    Database::from_config(&database, config.screening.default_region.clone())
        .with_context(|| format!("Failed to open the rule database at {}", database.url))
}

/// Decide one call the way the call-handling host does
async fn screen_call(
    config: &AppConfig, db: Database, number: Option<String>, presentation: &str, dry_run: bool,
) -> Result<()> {
    let presentation: Presentation = presentation.parse()?;
    let call = IncomingCall {
        caller_id: number.as_deref().map(InputValidator::sanitize_caller_id),
        presentation: Some(presentation),
    };

    let policy = ScreeningPolicy::new(Arc::new(EmergencyNumbers::new(&config.screening.emergency_numbers)));

    if dry_run {
        let snapshot = db.snapshot()?;
        let settings = db.get_settings()?;
        let decision = policy.decide_call(&call, &snapshot, &settings);
        println!("{} ({})", if decision.block { "BLOCK" } else { "ALLOW" }, decision.reason);
        return Ok(());
    }

    let db = Arc::new(db);
    let service = ScreeningService::on_current_runtime(Arc::clone(&db), db, policy)?;
    let outcome = service.screen(&call);

    println!(
        "{} ({})",
        if outcome.decision.block { "BLOCK" } else { "ALLOW" },
        outcome.decision.reason
    );
    println!("{}", serde_json::to_string_pretty(&outcome.response)?);

    if let Some(task) = outcome.event_task {
        task.await.context("Blocked-call event task failed")?;
    }

    Ok(())
}

fn add_number(config: &AppConfig, db: &Database, number: &str, region: Option<&str>) -> Result<()> {
    let region = match region {
        Some(region) => Some(InputValidator::validate_region(region)?),
        None => config.screening.default_region.clone(),
    };
    let stored = db.add_blocked_number(number, region.as_deref())?;
    println!("Blocked {}", stored.e164);
    Ok(())
}

fn remove_number(config: &AppConfig, db: &Database, number: &str) -> Result<()> {
    let e164 = to_e164(number, config.screening.default_region.as_deref()).unwrap_or_else(|| number.trim().to_string());
    if db.remove_blocked_number(&e164)? {
        println!("Unblocked {e164}");
    } else {
        warn!(number = %e164, "Number was not on the block list");
        println!("{e164} is not on the block list");
    }
    Ok(())
}

fn list_numbers(db: &Database) -> Result<()> {
    let numbers = db.list_blocked_numbers()?;
    if numbers.is_empty() {
        println!("No blocked numbers");
    }
    for number in numbers {
        println!("{}  (added {})", number.e164, number.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M"));
    }
    Ok(())
}

fn add_prefix(db: &Database, prefix: &str, country: Option<&str>) -> Result<()> {
    let rule = InputValidator::parse_prefix_rule(prefix, country)?;
    let stored = db.add_prefix_rule(rule)?;
    println!("Added prefix rule {}: {}", stored.id, stored.label());
    Ok(())
}

fn remove_prefix(db: &Database, id: i64) -> Result<()> {
    if db.remove_prefix_rule(id)? {
        println!("Removed prefix rule {id}");
    } else {
        println!("No prefix rule with id {id}");
    }
    Ok(())
}

fn list_prefixes(db: &Database) -> Result<()> {
    let rules = db.list_prefix_rules()?;
    if rules.is_empty() {
        println!("No prefix rules");
    }
    for rule in rules {
        println!("{:>4}  {}", rule.id, rule.label());
    }
    Ok(())
}

fn update_settings(
    db: &Database, block_unknown: Option<bool>, skip_call_log: Option<bool>, skip_notification: Option<bool>,
) -> Result<()> {
    let current = db.get_settings()?;
    let updated = Settings {
        block_unknown_enabled: block_unknown.unwrap_or(current.block_unknown_enabled),
        skip_call_log_on_block: skip_call_log.unwrap_or(current.skip_call_log_on_block),
        skip_notification_on_block: skip_notification.unwrap_or(current.skip_notification_on_block),
    };
    if updated != current {
        db.update_settings(&updated)?;
    }
    println!("block unknown callers: {}", updated.block_unknown_enabled);
    println!("skip call log:         {}", updated.skip_call_log_on_block);
    println!("skip notification:     {}", updated.skip_notification_on_block);
    Ok(())
}

async fn show_events(db: &Database, hours: Option<i64>, format: EventFormat) -> Result<()> {
    let since = match hours {
        Some(hours) if hours > 0 => Utc::now() - Duration::hours(hours),
        Some(hours) => anyhow::bail!("hours must be positive, got {hours}"),
        None => digest::start_of_day(&Local::now()),
    };

    let timer = OperationTimer::new("list_events");
    let events = db.events_since(since).await?;
    timer.finish();

    match format {
        EventFormat::Text => print_events(&events),
        EventFormat::Json => println!("{}", serde_json::to_string_pretty(&events)?),
        EventFormat::Csv => {
            let mut writer = csv::Writer::from_writer(std::io::stdout());
            for event in &events {
                writer.serialize(event)?;
            }
            writer.flush()?;
        },
    }
    Ok(())
}

fn print_events(events: &[BlockedEvent]) {
    if events.is_empty() {
        println!("No blocked calls");
    }
    for event in events {
        println!(
            "{}  {}",
            event.timestamp.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S"),
            event.e164.as_deref().unwrap_or(digest::UNKNOWN_CALLER)
        );
    }
}

async fn show_digest(config: &AppConfig, db: &Database) -> Result<()> {
    if !config.digest.enabled {
        info!("Daily digest is disabled");
    }

    let now = Local::now();
    match digest::todays_digest(db, &now, config.digest.max_listed).await? {
        Some(summary) => print_digest(&summary),
        None => println!("No blocked calls today"),
    }

    if config.digest.enabled {
        if let Some(next) = digest::next_run(&now, config.digest.hour, config.digest.minute) {
            println!("\nNext digest due {}", next.format("%Y-%m-%d %H:%M"));
        }
    }
    Ok(())
}

fn print_digest(summary: &DailyDigest) {
    println!("{}", summary.title());
    println!("{}", summary.body());
}

fn show_config(config: &AppConfig) -> Result<()> {
    print!("{}", serde_yaml::to_string(config).context("Failed to render configuration")?);
    Ok(())
}
