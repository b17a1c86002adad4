use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mimalloc::MiMalloc;
use runtime::{AppConfig, CliArgs};
use std::path::{Path, PathBuf};
use std::time::Duration;

use calendar::config::CalendarConfig;
use calendar::{CalendarDeps, CalendarModule};

mod seed;
mod shutdown;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// Module section the calendar reads from `modules:`.
const CALENDAR_MODULE: &str = "calendar";

/// Calendar Server - scheduling core with reminder dispatch
#[derive(Parser, Debug)]
#[command(name = "calendar-server")]
#[command(about = "Calendar Server - scheduling core with reminder dispatch")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print current configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Dispatcher tick interval, e.g. "30s" (overrides config)
    #[arg(long, value_parser = humantime::parse_duration)]
    dispatcher_tick: Option<Duration>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Commands {
    /// Start the server
    Run {
        /// Register demo users and a shared recurring event on startup
        #[arg(long)]
        seed: bool,
    },
    /// Check configuration
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let args = CliArgs {
        config: cli.config.as_ref().map(|p| p.to_string_lossy().to_string()),
        print_config: cli.print_config,
        verbose: cli.verbose,
    };

    // Load configuration (normalized home_dir is applied inside)
    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    config.apply_cli_overrides(&args);

    let logging_config = config.logging.as_ref().cloned().unwrap_or_default();
    runtime::logging::init_logging_from_config(&logging_config, Path::new(&config.server.home_dir));
    tracing::info!("Calendar Server starting");

    if cli.print_config {
        println!("{}", config.to_yaml()?);
        return Ok(());
    }

    let calendar_config = calendar_config(&config, cli.dispatcher_tick)?;

    match cli.command.unwrap_or(Commands::Run { seed: false }) {
        Commands::Run { seed } => run_server(config, calendar_config, seed).await,
        Commands::Check => check_config(config, calendar_config),
    }
}

fn calendar_config(config: &AppConfig, tick: Option<Duration>) -> Result<CalendarConfig> {
    let mut calendar: CalendarConfig = config.module_config(CALENDAR_MODULE)?;
    if let Some(tick) = tick {
        calendar.dispatcher_tick = tick;
    }
    calendar
        .validate()
        .with_context(|| format!("invalid modules.{CALENDAR_MODULE} section"))?;
    Ok(calendar)
}

async fn run_server(config: AppConfig, calendar_config: CalendarConfig, seed: bool) -> Result<()> {
    tracing::info!("Initializing calendar module...");

    let module = CalendarModule::with_instance(
        calendar_config,
        CalendarDeps::in_memory(),
        &config.server.instance_name,
    )?;

    if seed {
        seed::seed_demo(module.api().as_ref()).await?;
    }

    let dispatcher = module.start_dispatcher();
    tracing::info!(instance = %config.server.instance_name, "Calendar Server running");

    shutdown::wait_for_shutdown().await?;

    let timeout = Duration::from_secs(config.server.shutdown_timeout_sec);
    let reason = dispatcher.stop(timeout).await?;
    tracing::info!(?reason, "Calendar Server stopped");
    Ok(())
}

fn check_config(config: AppConfig, calendar_config: CalendarConfig) -> Result<()> {
    tracing::info!("Checking configuration...");

    tracing::info!("Configuration is valid");
    println!("Configuration check passed");
    println!("Server config:");
    println!("{}", config.to_yaml()?);
    println!(
        "Calendar: dispatcher tick {}, max occurrences {}",
        humantime::format_duration(calendar_config.dispatcher_tick),
        calendar_config.max_occurrences
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use calendar::contract::client::CalendarApi;
    use std::io::Write;

    #[test]
    fn run_with_seed_and_tick_override() {
        let cli = Cli::try_parse_from([
            "calendar-server",
            "-vv",
            "--dispatcher-tick",
            "30s",
            "run",
            "--seed",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.dispatcher_tick, Some(Duration::from_secs(30)));
        assert_eq!(cli.command, Some(Commands::Run { seed: true }));
    }

    #[test]
    fn malformed_tick_is_rejected() {
        assert!(Cli::try_parse_from(["calendar-server", "--dispatcher-tick", "soon"]).is_err());
    }

    #[test]
    fn calendar_section_is_read_from_yaml() {
        let home = tempfile::tempdir().unwrap();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "server:\n  home_dir: {}\nmodules:\n  calendar:\n    dispatcher_tick: 5s\n    max_occurrences: 12\n",
            home.path().display()
        )
        .unwrap();

        let config = AppConfig::load_layered(file.path()).unwrap();
        let calendar = calendar_config(&config, None).unwrap();
        assert_eq!(calendar.dispatcher_tick, Duration::from_secs(5));
        assert_eq!(calendar.max_occurrences, 12);

        let overridden = calendar_config(&config, Some(Duration::from_secs(90))).unwrap();
        assert_eq!(overridden.dispatcher_tick, Duration::from_secs(90));
    }

    #[test]
    fn zero_tick_is_rejected() {
        let config = AppConfig::default();
        assert!(calendar_config(&config, Some(Duration::ZERO)).is_err());
    }

    #[tokio::test]
    async fn seeding_registers_demo_data() {
        let module = CalendarModule::new(CalendarConfig::default(), CalendarDeps::in_memory()).unwrap();

        seed::seed_demo(module.api().as_ref()).await.unwrap();

        let overview = module.api().list_users_with_schedules().await.unwrap();
        assert_eq!(overview.len(), 4);
        let admin = overview
            .iter()
            .find(|o| o.user.email == "admin@domain.com")
            .unwrap();
        // Parent plus four weekly occurrences.
        assert_eq!(admin.schedule.events.len(), 5);
    }
}
