use clap::{Args, Parser, Subcommand};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use teamping::config::{AppConfig, ScanConfig};
use teamping::error::ConfigError;
use teamping::push::{InactivityWindow, MAX_WINDOW_DAYS};
use time::macros::format_description;
use time::{Time, UtcOffset};

#[allow(clippy::large_enum_variant)]
pub(crate) enum RunOutcome {
    Serve(AppConfig),
    Exit(i32),
}

pub(crate) fn run() -> RunOutcome {
    let cli = Cli::parse();
    if let Some(Command::Init(args)) = cli.command {
        let code = run_init(args);
        return RunOutcome::Exit(code);
    }

    let file = match cli.config.as_deref() {
        Some(path) => match load_file_config(path) {
            Ok(file) => file,
            Err(err) => {
                eprintln!("error: {err}");
                return RunOutcome::Exit(2);
            }
        },
        None => FileConfig::default(),
    };

    match resolve_config(cli, file) {
        Ok(config) => RunOutcome::Serve(config),
        Err(err) => {
            eprintln!("error: {err}");
            RunOutcome::Exit(2)
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "teamping",
    version,
    about = "Web push notifications and inactivity reminders for employees"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
    /// TOML file with defaults for the options below.
    #[arg(long, env = "TEAMPING_CONFIG")]
    config: Option<PathBuf>,
    #[arg(long, env = "TEAMPING_BIND")]
    bind: Option<SocketAddr>,
    /// JSON file holding the employee rows.
    #[arg(long, env = "TEAMPING_EMPLOYEES")]
    employees: Option<PathBuf>,
    #[arg(long, env = "TEAMPING_VAPID_PRIVATE_KEY")]
    vapid_private_key: Option<String>,
    #[arg(long, env = "TEAMPING_VAPID_PUBLIC_KEY")]
    vapid_public_key: Option<String>,
    #[arg(long, env = "TEAMPING_VAPID_SUBJECT")]
    vapid_subject: Option<String>,
    /// `<n>d` calendar days or `<n>w` working days.
    #[arg(long, env = "TEAMPING_INACTIVITY_WINDOW")]
    inactivity_window: Option<String>,
    /// Local time of the daily scan, `HH:MM`.
    #[arg(long, env = "TEAMPING_SCAN_AT")]
    scan_at: Option<String>,
    #[arg(long, env = "TEAMPING_UTC_OFFSET", allow_hyphen_values = true)]
    utc_offset: Option<String>,
    #[arg(long, env = "TEAMPING_REMINDER_URL")]
    reminder_url: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a fresh set of VAPID credentials.
    Init(InitArgs),
}

#[derive(Args, Debug)]
struct InitArgs {
    #[arg(long)]
    subject: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    bind: Option<SocketAddr>,
    employees: Option<PathBuf>,
    vapid_subject: Option<String>,
    inactivity_window: Option<String>,
    scan_at: Option<String>,
    utc_offset: Option<String>,
    reminder_url: Option<String>,
}

fn load_file_config(path: &Path) -> Result<FileConfig, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigError::ParseFile {
        path: path.to_path_buf(),
        source,
    })
}

fn run_init(args: InitArgs) -> i32 {
    let credentials = match teamping::generate_vapid_credentials() {
        Ok(credentials) => credentials,
        Err(err) => {
            eprintln!("failed to generate VAPID credentials: {err}");
            return 1;
        }
    };
    let (subject, show_subject_note) = match args.subject {
        Some(subject) => (subject, false),
        None => ("mailto:you@example.com".to_string(), true),
    };

    println!("VAPID credentials generated.");
    println!();
    println!("TEAMPING_VAPID_PRIVATE_KEY=\"{}\"", credentials.private_key);
    println!("TEAMPING_VAPID_PUBLIC_KEY=\"{}\"", credentials.public_key);
    println!("TEAMPING_VAPID_SUBJECT=\"{subject}\"");
    if show_subject_note {
        println!();
        println!("Note: replace TEAMPING_VAPID_SUBJECT with a contact URI you control.");
    }
    0
}

/// Command-line values win over the config file, which wins over defaults.
fn resolve_config(cli: Cli, file: FileConfig) -> Result<AppConfig, ConfigError> {
    let defaults = AppConfig::default();
    let scan_defaults = ScanConfig::default();

    let window = match cli.inactivity_window.or(file.inactivity_window) {
        Some(raw) => parse_inactivity_window(&raw)?,
        None => scan_defaults.window,
    };
    let run_at = match cli.scan_at.or(file.scan_at) {
        Some(raw) => parse_time_of_day(&raw)?,
        None => scan_defaults.run_at,
    };
    let utc_offset = match cli.utc_offset.or(file.utc_offset) {
        Some(raw) => parse_utc_offset(&raw)?,
        None => scan_defaults.utc_offset,
    };
    let reminder_url = cli
        .reminder_url
        .or(file.reminder_url)
        .unwrap_or(scan_defaults.reminder_url);

    Ok(AppConfig {
        bind: cli.bind.or(file.bind).unwrap_or(defaults.bind),
        employees: cli.employees.or(file.employees),
        vapid_private_key: cli.vapid_private_key,
        vapid_public_key: cli.vapid_public_key,
        vapid_subject: cli.vapid_subject.or(file.vapid_subject),
        scan: ScanConfig {
            window,
            run_at,
            utc_offset,
            reminder_url,
        },
    })
}

fn parse_inactivity_window(raw: &str) -> Result<InactivityWindow, ConfigError> {
    let value = raw.trim();
    let invalid = || ConfigError::InvalidWindow(value.to_string());

    let (amount, unit) = match value.chars().last() {
        Some(ch) if ch.is_ascii_alphabetic() => {
            (&value[..value.len() - 1], ch.to_ascii_lowercase())
        }
        _ => (value, 'd'),
    };
    let amount: i64 = amount.trim().parse().map_err(|_| invalid())?;
    if amount <= 0 {
        return Err(ConfigError::EmptyWindow);
    }
    let amount = u32::try_from(amount)
        .ok()
        .filter(|amount| *amount <= MAX_WINDOW_DAYS)
        .ok_or_else(invalid)?;

    match unit {
        'd' => Ok(InactivityWindow::CalendarDays(amount)),
        'w' => Ok(InactivityWindow::WorkingDays(amount)),
        _ => Err(invalid()),
    }
}

fn parse_time_of_day(raw: &str) -> Result<Time, ConfigError> {
    let value = raw.trim();
    Time::parse(value, format_description!("[hour]:[minute]"))
        .map_err(|_| ConfigError::InvalidTimeOfDay(value.to_string()))
}

fn parse_utc_offset(raw: &str) -> Result<UtcOffset, ConfigError> {
    let value = raw.trim();
    if value.eq_ignore_ascii_case("utc") || value.eq_ignore_ascii_case("z") {
        return Ok(UtcOffset::UTC);
    }
    UtcOffset::parse(
        value,
        format_description!("[offset_hour sign:mandatory]:[offset_minute]"),
    )
    .map_err(|_| ConfigError::InvalidUtcOffset(value.to_string()))
}
