//! Tracker CLI - Command-line interface for the behavior tracker
//!
//! Commands:
//! - replay: Run an event script through a tracker and print the report (batch mode)
//! - run: Feed NDJSON events from stdin and print state after each (streaming mode)
//! - validate: Validate an event script
//! - log: Print a persisted behavior log
//! - config: Print or check tracker configuration
//! - doctor: Diagnose configuration and log storage

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, BufRead, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use behavior_tracker::journal::{BehaviorJournal, FileStore, LogStore, MemoryStore};
use behavior_tracker::replay::{replay_with_store, ReplayOptions};
use behavior_tracker::types::{BehaviorState, InputEvent};
use behavior_tracker::{
    BehaviorTracker, EventAdapter, TrackerConfig, TrackerError, PRODUCER_NAME, TRACKER_VERSION,
};

/// Behavior Tracker - adaptive-UI signals from raw pointer input
#[derive(Parser)]
#[command(name = "tracker")]
#[command(version = TRACKER_VERSION)]
#[command(about = "Turn scroll, click and hover events into behavior state", long_about = None)]
struct Cli {
    /// Log tracker decisions to stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an event script through a tracker and print the report (batch mode)
    Replay {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Input format
        #[arg(long, default_value = "auto")]
        input_format: InputFormat,

        /// Tracker configuration file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Include the state after every event
        #[arg(long)]
        trace: bool,

        /// Keep the clock running this many milliseconds after the last event
        #[arg(long, default_value = "0")]
        settle_ms: u64,

        /// Persist the behavior log under this directory
        #[arg(long)]
        log_dir: Option<PathBuf>,

        /// Pretty-print the report
        #[arg(long)]
        pretty: bool,
    },

    /// Feed NDJSON events from stdin and print state after each (streaming mode)
    Run {
        /// Tracker configuration file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Persist the behavior log under this directory
        #[arg(long)]
        log_dir: Option<PathBuf>,

        /// Do not flush output after each record
        #[arg(long = "no-flush", action = clap::ArgAction::SetFalse)]
        flush: bool,
    },

    /// Validate an event script
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "auto")]
        input_format: InputFormat,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print a persisted behavior log
    Log {
        /// Directory holding the log
        #[arg(long)]
        log_dir: PathBuf,

        /// Storage key of the log
        #[arg(long)]
        key: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration, or check a configuration file
    Config {
        /// Configuration file to load and validate
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Diagnose configuration and log storage
    Doctor {
        /// Check a configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Check a log directory
        #[arg(long)]
        log_dir: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// JSON array when the input starts with '[', NDJSON otherwise
    Auto,
    /// Newline-delimited JSON (one event per line)
    Ndjson,
    /// JSON array of events
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), TrackerCliError> {
    match cli.command {
        Commands::Replay {
            input,
            output,
            input_format,
            config,
            trace,
            settle_ms,
            log_dir,
            pretty,
        } => cmd_replay(
            &input,
            &output,
            input_format,
            config.as_deref(),
            ReplayOptions {
                trace,
                settle_ms,
                origin: None,
            },
            log_dir.as_deref(),
            pretty,
        ),

        Commands::Run {
            config,
            log_dir,
            flush,
        } => cmd_run(config.as_deref(), log_dir.as_deref(), flush),

        Commands::Validate {
            input,
            input_format,
            json,
        } => cmd_validate(&input, input_format, json),

        Commands::Log { log_dir, key, json } => cmd_log(&log_dir, key, json),

        Commands::Config { file } => cmd_config(file.as_deref()),

        Commands::Doctor {
            config,
            log_dir,
            json,
        } => cmd_doctor(config.as_deref(), log_dir.as_deref(), json),
    }
}

fn cmd_replay(
    input: &Path,
    output: &Path,
    input_format: InputFormat,
    config: Option<&Path>,
    options: ReplayOptions,
    log_dir: Option<&Path>,
    pretty: bool,
) -> Result<(), TrackerCliError> {
    let config = load_config(config)?;
    let events = read_events(input, input_format)?;

    if events.is_empty() {
        return Err(TrackerCliError::NoEvents);
    }

    let report = replay_with_store(&events, &config, &options, open_store(log_dir))?;

    let output_data = if pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };

    if output.to_string_lossy() == "-" {
        println!("{}", output_data);
    } else {
        fs::write(output, output_data + "\n")?;
    }

    Ok(())
}

#[derive(serde::Serialize)]
struct StateLine<'a> {
    ts: u64,
    event: &'a str,
    state: BehaviorState,
}

fn cmd_run(
    config: Option<&Path>,
    log_dir: Option<&Path>,
    flush: bool,
) -> Result<(), TrackerCliError> {
    let config = load_config(config)?;
    let mut tracker = BehaviorTracker::with_store(config, open_store(log_dir));

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut anchored = false;

    for line in stdin.lock().lines() {
        let line = line?;
        let trimmed = line.trim();

        if trimmed.is_empty() {
            continue;
        }

        let event: InputEvent = serde_json::from_str(trimmed).map_err(|e| {
            TrackerCliError::ParseError(format!("Failed to parse event: {}", e))
        })?;
        event.validate()?;

        // The first event anchors the tracker clock
        if !anchored {
            tracker = tracker.starting_at(chrono::Utc::now(), event.ts());
            anchored = true;
        }
        tracker.handle(&event);

        let record = StateLine {
            ts: tracker.now(),
            event: event.kind(),
            state: tracker.state(),
        };
        writeln!(stdout, "{}", serde_json::to_string(&record)?)?;
        if flush {
            stdout.flush()?;
        }
    }

    stdout.flush()?;
    tracker.teardown();
    Ok(())
}

fn cmd_validate(input: &Path, input_format: InputFormat, json: bool) -> Result<(), TrackerCliError> {
    let events = read_events(input, input_format)?;
    let results = EventAdapter::validate_events(&events);

    let report = ValidationReport {
        total_events: events.len(),
        valid_events: events.len() - results.len(),
        invalid_events: results.len(),
        errors: results
            .iter()
            .map(|r| ValidationErrorDetail {
                index: r.index,
                kind: r.kind.to_string(),
                ts: r.ts,
                error: r.message.clone(),
            })
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total events:   {}", report.total_events);
        println!("Valid events:   {}", report.valid_events);
        println!("Invalid events: {}", report.invalid_events);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!(
                    "  - {} at {}ms (index {}): {}",
                    err.kind, err.ts, err.index, err.error
                );
            }
        }
    }

    if report.invalid_events > 0 {
        Err(TrackerCliError::ValidationFailed(report.invalid_events))
    } else {
        Ok(())
    }
}

fn cmd_log(log_dir: &Path, key: Option<String>, json: bool) -> Result<(), TrackerCliError> {
    let key = key.unwrap_or_else(|| TrackerConfig::default().storage_key);
    let store = FileStore::new(log_dir);
    if store.read(&key)?.is_none() {
        return Err(TrackerCliError::NoLog(store.path_for(&key)));
    }

    let journal = BehaviorJournal::new(Box::new(store), key);
    let entries = journal.entries()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        println!("Behavior Log ({})", journal.key());
        println!("============");
        for entry in &entries {
            println!("  {}  {}: {}", entry.timestamp.to_rfc3339(), entry.key, entry.value);
        }
        let foreign = journal.len()? - entries.len();
        if foreign > 0 {
            println!("\n({} entries in another format skipped)", foreign);
        }
    }

    Ok(())
}

fn cmd_config(file: Option<&Path>) -> Result<(), TrackerCliError> {
    let config = load_config(file)?;
    println!("{}", config.to_json_pretty()?);
    Ok(())
}

fn cmd_doctor(
    config: Option<&Path>,
    log_dir: Option<&Path>,
    json: bool,
) -> Result<(), TrackerCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "tracker_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Tracker version {}", TRACKER_VERSION),
    });

    // Check configuration file if provided
    let mut storage_key = TrackerConfig::default().storage_key;
    if let Some(config_path) = config {
        if config_path.exists() {
            match TrackerConfig::from_file(config_path) {
                Ok(config) => {
                    checks.push(DoctorCheck {
                        name: "config".to_string(),
                        status: CheckStatus::Ok,
                        message: format!(
                            "Configuration valid (focus after {}ms, click trigger {}%)",
                            config.focus_dwell_ms, config.click_error_trigger
                        ),
                    });
                    storage_key = config.storage_key;
                }
                Err(e) => {
                    checks.push(DoctorCheck {
                        name: "config".to_string(),
                        status: CheckStatus::Error,
                        message: e.to_string(),
                    });
                }
            }
        } else {
            checks.push(DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Warning,
                message: "Configuration file does not exist, defaults apply".to_string(),
            });
        }
    }

    // Check the log directory if provided
    if let Some(dir) = log_dir {
        let store = FileStore::new(dir);
        let path = store.path_for(&storage_key);
        if !path.exists() {
            checks.push(DoctorCheck {
                name: "behavior_log".to_string(),
                status: CheckStatus::Warning,
                message: format!("No log at {} yet", path.display()),
            });
        } else {
            match fs::read_to_string(&path) {
                Ok(content) => match serde_json::from_str::<serde_json::Value>(&content) {
                    Ok(serde_json::Value::Array(items)) => checks.push(DoctorCheck {
                        name: "behavior_log".to_string(),
                        status: CheckStatus::Ok,
                        message: format!("Behavior log valid ({} entries)", items.len()),
                    }),
                    Ok(_) => checks.push(DoctorCheck {
                        name: "behavior_log".to_string(),
                        status: CheckStatus::Warning,
                        message: "Behavior log is not an array and will be overwritten"
                            .to_string(),
                    }),
                    Err(e) => checks.push(DoctorCheck {
                        name: "behavior_log".to_string(),
                        status: CheckStatus::Warning,
                        message: format!(
                            "Behavior log is not valid JSON ({}) and will be overwritten",
                            e
                        ),
                    }),
                },
                Err(e) => checks.push(DoctorCheck {
                    name: "behavior_log".to_string(),
                    status: CheckStatus::Error,
                    message: format!("Cannot read behavior log: {}", e),
                }),
            }
        }
    }

    // Check stdin is available (for streaming mode)
    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (interactive mode)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (streaming mode ready)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: TRACKER_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Tracker Doctor Report");
        println!("=====================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report.checks.iter().any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(TrackerCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

// Helper functions

fn read_input(input: &Path) -> Result<String, TrackerCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn read_events(input: &Path, format: InputFormat) -> Result<Vec<InputEvent>, TrackerCliError> {
    let data = read_input(input)?;
    let events = match format {
        InputFormat::Auto => EventAdapter::parse_auto(&data)?,
        InputFormat::Ndjson => EventAdapter::parse_ndjson(&data)?,
        InputFormat::Json => EventAdapter::parse_array(&data)?,
    };
    Ok(events)
}

fn load_config(path: Option<&Path>) -> Result<TrackerConfig, TrackerCliError> {
    match path {
        Some(path) => Ok(TrackerConfig::from_file(path)?),
        None => Ok(TrackerConfig::default()),
    }
}

fn open_store(log_dir: Option<&Path>) -> Box<dyn LogStore> {
    match log_dir {
        Some(dir) => Box::new(FileStore::new(dir)),
        None => Box::new(MemoryStore::new()),
    }
}

// Error types

#[derive(Debug)]
enum TrackerCliError {
    Io(io::Error),
    Tracker(TrackerError),
    Json(serde_json::Error),
    NoEvents,
    NoLog(PathBuf),
    ValidationFailed(usize),
    DoctorFailed,
    ParseError(String),
}

impl From<io::Error> for TrackerCliError {
    fn from(e: io::Error) -> Self {
        TrackerCliError::Io(e)
    }
}

impl From<TrackerError> for TrackerCliError {
    fn from(e: TrackerError) -> Self {
        TrackerCliError::Tracker(e)
    }
}

impl From<serde_json::Error> for TrackerCliError {
    fn from(e: serde_json::Error) -> Self {
        TrackerCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<TrackerCliError> for CliError {
    fn from(e: TrackerCliError) -> Self {
        match e {
            TrackerCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            TrackerCliError::Tracker(e) => {
                let (code, hint) = match &e {
                    TrackerError::InvalidConfig(_) => {
                        ("CONFIG_ERROR", "Run 'tracker config' to see valid defaults")
                    }
                    TrackerError::InvalidEvent(_) => {
                        ("VALIDATION_ERROR", "Run 'tracker validate' for details")
                    }
                    TrackerError::StoreError(_) | TrackerError::Io(_) => {
                        ("IO_ERROR", "Check the log directory and permissions")
                    }
                    TrackerError::ParseError(_) | TrackerError::JsonError(_) => {
                        ("PARSE_ERROR", "Events need a \"type\" and a millisecond \"ts\"")
                    }
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            TrackerCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            TrackerCliError::NoEvents => CliError {
                code: "NO_EVENTS".to_string(),
                message: "No events found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            TrackerCliError::NoLog(path) => CliError {
                code: "NO_LOG".to_string(),
                message: format!("No behavior log at {}", path.display()),
                hint: Some("Pass --log-dir to 'tracker replay' or 'tracker run' first".to_string()),
            },
            TrackerCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} events failed validation", count),
                hint: Some("Fix validation errors and retry".to_string()),
            },
            TrackerCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
            TrackerCliError::ParseError(msg) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: msg,
                hint: Some("Check input format".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    total_events: usize,
    valid_events: usize,
    invalid_events: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(serde::Serialize)]
struct ValidationErrorDetail {
    index: usize,
    kind: String,
    ts: u64,
    error: String,
}

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
