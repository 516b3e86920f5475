use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use gcsql::commands::{
    read_instance_data, CreateRequest, Dispatcher, GetRequest, InstanceSink, RawCreateArgs, RawGetArgs,
    RawRemoveArgs, RemoveOutcome, RemoveRequest, TerminalConfirm,
};
use gcsql::config::Config;
use gcsql::gcp::auth::GcpCredentials;
use gcsql::gcp::client::GcpClient;
use gcsql::gcp::http::format_gcp_error;
use gcsql::output::{OutputFormat, Printer};
use gcsql::sql::InstanceConfig;
use gcsql::SqlError;
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Inspect, create, and delete Cloud SQL instances
#[derive(Parser, Debug)]
#[command(name = "gcsql", version, about, long_about = None)]
struct Args {
    /// GCP project to use (defaults to the config file, then gcloud)
    #[arg(short, long, global = true)]
    project: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off", global = true)]
    log_level: LogLevel,

    /// Stop waiting after this many seconds (the remote operation keeps running)
    #[arg(long, global = true)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Retrieve an instance, or list all instances in the project
    Get {
        /// Instance name; omit to list every instance
        name: Option<String>,

        /// Server-side filter expression (list only)
        #[arg(long)]
        filter: Option<String>,

        /// Page size requested from the API (list only)
        #[arg(long)]
        max_results: Option<u32>,
    },

    /// Create an instance and wait until it is ready
    Add {
        /// Instance configuration: inline JSON, @file (JSON or YAML), or - for stdin
        config: String,
    },

    /// Delete an instance and wait until it is gone
    Remove {
        /// Name of the instance to delete
        name: Option<String>,

        /// A previously retrieved instance object: inline JSON, @file, or -
        #[arg(long)]
        instance_object: Option<String>,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Print a new instance configuration for use with `add`
    ConfigInstance {
        /// Instance name
        name: String,

        #[arg(long, default_value = "MYSQL_8_0")]
        database_version: String,

        /// Machine tier
        #[arg(long, default_value = "db-f1-micro")]
        tier: String,

        #[arg(long, default_value = "us-central1")]
        region: String,
    },

    /// Show or change gcsql settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Save the default project
    SetProject { project: String },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn setup_logging(level: LogLevel) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let tracing_level = level.to_tracing_level()?;

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Warning: cannot open log file {:?}: {}", log_path, e);
            return None;
        },
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("gcsql started with log level: {:?}", level);
    tracing::info!("Log file: {:?}", log_path);

    Some(guard)
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("gcsql").join("gcsql.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".gcsql").join("gcsql.log");
    }
    PathBuf::from("gcsql.log")
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let log_guard = setup_logging(args.log_level);

    let code = match run(args).await {
        Ok(()) => 0,
        Err(err) => report(&err),
    };

    drop(log_guard);
    std::process::exit(code);
}

/// Print an error and pick the exit code for its kind
fn report(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<SqlError>() {
        Some(sql_err) => {
            tracing::error!("{}", sql_err);
            eprintln!("Error: {}", format_gcp_error(sql_err));
            sql_err.exit_code()
        },
        None => {
            eprintln!("Error: {err:?}");
            1
        },
    }
}

/// Token cancelled by Ctrl-C or by `--timeout`
fn cancellation(timeout: Option<u64>) -> CancellationToken {
    let token = CancellationToken::new();

    let on_signal = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted");
            on_signal.cancel();
        }
    });

    if let Some(secs) = timeout {
        let on_deadline = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(secs)).await;
            tracing::warn!("Timed out after {}s", secs);
            on_deadline.cancel();
        });
    }

    token
}

async fn connect(config: &Config) -> Result<GcpClient> {
    let credentials = GcpCredentials::new().await?;
    Ok(GcpClient::new(credentials, config.effective_endpoint())?)
}

async fn run(args: Args) -> Result<()> {
    let mut config = Config::load();
    let mut printer = Printer::new(std::io::stdout().lock(), args.output);

    match args.command {
        Command::Get {
            name,
            filter,
            max_results,
        } => {
            let request = GetRequest::resolve(
                RawGetArgs {
                    project: args.project,
                    name,
                    filter,
                    max_results,
                },
                &config,
            )?;
            let client = connect(&config).await?;
            let dispatcher = Dispatcher::new(&client, config.poll, cancellation(args.timeout));
            dispatcher.get(request, &mut printer).await?;
        },
        Command::Add { config: data } => {
            let instance = read_instance_data(&data)?;
            let request = CreateRequest::resolve(
                RawCreateArgs {
                    project: args.project,
                    config: Some(instance),
                },
                &config,
            )?;
            let client = connect(&config).await?;
            let dispatcher = Dispatcher::new(&client, config.poll, cancellation(args.timeout));
            let created = dispatcher.create(request).await?;
            printer.emit(&created)?;
        },
        Command::Remove {
            name,
            instance_object,
            force,
        } => {
            let instance_object = instance_object
                .as_deref()
                .map(read_instance_data)
                .transpose()?;
            let request = RemoveRequest::resolve(
                RawRemoveArgs {
                    project: args.project,
                    name,
                    instance_object,
                },
                &config,
            )?;
            let client = connect(&config).await?;
            let dispatcher = Dispatcher::new(&client, config.poll, cancellation(args.timeout));
            let outcome = dispatcher.remove(request, force, &mut TerminalConfirm).await?;
            printer.outcome(&outcome)?;
            if let RemoveOutcome::Skipped { .. } = outcome {
                tracing::info!("Nothing deleted");
            }
        },
        Command::ConfigInstance {
            name,
            database_version,
            tier,
            region,
        } => {
            let instance = InstanceConfig {
                name,
                database_version,
                tier,
                region,
            }
            .build();
            printer.emit(&instance)?;
        },
        Command::Config { action } => match action {
            ConfigAction::Show => {
                let shown = serde_json::json!({
                    "path": Config::config_path(),
                    "project_id": config.effective_project(),
                    "endpoint": config.effective_endpoint(),
                    "poll": config.poll,
                });
                println!("{}", serde_json::to_string_pretty(&shown)?);
            },
            ConfigAction::SetProject { project } => {
                config
                    .set_project(&project)
                    .context("Failed to save configuration")?;
                println!("Default project set to {}", project);
            },
        },
    }

    Ok(())
}
