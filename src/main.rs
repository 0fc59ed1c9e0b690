use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use apiprobe::commands::{self, Checks, RequestOptions, UsersCommand};
use apiprobe::config::Settings;
use apiprobe::http::Method;
use apiprobe::logging::{self, LogOptions};
use clap::Parser;
use serde_json::Value;

/// apiprobe - REST API test client
///
/// Send requests to a JSON API with retries, logging and response checks.
/// Every setting can also be given through its environment variable
/// (API_BASE_URL, API_TIMEOUT, API_TOKEN, ...).
///
/// Examples:
///   apiprobe users get 2 --expect-key data
///   apiprobe request POST users --json '{"name": "morpheus"}' --expect-status 201
#[derive(Parser, Debug)]
#[command(author, version = env!("APIPROBE_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    settings: Settings,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Send an arbitrary request
    Request(RequestArgs),

    /// Work with the users resource
    Users {
        #[command(subcommand)]
        command: UsersCommand,

        #[command(flatten)]
        checks: Checks,
    },

    /// Log in and print the returned token
    Login(LoginArgs),

    /// Show the effective configuration (credentials masked)
    Config,
}

#[derive(clap::Args, Debug)]
struct RequestArgs {
    /// HTTP method (GET, POST, PUT, PATCH, DELETE)
    #[arg(value_name = "METHOD")]
    method: Method,

    /// Endpoint path, joined onto the base URL
    #[arg(value_name = "ENDPOINT")]
    endpoint: String,

    /// Query parameter (repeatable)
    #[arg(long, value_name = "KEY=VALUE", value_parser = commands::parse_key_value)]
    query: Vec<(String, String)>,

    /// Extra header (repeatable)
    #[arg(long, value_name = "NAME=VALUE", value_parser = commands::parse_key_value)]
    header: Vec<(String, String)>,

    /// JSON request body
    #[arg(long, value_parser = commands::parse_json)]
    json: Option<Value>,

    /// Raw request body
    #[arg(long)]
    data: Option<String>,

    /// Timeout for this request in seconds
    #[arg(long, value_name = "SECS", value_parser = parse_secs)]
    timeout: Option<Duration>,

    #[command(flatten)]
    checks: Checks,
}

#[derive(clap::Args, Debug)]
struct LoginArgs {
    /// Account email (defaults to API_USERNAME)
    #[arg(long)]
    email: Option<String>,

    /// Account password (defaults to API_PASSWORD)
    #[arg(long)]
    password: Option<String>,

    #[command(flatten)]
    checks: Checks,
}

fn parse_secs(s: &str) -> Result<Duration, String> {
    let secs: f64 = s.parse().map_err(|_| format!("`{}` is not a number", s))?;
    if !secs.is_finite() || secs <= 0.0 {
        return Err(format!("timeout must be positive, got {}", s));
    }
    Ok(Duration::from_secs_f64(secs))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = cli.settings;

    logging::init(&LogOptions {
        level: settings.log_level.clone(),
        log_dir: settings
            .log_to_file
            .then(|| PathBuf::from(&settings.log_dir)),
    })?;

    match cli.command {
        Commands::Request(args) => {
            let options = RequestOptions {
                query: args.query,
                headers: args.header,
                json: args.json,
                data: args.data,
                timeout: args.timeout,
            };
            commands::request(&settings, args.method, &args.endpoint, options, &args.checks)?
        }
        Commands::Users { command, checks } => commands::users(&settings, &command, &checks)?,
        Commands::Login(args) => commands::login(
            &settings,
            args.email.as_deref(),
            args.password.as_deref(),
            &args.checks,
        )?,
        Commands::Config => commands::show_config(&settings)?,
    }
    Ok(())
}
