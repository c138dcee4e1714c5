//! Argument parsing and command dispatch.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tollgate_gateway::config::{DEFAULT_API_URL, DEFAULT_ENTRY_PATH, DEFAULT_TIMEOUT_SECS};
use tollgate_telemetry::{DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, init_logging};
use tracing::info;
use url::Url;

use crate::client::{AppContext, CliResult, ConnectSettings, parse_url};
use crate::commands::auth::{handle_login, handle_logout, handle_whoami};
use crate::commands::request::handle_get;
use crate::commands::session::{handle_session_clear, handle_session_show};

const DEFAULT_SESSION_FILE: &str = ".tollgate/session.json";

/// Parses CLI arguments, executes the requested command, and reports the
/// outcome. Returns the process exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();
    install_logging(&cli);
    let command_name = command_label(&cli.command);

    let result = match AppContext::connect(&cli.connect_settings()) {
        Ok(ctx) => dispatch(cli.command, &ctx, cli.output).await,
        Err(err) => Err(err),
    };

    match result {
        Ok(()) => {
            info!(command = command_name, "command completed");
            0
        }
        Err(err) => {
            let exit_code = err.exit_code();
            eprintln!("error: {}", err.display_message());
            info!(command = command_name, exit_code, "command failed");
            exit_code
        }
    }
}

async fn dispatch(command: Command, ctx: &AppContext, output: OutputFormat) -> CliResult<()> {
    match command {
        Command::Login(args) => handle_login(ctx, args, output).await,
        Command::Logout => handle_logout(ctx).await,
        Command::Whoami => handle_whoami(ctx).await,
        Command::Get(args) => handle_get(ctx, args).await,
        Command::Session(SessionCommand::Show) => handle_session_show(ctx, output),
        Command::Session(SessionCommand::Clear) => handle_session_clear(ctx),
    }
}

fn install_logging(cli: &Cli) {
    let config = LoggingConfig {
        level: &cli.log_level,
        format: cli.log_format.unwrap_or_else(LogFormat::infer),
        ..LoggingConfig::default()
    };
    if let Err(err) = init_logging(&config) {
        eprintln!("warning: {err}");
    }
}

#[derive(Parser)]
#[command(name = "tollgate", about = "Session-aware client for a Tollgate API server")]
struct Cli {
    #[arg(
        long,
        global = true,
        env = "TOLLGATE_API_URL",
        value_parser = parse_url,
        default_value = DEFAULT_API_URL
    )]
    api_url: Url,
    #[arg(
        long,
        global = true,
        env = "TOLLGATE_TIMEOUT_SECS",
        default_value_t = DEFAULT_TIMEOUT_SECS
    )]
    timeout: u64,
    #[arg(
        long,
        global = true,
        env = "TOLLGATE_SESSION_FILE",
        default_value = DEFAULT_SESSION_FILE
    )]
    session_file: PathBuf,
    #[arg(
        long = "output",
        alias = "format",
        global = true,
        value_enum,
        default_value_t = OutputFormat::Table,
        help = "Select output format for commands that render structured data"
    )]
    output: OutputFormat,
    #[arg(long, global = true, env = "TOLLGATE_LOG", default_value = DEFAULT_LOG_LEVEL)]
    log_level: String,
    #[arg(long, global = true, env = "TOLLGATE_LOG_FORMAT", value_parser = parse_log_format)]
    log_format: Option<LogFormat>,
    #[command(subcommand)]
    command: Command,
}

impl Cli {
    fn connect_settings(&self) -> ConnectSettings {
        ConnectSettings {
            api_url: self.api_url.clone(),
            timeout: Duration::from_secs(self.timeout),
            session_file: self.session_file.clone(),
            location: command_location(&self.command),
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Authenticate and store the session.
    Login(LoginArgs),
    /// End the session on the server and locally.
    Logout,
    /// Show the server's view of the current user.
    Whoami,
    /// Issue an authenticated GET and print the body.
    Get(GetArgs),
    /// Inspect or reset the local session file.
    #[command(subcommand)]
    Session(SessionCommand),
}

#[derive(Subcommand)]
enum SessionCommand {
    /// Print the cached user and whether a credential is stored.
    Show,
    /// Remove the cached user and credential.
    Clear,
}

#[derive(Args)]
pub(crate) struct LoginArgs {
    #[arg(long, short = 'u', env = "TOLLGATE_USERNAME")]
    pub(crate) username: String,
    /// Prompted for when omitted.
    #[arg(long, env = "TOLLGATE_PASSWORD", hide_env_values = true)]
    pub(crate) password: Option<String>,
}

#[derive(Args)]
pub(crate) struct GetArgs {
    /// Path relative to the API URL, e.g. `/api/users`.
    pub(crate) path: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    #[default]
    Table,
    Json,
}

fn parse_log_format(input: &str) -> Result<LogFormat, String> {
    input.parse::<LogFormat>().map_err(|err| err.to_string())
}

const fn command_label(command: &Command) -> &'static str {
    match command {
        Command::Login(_) => "login",
        Command::Logout => "logout",
        Command::Whoami => "whoami",
        Command::Get(_) => "get",
        Command::Session(SessionCommand::Show) => "session_show",
        Command::Session(SessionCommand::Clear) => "session_clear",
    }
}

/// Location the gateway sees; login sits on the entry path so a rejected
/// password is not reported as an expired session.
fn command_location(command: &Command) -> String {
    match command {
        Command::Login(_) => DEFAULT_ENTRY_PATH.to_string(),
        other => format!("/{}", command_label(other)),
    }
}
