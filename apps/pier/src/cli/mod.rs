use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

use crate::config::{ENV_CONTEXT, ENV_EXEC_PATH, ENV_SERVER_ADDR, ENV_TOKEN, Overrides};
use crate::telemetry::{LogConfig, LogLevel};

pub mod app;
pub mod error;

pub use error::CliError;

#[derive(Parser, Debug)]
#[command(
    name = "pier",
    about = "Follow job logs and open remote shells on a Pier server",
    author,
    version
)]
pub struct Cli {
    #[command(flatten)]
    pub server: ServerArgs,

    #[command(flatten)]
    pub logging: LoggingArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ServerArgs {
    #[arg(
        long = "server",
        global = true,
        env = ENV_SERVER_ADDR,
        value_name = "ADDR",
        help = "Pier server address (defaults to https://localhost:9702)"
    )]
    pub server_addr: Option<String>,

    #[arg(
        long,
        global = true,
        env = ENV_TOKEN,
        value_name = "TOKEN",
        hide_env_values = true,
        help = "Bearer token sent with every request"
    )]
    pub token: Option<String>,

    #[arg(
        long,
        global = true,
        env = ENV_CONTEXT,
        value_name = "NAME",
        help = "Use a saved server context instead of the current one"
    )]
    pub context: Option<String>,

    #[arg(
        long = "exec-path",
        global = true,
        env = ENV_EXEC_PATH,
        value_name = "PATH",
        help = "WebSocket path of the exec endpoint"
    )]
    pub exec_path: Option<String>,

    #[arg(
        long = "tls-skip-verify",
        global = true,
        action = ArgAction::SetTrue,
        help = "Accept invalid TLS certificates (PIER_TLS_SKIP_VERIFY sets the default)"
    )]
    pub tls_skip_verify: bool,
}

impl ServerArgs {
    pub fn to_overrides(&self) -> Overrides {
        Overrides {
            server_addr: self.server_addr.clone(),
            token: self.token.clone(),
            context: self.context.clone(),
            exec_path: self.exec_path.clone(),
            tls_skip_verify: self.tls_skip_verify.then_some(true),
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct LoggingArgs {
    #[arg(
        long = "log-level",
        global = true,
        value_enum,
        env = "PIER_LOG_LEVEL",
        default_value_t = LogLevel::Warn,
        help = "Minimum log level (error, warn, info, debug, trace)"
    )]
    pub level: LogLevel,

    #[arg(
        long = "log-file",
        global = true,
        value_name = "PATH",
        env = "PIER_LOG_FILE",
        help = "Write logs to the specified file instead of stderr"
    )]
    pub file: Option<PathBuf>,
}

impl LoggingArgs {
    pub fn to_config(&self) -> LogConfig {
        LogConfig {
            level: self.level,
            file: self.file.clone(),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Stream the log of a job until it completes
    Logs(LogsArgs),
    /// Run a command in a deployment with an interactive terminal
    Exec(ExecArgs),
    /// Show the server version and protocol compatibility
    Version,
    /// Manage saved server contexts
    #[command(subcommand)]
    Context(ContextCommand),
}

#[derive(Args, Debug)]
pub struct LogsArgs {
    #[arg(value_name = "JOB_ID", help = "Identifier of the job to follow")]
    pub job_id: String,

    #[arg(
        long = "no-color",
        action = ArgAction::SetTrue,
        help = "Print log lines without terminal styling"
    )]
    pub no_color: bool,
}

#[derive(Args, Debug)]
pub struct ExecArgs {
    #[arg(value_name = "DEPLOYMENT_ID", help = "Deployment to run the command in")]
    pub deployment_id: String,

    #[arg(
        trailing_var_arg = true,
        value_name = "ARGS",
        help = "Command and arguments to run after `--` (defaults to sh)"
    )]
    pub args: Vec<String>,
}

impl ExecArgs {
    pub fn command(&self) -> Vec<String> {
        if self.args.is_empty() {
            vec!["sh".to_string()]
        } else {
            self.args.clone()
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum ContextCommand {
    /// List saved contexts
    List,
    /// Make a saved context the current one
    Use(ContextUseArgs),
    /// Create or update a context
    Set(ContextSetArgs),
    /// Delete a context
    Remove(ContextRemoveArgs),
}

#[derive(Args, Debug)]
pub struct ContextUseArgs {
    #[arg(value_name = "NAME")]
    pub name: String,
}

#[derive(Args, Debug)]
pub struct ContextSetArgs {
    #[arg(value_name = "NAME")]
    pub name: String,

    #[arg(long = "addr", value_name = "ADDR", help = "Server address for this context")]
    pub server_addr: String,

    #[arg(
        long = "context-token",
        value_name = "TOKEN",
        help = "Token stored with this context"
    )]
    pub token: Option<String>,

    #[arg(
        long = "insecure",
        action = ArgAction::SetTrue,
        help = "Skip TLS verification for this context"
    )]
    pub insecure: bool,

    #[arg(
        long = "set-current",
        action = ArgAction::SetTrue,
        help = "Make this the current context"
    )]
    pub set_current: bool,
}

#[derive(Args, Debug)]
pub struct ContextRemoveArgs {
    #[arg(value_name = "NAME")]
    pub name: String,
}
