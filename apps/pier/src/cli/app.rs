use std::io::{self, IsTerminal, Write};

use crate::api::{ApiClient, RequestMetadata};
use crate::cli::{Cli, Command, ContextCommand, ExecArgs, LogsArgs, ServerArgs};
use crate::cli::error::CliError;
use crate::config::{Config, ContextStore, ServerContext};
use crate::exec::ws::run_exec;
use crate::job_stream::{JobLogViewer, StreamState};
use crate::terminal::write_entry;

/// Runs one CLI invocation and returns the process exit code.
pub async fn run(cli: Cli) -> Result<i32, CliError> {
    let Cli {
        server, command, ..
    } = cli;
    match command {
        Command::Context(command) => run_context(command),
        Command::Logs(args) => run_logs(&resolve_config(&server)?, args).await,
        Command::Exec(args) => run_exec_command(&resolve_config(&server)?, args).await,
        Command::Version => run_version(&resolve_config(&server)?).await,
    }
}

fn resolve_config(server: &ServerArgs) -> Result<Config, CliError> {
    let store = ContextStore::load()?;
    let config = Config::resolve(&server.to_overrides(), &store)?;
    tracing::debug!(
        target: "pier::cli",
        server = %config.server_addr,
        context = ?config.context,
        authenticated = config.token.is_some(),
        "resolved configuration"
    );
    Ok(config)
}

async fn run_logs(config: &Config, args: LogsArgs) -> Result<i32, CliError> {
    let client = ApiClient::from_config(config)?;
    let mut viewer = JobLogViewer::new(client);
    viewer.switch_job(&args.job_id).await?;

    let color = !args.no_color && io::stdout().is_terminal();
    let mut stdout = io::stdout().lock();
    let mut write_error = None;
    let state = viewer
        .run_to_end(|entry| {
            if write_error.is_none() {
                if let Err(err) = write_entry(&mut stdout, entry, color).and_then(|()| stdout.flush()) {
                    write_error = Some(err);
                }
            }
        })
        .await;
    if let Some(err) = write_error {
        return Err(err.into());
    }

    tracing::debug!(target: "pier::cli", ?state, job_id = %args.job_id, "log stream finished");
    Ok(match state {
        StreamState::Errored => 1,
        _ => 0,
    })
}

async fn run_exec_command(config: &Config, args: ExecArgs) -> Result<i32, CliError> {
    let metadata = RequestMetadata::new(config.token.clone());
    let exit_code = run_exec(config, &metadata, &args.deployment_id, args.command()).await?;
    Ok(exit_code.unwrap_or(0))
}

async fn run_version(config: &Config) -> Result<i32, CliError> {
    let client = ApiClient::from_config(config)?;
    let info = client.get_version_info().await?;
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "client:     {}", env!("CARGO_PKG_VERSION"))?;
    writeln!(stdout, "server:     {}", info.version)?;
    if let Some(api) = info.api {
        writeln!(stdout, "api:        {} (minimum {})", api.current, api.minimum)?;
    }
    if let Some(entrypoint) = info.entrypoint {
        writeln!(
            stdout,
            "entrypoint: {} (minimum {})",
            entrypoint.current, entrypoint.minimum
        )?;
    }
    Ok(0)
}

fn run_context(command: ContextCommand) -> Result<i32, CliError> {
    let mut store = ContextStore::load()?;
    let mut stdout = io::stdout().lock();
    match command {
        ContextCommand::List => {
            if store.contexts.is_empty() {
                writeln!(stdout, "no contexts saved; add one with `pier context set`")?;
            }
            for (name, context) in &store.contexts {
                let marker = if store.current.as_deref() == Some(name.as_str()) {
                    "*"
                } else {
                    " "
                };
                writeln!(stdout, "{marker} {name}\t{}", context.server_addr)?;
            }
        }
        ContextCommand::Use(args) => {
            store.set_current(Some(args.name.clone()))?;
            store.save()?;
            writeln!(stdout, "switched to context '{}'", args.name)?;
        }
        ContextCommand::Set(args) => {
            if args.server_addr.trim().is_empty() {
                return Err(CliError::InvalidArgument("--addr must not be empty".into()));
            }
            let context = ServerContext {
                server_addr: args.server_addr,
                token: args.token.filter(|token| !token.trim().is_empty()),
                tls_skip_verify: args.insecure,
            };
            store.upsert(args.name.clone(), context, args.set_current);
            store.save()?;
            writeln!(stdout, "saved context '{}'", args.name)?;
        }
        ContextCommand::Remove(args) => {
            if store.remove(&args.name).is_none() {
                return Err(CliError::InvalidArgument(format!(
                    "context '{}' not found",
                    args.name
                )));
            }
            store.save()?;
            writeln!(stdout, "removed context '{}'", args.name)?;
        }
    }
    Ok(0)
}
