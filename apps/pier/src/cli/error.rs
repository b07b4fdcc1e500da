use std::io;

use thiserror::Error;

use crate::api::ApiError;
use crate::config::ConfigError;
use crate::exec::ExecError;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Api(#[from] ApiError),
    #[error("{0}")]
    Exec(#[from] ExecError),
    #[error("{0}")]
    Config(#[from] ConfigError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("logging initialization failed: {0}")]
    Logging(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl CliError {
    /// Process exit code for a failed command.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::InvalidArgument(_) => 2,
            CliError::Exec(ExecError::EmptyArgs | ExecError::EmptyDeployment) => 2,
            CliError::Api(ApiError::InvalidRequest(_)) => 2,
            _ => 1,
        }
    }
}
