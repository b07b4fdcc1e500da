use clap::Parser;
use pier_client_core::cli::{self, Cli, CliError};
use pier_client_core::telemetry;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    if let Err(err) = telemetry::init(&cli.logging.to_config()) {
        let err = CliError::Logging(err.to_string());
        eprintln!("❌ {err}");
        std::process::exit(err.exit_code());
    }

    match cli::app::run(cli).await {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("❌ {err}");
            std::process::exit(err.exit_code());
        }
    }
}
