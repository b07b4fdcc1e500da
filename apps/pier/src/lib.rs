pub mod api;
pub mod cli;
pub mod config;
pub mod exec;
pub mod job_stream;
pub mod telemetry;
pub mod terminal;
