//! docscore Server
//!
//! HTTP API and command-line entry points for the docscore service.

pub mod cli;
pub mod config;
pub mod observability;
pub mod prepare;
pub mod report;
pub mod routes;
pub mod state;
pub mod upload;

pub use cli::{Cli, Commands};
pub use config::ServerConfig;
pub use prepare::{prepare, PrepareOptions, PrepareSummary};
pub use report::build_report;
pub use routes::create_router;
pub use state::AppState;
