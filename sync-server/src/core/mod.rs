//! Core infrastructure: config, errors, logging, state, server, tasks

pub mod config;
pub mod error;
pub mod logger;
pub mod server;
pub mod state;
pub mod tasks;

pub use config::Config;
pub use error::{AppError, AppResponse, ok};
pub use server::Server;
pub use state::AppState;

pub type AppResult<T> = Result<T, AppError>;
