//! Market stall backend library
//!
//! Re-exports modules for the server binary, the seeder and integration tests.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod handlers;
pub mod jobs;
pub mod repository;
pub mod seed;
pub mod state;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use state::{AppState, Repositories};
