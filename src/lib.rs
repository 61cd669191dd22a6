//! Spectre - technical-analysis signal generation for crypto futures

pub mod config;
pub mod error;
pub mod services;
pub mod types;

pub use config::Config;
pub use error::{AppError, Result};
