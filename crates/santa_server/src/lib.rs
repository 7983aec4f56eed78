//! HTTP surface of the gift draw service.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod state;

pub use config::{Config, Settings};
pub use handlers::router;
pub use state::AppState;
