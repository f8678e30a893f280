pub mod client;
pub mod configuration;
pub mod database;
pub mod models;
pub mod server;
pub mod telemetry;

pub use configuration::{get_configuration, Settings};
pub use server::config::{configure_app, AppState};
