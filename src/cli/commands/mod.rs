//! CLI command implementations.

mod cache;
mod config;
mod doctor;
mod fetch;
mod play;
mod serve;

pub use cache::run_cache;
pub use config::run_config;
pub use doctor::run_doctor;
pub use fetch::{run_fetch, FetchArgs};
pub use play::{run_play, PlayArgs};
pub use serve::run_serve;
