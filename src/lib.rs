pub mod api;
pub mod client;
pub mod config;
pub mod dispatch;
pub mod registry;
pub mod types;

pub use config::Config;
pub use types::*;
