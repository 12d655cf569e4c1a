pub mod config;
pub mod error;
pub mod integrations;
pub mod logging;
pub mod sync;
pub mod utils;
