pub mod builder;
pub mod config;
pub mod errors;
pub mod logging;
