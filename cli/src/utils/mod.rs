pub mod config;
pub mod templates;
