/// Database configuration and connection management
pub mod database;

/// Server settings from environment variables
pub mod server;

/// Tag catalog seeding from config.toml
pub mod tags;
