pub mod actors;
pub mod clock;
pub mod config;
pub mod logger;
pub mod models;
pub mod schedule;
