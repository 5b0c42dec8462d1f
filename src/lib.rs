pub mod config;
pub mod error;
pub mod feeds;
pub mod models;
pub mod simulation;
pub mod sync;
pub mod telemetry;
