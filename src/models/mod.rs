pub mod activity;
pub mod chat;
pub mod envelope;
pub mod market;
pub mod portfolio;
pub mod position;
pub mod stats;
pub mod status;
pub mod trade;
