pub mod latency;
pub mod summary;
