pub mod http;
pub mod simulated;
pub mod source;

pub use source::DataSource;
