pub mod state;
pub mod synchronizer;

pub use state::LiveState;
pub use synchronizer::{SyncHandle, Synchronizer};
