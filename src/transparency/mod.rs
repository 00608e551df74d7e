//! Transparency module for the proctor agent.
//!
//! Exposes what the monitor sampled and recorded, so a candidate can see
//! exactly how much of the session was observed.

pub mod log;

// Re-export commonly used types
pub use log::{
    create_shared_log, create_shared_log_with_persistence, SharedTransparencyLog, TransparencyLog,
    TransparencyStats,
};
