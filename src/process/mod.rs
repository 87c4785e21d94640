//! Background process lifecycle.
//!
//! Runners that start server-like processes register them with a
//! [`ProcessTracker`]. Cleanup terminates the whole process tree rooted at
//! each tracked pid, leaves first, then sweeps the tracked ports for
//! processes that escaped the tree. Deciding *when* to clean up stays with
//! the runner.

pub mod table;
pub mod tracker;

pub use table::{matches_kind, ProcessInfo, ProcessTable, Signal, SystemProcessTable};
pub use tracker::{
    termination_order, AsyncProcess, CleanupOutcome, ProcessTracker, DEFAULT_CLEANUP_TIMEOUT,
};
