//! Small task tracker: start a task, stop it, and see how much time went into each task and each
//! day. Finished tasks are kept in a plain append-only file, so the log can be read or edited
//! without the tool.
//!

pub mod cli;
pub mod fs;
pub mod report;
pub mod session;
pub mod storage;
pub mod tracker;
pub mod utils;
