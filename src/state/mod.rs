/// State management module
///
/// This module handles all workflow state, including:
/// - Shared data structures (data.rs)
/// - The output tree: records, copies, deletion (store.rs)
/// - Zip export of the output tree (archive.rs)
/// - Per-reviewer navigation and selections (session.rs)

pub mod data;
pub mod store;
pub mod archive;
pub mod session;
