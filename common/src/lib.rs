//! Process-level plumbing shared by the binaries in this workspace.

pub mod logger;
