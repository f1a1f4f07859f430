//! Line-level AI/human authorship for git repositories.
//!
//! Authorship records are stored as git notes (`refs/notes/ai-authorship` by
//! default) and joined with `git blame` to attribute each line of a file.

pub mod authorship;
pub mod commands;
pub mod config;
pub mod error;
pub mod feature_flags;
pub mod git;
pub mod observability;
pub mod stats;
pub mod utils;
