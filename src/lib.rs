pub mod analyzer;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod git;
pub mod merge;
pub mod ui;
pub mod warning;

pub use cli::{run_check, run_upmerge, CheckOutcome, UpmergeSummary};
pub use error::{Result, UpmergeError};
