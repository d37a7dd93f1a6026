//! Entry points behind the command-line subcommands

pub mod orchestration;

pub use orchestration::{
    run_check, run_upmerge, run_upmerge_with_cancel, CheckOutcome, UpmergeSummary,
};
