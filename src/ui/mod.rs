//! User-facing terminal output.

pub mod formatter;

pub use formatter::{
    display_analysis, display_error, display_pending_report, display_plan, display_status,
    display_step, display_success, display_upmerge_summary, display_warning,
};
