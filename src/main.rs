use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use upmerge::analyzer::ReportMode;
use upmerge::config::{self, CheckOptions, Config, UpmergeOptions};
use upmerge::domain::CustomerFilter;
use upmerge::git::Git2Repository;
use upmerge::merge::TempBranchToken;
use upmerge::ui;

#[derive(clap::Parser)]
#[command(
    name = "upmerge",
    version,
    about = "Merge fixes forward through newer release and customer branches"
)]
struct Args {
    #[arg(short, long, global = true, help = "Custom configuration file path")]
    config: Option<String>,

    #[arg(short, long, global = true, help = "Show debug logging")]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Merge the starting release into every newer branch, in order
    Merge(MergeArgs),
    /// Report merges that are still outstanding without changing any branch
    Check(CheckArgs),
}

#[derive(clap::Args)]
struct MergeArgs {
    #[arg(help = "Starting release (defaults to the release of the current branch)")]
    release: Option<String>,

    #[arg(long, help = "Remote holding the release branches")]
    remote: Option<String>,

    #[arg(long, help = "Merge locally without pushing")]
    no_push: bool,

    #[arg(long, conflicts_with = "all_customers", help = "Include one customer's branches")]
    customer: Option<String>,

    #[arg(long, help = "Include every customer's branches")]
    all_customers: bool,

    #[arg(long, help = "List files touched by each merge")]
    show_files: bool,

    #[arg(long, help = "Show pending commits before each merge")]
    show_details: bool,
}

#[derive(clap::Args)]
struct CheckArgs {
    #[arg(help = "Only check these branches (e.g. release/23.1 customer/acme/23.1)")]
    branches: Vec<String>,

    #[arg(long, help = "Lowest release to check")]
    release: Option<String>,

    #[arg(long, help = "Remote holding the release branches")]
    remote: Option<String>,

    #[arg(long, conflicts_with = "all_customers", help = "Include one customer's branches")]
    customer: Option<String>,

    #[arg(long, help = "Include every customer's branches")]
    all_customers: bool,

    #[arg(long, help = "Only report pairs with pending commits")]
    gate: bool,

    #[arg(long, help = "Print the report as JSON")]
    json: bool,

    #[arg(long, help = "Analyze without fetching first")]
    no_fetch: bool,
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("upmerge=debug")
    } else {
        EnvFilter::try_from_env("UPMERGE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = match config::load_config(args.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            ui::display_error(&e.to_string());
            std::process::exit(2);
        }
    };

    let repo = match Git2Repository::open(".") {
        Ok(repo) => repo,
        Err(e) => {
            ui::display_error(&format!("Git repository error: {}", e));
            std::process::exit(2);
        }
    };

    let code = match args.command {
        Command::Merge(merge) => run_merge(&repo, &config, merge),
        Command::Check(check) => run_check(&repo, &config, check)?,
    };
    std::process::exit(code);
}

fn run_merge(repo: &Git2Repository, config: &Config, args: MergeArgs) -> i32 {
    let mut options = UpmergeOptions::from_config(config);
    options.release = args.release;
    if let Some(remote) = args.remote {
        options.remote = remote;
    }
    options.push = options.push && !args.no_push;
    options.customers = CustomerFilter::from_args(args.all_customers, args.customer.as_deref());
    options.show_files |= args.show_files;
    options.show_details |= args.show_details;

    ui::display_status(&format!("Fetching from {}...", options.remote));
    match upmerge::run_upmerge(repo, &options, TempBranchToken::random()) {
        Ok(summary) => {
            ui::display_upmerge_summary(&summary);
            0
        }
        Err(e) => {
            ui::display_error(&e.to_string());
            1
        }
    }
}

fn run_check(repo: &Git2Repository, config: &Config, args: CheckArgs) -> Result<i32> {
    let mut options = CheckOptions::from_config(config);
    options.release = args.release;
    if let Some(remote) = args.remote {
        options.remote = remote;
    }
    options.customers = CustomerFilter::from_args(args.all_customers, args.customer.as_deref());
    options.branches = args.branches;
    options.mode = if args.gate {
        ReportMode::Gate
    } else {
        ReportMode::Narrate
    };
    options.fetch = options.fetch && !args.no_fetch;

    let outcome = match upmerge::run_check(repo, &options) {
        Ok(outcome) => outcome,
        Err(e) => {
            ui::display_error(&e.to_string());
            return Ok(2);
        }
    };

    if args.json {
        let json = serde_json::to_string_pretty(&outcome.report)
            .context("Cannot serialize the pending-merge report")?;
        println!("{}", json);
    } else {
        for warning in &outcome.warnings {
            ui::display_warning(warning);
        }
        ui::display_analysis(&outcome.report);
    }

    Ok(outcome.exit_code())
}
