use std::fs::File;
use std::io::{self, BufRead, BufReader};

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use log::info;
use regex::Regex;

use finproj::{
    chart::BarSeries,
    ledger::{self, Projection},
    misc::{self, DEFAULT_DAYS},
    printing,
};

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let input: Box<dyn BufRead> = match cli.ledger_path {
        Some(path) => {
            let file = File::open(&path).unwrap_or_else(|e| {
                eprintln!("Error opening file '{}': {}", path, e);
                std::process::exit(1);
            });
            Box::new(BufReader::new(file))
        }
        None => Box::new(BufReader::new(io::stdin())),
    };

    let range = misc::projection_range(cli.begin, cli.end, cli.days).unwrap_or_else(|err| {
        eprintln!("fail building the date range: {err}");
        std::process::exit(1);
    });
    info!("projecting from {} to {}", range.start, range.end);

    let projection = match ledger::read_ledger(input).and_then(|l| l.project(&range)) {
        Ok(p) => p,
        Err(err) => {
            eprintln!("fail projecting the ledger: {err}");
            std::process::exit(1);
        }
    };

    let res = match cli.command {
        Commands::Bars(args) => {
            let Projection {
                income, expense, ..
            } = projection;
            let income = args.filter(income);
            let expense = args.filter(expense);
            printing::bars(io::stdout(), &income, &expense, args.empty, cli.fmt.into())
        }
        Commands::Accounts(args) => {
            let accounts = projection
                .accounts
                .into_iter()
                .filter(|a| matches(&args.report_query, &a.account.name))
                .collect::<Vec<_>>();
            printing::accounts(io::stdout(), &accounts, args.steps, cli.fmt.into())
        }
    };

    if let Err(err) = res {
        eprintln!("fail printing the report: {err}");
        std::process::exit(1);
    };
}

/// An empty query matches everything.
fn matches(query: &[Regex], s: &str) -> bool {
    query.is_empty() || query.iter().any(|r| r.is_match(s))
}

/// Output format of the reports
#[derive(clap::ValueEnum, Clone, Debug)]
enum Fmt {
    Tty,
    Json,
    Lisp,
}

impl From<Fmt> for printing::Fmt {
    fn from(arg: Fmt) -> Self {
        match arg {
            Fmt::Json => printing::Fmt::Json,
            Fmt::Tty => printing::Fmt::Tty,
            Fmt::Lisp => printing::Fmt::Lisp,
        }
    }
}

#[derive(Parser)]
#[command(
    author,
    about,
    long_about = None)] // Read from `Cargo.toml`
struct Cli {
    /// The JSON ledger file, stdin if missing.
    #[arg(short = 'f', long = "file")]
    ledger_path: Option<String>,

    /// First projected day, today by default.
    #[arg(short = 'b', long = "begin")]
    begin: Option<NaiveDate>,

    /// Last projected day, overrides `--days`.
    #[arg(short = 'e', long = "end")]
    end: Option<NaiveDate>,

    /// Number of days to project after `--begin`.
    #[arg(long = "days", default_value_t = DEFAULT_DAYS)]
    days: u32,

    /// Format of report to generate.
    #[arg(long = "fmt", global = true, default_value_t = Fmt::Tty, value_enum)]
    fmt: Fmt,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the daily stacked amounts of the transactions whose category
    /// matches report-query.
    #[command(alias = "bar")]
    Bars(BarsArgs),

    /// Print the projected daily balance of the accounts whose name
    /// matches report-query.
    #[command(alias = "acc")]
    Accounts(AccountsArgs),
}

#[derive(Args)]
pub struct BarsArgs {
    /// Only transactions whose category matches one of these regular
    /// expressions will be included in the report.
    report_query: Vec<Regex>,

    /// Show days where a transaction moves nothing.
    #[arg(short = 'E', long = "empty")]
    empty: bool,
}

impl BarsArgs {
    fn filter(&self, series: Vec<BarSeries>) -> Vec<BarSeries> {
        series
            .into_iter()
            .filter(|s| matches(&self.report_query, &s.transaction.transaction.category))
            .collect()
    }
}

#[derive(Args)]
pub struct AccountsArgs {
    /// Only accounts that match one of these regular expressions will be
    /// included in the report.
    report_query: Vec<Regex>,

    /// Show the balance after the outflows of each day as well as the
    /// end of day balance.
    #[arg(long = "steps")]
    steps: bool,
}
