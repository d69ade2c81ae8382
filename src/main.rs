use clap::{ArgAction, Parser};
use log::{error, info, LevelFilter};
use loan_schedule::export::{write_csv, write_csv_file};
use loan_schedule::loan::*;
use loan_schedule::LoanResult;
use simple_logger::SimpleLogger;
use std::io;
use std::path::PathBuf;
use std::process;

/// Monthly amortization schedule for a fixed or income-driven loan plan
#[derive(Parser, Debug)]
#[command(name = "loan-schedule", version, about)]
struct Cli {
    /// Initial loan balance
    #[arg(long, default_value_t = 30000.)]
    principal: f64,

    /// Nominal annual interest rate in percent (6.8 means 6.8%)
    #[arg(long, default_value_t = 6.8)]
    rate: f64,

    /// Loan term in years
    #[arg(long, default_value_t = 10)]
    years: u32,

    /// Pay 10% of monthly income (capped at $1500) instead of the level payment
    #[arg(long)]
    income_driven: bool,

    /// Monthly income for the income-driven plan [default: 3000]
    #[arg(long, requires = "income_driven")]
    monthly_income: Option<f64>,

    /// Write the schedule to this CSV file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Rows to print before writing the file
    #[arg(long, default_value_t = 5)]
    preview: usize,

    /// Fail when the payment does not cover interest
    #[arg(long)]
    strict: bool,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

impl Cli {
    fn log_level(&self) -> LevelFilter {
        if self.quiet {
            return LevelFilter::Warn;
        }
        match self.verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }

    fn loan_parameters(&self) -> LoanParameters {
        if self.income_driven {
            LoanParameters::income_driven(self.principal, self.rate, self.years, self.monthly_income)
        } else {
            LoanParameters::fixed(self.principal, self.rate, self.years)
        }
    }
}

fn run(cli: &Cli) -> LoanResult<()> {
    let schedule = generate(&cli.loan_parameters())?;
    if cli.strict {
        schedule.ensure_amortizing()?;
    }
    info!(
        "{} payments, total paid ${:.2}, total interest ${:.2}, final balance ${:.2}",
        schedule.len(),
        schedule.total_paid(),
        schedule.total_interest(),
        schedule.final_balance()
    );

    match &cli.output {
        Some(path) => {
            if cli.preview >= schedule.len() {
                schedule.show_amortization();
            } else {
                for entry in schedule.head(cli.preview) {
                    println!("{}", entry);
                }
            }
            write_csv_file(&schedule, path)
        }
        None => write_csv(&schedule, io::stdout().lock()),
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = SimpleLogger::new().with_level(cli.log_level()).init() {
        eprintln!("failed to initialize logger: {}", e);
    }

    if let Err(e) = run(&cli) {
        error!("{}", e);
        process::exit(1);
    }
}

// verifies that types can implement the gated traits below
#[cfg(test)]
fn is_normal<T: Sized + Send + Sync + Unpin>() {}

#[test]
fn normal_types() {
    is_normal::<LoanParameters>();
    is_normal::<ScheduleEntry>();
    is_normal::<Schedule>();
    is_normal::<loan_schedule::LoanError>();
}

#[test]
fn cli_defaults_match_sample_run() {
    let cli = Cli::parse_from(["loan-schedule"]);
    assert_eq!(cli.loan_parameters(), LoanParameters::fixed(30000., 6.8, 10));
    assert_eq!(cli.log_level(), LevelFilter::Info);
}

#[test]
fn cli_income_driven() {
    let cli = Cli::parse_from([
        "loan-schedule",
        "--income-driven",
        "--monthly-income",
        "4200",
        "--years",
        "20",
        "-vv",
    ]);
    assert_eq!(
        cli.loan_parameters(),
        LoanParameters::income_driven(30000., 6.8, 20, Some(4200.))
    );
    assert_eq!(cli.log_level(), LevelFilter::Trace);
}

#[test]
fn cli_monthly_income_requires_income_driven() {
    assert!(Cli::try_parse_from(["loan-schedule", "--monthly-income", "4200"]).is_err());
}

#[test]
fn run_strict_rejects_negative_amortization() {
    let cli = Cli::parse_from([
        "loan-schedule",
        "--income-driven",
        "--monthly-income",
        "1000",
        "--strict",
    ]);
    assert!(matches!(
        run(&cli),
        Err(loan_schedule::LoanError::DegenerateAmortization { month: 1, .. })
    ));
}

#[test]
fn run_writes_file_after_preview() {
    let path = std::env::temp_dir().join(format!("loan_schedule_cli_{}.csv", process::id()));
    for preview in ["3", "50"] {
        let cli = Cli::parse_from([
            "loan-schedule",
            "--principal",
            "1200",
            "--rate",
            "0",
            "--years",
            "1",
            "--preview",
            preview,
            "--output",
            path.to_str().unwrap(),
        ]);
        run(&cli).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 13);
        assert_eq!(text.lines().nth(1), Some("1,100.00,0.00,100.00,1100.00"));
    }
    std::fs::remove_file(&path).unwrap();
}

#[test]
fn run_rejects_invalid_principal() {
    let cli = Cli::parse_from(["loan-schedule", "--principal", "0"]);
    assert!(matches!(
        run(&cli),
        Err(loan_schedule::LoanError::InvalidParameter { field: "principal", .. })
    ));
}

#[test]
fn cli_verify() {
    use clap::CommandFactory;
    Cli::command().debug_assert();
}
