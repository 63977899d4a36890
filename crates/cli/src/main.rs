// ledgermatch CLI - two-ledger reconciliation from the shell

mod exit_codes;
mod recon;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};

use exit_codes::{EXIT_CONFIG, EXIT_ERROR, EXIT_EXPORT, EXIT_INPUT, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "lmatch")]
#[command(about = "Reconcile two tabular ledgers by composite key")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// More log output on stderr (-v info, -vv debug, -vvv trace)
    #[arg(long, short = 'v', action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Only print errors
    #[arg(long, short = 'q', global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a reconciliation described by a TOML config file
    #[command(after_help = "\
Dataset paths in the config are relative to the config file.

Examples:
  lmatch run gst.recon.toml
  lmatch run gst.recon.toml --json | jq .summary
  lmatch run gst.recon.toml --xlsx report.xlsx --strict")]
    Run {
        /// Path to the .recon.toml config file
        config: PathBuf,

        /// Print the JSON report to stdout
        #[arg(long)]
        json: bool,

        /// Write the JSON report to a file (overrides [output] json)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Write the xlsx report to a file (overrides [output] xlsx)
        #[arg(long)]
        xlsx: Option<PathBuf>,

        /// Exit 5 when anything is unmatched or mismatched
        #[arg(long)]
        strict: bool,
    },

    /// Reconcile two files directly, mapping columns on the command line
    #[command(after_help = "\
Each --key and --compare takes SOURCE=TARGET: a column of A and the column of B
it corresponds to. Key columns build the match key; compare columns are only
checked for equal values on matched rows.

Examples:
  lmatch compare gstr2b.xlsx purchase.csv --key 'Invoice No=Bill No' --key GSTIN='GST No'
  lmatch compare gstr2b.xlsx purchase.csv --auto --compare 'Taxable Value=Amount'
  lmatch compare books.csv bank.csv --auto --label-a Books --label-b Bank --xlsx out.xlsx")]
    Compare {
        /// Dataset A (csv, tsv, xlsx, xls, xlsb, ods)
        a: PathBuf,

        /// Dataset B
        b: PathBuf,

        /// Key column pair SOURCE=TARGET (repeatable, in key order)
        #[arg(long, value_name = "SOURCE=TARGET")]
        key: Vec<String>,

        /// Compare-only column pair SOURCE=TARGET (repeatable)
        #[arg(long, value_name = "SOURCE=TARGET")]
        compare: Vec<String>,

        /// Suggest key pairs from headers when no --key is given
        #[arg(long)]
        auto: bool,

        /// Sheet of workbook A (first sheet by default)
        #[arg(long)]
        sheet_a: Option<String>,

        /// Sheet of workbook B (first sheet by default)
        #[arg(long)]
        sheet_b: Option<String>,

        /// Display label for A
        #[arg(long)]
        label_a: Option<String>,

        /// Display label for B
        #[arg(long)]
        label_b: Option<String>,

        /// Print the JSON report to stdout
        #[arg(long)]
        json: bool,

        /// Write the JSON report to a file
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Write the xlsx report to a file
        #[arg(long)]
        xlsx: Option<PathBuf>,

        /// Exit 5 when anything is unmatched or mismatched
        #[arg(long)]
        strict: bool,
    },

    /// Suggest a column mapping from the headers of two files
    #[command(after_help = "\
Prints [[pairs]] entries ready to paste into a .recon.toml config.

Examples:
  lmatch suggest gstr2b.xlsx purchase.csv
  lmatch suggest gstr2b.xlsx purchase.csv --sheet-a B2B --json")]
    Suggest {
        /// Dataset A
        a: PathBuf,

        /// Dataset B
        b: PathBuf,

        /// Sheet of workbook A
        #[arg(long)]
        sheet_a: Option<String>,

        /// Sheet of workbook B
        #[arg(long)]
        sheet_b: Option<String>,

        /// Print the mapping as JSON instead of TOML
        #[arg(long)]
        json: bool,
    },

    /// Validate a config file without loading any data
    #[command(after_help = "\
Examples:
  lmatch validate gst.recon.toml")]
    Validate {
        /// Path to the .recon.toml config file
        config: PathBuf,
    },
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\ntarget:  ", env!("TARGET"),
        "\nbuild:   ", env!("BUILD_PROFILE"),
    )
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        log::LevelFilter::Error
    } else {
        match verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    };
    env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp(None)
        .format_target(false)
        .parse_default_env()
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);
    let quiet = cli.quiet;

    let result = match cli.command {
        Commands::Run {
            config,
            json,
            output,
            xlsx,
            strict,
        } => recon::cmd_run(
            config,
            recon::OutputArgs {
                json,
                output,
                xlsx,
                strict,
                quiet,
            },
        ),
        Commands::Compare {
            a,
            b,
            key,
            compare,
            auto,
            sheet_a,
            sheet_b,
            label_a,
            label_b,
            json,
            output,
            xlsx,
            strict,
        } => recon::cmd_compare(
            recon::CompareArgs {
                a,
                b,
                key,
                compare,
                auto,
                sheet_a,
                sheet_b,
                label_a,
                label_b,
            },
            recon::OutputArgs {
                json,
                output,
                xlsx,
                strict,
                quiet,
            },
        ),
        Commands::Suggest {
            a,
            b,
            sheet_a,
            sheet_b,
            json,
        } => recon::cmd_suggest(a, b, sheet_a, sheet_b, json),
        Commands::Validate { config } => recon::cmd_validate(config, quiet),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn general(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self { code: EXIT_CONFIG, message: msg.into(), hint: None }
    }

    pub fn input(msg: impl Into<String>) -> Self {
        Self { code: EXIT_INPUT, message: msg.into(), hint: None }
    }

    pub fn export(msg: impl Into<String>) -> Self {
        Self { code: EXIT_EXPORT, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
