//! CLI argument definitions for the xlsxcsv converter.

use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};
use xlsxcsv::LineEnding;

#[derive(Parser)]
#[command(
    name = "xlsxcsv",
    version,
    about = "Convert an Excel worksheet to CSV",
    long_about = "Convert one worksheet of an XLSX workbook to CSV.\n\n\
                  Each column is classified as Text, Numeric or Date from its first rows,\n\
                  and that decides how its values are quoted. When INPUT or OUTPUT is\n\
                  omitted, all settings are asked for interactively."
)]
pub struct Cli {
    /// Path to the Excel workbook (.xlsx).
    #[arg(value_name = "INPUT")]
    pub input: Option<PathBuf>,

    /// Path of the CSV file to write (created or truncated).
    #[arg(value_name = "OUTPUT")]
    pub output: Option<PathBuf>,

    /// Worksheet name (default: first worksheet).
    #[arg(long = "sheet", value_name = "NAME")]
    pub sheet: Option<String>,

    /// chrono strftime pattern for dates in data rows (default: %Y-%m-%d %H:%M:%S).
    #[arg(long = "date-format", value_name = "PATTERN")]
    pub date_format: Option<String>,

    /// Line terminator for CSV rows.
    #[arg(long = "line-ending", value_enum, default_value = "crlf")]
    pub line_ending: LineEndingArg,

    /// Prefix the output with a UTF-8 byte order mark.
    #[arg(long = "bom")]
    pub bom: bool,

    /// Write a JSON conversion report (sheet, extent, column types) to PATH.
    #[arg(long = "report", value_name = "PATH")]
    pub report: Option<PathBuf>,

    /// Increase log verbosity (-v for debug, -vv for trace).
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Only log errors.
    #[arg(short = 'q', long = "quiet")]
    pub quiet: bool,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(long = "log-format", value_enum, default_value = "pretty")]
    pub log_format: LogFormatArg,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum LineEndingArg {
    Crlf,
    Lf,
}

impl From<LineEndingArg> for LineEnding {
    fn from(arg: LineEndingArg) -> Self {
        match arg {
            LineEndingArg::Crlf => LineEnding::CrLf,
            LineEndingArg::Lf => LineEnding::Lf,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
