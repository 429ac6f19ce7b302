//! xlsxcsv CLI.

use std::fs::File;
use std::io::{self, BufRead, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use xlsxcsv::{ConversionReport, ConverterBuilder, DateFormat, SheetSelector};

mod cli;
mod logging;

use crate::cli::{Cli, LogFormatArg};
use crate::logging::{init_logging, LogConfig, LogFormat};

/// Settings for one conversion, from flags or interactive answers.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Settings {
    input: PathBuf,
    output: PathBuf,
    sheet: String,
    date_format: String,
}

fn main() {
    let cli = Cli::parse();

    let format = match cli.log_format {
        LogFormatArg::Pretty => LogFormat::Pretty,
        LogFormatArg::Compact => LogFormat::Compact,
        LogFormatArg::Json => LogFormat::Json,
    };
    init_logging(&LogConfig::from_verbosity(cli.verbose, cli.quiet).with_format(format));

    let exit_code = match run(&cli) {
        Ok(_) => {
            println!("Conversion completed successfully!");
            0
        }
        Err(error) => {
            eprintln!("Error: {error:#}");
            1
        }
    };
    std::process::exit(exit_code);
}

fn run(cli: &Cli) -> Result<ConversionReport> {
    let settings = match (&cli.input, &cli.output) {
        (Some(input), Some(output)) => Settings {
            input: input.clone(),
            output: output.clone(),
            sheet: cli.sheet.clone().unwrap_or_default(),
            date_format: cli.date_format.clone().unwrap_or_default(),
        },
        _ => {
            let stdin = io::stdin();
            let stdout = io::stdout();
            prompt_settings(cli, &mut stdin.lock(), &mut stdout.lock())?
        }
    };

    let converter = ConverterBuilder::new()
        .with_sheet_selector(SheetSelector::from_name(&settings.sheet))
        .with_date_format(DateFormat::from_pattern(&settings.date_format))
        .with_line_ending(cli.line_ending.into())
        .with_bom(cli.bom)
        .build()?;

    let report = converter.convert_path(&settings.input, &settings.output)?;

    if let Some(path) = &cli.report {
        write_report(&report, path)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
    }

    Ok(report)
}

/// Ask for every setting not given on the command line.
///
/// Blank answers for the worksheet name and the date format mean "use the default";
/// blank paths are rejected.
fn prompt_settings<R: BufRead, W: Write>(
    cli: &Cli,
    input: &mut R,
    output: &mut W,
) -> Result<Settings> {
    let excel_path = match &cli.input {
        Some(path) => path.clone(),
        None => PathBuf::from(ask(input, output, "Enter Excel file path:")?),
    };
    let csv_path = match &cli.output {
        Some(path) => path.clone(),
        None => PathBuf::from(ask(input, output, "Enter output CSV file path:")?),
    };
    if excel_path.as_os_str().is_empty() {
        bail!("Excel file path must not be empty");
    }
    if csv_path.as_os_str().is_empty() {
        bail!("Output CSV file path must not be empty");
    }

    let sheet = match &cli.sheet {
        Some(sheet) => sheet.clone(),
        None => ask(
            input,
            output,
            "Enter worksheet name (or press Enter for first worksheet):",
        )?,
    };
    let date_format = match &cli.date_format {
        Some(pattern) => pattern.clone(),
        None => ask(
            input,
            output,
            "Enter date format (e.g., '%Y-%m-%d' or press Enter for default):",
        )?,
    };

    Ok(Settings {
        input: excel_path,
        output: csv_path,
        sheet,
        date_format,
    })
}

fn ask<R: BufRead, W: Write>(input: &mut R, output: &mut W, question: &str) -> Result<String> {
    writeln!(output, "{question}")?;
    output.flush()?;

    let mut line = String::new();
    input.read_line(&mut line).context("Failed to read from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn write_report(report: &ConversionReport, path: &Path) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, report)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}
