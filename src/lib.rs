//! xlsxcsv - Pure-Rust Excel worksheet to CSV converter
//!
//! This crate reads one worksheet of an Excel workbook (XLSX) and writes it as
//! CSV. Each column is classified from a sample of its rows as Text, Numeric
//! or Date, and that classification decides how every cell of the column is
//! quoted, so values such as ZIP codes keep their leading zeros.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use xlsxcsv::ConverterBuilder;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Create a converter with default settings
//!     let converter = ConverterBuilder::new().build()?;
//!
//!     // Convert the first worksheet of example.xlsx into output.csv
//!     let report = converter.convert_path("example.xlsx", "output.csv")?;
//!     println!("{}: {} rows", report.sheet, report.rows);
//!
//!     Ok(())
//! }
//! ```
//!
//! For in-memory conversion, use `Cursor`:
//!
//! ```rust,no_run
//! use std::io::Cursor;
//! use xlsxcsv::ConverterBuilder;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let converter = ConverterBuilder::new().build()?;
//! let excel_data: Vec<u8> = vec![]; // Your Excel file bytes
//! let mut csv_output = Vec::new();
//! converter.convert(Cursor::new(excel_data), &mut csv_output)?;
//! # Ok(())
//! # }
//! ```
//!
//! # Custom Configuration
//!
//! ```rust,no_run
//! use xlsxcsv::{ConverterBuilder, DateFormat, LineEnding, SheetSelector};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let converter = ConverterBuilder::new()
//!         .with_sheet_selector(SheetSelector::Name("Data".to_string()))
//!         .with_date_format(DateFormat::Custom("%Y年%m月%d日".to_string()))
//!         .with_line_ending(LineEnding::Lf)
//!         .with_bom(true)
//!         .build()?;
//!
//!     converter.convert_path("example.xlsx", "output.csv")?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Quoting Rules
//!
//! * The header row (row 1) is written verbatim and never quoted.
//! * Text columns, and any value with a leading zero such as `01234`, are
//!   quoted with embedded `"` doubled.
//! * Date columns are quoted without escaping.
//! * Numeric columns are written unquoted.

mod api;
mod builder;
mod classify;
mod error;
mod format;
mod formatter;
mod output;
mod parser;
mod security;
mod types;

// 公開API
pub use api::{ColumnType, DateFormat, LineEnding, SheetSelector};
pub use builder::{ConversionReport, Converter, ConverterBuilder};
pub use classify::{classify_columns, has_leading_zeros, sample_row_limit, MAX_SAMPLE_ROWS};
pub use error::XlsxToCsvError;
pub use output::write_csv;
pub use types::{Cell, CellValue, ColumnTypes, SheetGrid, Worksheet};
