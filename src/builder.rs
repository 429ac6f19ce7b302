//! Builder Module
//!
//! 変換設定を段階的に構築する`ConverterBuilder`と、変換処理のファサードである
//! `Converter`を提供するモジュール。

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, Write};
use std::path::Path;

use chrono::format::{Item, StrftimeItems};
use serde::Serialize;

use crate::api::{ColumnType, DateFormat, LineEnding, SheetSelector};
use crate::classify::{classify_columns, sample_row_limit};
use crate::error::XlsxToCsvError;
use crate::output::write_csv;
use crate::parser::WorkbookParser;
use crate::security::SecurityConfig;
use crate::types::{ColumnTypes, SheetGrid, Worksheet};

/// UTF-8のバイトオーダーマーク
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// 変換設定（内部用）
///
/// `ConverterBuilder`で構築され、`Converter`に渡されます。
/// 構築後は変更されません。
#[derive(Debug, Clone)]
pub(crate) struct ConversionConfig {
    /// 変換対象のシート
    pub sheet_selector: SheetSelector,

    /// データ行の日付・時刻の出力形式
    pub date_format: DateFormat,

    /// 行末の改行コード
    pub line_ending: LineEnding,

    /// 出力の先頭にUTF-8 BOMを書き込むかどうか
    pub include_bom: bool,

    /// 入力に対する資源制限
    pub security: SecurityConfig,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            sheet_selector: SheetSelector::First,
            date_format: DateFormat::Standard,
            line_ending: LineEnding::CrLf,
            include_bom: false,
            security: SecurityConfig::default(),
        }
    }
}

/// 変換結果の概要
///
/// どのシートを何行何列変換し、各列をどの型に分類したかを保持します。
/// `serde`でシリアライズできるため、CLIはこれをJSONとして書き出せます。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversionReport {
    /// 変換したシート名
    pub sheet: String,

    /// 出力した行数（ヘッダー行を含む）
    pub rows: usize,

    /// 出力した列数
    pub columns: usize,

    /// 列の型（列順）
    pub column_types: Vec<ColumnType>,
}

/// 変換設定を段階的に構築するビルダー
///
/// # 使用例
///
/// ```rust,no_run
/// use xlsxcsv::{ConverterBuilder, DateFormat, LineEnding, SheetSelector};
///
/// # fn main() -> Result<(), xlsxcsv::XlsxToCsvError> {
/// let converter = ConverterBuilder::new()
///     .with_sheet_selector(SheetSelector::Name("Data".to_string()))
///     .with_date_format(DateFormat::Custom("%Y/%m/%d".to_string()))
///     .with_line_ending(LineEnding::Lf)
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct ConverterBuilder {
    config: ConversionConfig,
}

impl ConverterBuilder {
    /// デフォルト設定でビルダーを生成
    ///
    /// * シート: 最初のシート
    /// * 日付形式: `%Y-%m-%d %H:%M:%S`
    /// * 改行コード: CRLF
    /// * BOM: なし
    pub fn new() -> Self {
        Self::default()
    }

    /// 変換対象のシートを指定
    ///
    /// # 引数
    ///
    /// * `selector` - シート選択方式
    pub fn with_sheet_selector(mut self, selector: SheetSelector) -> Self {
        self.config.sheet_selector = selector;
        self
    }

    /// データ行の日付・時刻の出力形式を指定
    ///
    /// ヘッダー行には適用されません。
    pub fn with_date_format(mut self, format: DateFormat) -> Self {
        self.config.date_format = format;
        self
    }

    /// 行末の改行コードを指定
    pub fn with_line_ending(mut self, line_ending: LineEnding) -> Self {
        self.config.line_ending = line_ending;
        self
    }

    /// 出力の先頭にUTF-8 BOMを書き込むかどうかを指定
    pub fn with_bom(mut self, include: bool) -> Self {
        self.config.include_bom = include;
        self
    }

    /// 入力ファイルのサイズ上限（バイト）を指定
    pub fn with_max_input_size(mut self, bytes: u64) -> Self {
        self.config.security.max_input_file_size = bytes;
        self
    }

    /// 設定を検証して`Converter`を生成
    ///
    /// # 戻り値
    ///
    /// * `Ok(Converter)` - 設定が有効な場合
    /// * `Err(XlsxToCsvError::Config)` - カスタム日付形式が空、または
    ///   不正な書式指定子を含む場合
    ///
    /// # 使用例
    ///
    /// ```rust
    /// use xlsxcsv::{ConverterBuilder, DateFormat};
    ///
    /// let result = ConverterBuilder::new()
    ///     .with_date_format(DateFormat::Custom("%Y-%m-%d".to_string()))
    ///     .build();
    /// assert!(result.is_ok());
    /// ```
    pub fn build(self) -> Result<Converter, XlsxToCsvError> {
        if let DateFormat::Custom(ref pattern) = self.config.date_format {
            validate_date_pattern(pattern)?;
        }

        Ok(Converter::new(self.config))
    }
}

/// chronoの書式文字列を検証
fn validate_date_pattern(pattern: &str) -> Result<(), XlsxToCsvError> {
    if pattern.is_empty() || StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error)) {
        return Err(XlsxToCsvError::Config(format!(
            "Invalid date format pattern: '{}'",
            pattern
        )));
    }
    Ok(())
}

/// 変換処理のファサード
///
/// ワークシートを1枚選択し、列の型を分類したうえでCSVとして書き出します。
///
/// # 使用例
///
/// ```rust,no_run
/// use xlsxcsv::ConverterBuilder;
/// use std::fs::File;
///
/// # fn main() -> Result<(), xlsxcsv::XlsxToCsvError> {
/// let converter = ConverterBuilder::new().build()?;
/// let input = File::open("example.xlsx")?;
/// let mut output = Vec::new();
/// let report = converter.convert(input, &mut output)?;
/// println!("{} rows", report.rows);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Converter {
    config: ConversionConfig,
}

impl Converter {
    pub(crate) fn new(config: ConversionConfig) -> Self {
        Self { config }
    }

    /// ExcelファイルをCSVに変換
    ///
    /// # 引数
    ///
    /// * `input` - Excelファイルを読み込むためのリーダー
    /// * `output` - CSV出力先のライター
    ///
    /// # 戻り値
    ///
    /// * `Ok(ConversionReport)` - 変換に成功した場合
    /// * `Err(XlsxToCsvError)` - エラーが発生した場合。途中まで書き込まれた
    ///   出力が残ることがあります
    ///
    /// # 処理フロー
    ///
    /// 1. ワークブックを開く
    /// 2. シートを選択して読み込む
    /// 3. 列の型を分類
    /// 4. 全行をCSVとして書き出す
    pub fn convert<R: Read + Seek, W: Write>(
        &self,
        input: R,
        output: W,
    ) -> Result<ConversionReport, XlsxToCsvError> {
        let sheet = self.load(input)?;
        let mut writer = BufWriter::new(output);
        self.write_sheet(&sheet, &mut writer)
    }

    /// 読み込み済みのワークシートをCSVに変換
    ///
    /// ワークブックを経由せずに、`Worksheet`を実装する任意のシートを変換できます。
    ///
    /// # 戻り値
    ///
    /// * `Ok(ColumnTypes)` - 分類された列の型
    /// * `Err(XlsxToCsvError)` - 書き込みに失敗した場合
    ///
    /// # 使用例
    ///
    /// ```rust
    /// use xlsxcsv::{Cell, CellValue, ColumnType, ConverterBuilder, LineEnding, SheetGrid};
    ///
    /// # fn main() -> Result<(), xlsxcsv::XlsxToCsvError> {
    /// let sheet = SheetGrid::new(
    ///     "Sheet1",
    ///     vec![
    ///         vec![Cell::string("Price")],
    ///         vec![Cell::new(CellValue::Float(10.5), "10.5")],
    ///         vec![Cell::new(CellValue::Int(20), "20")],
    ///     ],
    /// );
    /// let converter = ConverterBuilder::new().with_line_ending(LineEnding::Lf).build()?;
    /// let mut output = Vec::new();
    /// let types = converter.convert_worksheet(&sheet, &mut output)?;
    ///
    /// assert_eq!(types.get(1), ColumnType::Numeric);
    /// assert_eq!(output, b"Price\n10.5\n20\n");
    /// # Ok(())
    /// # }
    /// ```
    pub fn convert_worksheet<S: Worksheet + ?Sized, W: Write>(
        &self,
        sheet: &S,
        mut output: W,
    ) -> Result<ColumnTypes, XlsxToCsvError> {
        let rows = sheet.rows();
        let columns = sheet.columns();

        if self.config.include_bom {
            output.write_all(UTF8_BOM)?;
        }

        let column_types = classify_columns(sheet, columns, sample_row_limit(rows));
        write_csv(
            &mut output,
            sheet,
            rows,
            columns,
            &column_types,
            &self.config.date_format,
            self.config.line_ending,
        )?;
        output.flush()?;

        Ok(column_types)
    }

    /// ExcelファイルをCSV文字列に変換
    ///
    /// # 使用例
    ///
    /// ```rust,no_run
    /// use std::fs::File;
    /// use xlsxcsv::ConverterBuilder;
    ///
    /// # fn main() -> Result<(), xlsxcsv::XlsxToCsvError> {
    /// let converter = ConverterBuilder::new().build()?;
    /// let input = File::open("example.xlsx")?;
    /// let csv = converter.convert_to_string(input)?;
    /// println!("{}", csv);
    /// # Ok(())
    /// # }
    /// ```
    pub fn convert_to_string<R: Read + Seek>(&self, input: R) -> Result<String, XlsxToCsvError> {
        let mut buffer = Vec::new();
        self.convert(input, &mut buffer)?;

        let result = String::from_utf8(buffer).map_err(|e| {
            XlsxToCsvError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })?;

        Ok(result)
    }

    /// パス指定でExcelファイルをCSVファイルに変換
    ///
    /// 出力ファイルはシートの読み込みに成功してから作成（既存なら切り詰め）されるため、
    /// 入力が不正な場合に既存の出力ファイルを壊しません。
    ///
    /// # 引数
    ///
    /// * `input_path` - Excelファイルのパス
    /// * `output_path` - CSVファイルのパス
    pub fn convert_path<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        input_path: P,
        output_path: Q,
    ) -> Result<ConversionReport, XlsxToCsvError> {
        let input = BufReader::new(File::open(input_path.as_ref())?);
        let sheet = self.load(input)?;

        let output = File::create(output_path.as_ref())?;
        let mut writer = BufWriter::new(output);
        self.write_sheet(&sheet, &mut writer)
    }

    fn load<R: Read + Seek>(&self, input: R) -> Result<SheetGrid, XlsxToCsvError> {
        let mut parser = WorkbookParser::open(input, &self.config.security)?;
        let sheet_name = parser.select_sheet(&self.config.sheet_selector)?;
        parser.load_sheet(&sheet_name)
    }

    fn write_sheet<W: Write>(
        &self,
        sheet: &SheetGrid,
        writer: &mut W,
    ) -> Result<ConversionReport, XlsxToCsvError> {
        let column_types = self.convert_worksheet(sheet, writer)?;

        let report = ConversionReport {
            sheet: sheet.name().to_string(),
            rows: sheet.rows(),
            columns: sheet.columns(),
            column_types: column_types.as_slice().to_vec(),
        };

        tracing::info!(
            sheet = %report.sheet,
            rows = report.rows,
            columns = report.columns,
            "Converted worksheet"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Cell, CellValue};

    fn price_sheet() -> SheetGrid {
        SheetGrid::new(
            "Sheet1",
            vec![
                vec![Cell::string("Name"), Cell::string("Price")],
                vec![Cell::string("Pen"), Cell::new(CellValue::Float(10.5), "10.5")],
                vec![Cell::string("Ink"), Cell::new(CellValue::Int(20), "20")],
            ],
        )
    }

    #[test]
    fn test_converter_builder_new() {
        let builder = ConverterBuilder::new();
        assert_eq!(builder.config.sheet_selector, SheetSelector::First);
        assert_eq!(builder.config.date_format, DateFormat::Standard);
        assert_eq!(builder.config.line_ending, LineEnding::CrLf);
        assert!(!builder.config.include_bom);
        assert_eq!(builder.config.security, SecurityConfig::default());
    }

    #[test]
    fn test_builder_method_chaining() {
        let builder = ConverterBuilder::new()
            .with_sheet_selector(SheetSelector::Index(1))
            .with_date_format(DateFormat::Custom("%Y/%m/%d".to_string()))
            .with_line_ending(LineEnding::Lf)
            .with_bom(true)
            .with_max_input_size(1024);

        assert_eq!(builder.config.sheet_selector, SheetSelector::Index(1));
        assert_eq!(
            builder.config.date_format,
            DateFormat::Custom("%Y/%m/%d".to_string())
        );
        assert_eq!(builder.config.line_ending, LineEnding::Lf);
        assert!(builder.config.include_bom);
        assert_eq!(builder.config.security.max_input_file_size, 1024);
    }

    #[test]
    fn test_build_with_valid_custom_date_format() {
        let result = ConverterBuilder::new()
            .with_date_format(DateFormat::Custom("%Y-%m-%d %H:%M".to_string()))
            .build();
        assert!(result.is_ok());
    }

    #[test]
    fn test_build_with_invalid_custom_date_format() {
        for pattern in ["", "%Q", "%Y-%"] {
            let result = ConverterBuilder::new()
                .with_date_format(DateFormat::Custom(pattern.to_string()))
                .build();
            match result {
                Err(XlsxToCsvError::Config(msg)) => {
                    assert!(msg.contains("Invalid date format"), "{}", msg);
                }
                other => panic!("Expected Config error for {:?}, got {:?}", pattern, other),
            }
        }
    }

    #[test]
    fn test_convert_worksheet() {
        let converter = ConverterBuilder::new().build().unwrap();
        let mut output = Vec::new();
        let types = converter.convert_worksheet(&price_sheet(), &mut output).unwrap();

        assert_eq!(types.as_slice(), &[ColumnType::Text, ColumnType::Numeric]);
        assert_eq!(
            String::from_utf8(output).unwrap(),
            "Name,Price\r\n\"Pen\",10.5\r\n\"Ink\",20\r\n"
        );
    }

    #[test]
    fn test_convert_worksheet_with_bom() {
        let converter = ConverterBuilder::new()
            .with_bom(true)
            .with_line_ending(LineEnding::Lf)
            .build()
            .unwrap();
        let mut output = Vec::new();
        converter.convert_worksheet(&price_sheet(), &mut output).unwrap();

        assert!(output.starts_with(UTF8_BOM));
        assert_eq!(&output[UTF8_BOM.len()..], b"Name,Price\n\"Pen\",10.5\n\"Ink\",20\n");
    }

    #[test]
    fn test_convert_worksheet_empty_sheet_writes_nothing() {
        let converter = ConverterBuilder::new().build().unwrap();
        let mut output = Vec::new();
        let types = converter
            .convert_worksheet(&SheetGrid::new("Empty", Vec::new()), &mut output)
            .unwrap();

        assert!(types.is_empty());
        assert!(output.is_empty());
    }

    #[test]
    fn test_converter_convert_to_string_with_invalid_input() {
        let converter = ConverterBuilder::new().build().unwrap();
        let result = converter.convert_to_string(std::io::Cursor::new(Vec::<u8>::new()));
        assert!(result.is_err());
    }

    #[test]
    fn test_converter_respects_max_input_size() {
        let converter = ConverterBuilder::new().with_max_input_size(4).build().unwrap();
        let result = converter.convert_to_string(std::io::Cursor::new(vec![0u8; 16]));
        assert!(matches!(result, Err(XlsxToCsvError::SecurityViolation(_))));
    }

    #[test]
    fn test_conversion_report_serializes() {
        let report = ConversionReport {
            sheet: "Sheet1".to_string(),
            rows: 3,
            columns: 2,
            column_types: vec![ColumnType::Text, ColumnType::Numeric],
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["sheet"], "Sheet1");
        assert_eq!(json["column_types"][1], "Numeric");
    }
}
