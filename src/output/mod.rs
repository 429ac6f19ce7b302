//! Row Formatter Module
//!
//! 列の分類結果に従い、ワークシートの全行をCSVとして書き出すモジュール。

mod formatters;

use std::io::Write;

use crate::api::{DateFormat, LineEnding};
use crate::error::XlsxToCsvError;
use crate::types::{ColumnTypes, Worksheet};

use formatters::{field_value, quote_field};

/// 行フォーマッター
///
/// ヘッダー行（行1）は表示テキストを引用符なしでそのまま出力し、
/// データ行は列の型に応じて値と引用符付けを決定します。
#[derive(Debug, Clone)]
pub(crate) struct RowFormatter<'a> {
    date_format: &'a DateFormat,
    line_ending: LineEnding,
}

impl<'a> RowFormatter<'a> {
    pub fn new(date_format: &'a DateFormat, line_ending: LineEnding) -> Self {
        Self {
            date_format,
            line_ending,
        }
    }

    /// ワークシートの行1から`rows`までを書き出す
    pub fn write<W: Write, S: Worksheet + ?Sized>(
        &self,
        writer: &mut W,
        sheet: &S,
        rows: usize,
        columns: usize,
        column_types: &ColumnTypes,
    ) -> Result<(), XlsxToCsvError> {
        if rows == 0 || columns == 0 {
            return Ok(());
        }

        let mut line = String::new();

        // ヘッダー行
        for col in 1..=columns {
            if col > 1 {
                line.push(',');
            }
            line.push_str(&sheet.cell(1, col).text);
        }
        self.write_line(writer, &mut line)?;

        for row in 2..=rows {
            for col in 1..=columns {
                if col > 1 {
                    line.push(',');
                }
                let value = field_value(sheet.cell(row, col), self.date_format)?;
                line.push_str(&quote_field(&value, column_types.get(col)));
            }
            self.write_line(writer, &mut line)?;
        }

        writer.flush()?;
        Ok(())
    }

    fn write_line<W: Write>(&self, writer: &mut W, line: &mut String) -> Result<(), XlsxToCsvError> {
        line.push_str(self.line_ending.as_str());
        writer.write_all(line.as_bytes())?;
        line.clear();
        Ok(())
    }
}

/// ワークシートをCSVとして書き出す
///
/// # 引数
///
/// * `writer` - 出力先
/// * `sheet` - 対象のワークシート
/// * `rows` - 書き出す行数（ヘッダー行を含む）
/// * `columns` - 書き出す列数
/// * `column_types` - 列の分類結果
/// * `date_format` - データ行の日付・時刻の出力形式
/// * `line_ending` - 行末の改行コード
///
/// # 戻り値
///
/// * `Ok(())` - 書き出しに成功
/// * `Err(XlsxToCsvError)` - 書き込みに失敗、または日付形式が不正な場合
pub fn write_csv<W: Write, S: Worksheet + ?Sized>(
    writer: &mut W,
    sheet: &S,
    rows: usize,
    columns: usize,
    column_types: &ColumnTypes,
    date_format: &DateFormat,
    line_ending: LineEnding,
) -> Result<(), XlsxToCsvError> {
    RowFormatter::new(date_format, line_ending).write(writer, sheet, rows, columns, column_types)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ColumnType;
    use crate::types::{Cell, CellValue, SheetGrid};
    use chrono::NaiveDate;

    fn sample_sheet() -> SheetGrid {
        let hired = |y, m, d| {
            let dt = NaiveDate::from_ymd_opt(y, m, d)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap();
            Cell::new(CellValue::DateTime(dt), format!("{}/{}/{}", m, d, y))
        };

        SheetGrid::new(
            "Sheet1",
            vec![
                vec![
                    Cell::string("ZIP"),
                    Cell::string("Price"),
                    Cell::string("Hired"),
                ],
                vec![
                    Cell::new(CellValue::Float(1234.0), "01234"),
                    Cell::new(CellValue::Float(10.5), "10.5"),
                    hired(2021, 5, 3),
                ],
                vec![
                    Cell::new(CellValue::Float(2115.0), "02115"),
                    Cell::new(CellValue::Int(20), "20"),
                    hired(2020, 1, 15),
                ],
            ],
        )
    }

    fn types() -> ColumnTypes {
        ColumnTypes::new(vec![ColumnType::Text, ColumnType::Numeric, ColumnType::Date])
    }

    fn render(sheet: &SheetGrid, date_format: &DateFormat, line_ending: LineEnding) -> String {
        let mut out = Vec::new();
        write_csv(
            &mut out,
            sheet,
            sheet.rows(),
            sheet.columns(),
            &types(),
            date_format,
            line_ending,
        )
        .unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_write_csv_default_pattern() {
        let csv = render(&sample_sheet(), &DateFormat::Standard, LineEnding::CrLf);

        assert_eq!(
            csv,
            "ZIP,Price,Hired\r\n\
             \"01234\",10.5,\"2021-05-03 00:00:00\"\r\n\
             \"02115\",20,\"2020-01-15 00:00:00\"\r\n"
        );
    }

    #[test]
    fn test_write_csv_custom_pattern_and_lf() {
        let csv = render(
            &sample_sheet(),
            &DateFormat::Custom("%Y/%m/%d".to_string()),
            LineEnding::Lf,
        );

        assert_eq!(
            csv,
            "ZIP,Price,Hired\n\"01234\",10.5,\"2021/05/03\"\n\"02115\",20,\"2020/01/15\"\n"
        );
    }

    #[test]
    fn test_header_is_never_quoted() {
        let sheet = SheetGrid::new(
            "Sheet1",
            vec![
                vec![Cell::string("007"), Cell::string("say \"hi\"")],
                vec![Cell::string("a"), Cell::string("b")],
            ],
        );
        let types = ColumnTypes::new(vec![ColumnType::Text, ColumnType::Text]);

        let mut out = Vec::new();
        write_csv(&mut out, &sheet, 2, 2, &types, &DateFormat::Standard, LineEnding::Lf).unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "007,say \"hi\"\n\"a\",\"b\"\n"
        );
    }

    #[test]
    fn test_empty_cells_follow_column_policy() {
        let sheet = SheetGrid::new(
            "Sheet1",
            vec![
                vec![Cell::string("T"), Cell::string("N"), Cell::string("D")],
                vec![Cell::empty(), Cell::empty(), Cell::empty()],
            ],
        );

        let mut out = Vec::new();
        write_csv(&mut out, &sheet, 2, 3, &types(), &DateFormat::Standard, LineEnding::Lf).unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "T,N,D\n\"\",,\"\"\n");
    }

    #[test]
    fn test_short_rows_are_padded_without_trailing_comma() {
        let sheet = SheetGrid::new(
            "Sheet1",
            vec![
                vec![Cell::string("A"), Cell::string("B")],
                vec![Cell::new(CellValue::Int(1), "1")],
            ],
        );
        let types = ColumnTypes::new(vec![ColumnType::Numeric, ColumnType::Numeric]);

        let mut out = Vec::new();
        write_csv(&mut out, &sheet, 2, 2, &types, &DateFormat::Standard, LineEnding::Lf).unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "A,B\n1,\n");
    }

    #[test]
    fn test_empty_extent_writes_nothing() {
        let sheet = SheetGrid::new("Sheet1", Vec::new());
        let mut out = Vec::new();
        write_csv(
            &mut out,
            &sheet,
            0,
            0,
            &ColumnTypes::default(),
            &DateFormat::Standard,
            LineEnding::CrLf,
        )
        .unwrap();

        assert!(out.is_empty());
    }

    #[test]
    fn test_output_is_idempotent() {
        let sheet = sample_sheet();
        let first = render(&sheet, &DateFormat::Standard, LineEnding::CrLf);
        let second = render(&sheet, &DateFormat::Standard, LineEnding::CrLf);
        assert_eq!(first, second);
    }
}
