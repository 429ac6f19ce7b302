//! Formatter Module
//!
//! セル値に表示書式を適用し、表示テキストを算出するモジュール。

use std::collections::HashMap;

use crate::format::{default_datetime_text, format_general, NumberFormat};
use crate::types::CellValue;

/// セルフォーマッター
///
/// 表示テキスト算出のファサードとして機能します。解析済みの書式は
/// 書式文字列ごとにキャッシュされます。
#[derive(Debug, Default)]
pub(crate) struct CellFormatter {
    /// 書式文字列 -> 解析済み書式
    formats: HashMap<String, NumberFormat>,
}

impl CellFormatter {
    /// 新しいCellFormatterインスタンスを生成
    pub fn new() -> Self {
        Self::default()
    }

    /// 書式文字列を解析（キャッシュ済みならそれを返す）
    ///
    /// 解析できない書式はGeneralとして扱います。
    pub fn number_format(&mut self, format_code: &str) -> &NumberFormat {
        self.formats
            .entry(format_code.to_string())
            .or_insert_with(|| match NumberFormat::parse(format_code) {
                Ok(format) => format,
                Err(e) => {
                    tracing::warn!(format_code, error = %e, "Falling back to General format");
                    NumberFormat::general()
                }
            })
    }

    /// セル値の表示テキストを算出
    ///
    /// # 引数
    ///
    /// * `value` - セルの値
    /// * `format_code` - セルに適用された書式文字列（不明な場合は`None`）
    ///
    /// # 戻り値
    ///
    /// スプレッドシートビューアが表示する文字列
    pub fn display_text(&mut self, value: &CellValue, format_code: Option<&str>) -> String {
        let format = format_code.map(|code| self.number_format(code));

        match (value, format) {
            (CellValue::Empty, _) => String::new(),
            (CellValue::Int(i), None) => i.to_string(),
            (CellValue::Int(i), Some(format)) if format.is_general() => i.to_string(),
            (CellValue::Int(i), Some(format)) => format.format_number(*i as f64),
            (CellValue::Float(f), None) => format_general(*f),
            (CellValue::Float(f), Some(format)) => format.format_number(*f),
            (CellValue::DateTime(dt), None) => default_datetime_text(*dt),
            (CellValue::DateTime(dt), Some(format)) => format.format_datetime(*dt),
            (CellValue::String(s), None) => s.clone(),
            (CellValue::String(s), Some(format)) => format.format_text(s),
            (CellValue::Bool(b), _) => if *b { "TRUE" } else { "FALSE" }.to_string(),
            (CellValue::Error(e), _) => e.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_display_text_without_format() {
        let mut formatter = CellFormatter::new();

        assert_eq!(formatter.display_text(&CellValue::Empty, None), "");
        assert_eq!(formatter.display_text(&CellValue::Int(42), None), "42");
        assert_eq!(formatter.display_text(&CellValue::Float(10.5), None), "10.5");
        assert_eq!(formatter.display_text(&CellValue::Float(20.0), None), "20");
        assert_eq!(
            formatter.display_text(&CellValue::String("Alice".to_string()), None),
            "Alice"
        );
        assert_eq!(formatter.display_text(&CellValue::Bool(true), None), "TRUE");
        assert_eq!(formatter.display_text(&CellValue::Bool(false), None), "FALSE");
        assert_eq!(
            formatter.display_text(&CellValue::Error("#DIV/0!".to_string()), None),
            "#DIV/0!"
        );
    }

    #[test]
    fn test_display_text_with_number_format() {
        let mut formatter = CellFormatter::new();

        assert_eq!(
            formatter.display_text(&CellValue::Float(1234.0), Some("00000")),
            "01234"
        );
        assert_eq!(
            formatter.display_text(&CellValue::Int(1234), Some("00000")),
            "01234"
        );
        assert_eq!(
            formatter.display_text(&CellValue::Float(1234.5), Some("#,##0.00")),
            "1,234.50"
        );
        assert_eq!(
            formatter.display_text(&CellValue::Int(7), Some("General")),
            "7"
        );
    }

    #[test]
    fn test_display_text_datetime() {
        let mut formatter = CellFormatter::new();
        let dt = NaiveDate::from_ymd_opt(2021, 5, 3)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();

        assert_eq!(
            formatter.display_text(&CellValue::DateTime(dt), Some("mm/dd/yyyy")),
            "05/03/2021"
        );
        assert_eq!(
            formatter.display_text(&CellValue::DateTime(dt), None),
            "5/3/2021"
        );
    }

    #[test]
    fn test_invalid_format_falls_back_to_general() {
        let mut formatter = CellFormatter::new();

        assert_eq!(
            formatter.display_text(&CellValue::Float(1.5), Some("[Red0.00")),
            "1.5"
        );
        assert!(formatter.number_format("[Red0.00").is_general());
    }

    #[test]
    fn test_number_format_is_cached() {
        let mut formatter = CellFormatter::new();
        formatter.number_format("0.00");
        formatter.number_format("0.00");
        formatter.number_format("0%");

        assert_eq!(formatter.formats.len(), 2);
    }
}
