//! Field Formatters
//!
//! データ行の1フィールド分の値と引用符付けを決定するモジュール。

use std::borrow::Cow;
use std::fmt::Write as _;

use crate::api::{ColumnType, DateFormat};
use crate::classify::has_leading_zeros;
use crate::error::XlsxToCsvError;
use crate::types::{Cell, CellValue};

/// データ行のセルが出力する値を決定
///
/// 1. 値がなければ空文字列
/// 2. 日付・時刻なら指定された日付形式
/// 3. それ以外は表示テキスト
pub(crate) fn field_value<'a>(
    cell: &'a Cell,
    date_format: &DateFormat,
) -> Result<Cow<'a, str>, XlsxToCsvError> {
    match &cell.value {
        CellValue::Empty => Ok(Cow::Borrowed("")),
        CellValue::DateTime(dt) => {
            let mut formatted = String::new();
            write!(formatted, "{}", dt.format(date_format.pattern())).map_err(|_| {
                XlsxToCsvError::Config(format!(
                    "Invalid date format pattern: '{}'",
                    date_format.pattern()
                ))
            })?;
            Ok(Cow::Owned(formatted))
        }
        _ => Ok(Cow::Borrowed(cell.text.as_str())),
    }
}

/// 列の型と値に応じて引用符を付ける
///
/// - テキスト列、または値が先頭ゼロを持つ場合: `"` で囲み、内部の `"` を二重化
/// - 日付列: `"` で囲む（エスケープなし）
/// - 数値列: そのまま
pub(crate) fn quote_field(value: &str, column_type: ColumnType) -> Cow<'_, str> {
    if column_type == ColumnType::Text || has_leading_zeros(value) {
        Cow::Owned(escape_csv(value))
    } else if column_type == ColumnType::Date {
        Cow::Owned(format!("\"{}\"", value))
    } else {
        Cow::Borrowed(value)
    }
}

/// ダブルクォートで囲み、内部のダブルクォートを2つにエスケープ
fn escape_csv(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}
