//! Column Classifier Module
//!
//! サンプル行からワークシートの各列の型（テキスト・数値・日付）を推定する。
//!
//! # 判定規則
//!
//! 列ごとに行2から`sample_row_limit - 1`までの空でないセルを調べます。
//!
//! 1. 表示テキストが先頭ゼロを持つセルがあればテキスト
//! 2. 日付・時刻でも数値でもないセルがあればテキスト
//! 3. 値が1つもなければテキスト
//! 4. すべて日付・時刻なら日付
//! 5. それ以外は数値

use crate::api::ColumnType;
use crate::types::{ColumnTypes, Worksheet};

/// 分類に使用する最大行数（ヘッダー行を含む）
pub const MAX_SAMPLE_ROWS: usize = 26;

/// 分類のサンプル範囲の上限（排他的）を求める
///
/// 行2から`sample_row_limit(rows) - 1`までが対象です。
/// 最後の行は上限と一致する場合サンプルに含まれません。
pub fn sample_row_limit(rows: usize) -> usize {
    rows.min(MAX_SAMPLE_ROWS)
}

/// 表示テキストが先頭ゼロを持つかどうか
///
/// 長さが2以上、先頭が`0`、2文字目が`.`でない場合に真となります。
///
/// # 使用例
///
/// ```rust
/// use xlsxcsv::has_leading_zeros;
///
/// assert!(has_leading_zeros("01234"));
/// assert!(!has_leading_zeros("0.5"));
/// assert!(!has_leading_zeros("0"));
/// ```
pub fn has_leading_zeros(text: &str) -> bool {
    let mut chars = text.chars();
    matches!((chars.next(), chars.next()), (Some('0'), Some(second)) if second != '.')
}

/// ワークシートの各列の型を推定
///
/// # 引数
///
/// * `sheet` - 対象のワークシート
/// * `column_count` - 分類する列数
/// * `sample_row_limit` - サンプル範囲の上限（排他的）
///
/// # 戻り値
///
/// 列1から`column_count`までの型
pub fn classify_columns<S: Worksheet + ?Sized>(
    sheet: &S,
    column_count: usize,
    sample_row_limit: usize,
) -> ColumnTypes {
    let types = (1..=column_count)
        .map(|col| {
            let column_type = classify_column(sheet, col, sample_row_limit);
            tracing::info!(column = col, column_type = %column_type, "Column {}: {}", col, column_type);
            column_type
        })
        .collect();

    ColumnTypes::new(types)
}

/// 1列分の型を推定
fn classify_column<S: Worksheet + ?Sized>(sheet: &S, col: usize, sample_row_limit: usize) -> ColumnType {
    let mut has_any_value = false;
    let mut has_non_numeric = false;
    let mut has_leading_zero_text = false;
    let mut all_dates = true;

    for row in 2..sample_row_limit {
        let cell = sheet.cell(row, col);
        if cell.value.is_empty() {
            continue;
        }
        has_any_value = true;

        if has_leading_zeros(&cell.text) {
            has_leading_zero_text = true;
            break;
        }

        if cell.value.is_datetime() {
            continue;
        }

        all_dates = false;
        if !cell.value.is_numeric() {
            has_non_numeric = true;
            break;
        }
    }

    if !has_any_value || has_non_numeric || has_leading_zero_text {
        ColumnType::Text
    } else if all_dates {
        ColumnType::Date
    } else {
        ColumnType::Numeric
    }
}
