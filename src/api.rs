//! Public API Types
//!
//! 公開APIで使用する列挙型を定義するモジュール。

use serde::Serialize;

/// 列の型分類
///
/// サンプル行から推定され、変換中はその列のすべてのセルに同じ引用符ポリシーが
/// 適用されます。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ColumnType {
    /// テキスト列（常にダブルクォートで囲み、内部の `"` を二重化）
    Text,

    /// 数値列（引用符なしで出力）
    Numeric,

    /// 日付列（ダブルクォートで囲む、エスケープなし）
    Date,
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ColumnType::Text => "Text",
            ColumnType::Numeric => "Numeric",
            ColumnType::Date => "Date",
        };
        f.write_str(name)
    }
}

/// 日付の出力形式
///
/// データ行の日付・時刻セルをCSVに書き出す際の形式を指定します。
/// ヘッダー行には適用されません（ヘッダーは表示テキストをそのまま出力）。
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[non_exhaustive]
pub enum DateFormat {
    /// 既定の形式（`%Y-%m-%d %H:%M:%S`）
    ///
    /// 例: `2021-05-03 00:00:00`
    #[default]
    Standard,

    /// カスタム形式（chrono互換フォーマット文字列）
    ///
    /// # フォーマット指定子（主要なもの）
    ///
    /// - `%Y`: 4桁の年（例: 2025）
    /// - `%y`: 2桁の年（例: 25）
    /// - `%m`: 2桁の月（01-12）
    /// - `%d`: 2桁の日（01-31）
    /// - `%H`: 24時間形式の時（00-23）
    /// - `%M`: 分（00-59）
    /// - `%S`: 秒（00-59）
    ///
    /// # 使用例
    ///
    /// ```rust,no_run
    /// use xlsxcsv::{ConverterBuilder, DateFormat};
    ///
    /// # fn main() -> Result<(), xlsxcsv::XlsxToCsvError> {
    /// let converter = ConverterBuilder::new()
    ///     .with_date_format(DateFormat::Custom("%Y/%m/%d".to_string()))
    ///     .build()?;
    /// # Ok(())
    /// # }
    /// ```
    Custom(String),
}

impl DateFormat {
    /// 既定形式のフォーマット文字列
    pub const STANDARD_PATTERN: &'static str = "%Y-%m-%d %H:%M:%S";

    /// 入力文字列から日付形式を決定する（空文字列なら既定形式）
    pub fn from_pattern(pattern: &str) -> Self {
        if pattern.is_empty() {
            DateFormat::Standard
        } else {
            DateFormat::Custom(pattern.to_string())
        }
    }

    /// chronoに渡すフォーマット文字列
    pub fn pattern(&self) -> &str {
        match self {
            DateFormat::Standard => Self::STANDARD_PATTERN,
            DateFormat::Custom(pattern) => pattern,
        }
    }
}

/// シート選択方式
///
/// 変換対象のワークシートを1枚選択します。
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[non_exhaustive]
pub enum SheetSelector {
    /// ワークブックの最初のシート（デフォルト）
    #[default]
    First,

    /// インデックス指定（0始まり）
    Index(usize),

    /// シート名指定
    ///
    /// 見つからない場合は `XlsxToCsvError::WorksheetNotFound` になります。
    Name(String),
}

impl SheetSelector {
    /// シート名から選択方式を決定する（空文字列なら最初のシート）
    pub fn from_name(name: &str) -> Self {
        if name.is_empty() {
            SheetSelector::First
        } else {
            SheetSelector::Name(name.to_string())
        }
    }
}

/// 行末の改行コード
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEnding {
    /// `\r\n`（RFC 4180、デフォルト）
    #[default]
    CrLf,

    /// `\n`
    Lf,
}

impl LineEnding {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            LineEnding::CrLf => "\r\n",
            LineEnding::Lf => "\n",
        }
    }
}
