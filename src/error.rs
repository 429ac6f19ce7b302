//! Error Types Module
//!
//! クレート全体で使用する構造化エラー型を定義するモジュール。
//! `thiserror`を使用して、エラーの自動変換とメッセージフォーマットを実現する。

use thiserror::Error;

/// xlsxcsvクレート全体で使用するエラー型
///
/// Excelファイルの読み込み、シート選択、CSV書き出しの途中で発生する
/// すべてのエラーを統一的に扱います。変換処理は局所的な回復を行わず、
/// いずれかのエラーが発生した時点で変換全体を中断します。
///
/// # 使用例
///
/// ```rust,no_run
/// use xlsxcsv::XlsxToCsvError;
/// use std::fs::File;
///
/// fn open_input(path: &str) -> Result<File, XlsxToCsvError> {
///     let file = File::open(path)?;  // Ioエラーが自動的に変換される
///     Ok(file)
/// }
/// ```
#[derive(Error, Debug)]
pub enum XlsxToCsvError {
    /// 指定された名前のワークシートが存在しない
    ///
    /// 呼び出し側が名前を訂正して再試行できるよう、ワークブック内の
    /// すべてのシート名をメッセージに列挙します。
    #[error("Worksheet '{name}' not found. Available worksheets: {}", available.join(", "))]
    WorksheetNotFound {
        /// 要求されたシート名
        name: String,
        /// ワークブック内のシート名（定義順）
        available: Vec<String>,
    },

    /// I/O操作中に発生したエラー
    ///
    /// 入力ファイルの読み込み失敗、CSVの書き込み失敗など。
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Excelファイルの解析中に発生したエラー（calamine由来）
    ///
    /// ファイル形式が不正、破損したファイルなどが原因となります。
    #[error("Failed to parse Excel file: {0}")]
    Parse(#[from] calamine::Error),

    /// UTF-8文字列の変換エラー
    #[error("UTF-8 conversion error: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// ZIPアーカイブの解析エラー
    #[error("ZIP archive error: {0}")]
    Zip(String),

    /// XLSX内部XMLの解析エラー
    #[error("XML parse error: {0}")]
    Xml(String),

    /// 数値の解析エラー（XML属性値など）
    #[error("Number parse error: {0}")]
    ParseInt(#[from] std::num::ParseIntError),

    /// 設定の検証に失敗したエラー
    ///
    /// `ConverterBuilder::build()`時、またはシート選択時に無効な設定が
    /// 検出された場合に発生します。
    ///
    /// ```rust,no_run
    /// use xlsxcsv::{ConverterBuilder, DateFormat, XlsxToCsvError};
    ///
    /// let result = ConverterBuilder::new()
    ///     .with_date_format(DateFormat::Custom("%Q".to_string()))
    ///     .build();
    ///
    /// if let Err(XlsxToCsvError::Config(msg)) = result {
    ///     println!("設定エラー: {}", msg);
    /// }
    /// ```
    #[error("Configuration error: {0}")]
    Config(String),

    /// セキュリティ制限に違反したエラー
    ///
    /// ZIP bomb、パストラバーサル、入力サイズ上限などの制限に違反した場合。
    #[error("Security violation: {0}")]
    SecurityViolation(String),
}

impl XlsxToCsvError {
    pub(crate) fn xml(err: impl std::fmt::Display) -> Self {
        XlsxToCsvError::Xml(err.to_string())
    }

    pub(crate) fn zip(err: impl std::fmt::Display) -> Self {
        XlsxToCsvError::Zip(err.to_string())
    }
}
