//! Security Module
//!
//! 入力ワークブックに対する資源制限を実装するモジュール。
//! ZIP bomb、パストラバーサル、過大な入力への対策を提供します。

use std::io::{Read, Seek};

use zip::ZipArchive;

use crate::error::XlsxToCsvError;

/// セキュリティ設定
///
/// ワークブック読み込み時の資源制限を定義します。
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SecurityConfig {
    /// 展開後の合計サイズの上限（バイト）
    /// デフォルト: 1GB
    pub max_decompressed_size: u64,
    /// ZIPアーカイブ内のエントリ数の上限
    /// デフォルト: 10000
    pub max_file_count: usize,
    /// 単一エントリの展開後サイズの上限（バイト）
    /// デフォルト: 100MB
    pub max_file_size: u64,
    /// 入力ファイルのサイズ上限（バイト）
    /// デフォルト: 2GB
    pub max_input_file_size: u64,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_decompressed_size: 1_073_741_824,
            max_file_count: 10_000,
            max_file_size: 104_857_600,
            max_input_file_size: 2_147_483_648,
        }
    }
}

impl SecurityConfig {
    /// 入力サイズが上限以内かを検査
    pub fn check_input_size(&self, size: u64) -> Result<(), XlsxToCsvError> {
        if size > self.max_input_file_size {
            return Err(XlsxToCsvError::SecurityViolation(format!(
                "Input file exceeds maximum size: {} bytes (max: {} bytes)",
                size, self.max_input_file_size
            )));
        }
        Ok(())
    }

    /// ZIPアーカイブのエントリ数、パス、展開後サイズを検査
    ///
    /// エントリのヘッダーのみを参照し、展開は行いません。
    pub fn check_archive<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
    ) -> Result<(), XlsxToCsvError> {
        if archive.len() > self.max_file_count {
            return Err(XlsxToCsvError::SecurityViolation(format!(
                "ZIP archive contains too many files: {} (max: {})",
                archive.len(),
                self.max_file_count
            )));
        }

        let mut total = 0u64;
        for i in 0..archive.len() {
            let entry = archive.by_index_raw(i).map_err(XlsxToCsvError::zip)?;
            validate_zip_path(entry.name())?;

            let size = entry.size();
            if size > self.max_file_size {
                return Err(XlsxToCsvError::SecurityViolation(format!(
                    "File '{}' exceeds maximum size: {} bytes (max: {} bytes)",
                    entry.name(),
                    size,
                    self.max_file_size
                )));
            }

            total = total.saturating_add(size);
            if total > self.max_decompressed_size {
                return Err(XlsxToCsvError::SecurityViolation(format!(
                    "Total decompressed size exceeds maximum: {} bytes (max: {} bytes)",
                    total, self.max_decompressed_size
                )));
            }
        }

        Ok(())
    }
}

/// ZIPエントリのパスを検証
///
/// 空のパス、絶対パス、`..` を含むパス、バックスラッシュを含むパスを拒否します。
pub(crate) fn validate_zip_path(path: &str) -> Result<(), XlsxToCsvError> {
    let reason = if path.is_empty() {
        "empty path"
    } else if path.starts_with('/') || has_drive_prefix(path) {
        "absolute path"
    } else if path.split('/').any(|segment| segment == "..") {
        "path traversal"
    } else if path.contains('\\') {
        "backslash separator"
    } else {
        return Ok(());
    };

    Err(XlsxToCsvError::SecurityViolation(format!(
        "Invalid ZIP path ({}): {}",
        reason, path
    )))
}

fn has_drive_prefix(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}
