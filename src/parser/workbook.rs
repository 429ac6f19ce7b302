//! Workbook Parser Module
//!
//! calamineを使用してワークブックを開き、シートを選択し、
//! 型付きの値と表示テキストを持つワークシートとして読み込みます。

use calamine::{open_workbook_auto_from_rs, Data, Reader, Sheets, Xlsx};
use chrono::{NaiveDate, NaiveDateTime};
use std::io::{Cursor, Read, Seek};

use crate::api::SheetSelector;
use crate::error::XlsxToCsvError;
use crate::formatter::CellFormatter;
use crate::parser::XlsxMetadata;
use crate::security::SecurityConfig;
use crate::types::{Cell, CellCoord, CellValue, SheetGrid, Worksheet};

/// ワークブックパーサー
///
/// calamineのラッパーとして、ワークブックレベルの操作を提供します。
/// セルの値はcalamineから、表示書式はXMLメタデータから取得します。
pub(crate) struct WorkbookParser {
    /// calamineのワークブック（XLSX形式のみサポート）
    workbook: Xlsx<Cursor<Vec<u8>>>,
    /// XMLメタデータ
    metadata: XlsxMetadata,
}

impl WorkbookParser {
    /// ワークブックを開く
    ///
    /// # 引数
    ///
    /// * `reader` - Excelファイルを読み込むためのリーダー
    /// * `security` - 資源制限
    ///
    /// # 戻り値
    ///
    /// * `Ok(WorkbookParser)` - 読み込みに成功した場合
    /// * `Err(XlsxToCsvError::Parse)` - ファイル形式が不正な場合
    /// * `Err(XlsxToCsvError::Config)` - XLSX以外の形式の場合
    /// * `Err(XlsxToCsvError::SecurityViolation)` - 資源制限に違反した場合
    pub fn open<R: Read + Seek>(mut reader: R, security: &SecurityConfig) -> Result<Self, XlsxToCsvError> {
        let mut buffer = Vec::new();
        let bytes_read = reader.read_to_end(&mut buffer)?;
        security.check_input_size(bytes_read as u64)?;

        let sheets = open_workbook_auto_from_rs(Cursor::new(buffer.clone()))?;
        let workbook = match sheets {
            Sheets::Xlsx(workbook) => workbook,
            _ => {
                return Err(XlsxToCsvError::Config(
                    "Only XLSX format is supported".to_string(),
                ))
            }
        };

        let metadata = XlsxMetadata::new(buffer, security)?;

        Ok(Self { workbook, metadata })
    }

    /// すべてのシート名を定義順に取得
    pub fn sheet_names(&self) -> Vec<String> {
        self.workbook.sheet_names()
    }

    /// シート選択方式に基づいてシートを1枚選択
    ///
    /// 名前指定は完全一致を優先し、見つからなければ大文字小文字を区別せずに照合します。
    ///
    /// # 戻り値
    ///
    /// * `Ok(String)` - 選択されたシート名
    /// * `Err(XlsxToCsvError::WorksheetNotFound)` - 名前が一致するシートがない場合
    /// * `Err(XlsxToCsvError::Config)` - シートがない、またはインデックスが範囲外の場合
    pub fn select_sheet(&self, selector: &SheetSelector) -> Result<String, XlsxToCsvError> {
        let names = self.sheet_names();

        let selected = match selector {
            SheetSelector::First => names.first().cloned().ok_or_else(|| {
                XlsxToCsvError::Config("Workbook contains no worksheets".to_string())
            })?,
            SheetSelector::Index(index) => names.get(*index).cloned().ok_or_else(|| {
                XlsxToCsvError::Config(format!(
                    "Sheet index {} is out of range (total: {})",
                    index,
                    names.len()
                ))
            })?,
            SheetSelector::Name(name) => names
                .iter()
                .find(|candidate| *candidate == name)
                .or_else(|| names.iter().find(|candidate| candidate.eq_ignore_ascii_case(name)))
                .cloned()
                .ok_or_else(|| XlsxToCsvError::WorksheetNotFound {
                    name: name.clone(),
                    available: names.clone(),
                })?,
        };

        tracing::debug!(sheet = %selected, ?selector, "Selected worksheet");
        Ok(selected)
    }

    /// シートを読み込む
    ///
    /// 行1・列1はシートのA1セルに対応し、範囲は最後に使用されたセルまでです。
    ///
    /// # 引数
    ///
    /// * `sheet_name` - シート名
    ///
    /// # 戻り値
    ///
    /// * `Ok(SheetGrid)` - 値と表示テキストを持つワークシート
    /// * `Err(XlsxToCsvError)` - 解析エラーが発生した場合
    pub fn load_sheet(&mut self, sheet_name: &str) -> Result<SheetGrid, XlsxToCsvError> {
        let range = self
            .workbook
            .worksheet_range(sheet_name)
            .map_err(|e| XlsxToCsvError::Parse(e.into()))?;
        let styles = self.metadata.cell_styles(sheet_name)?;

        let Some((origin_row, origin_col)) = range.start() else {
            tracing::debug!(sheet = sheet_name, "Worksheet is empty");
            return Ok(SheetGrid::new(sheet_name, Vec::new()));
        };

        let mut formatter = CellFormatter::new();
        let mut rows: Vec<Vec<Cell>> = vec![Vec::new(); origin_row as usize];

        for (row_offset, row) in range.rows().enumerate() {
            let row_idx = origin_row + row_offset as u32;
            let mut cells = vec![Cell::empty(); origin_col as usize];
            cells.reserve(row.len());

            for (col_offset, data) in row.iter().enumerate() {
                let coord = CellCoord::new(row_idx, origin_col + col_offset as u32);
                let value = cell_value(data);
                let format_code = styles
                    .get(&coord)
                    .and_then(|style_id| self.metadata.format_code(*style_id));
                let text = formatter.display_text(&value, format_code);
                cells.push(Cell::new(value, text));
            }

            rows.push(cells);
        }

        let grid = SheetGrid::new(sheet_name, rows);
        tracing::debug!(
            sheet = sheet_name,
            rows = grid.rows(),
            columns = grid.columns(),
            "Loaded worksheet"
        );
        Ok(grid)
    }
}

/// calamineのセルデータを型付きの値に変換
pub(crate) fn cell_value(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Empty,
        Data::Int(i) => CellValue::Int(*i),
        Data::Float(f) => CellValue::Float(*f),
        Data::String(s) => CellValue::String(s.clone()),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(datetime) => CellValue::DateTime(datetime),
            None => CellValue::Float(dt.as_f64()),
        },
        Data::DateTimeIso(s) => match parse_iso_datetime(s) {
            Some(datetime) => CellValue::DateTime(datetime),
            None => CellValue::String(s.clone()),
        },
        Data::DurationIso(s) => CellValue::String(s.clone()),
        Data::Error(e) => CellValue::Error(e.to_string()),
    }
}

/// ISO 8601形式の日付・日時を解析
fn parse_iso_datetime(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}
