//! Types Module
//!
//! クレート全体で使用する共通データ型と、ワークシートの読み取りインターフェースを
//! 定義するモジュール。

use chrono::NaiveDateTime;

use crate::api::ColumnType;

/// セルの値（型付き）
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// 空セル（値なし）
    Empty,

    /// 整数
    Int(i64),

    /// 浮動小数点数
    Float(f64),

    /// 日付・時刻
    DateTime(NaiveDateTime),

    /// 文字列
    String(String),

    /// 論理値
    Bool(bool),

    /// エラー値（例: #DIV/0!）
    Error(String),
}

impl CellValue {
    /// 値が存在しないかどうか
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// 日付・時刻値かどうか
    pub fn is_datetime(&self) -> bool {
        matches!(self, CellValue::DateTime(_))
    }

    /// 数値として認識される型（整数・浮動小数点数）かどうか
    pub fn is_numeric(&self) -> bool {
        matches!(self, CellValue::Int(_) | CellValue::Float(_))
    }
}

/// セル: 型付きの値と、表示書式を適用済みの表示テキスト
///
/// 表示テキストはスプレッドシートビューアが表示する文字列に相当し、
/// 値とは別に算出されます。
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    /// 型付きの値
    pub value: CellValue,

    /// 表示テキスト（書式適用済み）
    pub text: String,
}

static EMPTY_CELL: Cell = Cell::empty();

impl Cell {
    /// 新しいセルを生成
    pub fn new(value: CellValue, text: impl Into<String>) -> Self {
        Self {
            value,
            text: text.into(),
        }
    }

    /// 空セルを生成
    pub const fn empty() -> Self {
        Self {
            value: CellValue::Empty,
            text: String::new(),
        }
    }

    /// 文字列セルを生成（表示テキストは値と同じ）
    pub fn string(s: impl Into<String>) -> Self {
        let s = s.into();
        Self {
            text: s.clone(),
            value: CellValue::String(s),
        }
    }
}

impl Default for Cell {
    fn default() -> Self {
        Self::empty()
    }
}

/// ワークシートの読み取りインターフェース
///
/// 行・列はともに1始まりです。行1・列1はシートのA1セルに対応します。
/// 範囲外の座標は空セルとして扱われます。
pub trait Worksheet {
    /// 使用範囲の行数
    fn rows(&self) -> usize;

    /// 使用範囲の列数
    fn columns(&self) -> usize;

    /// セルを取得（1始まり）
    fn cell(&self, row: usize, col: usize) -> &Cell;
}

/// メモリ上のワークシート
///
/// ワークブックから読み込んだシート、またはテスト用に組み立てたシートを保持します。
#[derive(Debug, Clone, Default)]
pub struct SheetGrid {
    /// シート名
    name: String,

    /// セルデータ（行 × 列、0始まりで格納）
    cells: Vec<Vec<Cell>>,

    /// 列数（最長の行に合わせる）
    columns: usize,
}

impl SheetGrid {
    /// 行のリストからシートを生成
    pub fn new(name: impl Into<String>, cells: Vec<Vec<Cell>>) -> Self {
        let columns = cells.iter().map(Vec::len).max().unwrap_or(0);
        Self {
            name: name.into(),
            cells,
            columns,
        }
    }

    /// シート名
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Worksheet for SheetGrid {
    fn rows(&self) -> usize {
        self.cells.len()
    }

    fn columns(&self) -> usize {
        self.columns
    }

    fn cell(&self, row: usize, col: usize) -> &Cell {
        if row == 0 || col == 0 {
            return &EMPTY_CELL;
        }
        self.cells
            .get(row - 1)
            .and_then(|cells| cells.get(col - 1))
            .unwrap_or(&EMPTY_CELL)
    }
}

/// 列番号（1始まり）から列の型への対応
///
/// 分類時に一度だけ生成され、以降は読み取り専用です。
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ColumnTypes(Vec<ColumnType>);

impl ColumnTypes {
    pub(crate) fn new(types: Vec<ColumnType>) -> Self {
        Self(types)
    }

    /// 列の型を取得（1始まり）
    ///
    /// 分類範囲外の列はテキストとして扱います。
    pub fn get(&self, col: usize) -> ColumnType {
        col.checked_sub(1)
            .and_then(|idx| self.0.get(idx))
            .copied()
            .unwrap_or(ColumnType::Text)
    }

    /// 分類済みの列数
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// 分類済みの列がないかどうか
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// 列順のスライス
    pub fn as_slice(&self) -> &[ColumnType] {
        &self.0
    }
}

/// セル座標（0始まり）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct CellCoord {
    pub row: u32,
    pub col: u32,
}

impl CellCoord {
    /// 新しい座標を生成
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// A1形式の参照を座標に変換（例: "A1" -> (0, 0), "AB12" -> (11, 27)）
    ///
    /// `$` による絶対参照記号は無視します。
    pub fn from_a1(reference: &str) -> Option<Self> {
        let reference = reference.trim_start_matches('$');
        let split = reference.find(|c: char| !c.is_ascii_alphabetic())?;
        let (letters, digits) = reference.split_at(split);
        if letters.is_empty() {
            return None;
        }

        let col = letters.chars().try_fold(0u32, |acc, ch| {
            let val = (ch.to_ascii_uppercase() as u32) - ('A' as u32) + 1;
            acc.checked_mul(26)?.checked_add(val)
        })?;

        let row = digits.trim_start_matches('$').parse::<u32>().ok()?;
        if row == 0 {
            return None;
        }

        Some(Self::new(row - 1, col - 1))
    }
}
