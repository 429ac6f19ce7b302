//! XML Metadata Parser Module
//!
//! XLSX内部のXMLファイルから、calamineで取得できない情報を抽出するモジュール。
//! セルごとのスタイルID、Number Format String、シート名とXMLパスの対応を提供します。

use std::collections::HashMap;
use std::io::{Cursor, Read};

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use zip::ZipArchive;

use crate::error::XlsxToCsvError;
use crate::security::{validate_zip_path, SecurityConfig};
use crate::types::CellCoord;

/// XLSXメタデータ
///
/// XLSXファイル（ZIPアーカイブ）からXMLを直接解析し、表示書式の
/// 解決に必要な情報を保持します。
pub(crate) struct XlsxMetadata {
    archive: ZipArchive<Cursor<Vec<u8>>>,
    /// numFmtId -> formatCode
    num_formats: HashMap<u32, String>,
    /// styleId（cellXfsのインデックス） -> numFmtId
    cell_xfs: Vec<u32>,
    /// シート名 -> ワークシートXMLのパス
    sheet_paths: HashMap<String, String>,
}

impl std::fmt::Debug for XlsxMetadata {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XlsxMetadata")
            .field("num_formats", &self.num_formats)
            .field("cell_xfs", &self.cell_xfs)
            .field("sheet_paths", &self.sheet_paths)
            .finish_non_exhaustive()
    }
}

impl XlsxMetadata {
    /// XLSXファイルの内容からメタデータを解析
    ///
    /// # 引数
    ///
    /// * `buffer` - XLSXファイルの内容
    /// * `security` - 資源制限
    ///
    /// # 戻り値
    ///
    /// * `Ok(XlsxMetadata)` - 解析に成功した場合
    /// * `Err(XlsxToCsvError)` - ZIP・XMLの解析エラー、または制限違反
    pub fn new(buffer: Vec<u8>, security: &SecurityConfig) -> Result<Self, XlsxToCsvError> {
        let mut archive = ZipArchive::new(Cursor::new(buffer)).map_err(XlsxToCsvError::zip)?;
        security.check_archive(&mut archive)?;

        let (num_formats, cell_xfs) = match read_entry(&mut archive, "xl/styles.xml")? {
            Some(xml) => parse_styles(&xml)?,
            None => (HashMap::new(), Vec::new()),
        };

        let relationships = match read_entry(&mut archive, "xl/_rels/workbook.xml.rels")? {
            Some(xml) => parse_relationships(&xml)?,
            None => HashMap::new(),
        };

        let mut sheet_paths = HashMap::new();
        if let Some(xml) = read_entry(&mut archive, "xl/workbook.xml")? {
            for (name, rel_id) in parse_workbook_sheets(&xml)? {
                match relationships.get(&rel_id).map(|target| resolve_target(target)) {
                    Some(path) if validate_zip_path(&path).is_ok() => {
                        sheet_paths.insert(name, path);
                    }
                    _ => tracing::warn!(sheet = %name, rel_id = %rel_id, "Unresolved worksheet relationship"),
                }
            }
        }

        tracing::debug!(
            custom_formats = num_formats.len(),
            cell_styles = cell_xfs.len(),
            sheets = sheet_paths.len(),
            "Parsed workbook metadata"
        );

        Ok(Self {
            archive,
            num_formats,
            cell_xfs,
            sheet_paths,
        })
    }

    /// スタイルIDからNumber Format Stringを取得
    ///
    /// ワークブックで定義された書式を優先し、なければビルトイン書式を使用します。
    pub fn format_code(&self, style_id: u32) -> Option<&str> {
        let num_fmt_id = *self.cell_xfs.get(style_id as usize)?;
        self.num_formats
            .get(&num_fmt_id)
            .map(String::as_str)
            .or_else(|| get_builtin_format(num_fmt_id))
    }

    /// シートの各セルのスタイルIDを取得
    ///
    /// シートのXMLが見つからない場合は空のマップを返します（すべてGeneral扱い）。
    pub fn cell_styles(&mut self, sheet_name: &str) -> Result<HashMap<CellCoord, u32>, XlsxToCsvError> {
        let Some(path) = self.sheet_paths.get(sheet_name).cloned() else {
            tracing::warn!(sheet = sheet_name, "Worksheet XML not found, using General format");
            return Ok(HashMap::new());
        };

        match read_entry(&mut self.archive, &path)? {
            Some(xml) => parse_cell_styles(&xml),
            None => {
                tracing::warn!(sheet = sheet_name, path = %path, "Worksheet XML not found, using General format");
                Ok(HashMap::new())
            }
        }
    }
}

/// ZIPエントリを読み込む（存在しない場合は`None`）
fn read_entry(
    archive: &mut ZipArchive<Cursor<Vec<u8>>>,
    path: &str,
) -> Result<Option<Vec<u8>>, XlsxToCsvError> {
    let mut file = match archive.by_name(path) {
        Ok(file) => file,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(XlsxToCsvError::zip(e)),
    };

    let mut content = Vec::with_capacity(file.size() as usize);
    file.read_to_end(&mut content)?;
    Ok(Some(content))
}

fn attr_u32(value: &[u8]) -> Result<u32, XlsxToCsvError> {
    Ok(std::str::from_utf8(value)?.parse::<u32>()?)
}

/// 要素の属性値をアンエスケープして取得
fn attr_string(element: &BytesStart<'_>, local_name: &[u8]) -> Result<Option<String>, XlsxToCsvError> {
    for attr in element.attributes() {
        let attr = attr.map_err(XlsxToCsvError::xml)?;
        if attr.key.local_name().as_ref() == local_name {
            let raw = std::str::from_utf8(&attr.value)?;
            let value = quick_xml::escape::unescape(raw).map_err(XlsxToCsvError::xml)?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// xl/styles.xml を解析
///
/// `<numFmts>` のカスタム書式と、`<cellXfs>` の各スタイルが参照する書式IDを取得します。
fn parse_styles(xml: &[u8]) -> Result<(HashMap<u32, String>, Vec<u32>), XlsxToCsvError> {
    let mut reader = Reader::from_reader(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut num_formats = HashMap::new();
    let mut cell_xfs = Vec::new();
    let mut in_cell_xfs = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"cellXfs" => in_cell_xfs = true,
            Ok(Event::End(e)) if e.local_name().as_ref() == b"cellXfs" => in_cell_xfs = false,
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"numFmt" => {
                    // <numFmt numFmtId="164" formatCode="00000"/>
                    let id = attr_string(&e, b"numFmtId")?;
                    let code = attr_string(&e, b"formatCode")?;
                    if let (Some(id), Some(code)) = (id, code) {
                        num_formats.insert(attr_u32(id.as_bytes())?, code);
                    }
                }
                b"xf" if in_cell_xfs => {
                    let num_fmt_id = match attr_string(&e, b"numFmtId")? {
                        Some(id) => attr_u32(id.as_bytes())?,
                        None => 0,
                    };
                    cell_xfs.push(num_fmt_id);
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(XlsxToCsvError::xml(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok((num_formats, cell_xfs))
}

/// xl/workbook.xml の `<sheet name=".." r:id=".."/>` を定義順に取得
fn parse_workbook_sheets(xml: &[u8]) -> Result<Vec<(String, String)>, XlsxToCsvError> {
    let mut reader = Reader::from_reader(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut sheets = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.local_name().as_ref() == b"sheet" => {
                let name = attr_string(&e, b"name")?;
                let rel_id = attr_string(&e, b"id")?;
                if let (Some(name), Some(rel_id)) = (name, rel_id) {
                    sheets.push((name, rel_id));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(XlsxToCsvError::xml(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(sheets)
}

/// リレーションシップファイルを解析（Id -> Target）
fn parse_relationships(xml: &[u8]) -> Result<HashMap<String, String>, XlsxToCsvError> {
    let mut reader = Reader::from_reader(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut relationships = HashMap::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e))
                if e.local_name().as_ref() == b"Relationship" =>
            {
                let id = attr_string(&e, b"Id")?;
                let target = attr_string(&e, b"Target")?;
                if let (Some(id), Some(target)) = (id, target) {
                    relationships.insert(id, target);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(XlsxToCsvError::xml(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(relationships)
}

/// リレーションシップのターゲットをZIPエントリのパスに変換
///
/// `/xl/worksheets/sheet1.xml` は先頭の `/` を除き、`worksheets/sheet1.xml` は
/// `xl/` からの相対パスとして扱います。
fn resolve_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{}", target),
    }
}

/// ワークシートXMLからセルごとのスタイルID（`s`属性）を取得
fn parse_cell_styles(xml: &[u8]) -> Result<HashMap<CellCoord, u32>, XlsxToCsvError> {
    let mut reader = Reader::from_reader(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut styles = HashMap::new();
    let mut current_row: u32 = 0;
    let mut next_col: u32 = 0;
    let mut seen_row = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"row" => {
                    // r属性がない行は直前の行の次とみなす
                    current_row = match attr_string(&e, b"r")? {
                        Some(r) => attr_u32(r.as_bytes())?.saturating_sub(1),
                        None if seen_row => current_row + 1,
                        None => 0,
                    };
                    seen_row = true;
                    next_col = 0;
                }
                b"c" => {
                    let coord = attr_string(&e, b"r")?
                        .and_then(|r| CellCoord::from_a1(&r))
                        .unwrap_or_else(|| CellCoord::new(current_row, next_col));
                    next_col = coord.col + 1;

                    if let Some(s) = attr_string(&e, b"s")? {
                        styles.insert(coord, attr_u32(s.as_bytes())?);
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(XlsxToCsvError::xml(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(styles)
}

/// ビルトイン書式IDのマッピング
///
/// 日付書式（14, 22）は en-US 環境での表示に合わせています。
/// 分数書式（12, 13）は未対応のため、General として扱います。
fn get_builtin_format(id: u32) -> Option<&'static str> {
    match id {
        0 => Some("General"),
        1 => Some("0"),
        2 => Some("0.00"),
        3 => Some("#,##0"),
        4 => Some("#,##0.00"),
        5 => Some("$#,##0_);($#,##0)"),
        6 => Some("$#,##0_);[Red]($#,##0)"),
        7 => Some("$#,##0.00_);($#,##0.00)"),
        8 => Some("$#,##0.00_);[Red]($#,##0.00)"),
        9 => Some("0%"),
        10 => Some("0.00%"),
        11 => Some("0.00E+00"),
        14 => Some("m/d/yyyy"),
        15 => Some("d-mmm-yy"),
        16 => Some("d-mmm"),
        17 => Some("mmm-yy"),
        18 => Some("h:mm AM/PM"),
        19 => Some("h:mm:ss AM/PM"),
        20 => Some("h:mm"),
        21 => Some("h:mm:ss"),
        22 => Some("m/d/yyyy h:mm"),
        37 => Some("#,##0_);(#,##0)"),
        38 => Some("#,##0_);[Red](#,##0)"),
        39 => Some("#,##0.00_);(#,##0.00)"),
        40 => Some("#,##0.00_);[Red](#,##0.00)"),
        41 => Some("_(* #,##0_);_(* (#,##0);_(* \"-\"_);_(@_)"),
        42 => Some("_($* #,##0_);_($* (#,##0);_($* \"-\"_);_(@_)"),
        43 => Some("_(* #,##0.00_);_(* (#,##0.00);_(* \"-\"??_);_(@_)"),
        44 => Some("_($* #,##0.00_);_($* (#,##0.00);_($* \"-\"??_);_(@_)"),
        45 => Some("mm:ss"),
        46 => Some("[h]:mm:ss"),
        47 => Some("mm:ss.0"),
        48 => Some("##0.0E+0"),
        49 => Some("@"),
        _ => None,
    }
}
