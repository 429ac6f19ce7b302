//! Parser Module
//!
//! calamineとXMLメタデータを組み合わせたExcelファイル解析。

mod metadata;
mod workbook;

pub(crate) use metadata::XlsxMetadata;
pub(crate) use workbook::WorkbookParser;
