//! Security Tests
//!
//! 入力ワークブックに対する資源制限のテストケースを実装します。
//! 正常なブックに不正なエントリを追加したZIPを作り、calamineが開ける状態でも
//! 変換が`SecurityViolation`で中断されることを検証します。

use rust_xlsxwriter::Workbook;
use std::io::{Cursor, Read, Write};
use xlsxcsv::{ConverterBuilder, XlsxToCsvError};
use zip::write::{FileOptions, ZipWriter};
use zip::{CompressionMethod, ZipArchive};

fn valid_workbook() -> Vec<u8> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.write_string(0, 0, "Header").unwrap();
    worksheet.write_string(1, 0, "Value").unwrap();
    workbook.save_to_buffer().unwrap()
}

/// 正常なブックを展開し、追加のエントリを加えて再圧縮する
fn repack_with(extra: &[(String, Vec<u8>)]) -> Vec<u8> {
    let mut source = ZipArchive::new(Cursor::new(valid_workbook())).unwrap();
    let mut zip_data = Vec::new();
    {
        let mut zip = ZipWriter::new(Cursor::new(&mut zip_data));
        let options = FileOptions::default().compression_method(CompressionMethod::Stored);

        for i in 0..source.len() {
            let mut entry = source.by_index(i).unwrap();
            let name = entry.name().to_string();
            let mut contents = Vec::new();
            entry.read_to_end(&mut contents).unwrap();

            zip.start_file(name, options).unwrap();
            zip.write_all(&contents).unwrap();
        }

        for (name, contents) in extra {
            zip.start_file(name.as_str(), options).unwrap();
            zip.write_all(contents).unwrap();
        }

        zip.finish().unwrap();
    }
    zip_data
}

fn convert(data: Vec<u8>) -> Result<String, XlsxToCsvError> {
    ConverterBuilder::new()
        .build()
        .unwrap()
        .convert_to_string(Cursor::new(data))
}

/// 再圧縮しただけのブックは変換できる
#[test]
fn test_valid_file_processing() {
    let csv = convert(repack_with(&[])).unwrap();
    assert_eq!(csv, "Header\r\n\"Value\"\r\n");
}

/// ZIP bomb攻撃のテスト: 大量のファイルを含むZIPアーカイブ
#[test]
fn test_zip_bomb_too_many_files() {
    // 上限: 10,000
    let extra: Vec<(String, Vec<u8>)> = (0..10_001)
        .map(|i| (format!("xl/extra/file{}.xml", i), b"x".to_vec()))
        .collect();

    match convert(repack_with(&extra)) {
        Err(XlsxToCsvError::SecurityViolation(msg)) => {
            assert!(msg.contains("too many files"), "{}", msg);
        }
        other => panic!("Expected SecurityViolation, got {:?}", other),
    }
}

/// パストラバーサル攻撃のテスト: `..`を含むパス
#[test]
fn test_path_traversal_dotdot() {
    let extra = vec![("xl/../../etc/passwd".to_string(), b"root".to_vec())];

    match convert(repack_with(&extra)) {
        Err(XlsxToCsvError::SecurityViolation(msg)) => {
            assert!(msg.contains("Invalid ZIP path"), "{}", msg);
        }
        other => panic!("Expected SecurityViolation, got {:?}", other),
    }
}

/// パストラバーサル攻撃のテスト: Windows形式の絶対パス
#[test]
fn test_path_traversal_windows_absolute_path() {
    let extra = vec![("C:\\Windows\\system32".to_string(), b"x".to_vec())];

    match convert(repack_with(&extra)) {
        Err(XlsxToCsvError::SecurityViolation(msg)) => {
            assert!(msg.contains("Invalid ZIP path"), "{}", msg);
        }
        other => panic!("Expected SecurityViolation, got {:?}", other),
    }
}

/// ファイルサイズ制限のテスト: 入力ファイルが上限を超える場合
#[test]
fn test_input_file_size_limit() {
    let data = valid_workbook();
    let limit = data.len() as u64 - 1;

    let result = ConverterBuilder::new()
        .with_max_input_size(limit)
        .build()
        .unwrap()
        .convert(Cursor::new(data), &mut Vec::new());

    match result {
        Err(XlsxToCsvError::SecurityViolation(msg)) => {
            assert!(msg.contains("Input file exceeds maximum size"), "{}", msg);
        }
        other => panic!("Expected SecurityViolation, got {:?}", other),
    }
}

/// 上限ちょうどの入力は受け付ける
#[test]
fn test_input_file_size_at_limit() {
    let data = valid_workbook();
    let limit = data.len() as u64;

    let result = ConverterBuilder::new()
        .with_max_input_size(limit)
        .build()
        .unwrap()
        .convert(Cursor::new(data), &mut Vec::new());

    assert!(result.is_ok(), "{:?}", result);
}
