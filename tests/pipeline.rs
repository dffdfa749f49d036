//! Integration tests for the offline part of the pipeline: grouping, naming
//! and template filling. No provider or pdfium library is needed.

use chrono::NaiveDate;
use handover_docx::{
    consolidate, extract, group_devices, normalize, shorten_company_name, synthesize_file_name,
    write_document, DocumentIdentity, ExtractedRecord, Extraction, ExtractionStats,
    HandoverConfig, HandoverError, IdentifierKind, RawDeviceRecord,
};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::io::{Cursor, Read, Write};
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

// ── Helpers ──────────────────────────────────────────────────────────────────

fn record(value: Value) -> ExtractedRecord {
    ExtractedRecord::from_json(&value)
}

fn devices(rows: Value) -> Vec<RawDeviceRecord> {
    record(json!({ "ds": rows })).devices
}

fn extraction(value: Value) -> Extraction {
    Extraction {
        source: "bbgn.pdf".into(),
        record: record(value),
        model_used: "gemini-2.5-pro".into(),
        stats: ExtractionStats::default(),
    }
}

const DOCUMENT_XML: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>"#,
    r#"<w:p><w:r><w:t>BIÊN BẢN BÀN GIAO NỘI BỘ</w:t></w:r></w:p>"#,
    r#"<w:p><w:r><w:t>shd</w:t></w:r></w:p>"#,
    r#"<w:p><w:r><w:t xml:space="preserve">Tp.HCM, ngày day tháng month năm year</w:t></w:r></w:p>"#,
    r#"<w:tbl><w:tblGrid><w:gridCol w:w="600"/><w:gridCol w:w="4200"/><w:gridCol w:w="900"/><w:gridCol w:w="900"/><w:gridCol w:w="2400"/></w:tblGrid>"#,
    r#"<w:tr><w:tc><w:p><w:r><w:t>STT</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>Tên thiết bị</w:t></w:r></w:p></w:tc>"#,
    r#"<w:tc><w:p><w:r><w:t>ĐVT</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>SL</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>Ghi chú</w:t></w:r></w:p></w:tc></w:tr>"#,
    r#"<w:tr><w:tc><w:p><w:r><w:t>1</w:t></w:r></w:p></w:tc><w:tc><w:p/></w:tc><w:tc><w:p/></w:tc><w:tc><w:p/></w:tc><w:tc><w:p/></w:tc></w:tr>"#,
    r#"</w:tbl></w:body></w:document>"#
);

/// A minimal `.docx`: content types, one style part and the body.
fn template_docx() -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for (name, body) in [
        ("[Content_Types].xml", "<Types/>"),
        ("word/styles.xml", "<w:styles/>"),
        ("word/document.xml", DOCUMENT_XML),
    ] {
        zip.start_file(name, options).unwrap();
        zip.write_all(body.as_bytes()).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

fn read_entry(docx: &[u8], name: &str) -> String {
    let mut archive = ZipArchive::new(Cursor::new(docx)).unwrap();
    let mut entry = archive.by_name(name).unwrap();
    let mut text = String::new();
    entry.read_to_string(&mut text).unwrap();
    text
}

// ── Worked scenarios ─────────────────────────────────────────────────────────

#[test]
fn same_projector_twice_is_one_line() {
    let rows = devices(json!([
        {"ttb": "Máy chiếu", "model": "X100", "sl": "2", "seri": ["A1"]},
        {"ttb": "Máy chiếu", "model": "X100", "sl": "3", "seri": ["A2", "A1"]}
    ]));
    let grouped = group_devices(&rows);

    assert_eq!(grouped.len(), 1);
    assert_eq!(grouped[0].quantity, 5.0);
    assert_eq!(
        grouped[0].serials.iter().cloned().collect::<Vec<_>>(),
        vec!["A1", "A2"]
    );
}

#[test]
fn quantity_with_unit_text() {
    let rows = devices(json!([{"ttb": "Loa", "sl": "  3 cái "}]));
    assert_eq!(rows[0].parsed_quantity(), 3.0);
}

#[test]
fn company_legal_form_and_trade_terms_removed() {
    assert_eq!(shorten_company_name("CÔNG TY TNHH THƯƠNG MẠI ABC"), "ABC");
}

#[test]
fn no_devices_gives_placeholder_name() {
    assert!(group_devices(&[]).is_empty());

    let name = synthesize_file_name(&DocumentIdentity::default(), &[]);
    assert_eq!(name, "ThietBi_CongTy_SoDinhDanh");
}

#[test]
fn identifier_cut_at_first_hyphen() {
    let rec = record(json!({
        "shd": "123-A/2024",
        "shd_type": "Hợp đồng",
        "cty": "Công ty Cổ phần XYZ",
        "ds": [{"ttb": "Máy in", "sl": 1}]
    }));
    assert_eq!(rec.identity.kind, IdentifierKind::Contract);

    let grouped = group_devices(&rec.devices);
    let name = synthesize_file_name(&rec.identity, &grouped);
    assert!(name.ends_with("_123"), "got: {name}");
    assert!(!name.contains("2024"));
}

// ── Properties over a mixed batch ────────────────────────────────────────────

fn noisy_batch() -> Vec<RawDeviceRecord> {
    devices(json!([
        {"ttb": "Máy chiếu", "model": "X100", "sl": "2", "seri": "A1"},
        {"ttb": "MÁY CHIẾU", "model": "X100", "sl": "1", "seri": ["A1", "", null, " A3 "]},
        {"ttb": "Máy-chiếu", "model": "X100", "sl": "x"},
        {"ttb": "Màn chiếu", "dvt": "Cái", "sl": 4, "pk": ["Khung treo", "Remote"]},
        {"ttb": "Màn chiếu", "dvt": "Cái", "sl": "1", "pk": "Khung treo\nRemote"},
        {"ttb": "Màn chiếu", "dvt": "Cái", "sl": "1", "pk": ["Remote", "Khung treo"]},
        {"ttb": "Bộ lưu điện", "sl": "1,5"},
        "not a device",
        42
    ]))
}

#[test]
fn one_line_per_distinct_key() {
    let rows = noisy_batch();
    let keys: HashSet<_> = rows.iter().map(RawDeviceRecord::group_key).collect();
    let grouped = group_devices(&rows);

    assert_eq!(grouped.len(), keys.len());
    assert_eq!(grouped.len(), 4);
}

#[test]
fn quantities_are_conserved() {
    let rows = noisy_batch();
    let input: f64 = rows.iter().map(RawDeviceRecord::parsed_quantity).sum();
    let output: f64 = group_devices(&rows).iter().map(|d| d.quantity).sum();
    assert!((input - output).abs() < 1e-9, "{input} vs {output}");
}

#[test]
fn serial_sets_are_clean() {
    for device in group_devices(&noisy_batch()) {
        assert!(device.serials.iter().all(|s| !s.is_empty() && s.trim() == s));
    }
    let projector = &group_devices(&noisy_batch())[0];
    assert_eq!(projector.serial_text(), "A1, A3");
    assert_eq!(projector.quantity, 3.0);
}

#[test]
fn normalizer_is_idempotent() {
    for text in [
        "",
        "  Máy  Chiếu ",
        "ĐIỀU HÒA - 2 chiều",
        "Ổn áp\tLioa\n10KVA",
        "already normal",
        "Ỹ-ỹ--Ỵ",
    ] {
        let once = normalize(text);
        assert_eq!(normalize(&once), once, "input: {text:?}");
    }
}

#[test]
fn file_name_is_deterministic() {
    let rec = record(json!({
        "shd": "PO-889",
        "shd_type": "PO",
        "cty": "CÔNG TY TNHH MTV DỊCH VỤ KỸ THUẬT MINH ANH",
        "ds": [
            {"ttb": "Máy tính xách tay", "sl": "3"},
            {"ttb": "Chuột (không dây)", "sl": "3"},
            {"ttb": "Bàn phím", "sl": "1"}
        ]
    }));
    let grouped = group_devices(&rec.devices);
    let first = synthesize_file_name(&rec.identity, &grouped);

    for _ in 0..5 {
        assert_eq!(synthesize_file_name(&rec.identity, &grouped), first);
    }
    assert!(first.starts_with("03_Máy_tính_xách_tay-03_Chuột_không_dây_"), "got: {first}");
    assert!(!first.contains("Bàn"));
}

#[test]
fn shortener_only_empties_empty_input() {
    for name in [
        "CÔNG TY TNHH",
        "Công ty Cổ phần",
        "THƯƠNG MẠI DỊCH VỤ",
        "ABC",
        "Công ty TNHH Một Thành Viên Đầu Tư Phát Triển",
        " , & ",
    ] {
        assert!(!shorten_company_name(name).is_empty(), "input: {name:?}");
    }
    assert_eq!(shorten_company_name(""), "");
}

// ── Consolidation and documents ──────────────────────────────────────────────

#[test]
fn consolidate_rejects_records_without_devices() {
    let err = consolidate(extraction(json!({"shd": "1", "ds": []}))).unwrap_err();
    assert!(matches!(err, HandoverError::NoDevices { .. }));
}

#[test]
fn writes_filled_document() {
    let output = consolidate(extraction(json!({
        "shd": "123-A/2024",
        "shd_type": "Hợp đồng",
        "cty": "CÔNG TY TNHH THƯƠNG MẠI ABC",
        "ds": [
            {"ttb": "Máy chiếu", "model": "X100", "hang": "Epson", "nsx": "Nhật Bản",
             "dvt": "Cái", "sl": "2", "seri": ["B7", "A1"]},
            {"ttb": "Máy chiếu", "model": "X100", "hang": "Epson", "nsx": "Nhật Bản",
             "dvt": "Cái", "sl": "1", "seri": "C3"},
            {"ttb": "Màn chiếu", "dvt": "Bộ", "sl": "1", "pk": "Bao gồm:\n- Khung treo"}
        ]
    })))
    .unwrap();
    assert_eq!(output.file_name, "03_Máy_chiếu-01_Màn_chiếu_ABC_123.docx");

    let dir = tempfile::tempdir().unwrap();
    let out_dir = dir.path().join("out");
    let date = NaiveDate::from_ymd_opt(2024, 11, 5).unwrap();
    let path = write_document(&output, &template_docx(), &out_dir, date).unwrap();

    assert_eq!(path, out_dir.join(&output.file_name));
    let docx = std::fs::read(&path).unwrap();
    let body = read_entry(&docx, "word/document.xml");

    assert!(body.contains("Dựa theo HĐ số: 123-A/2024"));
    assert!(body.contains("Tp.HCM, ngày 5 tháng 11 năm 2024"));
    assert!(body.contains("<w:t>Tên thiết bị</w:t>"));
    assert!(body.contains("Số seri: A1, B7, C3"));
    assert!(body.contains("  + Khung treo"));
    // header + two device rows; the sample row is gone
    assert_eq!(body.matches("<w:tr>").count(), 3);

    assert_eq!(read_entry(&docx, "word/styles.xml"), "<w:styles/>");
    // no temp file left behind
    assert_eq!(std::fs::read_dir(&out_dir).unwrap().count(), 1);
}

#[test]
fn same_name_documents_do_not_overwrite() {
    let record = |shd: &str| {
        consolidate(extraction(json!({
            "shd": shd,
            "shd_type": "Hợp đồng",
            "cty": "CÔNG TY TNHH THƯƠNG MẠI ABC",
            "ds": [{"ttb": "Máy chiếu", "dvt": "Cái", "sl": "1"}]
        })))
        .unwrap()
    };
    let first = record("123-A");
    let second = record("123-B");
    assert_eq!(first.file_name, second.file_name);

    let dir = tempfile::tempdir().unwrap();
    let date = NaiveDate::from_ymd_opt(2024, 11, 5).unwrap();
    let pa = write_document(&first, &template_docx(), dir.path(), date).unwrap();
    let pb = write_document(&second, &template_docx(), dir.path(), date).unwrap();

    assert_ne!(pa, pb);
    assert_eq!(pa, dir.path().join("01_Máy_chiếu_ABC_123.docx"));
    assert_eq!(pb, dir.path().join("01_Máy_chiếu_ABC_123_2.docx"));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    assert!(read_entry(&std::fs::read(&pa).unwrap(), "word/document.xml").contains("123-A"));
    assert!(read_entry(&std::fs::read(&pb).unwrap(), "word/document.xml").contains("123-B"));
}

#[test]
fn broken_template_is_rejected() {
    let output = consolidate(extraction(json!({"ds": [{"ttb": "Loa", "sl": 1}]}))).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let err = write_document(
        &output,
        b"PK not really",
        dir.path(),
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
    )
    .unwrap_err();
    assert!(matches!(err, HandoverError::TemplateInvalid { .. }));
}

// ── Input handling (fails before any model call) ─────────────────────────────

#[test]
fn unsupported_input_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.pdf");
    std::fs::write(&path, b"hello, not a pdf").unwrap();

    let err = tokio_test::block_on(extract(&path, &HandoverConfig::default())).unwrap_err();
    match err {
        HandoverError::UnsupportedInput { magic, .. } => assert_eq!(&magic, b"hell"),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn missing_input_is_reported() {
    let err = extract("/definitely/not/here.pdf", &HandoverConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, HandoverError::FileNotFound { .. }));
}
