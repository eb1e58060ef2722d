//! Integration tests for xml2sheet
//!
//! These tests convert files on disk and read the resulting XLSX packages
//! back with the zip crate.

use std::fs::{self, File};
use std::io::Read;
use std::path::Path;

use tempfile::tempdir;
use xml2sheet::converter::{default_output_path, ConversionConfig, ConversionError};
use xml2sheet::{InputFormat, XmlConverter};
use zip::ZipArchive;

const CATALOG_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<catalog xmlns:c="urn:catalog">
  <c:book>
    <c:title>Rust &amp; XML</c:title>
    <c:price>39.95</c:price>
  </c:book>
  <c:book>
    <c:title><![CDATA[<Streaming>]]></c:title>
    <c:price>12.00</c:price>
    <c:isbn>978-0</c:isbn>
  </c:book>
</catalog>"#;

const CHIP_SVD: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<device schemaVersion="1.3">
  <name>CHIP</name>
  <peripherals>
    <peripheral>
      <name>TIMER0</name>
      <baseAddress>0x40010000</baseAddress>
      <registers>
        <register>
          <name>CR</name>
          <addressOffset>0x0</addressOffset>
          <fields>
            <field><name>EN</name><bitOffset>0</bitOffset><bitWidth>1</bitWidth></field>
            <field><name>MODE</name><bitOffset>1</bitOffset><bitWidth>2</bitWidth></field>
          </fields>
        </register>
      </registers>
    </peripheral>
    <peripheral>
      <name>TIMER1</name>
      <baseAddress>0x40011000</baseAddress>
    </peripheral>
  </peripherals>
</device>"#;

fn write_input(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

fn read_part(path: &Path, part: &str) -> String {
    let mut archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
    let mut entry = archive.by_name(part).unwrap();
    let mut content = String::new();
    entry.read_to_string(&mut content).unwrap();
    content
}

#[test]
fn test_generic_file_to_xlsx() {
    let dir = tempdir().unwrap();
    let input = write_input(dir.path(), "catalog.xml", CATALOG_XML);
    let output = default_output_path(&input);

    let stats = XmlConverter::new().convert(&input, &output).unwrap();
    assert_eq!(stats.format, InputFormat::Generic);
    assert_eq!(stats.repeating_element.as_ref().unwrap().name, "book");
    assert_eq!(stats.total_rows(), 2);
    assert!(stats.output_file_size > 0);
    assert_eq!(stats.output_file_size, fs::metadata(&output).unwrap().len());

    let workbook = read_part(&output, "xl/workbook.xml");
    assert!(workbook.contains(r#"<sheet name="Sheet1" sheetId="1" r:id="rId1"/>"#));

    let sheet = read_part(&output, "xl/worksheets/sheet1.xml");
    // Sorted headers: isbn, price, title
    assert!(sheet.contains(r#"<c r="A1" s="1" t="inlineStr"><is><t>isbn</t></is></c>"#));
    assert!(sheet.contains(r#"<c r="C1" s="1" t="inlineStr"><is><t>title</t></is></c>"#));
    assert!(sheet.contains("<t>Rust &amp; XML</t>"));
    assert!(sheet.contains("<t>&lt;Streaming&gt;</t>"));
    assert!(sheet.contains(r#"<c r="A3" t="inlineStr"><is><t>978-0</t></is></c>"#));
    assert!(!sheet.contains(r#"r="A2""#));
    assert!(sheet.contains(r#"<col min="3" max="3" width="15" customWidth="1"/>"#));
}

#[test]
fn test_svd_file_to_xlsx() {
    let dir = tempdir().unwrap();
    let input = write_input(dir.path(), "chip.SVD", CHIP_SVD);
    let output = dir.path().join("chip.xlsx");

    let stats = XmlConverter::new().convert(&input, &output).unwrap();
    assert_eq!(stats.format, InputFormat::Svd);
    let counts = stats.entity_counts.unwrap();
    assert_eq!((counts.peripherals, counts.registers, counts.fields), (2, 1, 2));

    let workbook = read_part(&output, "xl/workbook.xml");
    let peripherals = workbook.find("Peripherals").unwrap();
    let registers = workbook.find("Registers").unwrap();
    let fields = workbook.find("Fields").unwrap();
    assert!(peripherals < registers && registers < fields);

    let peripheral_sheet = read_part(&output, "xl/worksheets/sheet1.xml");
    assert!(peripheral_sheet.contains("<t>P0000</t>"));
    assert!(peripheral_sheet.contains("<t>P0001</t>"));
    assert!(peripheral_sheet.contains("<t>TIMER1</t>"));

    let field_sheet = read_part(&output, "xl/worksheets/sheet3.xml");
    assert!(field_sheet.contains("<t>F0001</t>"));
    assert!(field_sheet.contains("<t>MODE</t>"));
    assert_eq!(field_sheet.matches("<t>R0000</t>").count(), 2);
    assert!(!field_sheet.contains("tabSelected"));
}

#[test]
fn test_device_root_detected_without_extension() {
    let dir = tempdir().unwrap();
    let input = write_input(dir.path(), "chip.xml", CHIP_SVD);
    let output = dir.path().join("chip.xlsx");

    let stats = XmlConverter::new().convert(&input, &output).unwrap();
    assert_eq!(stats.format, InputFormat::Svd);
}

#[test]
fn test_forced_svd_on_plain_xml() {
    let dir = tempdir().unwrap();
    let input = write_input(dir.path(), "catalog.xml", CATALOG_XML);
    let output = dir.path().join("catalog.xlsx");

    let stats = XmlConverter::new()
        .convert_as(&input, &output, InputFormat::Svd)
        .unwrap();
    assert_eq!(stats.total_rows(), 0);
    assert_eq!(stats.writer.sheets.len(), 3);

    let registers = read_part(&output, "xl/worksheets/sheet2.xml");
    assert!(registers.contains("<t>_peripheral_id</t>"));
    assert!(!registers.contains(r#"<row r="2">"#));
}

#[test]
fn test_failed_conversion_leaves_no_workbook() {
    let dir = tempdir().unwrap();
    let input = write_input(dir.path(), "broken.xml", "<r><e><a>1</a></e><e><a>2</a></e>");
    let output = dir.path().join("broken.xlsx");

    let err = XmlConverter::new().convert(&input, &output).unwrap_err();
    assert!(matches!(err, ConversionError::Parse(_)));
    assert!(!output.exists());
}

#[test]
fn test_detection_failure_leaves_no_workbook() {
    let dir = tempdir().unwrap();
    let input = write_input(dir.path(), "single.xml", "<r><e><a>1</a></e></r>");
    let output = dir.path().join("single.xlsx");

    let err = XmlConverter::new().convert(&input, &output).unwrap_err();
    assert!(err.to_string().contains("Failed to detect repeating XML element"));
    assert!(!output.exists());
}

#[test]
fn test_profiles_write_identical_sheets() {
    let dir = tempdir().unwrap();
    let mut xml = String::from("<log>");
    for i in 0..300 {
        xml.push_str(&format!("<entry><id>{}</id><level>{}</level></entry>", i, i % 3));
    }
    xml.push_str("</log>");
    let input = write_input(dir.path(), "log.xml", &xml);

    let low = dir.path().join("low.xlsx");
    let fast = dir.path().join("fast.xlsx");
    XmlConverter::with_config(ConversionConfig::low_memory())
        .convert(&input, &low)
        .unwrap();
    XmlConverter::with_config(ConversionConfig::throughput())
        .convert(&input, &fast)
        .unwrap();

    assert_eq!(
        read_part(&low, "xl/worksheets/sheet1.xml"),
        read_part(&fast, "xl/worksheets/sheet1.xml")
    );
}

#[test]
fn test_control_character_reference_yields_valid_sheet() {
    let dir = tempdir().unwrap();
    let input = write_input(
        dir.path(),
        "controls.xml",
        "<items><item><a>x&#1;y</a></item><item><a>z</a></item></items>",
    );
    let output = dir.path().join("controls.xlsx");

    XmlConverter::new().convert(&input, &output).unwrap();

    let sheet = read_part(&output, "xl/worksheets/sheet1.xml");
    assert!(!sheet.contains('\u{1}'));
    assert!(sheet.contains("<t>xy</t>"));
    assert!(sheet.contains("<t>z</t>"));
}

#[test]
fn test_inspect_generic_and_svd() {
    let dir = tempdir().unwrap();
    let catalog = write_input(dir.path(), "catalog.xml", CATALOG_XML);
    let chip = write_input(dir.path(), "chip.svd", CHIP_SVD);

    let converter = XmlConverter::new();
    let summary = converter.inspect(&catalog).unwrap();
    assert_eq!(summary.format, InputFormat::Generic);
    assert_eq!(summary.columns, vec!["isbn", "price", "title"]);

    let summary = converter.inspect(&chip).unwrap();
    assert_eq!(summary.format, InputFormat::Svd);
    assert_eq!(summary.entity_counts.unwrap().fields, 2);
    assert!(summary.columns.is_empty());
}
