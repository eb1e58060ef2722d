use super::svd::{
    format_id, ID_COLUMN, PERIPHERAL_ID_COLUMN, PERIPHERAL_NAME_COLUMN, REGISTER_ID_COLUMN,
    REGISTER_NAME_COLUMN,
};
use super::*;
use std::io::Cursor;

const ITEMS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<items>
  <item>
    <name>X</name>
    <qty>3</qty>
  </item>
  <item>
    <name>Y</name>
    <qty>5</qty>
  </item>
</items>"#;

const MINIMAL_SVD: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<device schemaVersion="1.3">
  <name>STM32F0</name>
  <peripherals>
    <peripheral>
      <name>GPIOA</name>
      <description>General-purpose I/Os</description>
      <baseAddress>0x48000000</baseAddress>
      <registers>
        <register>
          <name>MODER</name>
          <addressOffset>0x0</addressOffset>
          <resetValue>0x28000000</resetValue>
          <fields>
            <field>
              <name>MODER15</name>
              <bitOffset>30</bitOffset>
              <bitWidth>2</bitWidth>
            </field>
          </fields>
        </register>
        <register>
          <name>OTYPER</name>
          <addressOffset>0x4</addressOffset>
        </register>
      </registers>
    </peripheral>
  </peripherals>
</device>"#;

fn flatten(xml: &str, element: &str) -> Vec<crate::Record> {
    RecordStreamer::new(xml.as_bytes(), element)
        .records()
        .collect::<Result<Vec<_>, _>>()
        .unwrap()
}

fn extract(xml: &str) -> Vec<SvdEntity> {
    SvdExtractor::new(xml.as_bytes())
        .entities()
        .collect::<Result<Vec<_>, _>>()
        .unwrap()
}

fn of_kind(entities: &[SvdEntity], kind: EntityKind) -> Vec<&crate::Record> {
    entities
        .iter()
        .filter(|e| e.kind == kind)
        .map(|e| &e.record)
        .collect()
}

// ============================================================================
// Detection
// ============================================================================

#[test]
fn test_detect_items() {
    let detected = detect_repeating_element(ITEMS_XML.as_bytes()).unwrap();
    // name, qty and item all occur twice; item is seen first
    assert_eq!(detected.name, "item");
    assert_eq!(detected.occurrences, 2);
}

#[test]
fn test_detect_prefers_highest_count() {
    let xml = "<root><a><b/><b/><b/></a><a/></root>";
    let detected = detect_repeating_element(xml.as_bytes()).unwrap();
    assert_eq!(detected.name, "b");
    assert_eq!(detected.occurrences, 3);
}

#[test]
fn test_detect_root_is_not_counted() {
    let xml = "<row><row/></row>";
    assert!(matches!(
        detect_repeating_element(xml.as_bytes()),
        Err(ParseError::NoRepeatingElement { min_occurrences: 2 })
    ));
}

#[test]
fn test_detect_fails_without_repetition() {
    let xml = "<root><a>1</a><b>2</b><c><d/></c></root>";
    let err = detect_repeating_element(xml.as_bytes()).unwrap_err();
    assert!(matches!(err, ParseError::NoRepeatingElement { .. }));
    assert!(err.to_string().contains("Failed to detect repeating XML element"));
}

#[test]
fn test_detect_malformed_is_parse_error() {
    let xml = "<root><a></b><a/></root>";
    assert!(matches!(
        detect_repeating_element(xml.as_bytes()),
        Err(ParseError::XmlError(_))
    ));
}

#[test]
fn test_element_counts_first_seen_order() {
    let counts = count_elements("<r><z/><a/><z/><a/></r>".as_bytes()).unwrap();
    let names: Vec<_> = counts.iter().map(|(name, _)| name).collect();
    assert_eq!(names, vec!["z", "a"]);
    assert_eq!(counts.get("a"), 2);
    assert_eq!(counts.get("missing"), 0);
    assert_eq!(counts.most_repeated().unwrap().name, "z");
}

// ============================================================================
// Flattening
// ============================================================================

#[test]
fn test_flatten_items() {
    let records = flatten(ITEMS_XML, "item");
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["name"], "X");
    assert_eq!(records[0]["qty"], "3");
    assert_eq!(records[1]["name"], "Y");
    assert_eq!(records[1]["qty"], "5");
}

#[test]
fn test_flatten_omits_empty_children() {
    let records = flatten("<r><i><a>1</a><b></b></i><i><a>2</a><b>   </b></i></r>", "i");
    assert_eq!(records[0].get("a").map(String::as_str), Some("1"));
    assert!(!records[0].contains_key("b"));
    assert!(!records[1].contains_key("b"));
}

#[test]
fn test_flatten_ignores_grandchildren() {
    let xml = "<r><i><a>1</a><nested><deep>x</deep></nested></i><i><a>2</a></i></r>";
    let records = flatten(xml, "i");
    assert_eq!(records[0].len(), 1);
    assert!(!records[0].contains_key("deep"));
    assert!(!records[0].contains_key("nested"));
}

#[test]
fn test_flatten_trims_and_unescapes() {
    let xml = "<r><i><a>  Tom &amp; Jerry  </a><b><![CDATA[<raw>]]></b></i></r>";
    let records = flatten(xml, "i");
    assert_eq!(records[0]["a"], "Tom & Jerry");
    assert_eq!(records[0]["b"], "<raw>");
}

#[test]
fn test_flatten_element_without_children_yields_empty_record() {
    let records = flatten("<r><i/><i>text</i></r>", "i");
    assert_eq!(records.len(), 2);
    assert!(records[0].is_empty());
    assert!(records[1].is_empty());
}

#[test]
fn test_flatten_from_seekable_two_pass() {
    let (streamer, detected) =
        RecordStreamer::from_seekable(Cursor::new(ITEMS_XML.as_bytes().to_vec()), 16).unwrap();
    assert_eq!(detected.name, "item");
    assert_eq!(streamer.element(), "item");

    let records: Vec<_> = streamer.records().collect::<Result<_, _>>().unwrap();
    assert_eq!(records.len(), 2);
}

#[test]
fn test_flatten_malformed_stops_iteration() {
    let xml = "<r><i><a>1</a></i><i><a>2</b></i></r>";
    let mut iter = RecordStreamer::new(xml.as_bytes(), "i").records();
    assert!(iter.next().unwrap().is_ok());
    assert!(matches!(iter.next(), Some(Err(ParseError::XmlError(_)))));
    assert!(iter.next().is_none());
}

#[test]
fn test_records_emitted_counter() {
    let mut streamer = RecordStreamer::new(ITEMS_XML.as_bytes(), "item");
    while streamer.next_record().unwrap().is_some() {}
    assert_eq!(streamer.records_emitted(), 2);
}

// ============================================================================
// SVD extraction
// ============================================================================

#[test]
fn test_svd_minimal_document() {
    let entities = extract(MINIMAL_SVD);

    let peripherals = of_kind(&entities, EntityKind::Peripheral);
    let registers = of_kind(&entities, EntityKind::Register);
    let fields = of_kind(&entities, EntityKind::Field);

    assert_eq!(peripherals.len(), 1);
    assert_eq!(registers.len(), 2);
    assert_eq!(fields.len(), 1);

    assert_eq!(peripherals[0][ID_COLUMN], "P0000");
    assert_eq!(peripherals[0]["name"], "GPIOA");
    assert_eq!(peripherals[0]["baseAddress"], "0x48000000");
    assert!(!peripherals[0].contains_key("registers"));

    assert_eq!(registers[0][ID_COLUMN], "R0000");
    assert_eq!(registers[1][ID_COLUMN], "R0001");
    for register in &registers {
        assert_eq!(register[PERIPHERAL_ID_COLUMN], "P0000");
        assert_eq!(register[PERIPHERAL_NAME_COLUMN], "GPIOA");
    }
    assert_eq!(registers[0]["name"], "MODER");
    assert!(!registers[0].contains_key("fields"));

    assert_eq!(fields[0][ID_COLUMN], "F0000");
    assert_eq!(fields[0][REGISTER_ID_COLUMN], "R0000");
    assert_eq!(fields[0][REGISTER_NAME_COLUMN], "MODER");
    assert_eq!(fields[0][PERIPHERAL_ID_COLUMN], "P0000");
    assert_eq!(fields[0][PERIPHERAL_NAME_COLUMN], "GPIOA");
    assert_eq!(fields[0]["bitWidth"], "2");
}

#[test]
fn test_svd_device_name_is_not_an_attribute() {
    let entities = extract(MINIMAL_SVD);
    let peripherals = of_kind(&entities, EntityKind::Peripheral);
    assert_ne!(peripherals[0]["name"], "STM32F0");
}

#[test]
fn test_svd_emission_order_is_completion_order() {
    let entities = extract(MINIMAL_SVD);
    let kinds: Vec<_> = entities.iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        vec![
            EntityKind::Field,
            EntityKind::Register,
            EntityKind::Register,
            EntityKind::Peripheral,
        ]
    );
}

#[test]
fn test_svd_orphans_are_ignored() {
    let xml = r#"<device>
      <fields><field><name>LOST</name></field></fields>
      <registers><register><name>ALSO_LOST</name></register></registers>
      <peripheral><name>NOT_IN_CONTAINER</name></peripheral>
      <peripherals>
        <peripheral><name>UART</name></peripheral>
      </peripherals>
    </device>"#;

    let mut extractor = SvdExtractor::new(xml.as_bytes());
    let mut entities = Vec::new();
    while let Some(entity) = extractor.next_entity().unwrap() {
        entities.push(entity);
    }

    assert_eq!(entities.len(), 1);
    assert_eq!(entities[0].kind, EntityKind::Peripheral);
    assert_eq!(entities[0].record["name"], "UART");
    assert_eq!(entities[0].record[ID_COLUMN], "P0000");
    assert_eq!(
        extractor.counts(),
        ExtractionCounts {
            peripherals: 1,
            registers: 0,
            fields: 0
        }
    );
}

#[test]
fn test_svd_ids_are_per_kind_and_increasing() {
    let xml = r#"<device><peripherals>
      <peripheral><name>A</name><registers>
        <register><name>A0</name></register>
        <register><name>A1</name></register>
      </registers></peripheral>
      <peripheral><name>B</name><registers>
        <register><name>B0</name></register>
      </registers></peripheral>
    </peripherals></device>"#;

    let entities = extract(xml);
    let peripheral_ids: Vec<_> = of_kind(&entities, EntityKind::Peripheral)
        .iter()
        .map(|r| r[ID_COLUMN].clone())
        .collect();
    let registers = of_kind(&entities, EntityKind::Register);

    assert_eq!(peripheral_ids, vec!["P0000", "P0001"]);
    assert_eq!(registers[2][ID_COLUMN], "R0002");
    assert_eq!(registers[2][PERIPHERAL_ID_COLUMN], "P0001");
    assert_eq!(registers[2][PERIPHERAL_NAME_COLUMN], "B");
}

#[test]
fn test_svd_enumerated_values_do_not_leak_into_field() {
    let xml = r#"<device><peripherals><peripheral><name>P</name><registers>
      <register><name>R</name><fields>
        <field>
          <name>EN</name>
          <enumeratedValues>
            <enumeratedValue><name>Disabled</name><value>0</value></enumeratedValue>
          </enumeratedValues>
        </field>
      </fields></register>
    </registers></peripheral></peripherals></device>"#;

    let entities = extract(xml);
    let fields = of_kind(&entities, EntityKind::Field);
    assert_eq!(fields[0]["name"], "EN");
    assert!(!fields[0].contains_key("value"));
    assert!(!fields[0].contains_key("enumeratedValues"));
}

#[test]
fn test_svd_malformed_is_error() {
    let xml = "<device><peripherals><peripheral><name>P</peripheral></peripherals></device>";
    let results: Vec<_> = SvdExtractor::new(xml.as_bytes()).entities().collect();
    assert_eq!(results.len(), 1);
    assert!(results[0].is_err());
}

#[test]
fn test_format_id_width() {
    assert_eq!(format_id('P', 0), "P0000");
    assert_eq!(format_id('R', 42), "R0042");
    assert_eq!(format_id('F', 12345), "F12345");

    let mut sequence = IdSequence::new('F');
    assert_eq!(sequence.next_id(), "F0000");
    assert_eq!(sequence.next_id(), "F0001");
    assert_eq!(sequence.allocated(), 2);
}

#[test]
fn test_entity_kind_headers_start_with_id() {
    for kind in EntityKind::ALL {
        assert_eq!(kind.headers()[0], ID_COLUMN);
        assert!(kind.headers().contains(&"name"));
    }
    assert_eq!(EntityKind::Field.headers().len(), 10);
}

#[test]
fn test_root_element() {
    assert_eq!(root_element(MINIMAL_SVD.as_bytes()).unwrap().as_deref(), Some("device"));
    assert_eq!(root_element(ITEMS_XML.as_bytes()).unwrap().as_deref(), Some("items"));
    assert_eq!(root_element("".as_bytes()).unwrap(), None);
}
