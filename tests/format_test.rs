mod common;

use std::fs::File;
use std::io::Write;

use recio::archive::{BinaryIArchive, BinaryOArchive, XmlOArchive};
use recio::{IArchive, OArchive, RecError, RecFormat, RecordReader, RecordWriter};
use tempfile::NamedTempFile;

use common::{decode, encode, IdName, Sample, Sparse};

fn varint_bytes(n: i64) -> Vec<u8> {
    let mut buf = Vec::new();
    BinaryOArchive::new(&mut buf).write_i64(n, "n").unwrap();
    buf
}

// ── Binary wire layout ───────────────────────────────────────────────────────

#[test]
fn every_small_non_negative_integer_is_one_byte() {
    for n in 0..=127i64 {
        let bytes = varint_bytes(n);
        assert_eq!(bytes, vec![n as u8], "value {n}");
    }
}

#[test]
fn varint_band_boundaries() {
    assert_eq!(varint_bytes(127), vec![0x7f]);
    assert_eq!(varint_bytes(128), vec![0x80, 0x02]);
    assert_eq!(varint_bytes(-1), vec![0x81, 0x00]);
    assert_eq!(varint_bytes(-64), vec![0xff, 0x00]);
    assert_eq!(varint_bytes(-65), vec![0x81, 0x01]);
    assert_eq!(varint_bytes(300), vec![0xd8, 0x04]);
    assert_eq!(varint_bytes(i64::MIN).len(), 10);
    assert_eq!(varint_bytes(i64::MAX).len(), 10);
}

#[test]
fn binary_id_name_is_byte_exact() {
    let bytes = encode(&IdName { id: 42, name: "abc".to_owned() }, RecFormat::Binary);
    assert_eq!(bytes, vec![0x2a, 0x03, b'a', b'b', b'c']);
}

#[test]
fn binary_markers_cost_nothing_beyond_counts() {
    // An empty record body plus one empty vector and one empty map: three
    // structural pairs, two varint zeros on the wire.
    let mut buf = Vec::new();
    {
        let mut a = BinaryOArchive::new(&mut buf);
        a.start_record("t").unwrap();
        a.start_vector(0, "v").unwrap();
        a.end_vector("v").unwrap();
        a.start_map(0, "m").unwrap();
        a.end_map("m").unwrap();
        a.end_record("t").unwrap();
    }
    assert_eq!(buf, vec![0x00, 0x00]);
}

// ── XML wire layout ──────────────────────────────────────────────────────────

#[test]
fn xml_id_name_is_the_documented_tree() {
    let bytes = encode(&IdName { id: 42, name: "abc".to_owned() }, RecFormat::Xml);
    assert_eq!(
        String::from_utf8(bytes).unwrap(),
        "<record><id type=\"int32\">42</id><name type=\"string\">abc</name></record>"
    );
}

#[test]
fn xml_escapes_markup_in_text() {
    let bytes = encode(&IdName { id: 1, name: "a<b>&c".to_owned() }, RecFormat::Xml);
    let text = String::from_utf8(bytes).unwrap();
    assert!(text.contains("a&lt;b&gt;&amp;c"), "got {text}");
    assert_eq!(decode::<IdName>(text.as_bytes(), RecFormat::Xml).name, "a<b>&c");
}

#[test]
fn xml_reader_tolerates_field_reordering() {
    let doc = "<record><name type=\"string\">abc</name><id type=\"int32\">42</id></record>";
    let value: IdName = decode(doc.as_bytes(), RecFormat::Xml);
    assert_eq!(value, IdName { id: 42, name: "abc".to_owned() });
}

#[test]
fn xml_reader_skips_prolog_comments_and_whitespace() {
    let doc = "<?xml version=\"1.0\"?>\n<!-- emitted by a peer -->\n<record>\
               <id type=\"int32\">7</id><name type=\"string\">x</name></record>";
    let value: IdName = decode(doc.as_bytes(), RecFormat::Xml);
    assert_eq!(value, IdName { id: 7, name: "x".to_owned() });
}

#[test]
fn xml_containers_carry_tag_and_size() {
    let value = Sample { seq: 1, readings: vec![5, 6], ..Sample::default() };
    let text = String::from_utf8(encode(&value, RecFormat::Xml)).unwrap();
    assert!(text.contains("<vector tag=\"readings\" size=\"2\">"), "got {text}");
    assert!(text.contains("<map tag=\"labels\" size=\"0\">"), "got {text}");
    assert!(text.contains("<record tag=\"origin\">"), "got {text}");
}

// ── CSV wire layout ──────────────────────────────────────────────────────────

#[test]
fn csv_id_name_is_the_documented_line() {
    let bytes = encode(&IdName { id: 42, name: "abc".to_owned() }, RecFormat::Csv);
    assert_eq!(String::from_utf8(bytes).unwrap(), "42,abc\n");
}

#[test]
fn csv_quotes_exactly_the_hostile_strings() {
    let cases = [
        ("plain", "1,plain\n"),
        ("with,comma", "1,\"with,comma\"\n"),
        ("with\"quote", "1,\"with\"\"quote\"\n"),
        ("with\nnewline", "1,\"with\nnewline\"\n"),
        ("", "1,\"\"\n"),
    ];
    for (name, expected) in cases {
        let bytes = encode(&IdName { id: 1, name: name.to_owned() }, RecFormat::Csv);
        assert_eq!(String::from_utf8(bytes).unwrap(), expected, "case {name:?}");
        let back: IdName = decode(expected.as_bytes(), RecFormat::Csv);
        assert_eq!(back.name, name, "case {name:?}");
    }
}

/// Absent and empty variable-shape fields produce identical CSV.  This is
/// the documented limitation of the flat encoding, not a defect: without
/// external schema context a consumer cannot tell the two apart.
#[test]
fn csv_cannot_distinguish_absent_from_empty() {
    let with_empty_vector = encode(
        &Sparse { id: 3, name: "n".to_owned(), extras: Vec::new() },
        RecFormat::Csv,
    );
    let without_the_field = encode(&IdName { id: 3, name: "n".to_owned() }, RecFormat::Csv);
    assert_eq!(with_empty_vector, without_the_field);

    let back: Sparse = decode(&with_empty_vector, RecFormat::Csv);
    assert!(back.extras.is_empty());
}

// ── Error taxonomy ───────────────────────────────────────────────────────────

fn read_err<T: recio::Record + Default>(bytes: &[u8], format: RecFormat) -> RecError {
    let mut out = T::default();
    let mut reader = RecordReader::new(bytes, format);
    reader.read(&mut out).expect_err("read should fail")
}

#[test]
fn truncated_binary_stream_is_io() {
    // Declares a five-byte string but carries one byte.
    let err = read_err::<IdName>(&[0x2a, 0x05, b'a'], RecFormat::Binary);
    assert!(matches!(err, RecError::Io(_)), "got {err}");
}

#[test]
fn exhausted_stream_is_io() {
    let err = read_err::<IdName>(&[], RecFormat::Binary);
    assert!(matches!(err, RecError::Io(_)), "got {err}");
    let err = read_err::<IdName>(&[], RecFormat::Csv);
    assert!(matches!(err, RecError::Io(_)), "got {err}");
    let err = read_err::<IdName>(&[], RecFormat::Xml);
    assert!(matches!(err, RecError::Io(_)), "got {err}");
}

#[test]
fn overlong_varint_is_format() {
    let bytes = [0x80u8; 11];
    let mut a = BinaryIArchive::new(bytes.as_slice());
    let err = a.read_i64("n").expect_err("overlong varint");
    assert!(matches!(err, RecError::Format { .. }), "got {err}");
}

#[test]
fn invalid_utf8_string_is_format() {
    let err = read_err::<IdName>(&[0x01, 0x02, 0xff, 0xfe], RecFormat::Binary);
    assert!(matches!(err, RecError::Format { .. }), "got {err}");
}

#[test]
fn invalid_boolean_byte_is_format() {
    let mut a = BinaryIArchive::new([0x07u8].as_slice());
    let err = a.read_bool("flag").expect_err("bad boolean");
    assert!(matches!(err, RecError::Format { .. }), "got {err}");
}

#[test]
fn csv_malformed_quoting_is_format() {
    let err = read_err::<IdName>(b"5,\"ab\"c\n", RecFormat::Csv);
    assert!(matches!(err, RecError::Format { .. }), "got {err}");
}

#[test]
fn csv_column_count_mismatches_are_format() {
    let err = read_err::<IdName>(b"42\n", RecFormat::Csv);
    assert!(matches!(err, RecError::Format { .. }), "got {err}");
    let err = read_err::<IdName>(b"42,abc,extra\n", RecFormat::Csv);
    assert!(matches!(err, RecError::Format { .. }), "got {err}");
}

#[test]
fn xml_unknown_field_is_format() {
    let doc = b"<record><wrong type=\"int32\">1</wrong></record>";
    let err = read_err::<IdName>(doc, RecFormat::Xml);
    assert!(matches!(err, RecError::Format { .. }), "got {err}");
}

#[test]
fn xml_type_mismatch_is_format() {
    let doc = b"<record><id type=\"int64\">1</id><name type=\"string\">x</name></record>";
    let err = read_err::<IdName>(doc, RecFormat::Xml);
    assert!(matches!(err, RecError::Format { .. }), "got {err}");
}

#[test]
fn xml_mismatched_close_tag_is_format() {
    let doc = b"<record><id type=\"int32\">42</record>";
    let err = read_err::<IdName>(doc, RecFormat::Xml);
    assert!(matches!(err, RecError::Format { .. }), "got {err}");
}

#[test]
fn unrepresentable_xml_tag_is_encoding() {
    let mut buf = Vec::new();
    let mut a = XmlOArchive::new(&mut buf);
    let err = a.write_i32(1, "not a name").expect_err("bad tag");
    assert!(matches!(err, RecError::Encoding { .. }), "got {err}");
}

#[test]
fn invalid_record_is_rejected_by_write_validated() {
    let mut buf = Vec::new();
    {
        let mut writer = RecordWriter::new(&mut buf, RecFormat::Binary);
        let bad = IdName { id: 1, name: String::new() };
        let err = writer.write_validated(&bad).expect_err("validation");
        assert!(matches!(err, RecError::Validation { .. }), "got {err}");
        writer.close().unwrap();
    }
    assert!(buf.is_empty());

    let mut writer = RecordWriter::new(&mut buf, RecFormat::Binary);
    let good = IdName { id: 1, name: "ok".to_owned() };
    writer.write_validated(&good).unwrap();
    writer.close().unwrap();
    assert!(!buf.is_empty());
}

// ── Facade plumbing ──────────────────────────────────────────────────────────

#[test]
fn format_selector_parses_names() {
    assert_eq!(RecFormat::from_name("binary"), Some(RecFormat::Binary));
    assert_eq!(RecFormat::from_name("XML"), Some(RecFormat::Xml));
    assert_eq!(RecFormat::from_name("csv"), Some(RecFormat::Csv));
    assert_eq!(RecFormat::from_name("yaml"), None);
    assert_eq!(RecFormat::Binary.name(), "binary");
}

#[test]
fn file_backed_streams_match_in_memory() {
    let value = Sample { seq: 11, readings: vec![1, 2, 3], ..Sample::default() };
    for format in [RecFormat::Binary, RecFormat::Xml] {
        let tmp = NamedTempFile::new().unwrap();
        {
            let mut file = File::create(tmp.path()).unwrap();
            let mut writer = RecordWriter::new(&mut file, format);
            writer.write(&value).unwrap();
            writer.close().unwrap();
            file.flush().unwrap();
        }
        let on_disk = std::fs::read(tmp.path()).unwrap();
        assert_eq!(on_disk, encode(&value, format), "format {format}");

        let mut file = File::open(tmp.path()).unwrap();
        let mut reader = RecordReader::new(&mut file, format);
        let mut back = Sample::default();
        reader.read(&mut back).unwrap();
        assert_eq!(back, value, "format {format}");
    }
}
