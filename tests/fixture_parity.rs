//! Fixture parity tests
//!
//! Each fixture book has its expected verse objects JSON and USFM output checked in next
//! to it. The plain book round-trips byte for byte; the aligned book keeps the layout
//! quirks of the alignment tools (the `*` left after `\zaln-s` attributes, no space
//! after a `\w*` followed by text).

use rstest::rstest;
use serde_json::Value;
use std::fs;
use usfm::usfm::formats::{to_usfm, SerializeOptions};
use usfm::usfm::{parse, Document, ParseOptions};

fn fixture(name: &str) -> String {
    fs::read_to_string(format!("tests/fixtures/{name}")).expect("Failed to read fixture")
}

fn options() -> ParseOptions {
    ParseOptions::default().with_int_attributes(["occurrence", "occurrences"])
}

#[rstest]
#[case::plain("titus_plain")]
#[case::aligned("titus_aligned")]
fn test_parse_matches_expected_json(#[case] name: &str) {
    let doc = parse(&fixture(&format!("{name}.usfm")), &options());
    let expected: Value = serde_json::from_str(&fixture(&format!("{name}.json"))).unwrap();
    assert_eq!(serde_json::to_value(&doc).unwrap(), expected);
}

#[rstest]
#[case::plain("titus_plain")]
#[case::aligned("titus_aligned")]
fn test_expected_json_reads_back(#[case] name: &str) {
    let doc = Document::from_json(&fixture(&format!("{name}.json"))).unwrap();
    assert_eq!(doc, parse(&fixture(&format!("{name}.usfm")), &options()));
}

#[test]
fn test_plain_book_round_trips() {
    let source = fixture("titus_plain.usfm");
    let doc = parse(&source, &options());
    assert_eq!(to_usfm(&doc, &SerializeOptions::default()), source);
    assert_eq!(to_usfm(&doc, &SerializeOptions::forced_new_lines()), source);
}

#[rstest]
#[case::inline(SerializeOptions::default(), "titus_aligned.out.usfm")]
#[case::forced_new_lines(SerializeOptions::forced_new_lines(), "titus_aligned.forced.usfm")]
fn test_aligned_book_output(#[case] serialize: SerializeOptions, #[case] expected: &str) {
    let doc = parse(&fixture("titus_aligned.usfm"), &options());
    assert_eq!(to_usfm(&doc, &serialize), fixture(expected));
}

#[test]
fn test_aligned_header_keeps_blank_line() {
    let doc = parse(&fixture("titus_aligned.usfm"), &options());
    let tags: Vec<_> = doc.headers.iter().map(|h| h.tag.as_deref()).collect();
    assert_eq!(tags, vec![Some("id"), Some("usfm"), Some("h"), Some("mt"), None, Some("s5")]);
    assert_eq!(doc.headers[4].text.as_deref(), Some(""));
}
