//! Conversion properties: round trips, milestone nesting, chapter ordering and the
//! duplicate verse guard.

use proptest::prelude::*;
use serde_json::json;
use usfm::usfm::formats::{to_usfm, verse_objects_to_usfm, SerializeOptions};
use usfm::usfm::{parse, remove_markup, ObjectKind, ParseOptions};

fn round_trip(source: &str) -> String {
    to_usfm(&parse(source, &ParseOptions::default()), &SerializeOptions::default())
}

#[test]
fn test_chapters_written_in_numeric_order() {
    let source = "\\c 10\n\\v 1 a\n\\c 2\n\\v 1 b\n\\c 1\n\\v 2 c\n\\v 10 d\n\\v 1 e";
    assert_eq!(
        round_trip(source),
        "\\c 1\n\\v 1 e \\v 2 c\n\\v 10 d\n\\c 2\n\\v 1 b\n\\c 10\n\\v 1 a\n"
    );
}

#[test]
fn test_alignment_milestone_closes() {
    let doc = parse(
        "\\c 1\n\\v 1 \\zaln-s | x-strong=\"G1161\"\\*word\\zaln-e\\*",
        &ParseOptions::default(),
    );
    let nodes = doc.verse("1", "1").unwrap();
    assert_eq!(
        serde_json::to_value(nodes).unwrap(),
        json!([{
            "tag": "zaln",
            "type": "milestone",
            "strong": "G1161",
            "children": [{"type": "text", "text": "*word"}],
            "endTag": "zaln-e\\*"
        }])
    );
}

#[test]
fn test_same_tag_milestones_nest() {
    let doc = parse(
        "\\c 1\n\\v 1 \\k-s | x-tw=\"a\"\\*\\k-s | x-tw=\"b\"\\*\\w w\\w*\\k-e\\*\\k-e\\* end",
        &ParseOptions::default(),
    );
    let nodes = doc.verse("1", "1").unwrap();
    assert_eq!(nodes.len(), 2);

    let outer = &nodes[0];
    assert_eq!(outer.kind, Some(ObjectKind::Milestone));
    assert_eq!(outer.attribute_str("tw").as_deref(), Some("a"));
    assert_eq!(outer.end_tag.as_deref(), Some("k-e\\*"));

    let inner = &outer.child_slice()[1];
    assert_eq!(inner.attribute_str("tw").as_deref(), Some("b"));
    assert_eq!(inner.end_tag.as_deref(), Some("k-e\\*"));
    assert!(inner.child_slice()[1].is_word());

    assert_eq!(nodes[1].text.as_deref(), Some(" end"));
}

#[test]
fn test_duplicate_verse_keeps_first() {
    let doc = parse("\\c 1\n\\v 1 first\n\\v 1 second\n\\v 2 next", &ParseOptions::default());
    let verse = doc.verse("1", "1").unwrap();
    assert_eq!(verse.len(), 1);
    assert_eq!(verse[0].text.as_deref(), Some("first\n"));
}

#[test]
fn test_repeated_chapter_starts_over() {
    let doc = parse("\\c 1\n\\v 1 a\n\\c 1\n\\v 1 a\n", &ParseOptions::default());
    assert_eq!(doc.chapters.len(), 1);
    let verse = doc.verse("1", "1").unwrap();
    assert_eq!(serde_json::to_value(verse).unwrap(), json!([{"type": "text", "text": "a\n"}]));

    let doc = parse(
        "\\c 1\n\\v 1 first\n\\c 1\n\\v 1 again\n\\v 2 more\n\\c 2\n\\v 1 two",
        &ParseOptions::default(),
    );
    assert_eq!(
        serde_json::to_value(&doc.chapters).unwrap(),
        json!({
            "1": {
                "1": {"verseObjects": [{"type": "text", "text": "again\n"}]},
                "2": {"verseObjects": [{"type": "text", "text": "more\n"}]}
            },
            "2": {"1": {"verseObjects": [{"type": "text", "text": "two"}]}}
        })
    );
}

#[test]
fn test_open_milestones_close_at_verse_and_input_end() {
    let doc = parse(
        "\\c 1\n\\v 1 \\zaln-s | x-strong=\"G1\"\\*\\w a\\w*\n\\v 2 \\zaln-s | x-strong=\"G2\"\\*\\w b\\w*",
        &ParseOptions::default(),
    );
    assert_eq!(
        serde_json::to_value(doc.verse("1", "1").unwrap()).unwrap(),
        json!([{
            "tag": "zaln",
            "type": "milestone",
            "strong": "G1",
            "children": [
                {"type": "text", "text": "*"},
                {"text": "a", "tag": "w", "type": "word"},
                {"type": "text", "text": "\n"}
            ],
            "endTag": ""
        }])
    );
    let last = doc.verse("1", "2").unwrap();
    assert_eq!(last.len(), 1);
    assert_eq!(last[0].end_tag.as_deref(), Some(""));
    assert!(last[0].child_slice()[1].is_word());
}

#[test]
fn test_reparse_of_out_of_order_verses_is_equal() {
    let once = parse("\\c 1\n\\v 2 b\n\\v 1 a\n", &ParseOptions::default());
    let usfm = to_usfm(&once, &SerializeOptions::default());
    assert_eq!(usfm, "\\c 1\n\\v 1 a\n\\v 2 b\n");
    let twice = parse(&usfm, &ParseOptions::default());
    assert_eq!(once, twice);
}

#[test]
fn test_remove_markup_example() {
    assert_eq!(remove_markup("\\w Grace\\w* \\add to\\add* you"), "Grace to you");
}

#[test]
fn test_words_without_coercion_stay_strings() {
    let doc = parse(
        "\\c 1\n\\v 1 \\w alpha|x-occurrence=\"1\" x-occurrences=\"2\"\\w* \\w beta\\w*\n\\v 2 x\n",
        &ParseOptions::default(),
    );
    let word = &doc.verse("1", "1").unwrap()[0];
    assert_eq!(word.attribute("occurrence"), Some(&json!("1")));
    assert_eq!(
        verse_objects_to_usfm(doc.verse("1", "1").unwrap(), &SerializeOptions::default()),
        "\\w alpha|x-occurrence=\"1\" x-occurrences=\"2\"\\w* \\w beta\\w*\n"
    );
}

#[test]
fn test_quote_lines_round_trip() {
    let source = "\\id GEN\n\\c 3\n\\p\n\\v 1 a\n\\q1 b c\n\\v 2 d\n";
    assert_eq!(round_trip(source), source);
}

fn verse_word() -> impl Strategy<Value = String> {
    "[a-z]{1,8}"
}

fn aligned_word() -> impl Strategy<Value = String> {
    prop_oneof![verse_word(), verse_word().prop_map(|w| format!("\\w {w}\\w*"))]
}

/// `\c` / `\p` / `\v` books with the given word strategy.
fn book(word: BoxedStrategy<String>) -> impl Strategy<Value = String> {
    prop::collection::vec(prop::collection::vec(prop::collection::vec(word, 1..6), 1..5), 1..3)
        .prop_map(|chapters| {
            let mut source = String::new();
            for (c, verses) in chapters.iter().enumerate() {
                source.push_str(&format!("\\c {}\n\\p\n", c + 1));
                for (v, words) in verses.iter().enumerate() {
                    source.push_str(&format!("\\v {} {}\n", v + 1, words.join(" ")));
                }
            }
            source
        })
}

proptest! {
    #[test]
    fn plain_books_round_trip(source in book(verse_word().boxed())) {
        prop_assert_eq!(round_trip(&source), source);
    }

    #[test]
    fn output_is_stable_after_one_pass(source in book(aligned_word().boxed())) {
        let once = round_trip(&source);
        prop_assert_eq!(round_trip(&once), once);
    }
}
