//! Book index and translationWords data over the fixture books

use serde_json::json;
use std::fs;
use usfm::usfm::indexing::{index_book, tw_group_data, word_count, IndexMode};
use usfm::usfm::{parse, ParseOptions};

fn book(name: &str) -> usfm::usfm::Document {
    let source = fs::read_to_string(format!("tests/fixtures/{name}")).expect("Failed to read fixture");
    parse(&source, &ParseOptions::default())
}

#[test]
fn test_gateway_index_of_plain_book() {
    let index = index_book(&book("titus_plain.usfm"), IndexMode::Gateway);
    assert_eq!(
        serde_json::to_value(&index).unwrap(),
        json!({"1": 5, "2": 1, "chapters": 2})
    );
}

#[test]
fn test_word_counts_of_aligned_book() {
    let doc = book("titus_aligned.usfm");
    assert_eq!(word_count(doc.verse("1", "1").unwrap()), 5);

    let index = index_book(&doc, IndexMode::OriginalLanguage);
    assert_eq!(serde_json::to_value(&index).unwrap(), json!({"1": {"1": 5, "2": 1}}));
}

#[test]
fn test_tw_group_data_from_aligned_words() {
    let source = "\\id TIT\n\\c 1\n\\p\n\\v 1 \\w Παῦλος|lemma=\"Παῦλος\" strong=\"G39720\" x-tw=\"rc://*/tw/dict/bible/names/paul\"\\w*, \\w δοῦλος|strong=\"G14010\" x-tw=\"rc://*/tw/dict/bible/other/servant\"\\w* \\w Θεοῦ|strong=\"G23160\" x-tw=\"rc://*/tw/dict/bible/kt/god\"\\w*\n\\v 2 \\w Θεός|strong=\"G23160\" x-tw=\"rc://*/tw/dict/bible/kt/god\"\\w*\n";
    let doc = parse(source, &ParseOptions::default());
    let data = tw_group_data(&doc, "tit");

    assert_eq!(data.keys().collect::<Vec<_>>(), vec!["names", "other", "kt"]);
    let god = data.get("kt").and_then(|g| g.get("god")).unwrap();
    assert_eq!(god.len(), 2);
    assert_eq!(god[0].context_id.quote, "Θεοῦ");
    assert_eq!(god[0].context_id.reference.verse, 1);
    assert_eq!(god[1].context_id.quote, "Θεός");
    assert_eq!(god[1].context_id.reference.verse, 2);
    assert_eq!(god[1].context_id.occurrence, 1);
    assert_eq!(god[1].context_id.strong, vec![json!("G23160")]);
}
