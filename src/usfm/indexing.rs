//! Book indexes and translation-word check data
//!
//! Two derived views of a parsed book used by the resource tooling:
//!
//! - [`index_book`] counts words per verse (original language books) or the highest
//!   verse per chapter (gateway language books).
//! - [`tw_group_data`] collects the translationWords checks of an aligned original
//!   language book, grouped by category and group id.

use crate::usfm::ast::{Document, KeyedMap, ObjectKind, VerseObject};
use crate::usfm::parsing::parse_int;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Number of words in a node list, counting words inside milestones.
pub fn word_count(objects: &[VerseObject]) -> usize {
    objects
        .iter()
        .map(|object| {
            if object.kind == Some(ObjectKind::Word) {
                1
            } else {
                word_count(object.child_slice())
            }
        })
        .sum()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexMode {
    /// Word count of every verse.
    OriginalLanguage,
    /// Highest verse number of every chapter.
    Gateway,
}

/// Result of [`index_book`].
#[derive(Debug, Clone, PartialEq)]
pub enum BookIndex {
    /// chapter → verse → word count
    WordCounts(KeyedMap<KeyedMap<usize>>),
    /// chapter → highest verse, written with a trailing `chapters` count
    VerseCounts {
        verses: KeyedMap<i64>,
        chapters: usize,
    },
}

impl Serialize for BookIndex {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            BookIndex::WordCounts(chapters) => chapters.serialize(serializer),
            BookIndex::VerseCounts { verses, chapters } => {
                let mut map = serializer.serialize_map(Some(verses.len() + 1))?;
                for (chapter, high) in verses.ordered() {
                    map.serialize_entry(chapter, high)?;
                }
                map.serialize_entry("chapters", chapters)?;
                map.end()
            }
        }
    }
}

pub fn index_book(doc: &Document, mode: IndexMode) -> BookIndex {
    match mode {
        IndexMode::OriginalLanguage => BookIndex::WordCounts(
            doc.chapters
                .ordered()
                .into_iter()
                .map(|(number, chapter)| {
                    let counts = chapter
                        .iter()
                        .filter(|(verse, _)| *verse != "front")
                        .map(|(verse, v)| (verse, word_count(&v.verse_objects)))
                        .collect();
                    (number, counts)
                })
                .collect(),
        ),
        IndexMode::Gateway => {
            let verses = doc
                .chapters
                .ordered()
                .into_iter()
                .map(|(number, chapter)| {
                    let high = chapter
                        .keys()
                        .filter_map(|k| parse_int(k)?.as_i64())
                        .fold(0, i64::max);
                    (number, high)
                })
                .collect();
            BookIndex::VerseCounts {
                verses,
                chapters: doc.chapters.len(),
            }
        }
    }
}

/// category → group id → checks
pub type TwGroupData = KeyedMap<KeyedMap<Vec<TwCheck>>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TwCheck {
    pub priority: u32,
    pub comments: bool,
    pub reminders: bool,
    pub selections: bool,
    pub verse_edits: bool,
    pub context_id: ContextId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextId {
    pub reference: Reference,
    pub tool: String,
    pub group_id: String,
    pub quote: String,
    /// One entry per quoted word; `null` for words without a strong number.
    pub strong: Vec<Value>,
    pub occurrence: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reference {
    pub book_id: String,
    pub chapter: i64,
    pub verse: i64,
}

/// A `tw` link found in a verse.
#[derive(Debug, Default)]
struct Quote {
    words: Vec<String>,
    strong: Vec<Value>,
}

/// Links found in one verse: category → group id → quotes
type VerseGroups = KeyedMap<KeyedMap<Vec<(String, Vec<Value>)>>>;

/// translationWords checks for every numbered verse of `doc`.
pub fn tw_group_data(doc: &Document, book_id: &str) -> TwGroupData {
    let mut data = TwGroupData::new();
    for (chapter_key, chapter) in doc.chapters.ordered() {
        let Some(chapter_number) = parse_int(chapter_key).and_then(|n| n.as_i64()) else {
            tracing::debug!(chapter = chapter_key, "skipping non-numeric chapter");
            continue;
        };
        for (verse_key, verse) in chapter.iter() {
            let Some(verse_number) = parse_int(verse_key).and_then(|n| n.as_i64()) else {
                continue;
            };
            let mut groups = VerseGroups::new();
            for object in &verse.verse_objects {
                collect_quotes(&mut groups, object, false);
            }
            let reference = Reference {
                book_id: book_id.to_string(),
                chapter: chapter_number,
                verse: verse_number,
            };
            add_checks(&mut data, groups, &reference);
        }
    }
    data
}

fn collect_quotes(groups: &mut VerseGroups, object: &VerseObject, in_milestone: bool) -> Quote {
    let mut quote = Quote::default();
    let link = object.attribute_str("tw");
    match object.kind {
        Some(ObjectKind::Milestone) => {
            for child in object.child_slice() {
                let inner = collect_quotes(groups, child, true);
                quote.words.extend(inner.words);
                quote.strong.extend(inner.strong);
            }
        }
        Some(ObjectKind::Word) if link.is_some() || in_milestone => {
            quote.words.push(object.text.clone().unwrap_or_default());
            quote
                .strong
                .push(object.attribute("strong").cloned().unwrap_or(Value::Null));
        }
        _ => return quote,
    }

    if let Some(link) = link.filter(|_| !quote.words.is_empty()) {
        let mut parts = link.rsplit('/');
        let group_id = parts.next().unwrap_or_default().to_string();
        let category = parts.next().unwrap_or_default().to_string();
        if groups.get(&category).is_none() {
            groups.insert(category.clone(), KeyedMap::new());
        }
        if let Some(by_group) = groups.get_mut(&category) {
            if by_group.get(&group_id).is_none() {
                by_group.insert(group_id.clone(), Vec::new());
            }
            if let Some(items) = by_group.get_mut(&group_id) {
                items.push((quote.words.join(" "), quote.strong.clone()));
            }
        }
    }
    quote
}

fn add_checks(data: &mut TwGroupData, groups: VerseGroups, reference: &Reference) {
    for (category, by_group) in groups.iter() {
        if data.get(category).is_none() {
            data.insert(category, KeyedMap::new());
        }
        let Some(target) = data.get_mut(category) else {
            continue;
        };
        for (group_id, items) in by_group.iter() {
            if target.get(group_id).is_none() {
                target.insert(group_id, Vec::new());
            }
            let Some(checks) = target.get_mut(group_id) else {
                continue;
            };
            let mut occurrences: KeyedMap<u32> = KeyedMap::new();
            for (quote, strong) in items {
                let occurrence = occurrences.get(quote).copied().unwrap_or(1);
                occurrences.insert(quote.clone(), occurrence + 1);
                checks.push(TwCheck {
                    priority: 1,
                    comments: false,
                    reminders: false,
                    selections: false,
                    verse_edits: false,
                    context_id: ContextId {
                        reference: reference.clone(),
                        tool: "translationWords".to_string(),
                        group_id: group_id.to_string(),
                        quote: quote.clone(),
                        strong: strong.clone(),
                        occurrence,
                    },
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usfm::ast::{Chapter, Verse};
    use serde_json::json;

    const GRACE: &str = "rc://*/tw/dict/bible/kt/grace";

    fn word(text: &str, strong: &str) -> VerseObject {
        VerseObject::word(text).with_attribute("strong", strong)
    }

    fn book(verses: Vec<(&str, Vec<VerseObject>)>) -> Document {
        let chapter: Chapter = verses
            .into_iter()
            .map(|(k, objects)| (k, Verse::new(objects)))
            .collect();
        let mut doc = Document::default();
        doc.chapters.insert("1", chapter);
        doc
    }

    #[test]
    fn test_word_count_descends_into_milestones() {
        let objects = vec![
            VerseObject::milestone("zaln", vec![VerseObject::word("a"), VerseObject::word("b")]),
            VerseObject::text(", "),
            VerseObject::word("c"),
        ];
        assert_eq!(word_count(&objects), 3);
    }

    #[test]
    fn test_original_language_index() {
        let doc = book(vec![
            ("front", vec![VerseObject::marker("p")]),
            ("1", vec![VerseObject::word("a"), VerseObject::word("b")]),
            ("2", vec![VerseObject::word("c")]),
        ]);
        let index = index_book(&doc, IndexMode::OriginalLanguage);
        assert_eq!(serde_json::to_value(&index).unwrap(), json!({"1": {"1": 2, "2": 1}}));
    }

    #[test]
    fn test_gateway_index() {
        let doc = book(vec![
            ("front", vec![]),
            ("1", vec![]),
            ("2-3", vec![]),
        ]);
        let index = index_book(&doc, IndexMode::Gateway);
        assert_eq!(serde_json::to_value(&index).unwrap(), json!({"1": 2, "chapters": 1}));
    }

    #[test]
    fn test_tw_checks_count_occurrences() {
        let doc = book(vec![(
            "1",
            vec![
                word("χάρις", "G54850").with_attribute("tw", GRACE),
                VerseObject::text(" "),
                word("χάρις", "G54850").with_attribute("tw", GRACE),
            ],
        )]);
        let data = tw_group_data(&doc, "tit");
        let checks = data.get("kt").and_then(|g| g.get("grace")).unwrap();
        assert_eq!(checks.len(), 2);
        assert_eq!(checks[0].context_id.occurrence, 1);
        assert_eq!(checks[1].context_id.occurrence, 2);
        assert_eq!(
            serde_json::to_value(&checks[0]).unwrap(),
            json!({
                "priority": 1,
                "comments": false,
                "reminders": false,
                "selections": false,
                "verseEdits": false,
                "contextId": {
                    "reference": {"bookId": "tit", "chapter": 1, "verse": 1},
                    "tool": "translationWords",
                    "groupId": "grace",
                    "quote": "χάρις",
                    "strong": ["G54850"],
                    "occurrence": 1
                }
            })
        );
    }

    #[test]
    fn test_tw_milestone_quotes_all_children() {
        let milestone = VerseObject::milestone(
            "k",
            vec![word("Θεοῦ", "G23160"), word("Πατρὸς", "G39620")],
        )
        .with_attribute("tw", "rc://*/tw/dict/bible/kt/godthefather");
        let doc = book(vec![("front", vec![]), ("4", vec![milestone])]);
        let data = tw_group_data(&doc, "tit");
        let checks = data.get("kt").and_then(|g| g.get("godthefather")).unwrap();
        assert_eq!(checks.len(), 1);
        assert_eq!(checks[0].context_id.quote, "Θεοῦ Πατρὸς");
        assert_eq!(checks[0].context_id.strong, vec![json!("G23160"), json!("G39620")]);
        assert_eq!(checks[0].context_id.reference.verse, 4);
    }
}
