//! USFM parsing
//!
//! Turns USFM text into a [`Document`]. Parsing runs in two stages:
//!
//! 1. [`tokenize`](crate::usfm::lexing::tokenize) splits each line into marker records
//!    and orphan text.
//! 2. The folder walks the records once, tracking the current chapter and verse and the
//!    stack of open spans, and builds the verse objects tree.
//!
//! Parsing never fails. Malformed markup degrades to text or loose markers, and the
//! recovery points emit `tracing` events.

mod arena;
mod folder;
mod headers;
mod spans;
mod words;

use crate::usfm::ast::Document;
use crate::usfm::lexing::tokenize;
use crate::usfm::markers::MarkerTable;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub(crate) use words::parse_int;

/// Parser settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    /// Parse a fragment: verses without a chapter go to [`Document::verses`].
    pub chunk: bool,
    /// Recorded as a `content-source` attribute on words and milestones.
    #[serde(alias = "content-source")]
    pub content_source: Option<String>,
    /// Attribute key renames, applied after `x-` prefix handling.
    pub map: HashMap<String, String>,
    /// Attribute keys whose values are stored as integers.
    #[serde(alias = "convertToInt")]
    pub convert_to_int: Vec<String>,
}

impl ParseOptions {
    pub fn chunk() -> Self {
        ParseOptions {
            chunk: true,
            ..Default::default()
        }
    }

    pub fn with_content_source(mut self, source: impl Into<String>) -> Self {
        self.content_source = Some(source.into());
        self
    }

    pub fn with_int_attributes<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.convert_to_int = keys.into_iter().map(Into::into).collect();
        self
    }
}

/// Parse with the standard marker table.
pub fn parse(source: &str, options: &ParseOptions) -> Document {
    parse_with_table(source, options, MarkerTable::standard())
}

pub fn parse_with_table(source: &str, options: &ParseOptions, table: &MarkerTable) -> Document {
    let tokens = tokenize(source, table);
    tracing::trace!(tokens = tokens.len(), chunk = options.chunk, "folding tokens");
    folder::Folder::new(tokens, table, options).run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usfm::ast::{ObjectKind, VerseObject};
    use serde_json::json;

    fn verse<'a>(doc: &'a Document, chapter: &str, verse: &str) -> &'a [VerseObject] {
        doc.verse(chapter, verse)
            .unwrap_or_else(|| panic!("missing {chapter}:{verse}"))
    }

    #[test]
    fn test_headers_and_first_verse() {
        let doc = parse("\\id TIT\n\\h Titus\n\\c 1\n\\p\n\\v 1 Paul, a servant", &ParseOptions::default());
        assert_eq!(
            serde_json::to_value(&doc.headers).unwrap(),
            json!([{"tag": "id", "content": "TIT"}, {"tag": "h", "content": "Titus"}])
        );
        assert_eq!(
            serde_json::to_value(verse(&doc, "1", "front")).unwrap(),
            json!([{"tag": "p", "type": "paragraph", "nextChar": "\n"}])
        );
        assert_eq!(
            serde_json::to_value(verse(&doc, "1", "1")).unwrap(),
            json!([{"type": "text", "text": "Paul, a servant"}])
        );
    }

    #[test]
    fn test_word_with_attributes() {
        let doc = parse(
            "\\c 1\n\\v 1 \\w Paul|x-occurrence=\"1\" x-occurrences=\"1\"\\w*, a",
            &ParseOptions::default().with_int_attributes(["occurrence", "occurrences"]),
        );
        assert_eq!(
            serde_json::to_value(verse(&doc, "1", "1")).unwrap(),
            json!([
                {"text": "Paul", "tag": "w", "type": "word", "occurrence": 1, "occurrences": 1},
                {"type": "text", "text": ", a"}
            ])
        );
    }

    #[test]
    fn test_character_span_keeps_text() {
        let doc = parse("\\c 1\n\\v 1 a \\bd bold\\bd* b", &ParseOptions::default());
        let nodes = verse(&doc, "1", "1");
        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes[1].tag.as_deref(), Some("bd"));
        assert_eq!(nodes[1].end_tag.as_deref(), Some("bd*"));
        assert_eq!(nodes[1].text.as_deref(), Some("bold"));
        assert_eq!(nodes[1].children, None);
        assert_eq!(nodes[2].text.as_deref(), Some(" b"));
    }

    #[test]
    fn test_footnote_absorbs_content() {
        let doc = parse("\\c 1\n\\v 1 a\\f + \\ft note\\f* b", &ParseOptions::default());
        let nodes = verse(&doc, "1", "1");
        let note = nodes
            .iter()
            .find(|n| n.tag.as_deref() == Some("f"))
            .unwrap();
        assert_eq!(note.kind, Some(ObjectKind::Footnote));
        assert_eq!(note.content.as_deref(), Some("+ \\ft note"));
        assert_eq!(note.end_tag.as_deref(), Some("f*"));
        assert_eq!(note.next_char.as_deref(), Some(" "));
        assert_eq!(nodes.last().unwrap().text.as_deref(), Some("b"));
    }

    #[test]
    fn test_verse_span_key() {
        let doc = parse("\\c 1\n\\v 3-4 text", &ParseOptions::default());
        assert!(doc.verse("1", "3-4").is_some());
    }

    #[test]
    fn test_chunk_mode_without_chapter() {
        let doc = parse("\\v 1 In the beginning", &ParseOptions::chunk());
        assert!(doc.chapters.is_empty());
        let nodes = &doc.verses.get("1").unwrap().verse_objects;
        assert_eq!(nodes[0].text.as_deref(), Some("In the beginning"));
    }

    #[test]
    fn test_duplicate_verse_is_not_restarted() {
        let doc = parse("\\c 1\n\\v 1 a\n\\v 1 b", &ParseOptions::default());
        let nodes = verse(&doc, "1", "1");
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].text.as_deref(), Some("a\n"));
    }

    #[test]
    fn test_mangled_verse_marker() {
        let doc = parse("\\c 1\n\\v3 text", &ParseOptions::default());
        assert_eq!(verse(&doc, "1", "3")[0].text.as_deref(), Some("text"));
    }

    #[test]
    fn test_options_deserialize_aliases() {
        let options: ParseOptions =
            serde_json::from_value(json!({"chunk": true, "content-source": "ugnt", "convertToInt": ["occurrence"]}))
                .unwrap();
        assert!(options.chunk);
        assert_eq!(options.content_source.as_deref(), Some("ugnt"));
        assert_eq!(options.convert_to_int, vec!["occurrence".to_string()]);
    }
}
