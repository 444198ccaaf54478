//! USFM writer
//!
//! Walks a verse objects tree and writes it back as USFM text. Output is built as a list
//! of line fragments the way editors expect it: header lines, `\c N` lines, front
//! matter, then one fragment per verse. With `forced_new_lines` every verse, milestone
//! and aligned word starts on its own line, the layout used by aligned books.

use super::registry::{FormatError, Formatter};
use crate::usfm::ast::{Chapter, Document, ObjectKind, Verse, VerseObject};
use crate::usfm::markers::{MarkerTable, WORD_SPECIAL_ATTRIBUTES};
use crate::usfm::parsing::parse_int;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Writer settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerializeOptions {
    /// Put verses, milestones and words on their own lines.
    #[serde(alias = "forcedNewLines")]
    pub forced_new_lines: bool,
    /// Word attributes left out of `\w` markers.
    #[serde(alias = "ignore")]
    pub word_ignore: Vec<String>,
    /// Word attribute renames.
    #[serde(alias = "map")]
    pub word_map: HashMap<String, String>,
    /// Milestone attributes left out of `-s` markers.
    #[serde(alias = "mileStoneIgnore")]
    pub milestone_ignore: Vec<String>,
    /// Milestone attribute renames.
    #[serde(alias = "mileStoneMap")]
    pub milestone_map: HashMap<String, String>,
}

impl SerializeOptions {
    pub fn forced_new_lines() -> Self {
        SerializeOptions {
            forced_new_lines: true,
            ..Default::default()
        }
    }
}

/// Write a whole document.
pub fn to_usfm(document: &Document, options: &SerializeOptions) -> String {
    Writer::new(options, MarkerTable::standard()).document(document)
}

/// Write a single chapter, starting with its `\c` line.
pub fn chapter_to_usfm(number: &str, chapter: &Chapter, options: &SerializeOptions) -> String {
    Writer::new(options, MarkerTable::standard())
        .chapter_lines(number, chapter)
        .concat()
}

/// Write a node list without any verse or chapter markers.
pub fn verse_objects_to_usfm(objects: &[VerseObject], options: &SerializeOptions) -> String {
    let mut writer = Writer::new(options, MarkerTable::standard());
    writer.objects(objects, String::new())
}

/// Serializer state for one call.
struct Writer<'a> {
    options: &'a SerializeOptions,
    table: &'a MarkerTable,
    word_ignore: Vec<&'a str>,
    milestone_ignore: Vec<&'a str>,
    /// Kind of the node written before the current one, in document order.
    last_kind: Option<ObjectKind>,
    current_kind: Option<ObjectKind>,
}

impl<'a> Writer<'a> {
    fn new(options: &'a SerializeOptions, table: &'a MarkerTable) -> Self {
        let mut word_ignore = vec!["text", "tag", "type"];
        word_ignore.extend(options.word_ignore.iter().map(String::as_str));
        let mut milestone_ignore = vec!["children", "tag", "type"];
        milestone_ignore.extend(options.milestone_ignore.iter().map(String::as_str));
        Writer {
            options,
            table,
            word_ignore,
            milestone_ignore,
            last_kind: None,
            current_kind: None,
        }
    }

    fn document(&mut self, document: &Document) -> String {
        let mut output: Vec<String> = Vec::new();
        for header in &document.headers {
            output.push(self.header_line(header));
        }
        for (number, chapter) in document.chapters.ordered() {
            let mut lines = self.chapter_lines(number, chapter);
            if output.last().is_some_and(|l| !l.ends_with('\n')) {
                if let Some(first) = lines.first_mut() {
                    first.insert(0, '\n');
                }
            }
            output.extend(lines);
        }
        for key in sort_verses(document.verses.keys().collect()) {
            if let Some(verse) = document.verses.get(key) {
                let line = self.verse_line(key, verse);
                self.add_verse(&mut output, line);
            }
        }
        output.concat()
    }

    fn header_line(&mut self, header: &VerseObject) -> String {
        let no_space = header.content.as_deref().is_some_and(|c| {
            c.starts_with('-') || c.starts_with('*') || c.starts_with("\\*")
        });
        let mut text = self.marker(header, None, no_space, true);
        if (header.is_text() && header.text.is_some()) || header.tag.is_some() {
            text.push('\n');
        }
        text
    }

    fn chapter_lines(&mut self, number: &str, chapter: &Chapter) -> Vec<String> {
        let mut lines = vec![format!("\\c {number}\n")];
        if let Some(front) = chapter.get("front") {
            let text = self.objects(&front.verse_objects, String::new());
            lines.push(text);
        }
        let keys = sort_verses(chapter.keys().filter(|k| *k != "front").collect());
        for key in keys {
            let Some(verse) = chapter.get(key) else {
                continue;
            };
            if let Some(last) = lines.last_mut() {
                if last.chars().last().is_some_and(|c| c != '\n' && c != ' ') {
                    last.push(' ');
                }
            }
            let line = self.verse_line(key, verse);
            self.add_verse(&mut lines, line);
        }
        lines
    }

    fn verse_line(&mut self, number: &str, verse: &Verse) -> String {
        let text = self.objects(&verse.verse_objects, String::new());
        let verse_marker = VerseObject {
            tag: Some("v".to_string()),
            number: Some(number.to_string()),
            text: Some(text),
            ..Default::default()
        };
        self.marker(&verse_marker, None, false, false)
    }

    fn add_verse(&self, lines: &mut Vec<String>, verse: String) {
        let mut verse = verse;
        if self.options.forced_new_lines {
            if let Some(last) = lines.last() {
                if !last.ends_with('\n') && !last.contains("\n\\q") {
                    verse.insert(0, '\n');
                }
            }
        }
        lines.push(verse);
    }

    fn objects(&mut self, objects: &[VerseObject], mut output: String) -> String {
        for (i, object) in objects.iter().enumerate() {
            output = self.object(object, output, objects.get(i + 1));
        }
        output
    }

    fn object(&mut self, object: &VerseObject, output: String, next: Option<&VerseObject>) -> String {
        self.last_kind = self.current_kind;
        self.current_kind = object.kind;

        match object.kind {
            Some(ObjectKind::Text) => {
                let mut output = output;
                output.push_str(object.text.as_deref().unwrap_or(""));
                output
            }
            Some(ObjectKind::Word) => {
                let word = self.word(object);
                self.add_word(word, output)
            }
            Some(ObjectKind::Milestone) if !closes_like_character_style(object) => {
                let phrase = self.phrase(object, next);
                self.add_on_new_line(phrase, output)
            }
            _ if !object.child_slice().is_empty() => {
                let phrase = self.phrase(object, next);
                output + &phrase
            }
            _ if object.tag.is_some() => {
                let marker = self.marker(object, next, false, false);
                output + &marker
            }
            _ => output,
        }
    }

    /// `\w text|key="value" ...\w*`
    fn word(&self, object: &VerseObject) -> String {
        let mut attributes = Vec::new();
        for (key, value) in &object.attributes {
            if self.word_ignore.contains(&key.as_str()) {
                continue;
            }
            let key = map_key(&self.options.word_map, key);
            let mut attribute = if WORD_SPECIAL_ATTRIBUTES.contains(&key) {
                format!("x-{key}")
            } else {
                key.to_string()
            };
            if is_truthy(value) {
                attribute.push_str(&format!("=\"{}\"", value_text(value)));
            }
            attributes.push(attribute);
        }
        let mut line = format!("\\w {}", object.text.as_deref().unwrap_or(""));
        if !attributes.is_empty() {
            line.push('|');
            line.push_str(&attributes.join(" "));
        }
        line.push_str("\\w*");
        line
    }

    /// A node with children: milestones (`\zaln-s | ...\*` ... `\zaln-e\*`) and character
    /// spans wrapping nested nodes.
    fn phrase(&mut self, object: &VerseObject, next: Option<&VerseObject>) -> String {
        let tag = object.tag.as_deref().unwrap_or("zaln");
        let termination = match &object.end_tag {
            Some(end) => end.clone(),
            None => format!("{tag}-e\\*"),
        };
        let milestone = object.is_milestone();
        let mut content = String::new();
        if milestone {
            let attributes: Vec<String> = object
                .attributes
                .iter()
                .filter(|(key, _)| !self.milestone_ignore.contains(&key.as_str()))
                .map(|(key, value)| {
                    let key = map_key(&self.options.milestone_map, key);
                    format!("x-{key}=\"{}\"", value_text(value))
                })
                .collect();
            content = format!("-s | {}\n", attributes.join(" "));
        } else {
            if self.table.is_milestone(tag) {
                content.push_str(object.attrib.as_deref().unwrap_or(""));
                content.push_str("\\*");
            }
            if let Some(text) = object.text.as_deref().filter(|t| !t.is_empty()) {
                content.push(' ');
                content.push_str(text);
            }
            if let Some(body) = object.content.as_deref().filter(|c| !c.is_empty()) {
                content.push(' ');
                content.push_str(body);
            }
        }

        // A milestone without a child list loses its opening marker, as older tools did.
        let mut line = match &object.children {
            Some(children) => self.objects(children, format!("\\{tag}{content}")),
            None => String::new(),
        };
        if milestone && !line.ends_with('\n') {
            line.push('\n');
        }
        if !termination.is_empty() {
            line.push('\\');
            line.push_str(&termination);
            match object.next_char.as_deref().filter(|c| !c.is_empty()) {
                Some(next_char) => line.push_str(next_char),
                None => {
                    if !next.is_some_and(VerseObject::is_text) {
                        line.push('\n');
                    }
                }
            }
        }
        line
    }

    /// Any other marker: `\tag number content\tag*` plus attributes and `nextChar`.
    fn marker(
        &self,
        object: &VerseObject,
        next: Option<&VerseObject>,
        no_space_after_tag: bool,
        no_termination: bool,
    ) -> String {
        let mut content = object
            .text
            .as_deref()
            .filter(|t| !t.is_empty())
            .or_else(|| object.content.as_deref().filter(|c| !c.is_empty()))
            .unwrap_or("")
            .to_string();
        let termination = match &object.end_tag {
            Some(end) => Some(end.clone()),
            None => {
                let tag = object.tag.as_deref().unwrap_or("");
                (!no_termination && self.table.end_rule(tag).is_some()).then(|| format!("{tag}*"))
            }
        };
        let terminated = termination.as_deref().is_some_and(|t| !t.is_empty());

        let mut output = String::new();
        if let Some(tag) = object.tag.as_deref() {
            output.push('\\');
            output.push_str(tag);
            if let Some(number) = object.number.as_deref().filter(|n| !n.is_empty()) {
                output.push(' ');
                output.push_str(number);
            }
            let first = content.chars().next();
            if !no_space_after_tag {
                if let Some(attrib) = object.attrib.as_deref().filter(|a| !a.is_empty()) {
                    if !content.is_empty() {
                        output.push(' ');
                        output.push_str(&content);
                    }
                    if tag.ends_with("\\*") && output.len() >= 2 {
                        let closing = output.split_off(output.len() - 2);
                        output.push_str(attrib);
                        output.push_str(&closing);
                    } else {
                        output.push_str(attrib);
                    }
                    content.clear();
                } else if !terminated {
                    if first.is_some_and(|c| c != '\n') && content != " \n" {
                        output.push(' ');
                    } else if let Some(next) = next {
                        let next_is_aligned =
                            matches!(next.tag.as_deref(), Some("w") | Some("k") | Some("zaln"));
                        let no_next_char = object.next_char.as_deref().map_or(true, str::is_empty);
                        if content.is_empty() && no_next_char && !next_is_aligned {
                            output.push(' ');
                        }
                    }
                } else if first != Some(' ') {
                    output.push(' ');
                }
            }
        }
        output.push_str(&content);
        if let Some(termination) = termination.filter(|t| !t.is_empty()) {
            output.push('\\');
            output.push_str(&termination);
        }
        if let Some(next_char) = object.next_char.as_deref() {
            output.push_str(next_char);
        }
        output
    }

    fn add_on_new_line(&self, text: String, mut output: String) -> String {
        if text.is_empty() {
            return output;
        }
        if self.options.forced_new_lines && !output.ends_with('\n') {
            output.push('\n');
        }
        output.push_str(&text);
        output
    }

    fn add_word(&self, text: String, mut output: String) -> String {
        if text.is_empty() {
            return output;
        }
        let after_word = self.last_kind == Some(ObjectKind::Word);
        let last = output.chars().last();
        let mut new_line = false;
        let mut text = text;
        if self.options.forced_new_lines {
            match last {
                None => new_line = true,
                Some(' ') => {
                    output.pop();
                    new_line = true;
                }
                Some(c) if c != '\n' && after_word => new_line = true,
                _ => {}
            }
        } else if after_word && last.is_some_and(|c| c != ' ') {
            text.insert(0, ' ');
        }
        if new_line {
            output.push('\n');
        }
        output.push_str(&text);
        output
    }
}

/// Milestone nodes whose end tag is `tag*` are written like character styles.
fn closes_like_character_style(object: &VerseObject) -> bool {
    match (&object.end_tag, &object.tag) {
        (Some(end), Some(tag)) => end.strip_suffix('*') == Some(tag.as_str()),
        _ => false,
    }
}

fn map_key<'k>(map: &'k HashMap<String, String>, key: &'k str) -> &'k str {
    if key == "strongs" {
        return "strong";
    }
    map.get(key)
        .map(String::as_str)
        .filter(|k| !k.is_empty())
        .unwrap_or(key)
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Attribute value as it appears between the quotes.
fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(value_text).collect::<Vec<_>>().join(","),
        Value::Object(_) => "[object Object]".to_string(),
        other => other.to_string(),
    }
}

/// Verse keys in writing order: keys with a leading number by value (an unspanned verse
/// before a span starting at the same number), then the rest in their existing order.
fn sort_verses(keys: Vec<&str>) -> Vec<&str> {
    let mut numbered: Vec<(i64, &str)> = Vec::new();
    let mut named = Vec::new();
    for key in keys {
        match parse_int(key).and_then(|n| n.as_i64()) {
            Some(n) => numbered.push((n, key)),
            None => named.push(key),
        }
    }
    numbered.sort_by(|(a, ka), (b, kb)| a.cmp(b).then_with(|| ka.cmp(kb)));
    numbered.into_iter().map(|(_, k)| k).chain(named).collect()
}

/// The `usfm` output format.
pub struct UsfmFormatter {
    options: SerializeOptions,
}

impl UsfmFormatter {
    pub fn new(options: SerializeOptions) -> Self {
        UsfmFormatter { options }
    }
}

impl Default for UsfmFormatter {
    fn default() -> Self {
        UsfmFormatter::new(SerializeOptions::default())
    }
}

impl Formatter for UsfmFormatter {
    fn name(&self) -> &str {
        "usfm"
    }

    fn serialize(&self, doc: &Document) -> Result<String, FormatError> {
        Ok(to_usfm(doc, &self.options))
    }

    fn description(&self) -> &str {
        "USFM markup"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn objects(value: Value) -> Vec<VerseObject> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_word_attributes() {
        let nodes = objects(json!([
            {"text": "Paul", "tag": "w", "type": "word", "strong": "G39720", "occurrence": 1, "occurrences": 1}
        ]));
        insta::assert_snapshot!(
            verse_objects_to_usfm(&nodes, &SerializeOptions::default()),
            @r#"\w Paul|strong="G39720" x-occurrence="1" x-occurrences="1"\w*"#
        );
    }

    #[test]
    fn test_words_get_a_space_between() {
        let nodes = objects(json!([
            {"text": "a", "tag": "w", "type": "word"},
            {"text": "b", "tag": "w", "type": "word"}
        ]));
        assert_eq!(
            verse_objects_to_usfm(&nodes, &SerializeOptions::default()),
            "\\w a\\w* \\w b\\w*"
        );
    }

    #[test]
    fn test_milestone_forced_new_lines() {
        let nodes = objects(json!([
            {"tag": "zaln", "type": "milestone", "strong": "G39720",
             "children": [{"text": "Paul", "tag": "w", "type": "word", "occurrence": "1"}],
             "endTag": "zaln-e\\*"},
            {"type": "text", "text": ", "}
        ]));
        assert_eq!(
            verse_objects_to_usfm(&nodes, &SerializeOptions::forced_new_lines()),
            "\n\\zaln-s | x-strong=\"G39720\"\n\\w Paul|x-occurrence=\"1\"\\w*\n\\zaln-e\\*, "
        );
    }

    #[test]
    fn test_marker_with_end_tag() {
        let nodes = objects(json!([
            {"type": "text", "text": "a"},
            {"tag": "f", "type": "footnote", "content": "+ \\ft note", "endTag": "f*", "nextChar": " "},
            {"type": "text", "text": "b"}
        ]));
        assert_eq!(
            verse_objects_to_usfm(&nodes, &SerializeOptions::default()),
            "a\\f + \\ft note\\f* b"
        );
    }

    #[test]
    fn test_paragraph_marker() {
        let nodes = objects(json!([{"tag": "p", "type": "paragraph", "nextChar": "\n"}]));
        assert_eq!(verse_objects_to_usfm(&nodes, &SerializeOptions::default()), "\\p\n");
    }

    #[test]
    fn test_chapter_lines_sort_verses() {
        let chapter: Chapter = [
            ("2", Verse::new(vec![VerseObject::text("c\n")])),
            ("1", Verse::new(vec![VerseObject::text("b\n")])),
        ]
        .into_iter()
        .collect();
        assert_eq!(
            chapter_to_usfm("2", &chapter, &SerializeOptions::default()),
            "\\c 2\n\\v 1 b\n\\v 2 c\n"
        );
    }

    #[test]
    fn test_sort_verses() {
        let keys = vec!["10", "2", "3-4", "3", "1", "x"];
        assert_eq!(sort_verses(keys), vec!["1", "2", "3", "3-4", "10", "x"]);
    }

    #[test]
    fn test_ignore_and_map_options() {
        let nodes = objects(json!([
            {"text": "a", "tag": "w", "type": "word", "lemma": "x", "strongs": "G1"}
        ]));
        let options = SerializeOptions {
            word_ignore: vec!["lemma".into()],
            ..Default::default()
        };
        assert_eq!(verse_objects_to_usfm(&nodes, &options), "\\w a|strong=\"G1\"\\w*");
    }
}
