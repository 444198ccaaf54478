//! Document folder
//!
//! Walks the token stream once and folds it into the chapter/verse tree. The folder
//! owns all per-call state: the current chapter and verse, the open-phrase stack and the
//! arena. Span handling lives in [`super::spans`], header handling in [`super::headers`].
//!
//! The open-phrase stack holds the child lists of open displayable spans, innermost
//! last. The parent of the innermost span is the last node of the list below it, or the
//! folder's `open_parent` for the outermost one; a non-displayable span (footnotes,
//! cross references) is recorded as `open_parent` with an empty stack, and everything up
//! to its end marker is absorbed into its `content`.

use super::arena::{non_empty, Arena, ListId, Node, NodeId};
use super::words::parse_word;
use super::ParseOptions;
use crate::usfm::ast::{Document, KeyedMap, ObjectKind, Verse};
use crate::usfm::lexing::{is_js_space, js_trim, RawMarker, Token};
use crate::usfm::markers::{MarkerTable, WORD_SPECIAL_ATTRIBUTES};

/// Something to store at the current position.
#[derive(Debug, Clone)]
pub(super) enum Item {
    /// Raw text; may be merged into a parent's attributes.
    Text(String),
    Node(Node),
}

impl Item {
    fn into_node(self) -> Node {
        match self {
            Item::Text(text) => Node::text(text),
            Item::Node(node) => node,
        }
    }
}

pub(super) struct Folder<'a> {
    pub(super) table: &'a MarkerTable,
    pub(super) options: &'a ParseOptions,
    pub(super) tokens: Vec<Token>,
    pub(super) index: usize,
    pub(super) arena: Arena,
    pub(super) headers: ListId,
    pub(super) chapters: KeyedMap<KeyedMap<ListId>>,
    pub(super) verses: KeyedMap<ListId>,
    pub(super) chapter: Option<String>,
    pub(super) verse: Option<String>,
    pub(super) in_header: bool,
    pub(super) on_same_chapter: bool,
    pub(super) phrase: Vec<ListId>,
    pub(super) open_parent: Option<NodeId>,
}

impl<'a> Folder<'a> {
    pub(super) fn new(tokens: Vec<Token>, table: &'a MarkerTable, options: &'a ParseOptions) -> Self {
        let mut arena = Arena::new();
        let headers = arena.new_list();
        Folder {
            table,
            options,
            tokens,
            index: 0,
            arena,
            headers,
            chapters: KeyedMap::new(),
            verses: KeyedMap::new(),
            chapter: None,
            verse: None,
            in_header: true,
            on_same_chapter: false,
            phrase: Vec::new(),
            open_parent: None,
        }
    }

    pub(super) fn run(mut self) -> Document {
        while self.index < self.tokens.len() {
            match self.tokens[self.index].clone() {
                Token::Orphan(text) => self.fold_orphan(text),
                Token::Marker(marker) => self.fold_marker(marker),
            }
            self.index += 1;
        }
        self.terminate_phrases();
        self.cleanup_header_newlines();
        self.finish()
    }

    fn finish(self) -> Document {
        let arena = &self.arena;
        let chapters = self
            .chapters
            .iter()
            .map(|(number, verses)| {
                let chapter: KeyedMap<Verse> = verses
                    .iter()
                    .map(|(key, list)| (key, Verse::new(arena.build(*list))))
                    .collect();
                (number, chapter)
            })
            .collect();
        let verses = self
            .verses
            .iter()
            .map(|(key, list)| (key, Verse::new(arena.build(*list))))
            .collect();
        Document {
            headers: arena.build(self.headers),
            chapters,
            verses,
        }
    }

    fn fold_orphan(&mut self, text: String) {
        if self.in_header {
            self.add_header_marker(RawMarker::new("").with_content(text));
            return;
        }
        let mut content = text.as_str();
        if let Some(rest) = content.strip_prefix("\\*") {
            content = rest;
        } else if let Some(rest) = content.strip_prefix('*') {
            let in_milestone = self
                .parent()
                .is_some_and(|p| self.arena.node(p).usfm3_milestone);
            if in_milestone {
                content = rest;
            }
        }
        if !content.is_empty() {
            let content = content.to_string();
            self.process_as_text(RawMarker::new("").with_content(content));
        }
    }

    fn fold_marker(&mut self, mut marker: RawMarker) {
        match marker.tag.as_str() {
            "c" | "v" => {
                if marker.number.is_empty() && !marker.content.is_empty() {
                    extract_number_from_content(&mut marker);
                }
                if marker.number.is_empty() {
                    tracing::debug!(tag = %marker.tag, "marker without a number, keeping as text");
                    marker.content = marker_to_text(&Node::from_raw(&marker), false);
                    self.process_as_text(marker);
                } else if marker.tag == "c" {
                    self.process_as_chapter(marker);
                } else {
                    self.parse_as_verse(marker);
                }
            }
            "k" | "zaln" => {
                if self.in_header {
                    self.add_header_marker(marker);
                    return;
                }
                let mut phrase = parse_word(&marker.content, self.options, None);
                phrase.kind = Some(ObjectKind::Milestone);
                let milestone = js_trim(phrase.text.as_deref().unwrap_or("")).to_string();
                match milestone.as_str() {
                    "-s" => {
                        self.remove_last_newline();
                        phrase.text = None;
                        let tag = marker.tag;
                        self.start_span(phrase, tag);
                    }
                    "-e" => {
                        self.remove_last_newline();
                        let end = format!("{}-e\\*", marker.tag);
                        self.end_span(marker, end, false);
                    }
                    _ => self.process_marker_for_spans(marker),
                }
            }
            "w" => {
                if self.in_header {
                    self.add_header_marker(marker);
                    return;
                }
                self.handle_word_white_space();
                let word = parse_word(&marker.content, self.options, Some(WORD_SPECIAL_ATTRIBUTES));
                self.push_object(Item::Node(word));
                if !marker.next_char.is_empty() {
                    self.push_object(Item::Text(marker.next_char));
                }
            }
            "w*" => {
                if self.in_header {
                    self.add_header_marker(marker);
                } else if !marker.next_char.is_empty() && marker.next_char != " " {
                    self.push_object(Item::Text(marker.next_char));
                }
            }
            _ => match split_mangled_number(&marker.tag) {
                Some((tag, number)) => {
                    tracing::debug!(tag = %marker.tag, "splitting number from mangled marker");
                    if !marker.number.is_empty() {
                        marker.content = if marker.content.is_empty() {
                            marker.number.clone()
                        } else {
                            format!("{} {}", marker.number, marker.content)
                        };
                    }
                    marker.number = number;
                    marker.tag = tag.to_string();
                    if tag == "v" {
                        self.parse_as_verse(marker);
                    } else {
                        self.process_as_chapter(marker);
                    }
                }
                None => self.process_marker(marker),
            },
        }
    }

    fn process_marker(&mut self, marker: RawMarker) {
        if self.chapter.is_none() && self.verse.is_none() {
            self.in_header = true;
            self.add_header_marker(marker);
        } else if self.chapter.is_some() || (self.options.chunk && self.verse.is_some()) {
            self.process_marker_for_spans(marker);
        } else {
            tracing::warn!(tag = %marker.tag, "marker outside any chapter dropped");
        }
    }

    fn process_as_chapter(&mut self, marker: RawMarker) {
        self.in_header = false;
        self.terminate_phrases();
        let number = strip_leading_zeros(&marker.number).to_string();
        if self.chapters.contains_key(&number) {
            tracing::debug!(chapter = %number, "chapter seen again, starting it over");
        }
        self.chapters.insert(number.clone(), KeyedMap::new());
        self.chapter = Some(number);
        self.on_same_chapter = false;
        self.verse = None;
    }

    fn parse_as_verse(&mut self, marker: RawMarker) {
        self.in_header = false;
        self.terminate_phrases();
        let mut content = marker.content;
        if marker.next_char == "\n" {
            content.push('\n');
        }
        let mut verse = strip_leading_zeros(&marker.number).to_string();
        if let Some((len, end)) = verse_span(&content) {
            verse.push('-');
            verse.push_str(strip_leading_zeros(end));
            content = content[len..].to_string();
        }
        self.verse = Some(verse.clone());

        if self.options.chunk && !self.on_same_chapter {
            if self.verses.contains_key(&verse) {
                self.on_same_chapter = true;
            } else {
                let list = self.arena.new_list();
                self.verses.insert(verse, list);
                self.push_object(Item::Text(content));
            }
        } else if let Some(chapter) = self.chapter.clone() {
            if self.on_same_chapter {
                return;
            }
            let exists = self
                .chapters
                .get(&chapter)
                .is_some_and(|verses| verses.contains_key(&verse));
            if exists {
                tracing::debug!(chapter = %chapter, verse = %verse, "verse already present, continuing it");
                self.on_same_chapter = true;
            } else {
                self.push_object(Item::Text(content));
            }
        }
    }

    pub(super) fn process_as_text(&mut self, marker: RawMarker) {
        let content = marker.content.clone();
        if is_positive(self.chapter.as_deref()) && !content.is_empty() {
            if self.parent().is_some() {
                self.save_object(Item::Text(content.clone()));
            } else {
                self.push_object(Item::Node(Node::text(content.clone())));
            }
        } else if self.chapter.is_none() && self.verse.is_none() {
            let node = self.create_object(marker, false);
            let headers = self.headers;
            self.arena.push(headers, node);
        }
        if self.options.chunk && is_positive(self.verse.as_deref()) && !content.is_empty() {
            let list = self.chunk_verse_list();
            if self.parent().is_some() {
                self.save_object(Item::Text(content));
            } else {
                self.arena.push(list, Node::text(content));
            }
        }
    }

    /// Convert a marker record into a node.
    ///
    /// Numbers on tags that do not take one are folded back into the content, and
    /// `nextChar` is appended to non-empty content unless `no_next` drops it.
    pub(super) fn create_object(&self, marker: RawMarker, no_next: bool) -> Node {
        let RawMarker {
            tag,
            number,
            mut content,
            next_char,
            attrib,
            end_tag,
            ..
        } = marker;
        let mut node = Node {
            attrib,
            end_tag,
            ..Default::default()
        };
        let displayable = if tag.is_empty() {
            node.kind = Some(ObjectKind::Text);
            true
        } else {
            node.kind = self.table.category(&tag).map(ObjectKind::from);
            self.table.is_displayable(&tag)
        };
        if !number.is_empty() {
            if self.table.supports_number(&tag) {
                node.number = Some(number);
            } else {
                content = if content.is_empty() {
                    number
                } else {
                    format!("{number} {content}")
                };
            }
        }
        if !no_next && !next_char.is_empty() {
            if content.is_empty() {
                node.next_char = Some(next_char);
            } else {
                content.push_str(&next_char);
            }
        }
        if !content.is_empty() {
            if displayable {
                node.text = Some(content);
            } else {
                node.content = Some(content);
            }
        }
        if !tag.is_empty() {
            node.tag = Some(tag);
        }
        node
    }

    /// Append to the innermost open phrase or the current verse, merging text.
    pub(super) fn push_object(&mut self, item: Item) {
        if matches!(&item, Item::Text(text) if text.is_empty()) {
            return;
        }
        let list = self.save_location();
        self.arena.push(list, item.into_node());
    }

    /// Store `item` relative to the open parent: absorbed into a non-displayable parent's
    /// content, appended to a displayable parent's attributes (raw text only) or children,
    /// or appended to the current verse. Returns the id of a newly stored node.
    pub(super) fn save_object(&mut self, item: Item) -> Option<NodeId> {
        let Some(parent) = self.parent() else {
            let list = self.save_location();
            return Some(self.arena.push(list, item.into_node()));
        };
        let parent_tag = self.arena.node(parent).tag().to_string();
        if !self.table.is_displayable(&parent_tag) {
            let text = match item {
                Item::Text(text) => text,
                Item::Node(node) => marker_to_text(&node, false),
            };
            self.arena
                .node_mut(parent)
                .content
                .get_or_insert_with(String::new)
                .push_str(&text);
            return None;
        }
        let node = self.arena.node_mut(parent);
        if let Item::Text(text) = &item {
            if non_empty(&node.attrib).is_some() && !node.usfm3_milestone {
                node.attrib.get_or_insert_with(String::new).push_str(text);
                return None;
            }
        }
        let list = match self.phrase.last() {
            Some(list) => *list,
            None => self.save_location(),
        };
        Some(self.arena.push(list, item.into_node()))
    }

    /// The list new content goes to, creating the verse bucket on first use.
    pub(super) fn save_location(&mut self) -> ListId {
        if let Some(list) = self.phrase.last() {
            return *list;
        }
        if self.options.chunk {
            if self.verse.is_some() {
                return self.chunk_verse_list();
            }
            return self.headers;
        }
        match self.chapter.clone() {
            Some(chapter) => {
                let verse = self.verse.get_or_insert_with(|| "front".to_string()).clone();
                self.verse_list(&chapter, &verse)
            }
            None => self.headers,
        }
    }

    fn chunk_verse_list(&mut self) -> ListId {
        let verse = self.verse.clone().unwrap_or_default();
        if let Some(list) = self.verses.get(&verse) {
            return *list;
        }
        let list = self.arena.new_list();
        self.verses.insert(verse, list);
        list
    }

    fn verse_list(&mut self, chapter: &str, verse: &str) -> ListId {
        if let Some(list) = self.chapters.get(chapter).and_then(|c| c.get(verse)) {
            return *list;
        }
        let list = self.arena.new_list();
        match self.chapters.get_mut(chapter) {
            Some(verses) => {
                verses.insert(verse, list);
            }
            None => {
                let mut verses = KeyedMap::new();
                verses.insert(verse, list);
                self.chapters.insert(chapter, verses);
            }
        }
        list
    }

    /// Last node at the current save location.
    pub(super) fn last_item(&mut self) -> Option<NodeId> {
        let list = self.save_location();
        self.arena.last(list)
    }

    /// Drop a newline left right before a milestone marker.
    fn remove_last_newline(&mut self) {
        let list = self.save_location();
        let Some(last) = self.arena.last(list) else {
            return;
        };
        let node = self.arena.node_mut(last);
        if node.next_char.as_deref() == Some("\n") {
            node.next_char = None;
            return;
        }
        let Some(text) = node.text.as_mut().filter(|t| !t.is_empty()) else {
            return;
        };
        if ends_with_newline(text) {
            if text.chars().count() == 1 {
                self.arena.pop(list);
            } else {
                text.pop();
            }
        }
    }

    /// Words on a new line continue the running text: the line break before a word
    /// becomes a space, or disappears at the start of a verse or after a quote.
    fn handle_word_white_space(&mut self) {
        let list = self.save_location();
        let Some(last) = self.arena.last(list) else {
            return;
        };
        let single = self.arena.list(list).len() == 1;
        let node = self.arena.node_mut(last);
        if node.next_char.as_deref() == Some("\n") {
            node.next_char = Some(" ".to_string());
            return;
        }
        let Some(text) = node.text.as_mut().filter(|t| !t.is_empty()) else {
            return;
        };
        if !ends_with_newline(text) {
            return;
        }
        let one_char = text.chars().count() == 1;
        let quoted = text.chars().rev().nth(1) == Some('"');
        if (single && one_char) || quoted {
            if one_char {
                self.arena.pop(list);
            } else {
                text.pop();
            }
        } else {
            text.pop();
            text.push(' ');
        }
    }
}

impl Node {
    /// Field-for-field view of a marker record, without any conversion.
    pub(super) fn from_raw(marker: &RawMarker) -> Self {
        let opt = |s: &str| (!s.is_empty()).then(|| s.to_string());
        Node {
            tag: opt(&marker.tag),
            number: opt(&marker.number),
            content: opt(&marker.content),
            next_char: opt(&marker.next_char),
            attrib: marker.attrib.clone(),
            end_tag: marker.end_tag.clone(),
            ..Default::default()
        }
    }
}

/// USFM text for a node: `\tag number content` plus attributes and `nextChar`.
pub(super) fn marker_to_text(node: &Node, no_space_after_tag: bool) -> String {
    let Some(tag) = non_empty(&node.tag) else {
        return node.body().unwrap_or("").to_string();
    };
    let mut text = format!("\\{tag}");
    if let Some(number) = non_empty(&node.number) {
        text.push(' ');
        text.push_str(number);
    }
    let content = non_empty(&node.content).or_else(|| non_empty(&node.text));
    if let Some(content) = content {
        if !no_space_after_tag {
            text.push(' ');
        }
        text.push_str(content);
    }
    if let Some(attrib) = non_empty(&node.attrib) {
        let suffix = match tag.find('-') {
            Some(pos) if pos > 0 => tag[pos + 1..].chars().next(),
            _ => None,
        };
        let spanned = matches!(suffix, Some('s') | Some('e'));
        if content.is_none() && !spanned {
            text.push(' ');
        }
        text.push_str(attrib);
        if spanned {
            text.push('\\');
        }
    }
    if let Some(next_char) = non_empty(&node.next_char) {
        text.push_str(next_char);
    }
    text
}

fn ends_with_newline(text: &str) -> bool {
    text.ends_with('\n') || text.ends_with('\r')
}

pub(super) fn strip_leading_zeros(text: &str) -> &str {
    let mut text = text;
    while text.len() > 1 && text.starts_with('0') {
        text = &text[1..];
    }
    text
}

/// True when `key` reads as a number greater than zero.
fn is_positive(key: Option<&str>) -> bool {
    match key {
        Some(key) if !key.is_empty() && key.bytes().all(|b| b.is_ascii_digit()) => {
            key.bytes().any(|b| b != b'0')
        }
        _ => false,
    }
}

/// A leading `-<digits><space>` verse span end; returns the matched length and digits.
fn verse_span(content: &str) -> Option<(usize, &str)> {
    let rest = content.strip_prefix('-')?;
    let digits = rest.bytes().take_while(|b| b.is_ascii_digit()).count();
    if digits == 0 {
        return None;
    }
    let space = rest[digits..].chars().next().filter(|c| is_js_space(*c))?;
    Some((1 + digits + space.len_utf8(), &rest[..digits]))
}

/// `\v3` / `\c12`: a verse or chapter tag with the number glued on.
fn split_mangled_number(tag: &str) -> Option<(&'static str, String)> {
    let base = match tag.chars().next()? {
        'v' => "v",
        'c' => "c",
        _ => return None,
    };
    let number = &tag[1..];
    let digits = number.strip_prefix('+').unwrap_or(number);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((base, number.to_string()))
}

/// Recover a chapter or verse number written inside the content.
///
/// The first digit run becomes the number; two characters are dropped from the front of
/// the content, which matches the one and two digit cases seen in practice.
fn extract_number_from_content(marker: &mut RawMarker) {
    let Some(start) = marker.content.find(|c: char| c.is_ascii_digit()) else {
        return;
    };
    let digits: String = marker.content[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    marker.number = digits;
    marker.content = marker.content.chars().skip(2).collect();
}
