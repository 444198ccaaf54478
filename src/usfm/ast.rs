//! Verse objects document tree
//!
//! A parsed book is a [`Document`]: header nodes, a chapter map and (for chunk parses) a
//! chapter-less verse map. Every node is a [`VerseObject`]. Word and milestone nodes carry
//! an ordered attribute map that is flattened into the node when written as JSON, which is
//! the interchange layout used by the alignment tools:
//!
//! ```json
//! {"headers": [...], "chapters": {"1": {"front": {"verseObjects": [...]}, "1": {"verseObjects": [...]}}}}
//! ```

use crate::usfm::markers::Category;
use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::marker::PhantomData;

/// The `type` of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Text,
    Word,
    Milestone,
    Paragraph,
    Quote,
    Section,
    Footnote,
}

impl ObjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Text => "text",
            ObjectKind::Word => "word",
            ObjectKind::Milestone => "milestone",
            ObjectKind::Paragraph => "paragraph",
            ObjectKind::Quote => "quote",
            ObjectKind::Section => "section",
            ObjectKind::Footnote => "footnote",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "text" => ObjectKind::Text,
            "word" => ObjectKind::Word,
            "milestone" => ObjectKind::Milestone,
            "paragraph" => ObjectKind::Paragraph,
            "quote" => ObjectKind::Quote,
            "section" => ObjectKind::Section,
            "footnote" => ObjectKind::Footnote,
            _ => return None,
        })
    }
}

impl From<Category> for ObjectKind {
    fn from(category: Category) -> Self {
        match category {
            Category::Paragraph => ObjectKind::Paragraph,
            Category::Quote => ObjectKind::Quote,
            Category::Section => ObjectKind::Section,
            Category::Footnote => ObjectKind::Footnote,
            Category::Milestone => ObjectKind::Milestone,
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A node of the verse objects tree.
///
/// `text` holds displayable text, `content` opaque marker content. For words and
/// milestones the alignment metadata (strong, lemma, occurrence, ...) lives in
/// `attributes`, in the order it was read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VerseObject {
    pub kind: Option<ObjectKind>,
    pub tag: Option<String>,
    pub number: Option<String>,
    pub text: Option<String>,
    pub content: Option<String>,
    pub next_char: Option<String>,
    pub attrib: Option<String>,
    pub end_tag: Option<String>,
    pub children: Option<Vec<VerseObject>>,
    pub attributes: Map<String, Value>,
}

impl VerseObject {
    /// A plain text node.
    pub fn text(text: impl Into<String>) -> Self {
        VerseObject {
            kind: Some(ObjectKind::Text),
            text: Some(text.into()),
            ..Default::default()
        }
    }

    /// A `\w` word node without attributes.
    pub fn word(text: impl Into<String>) -> Self {
        VerseObject {
            kind: Some(ObjectKind::Word),
            tag: Some("w".to_string()),
            text: Some(text.into()),
            ..Default::default()
        }
    }

    /// A milestone (`zaln`, `k`) with the given children.
    pub fn milestone(tag: impl Into<String>, children: Vec<VerseObject>) -> Self {
        let tag = tag.into();
        VerseObject {
            kind: Some(ObjectKind::Milestone),
            end_tag: Some(format!("{tag}-e\\*")),
            tag: Some(tag),
            children: Some(children),
            ..Default::default()
        }
    }

    /// Any other marker.
    pub fn marker(tag: impl Into<String>) -> Self {
        VerseObject {
            tag: Some(tag.into()),
            ..Default::default()
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn is_text(&self) -> bool {
        self.kind == Some(ObjectKind::Text)
    }

    pub fn is_word(&self) -> bool {
        self.kind == Some(ObjectKind::Word)
    }

    pub fn is_milestone(&self) -> bool {
        self.kind == Some(ObjectKind::Milestone)
    }

    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// String form of an attribute; numbers are rendered as written.
    pub fn attribute_str(&self, key: &str) -> Option<String> {
        match self.attributes.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    /// Children, or an empty slice.
    pub fn child_slice(&self) -> &[VerseObject] {
        self.children.as_deref().unwrap_or(&[])
    }

    fn structural_keys(kind: Option<ObjectKind>) -> &'static [&'static str] {
        match kind {
            Some(ObjectKind::Word) => &["text", "tag"],
            Some(ObjectKind::Milestone) => &["tag", "children", "endTag"],
            _ => &[
                "tag", "number", "text", "content", "nextChar", "attrib", "endTag", "children",
            ],
        }
    }
}

impl Serialize for VerseObject {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        let mut written: Vec<&str> = Vec::with_capacity(10);
        let mut put = |map: &mut S::SerializeMap,
                       key: &'static str,
                       value: Option<&String>|
         -> Result<(), S::Error> {
            if let Some(value) = value {
                map.serialize_entry(key, value)?;
                written.push(key);
            }
            Ok(())
        };

        match self.kind {
            Some(ObjectKind::Text) => {
                map.serialize_entry("type", "text")?;
                put(&mut map, "text", self.text.as_ref())?;
                put(&mut map, "tag", self.tag.as_ref())?;
                put(&mut map, "content", self.content.as_ref())?;
                put(&mut map, "nextChar", self.next_char.as_ref())?;
            }
            Some(ObjectKind::Word) => {
                put(&mut map, "text", self.text.as_ref())?;
                put(&mut map, "tag", self.tag.as_ref())?;
                map.serialize_entry("type", "word")?;
                put(&mut map, "nextChar", self.next_char.as_ref())?;
            }
            Some(ObjectKind::Milestone) => {
                put(&mut map, "tag", self.tag.as_ref())?;
                map.serialize_entry("type", "milestone")?;
            }
            kind => {
                put(&mut map, "tag", self.tag.as_ref())?;
                put(&mut map, "number", self.number.as_ref())?;
                if self.end_tag.is_none() {
                    put(&mut map, "nextChar", self.next_char.as_ref())?;
                }
                if let Some(kind) = kind {
                    map.serialize_entry("type", kind.as_str())?;
                }
                put(&mut map, "text", self.text.as_ref())?;
                put(&mut map, "content", self.content.as_ref())?;
                put(&mut map, "attrib", self.attrib.as_ref())?;
            }
        }

        for (key, value) in &self.attributes {
            if key == "type" && self.kind.is_some() {
                continue;
            }
            if !written.contains(&key.as_str()) {
                map.serialize_entry(key, value)?;
            }
        }

        if let Some(children) = &self.children {
            map.serialize_entry("children", children)?;
        }
        if let Some(end_tag) = &self.end_tag {
            map.serialize_entry("endTag", end_tag)?;
        }
        if !written.contains(&"nextChar") {
            if let Some(next_char) = &self.next_char {
                map.serialize_entry("nextChar", next_char)?;
            }
        }
        map.end()
    }
}

fn take_string<E: de::Error>(map: &mut Map<String, Value>, key: &str) -> Result<Option<String>, E> {
    match map.shift_remove(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(E::custom(format!("expected a string for `{key}`, found {other}"))),
    }
}

impl<'de> Deserialize<'de> for VerseObject {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut map = Map::<String, Value>::deserialize(deserializer)?;

        let kind = match map.get("type") {
            Some(Value::String(name)) => ObjectKind::parse(name),
            _ => None,
        };
        if kind.is_some() {
            map.shift_remove("type");
        }

        let structural = VerseObject::structural_keys(kind);
        let mut object = VerseObject {
            kind,
            ..Default::default()
        };
        for key in structural {
            match *key {
                "children" => {
                    if let Some(value) = map.shift_remove("children") {
                        let children: Vec<VerseObject> = serde_json::from_value(value)
                            .map_err(<D::Error as de::Error>::custom)?;
                        object.children = Some(children);
                    }
                }
                "tag" => object.tag = take_string::<D::Error>(&mut map, key)?,
                "number" => object.number = take_string::<D::Error>(&mut map, key)?,
                "text" => object.text = take_string::<D::Error>(&mut map, key)?,
                "content" => object.content = take_string::<D::Error>(&mut map, key)?,
                "nextChar" => object.next_char = take_string::<D::Error>(&mut map, key)?,
                "attrib" => object.attrib = take_string::<D::Error>(&mut map, key)?,
                "endTag" => object.end_tag = take_string::<D::Error>(&mut map, key)?,
                _ => {}
            }
        }
        object.attributes = map;
        Ok(object)
    }
}

/// The node list of a single verse (`{"verseObjects": [...]}`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Verse {
    #[serde(rename = "verseObjects", default)]
    pub verse_objects: Vec<VerseObject>,
}

impl Verse {
    pub fn new(verse_objects: Vec<VerseObject>) -> Self {
        Verse { verse_objects }
    }
}

/// Verse key → verse.
pub type Chapter = KeyedMap<Verse>;

/// A complete parse result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub headers: Vec<VerseObject>,
    #[serde(default)]
    pub chapters: KeyedMap<Chapter>,
    #[serde(default, skip_serializing_if = "KeyedMap::is_empty")]
    pub verses: KeyedMap<Verse>,
}

impl Document {
    pub fn chapter(&self, number: &str) -> Option<&Chapter> {
        self.chapters.get(number)
    }

    /// Nodes of `chapter:verse`.
    pub fn verse(&self, chapter: &str, verse: &str) -> Option<&[VerseObject]> {
        self.chapters
            .get(chapter)?
            .get(verse)
            .map(|v| v.verse_objects.as_slice())
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// True for keys JavaScript treats as array indices (`"0"`, `"12"`, not `"012"`, `"3-4"`).
pub fn is_index_key(key: &str) -> bool {
    if key.is_empty() || !key.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    if key.len() > 1 && key.starts_with('0') {
        return false;
    }
    matches!(key.parse::<u64>(), Ok(n) if n < u32::MAX as u64)
}

/// String-keyed map that remembers insertion order.
///
/// Iteration yields insertion order. [`KeyedMap::ordered`] and serialization use the
/// book layout order: index-like keys ascending, then the rest (`front`, verse spans) in
/// insertion order. Equality compares entries by key and ignores order.
#[derive(Debug, Clone)]
pub struct KeyedMap<V> {
    entries: Vec<(String, V)>,
}

impl<V> Default for KeyedMap<V> {
    fn default() -> Self {
        KeyedMap {
            entries: Vec::new(),
        }
    }
}

impl<V> KeyedMap<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Insert or replace; a replaced entry keeps its position.
    pub fn insert(&mut self, key: impl Into<String>, value: V) -> Option<V> {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<V> {
        let pos = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(pos).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Entries in book layout order.
    pub fn ordered(&self) -> Vec<(&str, &V)> {
        let mut indexed: Vec<(u64, &str, &V)> = Vec::new();
        let mut named: Vec<(&str, &V)> = Vec::new();
        for (k, v) in &self.entries {
            if is_index_key(k) {
                indexed.push((k.parse().unwrap_or(0), k.as_str(), v));
            } else {
                named.push((k.as_str(), v));
            }
        }
        indexed.sort_by_key(|(n, _, _)| *n);
        indexed
            .into_iter()
            .map(|(_, k, v)| (k, v))
            .chain(named)
            .collect()
    }
}

impl<V: PartialEq> PartialEq for KeyedMap<V> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .entries
                .iter()
                .all(|(k, v)| other.get(k).is_some_and(|o| o == v))
    }
}

impl<K: Into<String>, V> FromIterator<(K, V)> for KeyedMap<V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = KeyedMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl<V: Serialize> Serialize for KeyedMap<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in self.ordered() {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

struct KeyedMapVisitor<V>(PhantomData<V>);

impl<'de, V: Deserialize<'de>> Visitor<'de> for KeyedMapVisitor<V> {
    type Value = KeyedMap<V>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map keyed by chapter or verse")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut map = KeyedMap::new();
        while let Some((key, value)) = access.next_entry::<String, V>()? {
            map.insert(key, value);
        }
        Ok(map)
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for KeyedMap<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(KeyedMapVisitor(PhantomData))
    }
}
