//! Markup removal
//!
//! [`remove_markup`] reduces a fragment of verse USFM to the text a reader would see.
//! Words and milestones are flattened to their text joined by single spaces, other
//! markers contribute only their displayable `text` and `nextChar`.

use crate::usfm::ast::{ObjectKind, VerseObject};
use crate::usfm::parsing::{parse, ParseOptions};

/// Punctuation after which the next word still gets a joining space.
const JOINING_PUNCTUATION: [char; 4] = [',', '.', '?', ';'];

/// Plain text of a verse fragment such as `\w Grace\w* \add to\add* you`.
pub fn remove_markup(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let doc = parse(&format!("\\v 1 {text}"), &ParseOptions::chunk());
    match doc.verses.get("1") {
        Some(verse) => merge_verse_data(&verse.verse_objects),
        None => {
            tracing::debug!("fragment produced no verse, returning it unchanged");
            text.to_string()
        }
    }
}

/// Displayed text of a verse's nodes.
pub fn merge_verse_data(objects: &[VerseObject]) -> String {
    let mut spacing = String::new();
    let mut flattened = Vec::with_capacity(objects.len());
    for object in objects {
        let (item, next_spacing) = flatten(object, &spacing);
        spacing = next_spacing;
        flattened.push(item);
    }

    let mut verse_text = String::new();
    for item in flattened {
        if let Some(text) = item.text.as_deref().filter(|t| !t.is_empty()) {
            if item.tag.as_deref().is_some_and(|t| !t.is_empty())
                && verse_text.chars().last().is_some_and(|c| c != ' ' && c != '\n')
            {
                verse_text.push(' ');
            }
            verse_text.push_str(text);
        }
        if let Some(next_char) = item.next_char.as_deref() {
            verse_text.push_str(next_char);
        }
    }
    verse_text
}

/// Replace a word or milestone with a text node. Returns the node to merge and the
/// spacing to put before the next word.
fn flatten<'a>(object: &'a VerseObject, spacing: &str) -> (FlatItem<'a>, String) {
    let text = if object.kind == Some(ObjectKind::Word) {
        format!("{spacing}{}", object.text.as_deref().unwrap_or(""))
    } else if object.children.is_some() {
        format!("{spacing}{}", milestone_text(object))
    } else {
        String::new()
    };

    if !text.is_empty() {
        return (FlatItem::text(text), " ".to_string());
    }

    let spacing = if object.next_char.as_deref().is_some_and(|c| !c.is_empty()) {
        ""
    } else {
        match object.text.as_deref().and_then(|t| t.chars().last()) {
            Some(last) if !JOINING_PUNCTUATION.contains(&last) => "",
            _ => " ",
        }
    };
    (FlatItem::borrowed(object), spacing.to_string())
}

/// Words and text under a milestone, in order.
fn milestone_text(object: &VerseObject) -> String {
    let mut text = object.text.clone().unwrap_or_default();
    let mut spacing = "";
    for child in object.child_slice() {
        match child.kind {
            Some(ObjectKind::Word) => {
                text.push_str(spacing);
                text.push_str(child.text.as_deref().unwrap_or(""));
                spacing = " ";
            }
            Some(ObjectKind::Milestone) => {
                text.push_str(spacing);
                text.push_str(&milestone_text(child));
                spacing = " ";
            }
            _ => {
                if let Some(child_text) = child.text.as_deref().filter(|t| !t.is_empty()) {
                    text.push_str(child_text);
                    if text.chars().last().is_some_and(|c| !JOINING_PUNCTUATION.contains(&c)) {
                        spacing = "";
                    }
                }
            }
        }
        if let Some(next_char) = child.next_char.as_deref() {
            text.push_str(next_char);
        }
    }
    if let Some(next_char) = object.next_char.as_deref() {
        text.push_str(next_char);
    }
    text
}

/// The fields of a node that matter when merging.
struct FlatItem<'a> {
    tag: Option<&'a str>,
    text: Option<std::borrow::Cow<'a, str>>,
    next_char: Option<&'a str>,
}

impl<'a> FlatItem<'a> {
    fn text(text: String) -> Self {
        FlatItem {
            tag: None,
            text: Some(text.into()),
            next_char: None,
        }
    }

    fn borrowed(object: &'a VerseObject) -> Self {
        FlatItem {
            tag: object.tag.as_deref(),
            text: object.text.as_deref().map(Into::into),
            next_char: object.next_char.as_deref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::words_and_add(r"\w Grace\w* \add to\add* you", "Grace to you")]
    #[case::word_attributes(r#"\w Grace|x-occurrence="1"\w* \w to|x-occurrence="1"\w* \w you\w*"#, "Grace to you")]
    #[case::footnote_dropped(r"a\f + \ft note\f* b", "a b")]
    #[case::paragraph_dropped(r"plain \p text", "plain text")]
    #[case::empty("", "")]
    fn test_remove_markup(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(remove_markup(input), expected);
    }

    #[test]
    fn test_milestone_words_are_joined() {
        let milestone = VerseObject::milestone(
            "zaln",
            vec![VerseObject::word("Grace"), VerseObject::word("abounds")],
        );
        let objects = vec![milestone, VerseObject::text(", to you")];
        assert_eq!(merge_verse_data(&objects), "Grace abounds, to you");
    }
}
