//! Word and milestone attribute parsing
//!
//! `\w grace|strong="G5485" x-morph="Gr,N,,,,,NFS,"\w*` and
//! `\zaln-s |x-strong="G39720" x-lemma="Παῦλος"\*` share one attribute syntax: the text
//! before the first `|` and a list of `key="value"` pairs after it.

use super::arena::Node;
use super::ParseOptions;
use crate::usfm::ast::ObjectKind;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Number, Value};

/// `key="value"` or `key='value'`, with an optional run of `x-` prefix characters.
static ATTRIBUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([x-]*)([A-Za-z0-9_-]+)=['"]([^\n\r\u{2028}\u{2029}]*?)['"]"#).unwrap()
});

/// Parse word-like content into a `w` node with attributes.
///
/// `unprefixed` lists the keys whose `x-` prefix is dropped; `None` drops it from every key.
pub fn parse_word(content: &str, options: &ParseOptions, unprefixed: Option<&[&str]>) -> Node {
    let mut parts = content.split('|');
    let word = remove_leading_space(parts.next().unwrap_or(""));
    let attribute_content = parts.next().unwrap_or("");

    let mut node = Node {
        kind: Some(ObjectKind::Word),
        tag: Some("w".to_string()),
        text: Some(word.to_string()),
        ..Default::default()
    };
    if let Some(source) = options.content_source.as_deref().filter(|s| !s.is_empty()) {
        node.attributes
            .insert("content-source".to_string(), Value::String(source.to_string()));
    }
    if attribute_content.is_empty() {
        return node;
    }

    let mut matched = false;
    for caps in ATTRIBUTE.captures_iter(attribute_content) {
        matched = true;
        let prefix = caps.get(1).map_or("", |m| m.as_str());
        let mut key = caps.get(2).map_or("", |m| m.as_str()).to_string();
        if !prefix.is_empty() {
            if let Some(list) = unprefixed {
                if !list.contains(&key.as_str()) {
                    key = format!("{prefix}{key}");
                }
            }
        }
        if key == "strongs" {
            key = "strong".to_string();
        }
        if let Some(mapped) = options.map.get(&key).filter(|m| !m.is_empty()) {
            key = mapped.clone();
        }
        let raw = caps.get(3).map_or("", |m| m.as_str());
        let value = if options.convert_to_int.iter().any(|k| *k == key) {
            match parse_int(raw) {
                Some(n) => Value::Number(n),
                None => {
                    tracing::debug!(key = %key, value = raw, "attribute is not an integer, keeping text");
                    Value::String(raw.to_string())
                }
            }
        } else {
            Value::String(raw.to_string())
        };
        node.attributes.insert(key, value);
    }
    if !matched {
        node.attributes
            .insert(attribute_content.to_string(), Value::String(String::new()));
    }
    node
}

fn remove_leading_space(text: &str) -> &str {
    match text.strip_prefix(' ') {
        Some(rest) if !rest.is_empty() => rest,
        _ => text,
    }
}

/// Leading-integer parse: optional whitespace and sign, then digits; trailing junk ignored.
pub(crate) fn parse_int(text: &str) -> Option<Number> {
    let trimmed = crate::usfm::lexing::js_trim(text);
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let end = digits
        .bytes()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    let value: i64 = digits[..end].parse().ok()?;
    Some(Number::from(if negative { -value } else { value }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usfm::markers::WORD_SPECIAL_ATTRIBUTES;
    use serde_json::json;

    fn options() -> ParseOptions {
        ParseOptions::default()
    }

    #[test]
    fn test_word_with_special_attributes() {
        let node = parse_word(
            r#"grace|strong="G5485" x-morph="Gr,N,,,,,NFS," x-occurrence="1" x-tw="rc://*/tw/dict/bible/kt/grace""#,
            &options(),
            Some(WORD_SPECIAL_ATTRIBUTES),
        );
        assert_eq!(node.text.as_deref(), Some("grace"));
        assert_eq!(
            Value::Object(node.attributes),
            json!({"strong": "G5485", "morph": "Gr,N,,,,,NFS,", "occurrence": "1", "tw": "rc://*/tw/dict/bible/kt/grace"})
        );
    }

    #[test]
    fn test_unknown_prefixed_key_keeps_prefix() {
        let node = parse_word(r#"a|x-foo="b""#, &options(), Some(WORD_SPECIAL_ATTRIBUTES));
        assert_eq!(node.attributes.get("x-foo"), Some(&json!("b")));
    }

    #[test]
    fn test_milestone_drops_every_prefix() {
        let node = parse_word(r#"-s |x-strong="G39720" x-content="Παῦλος""#, &options(), None);
        assert_eq!(node.text.as_deref(), Some("-s "));
        assert_eq!(node.attributes.get("strong"), Some(&json!("G39720")));
        assert_eq!(node.attributes.get("content"), Some(&json!("Παῦλος")));
    }

    #[test]
    fn test_strongs_renamed_and_mapped() {
        let mut opts = options();
        opts.map.insert("lemma".into(), "root".into());
        let node = parse_word(r#"x|strongs="H1" lemma='y'"#, &opts, Some(WORD_SPECIAL_ATTRIBUTES));
        assert_eq!(node.attributes.get("strong"), Some(&json!("H1")));
        assert_eq!(node.attributes.get("root"), Some(&json!("y")));
    }

    #[test]
    fn test_integer_coercion() {
        let mut opts = options();
        opts.convert_to_int = vec!["occurrence".into(), "occurrences".into()];
        let node = parse_word(
            r#"x|x-occurrence="2" x-occurrences="abc""#,
            &opts,
            Some(WORD_SPECIAL_ATTRIBUTES),
        );
        assert_eq!(node.attributes.get("occurrence"), Some(&json!(2)));
        assert_eq!(node.attributes.get("occurrences"), Some(&json!("abc")));
    }

    #[test]
    fn test_attribute_without_value_is_placeholder() {
        let node = parse_word("x|gloss", &options(), Some(WORD_SPECIAL_ATTRIBUTES));
        assert_eq!(node.attributes.get("gloss"), Some(&json!("")));
    }

    #[test]
    fn test_content_source_comes_first() {
        let mut opts = options();
        opts.content_source = Some("ugnt".into());
        let node = parse_word(r#"x|strong="G1""#, &opts, Some(WORD_SPECIAL_ATTRIBUTES));
        let keys: Vec<&String> = node.attributes.keys().collect();
        assert_eq!(keys, vec!["content-source", "strong"]);
    }

    #[test]
    fn test_parse_int() {
        assert_eq!(parse_int("12"), Some(Number::from(12)));
        assert_eq!(parse_int(" 7b"), Some(Number::from(7)));
        assert_eq!(parse_int("-3"), Some(Number::from(-3)));
        assert_eq!(parse_int("b7"), None);
        assert_eq!(parse_int(""), None);
    }

    #[test]
    fn test_leading_space() {
        assert_eq!(remove_leading_space(" a"), "a");
        assert_eq!(remove_leading_space(" "), " ");
        assert_eq!(remove_leading_space("a"), "a");
    }
}
