//! Spanned markers
//!
//! Start markers open a span, end markers close the nearest matching one. Displayable
//! spans (`\bd`, `\add`, `\zaln-s`, `\qt-s`) get a child list pushed on the phrase stack;
//! non-displayable ones (`\f`, `\x`) are stored once and absorb everything up to their end
//! marker as raw text. Same-tag spans opened inside an absorbing parent only bump its
//! nesting count so the matching end marker can be told apart.

use super::arena::{non_empty, Node, NodeId};
use super::folder::{marker_to_text, Folder, Item};
use crate::usfm::lexing::{js_trim, RawMarker, Token};

/// Attribute text after `|`, extended into following orphan tokens when the closing `*`
/// is on a later line.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct AttributeRun {
    pub content: String,
    /// Orphan tokens swallowed whole.
    pub consumed: usize,
    /// Replacement content for the token after the swallowed ones.
    pub rest: Option<String>,
}

/// Collect attribute text starting at `pos` until a `*` is found.
pub(super) fn attribute_run(content: &str, pos: usize, following: &[Token]) -> AttributeRun {
    let mut run = AttributeRun {
        content: content.to_string(),
        consumed: 0,
        rest: None,
    };
    if run.content[pos..].contains('*') {
        return run;
    }
    for token in following {
        let Token::Orphan(next) = token else {
            break;
        };
        if next.is_empty() {
            break;
        }
        match next.find('*') {
            Some(0) => break,
            None => {
                run.content.push_str(next);
                run.consumed += 1;
            }
            Some(mut end) => {
                let rest = next[end..].to_string();
                if next[..end].ends_with('\\') {
                    end -= 1;
                }
                if end > 0 {
                    run.content.push_str(&next[..end]);
                    run.rest = Some(rest);
                }
                break;
            }
        }
    }
    run
}

impl Folder<'_> {
    /// Parent of the innermost open span.
    pub(super) fn parent(&self) -> Option<NodeId> {
        if self.phrase.len() > 1 {
            let below = self.phrase[self.phrase.len() - 2];
            if let Some(last) = self.arena.last(below) {
                return Some(last);
            }
        }
        self.open_parent
    }

    /// Close the innermost phrase list and return the new parent.
    pub(super) fn pop_phrase(&mut self) -> Option<NodeId> {
        if self.phrase.pop().is_none() {
            self.open_parent = None;
            return None;
        }
        if self.phrase.is_empty() {
            self.open_parent.take()
        } else {
            self.parent()
        }
    }

    /// Close every open span before a chapter or verse boundary.
    pub(super) fn terminate_phrases(&mut self) {
        let mut parent = self.parent();
        while let Some(id) = parent {
            let node = self.arena.node_mut(id);
            if node.end_tag.is_none() {
                tracing::debug!(tag = node.tag(), "span left open at verse boundary");
            }
            node.end_tag = Some(String::new());
            node.nesting = 0;
            node.usfm3_milestone = false;
            parent = self.pop_phrase();
        }
    }

    fn increment_nesting(&mut self, id: NodeId, tag: &str) {
        let node = self.arena.node_mut(id);
        if node.tag.as_deref() == Some(tag) {
            node.nesting += 1;
        }
    }

    /// Match `end_tag` against `parent`; on a match count one nesting level down.
    /// Returns whether it matched and the remaining depth (-1 when it did not match).
    fn decrement_nesting(&mut self, parent: NodeId, end_tag: &str) -> (bool, i64) {
        let mut parts = end_tag.split(' ');
        let first = parts.next().unwrap_or("");
        let base = if parts.next().is_some() {
            format!("{first}\\*")
        } else {
            first.to_string()
        };
        let tag = self.arena.node(parent).tag().to_string();
        let stem = tag.get(..tag.len().saturating_sub(2)).unwrap_or("");
        let mut matches = self.table.end_rule(&tag).is_some_and(|rule| {
            rule.terminations().iter().filter(|t| !t.is_empty()).any(|t| {
                *t == base || format!("{tag}{t}") == base || format!("{stem}{t}\\*") == base
            })
        });
        if !matches && self.table.special_start_for(&base) == Some(tag.as_str()) {
            matches = true;
        }
        if !matches {
            return (false, -1);
        }
        let node = self.arena.node_mut(parent);
        if node.nesting > 0 {
            node.nesting -= 1;
        }
        node.usfm3_milestone = false;
        (true, node.nesting as i64)
    }

    pub(super) fn process_marker_for_spans(&mut self, mut marker: RawMarker) {
        let (mut end_marker, mut spanned) = self.check_for_end_marker(&mut marker);
        if end_marker.is_none() {
            if let Some(start) = self.table.special_start_for(&marker.tag) {
                end_marker = Some(marker.tag.clone());
                marker.tag = start.to_string();
                spanned = true;
            }
        }
        match end_marker {
            Some(end) => {
                if spanned {
                    let header = self.in_header;
                    self.end_span(marker, end, header);
                }
            }
            None if spanned => {
                let tag = marker.tag.clone();
                let node = self.create_object(marker, false);
                self.start_span(node, tag);
            }
            None => {
                let node = self.create_object(marker, false);
                self.save_object(Item::Node(node));
            }
        }
    }

    /// Classify a marker: returns the end marker when it closes a span, and whether the
    /// tag takes part in spans at all. `\bd*`, `\qt-e` and `\k-s` style suffixes written
    /// into the content are moved onto the tag.
    fn check_for_end_marker(&self, marker: &mut RawMarker) -> (Option<String>, bool) {
        let initial = marker.tag.clone();
        let mut base = marker.tag.clone();
        let mut end = None;
        if base.ends_with('*') {
            base.pop();
            end = Some(marker.tag.clone());
        } else if marker.content.starts_with("-s") || marker.content.starts_with("-e") {
            let closing = marker.content.starts_with("-e");
            marker.tag.push_str(&marker.content[..2]);
            if closing {
                end = Some(marker.tag.clone());
            }
            base.push_str("-s");
            marker.content = marker.content[2..].to_string();
        } else if let Some(after) = marker.content.strip_prefix('*') {
            let (space, mut content) = match after.strip_prefix(' ') {
                Some(rest) => (true, rest.to_string()),
                None => (false, after.to_string()),
            };
            marker.tag.push('*');
            end = Some(marker.tag.clone());
            if !content.is_empty() {
                content.push_str(&marker.next_char);
                marker.next_char.clear();
            }
            if space {
                if content.is_empty() {
                    marker.next_char = " ".to_string();
                } else {
                    marker.end_marker_char = " ".to_string();
                }
            }
            marker.content = content;
        }
        if end.is_some() {
            return (end, true);
        }
        if self.table.is_standalone(&base) {
            return (Some(marker.tag.clone()), true);
        }
        match self.table.end_rule(&base) {
            Some(rule) => {
                let closes = rule
                    .single()
                    .is_some_and(|t| format!("{initial}{t}") == marker.tag);
                (closes.then(|| marker.tag.clone()), true)
            }
            None => (None, false),
        }
    }

    /// Open a span for `node` under `tag`.
    pub(super) fn start_span(&mut self, mut node: Node, tag: String) {
        let parent = self.parent();
        let displayable = self.table.is_displayable(&tag);
        if self.table.is_usfm3_milestone(&tag) {
            node.usfm3_milestone = true;
        }
        if self.table.has_attributes(&tag) {
            let slot = if displayable {
                &mut node.text
            } else {
                &mut node.content
            };
            let mut content = slot.take().unwrap_or_default();
            if let Some(mut pos) = content.find('|') {
                let run = attribute_run(&content, pos, &self.tokens[self.index + 1..]);
                self.apply_attribute_run(&run);
                content = run.content;
                if js_trim(&content[..pos]).is_empty() {
                    pos = 0;
                }
                node.attrib = Some(content[pos..].to_string());
                content.truncate(pos);
            }
            if !content.is_empty() {
                *slot = Some(content);
            }
        }
        node.tag = Some(tag.clone());

        if let Some(parent) = parent {
            let parent_tag = self.arena.node(parent).tag().to_string();
            if !self.table.is_displayable(&parent_tag) {
                let text = marker_to_text(&node, false);
                self.arena
                    .node_mut(parent)
                    .content
                    .get_or_insert_with(String::new)
                    .push_str(&text);
                self.increment_nesting(parent, &tag);
                return;
            }
        }

        if displayable {
            let list = self.save_location();
            let id = self.arena.push(list, node);
            if self.phrase.is_empty() {
                self.open_parent = Some(id);
            }
            let children = self.arena.new_list();
            self.phrase.push(children);
            self.arena.node_mut(id).children = Some(children);
        } else {
            let saved = self.save_object(Item::Node(node));
            if self.phrase.is_empty() {
                self.open_parent = self.last_item();
            }
            if let Some(id) = saved {
                self.increment_nesting(id, &tag);
            }
        }
    }

    fn apply_attribute_run(&mut self, run: &AttributeRun) {
        if run.consumed > 0 {
            tracing::debug!(lines = run.consumed, "attributes continue on following lines");
        }
        self.index += run.consumed;
        if let Some(rest) = &run.rest {
            if let Some(Token::Orphan(next)) = self.tokens.get_mut(self.index + 1) {
                *next = rest.clone();
            }
        }
    }

    /// Close the span ended by `current`.
    pub(super) fn end_span(&mut self, mut current: RawMarker, mut end_marker: String, header: bool) {
        let mut content = current.content.clone();
        let mut parent = self.parent();
        let parent_tag = parent.map(|p| self.arena.node(p).tag().to_string());
        let parent_displayable = parent_tag
            .as_deref()
            .is_some_and(|t| self.table.is_displayable(t));
        if parent_tag
            .as_deref()
            .is_some_and(|t| self.table.is_usfm3_milestone(t))
        {
            end_marker.push_str("\\*");
        }

        if parent.is_none() || parent_displayable {
            self.pop_phrase();
            if let Some(first) = parent {
                let node = self.arena.node(first);
                if let Some(children) = node.children {
                    if self.arena.list(children).is_empty() {
                        self.arena.node_mut(first).children = None;
                    }
                }
                let mut cursor = Some(first);
                while let Some(id) = cursor {
                    let node = self.arena.node_mut(id);
                    let base = node.tag().split('-').next().unwrap_or("").to_string();
                    if format!("{base}*") == end_marker || format!("{base}-e\\*") == end_marker {
                        node.end_tag = Some(end_marker.clone());
                        break;
                    }
                    tracing::debug!(tag = node.tag(), end = %end_marker, "closing span with a mismatched end marker");
                    node.end_tag = Some(String::new());
                    cursor = self.parent();
                    self.pop_phrase();
                }
                parent = cursor;
            }
        }

        let mut check_next = self.table.is_standalone(&current.tag);
        if !content.is_empty() {
            let trim = if content.starts_with('*') {
                1
            } else if content.starts_with("\\*") {
                2
            } else if content.starts_with("-e\\*") {
                4
            } else if content.starts_with("-e*") {
                3
            } else if content == "-e" {
                check_next = true;
                2
            } else {
                0
            };
            if trim > 0 {
                let trim = if content[trim..].starts_with('\n') {
                    trim + 1
                } else {
                    trim
                };
                content = content[trim..].to_string();
            }
        }

        if !content.is_empty() && self.table.has_end_attributes(&current.tag) {
            match parent {
                Some(id) => {
                    let node = self.arena.node_mut(id);
                    let recorded = node.end_tag.clone().unwrap_or_default();
                    let mut parts = recorded.split("\\*");
                    let head = parts.next().unwrap_or("");
                    let closed = if parts.next().is_some() { "\\*" } else { "" };
                    end_marker = format!("{head}{content}{closed}");
                    node.end_tag = Some(end_marker.clone());
                }
                None => current.attrib = Some(content.clone()),
            }
            current.content.clear();
            content.clear();
        }

        if check_next || (content.is_empty() && current.next_char.is_empty()) {
            if let Some(Token::Orphan(next)) = self.tokens.get_mut(self.index + 1) {
                let mut trim = if next.starts_with('*') {
                    1
                } else if next.starts_with("\\*") {
                    2
                } else {
                    0
                };
                let terminator = &next[..trim];
                if non_empty(&current.attrib).is_some() {
                    current.end_tag = Some(terminator.trim_start_matches('\\').to_string());
                } else {
                    if !end_marker.contains(terminator) {
                        end_marker.push_str(terminator);
                    }
                    current.tag = end_marker.clone();
                }
                if let Some(c @ (' ' | '\n')) = next[trim..].chars().next() {
                    if parent.is_none() {
                        trim += 1;
                        current.next_char = c.to_string();
                    }
                }
                if trim > 0 {
                    content.clear();
                    *next = next[trim..].to_string();
                }
                if next.is_empty() {
                    self.index += 1;
                }
            }
        }

        if !current.next_char.is_empty() && !content.is_empty() {
            content.push_str(&current.next_char);
            current.next_char.clear();
        }

        let Some(parent) = parent else {
            let node = self.create_object(current, header);
            self.save_object(Item::Node(node));
            return;
        };

        let (matched, count) = self.decrement_nesting(parent, &end_marker);
        let finish = matched && count <= 0;
        if !parent_displayable {
            let mut next_char = current.next_char.clone();
            if !content.is_empty() && !next_char.is_empty() {
                content.push_str(&next_char);
                next_char.clear();
            }
            next_char.push_str(&current.end_marker_char);
            let node = self.arena.node_mut(parent);
            if finish {
                node.end_tag = Some(end_marker);
                if !next_char.is_empty() {
                    node.next_char = Some(next_char);
                }
                self.pop_phrase();
            } else {
                let body = node.content.get_or_insert_with(String::new);
                body.push('\\');
                body.push_str(&end_marker);
                body.push_str(&next_char);
            }
        } else if finish {
            self.arena.node_mut(parent).end_tag = Some(end_marker);
            let next_char = if current.next_char.is_empty() {
                &current.end_marker_char
            } else {
                &current.next_char
            };
            if !next_char.is_empty() {
                content = format!("{next_char}{content}");
            }
        }
        if !content.is_empty() {
            self.save_object(Item::Node(Node::text(content)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn orphan(text: &str) -> Token {
        Token::orphan(text)
    }

    #[test]
    fn test_attribute_run_closed_on_same_line() {
        let run = attribute_run(r#"|x="1"\*"#, 0, &[orphan("next")]);
        assert_eq!(run.consumed, 0);
        assert_eq!(run.rest, None);
    }

    #[test]
    fn test_attribute_run_spans_lines() {
        let following = [orphan(r#" b="2""#), orphan(r#" c="3"\*rest"#)];
        let run = attribute_run(r#"|a="1""#, 0, &following);
        assert_eq!(run.content, r#"|a="1" b="2" c="3""#);
        assert_eq!(run.consumed, 1);
        assert_eq!(run.rest.as_deref(), Some("*rest"));
    }

    #[test]
    fn test_attribute_run_stops_at_marker() {
        let following = [Token::Marker(RawMarker::new("p"))];
        let run = attribute_run(r#"|a="1""#, 0, &following);
        assert_eq!(run.content, r#"|a="1""#);
        assert_eq!(run.consumed, 0);
    }

    #[test]
    fn test_attribute_run_leading_star_ends() {
        let run = attribute_run(r#"|a="1""#, 0, &[orphan("*")]);
        assert_eq!(run.consumed, 0);
        assert_eq!(run.rest, None);
    }
}
