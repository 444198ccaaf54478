//! Book headers
//!
//! Everything before the first chapter (or verse, in chunk mode) is a header: `\id`,
//! `\h`, `\toc1`, `\mt` and any stray text. A header record that does not start a new
//! line is folded into the previous header as USFM text.

use super::arena::non_empty;
use super::folder::{marker_to_text, Folder};
use crate::usfm::lexing::RawMarker;

impl Folder<'_> {
    pub(super) fn add_header_marker(&mut self, marker: RawMarker) {
        let next_char = marker.next_char.clone();
        let mut object = self.create_object(marker, true);
        if !next_char.is_empty() {
            object.next_char = Some(next_char);
        }

        let headers = self.headers;
        let last = self
            .arena
            .last(headers)
            .filter(|id| self.arena.node(*id).next_char.as_deref() != Some("\n"));
        match last {
            Some(id) => {
                let no_space = non_empty(&object.content)
                    .or_else(|| non_empty(&object.text))
                    .is_some_and(|c| c.starts_with('*'));
                let addition = marker_to_text(&object, no_space);
                let node = self.arena.node_mut(id);
                let into_text = non_empty(&node.text).is_some();
                let slot = if into_text {
                    &mut node.text
                } else {
                    &mut node.content
                };
                let mut content = slot.take().unwrap_or_default();
                content.push_str(&addition);
                if content.ends_with('\n') {
                    content.pop();
                    *slot = Some(content);
                    node.next_char = Some("\n".to_string());
                } else {
                    *slot = Some(content);
                }
            }
            None => {
                if object.next_char.is_none() {
                    if let Some(text) = object.text.as_mut().filter(|t| t.ends_with('\n')) {
                        text.pop();
                        object.next_char = Some("\n".to_string());
                    }
                }
                self.arena.append(headers, object);
            }
        }
    }

    /// Merge runs of header text and drop the implicit trailing newlines.
    pub(super) fn cleanup_header_newlines(&mut self) {
        let ids = self.arena.list(self.headers).to_vec();
        let mut kept = Vec::with_capacity(ids.len());
        let mut i = 0;
        while i < ids.len() {
            let id = ids[i];
            if self.arena.node(id).is_text() {
                let node = self.arena.node(id);
                let mut text = node.text.clone().unwrap_or_default();
                text.push_str(node.next_char.as_deref().unwrap_or(""));
                while i + 1 < ids.len() && self.arena.node(ids[i + 1]).is_text() {
                    let next = self.arena.node(ids[i + 1]);
                    text.push_str(next.text.as_deref().unwrap_or(""));
                    text.push_str(next.next_char.as_deref().unwrap_or(""));
                    i += 1;
                }
                if text.ends_with('\n') {
                    text.pop();
                }
                self.arena.node_mut(id).text = Some(text);
            }
            let node = self.arena.node_mut(id);
            if node.next_char.as_deref() == Some("\n") {
                node.next_char = None;
            }
            kept.push(id);
            i += 1;
        }
        self.arena.set_list(self.headers, kept);
    }
}
