//! Node arena used while folding tokens
//!
//! Open spans need to be reachable from several places at once (the open-phrase stack,
//! the parent's child list, the verse list), so nodes live in one arena and everything
//! else holds indices. Sibling lists are arena entries too: a verse, the header list and
//! a span's children are all [`ListId`]s. [`Arena::build`] turns a list back into owned
//! [`VerseObject`]s once parsing is done.

use crate::usfm::ast::{ObjectKind, VerseObject};
use serde_json::{Map, Value};

pub type NodeId = usize;
pub type ListId = usize;

/// A node under construction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Node {
    pub kind: Option<ObjectKind>,
    pub tag: Option<String>,
    pub number: Option<String>,
    pub text: Option<String>,
    pub content: Option<String>,
    pub next_char: Option<String>,
    pub attrib: Option<String>,
    pub end_tag: Option<String>,
    pub children: Option<ListId>,
    pub attributes: Map<String, Value>,
    /// Open same-tag spans nested inside this one.
    pub nesting: usize,
    pub usfm3_milestone: bool,
}

impl Node {
    pub fn text(text: impl Into<String>) -> Self {
        Node {
            kind: Some(ObjectKind::Text),
            text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn is_text(&self) -> bool {
        self.kind == Some(ObjectKind::Text)
    }

    pub fn tag(&self) -> &str {
        self.tag.as_deref().unwrap_or("")
    }

    /// `text`, falling back to `content`.
    pub fn body(&self) -> Option<&str> {
        non_empty(&self.text).or_else(|| non_empty(&self.content))
    }
}

pub(crate) fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

#[derive(Debug, Default)]
pub struct Arena {
    nodes: Vec<Node>,
    lists: Vec<Vec<NodeId>>,
}

impl Arena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    pub fn new_list(&mut self) -> ListId {
        self.lists.push(Vec::new());
        self.lists.len() - 1
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id]
    }

    pub fn list(&self, id: ListId) -> &[NodeId] {
        &self.lists[id]
    }

    pub fn last(&self, list: ListId) -> Option<NodeId> {
        self.lists[list].last().copied()
    }

    pub fn pop(&mut self, list: ListId) -> Option<NodeId> {
        self.lists[list].pop()
    }

    /// Append `node` to `list`, merging it into a trailing text node when both are text.
    /// Returns the id holding the content.
    pub fn push(&mut self, list: ListId, node: Node) -> NodeId {
        if node.is_text() {
            if let Some(last) = self.last(list) {
                if self.nodes[last].is_text() {
                    let addition = node.text.unwrap_or_default();
                    self.nodes[last]
                        .text
                        .get_or_insert_with(String::new)
                        .push_str(&addition);
                    return last;
                }
            }
        }
        let id = self.alloc(node);
        self.lists[list].push(id);
        id
    }

    /// Append without merging.
    pub fn append(&mut self, list: ListId, node: Node) -> NodeId {
        let id = self.alloc(node);
        self.lists[list].push(id);
        id
    }

    pub fn set_list(&mut self, list: ListId, ids: Vec<NodeId>) {
        self.lists[list] = ids;
    }

    /// Materialize a list into owned verse objects.
    pub fn build(&self, list: ListId) -> Vec<VerseObject> {
        self.lists[list].iter().map(|id| self.build_node(*id)).collect()
    }

    fn build_node(&self, id: NodeId) -> VerseObject {
        let node = &self.nodes[id];
        VerseObject {
            kind: node.kind,
            tag: node.tag.clone(),
            number: node.number.clone(),
            text: node.text.clone(),
            content: node.content.clone(),
            next_char: node.next_char.clone(),
            attrib: node.attrib.clone(),
            end_tag: node.end_tag.clone(),
            children: node.children.map(|list| self.build(list)),
            attributes: node.attributes.clone(),
        }
    }
}
