#![forbid(unsafe_code)]

//! In-memory host page for deterministic tests.
//!
//! [`MemoryPage`] is a flat document: an arena of nodes plus their document
//! order. Layout is a single column, so an element's bottom edge is the sum
//! of the heights of every displayed node up to and including it. Markers
//! created by the virtualiser are 40px tall.
//!
//! Every write the virtualiser makes (attribute, style, text, insert,
//! remove) bumps [`MemoryPage::mutation_count`], which lets tests assert that
//! an operation left the document untouched. Transient show/measure/hide
//! cycles inside `measure_height` are not writes.

use std::collections::BTreeMap;

use crate::ledger::{HIDDEN_ATTR, TURN_ID_ATTR};
use crate::page::{HostPage, ProximitySensor, Selector};
use crate::placeholder::PLACEHOLDER_CLASS;

/// Height given to markers created through [`HostPage::create_marker`].
pub const MARKER_HEIGHT: f64 = 40.0;

/// Handle to a node in a [`MemoryPage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
struct Node {
    tag: String,
    attrs: BTreeMap<String, String>,
    display_none: bool,
    height: f64,
    text: String,
    /// Removed from the document; further writes are ignored.
    removed: bool,
    vanish_on_measure: bool,
}

impl Node {
    fn new(tag: &str, height: f64) -> Self {
        Self {
            tag: tag.to_owned(),
            attrs: BTreeMap::new(),
            display_none: false,
            height,
            text: String::new(),
            removed: false,
            vanish_on_measure: false,
        }
    }

    fn has_class(&self, class: &str) -> bool {
        self.attrs
            .get("class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
    }

    fn matches(&self, selector: Selector) -> bool {
        match selector {
            Selector::Attribute { tag, name, value } => {
                self.tag == tag
                    && match (self.attrs.get(name), value) {
                        (Some(_), None) => true,
                        (Some(actual), Some(expected)) => actual == expected,
                        (None, _) => false,
                    }
            }
            Selector::Class(class) => self.has_class(class),
        }
    }
}

/// Deterministic [`HostPage`] + [`ProximitySensor`] implementation.
#[derive(Debug, Clone)]
pub struct MemoryPage {
    nodes: Vec<Node>,
    order: Vec<NodeId>,
    viewport_height: f64,
    scroll: f64,
    watched: Option<(NodeId, f64)>,
    watch_calls: usize,
    unwatch_calls: usize,
    scroll_calls: usize,
    mutations: usize,
}

impl MemoryPage {
    /// Empty document with the given viewport height.
    #[must_use]
    pub fn new(viewport_height: f64) -> Self {
        Self {
            nodes: Vec::new(),
            order: Vec::new(),
            viewport_height,
            scroll: 0.0,
            watched: None,
            watch_calls: 0,
            unwatch_calls: 0,
            scroll_calls: 0,
            mutations: 0,
        }
    }

    /// `count` turns with ids `turn-0..`, each `height` tall, in an 800px
    /// viewport.
    #[must_use]
    pub fn with_turns(count: usize, height: f64) -> Self {
        let mut page = Self::new(800.0);
        for i in 0..count {
            page.push_turn(&format!("turn-{i}"), height);
        }
        page
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    fn live_node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0).filter(|node| !node.removed)
    }

    /// Append a turn (`article[data-turn-id]`) at the end of the document.
    pub fn push_turn(&mut self, id: &str, height: f64) -> NodeId {
        let mut node = Node::new("article", height);
        node.attrs.insert(TURN_ID_ATTR.to_owned(), id.to_owned());
        let node = self.alloc(node);
        self.order.push(node);
        node
    }

    /// Append a zero-height non-turn element.
    pub fn push_other(&mut self, tag: &str) -> NodeId {
        let node = self.alloc(Node::new(tag, 0.0));
        self.order.push(node);
        node
    }

    /// Host-side removal of a node (a re-render dropping it).
    pub fn remove_node(&mut self, id: NodeId) {
        self.detach(id);
    }

    /// Host-side teardown of the whole document, as on navigation.
    pub fn clear(&mut self) {
        for id in std::mem::take(&mut self.order) {
            self.nodes[id.0].removed = true;
        }
        self.scroll = 0.0;
    }

    /// Make `id` leave the document the next time it is measured.
    pub fn vanish_on_measure(&mut self, id: NodeId) {
        self.nodes[id.0].vanish_on_measure = true;
    }

    pub fn set_viewport_height(&mut self, height: f64) {
        self.viewport_height = height;
    }

    /// Set the scroll offset as the user would; not counted as a scroll call.
    pub fn set_scroll_offset(&mut self, offset: f64) {
        self.scroll = offset;
    }

    #[must_use]
    pub fn scroll_offset(&self) -> f64 {
        self.scroll
    }

    /// Position of `id` in document order, if attached.
    #[must_use]
    pub fn index_of(&self, id: NodeId) -> Option<usize> {
        self.order.iter().position(|&n| n == id)
    }

    #[must_use]
    pub fn text(&self, id: NodeId) -> String {
        self.node(id).text.clone()
    }

    #[must_use]
    pub fn is_display_none(&self, id: NodeId) -> bool {
        self.node(id).display_none
    }

    fn turn_nodes(&self) -> Vec<NodeId> {
        self.order
            .iter()
            .copied()
            .filter(|&id| self.node(id).attrs.contains_key(TURN_ID_ATTR))
            .collect()
    }

    /// Ids of every attached turn, in document order.
    #[must_use]
    pub fn turn_ids(&self) -> Vec<String> {
        self.turn_nodes()
            .into_iter()
            .filter_map(|id| self.node(id).attrs.get(TURN_ID_ATTR).cloned())
            .collect()
    }

    /// Whether the `index`-th attached turn is out of layout.
    #[must_use]
    pub fn turn_is_display_none(&self, index: usize) -> bool {
        self.turn_nodes()
            .get(index)
            .is_some_and(|&id| self.node(id).display_none)
    }

    /// Turn indices (document order) carrying the hidden flag.
    #[must_use]
    pub fn hidden_indices(&self) -> Vec<usize> {
        self.turn_nodes()
            .into_iter()
            .enumerate()
            .filter(|(_, id)| {
                self.node(*id).attrs.get(HIDDEN_ATTR).map(String::as_str) == Some("true")
            })
            .map(|(index, _)| index)
            .collect()
    }

    /// Every attached marker, in document order.
    #[must_use]
    pub fn placeholder_ids(&self) -> Vec<NodeId> {
        self.order
            .iter()
            .copied()
            .filter(|&id| self.node(id).has_class(PLACEHOLDER_CLASS))
            .collect()
    }

    #[must_use]
    pub fn placeholder(&self) -> Option<NodeId> {
        self.placeholder_ids().first().copied()
    }

    /// Bottom edge of `id` in document coordinates.
    #[must_use]
    pub fn bottom_of(&self, id: NodeId) -> Option<f64> {
        let position = self.index_of(id)?;
        Some(
            self.order[..=position]
                .iter()
                .map(|&n| self.node(n))
                .filter(|node| !node.display_none)
                .map(|node| node.height)
                .sum(),
        )
    }

    /// Total height of the displayed document.
    #[must_use]
    pub fn document_height(&self) -> f64 {
        self.order
            .iter()
            .map(|&n| self.node(n))
            .filter(|node| !node.display_none)
            .map(|node| node.height)
            .sum()
    }

    #[must_use]
    pub fn watched(&self) -> Option<NodeId> {
        self.watched.map(|(id, _)| id)
    }

    #[must_use]
    pub fn watch_margin(&self) -> Option<f64> {
        self.watched.map(|(_, margin)| margin)
    }

    #[must_use]
    pub fn watch_calls(&self) -> usize {
        self.watch_calls
    }

    #[must_use]
    pub fn unwatch_calls(&self) -> usize {
        self.unwatch_calls
    }

    /// Scrolls issued through [`HostPage`].
    #[must_use]
    pub fn scroll_calls(&self) -> usize {
        self.scroll_calls
    }

    /// Document writes issued through [`HostPage`].
    #[must_use]
    pub fn mutation_count(&self) -> usize {
        self.mutations
    }

    fn detach(&mut self, id: NodeId) -> bool {
        let Some(position) = self.index_of(id) else {
            return false;
        };
        self.order.remove(position);
        self.nodes[id.0].removed = true;
        if self.watched() == Some(id) {
            // A detached target never intersects again.
            self.watched = None;
        }
        true
    }
}

impl HostPage for MemoryPage {
    type Element = NodeId;

    fn query_all(&self, selector: Selector) -> Vec<NodeId> {
        self.order
            .iter()
            .copied()
            .filter(|&id| self.node(id).matches(selector))
            .collect()
    }

    fn attribute(&self, element: &NodeId, name: &str) -> Option<String> {
        self.nodes.get(element.0)?.attrs.get(name).cloned()
    }

    fn set_attribute(&mut self, element: &NodeId, name: &str, value: &str) {
        if let Some(node) = self.live_node_mut(*element) {
            node.attrs.insert(name.to_owned(), value.to_owned());
            self.mutations += 1;
        }
    }

    fn remove_attribute(&mut self, element: &NodeId, name: &str) {
        if let Some(node) = self.live_node_mut(*element) {
            node.attrs.remove(name);
            self.mutations += 1;
        }
    }

    fn set_display_none(&mut self, element: &NodeId, hidden: bool) {
        if let Some(node) = self.live_node_mut(*element) {
            node.display_none = hidden;
            self.mutations += 1;
        }
    }

    fn is_connected(&self, element: &NodeId) -> bool {
        self.index_of(*element).is_some()
    }

    fn measure_height(&mut self, element: &NodeId) -> Option<f64> {
        self.index_of(*element)?;
        if self.node(*element).vanish_on_measure {
            self.detach(*element);
            return None;
        }
        Some(self.node(*element).height)
    }

    fn viewport_height(&self) -> f64 {
        self.viewport_height
    }

    fn scroll_offset(&self) -> f64 {
        self.scroll
    }

    fn scroll_to(&mut self, offset: f64) {
        self.scroll = offset.max(0.0);
        self.scroll_calls += 1;
    }

    fn scroll_bottom_into_view(&mut self, element: &NodeId) {
        if let Some(bottom) = self.bottom_of(*element) {
            self.scroll = (bottom - self.viewport_height).max(0.0);
            self.scroll_calls += 1;
        }
    }

    fn create_marker(&mut self, class: &str) -> Option<NodeId> {
        let mut node = Node::new("div", MARKER_HEIGHT);
        node.attrs.insert("class".to_owned(), class.to_owned());
        Some(self.alloc(node))
    }

    fn set_text(&mut self, element: &NodeId, text: &str) {
        if let Some(node) = self.live_node_mut(*element) {
            node.text = text.to_owned();
            self.mutations += 1;
        }
    }

    fn insert_before(&mut self, element: &NodeId, reference: &NodeId) -> bool {
        if element == reference || self.node(*element).removed {
            return false;
        }
        if let Some(position) = self.index_of(*element) {
            self.order.remove(position);
        }
        let Some(target) = self.index_of(*reference) else {
            return false;
        };
        self.order.insert(target, *element);
        self.mutations += 1;
        true
    }

    fn remove(&mut self, element: &NodeId) {
        if self.detach(*element) {
            self.mutations += 1;
        }
    }
}

impl ProximitySensor for MemoryPage {
    fn watch(&mut self, target: &NodeId, top_margin_px: f64) {
        self.watched = Some((*target, top_margin_px));
        self.watch_calls += 1;
    }

    fn unwatch(&mut self) {
        self.watched = None;
        self.unwatch_calls += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_skips_hidden_nodes() {
        let mut page = MemoryPage::with_turns(3, 100.0);
        let turns = page.query_all(crate::ledger::TURN_SELECTOR);
        page.set_display_none(&turns[0], true);
        assert_eq!(page.bottom_of(turns[2]), Some(200.0));
        assert_eq!(page.document_height(), 200.0);
    }

    #[test]
    fn writes_to_removed_nodes_are_ignored() {
        let mut page = MemoryPage::with_turns(2, 100.0);
        let turns = page.query_all(crate::ledger::TURN_SELECTOR);
        page.remove_node(turns[0]);
        let before = page.mutation_count();
        page.set_attribute(&turns[0], "x", "y");
        page.set_display_none(&turns[0], true);
        assert_eq!(page.mutation_count(), before);
        assert_eq!(page.measure_height(&turns[0]), None);
    }

    #[test]
    fn detached_marker_accepts_writes_before_insertion() {
        let mut page = MemoryPage::with_turns(1, 100.0);
        let marker = page.create_marker("m").expect("marker");
        page.set_text(&marker, "hello");
        assert!(!page.is_connected(&marker));
        let first = page.query_all(crate::ledger::TURN_SELECTOR)[0];
        assert!(page.insert_before(&marker, &first));
        assert_eq!(page.index_of(marker), Some(0));
        assert_eq!(page.text(marker), "hello");
    }
}
