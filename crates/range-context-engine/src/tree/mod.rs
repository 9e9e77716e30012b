//! # Host Document Tree
//!
//! An arena of typed nodes addressed by [`NodeId`] handles. Containers are
//! elements with a name, attributes and an ordered list of children; leaves
//! carry text. Every node except a root has exactly one parent and siblings
//! are totally ordered.
//!
//! Handles stay valid for the lifetime of the [`Document`]: removing a node
//! only detaches it, so callers holding a handle to a node that was moved,
//! wrapped or unwrapped can keep using it. The boundary model and the tree
//! edits rely on that identity guarantee.
//!
//! Text offsets and lengths count `char`s, not bytes.

use std::cmp::Ordering;
use std::fmt;

use crate::error::{EngineError, Result};

/// Handle to a node inside a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a node is: a container element or a text leaf
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Element {
        name: String,
        attributes: Vec<(String, String)>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Arena holding every node ever created for one document.
#[derive(Debug, Clone, Default)]
pub struct Document {
    nodes: Vec<NodeData>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a detached element with no attributes.
    pub fn create_element(&mut self, name: impl Into<String>) -> NodeId {
        self.create_element_with_attributes(name, Vec::new())
    }

    pub fn create_element_with_attributes(
        &mut self,
        name: impl Into<String>,
        attributes: Vec<(String, String)>,
    ) -> NodeId {
        self.push(NodeKind::Element {
            name: name.into(),
            attributes,
        })
    }

    /// Create a detached text leaf.
    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeKind::Text(text.into()))
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0]
    }

    fn data_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id.0]
    }

    // Introspection

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.data(id).kind
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(self.data(id).kind, NodeKind::Text(_))
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.data(id).kind, NodeKind::Element { .. })
    }

    /// Element name, or `None` for text leaves.
    pub fn name(&self, id: NodeId) -> Option<&str> {
        match &self.data(id).kind {
            NodeKind::Element { name, .. } => Some(name),
            NodeKind::Text(_) => None,
        }
    }

    /// True if `id` is an element whose name equals `name` (ASCII case-insensitive).
    pub fn has_name(&self, id: NodeId, name: &str) -> bool {
        self.name(id).is_some_and(|n| n.eq_ignore_ascii_case(name))
    }

    pub fn attributes(&self, id: NodeId) -> &[(String, String)] {
        match &self.data(id).kind {
            NodeKind::Element { attributes, .. } => attributes,
            NodeKind::Text(_) => &[],
        }
    }

    /// Text of a leaf, or `None` for elements.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.data(id).kind {
            NodeKind::Text(text) => Some(text),
            NodeKind::Element { .. } => None,
        }
    }

    /// Length of a text leaf in chars (0 for elements).
    pub fn text_len(&self, id: NodeId) -> usize {
        self.text(id).map_or(0, |t| t.chars().count())
    }

    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) -> Result<()> {
        match &mut self.data_mut(id).kind {
            NodeKind::Text(t) => {
                *t = text.into();
                Ok(())
            }
            NodeKind::Element { .. } => Err(EngineError::precondition(format!(
                "set_text on element {id}"
            ))),
        }
    }

    /// Concatenated text of the subtree rooted at `id`.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match &self.data(id).kind {
            NodeKind::Text(t) => out.push_str(t),
            NodeKind::Element { .. } => {
                for &child in &self.data(id).children {
                    self.collect_text(child, out);
                }
            }
        }
    }

    // Navigation

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.data(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.data(id).children
    }

    pub fn child(&self, id: NodeId, index: usize) -> Option<NodeId> {
        self.data(id).children.get(index).copied()
    }

    pub fn child_count(&self, id: NodeId) -> usize {
        self.data(id).children.len()
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.child(id, 0)
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.data(id).children.last().copied()
    }

    /// Position of `id` among its siblings, `None` for a detached node.
    pub fn index_of(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_of(id)?;
        self.child(parent, index + 1)
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let index = self.index_of(id)?;
        index.checked_sub(1).and_then(|i| self.child(parent, i))
    }

    /// Topmost ancestor of `id` (the node itself when detached).
    pub fn root_of(&self, id: NodeId) -> NodeId {
        let mut node = id;
        while let Some(parent) = self.parent(node) {
            node = parent;
        }
        node
    }

    /// True if `ancestor` is `node` or one of its ancestors.
    pub fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if n == ancestor {
                return true;
            }
            current = self.parent(n);
        }
        false
    }

    /// Every node of the subtree rooted at `id`, children before parents.
    pub fn descendants_post_order(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.post_order_into(id, &mut out);
        out
    }

    fn post_order_into(&self, id: NodeId, out: &mut Vec<NodeId>) {
        for &child in &self.data(id).children {
            self.post_order_into(child, out);
        }
        out.push(id);
    }

    // Mutation

    /// Insert `child` into `parent` before `reference`, or at the end when
    /// `reference` is `None`. An attached `child` is moved.
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<()> {
        if !self.is_element(parent) {
            return Err(EngineError::precondition(format!(
                "cannot insert {child} into text leaf {parent}"
            )));
        }
        if self.is_inclusive_ancestor(child, parent) {
            return Err(EngineError::precondition(format!(
                "cannot insert {child} into its own subtree"
            )));
        }
        if let Some(reference) = reference
            && self.parent(reference) != Some(parent)
        {
            return Err(EngineError::precondition(format!(
                "reference {reference} is not a child of {parent}"
            )));
        }
        if reference == Some(child) {
            return Ok(());
        }
        self.detach(child);
        let index = match reference {
            Some(reference) => self
                .children(parent)
                .iter()
                .position(|&c| c == reference)
                .unwrap_or(self.child_count(parent)),
            None => self.child_count(parent),
        };
        self.data_mut(parent).children.insert(index, child);
        self.data_mut(child).parent = Some(parent);
        Ok(())
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.insert_before(parent, child, None)
    }

    /// Detach `child` from `parent`.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        if self.parent(child) != Some(parent) {
            return Err(EngineError::precondition(format!(
                "{child} is not a child of {parent}"
            )));
        }
        self.detach(child);
        Ok(())
    }

    /// Put `new_child` at `old_child`'s position and detach `old_child`.
    pub fn replace_child(
        &mut self,
        parent: NodeId,
        new_child: NodeId,
        old_child: NodeId,
    ) -> Result<()> {
        if new_child == old_child {
            return Ok(());
        }
        self.insert_before(parent, new_child, Some(old_child))?;
        self.remove_child(parent, old_child)
    }

    fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.data_mut(id).parent.take() {
            self.data_mut(parent).children.retain(|&c| c != id);
        }
    }

    // Ordering

    fn index_path(&self, id: NodeId) -> Vec<usize> {
        let mut path = Vec::new();
        let mut node = id;
        while let Some(index) = self.index_of(node) {
            path.push(index);
            node = self.parent(node).unwrap_or(node);
        }
        path.reverse();
        path
    }

    /// Compare two nodes in tree (pre-)order. Both must share a root.
    pub fn compare_nodes(&self, a: NodeId, b: NodeId) -> Result<Ordering> {
        if self.root_of(a) != self.root_of(b) {
            return Err(EngineError::precondition(format!(
                "{a} and {b} are not in the same tree"
            )));
        }
        Ok(self.index_path(a).cmp(&self.index_path(b)))
    }

    /// Compare boundary points `(a, a_offset)` and `(b, b_offset)` in
    /// document order.
    pub fn compare_points(
        &self,
        a: NodeId,
        a_offset: usize,
        b: NodeId,
        b_offset: usize,
    ) -> Result<Ordering> {
        if a == b {
            return Ok(a_offset.cmp(&b_offset));
        }
        if self.compare_nodes(a, b)? == Ordering::Greater {
            return Ok(self.compare_points(b, b_offset, a, a_offset)?.reverse());
        }
        if self.is_inclusive_ancestor(a, b) {
            let mut child = b;
            while let Some(parent) = self.parent(child)
                && parent != a
            {
                child = parent;
            }
            if self.index_of(child).is_some_and(|i| i < a_offset) {
                return Ok(Ordering::Greater);
            }
        }
        Ok(Ordering::Less)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paragraph() -> (Document, NodeId, NodeId, NodeId) {
        let mut doc = Document::new();
        let p = doc.create_element("p");
        let a = doc.create_text("ab");
        let b = doc.create_element("b");
        doc.append_child(p, a).unwrap();
        doc.append_child(p, b).unwrap();
        (doc, p, a, b)
    }

    #[test]
    fn siblings_and_indices() {
        let (doc, p, a, b) = paragraph();
        assert_eq!(doc.children(p), &[a, b]);
        assert_eq!(doc.index_of(b), Some(1));
        assert_eq!(doc.next_sibling(a), Some(b));
        assert_eq!(doc.previous_sibling(b), Some(a));
        assert_eq!(doc.previous_sibling(a), None);
        assert_eq!(doc.index_of(p), None);
    }

    #[test]
    fn insert_moves_attached_node() {
        let (mut doc, p, a, b) = paragraph();
        doc.append_child(b, a).unwrap();
        assert_eq!(doc.children(p), &[b]);
        assert_eq!(doc.parent(a), Some(b));
    }

    #[test]
    fn insert_into_own_subtree_is_rejected() {
        let (mut doc, p, _, b) = paragraph();
        let err = doc.append_child(b, p).unwrap_err();
        assert!(matches!(err, EngineError::PreconditionViolation(_)));
    }

    #[test]
    fn insert_into_text_is_rejected() {
        let (mut doc, _, a, b) = paragraph();
        assert!(doc.append_child(a, b).is_err());
    }

    #[test]
    fn replace_child_keeps_position() {
        let (mut doc, p, a, b) = paragraph();
        let i = doc.create_element("i");
        doc.replace_child(p, i, a).unwrap();
        assert_eq!(doc.children(p), &[i, b]);
        assert_eq!(doc.parent(a), None);
    }

    #[test]
    fn text_length_counts_chars() {
        let mut doc = Document::new();
        let t = doc.create_text("héllo");
        assert_eq!(doc.text_len(t), 5);
    }

    #[test]
    fn points_compare_in_document_order() {
        let (doc, p, a, b) = paragraph();
        assert_eq!(doc.compare_points(p, 0, p, 1).unwrap(), Ordering::Less);
        assert_eq!(doc.compare_points(a, 2, p, 1).unwrap(), Ordering::Less);
        assert_eq!(doc.compare_points(p, 1, a, 2).unwrap(), Ordering::Greater);
        assert_eq!(doc.compare_points(b, 0, p, 1).unwrap(), Ordering::Greater);
        assert_eq!(doc.compare_points(p, 2, b, 0).unwrap(), Ordering::Greater);
        assert_eq!(doc.compare_points(a, 1, a, 1).unwrap(), Ordering::Equal);
    }

    #[test]
    fn post_order_lists_children_first() {
        let (mut doc, p, a, b) = paragraph();
        let t = doc.create_text("x");
        doc.append_child(b, t).unwrap();
        assert_eq!(doc.descendants_post_order(p), vec![a, t, b, p]);
    }
}
