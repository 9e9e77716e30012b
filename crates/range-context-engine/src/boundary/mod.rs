//! # Boundary Model
//!
//! Positions in the tree come in two shapes:
//!
//! - a [`BoundaryPoint`]: a container plus an offset, where the offset is a
//!   child index for elements and a char index for text leaves;
//! - a [`Cursor`]: a node plus an `at_end` flag. `at_end == false` means
//!   "immediately before `node`", `at_end == true` means "immediately after
//!   the last child of `node`".
//!
//! Cursors can name every position between nodes by node identity alone,
//! which is what makes them stable across wraps and moves. A pair of
//! boundary points forms a [`Range`], the caller-owned value that the engine
//! rewrites in place while it edits the tree.

mod split;

pub use split::{normalize_range_boundaries, split_text_adjusting, split_text_at};

use std::cmp::Ordering;

use crate::error::{EngineError, Result};
use crate::tree::{Document, NodeId};

/// A (container, offset) position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoundaryPoint {
    pub node: NodeId,
    pub offset: usize,
}

impl BoundaryPoint {
    pub fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }

    /// Checks that the offset addresses a position inside `node`.
    pub fn validate(&self, doc: &Document) -> Result<()> {
        let max = if doc.is_text(self.node) {
            doc.text_len(self.node)
        } else {
            doc.child_count(self.node)
        };
        if self.offset > max {
            return Err(EngineError::precondition(format!(
                "offset {} out of bounds for {} (max {max})",
                self.offset, self.node
            )));
        }
        Ok(())
    }

    /// True if the point sits between sibling nodes rather than inside text.
    pub fn is_between_nodes(&self, doc: &Document) -> bool {
        doc.is_element(self.node)
    }
}

/// True if `offset` places the position after the last addressable position
/// of `node`: past the last child of an element, or at the end of a text
/// leaf that has no following sibling.
pub fn is_at_end(doc: &Document, node: NodeId, offset: usize) -> bool {
    if doc.is_element(node) {
        offset >= doc.child_count(node)
    } else {
        offset == doc.text_len(node) && doc.next_sibling(node).is_none()
    }
}

/// The node actually referenced by `(node, offset)`.
///
/// For an element this is the child at `offset` (or the element itself past
/// its last child). For a text leaf at its end offset this is the following
/// sibling, or the parent if there is none. Any other text offset references
/// the leaf itself.
pub fn position_at(doc: &Document, node: NodeId, offset: usize) -> NodeId {
    if doc.is_element(node) {
        doc.child(node, offset).unwrap_or(node)
    } else if offset == doc.text_len(node) {
        doc.next_sibling(node)
            .or_else(|| doc.parent(node))
            .unwrap_or(node)
    } else {
        node
    }
}

/// A position between nodes, identified by node identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub node: NodeId,
    pub at_end: bool,
}

impl Cursor {
    pub fn new(node: NodeId, at_end: bool) -> Self {
        Self { node, at_end }
    }

    /// Step to the next position in document order. Element start and end
    /// positions are both visited. Returns `false` (leaving the cursor
    /// untouched) once the end of the root has been reached.
    pub fn next(&mut self, doc: &Document) -> bool {
        let (node, at_end) = if self.at_end {
            match doc.next_sibling(self.node) {
                Some(next) => (next, false),
                None => match doc.parent(self.node) {
                    Some(parent) => (parent, true),
                    None => return false,
                },
            }
        } else {
            match doc.first_child(self.node) {
                Some(first) => (first, false),
                None => (self.node, true),
            }
        };
        self.node = node;
        self.at_end = at_end;
        true
    }

    /// Insert `node` at this position.
    pub fn insert(&self, doc: &mut Document, node: NodeId) -> Result<()> {
        if self.at_end {
            return doc.append_child(self.node, node);
        }
        let parent = doc.parent(self.node).ok_or_else(|| {
            EngineError::precondition(format!("cannot insert before root {}", self.node))
        })?;
        doc.insert_before(parent, node, Some(self.node))
    }
}

/// Cursor for `(node, offset)`. The offset inside a text leaf is ignored
/// unless it is the end offset; callers split text first.
pub fn cursor_from_boundary_point(doc: &Document, node: NodeId, offset: usize) -> Cursor {
    Cursor::new(position_at(doc, node, offset), is_at_end(doc, node, offset))
}

/// Container-relative boundary point for a cursor.
pub fn boundary_point_from_cursor(doc: &Document, cursor: Cursor) -> Result<BoundaryPoint> {
    if cursor.at_end && doc.is_element(cursor.node) {
        return Ok(BoundaryPoint::new(cursor.node, doc.child_count(cursor.node)));
    }
    let parent = doc.parent(cursor.node).ok_or_else(|| {
        EngineError::precondition(format!("no position around root {}", cursor.node))
    })?;
    let index = doc.index_of(cursor.node).unwrap_or(0);
    // A text leaf "at end" is the position right after it.
    let offset = if cursor.at_end { index + 1 } else { index };
    Ok(BoundaryPoint::new(parent, offset))
}

/// An ordered pair of boundary points, `start <= end` in document order.
///
/// The engine takes ranges by `&mut` and rewrites both points after every
/// structural edit so that they keep delimiting the same content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    start: BoundaryPoint,
    end: BoundaryPoint,
}

impl Range {
    pub fn new(doc: &Document, start: BoundaryPoint, end: BoundaryPoint) -> Result<Self> {
        start.validate(doc)?;
        end.validate(doc)?;
        if doc.compare_points(start.node, start.offset, end.node, end.offset)?
            == Ordering::Greater
        {
            return Err(EngineError::precondition("range start is after its end"));
        }
        Ok(Self { start, end })
    }

    pub fn collapsed_at(point: BoundaryPoint) -> Self {
        Self {
            start: point,
            end: point,
        }
    }

    pub fn start(&self) -> BoundaryPoint {
        self.start
    }

    pub fn end(&self) -> BoundaryPoint {
        self.end
    }

    pub fn set_start(&mut self, node: NodeId, offset: usize) {
        self.start = BoundaryPoint::new(node, offset);
    }

    pub fn set_end(&mut self, node: NodeId, offset: usize) {
        self.end = BoundaryPoint::new(node, offset);
    }

    pub fn collapsed(&self) -> bool {
        self.start == self.end
    }

    /// Deepest node containing both boundary points.
    pub fn common_ancestor_container(&self, doc: &Document) -> Result<NodeId> {
        let mut candidate = Some(self.start.node);
        while let Some(node) = candidate {
            if doc.is_inclusive_ancestor(node, self.end.node) {
                return Ok(node);
            }
            candidate = doc.parent(node);
        }
        Err(EngineError::precondition(
            "range boundaries are not in the same tree",
        ))
    }

    /// True if `node` is entirely inside the range.
    pub fn contains_node(&self, doc: &Document, node: NodeId) -> Result<bool> {
        let (Some(parent), Some(index)) = (doc.parent(node), doc.index_of(node)) else {
            return Ok(false);
        };
        let starts_after = doc.compare_points(
            parent,
            index,
            self.start.node,
            self.start.offset,
        )? != Ordering::Less;
        let ends_before =
            doc.compare_points(parent, index + 1, self.end.node, self.end.offset)?
                != Ordering::Greater;
        Ok(starts_after && ends_before)
    }
}
