//! Splitting text leaves so that range boundaries sit between nodes.

use crate::boundary::{BoundaryPoint, Range};
use crate::error::{EngineError, Result};
use crate::tree::{Document, NodeId};

/// Split the text leaf `node` at char `offset`.
///
/// For `0 < offset < len` the leaf is replaced in its parent by two new
/// leaves and the first one is returned. At the edges (and for elements)
/// nothing changes and `node` itself is returned, so an empty leaf is never
/// created.
pub fn split_text_at(doc: &mut Document, node: NodeId, offset: usize) -> Result<NodeId> {
    let Some(text) = doc.text(node) else {
        return Ok(node);
    };
    let len = text.chars().count();
    if offset > len {
        return Err(EngineError::precondition(format!(
            "split offset {offset} past end of {node} (len {len})"
        )));
    }
    if offset == 0 || offset == len {
        return Ok(node);
    }
    let parent = doc
        .parent(node)
        .ok_or_else(|| EngineError::precondition(format!("cannot split detached leaf {node}")))?;

    let at = text
        .char_indices()
        .nth(offset)
        .map_or(text.len(), |(byte, _)| byte);
    let (head, tail) = text.split_at(at);
    let (head, tail) = (head.to_string(), tail.to_string());

    let before = doc.create_text(head);
    let after = doc.create_text(tail);
    doc.insert_before(parent, before, Some(node))?;
    doc.insert_before(parent, after, Some(node))?;
    doc.remove_child(parent, node)?;
    log::trace!("split {node} at {offset} into {before} and {after}");
    Ok(before)
}

/// Translate a boundary point that referenced `split_node` after the split
/// produced `before` (and possibly its following sibling).
fn adjust_after_split(
    doc: &Document,
    point: BoundaryPoint,
    split_node: NodeId,
    before: NodeId,
) -> Result<BoundaryPoint> {
    if point.node != split_node {
        return Ok(point);
    }
    let before_len = doc.text_len(before);
    let in_parent = |delta: usize| -> Result<BoundaryPoint> {
        let parent = doc.parent(before).ok_or_else(|| {
            EngineError::precondition(format!("split leaf {before} has no parent"))
        })?;
        let index = doc.index_of(before).unwrap_or(0);
        Ok(BoundaryPoint::new(parent, index + delta))
    };
    if point.offset == 0 {
        in_parent(0)
    } else if point.offset < before_len {
        Ok(BoundaryPoint::new(before, point.offset))
    } else if point.offset == before_len {
        in_parent(1)
    } else {
        let after = doc.next_sibling(before).ok_or_else(|| {
            EngineError::precondition(format!("split leaf {before} lost its second half"))
        })?;
        Ok(BoundaryPoint::new(after, point.offset - before_len))
    }
}

/// A point in the split leaf's parent after the leaf now has one more
/// sibling ahead of it.
fn shift_in_parent(point: BoundaryPoint, parent: NodeId, index: usize) -> BoundaryPoint {
    if point.node == parent && point.offset > index {
        BoundaryPoint::new(parent, point.offset + 1)
    } else {
        point
    }
}

/// Split the text leaf `node` at `offset` and rewrite both boundaries of
/// `range` so they keep delimiting the same content. Elements are left alone.
pub fn split_text_adjusting(
    doc: &mut Document,
    range: &mut Range,
    node: NodeId,
    offset: usize,
) -> Result<()> {
    if !doc.is_text(node) {
        return Ok(());
    }
    let slot = doc.parent(node).zip(doc.index_of(node));
    let before = split_text_at(doc, node, offset)?;
    let (mut start, mut end) = (range.start(), range.end());
    if let Some((parent, index)) = slot.filter(|_| before != node) {
        start = shift_in_parent(start, parent, index);
        end = shift_in_parent(end, parent, index);
    }
    let start = adjust_after_split(doc, start, node, before)?;
    let end = adjust_after_split(doc, end, node, before)?;
    range.set_start(start.node, start.offset);
    range.set_end(end.node, end.offset);
    Ok(())
}

/// Split the text leaves holding either boundary of `range` so that both
/// boundaries become container-relative. Idempotent.
pub fn normalize_range_boundaries(doc: &mut Document, range: &mut Range) -> Result<()> {
    let start = range.start();
    split_text_adjusting(doc, range, start.node, start.offset)?;
    // The end may have moved into a fresh leaf.
    let end = range.end();
    split_text_adjusting(doc, range, end.node, end.offset)
}
