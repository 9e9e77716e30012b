//! Structural edits that keep a range synchronized.
//!
//! Each edit takes an optional [`Range`]. When one is given, its boundary
//! points are rewritten as part of the edit so that they keep delimiting the
//! same content; callers never observe a range that is stale with respect
//! to the tree.

use crate::boundary::{BoundaryPoint, Range, boundary_point_from_cursor, cursor_from_boundary_point};
use crate::error::{EngineError, Result};
use crate::tree::{Document, NodeId};

/// Put `wrapper` in `node`'s position and make `node` its last child.
///
/// `wrapper` must be a detached element. Boundary points need no
/// adjustment: `node`'s parent keeps the same number of children and
/// `node` keeps its identity.
pub fn wrap(
    doc: &mut Document,
    node: NodeId,
    wrapper: NodeId,
    _range: Option<&mut Range>,
) -> Result<()> {
    let parent = doc
        .parent(node)
        .ok_or_else(|| EngineError::precondition(format!("cannot wrap parentless {node}")))?;
    if !doc.is_element(wrapper) || doc.parent(wrapper).is_some() {
        return Err(EngineError::precondition(format!(
            "wrapper {wrapper} must be a detached element"
        )));
    }
    doc.replace_child(parent, wrapper, node)?;
    doc.append_child(wrapper, node)?;
    log::trace!("wrapped {node} in {wrapper}");
    Ok(())
}

/// Remove `container`, splicing its children into its former position.
///
/// A boundary inside `container` moves to the parent at the matching index;
/// a boundary in the parent after `container` shifts by the number of
/// spliced children minus the removed container.
pub fn shallow_unwrap(
    doc: &mut Document,
    container: NodeId,
    range: Option<&mut Range>,
) -> Result<()> {
    let parent = doc.parent(container).ok_or_else(|| {
        EngineError::precondition(format!("cannot unwrap parentless {container}"))
    })?;
    if !doc.is_element(container) {
        return Err(EngineError::precondition(format!(
            "cannot unwrap text leaf {container}"
        )));
    }
    let index = doc.index_of(container).unwrap_or(0);
    let count = doc.child_count(container);

    let adjust = |point: BoundaryPoint| -> BoundaryPoint {
        if point.node == container {
            BoundaryPoint::new(parent, index + point.offset)
        } else if point.node == parent && point.offset > index {
            BoundaryPoint::new(parent, point.offset + count - 1)
        } else {
            point
        }
    };

    if let Some(first) = doc.first_child(container) {
        move_siblings_before(doc, parent, first, Some(container), None)?;
    }
    doc.remove_child(parent, container)?;

    if let Some(range) = range {
        let start = adjust(range.start());
        let end = adjust(range.end());
        range.set_start(start.node, start.offset);
        range.set_end(end.node, end.offset);
    }
    log::trace!("unwrapped {container} ({count} children)");
    Ok(())
}

/// Move `first_child` and every sibling following it into `parent`, just
/// before `reference` (or at the end), keeping their order.
///
/// Container-relative boundaries of `range` are pinned to the node they
/// point at and follow it; text-relative boundaries are unaffected.
pub fn move_siblings_before(
    doc: &mut Document,
    parent: NodeId,
    first_child: NodeId,
    reference: Option<NodeId>,
    range: Option<&mut Range>,
) -> Result<()> {
    if let Some(reference) = reference
        && doc.parent(reference) != Some(parent)
    {
        return Err(EngineError::precondition(format!(
            "reference {reference} is not a child of {parent}"
        )));
    }
    let source = doc.parent(first_child).ok_or_else(|| {
        EngineError::precondition(format!("{first_child} has no siblings to move"))
    })?;
    let start = doc.index_of(first_child).unwrap_or(0);
    let moving = doc.children(source)[start..].to_vec();
    if reference.is_some_and(|r| moving.contains(&r)) {
        return Err(EngineError::precondition(format!(
            "reference {} is among the moved siblings",
            reference.map(|r| r.to_string()).unwrap_or_default()
        )));
    }

    let pinned = match &range {
        Some(range) => Some([range.start(), range.end()].map(|p| {
            doc.is_element(p.node)
                .then(|| cursor_from_boundary_point(doc, p.node, p.offset))
        })),
        None => None,
    };

    for child in moving {
        doc.insert_before(parent, child, reference)?;
    }

    if let (Some(range), Some([start, end])) = (range, pinned) {
        if let Some(cursor) = start {
            let point = boundary_point_from_cursor(doc, cursor)?;
            range.set_start(point.node, point.offset);
        }
        if let Some(cursor) = end {
            let point = boundary_point_from_cursor(doc, cursor)?;
            range.set_end(point.node, point.offset);
        }
    }
    Ok(())
}
