//! Walking the two boundary paths of a normalized range.
//!
//! Below the common ancestor container (cac) the range cuts through a chain
//! of partially contained nodes on each side. At every level of those chains,
//! and at the cac itself, each child is either entirely outside the range,
//! entirely inside it, or the next partially contained node on a path.

use crate::ancestors::path_from_incl_to_boundary;
use crate::boundary::Range;
use crate::context::ContextPolicy;
use crate::error::{EngineError, Result};
use crate::tree::{Document, NodeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Side {
    Outside,
    Inside,
    Path,
}

#[derive(Debug, Clone)]
struct Level {
    node: NodeId,
    children: Vec<(NodeId, Side)>,
}

/// Classification of every child along both boundary paths, computed by
/// node identity before anything is mutated.
#[derive(Debug, Clone)]
pub(crate) struct WalkPlan {
    cac: NodeId,
    levels: Vec<Level>,
}

/// What to do with the nodes met during a walk.
pub(crate) trait LevelWalk {
    /// State handed down from a level to the levels below it.
    type Carry: Clone;

    /// Entering a partially contained node below the cac.
    fn enter(&mut self, doc: &Document, node: NodeId, carry: &Self::Carry) -> Self::Carry;

    fn outside(
        &mut self,
        doc: &mut Document,
        range: &mut Range,
        node: NodeId,
        carry: &Self::Carry,
    ) -> Result<()>;

    fn inside(
        &mut self,
        doc: &mut Document,
        range: &mut Range,
        node: NodeId,
        carry: &Self::Carry,
    ) -> Result<()>;

    /// Leaving a partially contained node, after all its children.
    fn leave(&mut self, doc: &mut Document, range: &mut Range, node: NodeId) -> Result<()>;
}

impl WalkPlan {
    /// Plan the walk for a range whose boundaries sit between nodes.
    pub(crate) fn build(doc: &Document, range: &Range, cac: NodeId) -> Result<Self> {
        let (start, end) = (range.start(), range.end());
        if !start.is_between_nodes(doc) || !end.is_between_nodes(doc) {
            return Err(EngineError::precondition(
                "range boundaries must be normalized before walking",
            ));
        }
        let chain = |node: NodeId| -> Vec<NodeId> {
            if node == cac {
                Vec::new()
            } else {
                path_from_incl_to_boundary(doc, node, |_, n| n == cac)
            }
        };
        let start_chain = chain(start.node);
        let end_chain = chain(end.node);
        let index = |node: NodeId| doc.index_of(node).unwrap_or(0);

        let start_split = start_chain.last().map_or(start.offset, |&n| index(n) + 1);
        let end_split = end_chain.last().map_or(end.offset, |&n| index(n));
        if start_split > end_split {
            return Err(EngineError::precondition(format!(
                "range start is after its end below {cac}"
            )));
        }

        let mut levels = Vec::with_capacity(1 + start_chain.len() + end_chain.len());
        let top_paths = [start_chain.last().copied(), end_chain.last().copied()];
        levels.push(Level {
            node: cac,
            children: doc
                .children(cac)
                .iter()
                .enumerate()
                .map(|(i, &c)| {
                    let side = if top_paths.contains(&Some(c)) {
                        Side::Path
                    } else if (start_split..end_split).contains(&i) {
                        Side::Inside
                    } else {
                        Side::Outside
                    };
                    (c, side)
                })
                .collect(),
        });

        for (k, &node) in start_chain.iter().enumerate() {
            let lower = k.checked_sub(1).map(|j| start_chain[j]);
            let split = lower.map_or(start.offset, |l| index(l) + 1);
            levels.push(Level {
                node,
                children: classify_children(doc, node, lower, |i| i >= split),
            });
        }
        for (k, &node) in end_chain.iter().enumerate() {
            let lower = k.checked_sub(1).map(|j| end_chain[j]);
            let split = lower.map_or(end.offset, index);
            levels.push(Level {
                node,
                children: classify_children(doc, node, lower, |i| i < split),
            });
        }
        Ok(Self { cac, levels })
    }

    fn level(&self, node: NodeId) -> Option<&Level> {
        self.levels.iter().find(|l| l.node == node)
    }

    /// Nodes entirely inside the range with no ancestor that is, in
    /// document order.
    pub(crate) fn top_level_contained(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_contained(self.cac, &mut out);
        out
    }

    fn collect_contained(&self, node: NodeId, out: &mut Vec<NodeId>) {
        let Some(level) = self.level(node) else {
            return;
        };
        for &(child, side) in &level.children {
            match side {
                Side::Inside => out.push(child),
                Side::Path => self.collect_contained(child, out),
                Side::Outside => {}
            }
        }
    }

    /// Run `walk` over the plan, starting at the cac with `carry`.
    pub(crate) fn execute<W: LevelWalk>(
        &self,
        doc: &mut Document,
        range: &mut Range,
        walk: &mut W,
        carry: W::Carry,
    ) -> Result<()> {
        self.execute_level(doc, range, walk, self.cac, &carry)
    }

    fn execute_level<W: LevelWalk>(
        &self,
        doc: &mut Document,
        range: &mut Range,
        walk: &mut W,
        node: NodeId,
        carry: &W::Carry,
    ) -> Result<()> {
        let Some(level) = self.level(node) else {
            return Ok(());
        };
        for &(child, side) in &level.children {
            match side {
                Side::Outside => walk.outside(doc, range, child, carry)?,
                Side::Inside => walk.inside(doc, range, child, carry)?,
                Side::Path => {
                    let below = walk.enter(doc, child, carry);
                    self.execute_level(doc, range, walk, child, &below)?;
                    walk.leave(doc, range, child)?;
                }
            }
        }
        Ok(())
    }
}

fn classify_children<F>(
    doc: &Document,
    node: NodeId,
    lower: Option<NodeId>,
    inside: F,
) -> Vec<(NodeId, Side)>
where
    F: Fn(usize) -> bool,
{
    doc.children(node)
        .iter()
        .enumerate()
        .map(|(i, &c)| {
            let side = if Some(c) == lower {
                Side::Path
            } else if inside(i) {
                Side::Inside
            } else {
                Side::Outside
            };
            (c, side)
        })
        .collect()
}

/// Pushes the inherited override onto the flanks, clears overrides inside
/// the range and shallowly on every partially contained node.
pub(crate) struct OverrideWalk<'p, P: ContextPolicy> {
    policy: &'p P,
}

impl<'p, P: ContextPolicy> OverrideWalk<'p, P> {
    pub(crate) fn new(policy: &'p P) -> Self {
        Self { policy }
    }
}

impl<P: ContextPolicy> LevelWalk for OverrideWalk<'_, P> {
    type Carry = Option<P::Override>;

    fn enter(&mut self, doc: &Document, node: NodeId, carry: &Self::Carry) -> Self::Carry {
        self.policy.get_override(doc, node).or_else(|| carry.clone())
    }

    fn outside(
        &mut self,
        doc: &mut Document,
        range: &mut Range,
        node: NodeId,
        carry: &Self::Carry,
    ) -> Result<()> {
        match carry {
            Some(override_) => self.policy.push_down_override(doc, range, node, override_),
            None => Ok(()),
        }
    }

    fn inside(
        &mut self,
        doc: &mut Document,
        range: &mut Range,
        node: NodeId,
        _carry: &Self::Carry,
    ) -> Result<()> {
        self.policy.clear_override_rec(doc, range, node)
    }

    fn leave(&mut self, doc: &mut Document, range: &mut Range, node: NodeId) -> Result<()> {
        self.policy.clear_override(doc, range, node)
    }
}

/// Sets the context on top-level contained nodes. The carry records whether
/// a partially contained ancestor already provides the context, in which
/// case contained nodes only have their overrides cleared.
pub(crate) struct FreshContextWalk<'p, P: ContextPolicy> {
    policy: &'p P,
}

impl<'p, P: ContextPolicy> FreshContextWalk<'p, P> {
    pub(crate) fn new(policy: &'p P) -> Self {
        Self { policy }
    }
}

impl<P: ContextPolicy> LevelWalk for FreshContextWalk<'_, P> {
    type Carry = bool;

    fn enter(&mut self, doc: &Document, node: NodeId, covered: &bool) -> bool {
        *covered || self.policy.is_context(doc, node)
    }

    fn outside(&mut self, _: &mut Document, _: &mut Range, _: NodeId, _: &bool) -> Result<()> {
        Ok(())
    }

    fn inside(
        &mut self,
        doc: &mut Document,
        range: &mut Range,
        node: NodeId,
        covered: &bool,
    ) -> Result<()> {
        if *covered {
            // Already in context; only overrides nested inside need to go.
            return self.policy.clear_override_rec(doc, range, node);
        }
        self.policy.set_context(doc, range, node)
    }

    fn leave(&mut self, _: &mut Document, _: &mut Range, _: NodeId) -> Result<()> {
        Ok(())
    }
}
