//! # Range Context Engine
//!
//! Applies or removes an inline *context* (bold, italic, ...) over an
//! arbitrary range of a [`Document`] while keeping the range pointing at the
//! same content.
//!
//! ## Vocabulary
//!
//! - **Context**: the property being installed, e.g. "this subtree is bold".
//! - **Override**: a conflicting property already present on an ancestor or
//!   inside the range, e.g. a bold element when the goal is "not bold".
//! - **Push-down**: removing an override from an ancestor and re-applying it
//!   to the ancestor's children that lie outside the range, so only the range
//!   loses it.
//!
//! What counts as context or override is decided by the caller through a
//! [`ContextPolicy`]; the engine only decides how to walk the tree.
//!
//! ## Algorithm
//!
//! 1. A collapsed range is a no-op.
//! 2. Both boundaries are split out of text leaves
//!    ([`normalize_range_boundaries`]).
//! 3. The ancestors of the common ancestor container are classified once:
//!    the topmost override (and whether it sits at or above the upper
//!    boundary, which makes it non-clearable) and whether any ancestor
//!    already provides the context.
//! 4. Exactly one [`Strategy`] runs:
//!    - [`Strategy::PushDownOverride`]: clear the topmost override down to
//!      the common ancestor, push it onto the flanks at every level, and
//!      clear overrides inside the range;
//!    - [`Strategy::FreshContext`]: call `set_context` on every top-level
//!      contained node;
//!    - [`Strategy::Reuse`]: an ancestor provides the context already; only
//!      overrides found below the common ancestor are dealt with.
//!
//! ## The range is a shared cursor pair
//!
//! `apply_context` takes the range by `&mut` and threads the same reference
//! through every policy callback. Each structural edit rewrites the range
//! before returning (see [`crate::edits`]), so the range is valid between
//! any two callbacks. The walk itself is planned once by node identity right
//! after normalization; every edit preserves the identity of every node
//! except the container it unwraps, so the plan stays valid throughout.

mod format;
mod walk;

pub use format::{TagFormatter, format, unformat};

use crate::ancestors::path_from_incl_to_boundary_incl;
use crate::boundary::{Range, normalize_range_boundaries};
use crate::edits::shallow_unwrap;
use crate::error::{EngineError, Result};
use crate::tree::{Document, NodeId};

use walk::{FreshContextWalk, OverrideWalk, WalkPlan};

/// Caller policy describing what the context and its overrides are.
///
/// Mutating methods receive the document and the range being formatted and
/// must keep the range valid, which they get for free by using the edits in
/// [`crate::edits`] with `Some(range)`.
pub trait ContextPolicy {
    /// Marker for a conflicting context, re-applied by `push_down_override`.
    type Override: Clone;

    /// True for the node beyond which nothing may be mutated.
    fn is_upper_boundary(&self, doc: &Document, node: NodeId) -> bool {
        doc.parent(node).is_none()
    }

    fn get_override(&self, doc: &Document, node: NodeId) -> Option<Self::Override>;

    /// Strip the override from exactly this node.
    fn clear_override(&self, doc: &mut Document, range: &mut Range, node: NodeId) -> Result<()>;

    /// Strip the override from `node` and all its descendants.
    fn clear_override_rec(&self, doc: &mut Document, range: &mut Range, node: NodeId) -> Result<()> {
        for descendant in doc.descendants_post_order(node) {
            self.clear_override(doc, range, descendant)?;
        }
        Ok(())
    }

    /// Apply `override_` to `node` unless the node carries its own override.
    fn push_down_override(
        &self,
        doc: &mut Document,
        range: &mut Range,
        node: NodeId,
        override_: &Self::Override,
    ) -> Result<()>;

    /// True if `node` already provides the context.
    fn is_context(&self, doc: &Document, node: NodeId) -> bool;

    /// Install the context on `node`, clearing nested instances of it.
    fn set_context(&self, doc: &mut Document, range: &mut Range, node: NodeId) -> Result<()>;
}

/// The single structural action chosen for one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// The range held no content; nothing was touched.
    Collapsed,
    PushDownOverride,
    FreshContext,
    Reuse,
}

/// Outcome of the classification pass over the ancestors of the common
/// ancestor container.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Classification {
    topmost_override: Option<NodeId>,
    /// The topmost override sits at or above the upper boundary.
    non_clearable: bool,
    root_has_context: bool,
}

impl Classification {
    fn strategy(&self) -> Strategy {
        match self.topmost_override {
            Some(_) if !self.non_clearable => Strategy::PushDownOverride,
            _ if !self.root_has_context || self.non_clearable => Strategy::FreshContext,
            _ => Strategy::Reuse,
        }
    }
}

fn classify<P: ContextPolicy>(doc: &Document, policy: &P, cac: NodeId) -> Result<Classification> {
    let mut classification = Classification {
        topmost_override: None,
        non_clearable: false,
        root_has_context: false,
    };
    let mut beyond_upper_boundary = false;
    for node in path_from_incl_to_boundary_incl(doc, cac, |_, _| false) {
        beyond_upper_boundary = beyond_upper_boundary || policy.is_upper_boundary(doc, node);
        let has_override = policy.get_override(doc, node).is_some();
        let is_context = policy.is_context(doc, node);
        if has_override && is_context {
            return Err(EngineError::contract(format!(
                "{node} reported as both context and override"
            )));
        }
        if has_override {
            classification.topmost_override = Some(node);
            classification.non_clearable = beyond_upper_boundary;
        }
        if is_context {
            classification.root_has_context = true;
        }
    }
    Ok(classification)
}

/// Apply the policy's context to `range`, returning the strategy that ran.
///
/// On return the range delimits the same content as before, expressed
/// between nodes. On error the tree may be partially edited.
pub fn apply_context<P: ContextPolicy>(
    doc: &mut Document,
    range: &mut Range,
    policy: &P,
) -> Result<Strategy> {
    // Splitting text would be a visible edit for a no-op call.
    if range.collapsed() {
        return Ok(Strategy::Collapsed);
    }
    normalize_range_boundaries(doc, range)?;
    // `(text, len)` and `(parent, index + 1)` name the same place.
    if range.collapsed() {
        return Ok(Strategy::Collapsed);
    }

    let cac = range.common_ancestor_container(doc)?;
    let plan = WalkPlan::build(doc, range, cac)?;
    let contained = plan.top_level_contained();
    log::trace!("top-level contained: {contained:?}");
    // Boundaries in sibling subtrees, such as `<i>a{</i><u>}b</u>`.
    if contained.is_empty() {
        return Ok(Strategy::Collapsed);
    }

    let classification = classify(doc, policy, cac)?;
    let strategy = classification.strategy();
    log::debug!("range context at {cac}: {classification:?} -> {strategy:?}");

    match (strategy, classification.topmost_override) {
        (Strategy::PushDownOverride, Some(topmost)) => {
            let carry = push_down_above(doc, range, policy, cac, topmost)?;
            plan.execute(doc, range, &mut OverrideWalk::new(policy), carry)?;
        }
        (Strategy::FreshContext, _) => {
            plan.execute(doc, range, &mut FreshContextWalk::new(policy), false)?;
        }
        _ => {
            plan.execute(doc, range, &mut OverrideWalk::new(policy), None)?;
        }
    }
    Ok(strategy)
}

/// Clear overrides from `topmost` down to `cac`, pushing them onto the
/// siblings of the path at every level. Returns the override in effect at
/// `cac`, to be pushed onto the flanks of the range below it.
fn push_down_above<P: ContextPolicy>(
    doc: &mut Document,
    range: &mut Range,
    policy: &P,
    cac: NodeId,
    topmost: NodeId,
) -> Result<Option<P::Override>> {
    let path = path_from_incl_to_boundary_incl(doc, cac, |_, n| n == topmost);
    let mut carry: Option<P::Override> = None;
    for (i, &node) in path.iter().enumerate().rev() {
        if let Some(found) = policy.get_override(doc, node) {
            carry = Some(found);
        }
        if i > 0
            && let Some(override_) = carry.as_ref()
        {
            let next = path[i - 1];
            let flanks: Vec<NodeId> = doc
                .children(node)
                .iter()
                .copied()
                .filter(|&c| c != next)
                .collect();
            for flank in flanks {
                policy.push_down_override(doc, range, flank, override_)?;
            }
        }
        policy.clear_override(doc, range, node)?;
    }
    Ok(carry)
}

/// Unwrap every descendant of `node` (excluding `node`) matching `matches`.
pub(crate) fn unwrap_nested<F>(
    doc: &mut Document,
    range: &mut Range,
    node: NodeId,
    matches: F,
) -> Result<()>
where
    F: Fn(&Document, NodeId) -> bool,
{
    for descendant in doc.descendants_post_order(node) {
        if descendant != node && matches(doc, descendant) {
            shallow_unwrap(doc, descendant, Some(range))?;
        }
    }
    Ok(())
}
