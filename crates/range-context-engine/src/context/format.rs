//! Element-name formatting on top of the engine.

use crate::boundary::Range;
use crate::context::{ContextPolicy, Strategy, apply_context, unwrap_nested};
use crate::edits::{shallow_unwrap, wrap};
use crate::error::{EngineError, Result};
use crate::tree::{Document, NodeId};

/// A [`ContextPolicy`] where the context is "inside an element named `tag`".
///
/// In remove mode the roles flip: an element named `tag` is the override and
/// every other node counts as providing the (negative) context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagFormatter {
    tag: String,
    unformat: bool,
    editing_host: Option<NodeId>,
}

impl TagFormatter {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            unformat: false,
            editing_host: None,
        }
    }

    pub fn removing(tag: impl Into<String>) -> Self {
        Self {
            unformat: true,
            ..Self::new(tag)
        }
    }

    /// Never mutate `host` or anything above it.
    pub fn with_editing_host(mut self, host: NodeId) -> Self {
        self.editing_host = Some(host);
        self
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    fn is_tag(&self, doc: &Document, node: NodeId) -> bool {
        doc.has_name(node, &self.tag)
    }

    fn is_empty_text(doc: &Document, node: NodeId) -> bool {
        doc.text(node).is_some_and(str::is_empty)
    }

    fn wrap_in_tag(&self, doc: &mut Document, range: &mut Range, node: NodeId) -> Result<()> {
        let wrapper = doc.create_element(self.tag.as_str());
        wrap(doc, node, wrapper, Some(range))
    }
}

impl ContextPolicy for TagFormatter {
    type Override = String;

    fn is_upper_boundary(&self, doc: &Document, node: NodeId) -> bool {
        doc.parent(node).is_none() || self.editing_host == Some(node)
    }

    fn get_override(&self, doc: &Document, node: NodeId) -> Option<String> {
        (self.unformat && self.is_tag(doc, node)).then(|| self.tag.clone())
    }

    fn clear_override(&self, doc: &mut Document, range: &mut Range, node: NodeId) -> Result<()> {
        if self.unformat && self.is_tag(doc, node) {
            shallow_unwrap(doc, node, Some(range))?;
        }
        Ok(())
    }

    fn push_down_override(
        &self,
        doc: &mut Document,
        range: &mut Range,
        node: NodeId,
        override_: &String,
    ) -> Result<()> {
        if !self.unformat {
            return Err(EngineError::contract(format!(
                "override <{override_}> pushed down while applying <{}>",
                self.tag
            )));
        }
        if doc.has_name(node, override_) || Self::is_empty_text(doc, node) {
            return Ok(());
        }
        let wrapper = doc.create_element(override_.as_str());
        wrap(doc, node, wrapper, Some(range))
    }

    fn is_context(&self, doc: &Document, node: NodeId) -> bool {
        self.is_tag(doc, node) != self.unformat
    }

    fn set_context(&self, doc: &mut Document, range: &mut Range, node: NodeId) -> Result<()> {
        if self.unformat {
            return self.clear_override_rec(doc, range, node);
        }
        unwrap_nested(doc, range, node, |d, n| d.has_name(n, &self.tag))?;
        if self.is_tag(doc, node) || Self::is_empty_text(doc, node) {
            return Ok(());
        }
        self.wrap_in_tag(doc, range, node)
    }
}

/// Make every character of `range` part of a `tag` element.
pub fn format(doc: &mut Document, range: &mut Range, tag: &str) -> Result<Strategy> {
    apply_context(doc, range, &TagFormatter::new(tag))
}

/// Remove every `tag` element from `range`, re-applying it outside.
pub fn unformat(doc: &mut Document, range: &mut Range, tag: &str) -> Result<Strategy> {
    apply_context(doc, range, &TagFormatter::removing(tag))
}
