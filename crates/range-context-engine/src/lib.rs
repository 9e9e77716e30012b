//! Range-scoped inline formatting over an ordered document tree.
//!
//! [`context::apply_context`] installs or removes an inline context (bold,
//! italic, ...) on exactly the content of a [`Range`], pushing conflicting
//! ancestor formatting down onto the content outside it. The range is kept
//! pointing at the same content across every structural edit.

pub mod ancestors;
pub mod boundary;
pub mod context;
pub mod edits;
pub mod error;
pub mod markup;
pub mod tree;

// Re-export key types for easier usage
pub use boundary::{BoundaryPoint, Cursor, Range, normalize_range_boundaries};
pub use context::{ContextPolicy, Strategy, TagFormatter, apply_context, format, unformat};
pub use error::{EngineError, FixtureFormatError, MarkupError, Result};
pub use markup::{extract_markers, parse_fragment, render_with_markers, to_xhtml};
pub use tree::{Document, NodeId, NodeKind};
