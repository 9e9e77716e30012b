//! Error types for the tree, the edits, the engine and the markup codec.

/// Faults raised by structural operations and by the context engine.
///
/// Both variants are programming errors on the caller's side. They are
/// surfaced immediately and never retried; the tree may already have been
/// partially mutated when one is returned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// A structural assumption is false, e.g. wrapping a node without a
    /// parent or a boundary offset past the end of its container.
    #[error("Precondition violated: {0}")]
    PreconditionViolation(String),

    /// A policy callback behaved inconsistently during a single walk.
    #[error("Callback contract violated: {0}")]
    CallbackContractViolation(String),
}

impl EngineError {
    pub(crate) fn precondition(msg: impl Into<String>) -> Self {
        EngineError::PreconditionViolation(msg.into())
    }

    pub(crate) fn contract(msg: impl Into<String>) -> Self {
        EngineError::CallbackContractViolation(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

/// Malformed XHTML fragment.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MarkupError {
    #[error("Unexpected closing tag </{found}> at byte {at}")]
    UnexpectedClose { found: String, at: usize },

    #[error("Unclosed element <{0}>")]
    Unclosed(String),

    #[error("Stray '<' at byte {0}")]
    StrayAngleBracket(usize),

    #[error("Content outside the root element at byte {0}")]
    OutsideRoot(usize),

    #[error("Fragment has no root element")]
    Empty,

    #[error(transparent)]
    Tree(#[from] EngineError),
}

/// A test fixture whose range markers cannot be turned into a range.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FixtureFormatError {
    #[error("Missing {0} marker")]
    MissingMarker(&'static str),

    #[error("Duplicate '{0}' marker")]
    DuplicateMarker(char),

    #[error("End marker '{0}' before the start marker")]
    EndBeforeStart(char),

    #[error("Marker '{0}' outside the root element")]
    MarkerOutsideRoot(char),

    #[error(transparent)]
    Markup(#[from] MarkupError),

    #[error("Markers do not form a range: {0}")]
    InvalidRange(#[from] EngineError),
}
