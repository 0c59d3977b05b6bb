use thiserror::Error;

/// Why a single field rule could not produce a value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("no element matches {0}")]
    NotFound(String),

    #[error("element {locator} has no attribute '{attr}'")]
    MissingAttribute { locator: String, attr: String },

    #[error("invalid selector '{0}'")]
    InvalidSelector(String),

    #[error("rule returned {0}, which does not fit its fields")]
    Shape(&'static str),
}

/// Coarse failure tag written next to the detail text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    NotFound,
    MissingAttribute,
    InvalidSelector,
    Shape,
    /// The page itself could not be fetched.
    Load,
}

impl ExtractError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::NotFound(_) => FailureKind::NotFound,
            Self::MissingAttribute { .. } => FailureKind::MissingAttribute,
            Self::InvalidSelector(_) => FailureKind::InvalidSelector,
            Self::Shape(_) => FailureKind::Shape,
        }
    }
}

impl FailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::MissingAttribute => "missing_attribute",
            Self::InvalidSelector => "invalid_selector",
            Self::Shape => "shape",
            Self::Load => "load",
        }
    }
}
