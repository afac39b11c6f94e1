use std::fmt::{Display, Formatter};

/// Fatal construction/persistence failures. Anything here indicates a
/// configuration or wiring bug, never a condition worth retrying.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Incompatible tensor dimensions, e.g. a convolution whose derived
    /// output size is not an integer for the given stride/pad.
    Shape { context: &'static str, msg: String },
    /// A parameter mapping was missing an expected key.
    MissingParam(String),
}

impl Error {
    pub fn shape<M>(context: &'static str, msg: M) -> Self
    where
        M: Into<String>,
    {
        Error::Shape {
            context,
            msg: msg.into(),
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Shape { context, msg } => write!(f, "shape error in {context}: {msg}"),
            Error::MissingParam(key) => write!(f, "missing parameter {key:?}"),
        }
    }
}

impl std::error::Error for Error {}
