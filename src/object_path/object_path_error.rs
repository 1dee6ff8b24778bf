use std::error;
use std::fmt;

/// An error raised when validating an [`ObjectPath`].
///
/// [`ObjectPath`]: super::ObjectPath
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ObjectPathError {
    /// The object path was empty.
    Empty,
    /// The object path did not start with a slash.
    MissingLeadingSlash,
    /// The object path contained an empty element.
    EmptyElement,
    /// The object path ended with a trailing slash.
    TrailingSlash,
    /// The object path contained a character outside of `[A-Za-z0-9_]`.
    InvalidCharacter,
}

impl fmt::Display for ObjectPathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectPathError::Empty => write!(f, "Object path is empty"),
            ObjectPathError::MissingLeadingSlash => {
                write!(f, "Object path must begin with a slash")
            }
            ObjectPathError::EmptyElement => write!(f, "Object path has an empty element"),
            ObjectPathError::TrailingSlash => write!(f, "Object path ends with a slash"),
            ObjectPathError::InvalidCharacter => {
                write!(f, "Object path element has an invalid character")
            }
        }
    }
}

impl error::Error for ObjectPathError {}
