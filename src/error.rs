use std::error;
use std::fmt;

use crate::org_freedesktop_dbus as names;
use crate::{ObjectPathError, SignatureError};

/// Result alias using an [`Error`] as the error type by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// An error raised by this crate.
///
/// Errors propagated across the bus carry a reverse-DNS [`name`]; incoming
/// error messages with a well-known name are mapped back to the matching
/// [`ErrorKind`] through [`Error::from_name`].
///
/// [`name`]: Error::name
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
}

impl Error {
    #[inline]
    pub(crate) fn new(kind: ErrorKind) -> Error {
        Self { kind }
    }

    /// A synchronous call or future timed out.
    pub fn timeout() -> Error {
        Self::new(ErrorKind::Timeout)
    }

    /// The bus connection is gone.
    pub fn disconnected() -> Error {
        Self::new(ErrorKind::Disconnected)
    }

    /// A request carried arguments the receiver cannot accept.
    pub fn invalid_args(message: impl fmt::Display) -> Error {
        Self::new(ErrorKind::InvalidArgs(message.to_string().into()))
    }

    /// A reply message was structurally unusable.
    pub fn invalid_reply(message: impl fmt::Display) -> Error {
        Self::new(ErrorKind::InvalidReply(message.to_string().into()))
    }

    /// A typed read out of a message body failed.
    pub fn deserialization(message: impl fmt::Display) -> Error {
        Self::new(ErrorKind::DeserializationFailure(message.to_string().into()))
    }

    /// No method by the given name on the addressed interface.
    pub fn unknown_method(member: impl fmt::Display) -> Error {
        Self::new(ErrorKind::UnknownMethod(member.to_string().into()))
    }

    /// No interface by the given name on the addressed object.
    pub fn unknown_interface(interface: impl fmt::Display) -> Error {
        Self::new(ErrorKind::UnknownInterface(interface.to_string().into()))
    }

    /// No property by the given name on the addressed interface.
    pub fn unknown_property(property: impl fmt::Display) -> Error {
        Self::new(ErrorKind::UnknownProperty(property.to_string().into()))
    }

    /// The receiver rejected the operation.
    pub fn access_denied(message: impl fmt::Display) -> Error {
        Self::new(ErrorKind::AccessDenied(message.to_string().into()))
    }

    /// A remote peer replied with an error message.
    pub fn remote(name: impl fmt::Display, message: impl fmt::Display) -> Error {
        Self::new(ErrorKind::RemoteError {
            name: name.to_string().into(),
            message: message.to_string().into(),
        })
    }

    /// An internal invariant was violated.
    pub fn internal(message: impl fmt::Display) -> Error {
        Self::new(ErrorKind::Internal(message.to_string().into()))
    }

    /// Map an error name received off the bus back to an error.
    ///
    /// Well-known names produce their matching [`ErrorKind`]; everything else
    /// becomes a [`ErrorKind::RemoteError`].
    pub fn from_name(name: &str, message: &str) -> Error {
        match name {
            names::ERROR_TIMEOUT | names::ERROR_NO_REPLY => Self::timeout(),
            names::ERROR_DISCONNECTED => Self::disconnected(),
            names::ERROR_INVALID_ARGS => Self::invalid_args(message),
            names::ERROR_INVALID_REPLY => Self::invalid_reply(message),
            names::ERROR_DESERIALIZATION => Self::deserialization(message),
            names::ERROR_UNKNOWN_METHOD => Self::unknown_method(message),
            names::ERROR_UNKNOWN_INTERFACE => Self::unknown_interface(message),
            names::ERROR_UNKNOWN_PROPERTY => Self::unknown_property(message),
            names::ERROR_ACCESS_DENIED => Self::access_denied(message),
            names::ERROR_INTERNAL => Self::internal(message),
            _ => Self::remote(name, message),
        }
    }

    /// The reverse-DNS name this error propagates under.
    ///
    /// # Examples
    ///
    /// ```
    /// use busline::Error;
    ///
    /// assert_eq!(Error::timeout().name(), "org.freedesktop.DBus.Error.Timeout");
    /// ```
    pub fn name(&self) -> &str {
        match &self.kind {
            ErrorKind::Timeout => names::ERROR_TIMEOUT,
            ErrorKind::Disconnected => names::ERROR_DISCONNECTED,
            ErrorKind::InvalidArgs(..) => names::ERROR_INVALID_ARGS,
            ErrorKind::InvalidReply(..) => names::ERROR_INVALID_REPLY,
            ErrorKind::DeserializationFailure(..) => names::ERROR_DESERIALIZATION,
            ErrorKind::UnknownMethod(..) => names::ERROR_UNKNOWN_METHOD,
            ErrorKind::UnknownInterface(..) => names::ERROR_UNKNOWN_INTERFACE,
            ErrorKind::UnknownProperty(..) => names::ERROR_UNKNOWN_PROPERTY,
            ErrorKind::AccessDenied(..) => names::ERROR_ACCESS_DENIED,
            ErrorKind::RemoteError { name, .. } => name,
            ErrorKind::Internal(..) => names::ERROR_INTERNAL,
            ErrorKind::Signature(..) | ErrorKind::ObjectPath(..) => names::ERROR_INVALID_ARGS,
        }
    }

    /// The kind of the error.
    #[inline]
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }
}

impl From<SignatureError> for Error {
    #[inline]
    fn from(error: SignatureError) -> Self {
        Self::new(ErrorKind::Signature(error))
    }
}

impl From<ObjectPathError> for Error {
    #[inline]
    fn from(error: ObjectPathError) -> Self {
        Self::new(ErrorKind::ObjectPath(error))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ErrorKind::Timeout => write!(f, "Call timed out"),
            ErrorKind::Disconnected => write!(f, "Connection is gone"),
            ErrorKind::InvalidArgs(m) => write!(f, "Invalid arguments: {m}"),
            ErrorKind::InvalidReply(m) => write!(f, "Invalid reply: {m}"),
            ErrorKind::DeserializationFailure(m) => write!(f, "Deserialization failed: {m}"),
            ErrorKind::UnknownMethod(m) => write!(f, "Unknown method {m}"),
            ErrorKind::UnknownInterface(m) => write!(f, "Unknown interface {m}"),
            ErrorKind::UnknownProperty(m) => write!(f, "Unknown property {m}"),
            ErrorKind::AccessDenied(m) => write!(f, "Access denied: {m}"),
            ErrorKind::RemoteError { name, message } => write!(f, "{name}: {message}"),
            ErrorKind::Internal(m) => write!(f, "Internal error: {m}"),
            ErrorKind::Signature(..) => write!(f, "Signature error"),
            ErrorKind::ObjectPath(..) => write!(f, "Object path error"),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match &self.kind {
            ErrorKind::Signature(error) => Some(error),
            ErrorKind::ObjectPath(error) => Some(error),
            _ => None,
        }
    }
}

/// The kind of an [`Error`].
#[derive(Debug)]
#[non_exhaustive]
pub enum ErrorKind {
    /// A synchronous call or future timed out.
    Timeout,
    /// The bus connection is gone.
    Disconnected,
    /// A request carried arguments the receiver cannot accept.
    InvalidArgs(Box<str>),
    /// A reply message was structurally unusable.
    InvalidReply(Box<str>),
    /// A typed read out of a message body failed.
    DeserializationFailure(Box<str>),
    /// No method by the given name on the addressed interface.
    UnknownMethod(Box<str>),
    /// No interface by the given name on the addressed object.
    UnknownInterface(Box<str>),
    /// No property by the given name on the addressed interface.
    UnknownProperty(Box<str>),
    /// The receiver rejected the operation.
    AccessDenied(Box<str>),
    /// A remote peer replied with an error under a name this crate does not
    /// define.
    RemoteError {
        /// The reverse-DNS error name.
        name: Box<str>,
        /// The human-readable error message.
        message: Box<str>,
    },
    /// An internal invariant was violated.
    Internal(Box<str>),
    /// A signature failed to validate or compose.
    Signature(SignatureError),
    /// An object path failed to validate.
    ObjectPath(ObjectPathError),
}
