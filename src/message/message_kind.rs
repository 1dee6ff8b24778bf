use std::num::NonZeroU32;

use crate::ObjectPathBuf;

/// The kind of a [`Message`].
///
/// [`Message`]: super::Message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageKind {
    /// A method call, expecting a reply unless flagged otherwise.
    MethodCall {
        /// The path of the object the call is addressed to.
        path: ObjectPathBuf,
        /// The name of the method.
        member: Box<str>,
    },
    /// A reply to a method call.
    MethodReturn {
        /// The serial of the call this message replies to.
        reply_serial: NonZeroU32,
    },
    /// An error reply to a method call.
    Error {
        /// The reverse-DNS name of the error.
        error_name: Box<str>,
        /// The serial of the call this message replies to.
        reply_serial: NonZeroU32,
    },
    /// A signal emission.
    Signal {
        /// The path of the object the signal is emitted from.
        path: ObjectPathBuf,
        /// The name of the signal.
        member: Box<str>,
    },
}
