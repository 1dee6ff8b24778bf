//! The bus connection collaborator contract and its in-process reference
//! implementation.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

pub use self::local::{LocalBus, LocalBusBuilder};
mod local;

#[cfg(test)]
mod tests;

use crate::{
    Error, Message, MessageKind, MethodReplyHandler, ObjectPath, PendingAsyncCall, Result, Slot,
};

/// The default timeout applied to method calls that do not specify one.
pub const DEFAULT_METHOD_TIMEOUT: Duration = Duration::from_secs(25);

/// A handler invoked with each signal matching a subscription.
pub type SignalCallback = Arc<dyn Fn(&Message) + Send + Sync>;

/// The sink an object dispatch hands its reply message to.
pub type MethodSink = Box<dyn FnOnce(Message) + Send>;

/// The dispatch entry of an exported object, registered with the connection
/// under the object's path.
///
/// The connection invokes it on the dispatch thread with each incoming
/// method call and a sink for the reply. Calls flagged no-reply come with a
/// sink that discards its message.
#[derive(Clone)]
pub struct ObjectDescriptor {
    dispatch: Arc<dyn Fn(Message, MethodSink) + Send + Sync>,
}

impl ObjectDescriptor {
    /// Construct a descriptor around a dispatch function.
    pub fn new<F>(dispatch: F) -> Self
    where
        F: Fn(Message, MethodSink) + Send + Sync + 'static,
    {
        Self {
            dispatch: Arc::new(dispatch),
        }
    }

    /// Dispatch an incoming call.
    pub fn dispatch(&self, msg: Message, sink: MethodSink) {
        (self.dispatch)(msg, sink);
    }
}

impl fmt::Debug for ObjectDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectDescriptor").finish_non_exhaustive()
    }
}

/// A structured signal match expression.
///
/// Displays as a D-Bus match rule string.
///
/// # Examples
///
/// ```
/// use busline::SignalMatch;
///
/// let m = SignalMatch::new("com.example.Player", "StateChanged")
///     .with_sender("com.example.PlayerService");
///
/// assert_eq!(
///     m.to_string(),
///     "type='signal',sender='com.example.PlayerService',\
///      interface='com.example.Player',member='StateChanged'",
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalMatch {
    sender: Option<Box<str>>,
    path: Option<Box<str>>,
    interface: Box<str>,
    member: Box<str>,
}

impl SignalMatch {
    /// Construct a match over an interface and member.
    pub fn new(interface: &str, member: &str) -> Self {
        Self {
            sender: None,
            path: None,
            interface: Box::from(interface),
            member: Box::from(member),
        }
    }

    /// Restrict the match to signals from the given sender.
    #[must_use]
    pub fn with_sender(mut self, sender: &str) -> Self {
        self.sender = Some(Box::from(sender));
        self
    }

    /// Restrict the match to signals from the given object path.
    #[must_use]
    pub fn with_path(mut self, path: &ObjectPath) -> Self {
        self.path = Some(Box::from(path.as_str()));
        self
    }

    /// The interface matched.
    #[must_use]
    pub fn interface(&self) -> &str {
        &self.interface
    }

    /// The member matched.
    #[must_use]
    pub fn member(&self) -> &str {
        &self.member
    }

    /// Test whether a message satisfies the match.
    pub fn matches(&self, msg: &Message) -> bool {
        let MessageKind::Signal { path, member } = msg.kind() else {
            return false;
        };

        if **member != *self.member {
            return false;
        }

        if msg.interface() != Some(&*self.interface) {
            return false;
        }

        if let Some(sender) = &self.sender {
            if msg.sender() != Some(&**sender) {
                return false;
            }
        }

        if let Some(expected) = &self.path {
            if path.as_str() != &**expected {
                return false;
            }
        }

        true
    }
}

impl fmt::Display for SignalMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "type='signal'")?;

        if let Some(sender) = &self.sender {
            write!(f, ",sender='{sender}'")?;
        }

        if let Some(path) = &self.path {
            write!(f, ",path='{path}'")?;
        }

        write!(f, ",interface='{}',member='{}'", self.interface, self.member)
    }
}

/// The contract the marshalling and dispatch core consumes from a bus
/// connection.
///
/// Implementations own the transport and the dispatch thread: all reply and
/// signal handlers run on that single thread, one at a time. Synchronous
/// calls may be submitted from any thread except the dispatch thread itself,
/// where blocking for a reply would deadlock.
pub trait BusConnection: Send + Sync {
    /// Send a method call and block until its reply, an error reply, or the
    /// timeout.
    fn send_method_call_sync(&self, msg: Message, timeout: Duration) -> Result<Message>;

    /// Send a method call and deliver its outcome to `handler` on the
    /// dispatch thread.
    ///
    /// The handler is invoked exactly once unless the returned handle is
    /// cancelled first. A timeout is delivered as an error through the same
    /// handler.
    fn send_method_call_async(
        &self,
        msg: Message,
        handler: MethodReplyHandler,
        timeout: Duration,
    ) -> Result<PendingAsyncCall>;

    /// Send a method call flagged to expect no reply.
    ///
    /// No reply handler is registered anywhere for such a call.
    fn send_method_call_no_reply(&self, msg: Message) -> Result<()>;

    /// Publish a sealed signal message.
    fn send_signal(&self, msg: Message) -> Result<()>;

    /// Register an object's dispatch entry under a path.
    ///
    /// The returned slot deregisters the object when released.
    fn register_object(&self, path: &ObjectPath, object: ObjectDescriptor) -> Result<Slot>;

    /// Subscribe to signals satisfying a match expression.
    ///
    /// The returned slot removes the subscription when released.
    fn subscribe(&self, match_rule: &SignalMatch, handler: SignalCallback) -> Result<Slot>;

    /// Run a closure on the dispatch thread.
    fn dispatch_thread_invoke(&self, f: Box<dyn FnOnce() + Send>);
}

/// Convert a sealed reply message into the result handed to reply handlers.
///
/// Error-kind messages become an [`Error`] carrying the remote error name
/// and the message text from the body, mapped back to a well-known kind when
/// the name is one this crate defines.
pub fn reply_to_result(mut msg: Message) -> Result<Message> {
    msg.seal();

    if let MessageKind::Error { error_name, .. } = msg.kind() {
        let name = error_name.to_string();
        let text = msg.read::<String>().unwrap_or_default();
        return Err(Error::from_name(&name, &text));
    }

    Ok(msg)
}
