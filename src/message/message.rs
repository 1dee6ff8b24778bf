use std::num::NonZeroU32;
use std::time::Duration;

use crate::proto::MessageType;
use crate::{
    Body, BodyBuf, Error, Flags, Loadable, MessageKind, ObjectPath, ObjectPathBuf, Result,
    Signature, Storable,
};

/// An owned D-Bus message.
///
/// A message is in *build* mode when constructed: typed [`append`] calls add
/// values to the body and extend its signature. Once [sealed], the body is
/// immutable and typed [`read`] calls consume it in signature order through a
/// persistent read cursor.
///
/// A message uniquely owns its payload and cannot be cloned; passing one to a
/// send operation transfers ownership.
///
/// [`append`]: Message::append
/// [sealed]: Message::seal
/// [`read`]: Message::read
///
/// # Examples
///
/// ```
/// use busline::{Message, ObjectPath};
///
/// const PATH: &ObjectPath = ObjectPath::new_const(b"/com/example/Calculator");
///
/// let mut m = Message::method_call(PATH, "Multiply")
///     .with_interface("com.example.Calculator")
///     .with_destination("com.example.CalculatorService");
///
/// m.append(&(6i32, 7i32))?;
/// m.seal();
///
/// assert_eq!(m.signature(), "ii");
/// assert_eq!(m.read::<i32>()?, 6);
/// assert_eq!(m.read::<i32>()?, 7);
/// # Ok::<_, busline::Error>(())
/// ```
#[derive(Debug, PartialEq)]
pub struct Message {
    kind: MessageKind,
    serial: Option<NonZeroU32>,
    flags: Flags,
    interface: Option<Box<str>>,
    destination: Option<Box<str>>,
    sender: Option<Box<str>>,
    timeout: Option<Duration>,
    body: BodyBuf,
    sealed: bool,
    read_pos: usize,
    read_sig_pos: usize,
}

impl Message {
    fn new(kind: MessageKind) -> Self {
        Self {
            kind,
            serial: None,
            flags: Flags::EMPTY,
            interface: None,
            destination: None,
            sender: None,
            timeout: None,
            body: BodyBuf::new(),
            sealed: false,
            read_pos: 0,
            read_sig_pos: 0,
        }
    }

    /// Construct a method call message.
    pub fn method_call(path: &ObjectPath, member: &str) -> Self {
        Self::new(MessageKind::MethodCall {
            path: path.to_owned(),
            member: Box::from(member),
        })
    }

    /// Construct a signal message.
    pub fn signal(path: &ObjectPath, member: &str) -> Self {
        Self::new(MessageKind::Signal {
            path: path.to_owned(),
            member: Box::from(member),
        })
    }

    /// Construct a reply to this message with an empty body.
    ///
    /// The destination and sender are flipped from the message being replied
    /// to.
    ///
    /// # Errors
    ///
    /// Errors if this message has not been assigned a serial, since the
    /// reply could not be routed back.
    pub fn method_return(&self) -> Result<Self> {
        let Some(serial) = self.serial else {
            return Err(Error::internal("cannot reply to a message without a serial"));
        };

        let mut m = Self::new(MessageKind::MethodReturn {
            reply_serial: serial,
        });
        m.destination = self.sender.clone();
        m.sender = self.destination.clone();
        Ok(m)
    }

    /// Construct an error reply to this message.
    ///
    /// The error's reverse-DNS [`name`] becomes the error name and its
    /// display rendering is appended as the message body.
    ///
    /// [`name`]: Error::name
    ///
    /// # Errors
    ///
    /// Errors if this message has not been assigned a serial.
    pub fn error_reply(&self, error: &Error) -> Result<Self> {
        let Some(serial) = self.serial else {
            return Err(Error::internal("cannot reply to a message without a serial"));
        };

        let mut m = Self::new(MessageKind::Error {
            error_name: Box::from(error.name()),
            reply_serial: serial,
        });
        m.destination = self.sender.clone();
        m.sender = self.destination.clone();
        m.append(&error.to_string())?;
        Ok(m)
    }

    /// Construct a reply message addressed by reply serial alone.
    pub(crate) fn method_return_raw(reply_serial: NonZeroU32) -> Self {
        Self::new(MessageKind::MethodReturn { reply_serial })
    }

    /// Construct an error message addressed by reply serial alone.
    pub(crate) fn error_raw(error_name: &str, reply_serial: NonZeroU32) -> Self {
        Self::new(MessageKind::Error {
            error_name: Box::from(error_name),
            reply_serial,
        })
    }

    /// Get the kind of the message.
    #[must_use]
    pub fn kind(&self) -> &MessageKind {
        &self.kind
    }

    /// Append a value to the body, extending its signature.
    ///
    /// # Errors
    ///
    /// Errors if the message is sealed, or if the extended signature would
    /// exceed the maximum signature length.
    pub fn append<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Storable,
    {
        if self.sealed {
            return Err(Error::invalid_args("cannot append to a sealed message"));
        }

        self.body.append(value)
    }

    /// Replace the body of an unsealed message.
    pub(crate) fn set_body(&mut self, body: BodyBuf) {
        debug_assert!(!self.sealed, "cannot replace the body of a sealed message");
        self.body = body;
    }

    /// Seal the message, making the body immutable and readable.
    pub fn seal(&mut self) {
        self.sealed = true;
    }

    /// Test if the message is sealed.
    #[must_use]
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Read the next value off the message's read cursor.
    ///
    /// # Errors
    ///
    /// Errors if the message is not sealed, if the signature of `T` does not
    /// match the body signature at the cursor, or if the body ends
    /// prematurely.
    pub fn read<T>(&mut self) -> Result<T>
    where
        T: Loadable,
    {
        if !self.sealed {
            return Err(Error::invalid_args("cannot read from an unsealed message"));
        }

        let mut body = self.body.as_body();
        body.restore((self.read_pos, self.read_sig_pos));
        let value = body.read::<T>()?;
        let (pos, sig_pos) = body.snapshot();
        self.read_pos = pos;
        self.read_sig_pos = sig_pos;
        Ok(value)
    }

    /// Rewind the read cursor to the start of the body.
    pub fn rewind(&mut self) {
        self.read_pos = 0;
        self.read_sig_pos = 0;
    }

    /// Access a read cursor over the sealed body, independent of the
    /// message's own cursor.
    pub fn body(&self) -> Body<'_> {
        self.body.as_body()
    }

    /// The signature of the message body.
    #[must_use]
    pub fn signature(&self) -> &Signature {
        self.body.signature()
    }

    /// Test if the message carries the header fields its kind requires.
    ///
    /// Signals require an interface; method calls and replies are routable
    /// without one.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        match &self.kind {
            MessageKind::MethodCall { member, .. } => !member.is_empty(),
            MessageKind::MethodReturn { .. } => true,
            MessageKind::Error { error_name, .. } => !error_name.is_empty(),
            MessageKind::Signal { member, .. } => {
                !member.is_empty() && self.interface.is_some()
            }
        }
    }

    /// Mark the message as not expecting a reply.
    pub fn set_no_reply(&mut self) {
        self.flags = self.flags | Flags::NO_REPLY_EXPECTED;
    }

    /// Test if the message is marked as not expecting a reply.
    #[must_use]
    pub fn no_reply(&self) -> bool {
        self.flags & Flags::NO_REPLY_EXPECTED
    }

    /// Get the flags of the message.
    #[must_use]
    pub fn flags(&self) -> Flags {
        self.flags
    }

    /// Modify the flags of the message.
    #[must_use]
    pub fn with_flags(mut self, flags: Flags) -> Self {
        self.flags = flags;
        self
    }

    /// Get the serial of the message, if one has been assigned.
    #[must_use]
    pub fn serial(&self) -> Option<NonZeroU32> {
        self.serial
    }

    /// Modify the serial of the message.
    #[must_use]
    pub fn with_serial(mut self, serial: NonZeroU32) -> Self {
        self.serial = Some(serial);
        self
    }

    /// Get the interface of the message.
    #[must_use]
    pub fn interface(&self) -> Option<&str> {
        self.interface.as_deref()
    }

    /// Modify the interface of the message.
    #[must_use]
    pub fn with_interface(mut self, interface: &str) -> Self {
        self.interface = Some(Box::from(interface));
        self
    }

    /// Get the destination of the message.
    #[must_use]
    pub fn destination(&self) -> Option<&str> {
        self.destination.as_deref()
    }

    /// Modify the destination of the message.
    #[must_use]
    pub fn with_destination(mut self, destination: &str) -> Self {
        self.destination = Some(Box::from(destination));
        self
    }

    /// Get the sender of the message.
    #[must_use]
    pub fn sender(&self) -> Option<&str> {
        self.sender.as_deref()
    }

    /// Modify the sender of the message.
    #[must_use]
    pub fn with_sender(mut self, sender: &str) -> Self {
        self.sender = Some(Box::from(sender));
        self
    }

    /// Get the per-call timeout of the message, if any.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Modify the per-call timeout of the message.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// The member of a method call or signal message.
    #[must_use]
    pub fn member(&self) -> Option<&str> {
        match &self.kind {
            MessageKind::MethodCall { member, .. } => Some(member),
            MessageKind::Signal { member, .. } => Some(member),
            _ => None,
        }
    }

    /// The object path of a method call or signal message.
    #[must_use]
    pub fn path(&self) -> Option<&ObjectPath> {
        match &self.kind {
            MessageKind::MethodCall { path, .. } => Some(path),
            MessageKind::Signal { path, .. } => Some(path),
            _ => None,
        }
    }

    pub(crate) fn path_buf(&self) -> Option<&ObjectPathBuf> {
        match &self.kind {
            MessageKind::MethodCall { path, .. } => Some(path),
            MessageKind::Signal { path, .. } => Some(path),
            _ => None,
        }
    }

    pub(crate) fn message_type(&self) -> MessageType {
        match self.kind {
            MessageKind::MethodCall { .. } => MessageType::METHOD_CALL,
            MessageKind::MethodReturn { .. } => MessageType::METHOD_RETURN,
            MessageKind::Error { .. } => MessageType::ERROR,
            MessageKind::Signal { .. } => MessageType::SIGNAL,
        }
    }
}
