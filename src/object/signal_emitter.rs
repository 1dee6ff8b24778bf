use std::mem;
use std::thread;

use crate::{BodyBuf, Error, Result, Storable};

use super::Object;

/// Builder emitting a signal from an [`Object`].
///
/// The builder commits in one of two ways: explicitly through [`emit`], or
/// on drop at the end of the enclosing scope. The drop commit is suppressed
/// while the thread is unwinding from a panic, so a failing scope never
/// publishes its signal; a drop commit that itself fails panics, since there
/// is no other channel left to report it on. Use [`emit`] to keep failures
/// as plain results.
///
/// If no arguments are attached the signal is emitted with an empty payload.
/// Without [`on_interface`] the message is invalid and the commit fails.
///
/// [`emit`]: SignalEmitter::emit
/// [`on_interface`]: SignalEmitter::on_interface
///
/// # Examples
///
/// ```no_run
/// use busline::{vtable, LocalBus, Object, ObjectPath};
///
/// let bus = LocalBus::builder().build()?;
/// let object = Object::new(bus, ObjectPath::new("/com/example/Player")?)?;
///
/// object
///     .with_vtable(vec![vtable::signal("StateChanged")
///         .with_parameters::<u32>()
///         .build()?])
///     .for_interface("com.example.Player")?;
///
/// object
///     .emit("StateChanged")
///     .on_interface("com.example.Player")
///     .with_arguments(&2u32)?
///     .emit()?;
/// # Ok::<_, busline::Error>(())
/// ```
#[must_use = "the signal is emitted when the emitter goes out of scope"]
pub struct SignalEmitter<'a> {
    object: &'a Object,
    member: Box<str>,
    interface: Option<Box<str>>,
    body: BodyBuf,
    committed: bool,
}

impl<'a> SignalEmitter<'a> {
    pub(super) fn new(object: &'a Object, member: &str) -> Self {
        Self {
            object,
            member: Box::from(member),
            interface: None,
            body: BodyBuf::new(),
            committed: false,
        }
    }

    /// Set the interface the signal belongs to.
    ///
    /// Must be called before [`with_arguments`].
    ///
    /// [`with_arguments`]: SignalEmitter::with_arguments
    pub fn on_interface(mut self, interface: &str) -> Self {
        self.interface = Some(Box::from(interface));
        self
    }

    /// Append the signal's payload.
    ///
    /// Tuples flatten into an argument list.
    pub fn with_arguments<T>(mut self, args: &T) -> Result<Self>
    where
        T: ?Sized + Storable,
    {
        assert!(
            self.interface.is_some(),
            "on_interface() must be called before with_arguments()"
        );

        if let Err(error) = self.body.append(args) {
            // A half-built signal must not commit on drop.
            self.committed = true;
            return Err(error);
        }

        Ok(self)
    }

    /// Emit the signal now.
    pub fn emit(mut self) -> Result<()> {
        self.committed = true;
        self.commit()
    }

    fn commit(&mut self) -> Result<()> {
        let Some(interface) = self.interface.take() else {
            return Err(Error::invalid_args(format!(
                "signal {} has no interface; on_interface() was not called",
                self.member
            )));
        };

        let mut msg = self.object.create_signal(&interface, &self.member);
        msg.set_body(mem::take(&mut self.body));
        self.object.emit_signal(msg)
    }
}

impl Drop for SignalEmitter<'_> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }

        if thread::panicking() {
            tracing::debug!(
                member = &*self.member,
                "signal emission abandoned while unwinding"
            );
            return;
        }

        self.committed = true;

        if let Err(error) = self.commit() {
            panic!("emitting signal {} failed: {error}", self.member);
        }
    }
}
