//! Client-side proxies and their call builders.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::connection::{BusConnection, SignalCallback, SignalMatch};
use crate::{Message, ObjectPath, ObjectPathBuf, PendingAsyncCall, Result, Slot};

pub use self::method_invoker::{AsyncMethodInvoker, MethodInvoker};
mod method_invoker;

pub use self::signal_subscriber::SignalSubscriber;
mod signal_subscriber;

pub use self::property::{
    AllPropertiesGetter, AsyncAllPropertiesGetter, AsyncPropertyGetter, AsyncPropertySetter,
    PropertyGetter, PropertySetter,
};
mod property;

#[cfg(test)]
mod tests;

/// A client-side handle to a remote object, addressed by service name and
/// object path.
///
/// A proxy issues method calls, accesses properties and subscribes to
/// signals through the builder chain:
///
/// ```no_run
/// use busline::{LocalBus, ObjectPath, Proxy};
///
/// let bus = LocalBus::builder().build()?;
///
/// let proxy = Proxy::new(
///     bus,
///     "com.example.CalculatorService",
///     ObjectPath::new("/com/example/Calculator")?,
/// );
///
/// let product: i32 = proxy
///     .call_method("Multiply")
///     .on_interface("com.example.Calculator")
///     .with_arguments(&(6i32, 7i32))?
///     .reply()?;
/// # Ok::<_, busline::Error>(())
/// ```
pub struct Proxy {
    conn: Arc<dyn BusConnection>,
    destination: Box<str>,
    path: ObjectPathBuf,
    // Floating signal subscriptions keyed by (interface, member).
    subscriptions: Mutex<HashMap<(Box<str>, Box<str>), Slot>>,
    // Floating slots of in-flight async calls; released with the proxy.
    pending: Mutex<Vec<(PendingAsyncCall, Slot)>>,
}

impl Proxy {
    /// Construct a proxy for `destination` and `path` on the connection.
    pub fn new(conn: Arc<dyn BusConnection>, destination: &str, path: &ObjectPath) -> Proxy {
        Proxy {
            conn,
            destination: Box::from(destination),
            path: path.to_owned(),
            subscriptions: Mutex::new(HashMap::new()),
            pending: Mutex::new(Vec::new()),
        }
    }

    /// The service name the proxy addresses.
    #[must_use]
    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// The object path the proxy addresses.
    #[must_use]
    pub fn path(&self) -> &ObjectPath {
        &self.path
    }

    pub(crate) fn connection(&self) -> &Arc<dyn BusConnection> {
        &self.conn
    }

    /// Build an unsealed method call message targeting the proxy's service
    /// and path.
    #[must_use]
    pub fn create_method_call(&self, interface: &str, method: &str) -> Message {
        Message::method_call(&self.path, method)
            .with_interface(interface)
            .with_destination(&self.destination)
    }

    /// Send a method call message and block until its reply or the timeout.
    pub fn call(&self, msg: Message, timeout: Duration) -> Result<Message> {
        self.conn.send_method_call_sync(msg, timeout)
    }

    /// Send a method call message, delivering the outcome to `handler` on
    /// the dispatch thread.
    ///
    /// The handler is invoked exactly once with either the reply or an
    /// error. The in-flight call is additionally owned by the proxy through
    /// a floating slot, so dropping the proxy cancels it; the returned weak
    /// handle can cancel it earlier.
    pub fn call_async<F>(
        &self,
        msg: Message,
        handler: F,
        timeout: Duration,
    ) -> Result<PendingAsyncCall>
    where
        F: FnOnce(Result<Message>) + Send + 'static,
    {
        let pending = self
            .conn
            .send_method_call_async(msg, Box::new(handler), timeout)?;

        let cancel = pending.clone();
        let slot = Slot::new(move || cancel.cancel());

        let mut list = self.pending.lock();
        list.retain(|(call, _)| call.is_pending());
        list.push((pending.clone(), slot));

        Ok(pending)
    }

    /// Subscribe a raw message handler to a signal, handing the subscription
    /// slot to the caller.
    ///
    /// The handler runs on the dispatch thread for each matching signal.
    pub fn register_signal_handler<F>(
        &self,
        interface: &str,
        member: &str,
        handler: F,
    ) -> Result<Slot>
    where
        F: Fn(&Message) + Send + Sync + 'static,
    {
        let rule = SignalMatch::new(interface, member).with_path(&self.path);
        self.conn.subscribe(&rule, Arc::new(handler))
    }

    /// Remove a floating signal subscription made through [`upon_signal`].
    ///
    /// [`upon_signal`]: Proxy::upon_signal
    pub fn unregister_signal_handler(&self, interface: &str, member: &str) {
        self.subscriptions
            .lock()
            .remove(&(Box::from(interface), Box::from(member)));
    }

    pub(crate) fn store_subscription(&self, interface: &str, member: &str, slot: Slot) {
        self.subscriptions
            .lock()
            .insert((Box::from(interface), Box::from(member)), slot);
    }

    pub(crate) fn subscribe_callback(
        &self,
        interface: &str,
        member: &str,
        handler: SignalCallback,
    ) -> Result<Slot> {
        let rule = SignalMatch::new(interface, member).with_path(&self.path);
        self.conn.subscribe(&rule, handler)
    }

    /// Start a synchronous method invocation through the builder chain.
    pub fn call_method(&self, method: &str) -> MethodInvoker<'_> {
        MethodInvoker::new(self, method)
    }

    /// Start an asynchronous method invocation through the builder chain.
    pub fn call_method_async(&self, method: &str) -> AsyncMethodInvoker<'_> {
        AsyncMethodInvoker::new(self, method)
    }

    /// Start subscribing to a signal through the builder chain.
    pub fn upon_signal(&self, member: &str) -> SignalSubscriber<'_> {
        SignalSubscriber::new(self, member)
    }

    /// Start reading a property.
    pub fn get_property(&self, name: &str) -> PropertyGetter<'_> {
        PropertyGetter::new(self, name)
    }

    /// Start reading a property asynchronously.
    pub fn get_property_async(&self, name: &str) -> AsyncPropertyGetter<'_> {
        AsyncPropertyGetter::new(self, name)
    }

    /// Start writing a property.
    pub fn set_property(&self, name: &str) -> PropertySetter<'_> {
        PropertySetter::new(self, name)
    }

    /// Start writing a property asynchronously.
    pub fn set_property_async(&self, name: &str) -> AsyncPropertySetter<'_> {
        AsyncPropertySetter::new(self, name)
    }

    /// Start reading all properties of an interface.
    pub fn get_all_properties(&self) -> AllPropertiesGetter<'_> {
        AllPropertiesGetter::new(self)
    }

    /// Start reading all properties of an interface asynchronously.
    pub fn get_all_properties_async(&self) -> AsyncAllPropertiesGetter<'_> {
        AsyncAllPropertiesGetter::new(self)
    }
}

impl std::fmt::Debug for Proxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Proxy")
            .field("destination", &self.destination)
            .field("path", &self.path)
            .finish()
    }
}
