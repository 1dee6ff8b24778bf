//! Server-side objects, their v-tables and dispatch.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::connection::{BusConnection, MethodSink, ObjectDescriptor};
use crate::org_freedesktop_dbus as names;
use crate::{
    Error, Message, ObjectPath, ObjectPathBuf, Result, SignatureBuf, Slot, Variant,
};

pub use self::method_result::MethodResult;
mod method_result;

pub use self::signal_emitter::SignalEmitter;
mod signal_emitter;

pub use self::vtable::{
    MethodBuilder, MethodHandler, MethodItem, PropertyBuilder, PropertyItem, SignalBuilder,
    SignalItem, VTable, VTableItem,
};
pub mod vtable;

#[cfg(test)]
mod tests;

/// A server-side entity exported at an object path.
///
/// An object owns one v-table per interface. Incoming method calls are
/// dispatched to the matching v-table item on the connection's dispatch
/// thread; the `org.freedesktop.DBus.Properties` interface is served from
/// the registered property items.
///
/// # Examples
///
/// ```no_run
/// use busline::{vtable, LocalBus, Object, ObjectPath};
///
/// let bus = LocalBus::builder().build()?;
/// let object = Object::new(bus, ObjectPath::new("/com/example/Calculator")?)?;
///
/// let items = vec![vtable::method("Multiply")
///     .with_inputs::<(i32, i32)>()
///     .with_outputs::<i32>()
///     .implemented_as(|call, result| {
///         let out = (|| {
///             let (a, b) = call.read::<(i32, i32)>()?;
///             Ok::<_, busline::Error>(a * b)
///         })();
///
///         match out {
///             Ok(product) => drop(result.send(&product)),
///             Err(error) => result.send_error(&error),
///         }
///     })?];
///
/// object.with_vtable(items).for_interface("com.example.Calculator")?;
/// # Ok::<_, busline::Error>(())
/// ```
pub struct Object {
    conn: Arc<dyn BusConnection>,
    inner: Arc<ObjectInner>,
    // Registration and floating v-table slots, released with the object.
    _registration: Slot,
    floating: Mutex<Vec<Slot>>,
}

pub(crate) struct ObjectInner {
    conn: Weak<dyn BusConnection>,
    path: ObjectPathBuf,
    vtables: Mutex<HashMap<Box<str>, VTable>>,
}

impl Object {
    /// Export a new object at `path` on the connection.
    ///
    /// # Errors
    ///
    /// Errors if an object is already registered at the path.
    pub fn new(conn: Arc<dyn BusConnection>, path: &ObjectPath) -> Result<Object> {
        let inner = Arc::new(ObjectInner {
            conn: Arc::downgrade(&conn),
            path: path.to_owned(),
            vtables: Mutex::new(HashMap::new()),
        });

        let dispatch = inner.clone();

        let descriptor = ObjectDescriptor::new(move |call, sink| {
            ObjectInner::dispatch(&dispatch, call, sink);
        });

        let registration = conn.register_object(path, descriptor)?;

        Ok(Object {
            conn,
            inner,
            _registration: registration,
            floating: Mutex::new(Vec::new()),
        })
    }

    /// The path the object is exported at.
    #[must_use]
    pub fn path(&self) -> &ObjectPath {
        &self.inner.path
    }

    /// Register a v-table for an interface, owned by the object.
    ///
    /// # Errors
    ///
    /// Errors if a v-table is already registered for the interface.
    pub fn add_vtable(&self, interface: &str, items: Vec<VTableItem>) -> Result<()> {
        let slot = self.add_vtable_with_slot(interface, items)?;
        self.floating.lock().push(slot);
        Ok(())
    }

    /// Register a v-table for an interface, handing its slot to the caller.
    ///
    /// Releasing the slot removes the v-table again.
    ///
    /// # Errors
    ///
    /// Errors if a v-table is already registered for the interface.
    pub fn add_vtable_with_slot(&self, interface: &str, items: Vec<VTableItem>) -> Result<Slot> {
        use std::collections::hash_map::Entry;

        let interface = Box::<str>::from(interface);

        match self.inner.vtables.lock().entry(interface.clone()) {
            Entry::Occupied(..) => {
                return Err(Error::invalid_args(format!(
                    "a v-table is already registered for {interface}"
                )));
            }
            Entry::Vacant(entry) => {
                entry.insert(VTable::new(items));
            }
        }

        let inner = Arc::downgrade(&self.inner);

        Ok(Slot::new(move || {
            if let Some(inner) = inner.upgrade() {
                inner.vtables.lock().remove(&interface);
            }
        }))
    }

    /// Start registering a v-table through the builder chain.
    pub fn with_vtable(&self, items: Vec<VTableItem>) -> VTableAdder<'_> {
        VTableAdder {
            object: self,
            items,
        }
    }

    /// Construct an unsealed signal message bound to this object's path.
    #[must_use]
    pub fn create_signal(&self, interface: &str, member: &str) -> Message {
        Message::signal(&self.inner.path, member).with_interface(interface)
    }

    /// Publish a signal message.
    ///
    /// # Errors
    ///
    /// Errors if the message is not a signal, is malformed, or carries a
    /// signature that no v-table declares for its interface and member.
    pub fn emit_signal(&self, msg: Message) -> Result<()> {
        use crate::MessageKind;

        let MessageKind::Signal { member, .. } = msg.kind() else {
            return Err(Error::invalid_args("message is not a signal"));
        };

        if !msg.is_valid() {
            return Err(Error::invalid_args("signal message is malformed"));
        }

        let member = member.to_string();
        let interface = msg.interface().unwrap_or_default().to_owned();

        {
            let vtables = self.inner.vtables.lock();

            let Some(vtable) = vtables.get(interface.as_str()) else {
                return Err(Error::invalid_args(format!(
                    "no v-table registered for {interface}"
                )));
            };

            let Some(declared) = vtable.find_signal(&member) else {
                return Err(Error::invalid_args(format!(
                    "signal {member} is not declared on {interface}"
                )));
            };

            if msg.signature() != &*declared.signature {
                return Err(Error::invalid_args(format!(
                    "signal {member} carries signature {}, declared as {}",
                    msg.signature(),
                    declared.signature
                )));
            }
        }

        self.conn.send_signal(msg)
    }

    /// Start emitting a signal through the builder chain.
    ///
    /// The emission commits when the builder is dropped, unless the
    /// surrounding scope is unwinding from a panic; see [`SignalEmitter`].
    pub fn emit(&self, member: &str) -> SignalEmitter<'_> {
        SignalEmitter::new(self, member)
    }
}

impl std::fmt::Debug for Object {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Object")
            .field("path", &self.inner.path)
            .field("interfaces", &self.inner.vtables.lock().len())
            .finish()
    }
}

/// Builder registering a v-table on an [`Object`].
///
/// The terminal step is [`for_interface`] or [`for_interface_with_slot`].
///
/// [`for_interface`]: VTableAdder::for_interface
/// [`for_interface_with_slot`]: VTableAdder::for_interface_with_slot
#[must_use]
pub struct VTableAdder<'a> {
    object: &'a Object,
    items: Vec<VTableItem>,
}

impl VTableAdder<'_> {
    /// Register the v-table for `interface`, owned by the object.
    pub fn for_interface(self, interface: &str) -> Result<()> {
        self.object.add_vtable(interface, self.items)
    }

    /// Register the v-table for `interface`, handing its slot to the caller.
    pub fn for_interface_with_slot(self, interface: &str) -> Result<Slot> {
        self.object.add_vtable_with_slot(interface, self.items)
    }
}

impl ObjectInner {
    /// Serve one incoming method call.
    ///
    /// Runs on the dispatch thread.
    pub(crate) fn dispatch(inner: &Arc<ObjectInner>, mut call: Message, sink: MethodSink) {
        call.seal();

        let Some(member) = call.member().map(str::to_owned) else {
            respond_error(&call, sink, &Error::invalid_args("call without a member"));
            return;
        };

        let interface = call.interface().map(str::to_owned);

        if interface.as_deref() == Some(names::PROPERTIES) {
            Self::dispatch_properties(inner, call, sink, &member);
            return;
        }

        let found = {
            let vtables = inner.vtables.lock();

            match &interface {
                Some(interface) => match vtables.get(interface.as_str()) {
                    Some(vtable) => match vtable.find_method(&member) {
                        Some(method) => Ok(clone_method(method)),
                        None => Err(Error::unknown_method(&member)),
                    },
                    None => Err(Error::unknown_interface(interface)),
                },
                // An omitted interface searches every v-table.
                None => vtables
                    .values()
                    .find_map(|vtable| vtable.find_method(&member))
                    .map(clone_method)
                    .ok_or_else(|| Error::unknown_method(&member)),
            }
        };

        let (handler, input_signature, output_signature) = match found {
            Ok(found) => found,
            Err(error) => {
                respond_error(&call, sink, &error);
                return;
            }
        };

        if call.signature() != &*input_signature {
            respond_error(
                &call,
                sink,
                &Error::invalid_args(format!(
                    "call to {member} carries signature {}, expected {input_signature}",
                    call.signature()
                )),
            );
            return;
        }

        let result = match MethodResult::new(&call, Some(output_signature), sink) {
            Ok(result) => result,
            Err(error) => {
                tracing::error!("cannot construct reply slot: {error}");
                return;
            }
        };

        handler(&mut call, result);
    }

    /// Serve the `org.freedesktop.DBus.Properties` interface from the
    /// registered property items.
    fn dispatch_properties(inner: &Arc<ObjectInner>, mut call: Message, sink: MethodSink, member: &str) {
        let result = match MethodResult::new(&call, None, sink) {
            Ok(result) => result,
            Err(error) => {
                tracing::error!("cannot construct reply slot: {error}");
                return;
            }
        };

        match member {
            names::GET => match call.read::<(String, String)>() {
                Ok((interface, property)) => {
                    match Self::get_property(inner, &interface, &property) {
                        Ok(value) => drop(result.send(&value)),
                        Err(error) => result.send_error(&error),
                    }
                }
                Err(error) => result.send_error(&Error::invalid_args(error)),
            },
            names::SET => match call.read::<(String, String, Variant)>() {
                Ok((interface, property, value)) => {
                    match Self::set_property(inner, &interface, &property, value) {
                        Ok(()) => drop(result.send(&())),
                        Err(error) => result.send_error(&error),
                    }
                }
                Err(error) => result.send_error(&Error::invalid_args(error)),
            },
            names::GET_ALL => match call.read::<String>() {
                Ok(interface) => match Self::get_all_properties(inner, &interface) {
                    Ok(values) => drop(result.send(&values)),
                    Err(error) => result.send_error(&error),
                },
                Err(error) => result.send_error(&Error::invalid_args(error)),
            },
            other => result.send_error(&Error::unknown_method(other)),
        }
    }

    fn get_property(inner: &Arc<ObjectInner>, interface: &str, property: &str) -> Result<Variant> {
        let getter = {
            let vtables = inner.vtables.lock();

            let Some(vtable) = vtables.get(interface) else {
                return Err(Error::unknown_interface(interface));
            };

            let Some(item) = vtable.find_property(property) else {
                return Err(Error::unknown_property(property));
            };

            let Some(getter) = item.getter.clone() else {
                return Err(Error::access_denied(format!(
                    "property {property} is write-only"
                )));
            };

            getter
        };

        getter()
    }

    fn set_property(
        inner: &Arc<ObjectInner>,
        interface: &str,
        property: &str,
        value: Variant,
    ) -> Result<()> {
        let (setter, emits_changed) = {
            let vtables = inner.vtables.lock();

            let Some(vtable) = vtables.get(interface) else {
                return Err(Error::unknown_interface(interface));
            };

            let Some(item) = vtable.find_property(property) else {
                return Err(Error::unknown_property(property));
            };

            if &*value.signature() != &*item.signature {
                return Err(Error::invalid_args(format!(
                    "property {property} has signature {}, got {}",
                    item.signature,
                    value.signature()
                )));
            }

            let Some(setter) = item.setter.clone() else {
                return Err(Error::access_denied(format!(
                    "property {property} is read-only"
                )));
            };

            (setter, item.emits_changed)
        };

        setter(value.clone())?;

        if emits_changed {
            Self::emit_properties_changed(inner, interface, property, value);
        }

        Ok(())
    }

    fn get_all_properties(
        inner: &Arc<ObjectInner>,
        interface: &str,
    ) -> Result<HashMap<String, Variant>> {
        let getters = {
            let vtables = inner.vtables.lock();

            let Some(vtable) = vtables.get(interface) else {
                return Err(Error::unknown_interface(interface));
            };

            vtable
                .properties()
                .filter_map(|item| {
                    item.getter
                        .clone()
                        .map(|getter| (item.name.to_string(), getter))
                })
                .collect::<Vec<_>>()
        };

        let mut values = HashMap::new();

        for (name, getter) in getters {
            values.insert(name, getter()?);
        }

        Ok(values)
    }

    fn emit_properties_changed(
        inner: &Arc<ObjectInner>,
        interface: &str,
        property: &str,
        value: Variant,
    ) {
        let Some(conn) = inner.conn.upgrade() else {
            return;
        };

        let mut changed = HashMap::new();
        changed.insert(property.to_owned(), value);
        let invalidated: Vec<String> = Vec::new();

        let mut msg = Message::signal(&inner.path, names::PROPERTIES_CHANGED)
            .with_interface(names::PROPERTIES);

        if let Err(error) = msg.append(&(interface, &changed, &invalidated)) {
            tracing::error!("cannot marshal PropertiesChanged: {error}");
            return;
        }

        if let Err(error) = conn.send_signal(msg) {
            tracing::debug!("cannot emit PropertiesChanged: {error}");
        }
    }
}

fn clone_method(method: &MethodItem) -> (MethodHandler, SignatureBuf, SignatureBuf) {
    (
        method.handler.clone(),
        method.input_signature.clone(),
        method.output_signature.clone(),
    )
}

fn respond_error(call: &Message, sink: MethodSink, error: &Error) {
    if call.no_reply() {
        return;
    }

    match call.error_reply(error) {
        Ok(reply) => sink(reply),
        Err(error) => tracing::error!("cannot construct error reply: {error}"),
    }
}
