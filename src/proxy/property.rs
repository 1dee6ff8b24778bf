use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::oneshot;

use crate::connection::DEFAULT_METHOD_TIMEOUT;
use crate::org_freedesktop_dbus as names;
use crate::{
    CallFuture, Error, Loadable, Message, PendingAsyncCall, Result, Storable, Variant,
};

use super::Proxy;

fn interface_or_err(interface: &Option<Box<str>>, what: &str) -> Result<Box<str>> {
    interface.clone().ok_or_else(|| {
        Error::invalid_args(format!(
            "{what} has no interface; on_interface() was not called"
        ))
    })
}

/// Builder reading a property through `org.freedesktop.DBus.Properties`.
///
/// The terminal [`get`] decodes the property value; [`get_variant`] returns
/// it untyped.
///
/// [`get`]: PropertyGetter::get
/// [`get_variant`]: PropertyGetter::get_variant
#[must_use]
pub struct PropertyGetter<'a> {
    proxy: &'a Proxy,
    name: Box<str>,
    interface: Option<Box<str>>,
    timeout: Option<Duration>,
}

impl<'a> PropertyGetter<'a> {
    pub(super) fn new(proxy: &'a Proxy, name: &str) -> Self {
        Self {
            proxy,
            name: Box::from(name),
            interface: None,
            timeout: None,
        }
    }

    /// Set the interface the property belongs to.
    pub fn on_interface(mut self, interface: &str) -> Self {
        self.interface = Some(Box::from(interface));
        self
    }

    /// Set the call timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        assert!(
            self.interface.is_some(),
            "on_interface() must be called before with_timeout()"
        );

        self.timeout = Some(timeout);
        self
    }

    /// Read and decode the property value.
    pub fn get<T>(self) -> Result<T>
    where
        T: Loadable,
    {
        self.get_variant()?.get::<T>()
    }

    /// Read the property value untyped.
    pub fn get_variant(self) -> Result<Variant> {
        let interface = interface_or_err(&self.interface, "property read")?;
        let timeout = self.timeout.unwrap_or(DEFAULT_METHOD_TIMEOUT);

        let msg = get_call(self.proxy, &interface, &self.name)?;
        let mut reply = self.proxy.call(msg, timeout)?;
        reply.read::<Variant>()
    }
}

/// Builder reading a property asynchronously.
#[must_use]
pub struct AsyncPropertyGetter<'a> {
    proxy: &'a Proxy,
    name: Box<str>,
    interface: Option<Box<str>>,
    timeout: Option<Duration>,
}

impl<'a> AsyncPropertyGetter<'a> {
    pub(super) fn new(proxy: &'a Proxy, name: &str) -> Self {
        Self {
            proxy,
            name: Box::from(name),
            interface: None,
            timeout: None,
        }
    }

    /// Set the interface the property belongs to.
    pub fn on_interface(mut self, interface: &str) -> Self {
        self.interface = Some(Box::from(interface));
        self
    }

    /// Set the call timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        assert!(
            self.interface.is_some(),
            "on_interface() must be called before with_timeout()"
        );

        self.timeout = Some(timeout);
        self
    }

    /// Commit the read, delivering the decoded value to `f` on the dispatch
    /// thread.
    pub fn upon_reply_invoke<T, F>(self, f: F) -> Result<PendingAsyncCall>
    where
        T: Loadable,
        F: FnOnce(Result<T>) + Send + 'static,
    {
        let interface = interface_or_err(&self.interface, "property read")?;
        let timeout = self.timeout.unwrap_or(DEFAULT_METHOD_TIMEOUT);
        let msg = get_call(self.proxy, &interface, &self.name)?;

        self.proxy.call_async(
            msg,
            move |result| {
                f(result
                    .and_then(|mut reply| reply.read::<Variant>())
                    .and_then(|value| value.get::<T>()));
            },
            timeout,
        )
    }

    /// Commit the read, resolving the returned future with the decoded
    /// value.
    pub fn get_result_as_future<T>(self) -> Result<CallFuture<T>>
    where
        T: Loadable + Send + 'static,
    {
        let (send, recv) = oneshot::channel();

        let pending = self.upon_reply_invoke::<T, _>(move |result| {
            let _ = send.send(result);
        })?;

        Ok(CallFuture::new(pending, recv))
    }
}

/// Builder writing a property through `org.freedesktop.DBus.Properties`.
///
/// The terminal [`to_value`] commits synchronously; [`to_value_no_reply`]
/// marks the underlying call fire-and-forget.
///
/// [`to_value`]: PropertySetter::to_value
/// [`to_value_no_reply`]: PropertySetter::to_value_no_reply
#[must_use]
pub struct PropertySetter<'a> {
    proxy: &'a Proxy,
    name: Box<str>,
    interface: Option<Box<str>>,
    timeout: Option<Duration>,
}

impl<'a> PropertySetter<'a> {
    pub(super) fn new(proxy: &'a Proxy, name: &str) -> Self {
        Self {
            proxy,
            name: Box::from(name),
            interface: None,
            timeout: None,
        }
    }

    /// Set the interface the property belongs to.
    pub fn on_interface(mut self, interface: &str) -> Self {
        self.interface = Some(Box::from(interface));
        self
    }

    /// Set the call timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        assert!(
            self.interface.is_some(),
            "on_interface() must be called before with_timeout()"
        );

        self.timeout = Some(timeout);
        self
    }

    /// Write the property and block until the write is acknowledged.
    pub fn to_value<T>(self, value: &T) -> Result<()>
    where
        T: ?Sized + Storable,
    {
        let interface = interface_or_err(&self.interface, "property write")?;
        let timeout = self.timeout.unwrap_or(DEFAULT_METHOD_TIMEOUT);

        let msg = set_call(self.proxy, &interface, &self.name, value)?;
        let mut reply = self.proxy.call(msg, timeout)?;
        reply.read::<()>()
    }

    /// Write the property fire-and-forget.
    ///
    /// The underlying call is flagged to expect no reply.
    pub fn to_value_no_reply<T>(self, value: &T) -> Result<()>
    where
        T: ?Sized + Storable,
    {
        let interface = interface_or_err(&self.interface, "property write")?;
        let msg = set_call(self.proxy, &interface, &self.name, value)?;
        self.proxy.connection().send_method_call_no_reply(msg)
    }
}

/// Builder writing a property asynchronously.
///
/// The value is attached with [`to_value`] and the write commits on
/// [`upon_reply_invoke`] or [`get_result_as_future`].
///
/// [`to_value`]: AsyncPropertySetter::to_value
/// [`upon_reply_invoke`]: AsyncPropertySetter::upon_reply_invoke
/// [`get_result_as_future`]: AsyncPropertySetter::get_result_as_future
#[must_use]
pub struct AsyncPropertySetter<'a> {
    proxy: &'a Proxy,
    name: Box<str>,
    interface: Option<Box<str>>,
    timeout: Option<Duration>,
    value: Option<Variant>,
}

impl<'a> AsyncPropertySetter<'a> {
    pub(super) fn new(proxy: &'a Proxy, name: &str) -> Self {
        Self {
            proxy,
            name: Box::from(name),
            interface: None,
            timeout: None,
            value: None,
        }
    }

    /// Set the interface the property belongs to.
    pub fn on_interface(mut self, interface: &str) -> Self {
        self.interface = Some(Box::from(interface));
        self
    }

    /// Set the call timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        assert!(
            self.interface.is_some(),
            "on_interface() must be called before with_timeout()"
        );

        self.timeout = Some(timeout);
        self
    }

    /// Attach the value to write.
    pub fn to_value<T>(mut self, value: &T) -> Result<Self>
    where
        T: ?Sized + Storable,
    {
        assert!(
            self.interface.is_some(),
            "on_interface() must be called before to_value()"
        );

        self.value = Some(Variant::new(value)?);
        Ok(self)
    }

    /// Commit the write, delivering the acknowledgement to `f` on the
    /// dispatch thread.
    pub fn upon_reply_invoke<F>(self, f: F) -> Result<PendingAsyncCall>
    where
        F: FnOnce(Result<()>) + Send + 'static,
    {
        let interface = interface_or_err(&self.interface, "property write")?;
        let timeout = self.timeout.unwrap_or(DEFAULT_METHOD_TIMEOUT);

        let Some(value) = self.value else {
            return Err(Error::invalid_args(
                "property write has no value; to_value() was not called",
            ));
        };

        let mut msg = self
            .proxy
            .create_method_call(names::PROPERTIES, names::SET);
        msg.append(&(&*interface, &*self.name, value))?;

        self.proxy.call_async(
            msg,
            move |result| {
                f(result.and_then(|mut reply| reply.read::<()>()));
            },
            timeout,
        )
    }

    /// Commit the write, resolving the returned future once acknowledged.
    pub fn get_result_as_future(self) -> Result<CallFuture<()>> {
        let (send, recv) = oneshot::channel();

        let pending = self.upon_reply_invoke(move |result| {
            let _ = send.send(result);
        })?;

        Ok(CallFuture::new(pending, recv))
    }
}

/// Builder reading every property of an interface.
#[must_use]
pub struct AllPropertiesGetter<'a> {
    proxy: &'a Proxy,
    interface: Option<Box<str>>,
    timeout: Option<Duration>,
}

impl<'a> AllPropertiesGetter<'a> {
    pub(super) fn new(proxy: &'a Proxy) -> Self {
        Self {
            proxy,
            interface: None,
            timeout: None,
        }
    }

    /// Set the interface to read.
    pub fn on_interface(mut self, interface: &str) -> Self {
        self.interface = Some(Box::from(interface));
        self
    }

    /// Set the call timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        assert!(
            self.interface.is_some(),
            "on_interface() must be called before with_timeout()"
        );

        self.timeout = Some(timeout);
        self
    }

    /// Read all property values of the interface.
    pub fn get(self) -> Result<HashMap<String, Variant>> {
        let interface = interface_or_err(&self.interface, "properties read")?;
        let timeout = self.timeout.unwrap_or(DEFAULT_METHOD_TIMEOUT);

        let msg = get_all_call(self.proxy, &interface)?;
        let mut reply = self.proxy.call(msg, timeout)?;
        reply.read::<HashMap<String, Variant>>()
    }
}

/// Builder reading every property of an interface asynchronously.
#[must_use]
pub struct AsyncAllPropertiesGetter<'a> {
    proxy: &'a Proxy,
    interface: Option<Box<str>>,
    timeout: Option<Duration>,
}

impl<'a> AsyncAllPropertiesGetter<'a> {
    pub(super) fn new(proxy: &'a Proxy) -> Self {
        Self {
            proxy,
            interface: None,
            timeout: None,
        }
    }

    /// Set the interface to read.
    pub fn on_interface(mut self, interface: &str) -> Self {
        self.interface = Some(Box::from(interface));
        self
    }

    /// Set the call timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        assert!(
            self.interface.is_some(),
            "on_interface() must be called before with_timeout()"
        );

        self.timeout = Some(timeout);
        self
    }

    /// Commit the read, delivering the property map to `f` on the dispatch
    /// thread.
    pub fn upon_reply_invoke<F>(self, f: F) -> Result<PendingAsyncCall>
    where
        F: FnOnce(Result<HashMap<String, Variant>>) + Send + 'static,
    {
        let interface = interface_or_err(&self.interface, "properties read")?;
        let timeout = self.timeout.unwrap_or(DEFAULT_METHOD_TIMEOUT);
        let msg = get_all_call(self.proxy, &interface)?;

        self.proxy.call_async(
            msg,
            move |result| {
                f(result.and_then(|mut reply| reply.read::<HashMap<String, Variant>>()));
            },
            timeout,
        )
    }

    /// Commit the read, resolving the returned future with the property
    /// map.
    pub fn get_result_as_future(self) -> Result<CallFuture<HashMap<String, Variant>>> {
        let (send, recv) = oneshot::channel();

        let pending = self.upon_reply_invoke(move |result| {
            let _ = send.send(result);
        })?;

        Ok(CallFuture::new(pending, recv))
    }
}

fn get_call(proxy: &Proxy, interface: &str, name: &str) -> Result<Message> {
    let mut msg = proxy.create_method_call(names::PROPERTIES, names::GET);
    msg.append(&(interface, name))?;
    Ok(msg)
}

fn set_call<T>(proxy: &Proxy, interface: &str, name: &str, value: &T) -> Result<Message>
where
    T: ?Sized + Storable,
{
    let mut msg = proxy.create_method_call(names::PROPERTIES, names::SET);
    msg.append(&(interface, name, Variant::new(value)?))?;
    Ok(msg)
}

fn get_all_call(proxy: &Proxy, interface: &str) -> Result<Message> {
    let mut msg = proxy.create_method_call(names::PROPERTIES, names::GET_ALL);
    msg.append(&interface)?;
    Ok(msg)
}
