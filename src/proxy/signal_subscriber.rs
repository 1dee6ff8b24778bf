use std::sync::Arc;

use crate::connection::SignalCallback;
use crate::{Error, Loadable, Message, Result, Slot};

use super::Proxy;

/// Builder subscribing to a signal on a [`Proxy`].
///
/// Handlers come in two flavours: the pure [`call`] variant receives the
/// decoded payload and silently drops signals that fail to deserialize,
/// while [`call_with_error`] receives the deserialization outcome either
/// way. Both register a floating subscription owned by the proxy and keyed
/// by (interface, member); the `_with_slot` variants hand the subscription
/// slot to the caller instead.
///
/// [`call`]: SignalSubscriber::call
/// [`call_with_error`]: SignalSubscriber::call_with_error
#[must_use]
pub struct SignalSubscriber<'a> {
    proxy: &'a Proxy,
    member: Box<str>,
    interface: Option<Box<str>>,
}

impl<'a> SignalSubscriber<'a> {
    pub(super) fn new(proxy: &'a Proxy, member: &str) -> Self {
        Self {
            proxy,
            member: Box::from(member),
            interface: None,
        }
    }

    /// Set the interface the signal belongs to.
    ///
    /// Must be called before the terminal step.
    pub fn on_interface(mut self, interface: &str) -> Self {
        self.interface = Some(Box::from(interface));
        self
    }

    /// Subscribe with a pure handler; the subscription is owned by the
    /// proxy.
    ///
    /// Signals whose payload does not deserialize into `T` are dropped.
    pub fn call<T, F>(self, f: F) -> Result<()>
    where
        T: Loadable,
        F: Fn(T) + Send + Sync + 'static,
    {
        let handler = pure_handler(self.member.clone(), f);
        self.finish_floating(handler)
    }

    /// Subscribe with a pure handler, handing the subscription slot to the
    /// caller.
    pub fn call_with_slot<T, F>(self, f: F) -> Result<Slot>
    where
        T: Loadable,
        F: Fn(T) + Send + Sync + 'static,
    {
        let handler = pure_handler(self.member.clone(), f);
        self.finish_returned(handler)
    }

    /// Subscribe with an error-taking handler; the subscription is owned by
    /// the proxy.
    ///
    /// The handler receives the deserialization outcome of every matching
    /// signal.
    pub fn call_with_error<T, F>(self, f: F) -> Result<()>
    where
        T: Loadable,
        F: Fn(Result<T>) + Send + Sync + 'static,
    {
        let handler = error_handler(f);
        self.finish_floating(handler)
    }

    /// Subscribe with an error-taking handler, handing the subscription
    /// slot to the caller.
    pub fn call_with_error_and_slot<T, F>(self, f: F) -> Result<Slot>
    where
        T: Loadable,
        F: Fn(Result<T>) + Send + Sync + 'static,
    {
        let handler = error_handler(f);
        self.finish_returned(handler)
    }

    fn interface(&self) -> Result<&str> {
        self.interface.as_deref().ok_or_else(|| {
            Error::invalid_args(format!(
                "subscription to {} has no interface; on_interface() was not called",
                self.member
            ))
        })
    }

    fn finish_floating(self, handler: SignalCallback) -> Result<()> {
        let interface = self.interface()?.to_owned();
        let slot = self
            .proxy
            .subscribe_callback(&interface, &self.member, handler)?;
        self.proxy.store_subscription(&interface, &self.member, slot);
        Ok(())
    }

    fn finish_returned(self, handler: SignalCallback) -> Result<Slot> {
        let interface = self.interface()?.to_owned();
        self.proxy
            .subscribe_callback(&interface, &self.member, handler)
    }
}

fn pure_handler<T, F>(member: Box<str>, f: F) -> SignalCallback
where
    T: Loadable,
    F: Fn(T) + Send + Sync + 'static,
{
    Arc::new(move |msg: &Message| {
        let mut body = msg.body();

        match body.read::<T>() {
            Ok(args) => f(args),
            Err(error) => {
                tracing::debug!(member = &*member, "dropping signal: {error}");
            }
        }
    })
}

fn error_handler<T, F>(f: F) -> SignalCallback
where
    T: Loadable,
    F: Fn(Result<T>) + Send + Sync + 'static,
{
    Arc::new(move |msg: &Message| {
        let mut body = msg.body();
        f(body.read::<T>());
    })
}
