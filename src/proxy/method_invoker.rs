use std::thread;
use std::time::Duration;

use tokio::sync::oneshot;

use crate::connection::DEFAULT_METHOD_TIMEOUT;
use crate::{
    BodyBuf, CallFuture, Error, Loadable, Message, PendingAsyncCall, Result, Storable,
};

use super::Proxy;

/// Builder for a synchronous method invocation on a [`Proxy`].
///
/// Configuration steps accumulate in order: [`on_interface`] first, then any
/// of [`with_timeout`], [`with_arguments`] and [`dont_expect_reply`]. The
/// invocation commits on the terminal [`reply`] or [`send`], or on drop at
/// the end of the enclosing scope, fire-and-forget. The drop commit is
/// suppressed while the thread is unwinding from a panic; a drop commit that
/// itself fails panics.
///
/// [`on_interface`]: MethodInvoker::on_interface
/// [`with_timeout`]: MethodInvoker::with_timeout
/// [`with_arguments`]: MethodInvoker::with_arguments
/// [`dont_expect_reply`]: MethodInvoker::dont_expect_reply
/// [`reply`]: MethodInvoker::reply
/// [`send`]: MethodInvoker::send
#[must_use = "the call is dispatched when the invoker goes out of scope"]
pub struct MethodInvoker<'a> {
    proxy: &'a Proxy,
    method: Box<str>,
    interface: Option<Box<str>>,
    timeout: Option<Duration>,
    body: BodyBuf,
    no_reply: bool,
    committed: bool,
}

impl<'a> MethodInvoker<'a> {
    pub(super) fn new(proxy: &'a Proxy, method: &str) -> Self {
        Self {
            proxy,
            method: Box::from(method),
            interface: None,
            timeout: None,
            body: BodyBuf::new(),
            no_reply: false,
            committed: false,
        }
    }

    /// Set the interface the method belongs to.
    ///
    /// Must be called before any other configuration step.
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

    /// Append the call's arguments.
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
            // A half-built call must not commit on drop.
            self.committed = true;
            return Err(error);
        }

        Ok(self)
    }

    /// Flag the call as expecting no reply.
    ///
    /// Such an invocation never blocks for a reply and registers no reply
    /// handler.
    pub fn dont_expect_reply(mut self) -> Self {
        assert!(
            self.interface.is_some(),
            "on_interface() must be called before dont_expect_reply()"
        );

        self.no_reply = true;
        self
    }

    /// Commit the call, block for the reply, and deserialize it.
    ///
    /// # Errors
    ///
    /// Errors on timeout, transport failure, a remote error reply, or when
    /// the reply does not deserialize into `R`.
    pub fn reply<R>(mut self) -> Result<R>
    where
        R: Loadable,
    {
        self.committed = true;

        if self.no_reply {
            return Err(Error::invalid_args(
                "cannot read results from a call flagged dont_expect_reply",
            ));
        }

        let msg = self.build()?;
        let timeout = self.timeout.unwrap_or(DEFAULT_METHOD_TIMEOUT);
        let mut reply = self.proxy.call(msg, timeout)?;
        reply.read::<R>()
    }

    /// Commit the call now, fire-and-forget.
    ///
    /// The explicit form of the drop commit, with failures as results.
    pub fn send(mut self) -> Result<()> {
        self.committed = true;
        self.commit()
    }

    fn build(&mut self) -> Result<Message> {
        let Some(interface) = self.interface.take() else {
            return Err(Error::invalid_args(format!(
                "call to {} has no interface; on_interface() was not called",
                self.method
            )));
        };

        let mut msg = self.proxy.create_method_call(&interface, &self.method);
        msg.set_body(std::mem::take(&mut self.body));

        if self.no_reply {
            msg.set_no_reply();
        }

        Ok(msg)
    }

    fn commit(&mut self) -> Result<()> {
        let msg = self.build()?;

        if self.no_reply {
            return self.proxy.connection().send_method_call_no_reply(msg);
        }

        let timeout = self.timeout.unwrap_or(DEFAULT_METHOD_TIMEOUT);
        let method = self.method.clone();

        // Fire-and-forget with a reply expected: the reply is awaited but
        // only observed for diagnostics.
        self.proxy.connection().send_method_call_async(
            msg,
            Box::new(move |result| {
                if let Err(error) = result {
                    tracing::debug!(method = &*method, "fire-and-forget call failed: {error}");
                }
            }),
            timeout,
        )?;

        Ok(())
    }
}

impl Drop for MethodInvoker<'_> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }

        if thread::panicking() {
            tracing::debug!(
                method = &*self.method,
                "method invocation abandoned while unwinding"
            );
            return;
        }

        self.committed = true;

        if let Err(error) = self.commit() {
            panic!("invoking method {} failed: {error}", self.method);
        }
    }
}

/// Builder for an asynchronous method invocation on a [`Proxy`].
///
/// Commits only on an explicit terminal step: [`upon_reply_invoke`] or
/// [`get_result_as_future`]. Dropping the builder without a terminal step
/// abandons the invocation.
///
/// [`upon_reply_invoke`]: AsyncMethodInvoker::upon_reply_invoke
/// [`get_result_as_future`]: AsyncMethodInvoker::get_result_as_future
#[must_use]
pub struct AsyncMethodInvoker<'a> {
    proxy: &'a Proxy,
    method: Box<str>,
    interface: Option<Box<str>>,
    timeout: Option<Duration>,
    body: BodyBuf,
}

impl<'a> AsyncMethodInvoker<'a> {
    pub(super) fn new(proxy: &'a Proxy, method: &str) -> Self {
        Self {
            proxy,
            method: Box::from(method),
            interface: None,
            timeout: None,
            body: BodyBuf::new(),
        }
    }

    /// Set the interface the method belongs to.
    ///
    /// Must be called before any other configuration step.
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

    /// Append the call's arguments.
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

        self.body.append(args)?;
        Ok(self)
    }

    /// Commit the call, delivering the deserialized reply to `f` on the
    /// dispatch thread.
    ///
    /// The callback is invoked exactly once with either the decoded reply
    /// values or an error: a remote error is passed through, and a reply
    /// that fails to deserialize into `T` is converted into an error
    /// delivered the same way.
    pub fn upon_reply_invoke<T, F>(mut self, f: F) -> Result<PendingAsyncCall>
    where
        T: Loadable,
        F: FnOnce(Result<T>) + Send + 'static,
    {
        let msg = self.build()?;
        let timeout = self.timeout.unwrap_or(DEFAULT_METHOD_TIMEOUT);

        self.proxy.call_async(
            msg,
            move |result| {
                f(result.and_then(|mut reply| reply.read::<T>()));
            },
            timeout,
        )
    }

    /// Commit the call, resolving the returned future with the deserialized
    /// reply.
    ///
    /// The future resolves to `()` for methods without outputs, a single
    /// value for one output, and a tuple for several. Remote errors and
    /// deserialization failures become the future's error.
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

    fn build(&mut self) -> Result<Message> {
        let Some(interface) = self.interface.take() else {
            return Err(Error::invalid_args(format!(
                "call to {} has no interface; on_interface() was not called",
                self.method
            )));
        };

        let mut msg = self.proxy.create_method_call(&interface, &self.method);
        msg.set_body(std::mem::take(&mut self.body));
        Ok(msg)
    }
}
