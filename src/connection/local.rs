use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, ThreadId};
use std::time::Duration;

use parking_lot::Mutex;

use super::{
    reply_to_result, BusConnection, MethodSink, ObjectDescriptor, SignalCallback, SignalMatch,
};
use crate::proto::MessageType;
use crate::{
    CallCompletion, Error, Message, MethodReplyHandler, ObjectPath, ObjectPathBuf,
    PendingAsyncCall, Result, Slot,
};

type Work = Box<dyn FnOnce() + Send>;

/// An in-process bus.
///
/// `LocalBus` routes method calls, replies and signals between the
/// [`Object`]s and [`Proxy`]s registered on it, without a daemon or a
/// socket. All handlers run on a dedicated dispatch thread, one at a time,
/// in the order the bus accepted the messages.
///
/// [`Object`]: crate::Object
/// [`Proxy`]: crate::Proxy
///
/// # Examples
///
/// ```
/// use busline::{BusConnection, LocalBus};
///
/// let bus = LocalBus::builder().build()?;
///
/// bus.dispatch_thread_invoke(Box::new(|| {
///     // runs on the dispatch thread
/// }));
/// # Ok::<_, busline::Error>(())
/// ```
pub struct LocalBus {
    inner: Arc<Inner>,
}

struct Inner {
    work: Mutex<mpsc::Sender<Work>>,
    state: Mutex<State>,
    dispatch_thread: ThreadId,
    default_timeout: Duration,
    next_serial: AtomicU32,
    next_subscription: AtomicU64,
}

struct State {
    objects: HashMap<ObjectPathBuf, ObjectDescriptor>,
    // Subscription order is delivery order.
    subscriptions: Vec<(u64, SignalMatch, SignalCallback)>,
}

/// Builder for a [`LocalBus`].
pub struct LocalBusBuilder {
    thread_name: String,
    default_timeout: Duration,
}

impl LocalBusBuilder {
    fn new() -> Self {
        Self {
            thread_name: String::from("busline-dispatch"),
            default_timeout: super::DEFAULT_METHOD_TIMEOUT,
        }
    }

    /// Set the name of the dispatch thread.
    #[must_use]
    pub fn with_thread_name(mut self, name: &str) -> Self {
        self.thread_name = name.to_owned();
        self
    }

    /// Set the timeout applied to synchronous calls submitted with a zero
    /// timeout.
    #[must_use]
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Build the bus and start its dispatch thread.
    pub fn build(self) -> Result<Arc<LocalBus>> {
        let (send, recv) = mpsc::channel::<Work>();

        let thread = thread::Builder::new()
            .name(self.thread_name)
            .spawn(move || {
                while let Ok(work) = recv.recv() {
                    work();
                }
            })
            .map_err(Error::internal)?;

        let inner = Arc::new(Inner {
            work: Mutex::new(send),
            state: Mutex::new(State {
                objects: HashMap::new(),
                subscriptions: Vec::new(),
            }),
            dispatch_thread: thread.thread().id(),
            default_timeout: self.default_timeout,
            next_serial: AtomicU32::new(1),
            next_subscription: AtomicU64::new(1),
        });

        Ok(Arc::new(LocalBus { inner }))
    }
}

impl LocalBus {
    /// Construct a builder for a local bus.
    pub fn builder() -> LocalBusBuilder {
        LocalBusBuilder::new()
    }

    /// The timeout applied to synchronous calls that do not carry one.
    pub fn default_timeout(&self) -> Duration {
        self.inner.default_timeout
    }

    fn next_serial(&self) -> NonZeroU32 {
        let serial = self.inner.next_serial.fetch_add(1, Ordering::Relaxed);
        NonZeroU32::new(serial).unwrap_or(NonZeroU32::MIN)
    }

    fn enqueue(&self, work: Work) -> Result<()> {
        self.inner
            .work
            .lock()
            .send(work)
            .map_err(|_| Error::disconnected())
    }

    /// Route a sealed method call to the object registered under its path.
    ///
    /// The completion, if any, is delivered on the dispatch thread.
    fn route_method_call(&self, msg: Message, completion: Option<CallCompletion>) -> Result<()> {
        let Some(path) = msg.path_buf().cloned() else {
            return Err(Error::invalid_args("method call without an object path"));
        };

        let object = self.inner.state.lock().objects.get(&path).cloned();

        let Some(object) = object else {
            let member = msg.member().unwrap_or_default().to_owned();

            if let Some(completion) = completion {
                self.enqueue(Box::new(move || {
                    completion.complete(Err(Error::unknown_method(format!(
                        "no object at {path} to call {member} on"
                    ))));
                }))?;
            }

            return Ok(());
        };

        let sink: MethodSink = match completion {
            Some(completion) => {
                let work = self.inner.work.lock().clone();

                Box::new(move |reply: Message| {
                    // Hop back onto the dispatch thread; replying from a
                    // server thread must not run the handler there. A dead
                    // queue drops the completion, which delivers the
                    // disconnection error.
                    let _ = work.send(Box::new(move || {
                        completion.complete(reply_to_result(reply));
                    }));
                })
            }
            None => Box::new(|_| {}),
        };

        self.enqueue(Box::new(move || object.dispatch(msg, sink)))
    }

    fn prepare_call(&self, mut msg: Message) -> Result<Message> {
        if msg.message_type() != MessageType::METHOD_CALL {
            return Err(Error::invalid_args("message is not a method call"));
        }

        if !msg.is_valid() {
            return Err(Error::invalid_args("method call message is malformed"));
        }

        msg = msg.with_serial(self.next_serial());
        msg.seal();
        Ok(msg)
    }
}

impl BusConnection for LocalBus {
    fn send_method_call_sync(&self, msg: Message, timeout: Duration) -> Result<Message> {
        if thread::current().id() == self.inner.dispatch_thread {
            return Err(Error::internal(
                "synchronous call from the dispatch thread would deadlock",
            ));
        }

        let timeout = if timeout.is_zero() {
            self.inner.default_timeout
        } else {
            timeout
        };

        let (send, recv) = mpsc::channel();

        let handler: MethodReplyHandler = Box::new(move |result| {
            let _ = send.send(result);
        });

        let pending = self.send_method_call_async(msg, handler, timeout)?;

        match recv.recv_timeout(timeout) {
            Ok(result) => result,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                pending.cancel();
                Err(Error::timeout())
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(Error::disconnected()),
        }
    }

    fn send_method_call_async(
        &self,
        msg: Message,
        handler: MethodReplyHandler,
        _timeout: Duration,
    ) -> Result<PendingAsyncCall> {
        let msg = self.prepare_call(msg)?;
        let (completion, pending) = CallCompletion::new(handler);
        self.route_method_call(msg, Some(completion))?;
        Ok(pending)
    }

    fn send_method_call_no_reply(&self, mut msg: Message) -> Result<()> {
        msg.set_no_reply();
        let msg = self.prepare_call(msg)?;
        self.route_method_call(msg, None)
    }

    fn send_signal(&self, msg: Message) -> Result<()> {
        if msg.message_type() != MessageType::SIGNAL {
            return Err(Error::invalid_args("message is not a signal"));
        }

        if !msg.is_valid() {
            return Err(Error::invalid_args("signal message is malformed"));
        }

        let mut msg = msg.with_serial(self.next_serial());
        msg.seal();

        let handlers = {
            let state = self.inner.state.lock();

            state
                .subscriptions
                .iter()
                .filter(|(_, rule, _)| rule.matches(&msg))
                .map(|(_, _, handler)| handler.clone())
                .collect::<Vec<_>>()
        };

        self.enqueue(Box::new(move || {
            for handler in handlers {
                handler(&msg);
            }
        }))
    }

    fn register_object(&self, path: &ObjectPath, object: ObjectDescriptor) -> Result<Slot> {
        use std::collections::hash_map::Entry;

        let path = path.to_owned();

        match self.inner.state.lock().objects.entry(path.clone()) {
            Entry::Occupied(..) => {
                return Err(Error::invalid_args(format!(
                    "an object is already registered at {path}"
                )));
            }
            Entry::Vacant(entry) => {
                entry.insert(object);
            }
        }

        let inner = Arc::downgrade(&self.inner);

        Ok(Slot::new(move || {
            if let Some(inner) = inner.upgrade() {
                inner.state.lock().objects.remove(&path);
            }
        }))
    }

    fn subscribe(&self, match_rule: &SignalMatch, handler: SignalCallback) -> Result<Slot> {
        let id = self.inner.next_subscription.fetch_add(1, Ordering::Relaxed);

        self.inner
            .state
            .lock()
            .subscriptions
            .push((id, match_rule.clone(), handler));

        let inner = Arc::downgrade(&self.inner);

        Ok(Slot::new(move || {
            if let Some(inner) = inner.upgrade() {
                inner
                    .state
                    .lock()
                    .subscriptions
                    .retain(|(sub, _, _)| *sub != id);
            }
        }))
    }

    fn dispatch_thread_invoke(&self, f: Box<dyn FnOnce() + Send>) {
        if thread::current().id() == self.inner.dispatch_thread {
            f();
            return;
        }

        let _ = self.enqueue(f);
    }
}

impl std::fmt::Debug for LocalBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();

        f.debug_struct("LocalBus")
            .field("objects", &state.objects.len())
            .field("subscriptions", &state.subscriptions.len())
            .finish()
    }
}

