use std::num::NonZeroU32;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Duration;

use parking_lot::Mutex;

use crate::connection::{
    reply_to_result, BusConnection, ObjectDescriptor, SignalCallback, SignalMatch,
};
use crate::{
    CallCompletion, Error, ErrorKind, Message, MethodReplyHandler, ObjectPath, PendingAsyncCall,
    Proxy, Result, Slot,
};

const SERVICE: &str = "com.example.Service";
const IFACE: &str = "com.example.Interface";
const PATH: &ObjectPath = ObjectPath::new_const(b"/com/example/Object");

type Responder = Box<dyn Fn(Message) -> Result<Message> + Send>;

/// Records every dispatched call, optionally answering through a canned
/// responder; completions without a responder are parked for the test to
/// finish by hand.
#[derive(Default)]
struct MockConnection {
    serial: AtomicU32,
    calls: Mutex<Vec<SentCall>>,
    held: Mutex<Vec<CallCompletion>>,
    responder: Mutex<Option<Responder>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct SentCall {
    member: String,
    no_reply: bool,
    handler_registered: bool,
}

impl MockConnection {
    fn new() -> Arc<MockConnection> {
        Arc::new(MockConnection::default())
    }

    fn respond_with<F>(&self, responder: F)
    where
        F: Fn(Message) -> Result<Message> + Send + 'static,
    {
        *self.responder.lock() = Some(Box::new(responder));
    }

    fn sent(&self) -> Vec<SentCall> {
        self.calls.lock().clone()
    }

    fn held_completions(&self) -> usize {
        self.held.lock().len()
    }

    /// Fail every parked completion with a copy of `error`.
    fn complete_held(&self, error: Error) {
        for completion in self.held.lock().drain(..) {
            completion.complete(Err(Error::from_name(error.name(), &error.to_string())));
        }
    }

    fn prepare(&self, mut msg: Message, handler_registered: bool) -> Message {
        let serial = self.serial.fetch_add(1, Ordering::Relaxed) + 1;
        msg = msg.with_serial(NonZeroU32::new(serial).unwrap_or(NonZeroU32::MIN));
        msg.seal();

        self.calls.lock().push(SentCall {
            member: msg.member().unwrap_or_default().to_owned(),
            no_reply: msg.no_reply(),
            handler_registered,
        });

        msg
    }
}

impl BusConnection for MockConnection {
    fn send_method_call_sync(&self, msg: Message, _timeout: Duration) -> Result<Message> {
        let msg = self.prepare(msg, false);

        match &*self.responder.lock() {
            Some(responder) => responder(msg).and_then(reply_to_result),
            None => Err(Error::timeout()),
        }
    }

    fn send_method_call_async(
        &self,
        msg: Message,
        handler: MethodReplyHandler,
        _timeout: Duration,
    ) -> Result<PendingAsyncCall> {
        let msg = self.prepare(msg, true);
        let (completion, pending) = CallCompletion::new(handler);

        match &*self.responder.lock() {
            Some(responder) => completion.complete(responder(msg).and_then(reply_to_result)),
            None => self.held.lock().push(completion),
        }

        Ok(pending)
    }

    fn send_method_call_no_reply(&self, mut msg: Message) -> Result<()> {
        msg.set_no_reply();
        self.prepare(msg, false);
        Ok(())
    }

    fn send_signal(&self, _msg: Message) -> Result<()> {
        Ok(())
    }

    fn register_object(&self, _path: &ObjectPath, _object: ObjectDescriptor) -> Result<Slot> {
        Ok(Slot::new(|| {}))
    }

    fn subscribe(&self, _match_rule: &SignalMatch, _handler: SignalCallback) -> Result<Slot> {
        Ok(Slot::new(|| {}))
    }

    fn dispatch_thread_invoke(&self, f: Box<dyn FnOnce() + Send>) {
        f();
    }
}

fn proxy(mock: &Arc<MockConnection>) -> Proxy {
    Proxy::new(mock.clone(), SERVICE, PATH)
}

#[test]
fn create_method_call_addresses_the_proxy() {
    let mock = MockConnection::new();
    let p = proxy(&mock);

    let msg = p.create_method_call(IFACE, "Frobnicate");
    assert_eq!(msg.member(), Some("Frobnicate"));
    assert_eq!(msg.interface(), Some(IFACE));
    assert_eq!(msg.destination(), Some(SERVICE));
    assert_eq!(msg.path().map(ObjectPath::as_str), Some("/com/example/Object"));
}

#[test]
fn dont_expect_reply_registers_no_handler() -> Result<()> {
    let mock = MockConnection::new();
    let p = proxy(&mock);

    p.call_method("Ping")
        .on_interface(IFACE)
        .dont_expect_reply()
        .send()?;

    let sent = mock.sent();
    assert_eq!(
        sent,
        [SentCall {
            member: String::from("Ping"),
            no_reply: true,
            handler_registered: false,
        }]
    );
    assert_eq!(mock.held_completions(), 0);
    Ok(())
}

#[test]
fn invoker_commits_on_drop() {
    let mock = MockConnection::new();
    let p = proxy(&mock);

    {
        let _invoker = p.call_method("Ping").on_interface(IFACE);
    }

    let sent = mock.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].member, "Ping");
    assert!(!sent[0].no_reply);
    assert!(sent[0].handler_registered);
}

#[test]
fn invoker_abandons_commit_while_unwinding() {
    let mock = MockConnection::new();
    let p = proxy(&mock);

    let outcome = catch_unwind(AssertUnwindSafe(|| {
        let _invoker = p.call_method("Ping").on_interface(IFACE);
        panic!("scope failure");
    }));

    assert!(outcome.is_err());
    assert!(mock.sent().is_empty());
}

#[test]
fn invoker_drop_commit_without_interface_panics() {
    let mock = MockConnection::new();
    let p = proxy(&mock);

    let outcome = catch_unwind(AssertUnwindSafe(|| {
        let _invoker = p.call_method("Ping");
    }));

    assert!(outcome.is_err());
    assert!(mock.sent().is_empty());
}

#[test]
fn arguments_before_interface_are_a_programming_error() {
    let mock = MockConnection::new();
    let p = proxy(&mock);

    let outcome = catch_unwind(AssertUnwindSafe(|| {
        let _ = p.call_method("Ping").with_arguments(&1u32);
    }));

    assert!(outcome.is_err());
}

#[test]
fn sync_reply_decodes_into_results() -> Result<()> {
    let mock = MockConnection::new();
    mock.respond_with(|call| {
        let mut reply = call.method_return()?;
        reply.append(&(7i32, "seven"))?;
        Ok(reply)
    });

    let p = proxy(&mock);

    let (n, s): (i32, String) = p.call_method("Describe").on_interface(IFACE).reply()?;
    assert_eq!(n, 7);
    assert_eq!(s, "seven");
    Ok(())
}

#[test]
fn callback_receives_deserialization_failures() -> Result<()> {
    let mock = MockConnection::new();
    mock.respond_with(|call| {
        let mut reply = call.method_return()?;
        reply.append(&"not a number")?;
        Ok(reply)
    });

    let p = proxy(&mock);
    let (send, recv) = mpsc::channel();

    p.call_method_async("Describe")
        .on_interface(IFACE)
        .upon_reply_invoke::<i32, _>(move |result| {
            let _ = send.send(result);
        })?;

    let result = recv.recv_timeout(Duration::from_secs(1)).expect("callback");
    assert!(matches!(
        result.unwrap_err().kind(),
        ErrorKind::DeserializationFailure(..)
    ));
    Ok(())
}

#[test]
fn cancelling_a_held_call_suppresses_the_handler() -> Result<()> {
    let mock = MockConnection::new();
    let p = proxy(&mock);
    let fired = Arc::new(AtomicUsize::new(0));

    let pending = {
        let fired = fired.clone();

        p.call_method_async("Slow")
            .on_interface(IFACE)
            .upon_reply_invoke::<(), _>(move |_| {
                fired.fetch_add(1, Ordering::SeqCst);
            })?
    };

    assert_eq!(mock.held_completions(), 1);
    assert!(pending.is_pending());

    pending.cancel();
    mock.complete_held(Error::timeout());

    assert_eq!(fired.load(Ordering::SeqCst), 0);
    Ok(())
}

#[test]
fn dropping_the_proxy_cancels_in_flight_calls() -> Result<()> {
    let mock = MockConnection::new();
    let p = proxy(&mock);
    let fired = Arc::new(AtomicUsize::new(0));

    {
        let fired = fired.clone();

        p.call_method_async("Slow")
            .on_interface(IFACE)
            .upon_reply_invoke::<(), _>(move |_| {
                fired.fetch_add(1, Ordering::SeqCst);
            })?;
    }

    drop(p);
    mock.complete_held(Error::timeout());

    assert_eq!(fired.load(Ordering::SeqCst), 0);
    Ok(())
}

#[test]
fn timeouts_are_delivered_through_the_callback() -> Result<()> {
    let mock = MockConnection::new();
    let p = proxy(&mock);
    let (send, recv) = mpsc::channel();

    p.call_method_async("Slow")
        .on_interface(IFACE)
        .upon_reply_invoke::<(), _>(move |result| {
            let _ = send.send(result);
        })?;

    mock.complete_held(Error::timeout());

    let result = recv.recv_timeout(Duration::from_secs(1)).expect("callback");
    assert!(matches!(result.unwrap_err().kind(), ErrorKind::Timeout));
    Ok(())
}

#[test]
fn async_setter_requires_a_value() {
    let mock = MockConnection::new();
    let p = proxy(&mock);

    let result = p
        .set_property_async("Speed")
        .on_interface(IFACE)
        .upon_reply_invoke(|_| {});

    assert!(result.is_err());
    assert!(mock.sent().is_empty());
}
