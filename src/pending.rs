use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};

use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::{Error, Message, Result};

/// The handler invoked with the outcome of an asynchronous method call.
///
/// Exactly one invocation happens across reply, remote error, timeout and
/// connection loss; cancellation before dispatch suppresses the invocation
/// entirely.
pub type MethodReplyHandler = Box<dyn FnOnce(Result<Message>) + Send>;

enum CallState {
    Pending(MethodReplyHandler),
    Completed,
    Cancelled,
}

struct Shared {
    state: Mutex<CallState>,
}

/// A weak handle to an in-flight method call.
///
/// The handle can be queried for completion and cancelled from any thread.
/// After [`cancel`] returns, the reply handler is guaranteed not to run;
/// cancelling a call that has already completed is a no-op.
///
/// [`cancel`]: PendingAsyncCall::cancel
#[derive(Clone)]
pub struct PendingAsyncCall {
    shared: Weak<Shared>,
}

impl PendingAsyncCall {
    /// Test if the call is still awaiting its reply.
    pub fn is_pending(&self) -> bool {
        match self.shared.upgrade() {
            Some(shared) => matches!(*shared.state.lock(), CallState::Pending(..)),
            None => false,
        }
    }

    /// Cancel the call, unregistering its reply handler.
    ///
    /// A no-op when the call has already completed or been cancelled.
    pub fn cancel(&self) {
        let Some(shared) = self.shared.upgrade() else {
            return;
        };

        let mut state = shared.state.lock();

        if matches!(*state, CallState::Pending(..)) {
            // The handler is dropped outside the lock.
            let previous = std::mem::replace(&mut *state, CallState::Cancelled);
            drop(state);
            drop(previous);
        }
    }
}

impl std::fmt::Debug for PendingAsyncCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingAsyncCall")
            .field("pending", &self.is_pending())
            .finish()
    }
}

/// The completion half of an asynchronous method call, held by the bus
/// connection until the reply arrives.
///
/// Dropping an incomplete completion delivers a disconnection error to the
/// handler, so the exactly-once contract holds even when a connection dies
/// with calls in flight.
pub struct CallCompletion {
    shared: Arc<Shared>,
}

impl CallCompletion {
    /// Construct a completion around a reply handler, along with the weak
    /// [`PendingAsyncCall`] handle for the caller.
    pub fn new(handler: MethodReplyHandler) -> (CallCompletion, PendingAsyncCall) {
        let shared = Arc::new(Shared {
            state: Mutex::new(CallState::Pending(handler)),
        });

        let pending = PendingAsyncCall {
            shared: Arc::downgrade(&shared),
        };

        (CallCompletion { shared }, pending)
    }

    /// Test if the call has been cancelled, allowing the connection to skip
    /// producing a reply.
    pub fn is_cancelled(&self) -> bool {
        matches!(*self.shared.state.lock(), CallState::Cancelled)
    }

    /// Deliver the outcome of the call to the handler.
    ///
    /// The handler fires at most once; completing a cancelled or already
    /// completed call is a no-op.
    pub fn complete(self, result: Result<Message>) {
        if let Some(handler) = self.take_handler() {
            handler(result);
        }
    }

    fn take_handler(&self) -> Option<MethodReplyHandler> {
        let mut state = self.shared.state.lock();

        match std::mem::replace(&mut *state, CallState::Completed) {
            CallState::Pending(handler) => Some(handler),
            CallState::Cancelled => {
                *state = CallState::Cancelled;
                None
            }
            CallState::Completed => None,
        }
    }
}

impl Drop for CallCompletion {
    fn drop(&mut self) {
        if let Some(handler) = self.take_handler() {
            handler(Err(Error::disconnected()));
        }
    }
}

/// A future resolving to the reply of an asynchronous method call.
///
/// The future can be awaited, or blocked on with [`get`] from synchronous
/// code. Dropping the future cancels the underlying call.
///
/// [`get`]: CallFuture::get
pub struct CallFuture<T> {
    guard: CancelOnDrop,
    recv: oneshot::Receiver<Result<T>>,
}

struct CancelOnDrop {
    call: PendingAsyncCall,
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.call.cancel();
    }
}

impl<T> CallFuture<T> {
    pub(crate) fn new(call: PendingAsyncCall, recv: oneshot::Receiver<Result<T>>) -> Self {
        Self {
            guard: CancelOnDrop { call },
            recv,
        }
    }

    /// The pending-call handle of the underlying call.
    pub fn pending_call(&self) -> PendingAsyncCall {
        self.guard.call.clone()
    }

    /// Block the calling thread until the reply arrives.
    ///
    /// Must not be called from the connection's dispatch thread, which is
    /// where the reply would be delivered.
    pub fn get(self) -> Result<T> {
        self.recv
            .blocking_recv()
            .unwrap_or_else(|_| Err(Error::disconnected()))
    }
}

impl<T> Future for CallFuture<T> {
    type Output = Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        Pin::new(&mut this.recv)
            .poll(cx)
            .map(|result| result.unwrap_or_else(|_| Err(Error::disconnected())))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::CallCompletion;
    use crate::{Error, ErrorKind, Message, ObjectPath, Result};

    fn reply() -> Result<Message> {
        let mut m = Message::method_call(ObjectPath::new_const(b"/x"), "M");
        m.seal();
        Ok(m)
    }

    #[test]
    fn handler_fires_exactly_once() {
        let fired = Arc::new(AtomicUsize::new(0));

        let handler = {
            let fired = fired.clone();
            Box::new(move |_result: Result<Message>| {
                fired.fetch_add(1, Ordering::SeqCst);
            })
        };

        let (completion, pending) = CallCompletion::new(handler);
        assert!(pending.is_pending());

        completion.complete(reply());
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!pending.is_pending());

        // Cancelling after completion is a no-op.
        pending.cancel();
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn cancellation_suppresses_the_handler() {
        let fired = Arc::new(AtomicUsize::new(0));

        let handler = {
            let fired = fired.clone();
            Box::new(move |_result: Result<Message>| {
                fired.fetch_add(1, Ordering::SeqCst);
            })
        };

        let (completion, pending) = CallCompletion::new(handler);

        pending.cancel();
        assert!(!pending.is_pending());

        completion.complete(reply());
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn dropping_the_completion_delivers_disconnection() {
        let seen = Arc::new(AtomicUsize::new(0));

        let handler = {
            let seen = seen.clone();
            Box::new(move |result: Result<Message>| {
                if matches!(result, Err(ref e) if matches!(e.kind(), ErrorKind::Disconnected)) {
                    seen.fetch_add(1, Ordering::SeqCst);
                }
            })
        };

        let (completion, _pending) = CallCompletion::new(handler);
        drop(completion);
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn timeout_is_delivered_through_the_handler() {
        let seen = Arc::new(AtomicUsize::new(0));

        let handler = {
            let seen = seen.clone();
            Box::new(move |result: Result<Message>| {
                if matches!(result, Err(ref e) if matches!(e.kind(), ErrorKind::Timeout)) {
                    seen.fetch_add(1, Ordering::SeqCst);
                }
            })
        };

        let (completion, _pending) = CallCompletion::new(handler);
        completion.complete(Err(Error::timeout()));
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }
}
