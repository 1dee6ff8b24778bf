use std::num::NonZeroU32;

use crate::connection::MethodSink;
use crate::{Error, Message, Result, SignatureBuf, Storable};

/// The movable reply slot of a method call being served.
///
/// A handler satisfies the call with [`send`] or [`send_error`], either
/// inside the handler or later from any thread, which is how truly
/// asynchronous server-side methods are written. Dropping the slot without
/// replying sends an internal error back, so a caller is never left waiting,
/// unless the call was flagged no-reply.
///
/// [`send`]: MethodResult::send
/// [`send_error`]: MethodResult::send_error
#[must_use]
pub struct MethodResult {
    inner: Option<ResultInner>,
}

struct ResultInner {
    reply_serial: NonZeroU32,
    destination: Option<Box<str>>,
    sender: Option<Box<str>>,
    no_reply: bool,
    output_signature: Option<SignatureBuf>,
    sink: MethodSink,
}

impl MethodResult {
    /// Construct a reply slot for `call`.
    ///
    /// `output_signature` is the declared reply signature; replies are
    /// checked against it when present.
    pub(crate) fn new(
        call: &Message,
        output_signature: Option<SignatureBuf>,
        sink: MethodSink,
    ) -> Result<Self> {
        let Some(reply_serial) = call.serial() else {
            return Err(Error::internal("cannot reply to a call without a serial"));
        };

        Ok(Self {
            inner: Some(ResultInner {
                reply_serial,
                destination: call.sender().map(Box::from),
                sender: call.destination().map(Box::from),
                no_reply: call.no_reply(),
                output_signature,
                sink,
            }),
        })
    }

    /// Satisfy the call with reply values.
    ///
    /// A no-op for calls flagged no-reply.
    ///
    /// # Errors
    ///
    /// Errors if the values do not match the method's declared reply
    /// signature; the caller receives an internal error reply in that case.
    pub fn send<T>(mut self, values: &T) -> Result<()>
    where
        T: ?Sized + Storable,
    {
        let Some(inner) = self.inner.take() else {
            return Ok(());
        };

        if inner.no_reply {
            return Ok(());
        }

        let mut reply = reply_message(&inner);

        if let Err(error) = reply.append(values) {
            inner.send_error(&error);
            return Err(error);
        }

        if let Some(expected) = &inner.output_signature {
            if reply.signature() != &**expected {
                let error = Error::internal(format!(
                    "reply signature {} does not match declared {expected}",
                    reply.signature()
                ));
                inner.send_error(&error);
                return Err(error);
            }
        }

        (inner.sink)(reply);
        Ok(())
    }

    /// Satisfy the call with an error.
    ///
    /// A no-op for calls flagged no-reply.
    pub fn send_error(mut self, error: &Error) {
        let Some(inner) = self.inner.take() else {
            return;
        };

        if inner.no_reply {
            return;
        }

        inner.send_error(error);
    }
}

impl Drop for MethodResult {
    fn drop(&mut self) {
        let Some(inner) = self.inner.take() else {
            return;
        };

        if inner.no_reply {
            return;
        }

        tracing::warn!(
            reply_serial = inner.reply_serial.get(),
            "method handler dropped its reply slot without replying"
        );

        inner.send_error(&Error::internal("method handler did not produce a reply"));
    }
}

impl ResultInner {
    fn send_error(self, error: &Error) {
        let mut reply = Message::error_raw(error.name(), self.reply_serial);

        if let Some(destination) = &self.destination {
            reply = reply.with_destination(destination);
        }

        if let Some(sender) = &self.sender {
            reply = reply.with_sender(sender);
        }

        if reply.append(&error.to_string()).is_err() {
            tracing::error!("could not append error text to error reply");
        }

        (self.sink)(reply);
    }
}

fn reply_message(inner: &ResultInner) -> Message {
    let mut reply = Message::method_return_raw(inner.reply_serial);

    if let Some(destination) = &inner.destination {
        reply = reply.with_destination(destination);
    }

    if let Some(sender) = &inner.sender {
        reply = reply.with_sender(sender);
    }

    reply
}
