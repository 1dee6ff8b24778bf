//! Typed D-Bus message marshalling and dispatch.
//!
//! This crate is the client-library core that sits above a D-Bus transport:
//! it derives wire signatures from native types at compile time, marshals
//! and unmarshals message bodies through typed cursors, and dispatches
//! method calls, replies, signals and property accesses between [`Proxy`]
//! and [`Object`] handles over a [`BusConnection`] collaborator. Socket I/O,
//! authentication and introspection live behind that collaborator; the
//! in-process [`LocalBus`] ships as its reference implementation.
//!
//! # Examples
//!
//! ```no_run
//! use busline::{vtable, LocalBus, Object, ObjectPath, Proxy};
//!
//! let bus = LocalBus::builder().build()?;
//!
//! let object = Object::new(bus.clone(), ObjectPath::new("/com/example/Calculator")?)?;
//!
//! object
//!     .with_vtable(vec![vtable::method("Multiply")
//!         .with_inputs::<(i32, i32)>()
//!         .with_outputs::<i32>()
//!         .implemented_as(|call, result| {
//!             match call.read::<(i32, i32)>() {
//!                 Ok((a, b)) => drop(result.send(&(a * b))),
//!                 Err(error) => result.send_error(&error),
//!             }
//!         })?])
//!     .for_interface("com.example.Calculator")?;
//!
//! let proxy = Proxy::new(
//!     bus,
//!     "com.example.CalculatorService",
//!     ObjectPath::new("/com/example/Calculator")?,
//! );
//!
//! let product: i32 = proxy
//!     .call_method("Multiply")
//!     .on_interface("com.example.Calculator")
//!     .with_arguments(&(6i32, 7i32))?
//!     .reply()?;
//!
//! assert_eq!(product, 42);
//! # Ok::<_, busline::Error>(())
//! ```

#![deny(missing_docs)]
#![allow(clippy::module_inception)]

#[macro_use]
mod macros;

#[doc(inline)]
pub use self::proto::{Endianness, Flags};
mod proto;

pub mod org_freedesktop_dbus;

#[doc(inline)]
pub use self::error::{Error, ErrorKind, Result};
mod error;

#[doc(inline)]
pub use self::signature::{
    Signature, SignatureBuf, SignatureBuilder, SignatureError, SignatureIter,
};
mod signature;

#[doc(inline)]
pub use self::object_path::{ObjectPath, ObjectPathBuf, ObjectPathError};
mod object_path;

#[doc(inline)]
pub use self::storable::{is_trivial, signature_of, BasicType, Storable, Struct};
mod storable;

#[doc(inline)]
pub use self::loadable::Loadable;
mod loadable;

#[doc(inline)]
pub use self::body_buf::BodyBuf;
mod body_buf;

#[doc(inline)]
pub use self::body::Body;
mod body;

#[doc(inline)]
pub use self::unix_fd::UnixFd;
mod unix_fd;

#[doc(inline)]
pub use self::variant::Variant;
mod variant;

#[doc(inline)]
pub use self::dict::{AsDictionary, DictFields, UnknownKeys};
mod dict;

#[doc(inline)]
pub use self::message::{Message, MessageKind};
mod message;

#[doc(inline)]
pub use self::slot::Slot;
mod slot;

#[doc(inline)]
pub use self::pending::{CallCompletion, CallFuture, MethodReplyHandler, PendingAsyncCall};
mod pending;

#[doc(inline)]
pub use self::connection::{
    BusConnection, LocalBus, LocalBusBuilder, MethodSink, ObjectDescriptor, SignalCallback,
    SignalMatch,
};
pub mod connection;

#[doc(inline)]
pub use self::object::{MethodResult, Object, SignalEmitter, VTable, VTableAdder, VTableItem};
pub use self::object::vtable;
mod object;

#[doc(inline)]
pub use self::proxy::{
    AllPropertiesGetter, AsyncAllPropertiesGetter, AsyncMethodInvoker, AsyncPropertyGetter,
    AsyncPropertySetter, MethodInvoker, PropertyGetter, PropertySetter, Proxy, SignalSubscriber,
};
mod proxy;
