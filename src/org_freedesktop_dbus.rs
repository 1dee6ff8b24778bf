//! Names associated with the standard `org.freedesktop.DBus` interfaces.

/// The properties interface.
pub const PROPERTIES: &str = "org.freedesktop.DBus.Properties";

/// The `Get` method of the properties interface, with signature `ss` → `v`.
pub const GET: &str = "Get";

/// The `Set` method of the properties interface, with signature `ssv`.
pub const SET: &str = "Set";

/// The `GetAll` method of the properties interface, with signature `s` →
/// `a{sv}`.
pub const GET_ALL: &str = "GetAll";

/// The `PropertiesChanged` signal of the properties interface, with signature
/// `sa{sv}as`.
pub const PROPERTIES_CHANGED: &str = "PropertiesChanged";

/// Error name used when a call does not complete in time.
pub const ERROR_TIMEOUT: &str = "org.freedesktop.DBus.Error.Timeout";

/// Error name some peers use in place of [`ERROR_TIMEOUT`].
pub const ERROR_NO_REPLY: &str = "org.freedesktop.DBus.Error.NoReply";

/// Error name used when the connection is gone.
pub const ERROR_DISCONNECTED: &str = "org.freedesktop.DBus.Error.Disconnected";

/// Error name used when arguments cannot be accepted.
pub const ERROR_INVALID_ARGS: &str = "org.freedesktop.DBus.Error.InvalidArgs";

/// Error name used when a method is not present on an interface.
pub const ERROR_UNKNOWN_METHOD: &str = "org.freedesktop.DBus.Error.UnknownMethod";

/// Error name used when an interface is not present on an object.
pub const ERROR_UNKNOWN_INTERFACE: &str = "org.freedesktop.DBus.Error.UnknownInterface";

/// Error name used when a property is not present on an interface.
pub const ERROR_UNKNOWN_PROPERTY: &str = "org.freedesktop.DBus.Error.UnknownProperty";

/// Error name used when the receiver rejects an operation.
pub const ERROR_ACCESS_DENIED: &str = "org.freedesktop.DBus.Error.AccessDenied";

/// Error name used when a reply message is structurally unusable.
pub const ERROR_INVALID_REPLY: &str = "org.busline.Error.InvalidReply";

/// Error name used when a typed read out of a message body fails.
pub const ERROR_DESERIALIZATION: &str = "org.busline.Error.DeserializationFailure";

/// Error name used when an internal invariant is violated.
pub const ERROR_INTERNAL: &str = "org.busline.Error.Internal";
