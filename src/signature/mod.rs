//! Validated D-Bus signatures and their composition.

pub use self::signature::Signature;
mod signature;

pub use self::signature_buf::SignatureBuf;
mod signature_buf;

pub use self::signature_builder::SignatureBuilder;
mod signature_builder;

pub use self::signature_error::SignatureError;
pub(crate) use self::signature_error::SignatureErrorKind;
mod signature_error;

pub use self::iter::SignatureIter;
pub(crate) use self::iter::complete_type_len;
mod iter;

pub(crate) use self::validation::validate;
mod validation;

#[cfg(test)]
mod tests;

/// The maximum length of a signature in bytes.
pub(crate) const MAX_SIGNATURE: usize = 255;

/// The maximum total container nesting depth of a signature.
pub(crate) const MAX_DEPTH: usize = 64;

/// The maximum nesting depth of a single container kind.
pub(crate) const MAX_CONTAINER_DEPTH: usize = 32;
