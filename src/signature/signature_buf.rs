use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;

use super::{validate, Signature, SignatureError, MAX_SIGNATURE};

/// An owned D-Bus signature.
///
/// Stored inline with a fixed capacity, since a signature can never exceed
/// 255 bytes.
///
/// # Examples
///
/// ```
/// use busline::{Signature, SignatureBuf};
///
/// let sig = SignatureBuf::new("a{sv}")?;
/// assert_eq!(&*sig, Signature::new("a{sv}")?);
/// # Ok::<_, busline::SignatureError>(())
/// ```
#[derive(Clone)]
pub struct SignatureBuf {
    data: [u8; MAX_SIGNATURE],
    len: usize,
}

impl SignatureBuf {
    /// Construct a new empty signature.
    ///
    /// # Examples
    ///
    /// ```
    /// use busline::{Signature, SignatureBuf};
    ///
    /// assert_eq!(&*SignatureBuf::empty(), Signature::EMPTY);
    /// ```
    pub const fn empty() -> Self {
        Self {
            data: [0; MAX_SIGNATURE],
            len: 0,
        }
    }

    /// Construct and validate an owned signature.
    ///
    /// # Errors
    ///
    /// Errors if the candidate is not a well-formed D-Bus signature.
    pub fn new(signature: &str) -> Result<Self, SignatureError> {
        validate(signature.as_bytes())?;
        // SAFETY: The byte slice has just been validated.
        Ok(unsafe { Self::from_slice_unchecked(signature.as_bytes()) })
    }

    /// Construct an owned signature from a borrowed one.
    pub fn from_signature(signature: &Signature) -> Self {
        // SAFETY: The source is already a valid signature.
        unsafe { Self::from_slice_unchecked(signature.as_bytes()) }
    }

    /// Construct from a raw slice.
    ///
    /// # Safety
    ///
    /// The caller must ensure `bytes` is a valid signature.
    pub(crate) unsafe fn from_slice_unchecked(bytes: &[u8]) -> Self {
        debug_assert!(bytes.len() <= MAX_SIGNATURE);
        let mut data = [0; MAX_SIGNATURE];
        data[..bytes.len()].copy_from_slice(bytes);

        Self {
            data,
            len: bytes.len(),
        }
    }

    /// Coerce into a borrowed [`Signature`].
    #[inline]
    pub fn as_signature(&self) -> &Signature {
        // SAFETY: Construction ensures the contents are a valid signature.
        unsafe { Signature::new_unchecked(&self.data[..self.len]) }
    }
}

impl Deref for SignatureBuf {
    type Target = Signature;

    #[inline]
    fn deref(&self) -> &Self::Target {
        self.as_signature()
    }
}

impl AsRef<Signature> for SignatureBuf {
    #[inline]
    fn as_ref(&self) -> &Signature {
        self
    }
}

impl Borrow<Signature> for SignatureBuf {
    #[inline]
    fn borrow(&self) -> &Signature {
        self
    }
}

impl From<&Signature> for SignatureBuf {
    #[inline]
    fn from(signature: &Signature) -> Self {
        SignatureBuf::from_signature(signature)
    }
}

impl fmt::Debug for SignatureBuf {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_signature(), f)
    }
}

impl fmt::Display for SignatureBuf {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.as_signature(), f)
    }
}

impl PartialEq for SignatureBuf {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.as_signature() == other.as_signature()
    }
}

impl Eq for SignatureBuf {}

impl PartialEq<Signature> for SignatureBuf {
    #[inline]
    fn eq(&self, other: &Signature) -> bool {
        self.as_signature() == other
    }
}

impl PartialEq<str> for SignatureBuf {
    #[inline]
    fn eq(&self, other: &str) -> bool {
        self.as_signature() == other
    }
}

impl PartialEq<&str> for SignatureBuf {
    #[inline]
    fn eq(&self, other: &&str) -> bool {
        self.as_signature() == *other
    }
}

impl Hash for SignatureBuf {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_signature().hash(state);
    }
}
