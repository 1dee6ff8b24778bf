use std::borrow::ToOwned;
use std::fmt;
use std::str::from_utf8_unchecked;

use super::{complete_type_len, validate, SignatureBuf, SignatureError, SignatureIter};

/// A borrowed, validated D-Bus signature.
///
/// The owned variant is [`SignatureBuf`].
///
/// # Examples
///
/// ```
/// use busline::Signature;
///
/// const SIG: &Signature = Signature::new_const(b"aaai");
///
/// assert!(Signature::new("a{sv}").is_ok());
/// assert!(Signature::new("a{vs}").is_err());
/// ```
#[derive(Hash, PartialEq, Eq)]
#[repr(transparent)]
pub struct Signature([u8]);

impl Signature {
    /// The empty signature.
    pub const EMPTY: &'static Signature = Signature::new_const(b"");

    /// A single byte (`y`).
    pub const BYTE: &'static Signature = Signature::new_const(b"y");

    /// A boolean (`b`).
    pub const BOOLEAN: &'static Signature = Signature::new_const(b"b");

    /// Signed 16-bit integer (`n`).
    pub const INT16: &'static Signature = Signature::new_const(b"n");

    /// Unsigned 16-bit integer (`q`).
    pub const UINT16: &'static Signature = Signature::new_const(b"q");

    /// Signed 32-bit integer (`i`).
    pub const INT32: &'static Signature = Signature::new_const(b"i");

    /// Unsigned 32-bit integer (`u`).
    pub const UINT32: &'static Signature = Signature::new_const(b"u");

    /// Signed 64-bit integer (`x`).
    pub const INT64: &'static Signature = Signature::new_const(b"x");

    /// Unsigned 64-bit integer (`t`).
    pub const UINT64: &'static Signature = Signature::new_const(b"t");

    /// IEEE 754 double (`d`).
    pub const DOUBLE: &'static Signature = Signature::new_const(b"d");

    /// A nul-terminated string (`s`).
    pub const STRING: &'static Signature = Signature::new_const(b"s");

    /// An object path (`o`).
    pub const OBJECT_PATH: &'static Signature = Signature::new_const(b"o");

    /// A signature (`g`).
    pub const SIGNATURE: &'static Signature = Signature::new_const(b"g");

    /// A variant value (`v`).
    pub const VARIANT: &'static Signature = Signature::new_const(b"v");

    /// A unix file descriptor index (`h`).
    pub const UNIX_FD: &'static Signature = Signature::new_const(b"h");

    /// Construct a new signature, panicking if it is not valid.
    ///
    /// Intended for construction in `const` position, where the panic becomes
    /// a compile error.
    ///
    /// # Examples
    ///
    /// ```
    /// use busline::Signature;
    ///
    /// const SIG: &Signature = Signature::new_const(b"a{sv}");
    /// ```
    pub const fn new_const(bytes: &[u8]) -> &Signature {
        if let Err(..) = validate(bytes) {
            panic!("invalid D-Bus signature");
        }

        // SAFETY: The byte slice has just been validated.
        unsafe { Self::new_unchecked(bytes) }
    }

    /// Construct and validate a new signature.
    ///
    /// # Errors
    ///
    /// Errors if the candidate is not a well-formed D-Bus signature.
    ///
    /// # Examples
    ///
    /// ```
    /// use busline::Signature;
    ///
    /// assert!(Signature::new("(si)").is_ok());
    /// assert!(Signature::new("(si").is_err());
    /// ```
    pub fn new(signature: &str) -> Result<&Signature, SignatureError> {
        validate(signature.as_bytes())?;
        // SAFETY: The byte slice has just been validated.
        Ok(unsafe { Self::new_unchecked(signature.as_bytes()) })
    }

    /// Construct a signature without validation.
    ///
    /// # Safety
    ///
    /// The caller must ensure `bytes` is a valid signature.
    pub(crate) const unsafe fn new_unchecked(bytes: &[u8]) -> &Signature {
        &*(bytes as *const [u8] as *const Signature)
    }

    /// Get the signature as a byte slice, without the trailing nul.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Get the signature as a string.
    #[inline]
    pub fn as_str(&self) -> &str {
        // SAFETY: Validation only admits ASCII type codes.
        unsafe { from_utf8_unchecked(&self.0) }
    }

    /// The length of the signature in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Test if the signature is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the complete types of the signature.
    ///
    /// # Examples
    ///
    /// ```
    /// use busline::Signature;
    ///
    /// let sig = Signature::new("sa{sv}(ii)")?;
    /// let types = sig.iter().map(|s| s.as_str()).collect::<Vec<_>>();
    ///
    /// assert_eq!(types, ["s", "a{sv}", "(ii)"]);
    /// # Ok::<_, busline::SignatureError>(())
    /// ```
    #[inline]
    pub fn iter(&self) -> SignatureIter<'_> {
        SignatureIter::new(self)
    }

    /// Split off the leading complete type of the signature.
    pub(crate) fn split_first(&self) -> Option<(&Signature, &Signature)> {
        if self.0.is_empty() {
            return None;
        }

        let at = complete_type_len(&self.0, 0);
        // SAFETY: A complete type and the remainder of a valid signature are
        // both valid signatures.
        unsafe {
            Some((
                Signature::new_unchecked(&self.0[..at]),
                Signature::new_unchecked(&self.0[at..]),
            ))
        }
    }

    /// Test if the signature starts with a complete prefix `other`.
    pub(crate) fn starts_with(&self, other: &Signature) -> bool {
        self.0.starts_with(&other.0)
    }

    /// Get the tail of the signature starting at byte position `at`.
    ///
    /// Positions handed in originate from cursor tracking and always fall on
    /// complete type boundaries.
    pub(crate) fn tail(&self, at: usize) -> &Signature {
        // SAFETY: `at` is a complete type boundary of a valid signature.
        unsafe { Signature::new_unchecked(&self.0[at..]) }
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({:?})", self.as_str())
    }
}

impl fmt::Display for Signature {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<Signature> for Signature {
    #[inline]
    fn as_ref(&self) -> &Signature {
        self
    }
}

impl ToOwned for Signature {
    type Owned = SignatureBuf;

    #[inline]
    fn to_owned(&self) -> Self::Owned {
        SignatureBuf::from_signature(self)
    }
}

impl PartialEq<str> for Signature {
    #[inline]
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<Signature> for str {
    #[inline]
    fn eq(&self, other: &Signature) -> bool {
        self == other.as_str()
    }
}

impl PartialEq<&Signature> for SignatureBuf {
    #[inline]
    fn eq(&self, other: &&Signature) -> bool {
        &**self == *other
    }
}

impl PartialEq<SignatureBuf> for &Signature {
    #[inline]
    fn eq(&self, other: &SignatureBuf) -> bool {
        **other == **self
    }
}

impl<'a> IntoIterator for &'a Signature {
    type Item = &'a Signature;
    type IntoIter = SignatureIter<'a>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
