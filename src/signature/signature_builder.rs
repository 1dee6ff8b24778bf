use std::ops::Deref;

use super::{
    Signature, SignatureBuf, SignatureError, SignatureErrorKind, MAX_CONTAINER_DEPTH, MAX_DEPTH,
    MAX_SIGNATURE,
};

/// An incremental D-Bus signature builder.
///
/// This ensures that the composed signature does not violate the maximum
/// length and nesting requirements imposed by the D-Bus specification.
///
/// Dereferences to the [`Signature`] built so far.
#[derive(Clone)]
pub struct SignatureBuilder {
    data: [u8; MAX_SIGNATURE],
    len: usize,
    structs: usize,
    arrays: usize,
}

impl SignatureBuilder {
    /// Construct a new empty signature builder.
    pub const fn new() -> Self {
        Self {
            data: [0; MAX_SIGNATURE],
            len: 0,
            structs: 0,
            arrays: 0,
        }
    }

    /// Construct from an owned signature.
    pub fn from_signature_buf(signature: SignatureBuf) -> Self {
        let mut this = Self::new();
        let ok = this.extend_from_signature(&*signature);
        debug_assert!(ok, "a signature always fits an empty builder");
        this
    }

    /// Coerce into a borrowed signature.
    pub fn to_signature(&self) -> &Signature {
        // SAFETY: Only well-formed fragments are pushed onto the builder.
        unsafe { Signature::new_unchecked(&self.data[..self.len]) }
    }

    /// Coerce into an owned signature.
    pub fn to_signature_buf(&self) -> SignatureBuf {
        SignatureBuf::from_signature(self.to_signature())
    }

    /// Open an array in the signature.
    pub fn open_array(&mut self) -> Result<(), SignatureError> {
        if self.arrays == MAX_CONTAINER_DEPTH || self.structs + self.arrays == MAX_DEPTH {
            return Err(SignatureError::new(
                SignatureErrorKind::ExceededMaximumArrayRecursion,
            ));
        }

        if !self.push(b'a') {
            return Err(SignatureError::too_long());
        }

        self.arrays += 1;
        Ok(())
    }

    /// Close an array in the signature.
    pub fn close_array(&mut self) {
        self.arrays -= 1;
    }

    /// Open a struct in the signature.
    pub fn open_struct(&mut self) -> Result<(), SignatureError> {
        if self.structs == MAX_CONTAINER_DEPTH || self.structs + self.arrays == MAX_DEPTH {
            return Err(SignatureError::new(
                SignatureErrorKind::ExceededMaximumStructRecursion,
            ));
        }

        if !self.push(b'(') {
            return Err(SignatureError::too_long());
        }

        self.structs += 1;
        Ok(())
    }

    /// Close a struct in the signature.
    pub fn close_struct(&mut self) -> Result<(), SignatureError> {
        if !self.push(b')') {
            return Err(SignatureError::too_long());
        }

        self.structs -= 1;
        Ok(())
    }

    /// Open a dict entry in the signature.
    ///
    /// Dict entries count against the struct nesting limit.
    pub fn open_dict_entry(&mut self) -> Result<(), SignatureError> {
        if self.structs == MAX_CONTAINER_DEPTH || self.structs + self.arrays == MAX_DEPTH {
            return Err(SignatureError::new(
                SignatureErrorKind::ExceededMaximumDictRecursion,
            ));
        }

        if !self.push(b'{') {
            return Err(SignatureError::too_long());
        }

        self.structs += 1;
        Ok(())
    }

    /// Close a dict entry in the signature.
    pub fn close_dict_entry(&mut self) -> Result<(), SignatureError> {
        if !self.push(b'}') {
            return Err(SignatureError::too_long());
        }

        self.structs -= 1;
        Ok(())
    }

    /// Clear the current signature.
    pub fn clear(&mut self) {
        self.len = 0;
        self.structs = 0;
        self.arrays = 0;
    }

    /// Extend this signature with another complete signature.
    #[must_use = "Return value must be observed to indicate an error"]
    pub fn extend_from_signature<S>(&mut self, other: S) -> bool
    where
        S: AsRef<Signature>,
    {
        let bytes = other.as_ref().as_bytes();

        if self.len + bytes.len() > MAX_SIGNATURE {
            return false;
        }

        self.data[self.len..self.len + bytes.len()].copy_from_slice(bytes);
        self.len += bytes.len();
        true
    }

    fn push(&mut self, byte: u8) -> bool {
        if self.len == MAX_SIGNATURE {
            return false;
        }

        self.data[self.len] = byte;
        self.len += 1;
        true
    }
}

impl Default for SignatureBuilder {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for SignatureBuilder {
    type Target = Signature;

    #[inline]
    fn deref(&self) -> &Self::Target {
        self.to_signature()
    }
}

impl PartialEq for SignatureBuilder {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.to_signature() == other.to_signature()
    }
}

impl Eq for SignatureBuilder {}
