use std::fmt;
use std::str::from_utf8;

use crate::{Endianness, Error, Loadable, Result, Signature};

/// The wire alignment of the complete type starting with `code`.
pub(crate) fn alignment_of_type(code: u8) -> usize {
    match code {
        b'y' | b'g' | b'v' => 1,
        b'n' | b'q' => 2,
        b'x' | b't' | b'd' | b'(' | b'{' => 8,
        // b, i, u, s, o, a, h
        _ => 4,
    }
}

/// A read cursor over a marshalled message body.
///
/// Reads are typed and consume the body's signature in order: a read of a
/// type whose signature does not match the next complete type in the body
/// fails with a deserialization error, as does a read past the end of the
/// buffer.
///
/// # Examples
///
/// ```
/// use busline::BodyBuf;
///
/// let mut body = BodyBuf::new();
/// body.append(&(42u32, "Hello World!"))?;
///
/// let mut read = body.as_body();
/// assert_eq!(read.read::<u32>()?, 42);
/// assert_eq!(read.read::<String>()?, "Hello World!");
/// # Ok::<_, busline::Error>(())
/// ```
#[derive(Clone)]
pub struct Body<'a> {
    data: &'a [u8],
    pos: usize,
    endianness: Endianness,
    signature: &'a Signature,
    sig_pos: usize,
}

impl<'a> Body<'a> {
    pub(crate) fn from_raw_parts(
        data: &'a [u8],
        endianness: Endianness,
        signature: &'a Signature,
    ) -> Self {
        Self {
            data,
            pos: 0,
            endianness,
            signature,
            sig_pos: 0,
        }
    }

    /// The full signature of the body.
    #[inline]
    pub fn signature(&self) -> &'a Signature {
        self.signature
    }

    /// The signature of the values not yet read.
    #[inline]
    pub fn remaining_signature(&self) -> &'a Signature {
        self.signature.tail(self.sig_pos)
    }

    /// The endianness values are read with.
    #[inline]
    pub fn endianness(&self) -> Endianness {
        self.endianness
    }

    /// Test if the body has been fully consumed.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sig_pos == self.signature.len()
    }

    /// Read the next value out of the body.
    ///
    /// # Errors
    ///
    /// Fails with a deserialization error if the signature of `T` does not
    /// match the body's signature at the read cursor, or if the buffer ends
    /// prematurely.
    pub fn read<T>(&mut self) -> Result<T>
    where
        T: Loadable,
    {
        let expected = crate::signature_of::<T>()?;
        let remaining = self.remaining_signature();

        if !remaining.starts_with(&expected) {
            return Err(Error::deserialization(format!(
                "expected signature {expected} at cursor, but message continues with {remaining}"
            )));
        }

        let value = T::load_from(self)?;
        self.sig_pos += expected.len();
        Ok(value)
    }

    pub(crate) fn snapshot(&self) -> (usize, usize) {
        (self.pos, self.sig_pos)
    }

    pub(crate) fn restore(&mut self, (pos, sig_pos): (usize, usize)) {
        self.pos = pos;
        self.sig_pos = sig_pos;
    }

    /// Advance the read position past alignment padding.
    pub(crate) fn align(&mut self, alignment: usize) -> Result<()> {
        let rem = self.pos % alignment;

        if rem != 0 {
            let pos = self.pos + (alignment - rem);

            if pos > self.data.len() {
                return Err(premature_end());
            }

            self.pos = pos;
        }

        Ok(())
    }

    /// Load `n` raw bytes at the current position.
    pub(crate) fn load_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.pos + n > self.data.len() {
            return Err(premature_end());
        }

        let bytes = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    /// Align and load a fixed-width value.
    pub(crate) fn load_fixed<const N: usize>(&mut self) -> Result<[u8; N]> {
        self.align(N)?;
        let bytes = self.load_bytes(N)?;
        let mut out = [0; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    /// Load the raw marshalled form of a string.
    pub(crate) fn load_str_raw(&mut self) -> Result<&'a str> {
        let len = u32::from_endian(self.load_fixed()?, self.endianness) as usize;
        let bytes = self.load_bytes(len)?;

        if self.load_bytes(1)? != [0] {
            return Err(Error::deserialization("string is not nul terminated"));
        }

        from_utf8(bytes).map_err(|error| Error::deserialization(error))
    }

    /// Load the raw marshalled form of a signature.
    pub(crate) fn load_signature_raw(&mut self) -> Result<&'a Signature> {
        let [len] = self.load_fixed::<1>()?;
        let bytes = self.load_bytes(len as usize)?;

        if self.load_bytes(1)? != [0] {
            return Err(Error::deserialization("signature is not nul terminated"));
        }

        let string = from_utf8(bytes).map_err(Error::deserialization)?;
        Signature::new(string).map_err(Error::deserialization)
    }

    /// Load an array header and return the exclusive end position of its
    /// elements.
    ///
    /// `element_alignment` is the alignment of the array's element type; the
    /// padding up to it is not part of the marshalled length.
    pub(crate) fn load_array_end(&mut self, element_alignment: usize) -> Result<usize> {
        let len = u32::from_endian(self.load_fixed()?, self.endianness) as usize;
        self.align(element_alignment)?;
        let end = self.pos + len;

        if end > self.data.len() {
            return Err(premature_end());
        }

        Ok(end)
    }

    /// The current read position, used to detect the end of array elements.
    pub(crate) fn position(&self) -> usize {
        self.pos
    }
}

impl fmt::Debug for Body<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Body")
            .field("signature", &self.signature)
            .field("remaining", &self.remaining_signature())
            .finish()
    }
}

fn premature_end() -> Error {
    Error::deserialization("premature end of message body")
}

/// Decoding of fixed-width values in a given endianness.
pub(crate) trait FromEndian<const N: usize>: Sized {
    fn from_endian(bytes: [u8; N], endianness: Endianness) -> Self;
}

macro_rules! impl_from_endian {
    ($($ty:ty, $size:literal),* $(,)?) => {
        $(
            impl FromEndian<$size> for $ty {
                #[inline]
                fn from_endian(bytes: [u8; $size], endianness: Endianness) -> Self {
                    if endianness == Endianness::LITTLE {
                        <$ty>::from_le_bytes(bytes)
                    } else {
                        <$ty>::from_be_bytes(bytes)
                    }
                }
            }
        )*
    }
}

impl_from_endian!(u8, 1, i16, 2, u16, 2, i32, 4, u32, 4, i64, 8, u64, 8, f64, 8);
