use std::fmt;

use crate::signature::SignatureBuilder;
use crate::{Body, Endianness, Error, Result, Signature, Storable};

/// A buffer that a message body is written into.
///
/// Writes are typed: every [`append`] extends the buffer's signature with the
/// signature of the stored value and marshals the value with the alignment
/// the D-Bus wire format requires.
///
/// [`append`]: BodyBuf::append
///
/// # Examples
///
/// ```
/// use busline::BodyBuf;
///
/// let mut body = BodyBuf::new();
///
/// body.append(&10u16)?;
/// body.append(&10u32)?;
///
/// assert_eq!(body.signature(), "qu");
/// # Ok::<_, busline::Error>(())
/// ```
#[derive(Clone)]
pub struct BodyBuf {
    data: Vec<u8>,
    endianness: Endianness,
    signature: SignatureBuilder,
}

impl BodyBuf {
    /// Construct a new empty body buffer in native endianness.
    pub fn new() -> Self {
        Self::with_endianness(Endianness::NATIVE)
    }

    /// Construct a new empty body buffer with the specified endianness.
    ///
    /// # Examples
    ///
    /// ```
    /// use busline::{BodyBuf, Endianness};
    ///
    /// let mut body = BodyBuf::with_endianness(Endianness::LITTLE);
    /// body.append(&10u16)?;
    /// body.append(&10u32)?;
    ///
    /// assert_eq!(body.get(), &[10, 0, 0, 0, 10, 0, 0, 0]);
    /// # Ok::<_, busline::Error>(())
    /// ```
    pub fn with_endianness(endianness: Endianness) -> Self {
        Self {
            data: Vec::new(),
            endianness,
            signature: SignatureBuilder::new(),
        }
    }

    /// Clear the buffer and its signature.
    pub fn clear(&mut self) {
        self.data.clear();
        self.signature.clear();
    }

    /// Get the signature of the values written so far.
    #[inline]
    pub fn signature(&self) -> &Signature {
        self.signature.to_signature()
    }

    /// Get the endianness of the buffer.
    #[inline]
    pub fn endianness(&self) -> Endianness {
        self.endianness
    }

    /// Test if the buffer is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The number of bytes written, including alignment padding.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Get the raw bytes written so far.
    ///
    /// # Examples
    ///
    /// ```
    /// use busline::{BodyBuf, Endianness};
    ///
    /// let mut body = BodyBuf::with_endianness(Endianness::LITTLE);
    /// body.append(&1u8)?;
    /// body.append(&2u32)?;
    ///
    /// assert_eq!(body.get(), &[1, 0, 0, 0, 2, 0, 0, 0]);
    /// # Ok::<_, busline::Error>(())
    /// ```
    #[inline]
    pub fn get(&self) -> &[u8] {
        &self.data
    }

    /// Append a value, extending the signature.
    ///
    /// # Errors
    ///
    /// Errors if the extended signature would exceed the maximum signature
    /// length.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::collections::HashMap;
    ///
    /// use busline::{BodyBuf, Variant};
    ///
    /// let mut body = BodyBuf::new();
    ///
    /// let mut dict = HashMap::new();
    /// dict.insert(String::from("mode"), Variant::U32(2));
    /// body.append(&dict)?;
    ///
    /// assert_eq!(body.signature(), "a{sv}");
    /// # Ok::<_, busline::Error>(())
    /// ```
    pub fn append<T>(&mut self, value: &T) -> Result<()>
    where
        T: ?Sized + Storable,
    {
        let snapshot = self.signature.clone();

        if let Err(error) = T::write_signature(&mut self.signature) {
            self.signature = snapshot;
            return Err(Error::from(error));
        }

        value.store_to(self);
        Ok(())
    }

    /// Access a read cursor over the entire contents of the buffer.
    ///
    /// # Examples
    ///
    /// ```
    /// use busline::BodyBuf;
    ///
    /// let mut body = BodyBuf::new();
    /// body.append(&42u32)?;
    /// body.append("Hello World!")?;
    ///
    /// let mut read = body.as_body();
    /// assert_eq!(read.read::<u32>()?, 42);
    /// assert_eq!(read.read::<String>()?, "Hello World!");
    /// assert!(read.is_empty());
    /// # Ok::<_, busline::Error>(())
    /// ```
    #[inline]
    pub fn as_body(&self) -> Body<'_> {
        Body::from_raw_parts(&self.data, self.endianness, self.signature.to_signature())
    }

    /// Pad the buffer with zero bytes until it is aligned to `alignment`.
    pub(crate) fn align(&mut self, alignment: usize) {
        let rem = self.data.len() % alignment;

        if rem != 0 {
            for _ in rem..alignment {
                self.data.push(0);
            }
        }
    }

    /// Extend the buffer with raw bytes at the current position.
    pub(crate) fn extend_raw(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    /// Push a single raw byte.
    pub(crate) fn push_raw(&mut self, byte: u8) {
        self.data.push(byte);
    }

    /// Align and write a fixed-width value in the buffer's endianness.
    pub(crate) fn store_fixed<const N: usize>(&mut self, bytes: [u8; N]) {
        self.align(N);
        self.data.extend_from_slice(&bytes);
    }

    /// Reserve space for an array byte-length and return its position for
    /// backpatching.
    pub(crate) fn reserve_array_len(&mut self) -> usize {
        self.align(4);
        let at = self.data.len();
        self.data.extend_from_slice(&[0; 4]);
        at
    }

    /// Backpatch a previously reserved array length.
    ///
    /// The length covers the bytes from the end of any post-length alignment
    /// padding to the current write position.
    pub(crate) fn finish_array_len(&mut self, at: usize, start: usize) {
        let len = (self.data.len() - start) as u32;

        let bytes = if self.endianness == Endianness::LITTLE {
            len.to_le_bytes()
        } else {
            len.to_be_bytes()
        };

        self.data[at..at + 4].copy_from_slice(&bytes);
    }

    /// Write the raw marshalled form of a string: aligned length, contents,
    /// trailing nul.
    pub(crate) fn store_str_raw(&mut self, string: &str) {
        let len = string.len() as u32;

        let bytes = if self.endianness == Endianness::LITTLE {
            len.to_le_bytes()
        } else {
            len.to_be_bytes()
        };

        self.store_fixed(bytes);
        self.data.extend_from_slice(string.as_bytes());
        self.data.push(0);
    }

    /// Write the raw marshalled form of a signature: single-byte length,
    /// contents, trailing nul.
    pub(crate) fn store_signature_raw(&mut self, signature: &Signature) {
        self.data.push(signature.len() as u8);
        self.data.extend_from_slice(signature.as_bytes());
        self.data.push(0);
    }

    /// The current write position.
    pub(crate) fn position(&self) -> usize {
        self.data.len()
    }

    /// Extend the signature with an already-composed fragment, without
    /// writing any value bytes.
    pub(crate) fn extend_signature(&mut self, signature: &Signature) -> Result<()> {
        if !self.signature.extend_from_signature(signature) {
            return Err(Error::from(crate::SignatureError::too_long()));
        }

        Ok(())
    }
}

impl Default for BodyBuf {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for BodyBuf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BodyBuf")
            .field("signature", &self.signature())
            .field("len", &self.data.len())
            .finish()
    }
}

impl PartialEq for BodyBuf {
    fn eq(&self, other: &Self) -> bool {
        self.signature() == other.signature()
            && self.endianness == other.endianness
            && self.data == other.data
    }
}

impl Eq for BodyBuf {}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, HashMap};

    use crate::{
        signature_of, BodyBuf, Endianness, Signature, SignatureBuf, Struct, UnixFd, Variant,
    };

    #[test]
    fn scalar_round_trip() -> crate::Result<()> {
        let mut body = BodyBuf::new();
        body.append(&1u8)?;
        body.append(&true)?;
        body.append(&-2i16)?;
        body.append(&3u16)?;
        body.append(&-4i32)?;
        body.append(&5u32)?;
        body.append(&-6i64)?;
        body.append(&7u64)?;
        body.append(&1.5f64)?;
        body.append(&UnixFd(3))?;

        assert_eq!(body.signature(), "ybnqiuxtdh");

        let mut read = body.as_body();
        assert_eq!(read.read::<u8>()?, 1);
        assert!(read.read::<bool>()?);
        assert_eq!(read.read::<i16>()?, -2);
        assert_eq!(read.read::<u16>()?, 3);
        assert_eq!(read.read::<i32>()?, -4);
        assert_eq!(read.read::<u32>()?, 5);
        assert_eq!(read.read::<i64>()?, -6);
        assert_eq!(read.read::<u64>()?, 7);
        assert_eq!(read.read::<f64>()?, 1.5);
        assert_eq!(read.read::<UnixFd>()?, UnixFd(3));
        assert!(read.is_empty());
        Ok(())
    }

    #[test]
    fn big_endian_round_trip() -> crate::Result<()> {
        let mut body = BodyBuf::with_endianness(Endianness::BIG);
        body.append(&0x01020304u32)?;
        body.append("x")?;

        assert_eq!(&body.get()[..4], &[1, 2, 3, 4]);

        let mut read = body.as_body();
        assert_eq!(read.read::<u32>()?, 0x01020304);
        assert_eq!(read.read::<String>()?, "x");
        Ok(())
    }

    #[test]
    fn struct_layout_is_byte_exact() -> crate::Result<()> {
        let mut body = BodyBuf::with_endianness(Endianness::LITTLE);
        body.append(&10u8)?;
        body.append(&Struct((10u16, 10u32, vec![1u8, 2, 3], "Hello World")))?;

        assert_eq!(body.signature(), "y(quays)");
        assert_eq!(
            body.get(),
            &[
                10, 0, 0, 0, 0, 0, 0, 0, 10, 0, 0, 0, 10, 0, 0, 0, 3, 0, 0, 0, 1, 2, 3, 0, 11,
                0, 0, 0, 72, 101, 108, 108, 111, 32, 87, 111, 114, 108, 100, 0
            ]
        );
        Ok(())
    }

    #[test]
    fn tuples_flatten_without_parentheses() -> crate::Result<()> {
        assert_eq!(&*signature_of::<(String, i32)>()?, Signature::new("si")?);
        assert_eq!(
            &*signature_of::<(u8, (u16, u32), String)>()?,
            Signature::new("yqus")?,
        );

        let mut body = BodyBuf::new();
        body.append(&("hello", 42i32))?;
        assert_eq!(body.signature(), "si");

        let mut read = body.as_body();
        let (s, n) = read.read::<(String, i32)>()?;
        assert_eq!(s, "hello");
        assert_eq!(n, 42);
        Ok(())
    }

    #[test]
    fn struct_round_trip() -> crate::Result<()> {
        let mut body = BodyBuf::new();
        body.append(&Struct(("hello", 42i32)))?;
        assert_eq!(body.signature(), "(si)");

        let mut read = body.as_body();
        let Struct((s, n)) = read.read::<Struct<(String, i32)>>()?;
        assert_eq!(s, "hello");
        assert_eq!(n, 42);
        Ok(())
    }

    #[test]
    fn dict_signature() -> crate::Result<()> {
        assert_eq!(
            &*signature_of::<HashMap<String, Variant>>()?,
            Signature::new("a{sv}")?,
        );
        assert_eq!(
            &*signature_of::<BTreeMap<u32, Vec<String>>>()?,
            Signature::new("a{uas}")?,
        );
        Ok(())
    }

    #[test]
    fn map_round_trip() -> crate::Result<()> {
        let mut map = BTreeMap::new();
        map.insert(String::from("a"), 1u32);
        map.insert(String::from("b"), 2u32);

        let mut body = BodyBuf::new();
        body.append(&map)?;
        assert_eq!(body.signature(), "a{su}");

        let mut read = body.as_body();
        assert_eq!(read.read::<BTreeMap<String, u32>>()?, map);
        Ok(())
    }

    #[test]
    fn array_round_trips() -> crate::Result<()> {
        let mut body = BodyBuf::new();
        body.append(&vec![vec![1i64], vec![2, 3]])?;
        body.append(&[7u16, 8, 9])?;
        body.append(&Vec::<String>::new())?;

        assert_eq!(body.signature(), "aaxaqas");

        let mut read = body.as_body();
        assert_eq!(read.read::<Vec<Vec<i64>>>()?, vec![vec![1], vec![2, 3]]);
        assert_eq!(read.read::<[u16; 3]>()?, [7, 8, 9]);
        assert_eq!(read.read::<Vec<String>>()?, Vec::<String>::new());
        Ok(())
    }

    #[test]
    fn signature_and_path_values_round_trip() -> crate::Result<()> {
        let mut body = BodyBuf::new();
        body.append(Signature::new("a{sv}")?)?;
        body.append(crate::ObjectPath::new("/com/example")?)?;

        assert_eq!(body.signature(), "go");

        let mut read = body.as_body();
        assert_eq!(read.read::<SignatureBuf>()?.as_str(), "a{sv}");
        assert_eq!(read.read::<crate::ObjectPathBuf>()?.as_str(), "/com/example");
        Ok(())
    }

    #[test]
    fn read_checks_signature_at_cursor() -> crate::Result<()> {
        let mut body = BodyBuf::new();
        body.append(&1u32)?;

        let mut read = body.as_body();
        assert!(read.read::<String>().is_err());
        // The failed read does not advance the cursor.
        assert_eq!(read.read::<u32>()?, 1);
        assert!(read.read::<u32>().is_err());
        Ok(())
    }

    #[test]
    fn read_rejects_truncated_body() -> crate::Result<()> {
        let mut body = BodyBuf::new();
        body.append("hi")?;

        // A body claiming a string but holding too few bytes.
        let mut truncated = BodyBuf::new();
        truncated.extend_signature(Signature::new("s")?)?;
        truncated.extend_raw(&[200, 0, 0, 0]);

        let mut read = truncated.as_body();
        assert!(read.read::<String>().is_err());
        Ok(())
    }

    #[test]
    fn invalid_bool_is_rejected() -> crate::Result<()> {
        let mut body = BodyBuf::new();
        body.extend_signature(Signature::new("b")?)?;
        body.extend_raw(&2u32.to_ne_bytes());

        let mut read = body.as_body();
        assert!(read.read::<bool>().is_err());
        Ok(())
    }

    #[test]
    fn enum_round_trip() -> crate::Result<()> {
        crate::unsigned_enum! {
            /// Playback state.
            #[repr(u32)]
            pub enum State {
                Stopped = 0,
                Playing = 1,
                Paused = 2,
            }
        }

        assert_eq!(&*signature_of::<State>()?, Signature::UINT32);
        assert!(crate::is_trivial::<State>());

        let mut body = BodyBuf::new();
        body.append(&State::Paused)?;

        let mut read = body.as_body();
        assert_eq!(read.read::<State>()?, State::Paused);

        let mut body = BodyBuf::new();
        body.append(&7u32)?;
        assert!(body.as_body().read::<State>().is_err());
        Ok(())
    }

    #[test]
    fn trivial_predicate() {
        assert!(crate::is_trivial::<u64>());
        assert!(crate::is_trivial::<f64>());
        assert!(!crate::is_trivial::<bool>());
        assert!(!crate::is_trivial::<String>());
        assert!(!crate::is_trivial::<Vec<u8>>());
    }
}
