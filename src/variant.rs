use std::fmt;

use crate::body::alignment_of_type;
use crate::signature::{complete_type_len, SignatureBuilder};
use crate::{
    Body, BodyBuf, Error, Loadable, ObjectPathBuf, Result, Signature, SignatureBuf,
    SignatureError, Storable, UnixFd,
};

/// A runtime-typed D-Bus value.
///
/// A variant carries both a value and the value's signature; its own
/// signature is always `v`. Any supported value can round-trip through a
/// variant with [`Variant::new`] and [`Variant::get`].
///
/// # Examples
///
/// ```
/// use busline::{BodyBuf, Variant};
///
/// let mut body = BodyBuf::new();
/// body.append(&Variant::U32(7))?;
///
/// assert_eq!(body.signature(), "v");
///
/// let mut read = body.as_body();
/// assert_eq!(read.read::<Variant>()?, Variant::U32(7));
/// # Ok::<_, busline::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Variant {
    /// A byte (`y`).
    U8(u8),
    /// A boolean (`b`).
    Bool(bool),
    /// A signed 16-bit integer (`n`).
    I16(i16),
    /// An unsigned 16-bit integer (`q`).
    U16(u16),
    /// A signed 32-bit integer (`i`).
    I32(i32),
    /// An unsigned 32-bit integer (`u`).
    U32(u32),
    /// A signed 64-bit integer (`x`).
    I64(i64),
    /// An unsigned 64-bit integer (`t`).
    U64(u64),
    /// A double (`d`).
    F64(f64),
    /// A string (`s`).
    String(String),
    /// An object path (`o`).
    ObjectPath(ObjectPathBuf),
    /// A signature (`g`).
    Signature(SignatureBuf),
    /// A unix file descriptor index (`h`).
    UnixFd(UnixFd),
    /// An array (`a` followed by the element signature).
    ///
    /// Every value must carry the element signature; use [`Variant::array`]
    /// for checked construction.
    Array {
        /// The signature of the array elements.
        element: SignatureBuf,
        /// The elements of the array.
        values: Vec<Variant>,
    },
    /// A dictionary (`a{..}`).
    ///
    /// Every entry must carry the key and value signatures; use
    /// [`Variant::dict`] for checked construction.
    Dict {
        /// The signature of the entry keys.
        key: SignatureBuf,
        /// The signature of the entry values.
        value: SignatureBuf,
        /// The entries of the dictionary.
        entries: Vec<(Variant, Variant)>,
    },
    /// A parenthesized struct.
    Struct(Vec<Variant>),
    /// A nested variant (`v`).
    Variant(Box<Variant>),
}

impl Variant {
    /// Construct a variant out of any storable value.
    ///
    /// # Examples
    ///
    /// ```
    /// use busline::Variant;
    ///
    /// let v = Variant::new(&vec![1u32, 2, 3])?;
    /// assert_eq!(v.signature().as_str(), "au");
    /// # Ok::<_, busline::Error>(())
    /// ```
    pub fn new<T>(value: &T) -> Result<Variant>
    where
        T: ?Sized + Storable,
    {
        let mut buf = BodyBuf::new();
        buf.append(value)?;
        let mut body = buf.as_body();
        let signature = body.signature();

        // A variant carries exactly one complete type; a flattened argument
        // list does not fit in one.
        match signature.split_first() {
            Some((_, rest)) if rest.is_empty() => {}
            _ => {
                return Err(Error::invalid_args(format!(
                    "signature {signature} is not a single complete type"
                )));
            }
        }

        Self::load_with_signature(&mut body, signature)
    }

    /// Decode the variant into a concrete value.
    ///
    /// # Errors
    ///
    /// Fails with a deserialization error if the signature of `T` does not
    /// match the signature of the contained value.
    ///
    /// # Examples
    ///
    /// ```
    /// use busline::Variant;
    ///
    /// let v = Variant::new(&7i32)?;
    /// assert_eq!(v.get::<i32>()?, 7);
    /// assert!(v.get::<String>().is_err());
    /// # Ok::<_, busline::Error>(())
    /// ```
    pub fn get<T>(&self) -> Result<T>
    where
        T: Loadable,
    {
        let mut buf = BodyBuf::new();
        buf.extend_signature(&self.signature())?;
        self.store_value(&mut buf);
        let mut body = buf.as_body();
        body.read::<T>()
    }

    /// Checked construction of an array variant.
    ///
    /// # Errors
    ///
    /// Errors if any value does not carry the element signature.
    pub fn array(element: &Signature, values: Vec<Variant>) -> Result<Variant> {
        for value in &values {
            if &*value.signature() != element {
                return Err(Error::invalid_args(format!(
                    "array element has signature {}, expected {element}",
                    value.signature()
                )));
            }
        }

        Ok(Variant::Array {
            element: element.to_owned(),
            values,
        })
    }

    /// Checked construction of a dictionary variant.
    ///
    /// # Errors
    ///
    /// Errors if any entry does not carry the key and value signatures.
    pub fn dict(
        key: &Signature,
        value: &Signature,
        entries: Vec<(Variant, Variant)>,
    ) -> Result<Variant> {
        for (k, v) in &entries {
            if &*k.signature() != key || &*v.signature() != value {
                return Err(Error::invalid_args(format!(
                    "dict entry has signature {{{}{}}}, expected {{{key}{value}}}",
                    k.signature(),
                    v.signature()
                )));
            }
        }

        Ok(Variant::Dict {
            key: key.to_owned(),
            value: value.to_owned(),
            entries,
        })
    }

    /// The signature of the contained value.
    pub fn signature(&self) -> SignatureBuf {
        let mut builder = SignatureBuilder::new();
        self.write_value_signature(&mut builder);
        builder.to_signature_buf()
    }

    fn write_value_signature(&self, builder: &mut SignatureBuilder) {
        // Composition cannot exceed limits here, since every contained
        // signature has been validated to fit on construction.
        let ok = match self {
            Variant::U8(..) => builder.extend_from_signature(Signature::BYTE),
            Variant::Bool(..) => builder.extend_from_signature(Signature::BOOLEAN),
            Variant::I16(..) => builder.extend_from_signature(Signature::INT16),
            Variant::U16(..) => builder.extend_from_signature(Signature::UINT16),
            Variant::I32(..) => builder.extend_from_signature(Signature::INT32),
            Variant::U32(..) => builder.extend_from_signature(Signature::UINT32),
            Variant::I64(..) => builder.extend_from_signature(Signature::INT64),
            Variant::U64(..) => builder.extend_from_signature(Signature::UINT64),
            Variant::F64(..) => builder.extend_from_signature(Signature::DOUBLE),
            Variant::String(..) => builder.extend_from_signature(Signature::STRING),
            Variant::ObjectPath(..) => builder.extend_from_signature(Signature::OBJECT_PATH),
            Variant::Signature(..) => builder.extend_from_signature(Signature::SIGNATURE),
            Variant::UnixFd(..) => builder.extend_from_signature(Signature::UNIX_FD),
            Variant::Array { element, .. } => {
                builder.open_array().is_ok() && {
                    let ok = builder.extend_from_signature(&**element);
                    builder.close_array();
                    ok
                }
            }
            Variant::Dict { key, value, .. } => {
                builder.open_array().is_ok()
                    && builder.open_dict_entry().is_ok()
                    && builder.extend_from_signature(&**key)
                    && builder.extend_from_signature(&**value)
                    && builder.close_dict_entry().is_ok()
                    && {
                        builder.close_array();
                        true
                    }
            }
            Variant::Struct(fields) => {
                builder.open_struct().is_ok()
                    && fields.iter().all(|field| {
                        field.write_value_signature(builder);
                        true
                    })
                    && builder.close_struct().is_ok()
            }
            Variant::Variant(..) => builder.extend_from_signature(Signature::VARIANT),
        };

        debug_assert!(ok, "variant signature exceeded limits");
    }

    /// Marshal the contained value, without the leading signature a variant
    /// is wrapped in on the wire.
    pub(crate) fn store_value(&self, buf: &mut BodyBuf) {
        match self {
            Variant::U8(v) => v.store_to(buf),
            Variant::Bool(v) => v.store_to(buf),
            Variant::I16(v) => v.store_to(buf),
            Variant::U16(v) => v.store_to(buf),
            Variant::I32(v) => v.store_to(buf),
            Variant::U32(v) => v.store_to(buf),
            Variant::I64(v) => v.store_to(buf),
            Variant::U64(v) => v.store_to(buf),
            Variant::F64(v) => v.store_to(buf),
            Variant::String(v) => v.store_to(buf),
            Variant::ObjectPath(v) => v.store_to(buf),
            Variant::Signature(v) => v.store_to(buf),
            Variant::UnixFd(v) => v.store_to(buf),
            Variant::Array { element, values } => {
                let at = buf.reserve_array_len();
                buf.align(alignment_of_type(element.as_bytes()[0]));
                let start = buf.position();

                for value in values {
                    value.store_value(buf);
                }

                buf.finish_array_len(at, start);
            }
            Variant::Dict { entries, .. } => {
                let at = buf.reserve_array_len();
                buf.align(8);
                let start = buf.position();

                for (key, value) in entries {
                    buf.align(8);
                    key.store_value(buf);
                    value.store_value(buf);
                }

                buf.finish_array_len(at, start);
            }
            Variant::Struct(fields) => {
                buf.align(8);

                for field in fields {
                    field.store_value(buf);
                }
            }
            Variant::Variant(inner) => {
                buf.store_signature_raw(&inner.signature());
                inner.store_value(buf);
            }
        }
    }

    /// Unmarshal a value with the given signature.
    pub(crate) fn load_with_signature(body: &mut Body<'_>, sig: &Signature) -> Result<Variant> {
        let bytes = sig.as_bytes();

        let Some(&first) = bytes.first() else {
            return Err(Error::deserialization("variant has an empty signature"));
        };

        match first {
            b'y' => Ok(Variant::U8(u8::load_from(body)?)),
            b'b' => Ok(Variant::Bool(bool::load_from(body)?)),
            b'n' => Ok(Variant::I16(i16::load_from(body)?)),
            b'q' => Ok(Variant::U16(u16::load_from(body)?)),
            b'i' => Ok(Variant::I32(i32::load_from(body)?)),
            b'u' => Ok(Variant::U32(u32::load_from(body)?)),
            b'x' => Ok(Variant::I64(i64::load_from(body)?)),
            b't' => Ok(Variant::U64(u64::load_from(body)?)),
            b'd' => Ok(Variant::F64(f64::load_from(body)?)),
            b's' => Ok(Variant::String(String::load_from(body)?)),
            b'o' => Ok(Variant::ObjectPath(ObjectPathBuf::load_from(body)?)),
            b'g' => Ok(Variant::Signature(SignatureBuf::load_from(body)?)),
            b'h' => Ok(Variant::UnixFd(UnixFd::load_from(body)?)),
            b'v' => {
                let inner = body.load_signature_raw()?;
                Ok(Variant::Variant(Box::new(Self::load_with_signature(
                    body, inner,
                )?)))
            }
            b'a' if bytes.get(1) == Some(&b'{') => {
                let key_end = complete_type_len(bytes, 2);
                // SAFETY: Complete types of a valid signature are valid
                // signatures.
                let (key, value) = unsafe {
                    (
                        Signature::new_unchecked(&bytes[2..key_end]),
                        Signature::new_unchecked(&bytes[key_end..bytes.len() - 1]),
                    )
                };

                let end = body.load_array_end(8)?;
                let mut entries = Vec::new();

                while body.position() < end {
                    body.align(8)?;
                    let k = Self::load_with_signature(body, key)?;
                    let v = Self::load_with_signature(body, value)?;
                    entries.push((k, v));
                }

                Ok(Variant::Dict {
                    key: key.to_owned(),
                    value: value.to_owned(),
                    entries,
                })
            }
            b'a' => {
                // SAFETY: The element type of a valid array signature is a
                // valid signature.
                let element = unsafe { Signature::new_unchecked(&bytes[1..]) };
                let end = body.load_array_end(alignment_of_type(element.as_bytes()[0]))?;
                let mut values = Vec::new();

                while body.position() < end {
                    values.push(Self::load_with_signature(body, element)?);
                }

                Ok(Variant::Array {
                    element: element.to_owned(),
                    values,
                })
            }
            b'(' => {
                // SAFETY: The fields of a valid struct signature are a valid
                // signature.
                let inner = unsafe { Signature::new_unchecked(&bytes[1..bytes.len() - 1]) };
                body.align(8)?;
                let mut fields = Vec::new();

                for field in inner.iter() {
                    fields.push(Self::load_with_signature(body, field)?);
                }

                Ok(Variant::Struct(fields))
            }
            code => Err(Error::deserialization(format!(
                "cannot decode variant with type code {:?}",
                code as char
            ))),
        }
    }
}

impl Storable for Variant {
    const ALIGNMENT: usize = 1;

    #[inline]
    fn write_signature(builder: &mut SignatureBuilder) -> Result<(), SignatureError> {
        if !builder.extend_from_signature(Signature::VARIANT) {
            return Err(SignatureError::too_long());
        }

        Ok(())
    }

    fn store_to(&self, buf: &mut BodyBuf) {
        buf.store_signature_raw(&self.signature());
        self.store_value(buf);
    }
}

impl Loadable for Variant {
    fn load_from(body: &mut Body<'_>) -> Result<Self> {
        let signature = body.load_signature_raw()?;
        Self::load_with_signature(body, signature)
    }
}

macro_rules! impl_from {
    ($($variant:ident, $ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Variant {
                #[inline]
                fn from(value: $ty) -> Self {
                    Variant::$variant(value)
                }
            }
        )*
    }
}

impl_from! {
    U8, u8,
    Bool, bool,
    I16, i16,
    U16, u16,
    I32, i32,
    U32, u32,
    I64, i64,
    U64, u64,
    F64, f64,
    String, String,
    ObjectPath, ObjectPathBuf,
    Signature, SignatureBuf,
    UnixFd, UnixFd,
}

impl From<&str> for Variant {
    #[inline]
    fn from(value: &str) -> Self {
        Variant::String(value.to_owned())
    }
}


impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::U8(v) => write!(f, "{v}"),
            Variant::Bool(v) => write!(f, "{v}"),
            Variant::I16(v) => write!(f, "{v}"),
            Variant::U16(v) => write!(f, "{v}"),
            Variant::I32(v) => write!(f, "{v}"),
            Variant::U32(v) => write!(f, "{v}"),
            Variant::I64(v) => write!(f, "{v}"),
            Variant::U64(v) => write!(f, "{v}"),
            Variant::F64(v) => write!(f, "{v}"),
            Variant::String(v) => write!(f, "{v:?}"),
            Variant::ObjectPath(v) => write!(f, "{v}"),
            Variant::Signature(v) => write!(f, "{v}"),
            Variant::UnixFd(v) => write!(f, "fd#{}", v.0),
            other => write!(f, "<{}>", other.signature()),
        }
    }
}
