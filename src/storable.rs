use std::collections::{BTreeMap, HashMap};

use crate::signature::SignatureBuilder;
use crate::{
    BodyBuf, Endianness, ObjectPath, ObjectPathBuf, Signature, SignatureBuf, SignatureError,
};

/// A type that participates in marshalling.
///
/// Implementors have a deterministic D-Bus signature derived through
/// [`write_signature`] and marshal themselves into a [`BodyBuf`] through
/// [`store_to`]. Every supported type is an implementor; types outside the
/// supported set fail to compile when used in a typed append or read.
///
/// Tuples are argument lists and flatten: their signature is the
/// concatenation of their element signatures without enclosing parentheses.
/// Use [`Struct`] for a parenthesized struct.
///
/// [`write_signature`]: Storable::write_signature
/// [`store_to`]: Storable::store_to
///
/// # Examples
///
/// ```
/// use busline::{signature_of, is_trivial, Signature};
///
/// assert_eq!(&*signature_of::<(String, i32)>()?, Signature::new("si")?);
/// assert!(is_trivial::<u64>());
/// assert!(!is_trivial::<String>());
/// # Ok::<_, busline::Error>(())
/// ```
pub trait Storable {
    /// The wire alignment of the type.
    const ALIGNMENT: usize;

    /// Whether the type is a fixed-width scalar whose wire representation
    /// matches its in-memory representation.
    const TRIVIAL: bool = false;

    /// Extend `builder` with the signature of the type.
    fn write_signature(builder: &mut SignatureBuilder) -> Result<(), SignatureError>;

    /// Marshal the value into `buf`.
    fn store_to(&self, buf: &mut BodyBuf);
}

/// Derive the D-Bus signature of a type.
///
/// # Examples
///
/// ```
/// use std::collections::HashMap;
///
/// use busline::{signature_of, Signature, Variant};
///
/// assert_eq!(
///     &*signature_of::<HashMap<String, Variant>>()?,
///     Signature::new("a{sv}")?,
/// );
/// # Ok::<_, busline::Error>(())
/// ```
pub fn signature_of<T>() -> Result<SignatureBuf, SignatureError>
where
    T: ?Sized + Storable,
{
    let mut builder = SignatureBuilder::new();
    T::write_signature(&mut builder)?;
    Ok(builder.to_signature_buf())
}

/// Test if a type is a fixed-width scalar.
pub fn is_trivial<T>() -> bool
where
    T: ?Sized + Storable,
{
    T::TRIVIAL
}

/// Types permitted as dict entry keys.
///
/// The D-Bus specification restricts dict keys to basic types; constraining
/// map keys to this trait keeps signature derivation total.
pub trait BasicType: Storable {}

macro_rules! impl_number {
    ($($ty:ty, $size:literal, $signature:ident),* $(,)?) => {
        $(
            impl Storable for $ty {
                const ALIGNMENT: usize = $size;
                const TRIVIAL: bool = true;

                #[inline]
                fn write_signature(
                    builder: &mut SignatureBuilder,
                ) -> Result<(), SignatureError> {
                    if !builder.extend_from_signature(Signature::$signature) {
                        return Err(SignatureError::too_long());
                    }

                    Ok(())
                }

                #[inline]
                fn store_to(&self, buf: &mut BodyBuf) {
                    let bytes = if buf.endianness() == Endianness::LITTLE {
                        self.to_le_bytes()
                    } else {
                        self.to_be_bytes()
                    };

                    buf.store_fixed(bytes);
                }
            }

            impl BasicType for $ty {}
        )*
    }
}

impl_number! {
    u8, 1, BYTE,
    i16, 2, INT16,
    u16, 2, UINT16,
    i32, 4, INT32,
    u32, 4, UINT32,
    i64, 8, INT64,
    u64, 8, UINT64,
    f64, 8, DOUBLE,
}

impl Storable for bool {
    const ALIGNMENT: usize = 4;

    #[inline]
    fn write_signature(builder: &mut SignatureBuilder) -> Result<(), SignatureError> {
        if !builder.extend_from_signature(Signature::BOOLEAN) {
            return Err(SignatureError::too_long());
        }

        Ok(())
    }

    #[inline]
    fn store_to(&self, buf: &mut BodyBuf) {
        u32::from(*self).store_to(buf);
    }
}

impl BasicType for bool {}

impl Storable for str {
    const ALIGNMENT: usize = 4;

    #[inline]
    fn write_signature(builder: &mut SignatureBuilder) -> Result<(), SignatureError> {
        if !builder.extend_from_signature(Signature::STRING) {
            return Err(SignatureError::too_long());
        }

        Ok(())
    }

    #[inline]
    fn store_to(&self, buf: &mut BodyBuf) {
        buf.store_str_raw(self);
    }
}

impl BasicType for str {}

impl Storable for String {
    const ALIGNMENT: usize = 4;

    #[inline]
    fn write_signature(builder: &mut SignatureBuilder) -> Result<(), SignatureError> {
        str::write_signature(builder)
    }

    #[inline]
    fn store_to(&self, buf: &mut BodyBuf) {
        self.as_str().store_to(buf);
    }
}

impl BasicType for String {}

impl Storable for Signature {
    const ALIGNMENT: usize = 1;

    #[inline]
    fn write_signature(builder: &mut SignatureBuilder) -> Result<(), SignatureError> {
        if !builder.extend_from_signature(Signature::SIGNATURE) {
            return Err(SignatureError::too_long());
        }

        Ok(())
    }

    #[inline]
    fn store_to(&self, buf: &mut BodyBuf) {
        buf.store_signature_raw(self);
    }
}

impl BasicType for Signature {}

impl Storable for SignatureBuf {
    const ALIGNMENT: usize = 1;

    #[inline]
    fn write_signature(builder: &mut SignatureBuilder) -> Result<(), SignatureError> {
        Signature::write_signature(builder)
    }

    #[inline]
    fn store_to(&self, buf: &mut BodyBuf) {
        self.as_signature().store_to(buf);
    }
}

impl BasicType for SignatureBuf {}

impl Storable for ObjectPath {
    const ALIGNMENT: usize = 4;

    #[inline]
    fn write_signature(builder: &mut SignatureBuilder) -> Result<(), SignatureError> {
        if !builder.extend_from_signature(Signature::OBJECT_PATH) {
            return Err(SignatureError::too_long());
        }

        Ok(())
    }

    #[inline]
    fn store_to(&self, buf: &mut BodyBuf) {
        buf.store_str_raw(self.as_str());
    }
}

impl BasicType for ObjectPath {}

impl Storable for ObjectPathBuf {
    const ALIGNMENT: usize = 4;

    #[inline]
    fn write_signature(builder: &mut SignatureBuilder) -> Result<(), SignatureError> {
        ObjectPath::write_signature(builder)
    }

    #[inline]
    fn store_to(&self, buf: &mut BodyBuf) {
        self.as_object_path().store_to(buf);
    }
}

impl BasicType for ObjectPathBuf {}

impl<T> Storable for &T
where
    T: ?Sized + Storable,
{
    const ALIGNMENT: usize = T::ALIGNMENT;
    const TRIVIAL: bool = T::TRIVIAL;

    #[inline]
    fn write_signature(builder: &mut SignatureBuilder) -> Result<(), SignatureError> {
        T::write_signature(builder)
    }

    #[inline]
    fn store_to(&self, buf: &mut BodyBuf) {
        (**self).store_to(buf);
    }
}

impl<T> BasicType for &T where T: ?Sized + BasicType {}

fn store_slice<T>(values: &[T], buf: &mut BodyBuf)
where
    T: Storable,
{
    let at = buf.reserve_array_len();
    buf.align(T::ALIGNMENT);
    let start = buf.position();

    for value in values {
        value.store_to(buf);
    }

    buf.finish_array_len(at, start);
}

fn write_array_signature<T>(builder: &mut SignatureBuilder) -> Result<(), SignatureError>
where
    T: Storable,
{
    builder.open_array()?;
    T::write_signature(builder)?;
    builder.close_array();
    Ok(())
}

impl<T> Storable for [T]
where
    T: Storable,
{
    const ALIGNMENT: usize = 4;

    #[inline]
    fn write_signature(builder: &mut SignatureBuilder) -> Result<(), SignatureError> {
        write_array_signature::<T>(builder)
    }

    #[inline]
    fn store_to(&self, buf: &mut BodyBuf) {
        store_slice(self, buf);
    }
}

impl<T> Storable for Vec<T>
where
    T: Storable,
{
    const ALIGNMENT: usize = 4;

    #[inline]
    fn write_signature(builder: &mut SignatureBuilder) -> Result<(), SignatureError> {
        write_array_signature::<T>(builder)
    }

    #[inline]
    fn store_to(&self, buf: &mut BodyBuf) {
        store_slice(self, buf);
    }
}

impl<T, const N: usize> Storable for [T; N]
where
    T: Storable,
{
    const ALIGNMENT: usize = 4;

    #[inline]
    fn write_signature(builder: &mut SignatureBuilder) -> Result<(), SignatureError> {
        write_array_signature::<T>(builder)
    }

    #[inline]
    fn store_to(&self, buf: &mut BodyBuf) {
        store_slice(self, buf);
    }
}

fn write_map_signature<K, V>(builder: &mut SignatureBuilder) -> Result<(), SignatureError>
where
    K: BasicType,
    V: Storable,
{
    builder.open_array()?;
    builder.open_dict_entry()?;
    K::write_signature(builder)?;
    V::write_signature(builder)?;
    builder.close_dict_entry()?;
    builder.close_array();
    Ok(())
}

fn store_map<'a, K, V>(entries: impl Iterator<Item = (&'a K, &'a V)>, buf: &mut BodyBuf)
where
    K: 'a + BasicType,
    V: 'a + Storable,
{
    let at = buf.reserve_array_len();
    buf.align(8);
    let start = buf.position();

    for (key, value) in entries {
        buf.align(8);
        key.store_to(buf);
        value.store_to(buf);
    }

    buf.finish_array_len(at, start);
}

impl<K, V> Storable for HashMap<K, V>
where
    K: BasicType,
    V: Storable,
{
    const ALIGNMENT: usize = 4;

    #[inline]
    fn write_signature(builder: &mut SignatureBuilder) -> Result<(), SignatureError> {
        write_map_signature::<K, V>(builder)
    }

    #[inline]
    fn store_to(&self, buf: &mut BodyBuf) {
        store_map(self.iter(), buf);
    }
}

impl<K, V> Storable for BTreeMap<K, V>
where
    K: BasicType,
    V: Storable,
{
    const ALIGNMENT: usize = 4;

    #[inline]
    fn write_signature(builder: &mut SignatureBuilder) -> Result<(), SignatureError> {
        write_map_signature::<K, V>(builder)
    }

    #[inline]
    fn store_to(&self, buf: &mut BodyBuf) {
        store_map(self.iter(), buf);
    }
}

/// Wrapper marshalling a flattened tuple as a parenthesized D-Bus struct.
///
/// # Examples
///
/// ```
/// use busline::{signature_of, BodyBuf, Signature, Struct};
///
/// assert_eq!(
///     &*signature_of::<Struct<(String, i32)>>()?,
///     Signature::new("(si)")?,
/// );
///
/// let mut body = BodyBuf::new();
/// body.append(&Struct(("hello", 42i32)))?;
/// assert_eq!(body.signature(), "(si)");
/// # Ok::<_, busline::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Struct<T>(
    /// The flattened tuple of struct fields.
    pub T,
);

impl<T> Storable for Struct<T>
where
    T: Storable,
{
    const ALIGNMENT: usize = 8;

    #[inline]
    fn write_signature(builder: &mut SignatureBuilder) -> Result<(), SignatureError> {
        builder.open_struct()?;
        T::write_signature(builder)?;
        builder.close_struct()?;
        Ok(())
    }

    #[inline]
    fn store_to(&self, buf: &mut BodyBuf) {
        buf.align(8);
        self.0.store_to(buf);
    }
}

impl Storable for () {
    const ALIGNMENT: usize = 1;

    #[inline]
    fn write_signature(_: &mut SignatureBuilder) -> Result<(), SignatureError> {
        Ok(())
    }

    #[inline]
    fn store_to(&self, _: &mut BodyBuf) {}
}

macro_rules! impl_tuple {
    ($first:ident $(, $rest:ident)*) => {
        impl<$first, $($rest,)*> Storable for ($first, $($rest,)*)
        where
            $first: Storable,
            $($rest: Storable,)*
        {
            const ALIGNMENT: usize = $first::ALIGNMENT;

            #[inline]
            fn write_signature(
                builder: &mut SignatureBuilder,
            ) -> Result<(), SignatureError> {
                $first::write_signature(builder)?;
                $($rest::write_signature(builder)?;)*
                Ok(())
            }

            #[inline]
            #[allow(non_snake_case)]
            fn store_to(&self, buf: &mut BodyBuf) {
                let ($first, $($rest,)*) = self;
                $first.store_to(buf);
                $($rest.store_to(buf);)*
            }
        }
    }
}

repeat!(impl_tuple);
