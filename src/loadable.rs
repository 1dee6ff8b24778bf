use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

use crate::body::FromEndian;
use crate::{
    BasicType, Body, Error, ObjectPathBuf, Result, SignatureBuf, Storable, Struct,
};

/// A type that can be read out of a message body.
///
/// Reads produce owned values so that decoded arguments can outlive the
/// message they came from. Every [`Loadable`] type is also [`Storable`],
/// which is where its signature comes from; a typed read checks that
/// signature against the body's read cursor before decoding.
pub trait Loadable: Storable + Sized {
    /// Unmarshal a value from `body`.
    ///
    /// Implementations read the raw representation only; signature
    /// bookkeeping is done by the calling cursor.
    fn load_from(body: &mut Body<'_>) -> Result<Self>;
}

macro_rules! impl_number {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Loadable for $ty {
                #[inline]
                fn load_from(body: &mut Body<'_>) -> Result<Self> {
                    Ok(<$ty>::from_endian(body.load_fixed()?, body.endianness()))
                }
            }
        )*
    }
}

impl_number!(u8, i16, u16, i32, u32, i64, u64, f64);

impl Loadable for bool {
    fn load_from(body: &mut Body<'_>) -> Result<Self> {
        match u32::load_from(body)? {
            0 => Ok(false),
            1 => Ok(true),
            n => Err(Error::deserialization(format!(
                "boolean must be 0 or 1, got {n}"
            ))),
        }
    }
}

impl Loadable for String {
    #[inline]
    fn load_from(body: &mut Body<'_>) -> Result<Self> {
        Ok(body.load_str_raw()?.to_owned())
    }
}

impl Loadable for SignatureBuf {
    #[inline]
    fn load_from(body: &mut Body<'_>) -> Result<Self> {
        Ok(body.load_signature_raw()?.to_owned())
    }
}

impl Loadable for ObjectPathBuf {
    fn load_from(body: &mut Body<'_>) -> Result<Self> {
        let string = body.load_str_raw()?;
        ObjectPathBuf::new(string).map_err(Error::deserialization)
    }
}

impl<T> Loadable for Vec<T>
where
    T: Loadable,
{
    fn load_from(body: &mut Body<'_>) -> Result<Self> {
        let end = body.load_array_end(T::ALIGNMENT)?;
        let mut values = Vec::new();

        while body.position() < end {
            values.push(T::load_from(body)?);
        }

        Ok(values)
    }
}

impl<T, const N: usize> Loadable for [T; N]
where
    T: Loadable,
{
    fn load_from(body: &mut Body<'_>) -> Result<Self> {
        let values = Vec::<T>::load_from(body)?;
        let len = values.len();

        match <[T; N]>::try_from(values) {
            Ok(values) => Ok(values),
            Err(..) => Err(Error::deserialization(format!(
                "expected array of {N} elements, got {len}"
            ))),
        }
    }
}

fn load_map<M, K, V>(body: &mut Body<'_>, mut insert: impl FnMut(&mut M, K, V), mut map: M) -> Result<M>
where
    K: Loadable + BasicType,
    V: Loadable,
{
    let end = body.load_array_end(8)?;

    while body.position() < end {
        body.align(8)?;
        let key = K::load_from(body)?;
        let value = V::load_from(body)?;
        insert(&mut map, key, value);
    }

    Ok(map)
}

impl<K, V> Loadable for HashMap<K, V>
where
    K: Loadable + BasicType + Eq + Hash,
    V: Loadable,
{
    fn load_from(body: &mut Body<'_>) -> Result<Self> {
        load_map(
            body,
            |map, key, value| {
                map.insert(key, value);
            },
            HashMap::new(),
        )
    }
}

impl<K, V> Loadable for BTreeMap<K, V>
where
    K: Loadable + BasicType + Ord,
    V: Loadable,
{
    fn load_from(body: &mut Body<'_>) -> Result<Self> {
        load_map(
            body,
            |map, key, value| {
                map.insert(key, value);
            },
            BTreeMap::new(),
        )
    }
}

impl<T> Loadable for Struct<T>
where
    T: Loadable,
{
    fn load_from(body: &mut Body<'_>) -> Result<Self> {
        body.align(8)?;
        Ok(Struct(T::load_from(body)?))
    }
}

impl Loadable for () {
    #[inline]
    fn load_from(_: &mut Body<'_>) -> Result<Self> {
        Ok(())
    }
}

macro_rules! impl_tuple {
    ($first:ident $(, $rest:ident)*) => {
        impl<$first, $($rest,)*> Loadable for ($first, $($rest,)*)
        where
            $first: Loadable,
            $($rest: Loadable,)*
        {
            #[inline]
            fn load_from(body: &mut Body<'_>) -> Result<Self> {
                Ok((
                    $first::load_from(body)?,
                    $($rest::load_from(body)?,)*
                ))
            }
        }
    }
}

repeat!(impl_tuple);
