use std::collections::HashMap;

use crate::signature::SignatureBuilder;
use crate::{
    Body, BodyBuf, Error, Loadable, Result, Signature, SignatureError, Storable, Variant,
};

/// The policy applied to unknown keys when reading a dict-shaped struct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnknownKeys {
    /// Every dict key must map to a field; an unknown key fails the read.
    Strict,
    /// Unknown keys are ignored.
    Relaxed,
}

/// A struct-shaped type that marshals as a string-keyed dictionary of
/// variants (`a{sv}`) instead of a parenthesized struct.
///
/// Wrap values in [`AsDictionary`] to apply the dictionary representation.
pub trait DictFields: Sized {
    /// The policy applied to unknown keys when reading.
    const UNKNOWN_KEYS: UnknownKeys = UnknownKeys::Strict;

    /// The names of the fields of the type.
    fn field_names() -> &'static [&'static str];

    /// Decompose into named field values.
    fn to_fields(&self) -> Vec<(&'static str, Variant)>;

    /// Recompose from named field values.
    ///
    /// Fields are removed from `fields` as they are consumed; keys not named
    /// by [`field_names`] have already been handled according to
    /// [`UNKNOWN_KEYS`].
    ///
    /// [`field_names`]: DictFields::field_names
    /// [`UNKNOWN_KEYS`]: DictFields::UNKNOWN_KEYS
    fn from_fields(fields: &mut HashMap<String, Variant>) -> Result<Self>;
}

/// Wrapper marshalling a [`DictFields`] type as `a{sv}`.
///
/// # Examples
///
/// ```
/// use std::collections::HashMap;
///
/// use busline::{AsDictionary, BodyBuf, DictFields, Result, Variant};
///
/// struct Options {
///     speed: u32,
/// }
///
/// impl DictFields for Options {
///     fn field_names() -> &'static [&'static str] {
///         &["speed"]
///     }
///
///     fn to_fields(&self) -> Vec<(&'static str, Variant)> {
///         vec![("speed", Variant::U32(self.speed))]
///     }
///
///     fn from_fields(fields: &mut HashMap<String, Variant>) -> Result<Self> {
///         let speed = match fields.remove("speed") {
///             Some(v) => v.get::<u32>()?,
///             None => 0,
///         };
///
///         Ok(Options { speed })
///     }
/// }
///
/// let mut body = BodyBuf::new();
/// body.append(&AsDictionary(Options { speed: 120 }))?;
/// assert_eq!(body.signature(), "a{sv}");
///
/// let mut read = body.as_body();
/// let options = read.read::<AsDictionary<Options>>()?.0;
/// assert_eq!(options.speed, 120);
/// # Ok::<_, busline::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct AsDictionary<T>(
    /// The wrapped struct-shaped value.
    pub T,
);

const DICT_SIGNATURE: &Signature = Signature::new_const(b"a{sv}");

impl<T> Storable for AsDictionary<T>
where
    T: DictFields,
{
    const ALIGNMENT: usize = 4;

    #[inline]
    fn write_signature(builder: &mut SignatureBuilder) -> Result<(), SignatureError> {
        if !builder.extend_from_signature(DICT_SIGNATURE) {
            return Err(SignatureError::too_long());
        }

        Ok(())
    }

    fn store_to(&self, buf: &mut BodyBuf) {
        let at = buf.reserve_array_len();
        buf.align(8);
        let start = buf.position();

        for (name, value) in self.0.to_fields() {
            buf.align(8);
            name.store_to(buf);
            value.store_to(buf);
        }

        buf.finish_array_len(at, start);
    }
}

impl<T> Loadable for AsDictionary<T>
where
    T: DictFields,
{
    fn load_from(body: &mut Body<'_>) -> Result<Self> {
        let mut fields = HashMap::<String, Variant>::load_from(body)?;

        match T::UNKNOWN_KEYS {
            UnknownKeys::Strict => {
                for key in fields.keys() {
                    if !T::field_names().contains(&key.as_str()) {
                        return Err(Error::deserialization(format!(
                            "dictionary key {key:?} does not name a field"
                        )));
                    }
                }
            }
            UnknownKeys::Relaxed => {
                fields.retain(|key, _| T::field_names().contains(&key.as_str()));
            }
        }

        T::from_fields(&mut fields).map(AsDictionary)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::{AsDictionary, DictFields, UnknownKeys};
    use crate::{BodyBuf, Result, Variant};

    #[derive(Debug, PartialEq)]
    struct Strict {
        speed: u32,
    }

    impl DictFields for Strict {
        fn field_names() -> &'static [&'static str] {
            &["speed"]
        }

        fn to_fields(&self) -> Vec<(&'static str, Variant)> {
            vec![("speed", Variant::U32(self.speed))]
        }

        fn from_fields(fields: &mut HashMap<String, Variant>) -> Result<Self> {
            let speed = match fields.remove("speed") {
                Some(value) => value.get::<u32>()?,
                None => 0,
            };

            Ok(Strict { speed })
        }
    }

    #[derive(Debug, PartialEq)]
    struct Relaxed {
        speed: u32,
    }

    impl DictFields for Relaxed {
        const UNKNOWN_KEYS: UnknownKeys = UnknownKeys::Relaxed;

        fn field_names() -> &'static [&'static str] {
            Strict::field_names()
        }

        fn to_fields(&self) -> Vec<(&'static str, Variant)> {
            vec![("speed", Variant::U32(self.speed))]
        }

        fn from_fields(fields: &mut HashMap<String, Variant>) -> Result<Self> {
            Ok(Relaxed {
                speed: Strict::from_fields(fields)?.speed,
            })
        }
    }

    fn dict_with_unknown_key() -> Result<BodyBuf> {
        let mut map = HashMap::new();
        map.insert(String::from("speed"), Variant::U32(120));
        map.insert(String::from("mystery"), Variant::Bool(true));

        let mut body = BodyBuf::new();
        body.append(&map)?;
        Ok(body)
    }

    #[test]
    fn struct_as_dictionary_round_trip() -> Result<()> {
        let mut body = BodyBuf::new();
        body.append(&AsDictionary(Strict { speed: 120 }))?;

        assert_eq!(body.signature(), "a{sv}");

        let mut read = body.as_body();
        assert_eq!(read.read::<AsDictionary<Strict>>()?.0, Strict { speed: 120 });
        Ok(())
    }

    #[test]
    fn strict_rejects_unknown_keys() -> Result<()> {
        let body = dict_with_unknown_key()?;
        let mut read = body.as_body();
        assert!(read.read::<AsDictionary<Strict>>().is_err());
        Ok(())
    }

    #[test]
    fn relaxed_ignores_unknown_keys() -> Result<()> {
        let body = dict_with_unknown_key()?;
        let mut read = body.as_body();
        assert_eq!(
            read.read::<AsDictionary<Relaxed>>()?.0,
            Relaxed { speed: 120 },
        );
        Ok(())
    }

    #[test]
    fn missing_field_uses_default() -> Result<()> {
        let mut body = BodyBuf::new();
        body.append(&HashMap::<String, Variant>::new())?;

        let mut read = body.as_body();
        assert_eq!(read.read::<AsDictionary<Strict>>()?.0, Strict { speed: 0 });
        Ok(())
    }
}
