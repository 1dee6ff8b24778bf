/// Helper to efficiently repeat type parameters.
macro_rules! repeat {
    ($macro:path) => {
        $macro!(A);
        $macro!(A, B);
        $macro!(A, B, C);
        $macro!(A, B, C, D);
        $macro!(A, B, C, D, E);
        $macro!(A, B, C, D, E, F);
        $macro!(A, B, C, D, E, F, G);
        $macro!(A, B, C, D, E, F, G, H);
        $macro!(A, B, C, D, E, F, G, H, I);
        $macro!(A, B, C, D, E, F, G, H, I, J);
        $macro!(A, B, C, D, E, F, G, H, I, J, K);
        $macro!(A, B, C, D, E, F, G, H, I, J, K, L);
        $macro!(A, B, C, D, E, F, G, H, I, J, K, L, M);
        $macro!(A, B, C, D, E, F, G, H, I, J, K, L, M, N);
        $macro!(A, B, C, D, E, F, G, H, I, J, K, L, M, N, O);
        $macro!(A, B, C, D, E, F, G, H, I, J, K, L, M, N, O, P);
    };
}

/// Implement [`Storable`] and [`Loadable`] for a fieldless enumeration with an
/// unsigned underlying representation.
///
/// The enumeration marshals as its underlying integer and carries that
/// integer's signature. Reading a discriminant with no matching variant fails
/// with a deserialization error.
///
/// [`Storable`]: crate::Storable
/// [`Loadable`]: crate::Loadable
///
/// # Examples
///
/// ```
/// use busline::{signature_of, BodyBuf, Signature};
///
/// busline::unsigned_enum! {
///     /// The operating mode of a device.
///     #[repr(u32)]
///     pub enum Mode {
///         Idle = 0,
///         Active = 1,
///     }
/// }
///
/// assert_eq!(&*signature_of::<Mode>()?, Signature::new("u")?);
///
/// let mut body = BodyBuf::new();
/// body.append(&Mode::Active)?;
///
/// let mut read = body.as_body();
/// assert_eq!(read.read::<Mode>()?, Mode::Active);
/// # Ok::<_, busline::Error>(())
/// ```
#[macro_export]
macro_rules! unsigned_enum {
    (
        $(#[doc = $doc:literal])*
        #[repr($repr:ty)]
        $vis:vis enum $name:ident {
            $(
                $(#[$($variant_meta:meta)*])*
                $variant:ident = $value:expr
            ),* $(,)?
        }
    ) => {
        $(#[doc = $doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr($repr)]
        $vis enum $name {
            $(
                $(#[$($variant_meta)*])*
                $variant = $value,
            )*
        }

        impl $crate::Storable for $name {
            const ALIGNMENT: usize = <$repr as $crate::Storable>::ALIGNMENT;
            const TRIVIAL: bool = true;

            #[inline]
            fn write_signature(
                builder: &mut $crate::SignatureBuilder,
            ) -> ::core::result::Result<(), $crate::SignatureError> {
                <$repr as $crate::Storable>::write_signature(builder)
            }

            #[inline]
            fn store_to(&self, buf: &mut $crate::BodyBuf) {
                (*self as $repr).store_to(buf);
            }
        }

        impl $crate::Loadable for $name {
            fn load_from(body: &mut $crate::Body<'_>) -> $crate::Result<Self> {
                let raw = <$repr as $crate::Loadable>::load_from(body)?;

                match raw {
                    $($value => Ok($name::$variant),)*
                    _ => Err($crate::Error::deserialization(::std::format!(
                        "no variant of `{}` has discriminant {raw}",
                        ::core::stringify!($name),
                    ))),
                }
            }
        }
    };
}
