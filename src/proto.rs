//! Low level protocol details shared by the marshalling core.

use std::fmt;
use std::ops::{BitAnd, BitOr, BitXor};

macro_rules! raw_enum {
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
        #[derive(Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(transparent)]
        $vis struct $name(pub(crate) $repr);

        impl $name {
            $(
                $(#[$($variant_meta)*])*
                $vis const $variant: Self = Self($value);
            )*
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match *self {
                    $(Self::$variant => f.write_str(stringify!($variant)),)*
                    b => write!(f, "INVALID({:02x})", b.0),
                }
            }
        }
    }
}

macro_rules! raw_set {
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
        #[derive(Default, Clone, Copy, PartialEq, Eq)]
        #[repr(transparent)]
        $vis struct $name(pub(crate) $repr);

        impl $name {
            $(
                $(#[$($variant_meta)*])*
                $vis const $variant: Self = Self($value);
            )*
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let mut f = f.debug_set();
                let mut this = *self;

                $(
                    if Self::$variant.0 != 0 && this & Self::$variant {
                        f.entry(&format_args!("{}", stringify!($variant)));
                        this = this ^ Self::$variant;
                    }
                )*

                if this.0 != 0 {
                    f.entry(&format_args!("{:b}", this.0));
                }

                f.finish()
            }
        }
    }
}

raw_enum! {
    /// The byte order applied when marshalling fixed-width values.
    #[repr(u8)]
    pub enum Endianness {
        /// Little endian.
        LITTLE = b'l',
        /// Big endian.
        BIG = b'B',
    }
}

impl Endianness {
    /// Native endian.
    #[cfg(target_endian = "little")]
    pub const NATIVE: Self = Self::LITTLE;
    /// Native endian.
    #[cfg(target_endian = "big")]
    pub const NATIVE: Self = Self::BIG;
}

raw_enum! {
    /// The type of a message.
    #[repr(u8)]
    pub(crate) enum MessageType {
        /// Method call. This message type may prompt a reply.
        METHOD_CALL = 1,
        /// Method reply with returned data.
        METHOD_RETURN = 2,
        /// Error reply.
        ERROR = 3,
        /// Signal emission.
        SIGNAL = 4,
    }
}

raw_set! {
    /// Flags inside of a D-Bus message.
    ///
    /// # Examples
    ///
    /// ```
    /// use busline::Flags;
    ///
    /// let flags = Flags::EMPTY;
    /// assert!(!(flags & Flags::NO_REPLY_EXPECTED));
    ///
    /// let flags = Flags::EMPTY | Flags::NO_REPLY_EXPECTED;
    /// assert!(flags & Flags::NO_REPLY_EXPECTED);
    /// ```
    #[repr(u8)]
    pub enum Flags {
        /// An empty set of flags.
        EMPTY = 0,
        /// This message does not expect method return replies or error
        /// replies; the reply should be omitted.
        NO_REPLY_EXPECTED = 1,
        /// The bus must not launch an owner for the destination name in
        /// response to this message.
        NO_AUTO_START = 2,
    }
}

impl BitOr<Flags> for Flags {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Flags) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl BitAnd<Flags> for Flags {
    type Output = bool;

    #[inline]
    fn bitand(self, rhs: Flags) -> Self::Output {
        self.0 & rhs.0 != 0
    }
}

impl BitXor<Flags> for Flags {
    type Output = Self;

    #[inline]
    fn bitxor(self, rhs: Flags) -> Self::Output {
        Self(self.0 ^ rhs.0)
    }
}

