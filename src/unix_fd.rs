use crate::signature::SignatureBuilder;
use crate::{Body, BodyBuf, Loadable, Result, Signature, SignatureError, Storable};

/// The index of a unix file descriptor accompanying a message.
///
/// Marshals with the `h` signature. The descriptors themselves travel
/// out-of-band through the transport; this type only carries the index into
/// that out-of-band list.
///
/// # Examples
///
/// ```
/// use busline::{signature_of, Signature, UnixFd};
///
/// assert_eq!(&*signature_of::<UnixFd>()?, Signature::new("h")?);
/// # Ok::<_, busline::Error>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct UnixFd(
    /// The index into the message's out-of-band descriptor list.
    pub u32,
);

impl Storable for UnixFd {
    const ALIGNMENT: usize = 4;

    #[inline]
    fn write_signature(builder: &mut SignatureBuilder) -> Result<(), SignatureError> {
        if !builder.extend_from_signature(Signature::UNIX_FD) {
            return Err(SignatureError::too_long());
        }

        Ok(())
    }

    #[inline]
    fn store_to(&self, buf: &mut BodyBuf) {
        self.0.store_to(buf);
    }
}

impl crate::BasicType for UnixFd {}

impl Loadable for UnixFd {
    #[inline]
    fn load_from(body: &mut Body<'_>) -> Result<Self> {
        Ok(UnixFd(u32::load_from(body)?))
    }
}
