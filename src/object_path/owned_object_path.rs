use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;

use super::{ObjectPath, ObjectPathError};

/// An owned D-Bus object path.
///
/// # Examples
///
/// ```
/// use busline::{ObjectPath, ObjectPathBuf};
///
/// let path = ObjectPathBuf::new("/com/example/Manager")?;
/// assert_eq!(&*path, ObjectPath::new("/com/example/Manager")?);
/// # Ok::<_, busline::ObjectPathError>(())
/// ```
#[derive(Clone)]
pub struct ObjectPathBuf {
    data: Box<str>,
}

impl ObjectPathBuf {
    /// Construct and validate an owned object path.
    ///
    /// # Errors
    ///
    /// Errors if the candidate is not a well-formed D-Bus object path.
    pub fn new(path: &str) -> Result<Self, ObjectPathError> {
        ObjectPath::new(path)?;

        Ok(Self {
            data: Box::from(path),
        })
    }

    /// Construct an owned object path from a borrowed one.
    pub fn from_object_path(path: &ObjectPath) -> Self {
        Self {
            data: Box::from(path.as_str()),
        }
    }

    /// Coerce into a borrowed [`ObjectPath`].
    #[inline]
    pub fn as_object_path(&self) -> &ObjectPath {
        // SAFETY: Construction ensures the contents are a valid object path.
        unsafe { ObjectPath::new_unchecked(self.data.as_bytes()) }
    }
}

impl Deref for ObjectPathBuf {
    type Target = ObjectPath;

    #[inline]
    fn deref(&self) -> &Self::Target {
        self.as_object_path()
    }
}

impl AsRef<ObjectPath> for ObjectPathBuf {
    #[inline]
    fn as_ref(&self) -> &ObjectPath {
        self
    }
}

impl Borrow<ObjectPath> for ObjectPathBuf {
    #[inline]
    fn borrow(&self) -> &ObjectPath {
        self
    }
}

impl From<&ObjectPath> for ObjectPathBuf {
    #[inline]
    fn from(path: &ObjectPath) -> Self {
        ObjectPathBuf::from_object_path(path)
    }
}

impl fmt::Debug for ObjectPathBuf {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.as_object_path(), f)
    }
}

impl fmt::Display for ObjectPathBuf {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.as_object_path(), f)
    }
}

impl PartialEq for ObjectPathBuf {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.as_object_path() == other.as_object_path()
    }
}

impl Eq for ObjectPathBuf {}

impl PartialEq<ObjectPath> for ObjectPathBuf {
    #[inline]
    fn eq(&self, other: &ObjectPath) -> bool {
        self.as_object_path() == other
    }
}

impl PartialEq<&ObjectPath> for ObjectPathBuf {
    #[inline]
    fn eq(&self, other: &&ObjectPath) -> bool {
        self.as_object_path() == *other
    }
}

impl PartialEq<ObjectPathBuf> for &ObjectPath {
    #[inline]
    fn eq(&self, other: &ObjectPathBuf) -> bool {
        *self == other.as_object_path()
    }
}

impl Hash for ObjectPathBuf {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_object_path().hash(state);
    }
}
