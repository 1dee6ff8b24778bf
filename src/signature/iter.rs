use super::Signature;

/// Find the end of the complete type starting at `at`.
///
/// Assumes the slice is a valid signature, which every caller guarantees by
/// construction.
pub(crate) fn complete_type_len(bytes: &[u8], at: usize) -> usize {
    let mut n = at;

    // Leading array codes.
    while bytes[n] == b'a' {
        n += 1;
    }

    match bytes[n] {
        open @ (b'(' | b'{') => {
            let close = if open == b'(' { b')' } else { b'}' };
            let mut depth = 1usize;
            n += 1;

            while depth > 0 {
                if bytes[n] == open {
                    depth += 1;
                } else if bytes[n] == close {
                    depth -= 1;
                }

                n += 1;
            }
        }
        _ => {
            n += 1;
        }
    }

    n
}

/// An iterator over the complete types of a [`Signature`].
///
/// Constructed through [`Signature::iter`].
///
/// # Examples
///
/// ```
/// use busline::Signature;
///
/// let sig = Signature::new("ia(ii)")?;
/// let mut it = sig.iter();
///
/// assert_eq!(it.next().map(Signature::as_str), Some("i"));
/// assert_eq!(it.next().map(Signature::as_str), Some("a(ii)"));
/// assert_eq!(it.next(), None);
/// # Ok::<_, busline::SignatureError>(())
/// ```
pub struct SignatureIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> SignatureIter<'a> {
    #[inline]
    pub(crate) fn new(signature: &'a Signature) -> Self {
        Self {
            data: signature.as_bytes(),
            pos: 0,
        }
    }
}

impl<'a> Iterator for SignatureIter<'a> {
    type Item = &'a Signature;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos == self.data.len() {
            return None;
        }

        let end = complete_type_len(self.data, self.pos);
        let item = &self.data[self.pos..end];
        self.pos = end;
        // SAFETY: A complete type of a valid signature is a valid signature.
        Some(unsafe { Signature::new_unchecked(item) })
    }
}
