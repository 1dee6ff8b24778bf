use std::error;
use std::fmt;

/// Detailed errors raised when validating or composing a [`Signature`].
///
/// [`Signature`]: super::Signature
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignatureError {
    kind: SignatureErrorKind,
}

impl SignatureError {
    #[inline]
    pub(crate) const fn new(kind: SignatureErrorKind) -> Self {
        Self { kind }
    }

    /// A signature that has exceeded the maximum permitted length.
    #[inline]
    pub(crate) const fn too_long() -> Self {
        Self::new(SignatureErrorKind::SignatureTooLong)
    }
}

impl fmt::Display for SignatureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use SignatureErrorKind::*;

        match self.kind {
            SignatureTooLong => write!(f, "Signature is longer than 255 bytes"),
            UnknownTypeCode(code) => write!(f, "Unknown type code {:?}", code as char),
            ExceededMaximumArrayRecursion => write!(f, "Exceeded maximum array recursion"),
            ExceededMaximumStructRecursion => write!(f, "Exceeded maximum struct recursion"),
            ExceededMaximumDictRecursion => write!(f, "Exceeded maximum dict recursion"),
            MissingArrayElementType => write!(f, "Missing array element type"),
            StructEndedButNotStarted => write!(f, "Struct ended but not started"),
            StructStartedButNotEnded => write!(f, "Struct started but not ended"),
            StructHasNoFields => write!(f, "Struct has no fields"),
            DictEndedButNotStarted => write!(f, "Dict ended but not started"),
            DictStartedButNotEnded => write!(f, "Dict started but not ended"),
            DictEntryHasNoFields => write!(f, "Dict entry has no fields"),
            DictEntryHasOnlyOneField => write!(f, "Dict entry has only one field"),
            DictEntryHasTooManyFields => write!(f, "Dict entry has too many fields"),
            DictEntryNotInsideArray => write!(f, "Dict entry not inside of an array"),
            DictKeyMustBeBasicType => write!(f, "Dict key must be a basic type"),
        }
    }
}

impl error::Error for SignatureError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SignatureErrorKind {
    SignatureTooLong,
    UnknownTypeCode(u8),
    ExceededMaximumArrayRecursion,
    ExceededMaximumStructRecursion,
    ExceededMaximumDictRecursion,
    MissingArrayElementType,
    StructEndedButNotStarted,
    StructStartedButNotEnded,
    StructHasNoFields,
    DictEndedButNotStarted,
    DictStartedButNotEnded,
    DictEntryHasNoFields,
    DictEntryHasOnlyOneField,
    DictEntryHasTooManyFields,
    DictEntryNotInsideArray,
    DictKeyMustBeBasicType,
}
