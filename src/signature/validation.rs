use super::{SignatureError, SignatureErrorKind, MAX_CONTAINER_DEPTH, MAX_DEPTH, MAX_SIGNATURE};

const KIND_ARRAY: u8 = 1;
const KIND_STRUCT: u8 = 2;
const KIND_DICT: u8 = 3;

/// Validate a candidate signature.
///
/// This is a `const fn` so that signatures can be checked when constructing
/// constants.
pub(crate) const fn validate(bytes: &[u8]) -> Result<(), SignatureError> {
    use SignatureErrorKind::*;

    if bytes.len() > MAX_SIGNATURE {
        return Err(SignatureError::new(SignatureTooLong));
    }

    // Stack of open containers, tracked as (kind, completed field count).
    let mut kinds = [0u8; MAX_DEPTH];
    let mut counts = [0u8; MAX_DEPTH];
    let mut depth = 0usize;

    let mut arrays = 0usize;
    let mut structs = 0usize;
    let mut n = 0usize;

    while n < bytes.len() {
        let b = bytes[n];
        n += 1;

        let mut is_basic = match b {
            b'y' | b'b' | b'n' | b'q' | b'i' | b'u' | b'x' | b't' | b'd' | b's' | b'o' | b'g'
            | b'h' => true,
            b'v' => false,
            b'a' => {
                if depth == MAX_DEPTH || arrays == MAX_CONTAINER_DEPTH {
                    return Err(SignatureError::new(ExceededMaximumArrayRecursion));
                }

                kinds[depth] = KIND_ARRAY;
                counts[depth] = 0;
                depth += 1;
                arrays += 1;
                continue;
            }
            b'(' => {
                if depth == MAX_DEPTH || structs == MAX_CONTAINER_DEPTH {
                    return Err(SignatureError::new(ExceededMaximumStructRecursion));
                }

                kinds[depth] = KIND_STRUCT;
                counts[depth] = 0;
                depth += 1;
                structs += 1;
                continue;
            }
            b')' => {
                if depth == 0 {
                    return Err(SignatureError::new(StructEndedButNotStarted));
                }

                depth -= 1;

                match kinds[depth] {
                    KIND_STRUCT => {}
                    KIND_ARRAY => {
                        return Err(SignatureError::new(MissingArrayElementType));
                    }
                    _ => {
                        return Err(SignatureError::new(StructEndedButNotStarted));
                    }
                }

                if counts[depth] == 0 {
                    return Err(SignatureError::new(StructHasNoFields));
                }

                structs -= 1;
                false
            }
            b'{' => {
                if depth == MAX_DEPTH {
                    return Err(SignatureError::new(ExceededMaximumDictRecursion));
                }

                kinds[depth] = KIND_DICT;
                counts[depth] = 0;
                depth += 1;
                continue;
            }
            b'}' => {
                if depth == 0 {
                    return Err(SignatureError::new(DictEndedButNotStarted));
                }

                depth -= 1;

                match kinds[depth] {
                    KIND_DICT => {}
                    KIND_ARRAY => {
                        return Err(SignatureError::new(MissingArrayElementType));
                    }
                    _ => {
                        return Err(SignatureError::new(DictEndedButNotStarted));
                    }
                }

                match counts[depth] {
                    0 => return Err(SignatureError::new(DictEntryHasNoFields)),
                    1 => return Err(SignatureError::new(DictEntryHasOnlyOneField)),
                    2 => {}
                    _ => return Err(SignatureError::new(DictEntryHasTooManyFields)),
                }

                if depth == 0 || kinds[depth - 1] != KIND_ARRAY {
                    return Err(SignatureError::new(DictEntryNotInsideArray));
                }

                false
            }
            b => return Err(SignatureError::new(UnknownTypeCode(b))),
        };

        // A complete type closes every array it is the element of.
        while depth > 0 && kinds[depth - 1] == KIND_ARRAY {
            depth -= 1;
            arrays -= 1;
            is_basic = false;
        }

        if depth > 0 && kinds[depth - 1] == KIND_DICT && counts[depth - 1] == 0 && !is_basic {
            return Err(SignatureError::new(DictKeyMustBeBasicType));
        }

        if depth > 0 {
            counts[depth - 1] = counts[depth - 1].saturating_add(1);
        }
    }

    if depth > 0 {
        return match kinds[depth - 1] {
            KIND_ARRAY => Err(SignatureError::new(MissingArrayElementType)),
            KIND_STRUCT => Err(SignatureError::new(StructStartedButNotEnded)),
            _ => Err(SignatureError::new(DictStartedButNotEnded)),
        };
    }

    Ok(())
}
