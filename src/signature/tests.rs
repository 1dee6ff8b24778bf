use super::{Signature, SignatureBuf, SignatureBuilder};

#[test]
fn validate_basic_types() {
    assert!(Signature::new("").is_ok());
    assert!(Signature::new("y").is_ok());
    assert!(Signature::new("bnqiuxtd").is_ok());
    assert!(Signature::new("sogvh").is_ok());
    assert!(Signature::new("z").is_err());
    assert!(Signature::new("r").is_err());
    assert!(Signature::new("e").is_err());
}

#[test]
fn validate_containers() {
    assert!(Signature::new("ai").is_ok());
    assert!(Signature::new("aai").is_ok());
    assert!(Signature::new("(i)").is_ok());
    assert!(Signature::new("(isv)").is_ok());
    assert!(Signature::new("a(ii)").is_ok());
    assert!(Signature::new("a{sv}").is_ok());
    assert!(Signature::new("a{s(ii)}").is_ok());
    assert!(Signature::new("a{sa{sv}}").is_ok());
}

#[test]
fn validate_rejects_malformed() {
    // Unterminated containers.
    assert!(Signature::new("a").is_err());
    assert!(Signature::new("(i").is_err());
    assert!(Signature::new("i)").is_err());
    assert!(Signature::new("a{sv").is_err());
    assert!(Signature::new("sv}").is_err());

    // Structs must have fields.
    assert!(Signature::new("()").is_err());

    // Arrays must have an element type.
    assert!(Signature::new("a)").is_err());
    assert!(Signature::new("(a)").is_err());

    // Dict entries take exactly one basic key and one value, inside an
    // array.
    assert!(Signature::new("{sv}").is_err());
    assert!(Signature::new("a{}").is_err());
    assert!(Signature::new("a{s}").is_err());
    assert!(Signature::new("a{svv}").is_err());
    assert!(Signature::new("a{vs}").is_err());
    assert!(Signature::new("a{(i)v}").is_err());
}

#[test]
fn validate_depth_limits() {
    let deep_arrays = "a".repeat(33) + "i";
    assert!(Signature::new(&deep_arrays).is_err());

    let ok_arrays = "a".repeat(32) + "i";
    assert!(Signature::new(&ok_arrays).is_ok());

    let mut deep_structs = "(".repeat(33);
    deep_structs.push('i');
    deep_structs.push_str(&")".repeat(33));
    assert!(Signature::new(&deep_structs).is_err());

    let long = "i".repeat(256);
    assert!(Signature::new(&long).is_err());
}

#[test]
fn iterate_complete_types() {
    let sig = Signature::new("ia(ii)a{sv}v(s(i))").unwrap();
    let types = sig.iter().map(Signature::as_str).collect::<Vec<_>>();
    assert_eq!(types, ["i", "a(ii)", "a{sv}", "v", "(s(i))"]);
}

#[test]
fn split_first() {
    let sig = Signature::new("a{sv}i").unwrap();
    let (head, tail) = sig.split_first().unwrap();
    assert_eq!(head.as_str(), "a{sv}");
    assert_eq!(tail.as_str(), "i");
    assert!(Signature::EMPTY.split_first().is_none());
}

#[test]
fn builder_composes_containers() {
    let mut builder = SignatureBuilder::new();
    builder.open_array().unwrap();
    builder.open_dict_entry().unwrap();
    assert!(builder.extend_from_signature(Signature::STRING));
    assert!(builder.extend_from_signature(Signature::VARIANT));
    builder.close_dict_entry().unwrap();
    builder.close_array();

    assert_eq!(builder.to_signature(), Signature::new("a{sv}").unwrap());
}

#[test]
fn builder_rejects_overflow() {
    let mut builder = SignatureBuilder::new();
    let long = SignatureBuf::new(&"i".repeat(200)).unwrap();

    assert!(builder.extend_from_signature(&*long));
    assert!(!builder.extend_from_signature(&*long));

    let mut builder = SignatureBuilder::new();

    for _ in 0..32 {
        builder.open_array().unwrap();
    }

    assert!(builder.open_array().is_err());
}

#[test]
fn owned_signature_round_trip() {
    let buf = SignatureBuf::new("a{s(iv)}").unwrap();
    assert_eq!(&*buf, Signature::new("a{s(iv)}").unwrap());
    assert_eq!(buf.to_string(), "a{s(iv)}");

    let from_borrowed = Signature::new("au").unwrap().to_owned();
    assert_eq!(from_borrowed, "au");
}

#[test]
fn constants_are_valid() {
    assert_eq!(Signature::STRING.as_str(), "s");
    assert_eq!(Signature::VARIANT.as_str(), "v");
    assert_eq!(Signature::EMPTY.len(), 0);
    assert!(Signature::EMPTY.is_empty());
}
