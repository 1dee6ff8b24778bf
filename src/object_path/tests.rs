use super::{ObjectPath, ObjectPathBuf};

#[test]
fn validate_paths() {
    assert!(ObjectPath::new("/").is_ok());
    assert!(ObjectPath::new("/com").is_ok());
    assert!(ObjectPath::new("/com/example/Calculator").is_ok());
    assert!(ObjectPath::new("/a_b/c0").is_ok());

    assert!(ObjectPath::new("").is_err());
    assert!(ObjectPath::new("com/example").is_err());
    assert!(ObjectPath::new("/com//example").is_err());
    assert!(ObjectPath::new("/com/example/").is_err());
    assert!(ObjectPath::new("/com/exa-mple").is_err());
    assert!(ObjectPath::new("/com/exämple").is_err());
}

#[test]
fn const_construction() {
    const PATH: &ObjectPath = ObjectPath::new_const(b"/org/freedesktop/DBus");
    assert_eq!(PATH.as_str(), "/org/freedesktop/DBus");
}

#[test]
fn owned_round_trip() {
    let path = ObjectPathBuf::new("/com/example/Manager").unwrap();
    assert_eq!(&*path, ObjectPath::new("/com/example/Manager").unwrap());
    assert_eq!(path.to_string(), "/com/example/Manager");

    let from_borrowed = ObjectPath::ROOT.to_owned();
    assert_eq!(from_borrowed.as_str(), "/");
}
