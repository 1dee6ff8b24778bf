use std::num::NonZeroU32;
use std::time::Duration;

use crate::{Error, Message, MessageKind, ObjectPath, Struct};

const PATH: &ObjectPath = ObjectPath::new_const(b"/com/example/Calculator");

#[test]
fn method_call_headers() {
    let m = Message::method_call(PATH, "Multiply")
        .with_interface("com.example.Calculator")
        .with_destination("com.example.CalculatorService")
        .with_timeout(Duration::from_secs(1));

    assert!(matches!(m.kind(), MessageKind::MethodCall { .. }));
    assert_eq!(m.member(), Some("Multiply"));
    assert_eq!(m.path().map(ObjectPath::as_str), Some("/com/example/Calculator"));
    assert_eq!(m.interface(), Some("com.example.Calculator"));
    assert_eq!(m.destination(), Some("com.example.CalculatorService"));
    assert_eq!(m.timeout(), Some(Duration::from_secs(1)));
    assert_eq!(m.serial(), None);
    assert!(m.is_valid());
}

#[test]
fn struct_payload_round_trip() -> crate::Result<()> {
    let mut m = Message::method_call(PATH, "Describe");
    m.append(&Struct(("hello", 42i32)))?;
    m.seal();

    assert_eq!(m.signature(), "(si)");

    let Struct((s, n)) = m.read::<Struct<(String, i32)>>()?;
    assert_eq!(s, "hello");
    assert_eq!(n, 42);
    Ok(())
}

#[test]
fn read_cursor_persists_across_calls() -> crate::Result<()> {
    let mut m = Message::method_call(PATH, "Pair");
    m.append(&(1u32, "two", 3i64))?;
    m.seal();

    assert_eq!(m.read::<u32>()?, 1);
    assert_eq!(m.read::<String>()?, "two");
    assert_eq!(m.read::<i64>()?, 3);
    assert!(m.read::<u8>().is_err());

    m.rewind();
    assert_eq!(m.read::<u32>()?, 1);
    Ok(())
}

#[test]
fn append_and_read_respect_sealing() -> crate::Result<()> {
    let mut m = Message::method_call(PATH, "Mode");

    // Reads require a sealed message.
    assert!(m.read::<u32>().is_err());

    m.append(&1u32)?;
    m.seal();

    // Appends require build mode.
    assert!(m.append(&2u32).is_err());
    assert_eq!(m.read::<u32>()?, 1);
    Ok(())
}

#[test]
fn no_reply_flag() {
    let mut m = Message::method_call(PATH, "Ping");
    assert!(!m.no_reply());
    m.set_no_reply();
    assert!(m.no_reply());
}

#[test]
fn signal_requires_interface() {
    let m = Message::signal(PATH, "Changed");
    assert!(!m.is_valid());

    let m = m.with_interface("com.example.Calculator");
    assert!(m.is_valid());
}

#[test]
fn replies_flip_addressing() -> crate::Result<()> {
    let call = Message::method_call(PATH, "Multiply")
        .with_sender(":1.7")
        .with_destination("com.example.CalculatorService")
        .with_serial(NonZeroU32::new(9).unwrap());

    let reply = call.method_return()?;
    assert!(matches!(
        reply.kind(),
        MessageKind::MethodReturn { reply_serial } if reply_serial.get() == 9
    ));
    assert_eq!(reply.destination(), Some(":1.7"));
    assert_eq!(reply.sender(), Some("com.example.CalculatorService"));

    let mut error = call.error_reply(&Error::timeout())?;
    assert!(matches!(error.kind(), MessageKind::Error { .. }));
    error.seal();
    assert_eq!(error.read::<String>()?, Error::timeout().to_string());
    Ok(())
}

#[test]
fn replies_require_a_serial() {
    let call = Message::method_call(PATH, "Multiply");
    assert!(call.method_return().is_err());
    assert!(call.error_reply(&Error::timeout()).is_err());
}
