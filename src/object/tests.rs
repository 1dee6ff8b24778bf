use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{mpsc, Arc};
use std::time::Duration;

use parking_lot::Mutex;

use crate::{vtable, BusConnection, LocalBus, Object, ObjectPath, Proxy, Result};

const IFACE: &str = "com.example.Player";
const PATH: &ObjectPath = ObjectPath::new_const(b"/com/example/Player");

const RECV_TIMEOUT: Duration = Duration::from_secs(2);

struct Fixture {
    bus: Arc<LocalBus>,
    object: Object,
    _proxy: Proxy,
    changed: mpsc::Receiver<u32>,
    pinged: mpsc::Receiver<()>,
}

fn fixture() -> Result<Fixture> {
    let bus = LocalBus::builder().build()?;
    let object = Object::new(bus.clone(), PATH)?;

    object
        .with_vtable(vec![
            vtable::signal("Changed").with_parameters::<u32>().build()?,
            vtable::signal("Ping").build()?,
        ])
        .for_interface(IFACE)?;

    let proxy = Proxy::new(bus.clone(), "com.example.PlayerService", PATH);

    let (changed_send, changed) = mpsc::channel();
    let changed_send = Mutex::new(changed_send);

    proxy
        .upon_signal("Changed")
        .on_interface(IFACE)
        .call::<u32, _>(move |state| {
            let _ = changed_send.lock().send(state);
        })?;

    let (ping_send, pinged) = mpsc::channel();
    let ping_send = Mutex::new(ping_send);

    proxy
        .upon_signal("Ping")
        .on_interface(IFACE)
        .call::<(), _>(move |()| {
            let _ = ping_send.lock().send(());
        })?;

    Ok(Fixture {
        bus,
        object,
        _proxy: proxy,
        changed,
        pinged,
    })
}

fn flush(bus: &LocalBus) {
    let (send, recv) = mpsc::channel();

    bus.dispatch_thread_invoke(Box::new(move || {
        let _ = send.send(());
    }));

    let _ = recv.recv_timeout(RECV_TIMEOUT);
}

#[test]
fn emitter_commits_on_scope_exit() -> Result<()> {
    let f = fixture()?;

    {
        let _emitter = f
            .object
            .emit("Changed")
            .on_interface(IFACE)
            .with_arguments(&7u32)?;
    }

    assert_eq!(f.changed.recv_timeout(RECV_TIMEOUT).unwrap(), 7);
    Ok(())
}

#[test]
fn emitter_explicit_terminal() -> Result<()> {
    let f = fixture()?;

    f.object
        .emit("Changed")
        .on_interface(IFACE)
        .with_arguments(&3u32)?
        .emit()?;

    assert_eq!(f.changed.recv_timeout(RECV_TIMEOUT).unwrap(), 3);
    Ok(())
}

#[test]
fn emitter_is_suppressed_while_unwinding() -> Result<()> {
    let f = fixture()?;

    let outcome = catch_unwind(AssertUnwindSafe(|| {
        let _emitter = f
            .object
            .emit("Changed")
            .on_interface(IFACE)
            .with_arguments(&1u32)
            .unwrap();

        panic!("scope failure");
    }));

    assert!(outcome.is_err());
    flush(&f.bus);
    assert!(f.changed.recv_timeout(Duration::from_millis(100)).is_err());
    Ok(())
}

#[test]
fn emitter_defaults_to_empty_payload() -> Result<()> {
    let f = fixture()?;

    f.object.emit("Ping").on_interface(IFACE).emit()?;

    assert!(f.pinged.recv_timeout(RECV_TIMEOUT).is_ok());
    Ok(())
}

#[test]
fn emitter_without_interface_fails() -> Result<()> {
    let f = fixture()?;

    assert!(f.object.emit("Changed").emit().is_err());

    // Through the drop path, the failed commit has nowhere to report and
    // panics instead.
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        let _emitter = f.object.emit("Changed");
    }));
    assert!(outcome.is_err());
    Ok(())
}

#[test]
fn emit_signal_enforces_declarations() -> Result<()> {
    let f = fixture()?;

    // Undeclared member.
    let msg = f.object.create_signal(IFACE, "Vanished");
    assert!(f.object.emit_signal(msg).is_err());

    // Undeclared interface.
    let msg = f.object.create_signal("com.example.Missing", "Changed");
    assert!(f.object.emit_signal(msg).is_err());

    // Signature not matching the declaration.
    let mut msg = f.object.create_signal(IFACE, "Changed");
    msg.append(&"seven")?;
    assert!(f.object.emit_signal(msg).is_err());

    // The declared payload passes.
    let mut msg = f.object.create_signal(IFACE, "Changed");
    msg.append(&7u32)?;
    f.object.emit_signal(msg)?;
    assert_eq!(f.changed.recv_timeout(RECV_TIMEOUT).unwrap(), 7);
    Ok(())
}
