use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Duration;

use parking_lot::Mutex;

use crate::org_freedesktop_dbus as names;
use crate::{
    vtable, BusConnection, Error, ErrorKind, LocalBus, MethodResult, Object, ObjectPath, Proxy,
    Result, Variant,
};

const SERVICE: &str = "com.example.CalculatorService";
const IFACE: &str = "com.example.Calculator";
const PATH: &ObjectPath = ObjectPath::new_const(b"/com/example/Calculator");

const RECV_TIMEOUT: Duration = Duration::from_secs(2);

struct Fixture {
    bus: Arc<LocalBus>,
    object: Object,
    proxy: Proxy,
    speed: Arc<Mutex<f64>>,
    stalled: Arc<Mutex<Option<MethodResult>>>,
    no_reply_seen: mpsc::Receiver<bool>,
}

fn fixture() -> Result<Fixture> {
    let bus = LocalBus::builder()
        .with_default_timeout(Duration::from_secs(2))
        .build()?;

    let object = Object::new(bus.clone(), PATH)?;

    let speed = Arc::new(Mutex::new(120.0f64));
    let stalled = Arc::new(Mutex::new(None));
    let (no_reply_send, no_reply_seen) = mpsc::channel();
    let no_reply_send = Mutex::new(no_reply_send);

    let speed_get = speed.clone();
    let speed_set = speed.clone();
    let stall = stalled.clone();

    let items = vec![
        vtable::method("Multiply")
            .with_inputs::<(i32, i32)>()
            .with_input_param_names(["a", "b"])
            .with_outputs::<i32>()
            .with_output_param_names(["product"])
            .implemented_as(|call, result| match call.read::<(i32, i32)>() {
                Ok((a, b)) => {
                    let _ = result.send(&(a * b));
                }
                Err(error) => result.send_error(&error),
            })?,
        vtable::method("Divide")
            .with_inputs::<(i32, i32)>()
            .with_outputs::<i32>()
            .implemented_as(|call, result| match call.read::<(i32, i32)>() {
                Ok((_, 0)) => {
                    result.send_error(&Error::invalid_args("division by zero"));
                }
                Ok((a, b)) => {
                    let _ = result.send(&(a / b));
                }
                Err(error) => result.send_error(&error),
            })?,
        vtable::method("Seven")
            .with_outputs::<i32>()
            .implemented_as(|_, result| {
                let _ = result.send(&7i32);
            })?,
        vtable::method("Pair")
            .with_outputs::<(i32, String)>()
            .implemented_as(|_, result| {
                let _ = result.send(&(3i32, "x"));
            })?,
        vtable::method("Boom").implemented_as(|_, result| {
            result.send_error(&Error::remote("com.example.Error.Boom", "kaboom"));
        })?,
        vtable::method("Ignore").implemented_as(|_, result| {
            drop(result);
        })?,
        vtable::method("Stall").implemented_as(move |_, result| {
            *stall.lock() = Some(result);
        })?,
        vtable::method("RecordFlag").implemented_as(move |call, result| {
            let _ = no_reply_send.lock().send(call.no_reply());
            let _ = result.send(&());
        })?,
        vtable::signal("Changed")
            .with_parameters::<u32>()
            .with_parameter_names(["state"])
            .build()?,
        vtable::property("Speed")
            .of::<f64>()
            .with_getter(move || *speed_get.lock())
            .with_setter(move |value: f64| *speed_set.lock() = value)
            .build()?,
        vtable::property("Model")
            .of::<String>()
            .with_getter(|| String::from("T-1000"))
            .emits_changed(false)
            .build()?,
    ];

    object.with_vtable(items).for_interface(IFACE)?;

    let proxy = Proxy::new(bus.clone(), SERVICE, PATH);

    Ok(Fixture {
        bus,
        object,
        proxy,
        speed,
        stalled,
        no_reply_seen,
    })
}

/// Run a round through the dispatch thread, so everything queued before has
/// been delivered.
fn flush(bus: &LocalBus) {
    let (send, recv) = mpsc::channel();

    bus.dispatch_thread_invoke(Box::new(move || {
        let _ = send.send(());
    }));

    let _ = recv.recv_timeout(RECV_TIMEOUT);
}

fn emit_changed(object: &Object, state: u32) -> Result<()> {
    object
        .emit("Changed")
        .on_interface(IFACE)
        .with_arguments(&state)?
        .emit()
}

#[test]
fn sync_call_round_trip() -> Result<()> {
    let f = fixture()?;

    let product: i32 = f
        .proxy
        .call_method("Multiply")
        .on_interface(IFACE)
        .with_arguments(&(6i32, 7i32))?
        .reply()?;

    assert_eq!(product, 42);
    Ok(())
}

#[test]
fn sync_call_remote_error() -> Result<()> {
    let f = fixture()?;

    let result: Result<i32> = f
        .proxy
        .call_method("Divide")
        .on_interface(IFACE)
        .with_arguments(&(1i32, 0i32))?
        .reply();

    let error = result.unwrap_err();
    assert!(matches!(error.kind(), ErrorKind::InvalidArgs(..)));
    Ok(())
}

#[test]
fn unknown_targets_report_well_known_errors() -> Result<()> {
    let f = fixture()?;

    let error = f
        .proxy
        .call_method("Nope")
        .on_interface(IFACE)
        .reply::<()>()
        .unwrap_err();
    assert!(matches!(error.kind(), ErrorKind::UnknownMethod(..)));

    let error = f
        .proxy
        .call_method("Multiply")
        .on_interface("com.example.Missing")
        .reply::<()>()
        .unwrap_err();
    assert!(matches!(error.kind(), ErrorKind::UnknownInterface(..)));

    // Mismatched argument signature.
    let error = f
        .proxy
        .call_method("Multiply")
        .on_interface(IFACE)
        .with_arguments(&"six")?
        .reply::<i32>()
        .unwrap_err();
    assert!(matches!(error.kind(), ErrorKind::InvalidArgs(..)));
    Ok(())
}

#[test]
fn async_future_single() -> Result<()> {
    let f = fixture()?;

    let future = f
        .proxy
        .call_method_async("Seven")
        .on_interface(IFACE)
        .get_result_as_future::<i32>()?;

    assert_eq!(future.get()?, 7);

    let future = f
        .proxy
        .call_method_async("Boom")
        .on_interface(IFACE)
        .get_result_as_future::<i32>()?;

    let error = future.get().unwrap_err();
    assert_eq!(error.name(), "com.example.Error.Boom");
    assert!(matches!(error.kind(), ErrorKind::RemoteError { .. }));
    Ok(())
}

#[test]
fn async_future_multi() -> Result<()> {
    let f = fixture()?;

    let future = f
        .proxy
        .call_method_async("Pair")
        .on_interface(IFACE)
        .get_result_as_future::<(i32, String)>()?;

    assert_eq!(future.get()?, (3, String::from("x")));
    Ok(())
}

#[test]
fn async_future_awaits() -> Result<()> {
    let f = fixture()?;

    let future = f
        .proxy
        .call_method_async("Seven")
        .on_interface(IFACE)
        .get_result_as_future::<i32>()?;

    assert_eq!(futures::executor::block_on(future)?, 7);
    Ok(())
}

#[test]
fn async_callback_is_invoked_once() -> Result<()> {
    let f = fixture()?;
    let (send, recv) = mpsc::channel();

    f.proxy
        .call_method_async("Seven")
        .on_interface(IFACE)
        .upon_reply_invoke::<i32, _>(move |result| {
            let _ = send.send(result);
        })?;

    let result = recv.recv_timeout(RECV_TIMEOUT).expect("callback fired");
    assert_eq!(result?, 7);
    assert!(recv.recv_timeout(Duration::from_millis(100)).is_err());
    Ok(())
}

#[test]
fn async_deserialization_failure_routes_through_callback() -> Result<()> {
    let f = fixture()?;
    let (send, recv) = mpsc::channel();

    // Seven replies with an i32, which does not decode as a String.
    f.proxy
        .call_method_async("Seven")
        .on_interface(IFACE)
        .upon_reply_invoke::<String, _>(move |result| {
            let _ = send.send(result);
        })?;

    let result = recv.recv_timeout(RECV_TIMEOUT).expect("callback fired");
    let error = result.unwrap_err();
    assert!(matches!(error.kind(), ErrorKind::DeserializationFailure(..)));
    Ok(())
}

#[test]
fn no_reply_call_does_not_block_and_sets_flag() -> Result<()> {
    let f = fixture()?;

    f.proxy
        .call_method("RecordFlag")
        .on_interface(IFACE)
        .dont_expect_reply()
        .send()?;

    let flagged = f
        .no_reply_seen
        .recv_timeout(RECV_TIMEOUT)
        .expect("dispatched");
    assert!(flagged);
    Ok(())
}

#[test]
fn signals_reach_subscribers_in_order() -> Result<()> {
    let f = fixture()?;
    let (send, recv) = mpsc::channel();
    let send = Mutex::new(send);

    f.proxy
        .upon_signal("Changed")
        .on_interface(IFACE)
        .call::<u32, _>(move |state| {
            let _ = send.lock().send(state);
        })?;

    for n in 0..5u32 {
        emit_changed(&f.object, n)?;
    }

    let mut seen = Vec::new();

    for _ in 0..5 {
        seen.push(recv.recv_timeout(RECV_TIMEOUT).expect("signal delivered"));
    }

    assert_eq!(seen, [0, 1, 2, 3, 4]);
    Ok(())
}

#[test]
fn undecodable_signal_is_dropped_by_pure_handler() -> Result<()> {
    let f = fixture()?;
    let (pure_send, pure_recv) = mpsc::channel();
    let pure_send = Mutex::new(pure_send);
    let (err_send, err_recv) = mpsc::channel();
    let err_send = Mutex::new(err_send);

    f.proxy
        .upon_signal("Changed")
        .on_interface(IFACE)
        .call::<u32, _>(move |state| {
            let _ = pure_send.lock().send(state);
        })?;

    f.proxy
        .upon_signal("Changed")
        .on_interface(IFACE)
        .call_with_error::<u32, _>(move |result| {
            let _ = err_send.lock().send(result);
        })?;

    // Bypass the object's declaration check and publish a signal whose
    // payload is not a u32.
    let mut bogus = crate::Message::signal(PATH, "Changed").with_interface(IFACE);
    bogus.append(&"not a number")?;
    f.bus.send_signal(bogus)?;

    let result = err_recv
        .recv_timeout(RECV_TIMEOUT)
        .expect("error handler fired");
    assert!(result.is_err());
    assert!(pure_recv.recv_timeout(Duration::from_millis(100)).is_err());
    Ok(())
}

#[test]
fn unsubscribing_stops_delivery() -> Result<()> {
    let f = fixture()?;
    let (send, recv) = mpsc::channel();
    let send = Mutex::new(send);

    f.proxy
        .upon_signal("Changed")
        .on_interface(IFACE)
        .call::<u32, _>(move |state| {
            let _ = send.lock().send(state);
        })?;

    emit_changed(&f.object, 1)?;
    assert_eq!(recv.recv_timeout(RECV_TIMEOUT).unwrap(), 1);

    f.proxy.unregister_signal_handler(IFACE, "Changed");
    flush(&f.bus);

    emit_changed(&f.object, 2)?;
    assert!(recv.recv_timeout(Duration::from_millis(100)).is_err());
    Ok(())
}

#[test]
fn returned_subscription_slot_governs_lifetime() -> Result<()> {
    let f = fixture()?;
    let (send, recv) = mpsc::channel();
    let send = Mutex::new(send);

    let slot = f
        .proxy
        .upon_signal("Changed")
        .on_interface(IFACE)
        .call_with_slot::<u32, _>(move |state| {
            let _ = send.lock().send(state);
        })?;

    emit_changed(&f.object, 1)?;
    assert_eq!(recv.recv_timeout(RECV_TIMEOUT).unwrap(), 1);

    slot.release();
    flush(&f.bus);

    emit_changed(&f.object, 2)?;
    assert!(recv.recv_timeout(Duration::from_millis(100)).is_err());
    Ok(())
}

#[test]
fn property_get_set_and_get_all() -> Result<()> {
    let f = fixture()?;

    let speed: f64 = f.proxy.get_property("Speed").on_interface(IFACE).get()?;
    assert_eq!(speed, 120.0);

    f.proxy
        .set_property("Speed")
        .on_interface(IFACE)
        .to_value(&130.0f64)?;
    assert_eq!(*f.speed.lock(), 130.0);

    let all = f.proxy.get_all_properties().on_interface(IFACE).get()?;
    assert_eq!(all.len(), 2);
    assert_eq!(all["Speed"], Variant::F64(130.0));
    assert_eq!(all["Model"], Variant::String(String::from("T-1000")));

    let error = f
        .proxy
        .get_property("Nope")
        .on_interface(IFACE)
        .get::<f64>()
        .unwrap_err();
    assert!(matches!(error.kind(), ErrorKind::UnknownProperty(..)));

    // Model has no setter.
    let error = f
        .proxy
        .set_property("Model")
        .on_interface(IFACE)
        .to_value(&"T-800")
        .unwrap_err();
    assert!(matches!(error.kind(), ErrorKind::AccessDenied(..)));
    Ok(())
}

#[test]
fn property_set_emits_properties_changed() -> Result<()> {
    let f = fixture()?;
    let (send, recv) = mpsc::channel();
    let send = Mutex::new(send);

    f.proxy
        .upon_signal(names::PROPERTIES_CHANGED)
        .on_interface(names::PROPERTIES)
        .call::<(String, HashMap<String, Variant>, Vec<String>), _>(move |changed| {
            let _ = send.lock().send(changed);
        })?;

    f.proxy
        .set_property("Speed")
        .on_interface(IFACE)
        .to_value(&140.0f64)?;

    let (interface, changed, invalidated) =
        recv.recv_timeout(RECV_TIMEOUT).expect("signal delivered");
    assert_eq!(interface, IFACE);
    assert_eq!(changed["Speed"], Variant::F64(140.0));
    assert!(invalidated.is_empty());
    Ok(())
}

#[test]
fn async_property_access() -> Result<()> {
    let f = fixture()?;

    let future = f
        .proxy
        .get_property_async("Speed")
        .on_interface(IFACE)
        .get_result_as_future::<f64>()?;
    assert_eq!(future.get()?, 120.0);

    let future = f
        .proxy
        .set_property_async("Speed")
        .on_interface(IFACE)
        .to_value(&150.0f64)?
        .get_result_as_future()?;
    future.get()?;
    assert_eq!(*f.speed.lock(), 150.0);

    let future = f
        .proxy
        .get_all_properties_async()
        .on_interface(IFACE)
        .get_result_as_future()?;
    assert_eq!(future.get()?["Speed"], Variant::F64(150.0));
    Ok(())
}

#[test]
fn vtable_registration_is_unique_per_interface() -> Result<()> {
    let f = fixture()?;

    let error = f
        .object
        .with_vtable(Vec::new())
        .for_interface(IFACE)
        .unwrap_err();
    assert!(matches!(error.kind(), ErrorKind::InvalidArgs(..)));

    // A slot-owned v-table frees its interface on release.
    let slot = f
        .object
        .with_vtable(Vec::new())
        .for_interface_with_slot("com.example.Extra")?;

    assert!(f
        .object
        .with_vtable(Vec::new())
        .for_interface("com.example.Extra")
        .is_err());

    slot.release();

    f.object
        .with_vtable(Vec::new())
        .for_interface("com.example.Extra")?;
    Ok(())
}

#[test]
fn sync_call_times_out() -> Result<()> {
    let f = fixture()?;

    let error = f
        .proxy
        .call_method("Stall")
        .on_interface(IFACE)
        .with_timeout(Duration::from_millis(100))
        .reply::<()>()
        .unwrap_err();

    assert!(matches!(error.kind(), ErrorKind::Timeout));

    // Releasing the stalled reply slot after cancellation must not fire the
    // abandoned handler.
    f.stalled.lock().take();
    flush(&f.bus);
    Ok(())
}

#[test]
fn cancelled_call_never_invokes_its_handler() -> Result<()> {
    let f = fixture()?;
    let fired = Arc::new(AtomicUsize::new(0));

    let pending = {
        let fired = fired.clone();

        f.proxy
            .call_method_async("Stall")
            .on_interface(IFACE)
            .upon_reply_invoke::<(), _>(move |_| {
                fired.fetch_add(1, Ordering::SeqCst);
            })?
    };

    flush(&f.bus);
    assert!(pending.is_pending());
    pending.cancel();
    assert!(!pending.is_pending());

    // The late reply is suppressed.
    f.stalled.lock().take();
    flush(&f.bus);
    assert_eq!(fired.load(Ordering::SeqCst), 0);
    Ok(())
}

#[test]
fn dropped_reply_slot_reports_an_internal_error() -> Result<()> {
    let f = fixture()?;

    let error = f
        .proxy
        .call_method("Ignore")
        .on_interface(IFACE)
        .reply::<()>()
        .unwrap_err();

    assert!(matches!(error.kind(), ErrorKind::Internal(..)));
    Ok(())
}

#[test]
fn dropped_object_is_unreachable() -> Result<()> {
    let f = fixture()?;
    drop(f.object);

    let error = f
        .proxy
        .call_method("Multiply")
        .on_interface(IFACE)
        .with_arguments(&(1i32, 2i32))?
        .reply::<i32>()
        .unwrap_err();

    assert!(matches!(error.kind(), ErrorKind::UnknownMethod(..)));
    Ok(())
}

#[test]
fn object_paths_are_unique_per_bus() -> Result<()> {
    let f = fixture()?;
    assert!(Object::new(f.bus.clone(), PATH).is_err());
    Ok(())
}
