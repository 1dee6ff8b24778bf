use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// An owning handle to a registration against the bus.
///
/// Every lifetime tied to the bus is governed by a slot: object exports,
/// v-tables, signal subscriptions and pending asynchronous calls. The
/// registration is valid for exactly as long as the slot is alive; releasing
/// it, explicitly through [`release`] or by dropping it, performs exactly one
/// deregistration.
///
/// Registering calls come in two modes: *slot-returning* variants hand the
/// slot to the caller, while the plain variants leave a *floating* slot owned
/// by the registering [`Object`] or [`Proxy`], released together with it.
///
/// [`release`]: Slot::release
/// [`Object`]: crate::Object
/// [`Proxy`]: crate::Proxy
pub struct Slot {
    inner: Option<SlotInner>,
}

struct SlotInner {
    id: u64,
    release: Box<dyn FnOnce() + Send>,
}

static NEXT_SLOT_ID: AtomicU64 = AtomicU64::new(1);

impl Slot {
    /// Construct a slot wrapping a deleter.
    ///
    /// The deleter runs exactly once, on [`release`] or drop.
    ///
    /// [`release`]: Slot::release
    pub fn new<F>(release: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            inner: Some(SlotInner {
                id: NEXT_SLOT_ID.fetch_add(1, Ordering::Relaxed),
                release: Box::new(release),
            }),
        }
    }

    /// The unique id of the registration.
    #[must_use]
    pub fn id(&self) -> Option<u64> {
        self.inner.as_ref().map(|inner| inner.id)
    }

    /// Release the registration now.
    ///
    /// Dropping the slot has the same effect; this form only makes the point
    /// of release explicit.
    pub fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        if let Some(inner) = self.inner.take() {
            (inner.release)();
        }
    }
}

impl Drop for Slot {
    fn drop(&mut self) {
        self.release_inner();
    }
}

impl fmt::Debug for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slot").field("id", &self.id()).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::Slot;

    #[test]
    fn releases_exactly_once_on_drop() {
        let released = Arc::new(AtomicUsize::new(0));

        let slot = {
            let released = released.clone();
            Slot::new(move || {
                released.fetch_add(1, Ordering::SeqCst);
            })
        };

        assert_eq!(released.load(Ordering::SeqCst), 0);
        drop(slot);
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn explicit_release() {
        let released = Arc::new(AtomicUsize::new(0));

        let slot = {
            let released = released.clone();
            Slot::new(move || {
                released.fetch_add(1, Ordering::SeqCst);
            })
        };

        slot.release();
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn ids_are_unique() {
        let a = Slot::new(|| {});
        let b = Slot::new(|| {});
        assert_ne!(a.id(), b.id());
    }
}
