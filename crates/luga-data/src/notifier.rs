//! Publish/subscribe plumbing composed into every data source and region.
//!
//! Three registration styles are supported:
//!
//! - **generic**: [`Notifier::add_observer`] delivers every event to an
//!   [`Observer`].
//! - **targeted**: [`Notifier::add_event_observer`] delivers one
//!   [`EventKind`] only.
//! - **closure**: [`Notifier::subscribe`] returns a [`Subscription`] guard;
//!   dropping it unsubscribes.
//!
//! # Invariants
//!
//! 1. Registering the same observer (same kind, for targeted) twice is a
//!    no-op.
//! 2. Dispatch order is generic observers, then targeted observers, then
//!    closures; FIFO by registration within each group.
//! 3. Dispatch iterates a snapshot, so handlers may register, remove or
//!    trigger further notifications on the same notifier.
//! 4. Observers are held weakly. A dropped observer is skipped and pruned
//!    on the next dispatch.
//!
//! # Failure Modes
//!
//! - Removing something that was never registered: no-op.
//! - An observer that does not override a handler: silent skip.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::event::{Event, EventKind, Observer};

type Listener = dyn Fn(&Event);

#[derive(Default)]
struct Registrations {
    generic: Vec<Weak<dyn Observer>>,
    targeted: Vec<(Weak<dyn Observer>, EventKind)>,
    listeners: Vec<(Option<EventKind>, Weak<Listener>)>,
}

impl Registrations {
    fn prune(&mut self) {
        self.generic.retain(|w| w.strong_count() > 0);
        self.targeted.retain(|(w, _)| w.strong_count() > 0);
        self.listeners.retain(|(_, w)| w.strong_count() > 0);
    }
}

/// Observer list owned by one component.
#[derive(Default)]
pub struct Notifier {
    registrations: RefCell<Registrations>,
}

impl Notifier {
    /// Create an empty notifier, to be embedded in an observable component.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `observer` for every event.
    pub fn add_observer(&self, observer: Rc<dyn Observer>) {
        let weak = Rc::downgrade(&observer);
        let mut regs = self.registrations.borrow_mut();
        if regs.generic.iter().any(|w| Weak::ptr_eq(w, &weak)) {
            return;
        }
        regs.generic.push(weak);
    }

    /// Register `observer` for events of `kind` only.
    pub fn add_event_observer(&self, observer: Rc<dyn Observer>, kind: EventKind) {
        let weak = Rc::downgrade(&observer);
        let mut regs = self.registrations.borrow_mut();
        if regs
            .targeted
            .iter()
            .any(|(w, k)| *k == kind && Weak::ptr_eq(w, &weak))
        {
            return;
        }
        regs.targeted.push((weak, kind));
    }

    /// Remove a generic registration.
    pub fn remove_observer(&self, observer: &Rc<dyn Observer>) {
        let weak = Rc::downgrade(observer);
        self.registrations
            .borrow_mut()
            .generic
            .retain(|w| !Weak::ptr_eq(w, &weak));
    }

    /// Remove one targeted registration.
    pub fn remove_event_observer(&self, observer: &Rc<dyn Observer>, kind: EventKind) {
        let weak = Rc::downgrade(observer);
        self.registrations
            .borrow_mut()
            .targeted
            .retain(|(w, k)| !(*k == kind && Weak::ptr_eq(w, &weak)));
    }

    /// Call `callback` for every event of `kind` until the guard is dropped.
    pub fn subscribe(&self, kind: EventKind, callback: impl Fn(&Event) + 'static) -> Subscription {
        self.push_listener(Some(kind), Rc::new(callback))
    }

    /// Call `callback` for every event until the guard is dropped.
    pub fn subscribe_all(&self, callback: impl Fn(&Event) + 'static) -> Subscription {
        self.push_listener(None, Rc::new(callback))
    }

    fn push_listener(&self, kind: Option<EventKind>, callback: Rc<Listener>) -> Subscription {
        self.registrations
            .borrow_mut()
            .listeners
            .push((kind, Rc::downgrade(&callback)));
        Subscription {
            _callback: callback,
        }
    }

    /// Number of live registrations of all styles.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        let regs = self.registrations.borrow();
        regs.generic.iter().filter(|w| w.strong_count() > 0).count()
            + regs.targeted.iter().filter(|(w, _)| w.strong_count() > 0).count()
            + regs.listeners.iter().filter(|(_, w)| w.strong_count() > 0).count()
    }

    /// Deliver `event` to every matching registration.
    pub fn notify_observers(&self, event: &Event) {
        let kind = event.kind();
        let (generic, targeted, listeners) = {
            let mut regs = self.registrations.borrow_mut();
            regs.prune();
            let generic: Vec<Rc<dyn Observer>> =
                regs.generic.iter().filter_map(Weak::upgrade).collect();
            let targeted: Vec<Rc<dyn Observer>> = regs
                .targeted
                .iter()
                .filter(|(_, k)| *k == kind)
                .filter_map(|(w, _)| w.upgrade())
                .collect();
            let listeners: Vec<Rc<Listener>> = regs
                .listeners
                .iter()
                .filter(|(k, _)| k.is_none_or(|k| k == kind))
                .filter_map(|(_, w)| w.upgrade())
                .collect();
            (generic, targeted, listeners)
        };

        tracing::trace!(
            event = %kind,
            source = event.source(),
            receivers = generic.len() + targeted.len() + listeners.len(),
            "dispatching notification"
        );

        for observer in generic.iter().chain(targeted.iter()) {
            observer.on_event(event);
        }
        for listener in &listeners {
            listener(event);
        }
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("observer_count", &self.observer_count())
            .finish()
    }
}

/// RAII guard for a closure registered with [`Notifier::subscribe`].
///
/// The callback stays registered for as long as the guard lives.
#[must_use = "dropping the subscription unsubscribes the callback"]
pub struct Subscription {
    _callback: Rc<Listener>,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish()
    }
}

/// A component that owns a [`Notifier`].
///
/// The provided methods forward to the notifier so callers never reach into
/// it directly.
pub trait Observable {
    fn notifier(&self) -> &Notifier;

    fn add_observer(&self, observer: Rc<dyn Observer>) {
        self.notifier().add_observer(observer);
    }

    fn add_event_observer(&self, observer: Rc<dyn Observer>, kind: EventKind) {
        self.notifier().add_event_observer(observer, kind);
    }

    fn remove_observer(&self, observer: &Rc<dyn Observer>) {
        self.notifier().remove_observer(observer);
    }

    fn remove_event_observer(&self, observer: &Rc<dyn Observer>, kind: EventKind) {
        self.notifier().remove_event_observer(observer, kind);
    }

    fn subscribe(&self, kind: EventKind, callback: impl Fn(&Event) + 'static) -> Subscription
    where
        Self: Sized,
    {
        self.notifier().subscribe(kind, callback)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
