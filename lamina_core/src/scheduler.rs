// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The frame-scheduling capability.
//!
//! The pipeline never owns a timer. When something becomes dirty it asks a
//! [`FrameScheduler`] for a frame, and the host calls back through
//! [`on_frame`](FrameScheduler::on_frame) subscriptions when one is due.

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt;

use crate::time::HostTime;

/// A callback invoked when a frame is due.
pub type FrameCallback = Box<dyn FnMut(HostTime)>;

/// Handle returned by [`FrameScheduler::on_frame`], used to unsubscribe.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Subscription(u64);

/// A source of frame timing supplied by the host.
pub trait FrameScheduler {
    /// Requests that a frame be produced soon. Repeated requests before the
    /// frame fires coalesce.
    fn schedule_frame(&mut self);

    /// Registers a callback run every time a scheduled frame fires.
    fn on_frame(&mut self, callback: FrameCallback) -> Subscription;

    /// Removes a callback. Unknown subscriptions are ignored.
    fn unsubscribe(&mut self, subscription: Subscription);
}

#[derive(Default)]
struct ManualInner {
    pending: bool,
    requests: u64,
    next_id: u64,
    callbacks: Vec<(Subscription, FrameCallback)>,
    pumping: bool,
    dropped: Vec<Subscription>,
}

/// A scheduler driven explicitly by the host or a test.
///
/// Clones share state, so the host can keep one handle to
/// [`pump`](Self::pump) while the pipeline holds another.
#[derive(Clone, Default)]
pub struct ManualFrameScheduler {
    inner: Rc<RefCell<ManualInner>>,
}

impl ManualFrameScheduler {
    /// Creates a scheduler with no pending frame.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a frame has been requested since the last pump.
    #[must_use]
    pub fn is_frame_scheduled(&self) -> bool {
        self.inner.borrow().pending
    }

    /// Total number of [`schedule_frame`](FrameScheduler::schedule_frame)
    /// calls, coalesced or not.
    #[must_use]
    pub fn request_count(&self) -> u64 {
        self.inner.borrow().requests
    }

    /// Fires a pending frame at `now`.
    ///
    /// Returns `false` without running callbacks if no frame was requested.
    /// Callbacks may schedule the next frame or unsubscribe; changes made
    /// during the pump take effect on the next one.
    pub fn pump(&self, now: HostTime) -> bool {
        let mut callbacks = {
            let mut inner = self.inner.borrow_mut();
            if !inner.pending {
                return false;
            }
            inner.pending = false;
            inner.pumping = true;
            core::mem::take(&mut inner.callbacks)
        };
        for (_, callback) in &mut callbacks {
            callback(now);
        }
        let mut inner = self.inner.borrow_mut();
        let dropped = core::mem::take(&mut inner.dropped);
        callbacks.retain(|(id, _)| !dropped.contains(id));
        callbacks.append(&mut inner.callbacks);
        inner.callbacks = callbacks;
        inner.pumping = false;
        true
    }
}

impl FrameScheduler for ManualFrameScheduler {
    fn schedule_frame(&mut self) {
        let mut inner = self.inner.borrow_mut();
        inner.pending = true;
        inner.requests += 1;
    }

    fn on_frame(&mut self, callback: FrameCallback) -> Subscription {
        let mut inner = self.inner.borrow_mut();
        let id = Subscription(inner.next_id);
        inner.next_id += 1;
        inner.callbacks.push((id, callback));
        id
    }

    fn unsubscribe(&mut self, subscription: Subscription) {
        let mut inner = self.inner.borrow_mut();
        inner.callbacks.retain(|(id, _)| *id != subscription);
        if inner.pumping {
            inner.dropped.push(subscription);
        }
    }
}

impl fmt::Debug for ManualFrameScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("ManualFrameScheduler")
            .field("pending", &inner.pending)
            .field("requests", &inner.requests)
            .field("callbacks", &inner.callbacks.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use core::cell::Cell;

    use super::*;

    #[test]
    fn pump_without_request_is_a_no_op() {
        let mut sched = ManualFrameScheduler::new();
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        sched.on_frame(Box::new(move |_| h.set(h.get() + 1)));
        assert!(!sched.pump(HostTime(0)));
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn requests_coalesce_into_one_frame() {
        let mut sched = ManualFrameScheduler::new();
        let seen = Rc::new(Cell::new(HostTime(0)));
        let s = Rc::clone(&seen);
        sched.on_frame(Box::new(move |now| s.set(now)));
        sched.schedule_frame();
        sched.schedule_frame();
        assert_eq!(sched.request_count(), 2);
        assert!(sched.pump(HostTime(16)));
        assert_eq!(seen.get(), HostTime(16));
        assert!(!sched.pump(HostTime(32)), "second pump has nothing to do");
    }

    #[test]
    fn unsubscribe_stops_callbacks() {
        let mut sched = ManualFrameScheduler::new();
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        let sub = sched.on_frame(Box::new(move |_| h.set(h.get() + 1)));
        sched.schedule_frame();
        sched.pump(HostTime(0));
        sched.unsubscribe(sub);
        sched.schedule_frame();
        sched.pump(HostTime(1));
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn callbacks_may_unsubscribe_and_reschedule_while_pumping() {
        let mut sched = ManualFrameScheduler::new();
        let hits = Rc::new(Cell::new(0));
        let sub_slot = Rc::new(Cell::new(None));
        let (h, slot, mut handle) = (Rc::clone(&hits), Rc::clone(&sub_slot), sched.clone());
        let sub = sched.on_frame(Box::new(move |_| {
            h.set(h.get() + 1);
            handle.schedule_frame();
            if let Some(sub) = slot.get() {
                handle.unsubscribe(sub);
            }
        }));
        sub_slot.set(Some(sub));

        sched.schedule_frame();
        assert!(sched.pump(HostTime(0)));
        assert!(sched.is_frame_scheduled(), "rescheduled from inside the callback");
        assert!(sched.pump(HostTime(1)));
        assert_eq!(hits.get(), 1, "unsubscribed from inside the callback");
    }
}
