use std::{
    sync::atomic::{AtomicU8, Ordering},
    task::Waker,
};
use try_lock::TryLock;

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
enum State {
    Empty = 0,
    Ready = 1,
    Notified = 2,
}

impl From<u8> for State {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::Empty,
            1 => Self::Ready,
            2 => Self::Notified,
            _ => unreachable!("invalid waker State"),
        }
    }
}

/// One-shot waker slot: a single poller registers, a single worker wakes,
/// exactly once, after the completion signal is set.
pub(crate) struct AtomicWaker {
    state: AtomicU8,
    waker: TryLock<Option<Waker>>,
}

impl AtomicWaker {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(State::Empty as u8),
            waker: TryLock::new(None),
        }
    }

    /// Publishes `waker` to be woken on completion. Returns false if the
    /// wake already happened or is happening; the caller must then re-check
    /// completion instead of suspending.
    pub fn register(&self, waker: &Waker) -> bool {
        let mut slot = match self.waker.try_lock() {
            Some(slot) => slot,
            None => return false, // wake() holds the slot
        };

        if State::from(self.state.load(Ordering::Acquire)) == State::Notified {
            return false;
        }

        let will_wake = slot.as_ref().map(|w| w.will_wake(waker)).unwrap_or(false);
        if !will_wake {
            *slot = Some(waker.clone());
        }
        drop(slot);

        // publish after the store; a wake() that interleaved swapped in
        // Notified and the caller falls back to re-checking completion
        match self.state.compare_exchange(
            State::Empty as u8,
            State::Ready as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => true,
            Err(state) => State::from(state) == State::Ready,
        }
    }

    /// Consumes and wakes the registered waker, if any.
    pub fn wake(&self) {
        let state: State = self
            .state
            .swap(State::Notified as u8, Ordering::AcqRel)
            .into();

        if state != State::Ready {
            return;
        }

        // a failed try_lock means register() is mid-publish; its state
        // update observes Notified and the poller re-checks completion
        if let Some(mut slot) = self.waker.try_lock() {
            if let Some(waker) = slot.take() {
                waker.wake();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        sync::atomic::AtomicUsize,
        sync::Arc,
        task::{Wake, Waker},
    };

    struct CountWaker(AtomicUsize);

    impl Wake for CountWaker {
        fn wake(self: Arc<Self>) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn wake_after_register() {
        let count = Arc::new(CountWaker(AtomicUsize::new(0)));
        let waker = Waker::from(Arc::clone(&count));

        let slot = AtomicWaker::new();
        assert!(slot.register(&waker));
        assert_eq!(count.0.load(Ordering::SeqCst), 0);

        slot.wake();
        assert_eq!(count.0.load(Ordering::SeqCst), 1);

        // one-shot: a late registration reports the missed wake instead
        assert!(!slot.register(&waker));
        assert_eq!(count.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn wake_without_registration() {
        let count = Arc::new(CountWaker(AtomicUsize::new(0)));
        let waker = Waker::from(Arc::clone(&count));

        let slot = AtomicWaker::new();
        slot.wake();

        assert!(!slot.register(&waker));
        assert_eq!(count.0.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn reregistration_keeps_a_single_waker() {
        let count = Arc::new(CountWaker(AtomicUsize::new(0)));
        let waker = Waker::from(Arc::clone(&count));

        let slot = AtomicWaker::new();
        assert!(slot.register(&waker));
        assert!(slot.register(&waker));

        slot.wake();
        assert_eq!(count.0.load(Ordering::SeqCst), 1);
    }
}
