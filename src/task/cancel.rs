use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// Cooperative cancellation flag shared between a task handle and the
/// computation it was submitted with.
///
/// Cancellation is a request: a computation submitted through
/// [`Executor::submit_with`](crate::Executor::submit_with) decides when (and
/// whether) to observe it. A task cancelled before its computation starts is
/// completed as failed without running it.
#[derive(Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// One-shot: transitions false to true and never reverses.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

#[cfg(test)]
#[test]
fn test_cancel_token() {
    let token = CancelToken::new();
    assert_eq!(token.is_cancelled(), false);

    let shared = token.clone();
    token.cancel();
    assert_eq!(token.is_cancelled(), true);
    assert_eq!(shared.is_cancelled(), true);
}
