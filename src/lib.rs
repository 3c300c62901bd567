//! Awaitable compute tasks over a small work-stealing thread pool.
//!
//! A computation and its input are submitted together; the returned
//! [`TaskHandle`] can be queried ([`TaskHandle::is_completed`]), waited on
//! ([`TaskHandle::wait`]), or `.await`ed from an async context.
//!
//! ```
//! let executor = kiln::Executor::new();
//!
//! let task = executor.submit(|v: &mut [i32; 3]| v[2] = v[0] + v[1], [10, 10, 0])?;
//! assert_eq!(task.wait()?[2], 20);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![forbid(unsafe_code)]

mod error;
mod executor;
mod task;

pub use error::{SubmitError, TaskError};
pub use executor::{Builder, Executor};
pub use task::{CancelToken, TaskHandle};

use arc_swap::ArcSwapOption;
use std::sync::Arc;

static GLOBAL: ArcSwapOption<Executor> = ArcSwapOption::const_empty();

/// Submits to a process-global executor, created on first use with the
/// default configuration. The global executor is never shut down.
pub fn run<T, F>(compute: F, input: T) -> Result<TaskHandle<T>, SubmitError>
where
    T: Send + 'static,
    F: FnOnce(&mut T) + Send + 'static,
{
    global().submit(compute, input)
}

fn global() -> Arc<Executor> {
    match GLOBAL.load_full() {
        Some(executor) => executor,
        None => init_global(),
    }
}

#[cold]
fn init_global() -> Arc<Executor> {
    static INIT: parking_lot::Mutex<()> = parking_lot::Mutex::new(());

    let _guard = INIT.lock();
    if let Some(executor) = GLOBAL.load_full() {
        return executor;
    }

    let executor = Arc::new(Executor::new());
    GLOBAL.store(Some(Arc::clone(&executor)));
    executor
}
