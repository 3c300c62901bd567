use parking_lot::{Condvar, Mutex};

/// Counting wait point for idle workers, with semaphore semantics: permits
/// posted by [`unpark`](Self::unpark) are consumed by [`park`](Self::park).
/// A permit posted between a worker observing empty queues and going to
/// sleep is consumed immediately on park, so notifications are never lost.
pub(crate) struct Parker {
    permits: Mutex<usize>,
    condvar: Condvar,
}

impl Parker {
    pub fn new() -> Self {
        Self {
            permits: Mutex::new(0),
            condvar: Condvar::new(),
        }
    }

    /// Blocks until a permit is available and consumes it.
    pub fn park(&self) {
        let mut permits = self.permits.lock();
        while *permits == 0 {
            self.condvar.wait(&mut permits);
        }
        *permits -= 1;
    }

    /// Posts `count` permits and wakes as many sleeping workers.
    pub fn unpark(&self, count: usize) {
        let mut permits = self.permits.lock();
        *permits += count;
        drop(permits);

        match count {
            0 => {}
            1 => {
                self.condvar.notify_one();
            }
            _ => {
                self.condvar.notify_all();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{sync::Arc, thread, time::Duration};

    #[test]
    fn permit_posted_before_park_is_not_lost() {
        let parker = Parker::new();
        parker.unpark(1);
        parker.park();
    }

    #[test]
    fn park_until_unparked() {
        let parker = Arc::new(Parker::new());

        let waiter = {
            let parker = Arc::clone(&parker);
            thread::spawn(move || parker.park())
        };

        thread::sleep(Duration::from_millis(50));
        parker.unpark(1);
        waiter.join().unwrap();
    }

    #[test]
    fn one_permit_per_parked_worker() {
        let parker = Arc::new(Parker::new());

        let waiters: Vec<_> = (0..3)
            .map(|_| {
                let parker = Arc::clone(&parker);
                thread::spawn(move || parker.park())
            })
            .collect();

        parker.unpark(3);
        for waiter in waiters {
            waiter.join().unwrap();
        }
    }
}
