use super::pool::Task;
use crossbeam_deque::{Injector, Steal, Stealer, Worker as LocalQueue};

/// The queue state visible to every worker: the shared injector that
/// submissions land on, plus one stealer per worker-local deque.
pub(crate) struct Shared {
    injector: Injector<Task>,
    stealers: Box<[Stealer<Task>]>,
}

impl Shared {
    pub fn new(locals: &[LocalQueue<Task>]) -> Self {
        Self {
            injector: Injector::new(),
            stealers: locals.iter().map(|local| local.stealer()).collect(),
        }
    }

    pub fn worker_count(&self) -> usize {
        self.stealers.len()
    }

    pub fn inject(&self, task: Task) {
        self.injector.push(task);
    }

    pub fn is_empty(&self) -> bool {
        self.injector.is_empty() && self.stealers.iter().all(|stealer| stealer.is_empty())
    }
}

/// Pop order: fair ticks consume the injector first so injected tasks are
/// never starved by a busy local deque; otherwise local work runs first
/// and the injector and the other workers are searched after.
pub(crate) fn pop(
    shared: &Shared,
    local: &LocalQueue<Task>,
    index: usize,
    be_fair: bool,
    xorshift: &mut usize,
) -> Option<Task> {
    if be_fair {
        if let Some(task) = consume(shared, local) {
            return Some(task);
        }
    }

    if let Some(task) = local.pop() {
        return Some(task);
    }

    if let Some(task) = consume(shared, local) {
        return Some(task);
    }

    pop_steal(shared, local, index, xorshift)
}

fn consume(shared: &Shared, local: &LocalQueue<Task>) -> Option<Task> {
    loop {
        match shared.injector.steal_batch_and_pop(local) {
            Steal::Success(task) => return Some(task),
            Steal::Empty => return None,
            Steal::Retry => continue,
        }
    }
}

#[cold]
fn pop_steal(
    shared: &Shared,
    local: &LocalQueue<Task>,
    index: usize,
    xorshift: &mut usize,
) -> Option<Task> {
    let shifts = match usize::BITS {
        32 => (13, 17, 5),
        64 => (13, 7, 17),
        _ => unreachable!("architecture unsupported"),
    };

    let mut rng = *xorshift;
    rng ^= rng << shifts.0;
    rng ^= rng >> shifts.1;
    rng ^= rng << shifts.2;
    *xorshift = rng;

    let num_workers = shared.stealers.len();
    (0..num_workers)
        .cycle()
        .skip(rng % num_workers)
        .take(num_workers)
        .filter(|&steal_index| steal_index != index)
        .find_map(|steal_index| loop {
            match shared.stealers[steal_index].steal_batch_and_pop(local) {
                Steal::Success(task) => return Some(task),
                Steal::Empty => return None,
                Steal::Retry => continue,
            }
        })
}
