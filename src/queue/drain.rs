//! Per-thread start trampoline.
//!
//! A task that terminates inside its own `start` frees its slot synchronously, which admits the
//! next waiter, whose `start` may terminate synchronously as well. Starting each admitted task
//! in place would nest one stack frame chain per waiter. Instead, a start requested while another
//! one is already running on the same thread is queued and picked up by the outermost caller once
//! the current start returns.

use std::cell::RefCell;
use std::collections::VecDeque;

type Job = Box<dyn FnOnce()>;

thread_local! {
    static DEFERRED: RefCell<Option<VecDeque<Job>>> = const { RefCell::new(None) };
}

/// Clears the thread's job list when the outermost drain exits, unwinding included.
struct DrainGuard;

impl Drop for DrainGuard {
    fn drop(&mut self) {
        DEFERRED.with(|d| d.borrow_mut().take());
    }
}

/// Runs `job` now, or after the start currently running on this thread returns.
///
/// Jobs queued on one thread run in the order they were queued.
pub(super) fn start_serialized(job: impl FnOnce() + 'static) {
    let job: Job = Box::new(job);
    let job = DEFERRED.with(|d| match d.borrow_mut().as_mut() {
        Some(queued) => {
            queued.push_back(job);
            None
        }
        None => Some(job),
    });
    let Some(job) = job else {
        return;
    };

    DEFERRED.with(|d| *d.borrow_mut() = Some(VecDeque::new()));
    let _guard = DrainGuard;

    job();
    while let Some(next) = DEFERRED.with(|d| d.borrow_mut().as_mut().and_then(VecDeque::pop_front)) {
        next();
    }
}
