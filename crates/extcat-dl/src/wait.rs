use std::{thread, time::Duration};

/// Strategy for blocking the calling thread between requests.
pub trait Waiter {
    fn wait(&self, duration: Duration);
}

/// Sleeps on the current thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadWaiter;

impl Waiter for ThreadWaiter {
    fn wait(&self, duration: Duration) {
        if !duration.is_zero() {
            thread::sleep(duration);
        }
    }
}

impl<W: Waiter + ?Sized> Waiter for &W {
    fn wait(&self, duration: Duration) {
        (**self).wait(duration)
    }
}
