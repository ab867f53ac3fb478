use std::sync::{Arc, Condvar, Mutex};

/// Counting rendezvous: each participant enters on start and leaves on its terminal state;
/// waiters are released once every participant that entered has left.
#[derive(Clone, Debug, Default)]
pub struct JoinBarrier {
    inner: Arc<(Mutex<usize>, Condvar)>,
}

impl JoinBarrier {
    /// New barrier with no participants.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one participant. The returned guard leaves the barrier when dropped.
    pub fn enter(&self) -> BarrierGuard {
        let (count, _) = &*self.inner;
        *count.lock().unwrap_or_else(|p| p.into_inner()) += 1;
        BarrierGuard {
            barrier: self.clone(),
        }
    }

    fn leave(&self) {
        let (count, cvar) = &*self.inner;
        let mut n = count.lock().unwrap_or_else(|p| p.into_inner());
        *n = n.saturating_sub(1);
        if *n == 0 {
            cvar.notify_all();
        }
    }

    /// Participants that entered and have not left yet.
    pub fn pending(&self) -> usize {
        *self.inner.0.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Block until no participant is pending.
    pub fn wait(&self) {
        let (count, cvar) = &*self.inner;
        let guard = count.lock().unwrap_or_else(|p| p.into_inner());
        let _guard = cvar
            .wait_while(guard, |n| *n > 0)
            .unwrap_or_else(|p| p.into_inner());
    }
}

/// Membership in a [`JoinBarrier`]; dropping it leaves the barrier exactly once.
#[derive(Debug)]
pub struct BarrierGuard {
    barrier: JoinBarrier,
}

impl Drop for BarrierGuard {
    fn drop(&mut self) {
        self.barrier.leave();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/barrier.rs"]
mod tests;
