//! Intersection Lock: exclusive occupancy of the shared intersection, with
//! one condition variable per lane for targeted signalling.
//!
//! Lock order rank 4: acquired after `banker_lock`, before any `lane_lock`.

use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

use gridlock_common::error::GridlockError;
use gridlock_common::ids::{LaneId, NUM_LANES};
use gridlock_common::quadrant::QuadrantMask;

struct IntersectionInner {
    holder: Option<LaneId>,
    active_quadrants: QuadrantMask,
    acquisition_time: Option<Instant>,
}

/// Exclusive intersection occupancy with per-lane condition variables so a
/// release can wake exactly the lanes that might now proceed.
pub struct IntersectionLock {
    inner: Mutex<IntersectionInner>,
    per_lane_cond: [Condvar; NUM_LANES],
}

impl IntersectionLock {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(IntersectionInner {
                holder: None,
                active_quadrants: QuadrantMask::EMPTY,
                acquisition_time: None,
            }),
            per_lane_cond: Default::default(),
        }
    }

    /// Block until `lane` can take the intersection, then take it.
    pub fn acquire(&self, lane: LaneId, claimed: QuadrantMask) {
        let mut inner = self.inner.lock().unwrap();
        while inner.holder.is_some() && inner.holder != Some(lane) {
            inner = self.per_lane_cond[lane.index()].wait(inner).unwrap();
        }
        inner.holder = Some(lane);
        inner.acquisition_time = Some(Instant::now());
        inner.active_quadrants = claimed;
    }

    /// Non-blocking acquire. Returns `LockBusy` if another lane holds the
    /// intersection.
    pub fn try_acquire(&self, lane: LaneId, claimed: QuadrantMask) -> Result<(), GridlockError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.holder.is_some() && inner.holder != Some(lane) {
            return Err(GridlockError::LockBusy);
        }
        inner.holder = Some(lane);
        inner.acquisition_time = Some(Instant::now());
        inner.active_quadrants = claimed;
        Ok(())
    }

    /// Retry [`IntersectionLock::try_acquire`] on a ~100ms backoff until
    /// `deadline` elapses.
    pub fn acquire_with_timeout(
        &self,
        lane: LaneId,
        claimed: QuadrantMask,
        timeout: Duration,
    ) -> Result<(), GridlockError> {
        let deadline = Instant::now() + timeout;
        const BACKOFF: Duration = Duration::from_millis(100);
        loop {
            match self.try_acquire(lane, claimed) {
                Ok(()) => return Ok(()),
                Err(GridlockError::LockBusy) => {
                    if Instant::now() >= deadline {
                        return Err(GridlockError::Timeout {
                            elapsed_secs: timeout.as_secs_f64(),
                        });
                    }
                    std::thread::sleep(BACKOFF.min(deadline.saturating_duration_since(Instant::now())));
                }
                Err(other) => return Err(other),
            }
        }
    }

    /// Release the intersection. Verifies `lane` is the current holder,
    /// then broadcast-wakes every lane's condition variable.
    pub fn release(&self, lane: LaneId) -> Result<(), GridlockError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.holder != Some(lane) {
            return Err(GridlockError::InvalidState {
                reason: format!("lane {lane} released an intersection it did not hold"),
            });
        }
        inner.holder = None;
        inner.active_quadrants = QuadrantMask::EMPTY;
        inner.acquisition_time = None;
        drop(inner);
        for cond in &self.per_lane_cond {
            cond.notify_all();
        }
        Ok(())
    }

    /// Forcibly evict the current holder (emergency preemption),
    /// broadcasting to every waiting lane.
    pub fn force_evict(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.holder = None;
        inner.active_quadrants = QuadrantMask::EMPTY;
        inner.acquisition_time = None;
        drop(inner);
        for cond in &self.per_lane_cond {
            cond.notify_all();
        }
    }

    pub fn holder(&self) -> Option<LaneId> {
        self.inner.lock().unwrap().holder
    }

    pub fn active_quadrants(&self) -> QuadrantMask {
        self.inner.lock().unwrap().active_quadrants
    }

    pub fn is_vacant(&self) -> bool {
        self.inner.lock().unwrap().holder.is_none()
    }
}

impl Default for IntersectionLock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn acquire_then_release_leaves_vacant() {
        let lock = IntersectionLock::new();
        lock.acquire(LaneId::North, QuadrantMask::ALL);
        assert_eq!(lock.holder(), Some(LaneId::North));
        lock.release(LaneId::North).unwrap();
        assert!(lock.is_vacant());
    }

    #[test]
    fn try_acquire_fails_when_held() {
        let lock = IntersectionLock::new();
        lock.acquire(LaneId::North, QuadrantMask::ALL);
        assert_eq!(
            lock.try_acquire(LaneId::South, QuadrantMask::ALL),
            Err(GridlockError::LockBusy)
        );
    }

    #[test]
    fn release_by_non_holder_is_rejected() {
        let lock = IntersectionLock::new();
        lock.acquire(LaneId::North, QuadrantMask::ALL);
        assert!(lock.release(LaneId::South).is_err());
    }

    #[test]
    fn force_evict_vacates_regardless_of_holder() {
        let lock = IntersectionLock::new();
        lock.acquire(LaneId::North, QuadrantMask::ALL);
        lock.force_evict();
        assert!(lock.is_vacant());
    }

    #[test]
    fn timeout_fails_when_never_released() {
        let lock = IntersectionLock::new();
        lock.acquire(LaneId::North, QuadrantMask::ALL);
        let result = lock.acquire_with_timeout(LaneId::South, QuadrantMask::ALL, Duration::from_millis(150));
        assert!(matches!(result, Err(GridlockError::Timeout { .. })));
    }

    #[test]
    fn blocking_acquire_wakes_on_release() {
        let lock = Arc::new(IntersectionLock::new());
        lock.acquire(LaneId::North, QuadrantMask::ALL);

        let lock2 = Arc::clone(&lock);
        let handle = thread::spawn(move || {
            lock2.acquire(LaneId::South, QuadrantMask::ALL);
            lock2.holder()
        });

        thread::sleep(Duration::from_millis(50));
        lock.release(LaneId::North).unwrap();
        assert_eq!(handle.join().unwrap(), Some(LaneId::South));
    }
}
