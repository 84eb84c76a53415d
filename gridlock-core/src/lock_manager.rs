//! Enhanced Lock Manager: the single entry point lanes use to acquire and
//! release the intersection, applying whichever allocation [`Strategy`] the
//! simulation is configured with.
//!
//! Acquisition always takes `banker_lock` (rank 3) before
//! `intersection_lock` (rank 4). Release runs in the opposite order —
//! intersection before banker — so a thread never holds the lower-ranked
//! lock alone while still registered as a banker holder.

use std::time::Duration;

use gridlock_common::config::Strategy;
use gridlock_common::error::GridlockError;
use gridlock_common::ids::LaneId;
use gridlock_common::quadrant::{claim_for, Movement, QuadrantMask};
use gridlock_common::vehicle::EMERGENCY_PRIORITY;

use crate::banker::BankerEngine;
use crate::intersection::IntersectionLock;
use crate::lane::Lanes;

const INTERSECTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Coordinates the banker engine and the intersection lock under one
/// configured strategy.
pub struct LockManager {
    strategy: Strategy,
    banker: BankerEngine,
    intersection: IntersectionLock,
}

impl LockManager {
    pub fn new(strategy: Strategy) -> Self {
        Self {
            strategy,
            banker: BankerEngine::new(),
            intersection: IntersectionLock::new(),
        }
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn set_strategy(&mut self, strategy: Strategy) {
        self.strategy = strategy;
    }

    pub fn banker(&self) -> &BankerEngine {
        &self.banker
    }

    pub fn intersection(&self) -> &IntersectionLock {
        &self.intersection
    }

    /// Acquire the intersection for `lane`'s `movement`, applying the
    /// configured strategy. On success the lane's allocated-quadrants field
    /// is updated; on `Unsafe` rejection the lane is marked BLOCKED so the
    /// scheduler's retry loop picks it back up once the deadlock clears.
    pub fn acquire(&self, lanes: &Lanes, lane: LaneId, movement: Movement) -> Result<(), GridlockError> {
        let claim = claim_for(lane, movement);
        let handle = lanes.get(lane);
        handle.set_requested_quadrants(claim);

        match self.strategy {
            Strategy::Fifo => {
                self.intersection.acquire_with_timeout(lane, claim, INTERSECTION_TIMEOUT)?;
            }
            Strategy::Banker => {
                if let Err(e) = self.banker.request(lane, claim) {
                    if matches!(e, GridlockError::Unsafe { .. }) {
                        handle.mark_blocked();
                    }
                    return Err(e);
                }
                if let Err(e) = self.intersection.acquire_with_timeout(lane, claim, INTERSECTION_TIMEOUT) {
                    // Roll back the banker grant — we never took the
                    // intersection, so there is nothing to hold.
                    self.banker.release(lane);
                    return Err(e);
                }
            }
            Strategy::Hybrid => match self.banker.request(lane, claim) {
                Ok(()) => {
                    if let Err(e) = self.intersection.acquire_with_timeout(lane, claim, INTERSECTION_TIMEOUT) {
                        self.banker.release(lane);
                        return Err(e);
                    }
                }
                Err(GridlockError::Unsafe { .. }) if handle.priority() == EMERGENCY_PRIORITY => {
                    // Emergency bypass: skip the banker's commitment
                    // entirely and force the claim.
                    if self.intersection.holder().is_some_and(|h| h != lane) {
                        self.intersection.force_evict();
                    }
                    self.intersection.acquire(lane, claim);
                }
                Err(GridlockError::Unsafe { .. }) if self.banker.is_safe_state() => {
                    // Traditional fallback: the banker vetoed this specific
                    // request, but the overall state (after its own
                    // rollback) is still safe, so take the intersection
                    // directly without a banker commitment.
                    self.intersection.acquire_with_timeout(lane, claim, INTERSECTION_TIMEOUT)?;
                }
                Err(e) => {
                    if matches!(e, GridlockError::Unsafe { .. }) {
                        handle.mark_blocked();
                    }
                    return Err(e);
                }
            },
        }

        handle.set_allocated_quadrants(claim);
        Ok(())
    }

    /// Release whatever `lane` currently holds. Intersection first, banker
    /// second — the reverse of acquisition order.
    pub fn release(&self, lanes: &Lanes, lane: LaneId) -> Result<(), GridlockError> {
        self.intersection.release(lane)?;
        if matches!(self.strategy, Strategy::Banker | Strategy::Hybrid) {
            self.banker.release(lane);
        }
        lanes.get(lane).set_allocated_quadrants(QuadrantMask::EMPTY);
        Ok(())
    }

    /// Hybrid-strategy emergency bypass: skip the banker entirely and force
    /// the current holder off the intersection. Only valid for a lane
    /// already elevated to [`EMERGENCY_PRIORITY`].
    pub fn acquire_emergency(&self, lanes: &Lanes, lane: LaneId) -> Result<(), GridlockError> {
        let handle = lanes.get(lane);
        if handle.priority() != EMERGENCY_PRIORITY {
            return Err(GridlockError::InvalidState {
                reason: format!("lane {lane} requested emergency bypass without emergency priority"),
            });
        }
        let claim = QuadrantMask::ALL;
        handle.set_requested_quadrants(claim);
        if self.intersection.holder().is_some_and(|h| h != lane) {
            self.intersection.force_evict();
        }
        self.intersection.acquire(lane, claim);
        handle.set_allocated_quadrants(claim);
        Ok(())
    }
}
