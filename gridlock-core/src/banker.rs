//! Banker Engine — the safety core.
//!
//! Lock order rank 3: a thread holding `banker_lock` may go on to acquire
//! `intersection_lock` or a `lane_lock`, never the reverse, and never
//! re-acquire `scheduler_lock` or `global_state_lock`.
//!
//! The critical design rule: the safety test must never re-enter the lock.
//! This is enforced structurally — [`is_safe`] takes a `&BankerMatrices` by
//! reference and never touches a mutex, while [`BankerEngine::request`] is
//! the only path that holds the lock, calling [`is_safe`] on the guarded
//! data it already owns. [`BankerEngine::is_safe_state`] is the sole public
//! locking wrapper, for inspection callers; nothing else may call it while
//! `banker_lock` is held.

use std::sync::Mutex;

use gridlock_common::error::GridlockError;
use gridlock_common::ids::{LaneId, NUM_LANES, NUM_QUADRANTS};
use gridlock_common::quadrant::{max_claim_for, QuadrantMask};

/// The four matrices the safety test reasons about, plus the prevention
/// counter. Bundled so the non-locking safety routine can take one
/// reference instead of four.
#[derive(Debug, Clone)]
pub struct BankerMatrices {
    pub available: [u8; NUM_QUADRANTS],
    pub max: [[u8; NUM_QUADRANTS]; NUM_LANES],
    pub alloc: [[u8; NUM_QUADRANTS]; NUM_LANES],
    pub need: [[u8; NUM_QUADRANTS]; NUM_LANES],
    pub deadlock_preventions: u64,
}

impl BankerMatrices {
    fn new() -> Self {
        let mut max = [[0u8; NUM_QUADRANTS]; NUM_LANES];
        for lane in LaneId::ALL {
            max[lane.index()] = max_claim_for(lane).to_cells();
        }
        Self {
            available: [1; NUM_QUADRANTS],
            max,
            alloc: [[0; NUM_QUADRANTS]; NUM_LANES],
            need: max,
            deadlock_preventions: 0,
        }
    }
}

/// Non-locking safety test (Dijkstra-Habermann / banker's algorithm).
/// Ties broken by lowest lane id for deterministic tests.
/// Bounded by `NUM_LANES` iterations.
pub fn is_safe(m: &BankerMatrices) -> bool {
    let mut work = m.available;
    let mut finish = [false; NUM_LANES];

    for _ in 0..NUM_LANES {
        let mut progressed = false;
        for lane in LaneId::ALL {
            let l = lane.index();
            if finish[l] {
                continue;
            }
            let fits = (0..NUM_QUADRANTS).all(|q| m.need[l][q] <= work[q]);
            if fits {
                for q in 0..NUM_QUADRANTS {
                    work[q] += m.alloc[l][q];
                }
                finish[l] = true;
                progressed = true;
                break; // lowest lane id wins; restart the scan each round.
            }
        }
        if !progressed {
            break;
        }
    }

    finish.iter().all(|&f| f)
}

/// Guards the four matrices behind a single lock. All public entry points
/// except [`BankerEngine::is_safe_state`] acquire the lock exactly once.
#[derive(Debug)]
pub struct BankerEngine {
    state: Mutex<BankerMatrices>,
}

impl BankerEngine {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(BankerMatrices::new()),
        }
    }

    /// Request `req` quadrants for `lane`. On success the matrices are
    /// committed; on failure they are rolled back to their pre-request
    /// values, so a rejected request leaves no trace in the matrices.
    pub fn request(&self, lane: LaneId, req: QuadrantMask) -> Result<(), GridlockError> {
        let req_cells = req.to_cells();
        let mut m = self.state.lock().unwrap();
        let l = lane.index();

        // 1. Claim bound.
        for q in 0..NUM_QUADRANTS {
            if req_cells[q] > m.need[l][q] {
                return Err(GridlockError::ClaimExceeded { lane });
            }
        }

        // 2. Availability.
        for q in 0..NUM_QUADRANTS {
            if req_cells[q] > m.available[q] {
                return Err(GridlockError::Insufficient { lane });
            }
        }

        // 3. Tentative apply.
        for q in 0..NUM_QUADRANTS {
            m.available[q] -= req_cells[q];
            m.alloc[l][q] += req_cells[q];
            m.need[l][q] -= req_cells[q];
        }

        // 4. Safety test — non-locking form, called while still holding
        //    the single lock this function took out.
        if is_safe(&m) {
            Ok(())
        } else {
            // Roll back.
            for q in 0..NUM_QUADRANTS {
                m.available[q] += req_cells[q];
                m.alloc[l][q] -= req_cells[q];
                m.need[l][q] += req_cells[q];
            }
            m.deadlock_preventions += 1;
            Err(GridlockError::Unsafe { lane })
        }
    }

    /// Release everything `lane` currently holds, restoring `need`.
    pub fn release(&self, lane: LaneId) {
        let mut m = self.state.lock().unwrap();
        let l = lane.index();
        for q in 0..NUM_QUADRANTS {
            m.available[q] += m.alloc[l][q];
            m.need[l][q] += m.alloc[l][q];
            m.alloc[l][q] = 0;
        }
    }

    /// Public, locking wrapper around [`is_safe`] for inspection callers
    /// (e.g. the Hybrid lock strategy's "overall state is safe" fallback
    /// check). Never called from inside [`BankerEngine::request`]
    /// or [`BankerEngine::release`] — see the module-level safety note.
    pub fn is_safe_state(&self) -> bool {
        let m = self.state.lock().unwrap();
        is_safe(&m)
    }

    pub fn deadlock_preventions(&self) -> u64 {
        self.state.lock().unwrap().deadlock_preventions
    }

    /// Currently allocated quadrants for `lane`, as a mask.
    pub fn allocation_of(&self, lane: LaneId) -> QuadrantMask {
        let m = self.state.lock().unwrap();
        QuadrantMask::from_cells(m.alloc[lane.index()])
    }

    /// Snapshot of the raw matrices, for tests and diagnostics.
    pub fn snapshot(&self) -> BankerMatrices {
        self.state.lock().unwrap().clone()
    }
}

impl Default for BankerEngine {
    fn default() -> Self {
        Self::new()
    }
}
