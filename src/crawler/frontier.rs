//! Crawl frontier: pending, in-flight, and failed targets
//!
//! The frontier owns three pieces of shared state behind one lock:
//! - `queued`: every URL ever accepted in this crawl (grows monotonically)
//! - `pending`: targets not yet handed to a worker, ordered by (depth, url)
//! - `failed`: targets whose fetch failed during the current round
//!
//! A target is in exactly one of pending, in flight, failed, or resolved.
//! The lock is never held across an await point.

use crate::url::LinkPolicy;
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashSet};
use tokio::sync::futures::Notified;
use tokio::sync::Notify;
use url::Url;

/// One unit of crawl work
///
/// Ordering is breadth-first: ascending depth, ties broken by URL.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Target {
    pub depth: u32,
    pub url: String,
}

impl Target {
    pub fn new(depth: u32, url: impl Into<String>) -> Self {
        Self {
            depth,
            url: url.into(),
        }
    }
}

#[derive(Debug, Default)]
struct FrontierState {
    queued: HashSet<String>,
    pending: BTreeSet<Target>,
    failed: BTreeSet<Target>,
    in_flight: usize,
}

/// Thread-safe crawl frontier
pub struct Frontier {
    policy: LinkPolicy,
    max_depth: u32,
    state: Mutex<FrontierState>,
    changed: Notify,
}

impl Frontier {
    /// Creates an empty frontier
    ///
    /// `max_depth` of 0 means unbounded.
    pub fn new(policy: LinkPolicy, max_depth: u32) -> Self {
        Self {
            policy,
            max_depth,
            state: Mutex::new(FrontierState::default()),
            changed: Notify::new(),
        }
    }

    /// Offers a URL at `depth`
    ///
    /// Returns false if the URL fails the follow policy, exceeds the depth
    /// bound, or was already queued at any point during this crawl.
    pub fn add(&self, url: &Url, depth: u32) -> bool {
        if !self.policy.allows(url) {
            tracing::trace!("Rejected by follow policy: {}", url);
            return false;
        }

        if self.max_depth > 0 && depth > self.max_depth {
            tracing::trace!("Rejected at depth {}: {}", depth, url);
            return false;
        }

        let inserted = {
            let mut state = self.state.lock();
            if state.queued.insert(url.to_string()) {
                state.pending.insert(Target::new(depth, url.as_str()));
                true
            } else {
                false
            }
        };

        if inserted {
            self.changed.notify_waiters();
        }
        inserted
    }

    /// Removes and returns the lowest (depth, url) pending target
    ///
    /// The returned target counts as in flight until it is passed to
    /// [`Frontier::resolve`] or [`Frontier::mark_failed`].
    pub fn take_batch(&self) -> Option<Target> {
        let mut state = self.state.lock();
        let target = state.pending.pop_first()?;
        state.in_flight += 1;
        Some(target)
    }

    /// Marks an in-flight target as finished (fetched, dropped, or redirected)
    pub fn resolve(&self, _target: &Target) {
        self.finish_in_flight(|_| {});
    }

    /// Moves an in-flight target into the failed set for this round
    ///
    /// The URL stays in `queued`, so it is only ever retried explicitly.
    pub fn mark_failed(&self, target: Target) {
        self.finish_in_flight(move |state| {
            state.failed.insert(target);
        });
    }

    fn finish_in_flight(&self, update: impl FnOnce(&mut FrontierState)) {
        let drained = {
            let mut state = self.state.lock();
            update(&mut state);
            state.in_flight = state.in_flight.saturating_sub(1);
            state.in_flight == 0
        };

        if drained {
            self.changed.notify_waiters();
        }
    }

    /// Starts the next retry round: failed targets become pending again
    ///
    /// Returns the number of targets moved.
    pub fn swap_round(&self) -> usize {
        let mut state = self.state.lock();
        let failed = std::mem::take(&mut state.failed);
        let moved = failed.len();
        state.pending.extend(failed);
        moved
    }

    /// True once nothing is pending and no worker holds a target
    pub fn is_drained(&self) -> bool {
        let state = self.state.lock();
        state.pending.is_empty() && state.in_flight == 0
    }

    /// Future that completes on the next enqueue or drain
    ///
    /// Create it before checking [`Frontier::is_drained`] so a wakeup between
    /// the check and the await is not lost.
    pub fn changed(&self) -> Notified<'_> {
        self.changed.notified()
    }

    pub fn pending_len(&self) -> usize {
        self.state.lock().pending.len()
    }

    pub fn failed_len(&self) -> usize {
        self.state.lock().failed.len()
    }

    pub fn queued_len(&self) -> usize {
        self.state.lock().queued.len()
    }

    /// Snapshot of the failed set, in (depth, url) order
    pub fn failed_targets(&self) -> Vec<Target> {
        self.state.lock().failed.iter().cloned().collect()
    }
}
