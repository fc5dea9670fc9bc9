//! Shared fix state between the sentence parser and the publish timer.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::fix::{LocationFix, LocationFlags, SatelliteStatus};

/// Fix data accumulated since the last publication.
///
/// Field values persist across cycles; only `fix.flags` is cleared when a
/// location is published.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct FixState {
    pub fix: LocationFix,
    pub sv_status: SatelliteStatus,
    pub sv_status_changed: bool,
}

/// What one publish cycle hands to the host.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Publication {
    pub location: Option<LocationFix>,
    pub sv_status: Option<SatelliteStatus>,
}

impl Publication {
    pub fn is_empty(&self) -> bool {
        self.location.is_none() && self.sv_status.is_none()
    }
}

#[derive(Debug, Default)]
struct AggregatorState {
    current: FixState,
    /// Flags of the last published location.
    cached_flags: LocationFlags,
}

/// Mutex-guarded [`FixState`] with atomic merge, snapshot and publish operations.
#[derive(Debug, Default)]
pub struct FixAggregator {
    state: Mutex<AggregatorState>,
}

impl FixAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, AggregatorState> {
        // The state is plain data; a panic elsewhere cannot leave it torn.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `f` against the current state under the lock.
    pub fn update<R>(&self, f: impl FnOnce(&mut FixState) -> R) -> R {
        f(&mut self.lock().current)
    }

    pub fn snapshot(&self) -> FixState {
        self.lock().current.clone()
    }

    /// Clears fix flags, the flag cache and the satellite list.
    pub fn reset(&self) {
        let mut state = self.lock();
        state.current.fix.flags = LocationFlags::empty();
        state.current.sv_status.clear();
        state.current.sv_status_changed = false;
        state.cached_flags = LocationFlags::empty();
    }

    /// Takes whatever is ready for publication.
    ///
    /// A location is only published once it carries a position. Its flags
    /// are merged with those of the previous publication, so fields learnt
    /// from sentences outside this cycle stay reported.
    pub fn take_publication(&self) -> Publication {
        let mut state = self.lock();
        let mut publication = Publication::default();

        if state.current.fix.has(LocationFlags::LAT_LONG) {
            let merged = state.current.fix.flags | state.cached_flags;
            state.current.fix.flags = merged;
            state.cached_flags = merged;
            publication.location = Some(state.current.fix.clone());
            state.current.fix.flags = LocationFlags::empty();
        }

        if state.current.sv_status_changed {
            publication.sv_status = Some(state.current.sv_status.clone());
            state.current.sv_status_changed = false;
        }

        publication
    }
}
