/// Upload queue and dedup tracker.
///
/// `QueueState` owns the three path sets the archiver tracks across runs:
/// already-uploaded files and the two pending upload queues. A path belongs
/// to at most one set at all times, which is what makes repeated scans of an
/// already-processed tree a no-op.
///
/// Discovery order is preserved (paths live in insertion-ordered vectors
/// with a membership index on the side), so uploads happen in scan order and
/// checkpoint round-trips do not reshuffle the queues.

use std::collections::HashSet;

use crate::model::FileKind;

/// Outcome of offering a discovered path to the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enqueue {
    /// Path added to the pending queue of this band.
    Added(FileKind),
    /// Path already in one of the three sets; not re-queued.
    AlreadyTracked,
}

#[derive(Debug, Default, Clone)]
pub struct QueueState {
    uploaded: Vec<String>,
    pending_narrowband: Vec<String>,
    pending_broadband: Vec<String>,
    /// Union of the three vectors, for O(1) dedup checks.
    tracked: HashSet<String>,
}

impl QueueState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds state from checkpoint lists. A path appearing in more than
    /// one list (a corrupted checkpoint) is kept in the first list that
    /// claims it, in the order uploaded, narrowband, broadband, restoring
    /// the disjointness invariant.
    pub fn from_parts(
        uploaded: Vec<String>,
        narrowband: Vec<String>,
        broadband: Vec<String>,
    ) -> Self {
        let mut state = Self::new();
        for path in uploaded {
            if state.tracked.insert(path.clone()) {
                state.uploaded.push(path);
            }
        }
        for path in narrowband {
            if state.tracked.insert(path.clone()) {
                state.pending_narrowband.push(path);
            }
        }
        for path in broadband {
            if state.tracked.insert(path.clone()) {
                state.pending_broadband.push(path);
            }
        }
        state
    }

    /// True iff `path` is in none of the three sets.
    pub fn should_process(&self, path: &str) -> bool {
        !self.tracked.contains(path)
    }

    /// Adds `path` to the pending queue of `kind`, unless it is already
    /// tracked anywhere.
    pub fn enqueue(&mut self, path: &str, kind: FileKind) -> Enqueue {
        if !self.tracked.insert(path.to_string()) {
            return Enqueue::AlreadyTracked;
        }
        match kind {
            FileKind::Narrowband => self.pending_narrowband.push(path.to_string()),
            FileKind::Broadband => self.pending_broadband.push(path.to_string()),
        }
        Enqueue::Added(kind)
    }

    /// Moves `path` from its pending queue to `uploaded`. Returns `false`
    /// (and changes nothing) if the path was not pending.
    pub fn mark_uploaded(&mut self, path: &str) -> bool {
        let was_narrowband = self.pending_narrowband.iter().any(|p| p == path);
        let was_broadband = self.pending_broadband.iter().any(|p| p == path);
        if !was_narrowband && !was_broadband {
            return false;
        }
        if was_narrowband {
            self.pending_narrowband.retain(|p| p != path);
        } else {
            self.pending_broadband.retain(|p| p != path);
        }
        self.uploaded.push(path.to_string());
        true
    }

    pub fn uploaded(&self) -> &[String] {
        &self.uploaded
    }

    pub fn pending(&self, kind: FileKind) -> &[String] {
        match kind {
            FileKind::Narrowband => &self.pending_narrowband,
            FileKind::Broadband => &self.pending_broadband,
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending_narrowband.len() + self.pending_broadband.len()
    }

    /// The three lists in checkpoint order: uploaded, narrowband, broadband.
    pub fn parts(&self) -> (&[String], &[String], &[String]) {
        (
            &self.uploaded,
            &self.pending_narrowband,
            &self.pending_broadband,
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
