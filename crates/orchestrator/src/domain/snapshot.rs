#![forbid(unsafe_code)]

use crate::domain::Pid;
use rustc_hash::FxHashSet;
use std::collections::BTreeSet;

/// Process identifiers observed at one polling instant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pids: FxHashSet<Pid>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, pid: Pid) -> bool {
        self.pids.insert(pid)
    }

    pub fn contains(&self, pid: Pid) -> bool {
        self.pids.contains(&pid)
    }

    pub fn len(&self) -> usize {
        self.pids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Pid> + '_ {
        self.pids.iter().copied()
    }

    /// Classify identifiers as spawned (only in `current`) or killed (only in
    /// `previous`). A pid present in both is reported in neither, even if it
    /// was reused in between.
    pub fn diff(previous: &Snapshot, current: &Snapshot) -> Diff {
        Diff {
            spawned: current.pids.difference(&previous.pids).copied().collect(),
            killed: previous.pids.difference(&current.pids).copied().collect(),
        }
    }
}

impl FromIterator<Pid> for Snapshot {
    fn from_iter<I: IntoIterator<Item = Pid>>(iter: I) -> Self {
        Self {
            pids: iter.into_iter().collect(),
        }
    }
}

impl Extend<Pid> for Snapshot {
    fn extend<I: IntoIterator<Item = Pid>>(&mut self, iter: I) {
        self.pids.extend(iter);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diff {
    pub spawned: BTreeSet<Pid>,
    pub killed: BTreeSet<Pid>,
}

impl Diff {
    pub fn is_empty(&self) -> bool {
        self.spawned.is_empty() && self.killed.is_empty()
    }
}
