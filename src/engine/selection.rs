//! Keep/delete selection over duplicate groups.
//!
//! Selection is a pure overlay on an immutable [`ScanSnapshot`]: assigning
//! a strategy or toggling one rendition never touches the snapshot, it only
//! rewrites the per-group state vector. Every function here upholds the one
//! safety invariant of the whole tool: a group always keeps at least one
//! rendition.

use serde::Serialize;

use crate::catalog::Rendition;
use crate::engine::grouper::{DuplicateGroup, ScanSnapshot};

/// Which rendition of a group to keep when auto-selecting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Keep the largest rendition, delete the rest (quality-first).
    KeepLargest,
    /// Keep the smallest rendition, delete the rest (space-first).
    KeepSmallest,
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strategy::KeepLargest => write!(f, "keep-largest"),
            Strategy::KeepSmallest => write!(f, "keep-smallest"),
        }
    }
}

/// Per-rendition verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SelectionState {
    /// The rendition stays.
    Keep,
    /// The rendition is slated for reclamation.
    Delete,
}

/// Keep/delete states for one group, index-aligned with its renditions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSelection {
    states: Vec<SelectionState>,
}

impl GroupSelection {
    /// State of the rendition at `index`.
    #[must_use]
    pub fn state(&self, index: usize) -> SelectionState {
        self.states[index]
    }

    /// Index-aligned states.
    #[must_use]
    pub fn states(&self) -> &[SelectionState] {
        &self.states
    }

    /// Number of renditions currently kept.
    #[must_use]
    pub fn keep_count(&self) -> usize {
        self.states
            .iter()
            .filter(|s| **s == SelectionState::Keep)
            .count()
    }

    /// Number of renditions currently slated for deletion.
    #[must_use]
    pub fn delete_count(&self) -> usize {
        self.states.len() - self.keep_count()
    }

    /// Flip the state at `index`, preserving the at-least-one-keep
    /// invariant: if the flip would leave the group with zero keeps, the
    /// first rendition (the largest) is forced back to Keep.
    pub fn toggle(&mut self, index: usize) {
        self.states[index] = match self.states[index] {
            SelectionState::Keep => SelectionState::Delete,
            SelectionState::Delete => SelectionState::Keep,
        };
        if self.keep_count() == 0 {
            log::debug!("Selection would delete every rendition; keeping the first");
            self.states[0] = SelectionState::Keep;
        }
    }

    /// Bytes that would be reclaimed by deleting the marked renditions.
    /// Unknown sizes contribute 0, so the estimate never overstates.
    #[must_use]
    pub fn reclaimable_bytes(&self, group: &DuplicateGroup) -> u64 {
        self.states
            .iter()
            .zip(&group.renditions)
            .filter(|(s, _)| **s == SelectionState::Delete)
            .map(|(_, r)| r.effective_size())
            .sum()
    }

    /// The marked renditions, paired with their index in the group.
    pub fn deletions<'a>(
        &'a self,
        group: &'a DuplicateGroup,
    ) -> impl Iterator<Item = (usize, &'a Rendition)> {
        self.states
            .iter()
            .zip(group.renditions.iter().enumerate())
            .filter(|(s, _)| **s == SelectionState::Delete)
            .map(|(_, pair)| pair)
    }

    /// The kept renditions, paired with their index in the group.
    pub fn keeps<'a>(
        &'a self,
        group: &'a DuplicateGroup,
    ) -> impl Iterator<Item = (usize, &'a Rendition)> {
        self.states
            .iter()
            .zip(group.renditions.iter().enumerate())
            .filter(|(s, _)| **s == SelectionState::Keep)
            .map(|(_, pair)| pair)
    }
}

/// Compute the initial selection for one group.
///
/// With auto-select off, everything is Keep and the operator chooses by
/// hand. With it on, exactly one rendition survives: renditions are sorted
/// size-descending, so KeepLargest keeps index 0 and KeepSmallest keeps the
/// last index.
#[must_use]
pub fn assign(group: &DuplicateGroup, strategy: Strategy, auto_select: bool) -> GroupSelection {
    let n = group.renditions.len();
    if !auto_select || n == 0 {
        return GroupSelection {
            states: vec![SelectionState::Keep; n],
        };
    }
    let keep_index = match strategy {
        Strategy::KeepLargest => 0,
        Strategy::KeepSmallest => n - 1,
    };
    let states = (0..n)
        .map(|i| {
            if i == keep_index {
                SelectionState::Keep
            } else {
                SelectionState::Delete
            }
        })
        .collect();
    GroupSelection { states }
}

/// Selections for every group of a snapshot, index-aligned with
/// [`ScanSnapshot::groups`].
#[derive(Debug, Clone)]
pub struct SelectionSet {
    selections: Vec<GroupSelection>,
}

impl SelectionSet {
    /// Apply `strategy` to every group of `snapshot`.
    #[must_use]
    pub fn assign_all(snapshot: &ScanSnapshot, strategy: Strategy, auto_select: bool) -> Self {
        let selections = snapshot
            .groups()
            .map(|g| assign(g, strategy, auto_select))
            .collect();
        Self { selections }
    }

    /// Selection of the group at snapshot position `group_index`.
    #[must_use]
    pub fn group(&self, group_index: usize) -> &GroupSelection {
        &self.selections[group_index]
    }

    /// Mutable selection of the group at snapshot position `group_index`.
    pub fn group_mut(&mut self, group_index: usize) -> &mut GroupSelection {
        &mut self.selections[group_index]
    }

    /// Iterate groups with their selections.
    pub fn iter<'a>(
        &'a self,
        snapshot: &'a ScanSnapshot,
    ) -> impl Iterator<Item = (&'a DuplicateGroup, &'a GroupSelection)> {
        snapshot.groups().zip(self.selections.iter())
    }

    /// Total renditions slated for deletion.
    #[must_use]
    pub fn total_deletions(&self) -> usize {
        self.selections.iter().map(GroupSelection::delete_count).sum()
    }

    /// Total bytes that would be reclaimed across the snapshot.
    #[must_use]
    pub fn total_reclaimable(&self, snapshot: &ScanSnapshot) -> u64 {
        self.iter(snapshot)
            .map(|(g, s)| s.reclaimable_bytes(g))
            .sum()
    }
}
