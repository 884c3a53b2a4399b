// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use favsync_remote::MemberId;
use indexmap::IndexSet;

/// Insertion-ordered, duplicate-free set of favorited ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemberSet(IndexSet<MemberId>);

impl MemberSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if `id` is a member.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.0.contains(id)
    }

    /// Appends `id`, returning `false` if it was already a member.
    pub fn insert(&mut self, id: MemberId) -> bool {
        self.0.insert(id)
    }

    /// Removes `id` keeping the order of the remaining members.
    pub fn remove(&mut self, id: &str) -> bool {
        self.0.shift_remove(id)
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if there are no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates in display order.
    pub fn iter(&self) -> impl Iterator<Item = &MemberId> {
        self.0.iter()
    }

    /// Members in display order.
    #[must_use]
    pub fn to_vec(&self) -> Vec<MemberId> {
        self.0.iter().cloned().collect()
    }

    /// Members of `self` followed by the members of `other` not in `self`.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self(self.0.union(&other.0).cloned().collect())
    }

    /// Members of `self` that are not in `other`, in display order.
    #[must_use]
    pub fn difference(&self, other: &Self) -> Vec<MemberId> {
        self.0.difference(&other.0).cloned().collect()
    }

    fn index_of(&self, id: &str) -> Option<usize> {
        self.0.get_index_of(id)
    }

    fn insert_at(&mut self, index: usize, id: MemberId) {
        let index = index.min(self.0.len());
        self.0.shift_insert(index, id);
    }
}

impl FromIterator<MemberId> for MemberSet {
    fn from_iter<I: IntoIterator<Item = MemberId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a MemberSet {
    type Item = &'a MemberId;
    type IntoIter = indexmap::set::Iter<'a, MemberId>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// The member set as it was right before an optimistic mutation.
#[derive(Debug, Clone)]
pub(crate) struct OptimisticSnapshot {
    before: MemberSet,
}

impl OptimisticSnapshot {
    pub fn capture(members: &MemberSet) -> Self {
        Self {
            before: members.clone(),
        }
    }

    /// Restores the membership and position `id` had in the snapshot.
    ///
    /// Other ids are left untouched so concurrent mutations of different
    /// ids survive a rollback.
    pub fn restore(&self, members: &mut MemberSet, id: &MemberId) {
        match self.before.index_of(id) {
            Some(index) => {
                if !members.contains(id) {
                    members.insert_at(index, id.clone());
                }
            }
            None => {
                members.remove(id);
            }
        }
    }
}
