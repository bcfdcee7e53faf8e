//! The ring itself: an ordered, circular view of the cluster members.

use super::types::RingMember;

/// Members sorted ascending by position. A non-empty ring is circular: the
/// successor of the last member is the first one.
#[derive(Debug, Default)]
pub struct Ring {
    members: Vec<RingMember>,
}

impl Ring {
    pub fn new() -> Self {
        Self {
            members: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Inserts at the slot that keeps positions ascending and returns the
    /// resulting index. Callers must have rejected duplicate positions first;
    /// the ordering invariant does not survive them.
    pub fn insert(&mut self, member: RingMember) -> usize {
        let index = self
            .members
            .partition_point(|existing| existing.position < member.position);
        self.members.insert(index, member);
        index
    }

    /// Deletes and returns the member at `index`.
    pub fn remove(&mut self, index: usize) -> Option<RingMember> {
        if index < self.members.len() {
            Some(self.members.remove(index))
        } else {
            None
        }
    }

    /// Index of the first member with this address.
    pub fn find(&self, address: &str) -> Option<usize> {
        self.members
            .iter()
            .position(|member| member.address == address)
    }

    pub fn get(&self, index: usize) -> Option<&RingMember> {
        self.members.get(index)
    }

    /// The next member clockwise from `index`. Panics on an empty ring;
    /// callers only reach this with at least one member present.
    pub fn successor(&self, index: usize) -> &RingMember {
        &self.members[(index + 1) % self.members.len()]
    }

    /// The member that owns `position`: the first member at or after it,
    /// wrapping to the lowest-positioned member past the end of the ring.
    pub fn owner(&self, position: u64) -> Option<&RingMember> {
        if self.members.is_empty() {
            return None;
        }
        let index = self
            .members
            .partition_point(|member| member.position < position)
            % self.members.len();
        Some(&self.members[index])
    }

    pub fn contains_position(&self, position: u64) -> bool {
        self.members
            .binary_search_by_key(&position, |member| member.position)
            .is_ok()
    }

    /// Ordered view of the members, lowest position first.
    pub fn members(&self) -> &[RingMember] {
        &self.members
    }
}
