//! Channel entity: membership, authority, invites, and mode flags.

use crate::state::ConnId;
use std::collections::BTreeSet;

/// A named chat room.
///
/// Invariant: `operators` is a subset of `members`; removing a member also
/// strips operator status and any pending invite. Member sets iterate in
/// `ConnId` order, which fixes the broadcast order.
#[derive(Debug)]
pub struct Channel {
    pub name: String,
    pub topic: String,
    pub key: Option<String>,
    pub invite_only: bool,
    pub topic_restricted: bool,
    /// 0 = unlimited.
    pub user_limit: usize,
    members: BTreeSet<ConnId>,
    operators: BTreeSet<ConnId>,
    invited: BTreeSet<ConnId>,
}

impl Channel {
    /// A fresh channel: no topic, no key, topic changes restricted to
    /// operators.
    pub fn new(name: String) -> Self {
        Self {
            name,
            topic: String::new(),
            key: None,
            invite_only: false,
            topic_restricted: true,
            user_limit: 0,
            members: BTreeSet::new(),
            operators: BTreeSet::new(),
            invited: BTreeSet::new(),
        }
    }

    // Membership

    /// Add a member; a pending invite is consumed by joining.
    pub fn add_member(&mut self, id: ConnId) {
        self.members.insert(id);
        self.invited.remove(&id);
    }

    /// Remove a member, along with operator status and any pending invite.
    pub fn remove_member(&mut self, id: ConnId) {
        self.members.remove(&id);
        self.operators.remove(&id);
        self.invited.remove(&id);
    }

    pub fn is_member(&self, id: ConnId) -> bool {
        self.members.contains(&id)
    }

    /// Member handles in deterministic (key) order.
    pub fn members(&self) -> impl Iterator<Item = ConnId> + '_ {
        self.members.iter().copied()
    }

    pub fn member_ids(&self) -> Vec<ConnId> {
        self.members.iter().copied().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.user_limit > 0 && self.members.len() >= self.user_limit
    }

    // Authority

    /// Grant operator status. Only members can hold it.
    pub fn add_operator(&mut self, id: ConnId) -> bool {
        if self.members.contains(&id) {
            self.operators.insert(id);
            true
        } else {
            false
        }
    }

    pub fn remove_operator(&mut self, id: ConnId) {
        self.operators.remove(&id);
    }

    pub fn is_operator(&self, id: ConnId) -> bool {
        self.operators.contains(&id)
    }

    // Invites

    pub fn add_invite(&mut self, id: ConnId) {
        self.invited.insert(id);
    }

    pub fn is_invited(&self, id: ConnId) -> bool {
        self.invited.contains(&id)
    }

    /// Current flags as a `+`-prefixed mode string (i, t, k, l order).
    pub fn mode_string(&self) -> String {
        let mut modes = String::from("+");
        if self.invite_only {
            modes.push('i');
        }
        if self.topic_restricted {
            modes.push('t');
        }
        if self.key.is_some() {
            modes.push('k');
        }
        if self.user_limit > 0 {
            modes.push('l');
        }
        modes
    }
}
