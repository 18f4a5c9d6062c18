//! Sink action kinds and the per-tick resolved action set.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Sink action a channel tick can fan out to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Live publish on the bound transport topic
    Publish,
    /// Append to the currently open durable log
    Record,
    /// Append to the rolling in-memory buffer
    LogBuffer,
}

impl ActionKind {
    /// All kinds, in dispatch order
    pub const ALL: [ActionKind; 3] = [ActionKind::Publish, ActionKind::Record, ActionKind::LogBuffer];

    /// Dense slot index, used by fixed-size callback tables
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            ActionKind::Publish => 0,
            ActionKind::Record => 1,
            ActionKind::LogBuffer => 2,
        }
    }

    #[inline]
    const fn bit(self) -> u8 {
        1 << self.index()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::Publish => "publish",
            ActionKind::Record => "record",
            ActionKind::LogBuffer => "log_buffer",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Set of actions resolved for one tick
///
/// A closed three-member set packed into a byte.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ActionSet(u8);

impl ActionSet {
    /// Empty set
    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn insert(&mut self, kind: ActionKind) {
        self.0 |= kind.bit();
    }

    pub fn remove(&mut self, kind: ActionKind) {
        self.0 &= !kind.bit();
    }

    #[inline]
    pub fn contains(&self, kind: ActionKind) -> bool {
        self.0 & kind.bit() != 0
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Iterate members in dispatch order
    pub fn iter(&self) -> impl Iterator<Item = ActionKind> + '_ {
        ActionKind::ALL.into_iter().filter(|k| self.contains(*k))
    }
}

impl FromIterator<ActionKind> for ActionSet {
    fn from_iter<I: IntoIterator<Item = ActionKind>>(iter: I) -> Self {
        let mut set = ActionSet::empty();
        for kind in iter {
            set.insert(kind);
        }
        set
    }
}

impl fmt::Debug for ActionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_contains() {
        let mut set = ActionSet::empty();
        assert!(set.is_empty());

        set.insert(ActionKind::Record);
        set.insert(ActionKind::Record);
        assert!(set.contains(ActionKind::Record));
        assert!(!set.contains(ActionKind::Publish));
        assert_eq!(set.len(), 1);

        set.remove(ActionKind::Record);
        assert!(set.is_empty());
    }

    #[test]
    fn test_iter_follows_dispatch_order() {
        let set: ActionSet = [ActionKind::LogBuffer, ActionKind::Publish].into_iter().collect();
        let kinds: Vec<_> = set.iter().collect();
        assert_eq!(kinds, vec![ActionKind::Publish, ActionKind::LogBuffer]);
    }
}
