//! Staged mutation: writes buffered during a tick, published on commit.
//!
//! Everything an ant changes while a tick runs (node populations, colony
//! membership, pheromone deposits) goes through a staging buffer so that
//! every read during the tick observes the pre-tick state. The buffers
//! become visible only when their owner commits at the tick boundary.
//!
//! - [`Shadowed`] keeps a staged shadow copy of a value (node census).
//! - [`Roster`] keeps keyed members plus pending additions and removals
//!   (colony membership).
//! - The pheromone store keeps a FIFO of pending deposits.
//!
//! All three implement [`Stage`].

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::error::{Result, SimError};

/// Something holding writes that only become observable on commit.
pub trait Stage {
    /// What a commit yields: `()` for infallible buffers, a report or a
    /// `Result` for buffers whose commit can detect a defect.
    type Outcome;

    /// Whether a commit would publish anything.
    fn needs_commit(&self) -> bool;

    /// Publish staged writes. Committing a clean buffer is a no-op.
    fn commit(&mut self) -> Self::Outcome;
}

/// A value with a staged shadow copy.
///
/// Reads through [`committed`](Shadowed::committed) see the last published
/// value; writes through [`staged_mut`](Shadowed::staged_mut) only touch the
/// shadow until [`commit`](Stage::commit).
#[derive(Debug, Clone, Default)]
pub struct Shadowed<T: Clone> {
    committed: T,
    staged: T,
    dirty: bool,
}

impl<T: Clone> Shadowed<T> {
    pub fn new(value: T) -> Self {
        Self {
            committed: value.clone(),
            staged: value,
            dirty: false,
        }
    }

    pub fn committed(&self) -> &T {
        &self.committed
    }

    pub fn staged(&self) -> &T {
        &self.staged
    }

    /// Mutable access to the shadow copy. Marks the value dirty.
    pub fn staged_mut(&mut self) -> &mut T {
        self.dirty = true;
        &mut self.staged
    }

    /// Replace both copies at once, discarding anything staged.
    pub fn reset(&mut self, value: T) {
        self.committed = value.clone();
        self.staged = value;
        self.dirty = false;
    }
}

impl<T: Clone> Stage for Shadowed<T> {
    type Outcome = ();

    fn needs_commit(&self) -> bool {
        self.dirty
    }

    fn commit(&mut self) {
        if self.dirty {
            self.committed.clone_from(&self.staged);
            self.dirty = false;
        }
    }
}

/// What a [`Roster`] commit changed.
#[derive(Debug)]
pub struct RosterCommit<K, V> {
    /// Members removed by this commit, handed back to the caller.
    pub retired: Vec<(K, V)>,
    /// Keys inserted by this commit, in key order.
    pub admitted: Vec<K>,
}

impl<K, V> RosterCommit<K, V> {
    pub fn is_empty(&self) -> bool {
        self.retired.is_empty() && self.admitted.is_empty()
    }
}

impl<K, V> Default for RosterCommit<K, V> {
    fn default() -> Self {
        Self {
            retired: Vec::new(),
            admitted: Vec::new(),
        }
    }
}

/// Keyed membership with staged additions and removals.
///
/// Members iterate in key order. A key appears in at most one of the
/// members / pending-addition maps after every successful commit.
#[derive(Debug)]
pub struct Roster<K: Ord, V> {
    members: BTreeMap<K, V>,
    pending_add: BTreeMap<K, V>,
    pending_remove: BTreeSet<K>,
    dirty: bool,
}

impl<K: Ord, V> Default for Roster<K, V> {
    fn default() -> Self {
        Self {
            members: BTreeMap::new(),
            pending_add: BTreeMap::new(),
            pending_remove: BTreeSet::new(),
            dirty: false,
        }
    }
}

impl<K, V> Roster<K, V>
where
    K: Ord + Clone + fmt::Display,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage an addition.
    ///
    /// A key staged for removal has that removal cancelled: the member
    /// survives and no new value is built. Otherwise, unless the key is
    /// already pending addition, `make` builds the value to stage. Returns
    /// whether a new value was staged.
    pub fn stage_add(&mut self, key: K, make: impl FnOnce(&K) -> V) -> bool {
        self.dirty = true;

        if self.pending_remove.remove(&key) && self.members.contains_key(&key) {
            return false;
        }

        if self.pending_add.contains_key(&key) {
            return false;
        }

        let value = make(&key);
        self.pending_add.insert(key, value);
        true
    }

    /// Stage up to `n` members for removal, skipping members already staged.
    /// Returns how many were staged.
    pub fn stage_removals(&mut self, n: usize) -> usize {
        if n == 0 {
            return 0;
        }

        let mut staged = 0;
        for key in self.members.keys() {
            if staged == n {
                break;
            }
            if self.pending_remove.insert(key.clone()) {
                staged += 1;
            }
        }

        if staged > 0 {
            self.dirty = true;
        }
        staged
    }

    /// Stage the removal of one specific key.
    pub fn stage_remove(&mut self, key: K) -> bool {
        self.dirty = true;
        self.pending_remove.insert(key)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.members.contains_key(key)
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.members.get(key)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        self.members.get_mut(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.members.iter()
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut V> {
        self.members.values_mut()
    }

    pub fn pending_additions(&self) -> usize {
        self.pending_add.len()
    }

    pub fn pending_removals(&self) -> usize {
        self.pending_remove.len()
    }

    pub fn pending_values_mut(&mut self) -> impl Iterator<Item = &mut V> {
        self.pending_add.values_mut()
    }

    /// Take every member out, discarding anything staged.
    pub fn drain(&mut self) -> Vec<(K, V)> {
        self.pending_add.clear();
        self.pending_remove.clear();
        self.dirty = false;
        std::mem::take(&mut self.members).into_iter().collect()
    }

    /// Check the staged changes against the current members without
    /// touching anything.
    fn validate(&self) -> Result<()> {
        for key in &self.pending_remove {
            if !self.members.contains_key(key) {
                return Err(SimError::MissingMember(key.to_string()));
            }
        }

        for key in self.pending_add.keys() {
            if self.members.contains_key(key) && !self.pending_remove.contains(key) {
                return Err(SimError::DuplicateMember(key.to_string()));
            }
        }

        Ok(())
    }
}

impl<K, V> Stage for Roster<K, V>
where
    K: Ord + Clone + fmt::Display,
{
    type Outcome = Result<RosterCommit<K, V>>;

    fn needs_commit(&self) -> bool {
        self.dirty
    }

    /// Removals first, then additions. The roster is left untouched when
    /// validation fails.
    fn commit(&mut self) -> Result<RosterCommit<K, V>> {
        if !self.dirty {
            return Ok(RosterCommit::default());
        }

        self.validate()?;

        let mut outcome = RosterCommit::default();

        for key in std::mem::take(&mut self.pending_remove) {
            if let Some(value) = self.members.remove(&key) {
                outcome.retired.push((key, value));
            }
        }

        for (key, value) in std::mem::take(&mut self.pending_add) {
            outcome.admitted.push(key.clone());
            self.members.insert(key, value);
        }

        self.dirty = false;
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shadow_is_invisible_until_commit() {
        let mut value = Shadowed::new(0u32);
        *value.staged_mut() += 3;
        assert_eq!(*value.committed(), 0);
        assert_eq!(*value.staged(), 3);
        assert!(value.needs_commit());

        value.commit();
        assert_eq!(*value.committed(), 3);
        assert!(!value.needs_commit());
    }

    #[test]
    fn shadow_commit_is_idempotent() {
        let mut value = Shadowed::new(vec![1, 2]);
        value.staged_mut().push(3);
        value.commit();
        value.commit();
        assert_eq!(value.committed(), &vec![1, 2, 3]);
    }

    #[test]
    fn roster_additions_land_on_commit() {
        let mut roster: Roster<String, u32> = Roster::new();
        assert!(roster.stage_add("a".into(), |_| 1));
        assert!(roster.stage_add("b".into(), |_| 2));
        assert_eq!(roster.len(), 0);
        assert_eq!(roster.pending_additions(), 2);

        let outcome = roster.commit().unwrap();
        assert_eq!(outcome.admitted, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(roster.len(), 2);
        assert_eq!(roster.pending_additions(), 0);
    }

    #[test]
    fn duplicate_pending_addition_builds_once() {
        let mut roster: Roster<String, u32> = Roster::new();
        roster.stage_add("a".into(), |_| 1);
        let staged = roster.stage_add("a".into(), |_| panic!("must not rebuild"));
        assert!(!staged);
        assert_eq!(roster.pending_additions(), 1);
    }

    #[test]
    fn second_commit_is_noop() {
        let mut roster: Roster<String, u32> = Roster::new();
        roster.stage_add("a".into(), |_| 1);
        roster.commit().unwrap();
        let outcome = roster.commit().unwrap();
        assert!(outcome.is_empty());
        assert_eq!(roster.len(), 1);
    }

    #[test]
    fn removals_stage_each_member_once() {
        let mut roster: Roster<String, u32> = Roster::new();
        for key in ["a", "b", "c"] {
            roster.stage_add(key.into(), |_| 0);
        }
        roster.commit().unwrap();

        assert_eq!(roster.stage_removals(2), 2);
        assert_eq!(roster.stage_removals(5), 1);
        assert_eq!(roster.stage_removals(1), 0);
        assert_eq!(roster.len(), 3);

        let outcome = roster.commit().unwrap();
        assert_eq!(outcome.retired.len(), 3);
        assert!(roster.is_empty());
    }

    #[test]
    fn zero_removals_stage_nothing() {
        let mut roster: Roster<String, u32> = Roster::new();
        roster.stage_add("a".into(), |_| 0);
        roster.commit().unwrap();
        assert_eq!(roster.stage_removals(0), 0);
        assert!(!roster.needs_commit());
    }

    #[test]
    fn re_adding_cancels_pending_removal() {
        let mut roster: Roster<String, u32> = Roster::new();
        roster.stage_add("a".into(), |_| 7);
        roster.commit().unwrap();

        roster.stage_removals(1);
        let staged = roster.stage_add("a".into(), |_| 99);
        assert!(!staged);

        roster.commit().unwrap();
        assert_eq!(roster.get(&"a".to_string()), Some(&7));
    }

    #[test]
    fn removing_unknown_member_fails_without_mutation() {
        let mut roster: Roster<String, u32> = Roster::new();
        roster.stage_add("a".into(), |_| 1);
        roster.commit().unwrap();

        roster.stage_remove("ghost".into());
        roster.stage_add("b".into(), |_| 2);
        let err = roster.commit().unwrap_err();
        assert_eq!(err, SimError::MissingMember("ghost".into()));
        assert_eq!(roster.len(), 1);
        assert_eq!(roster.pending_additions(), 1);
    }

    #[test]
    fn adding_existing_member_fails() {
        let mut roster: Roster<String, u32> = Roster::new();
        roster.stage_add("a".into(), |_| 1);
        roster.commit().unwrap();

        roster.stage_add("a".into(), |_| 2);
        let err = roster.commit().unwrap_err();
        assert_eq!(err, SimError::DuplicateMember("a".into()));
        assert_eq!(roster.get(&"a".to_string()), Some(&1));
    }
}
