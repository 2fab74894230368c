//! Incrementally maintained, sorted and filtered views over a changing set of entities.
//!
//! # Design
//! - A policy supplies two pure functions: `classify` decides membership and
//!   `order` decides display order among visible entities.
//! - Entities live elsewhere; the projection stores keys only and resolves
//!   entities through an [`EntitySource`] when it needs to classify or compare.
//! - Every mutation renumbers only the contiguous span of rows whose position
//!   changed, never the whole sequence.
//! - Changes are queued as [`ProjectionChange`] values and drained by the owner,
//!   which forwards them to observers before the tick returns.

mod policies;

pub use policies::{ActiveDownloads, ActiveUploads, AllTorrents};

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::{BuildHasher, Hash};
use std::ops::RangeInclusive;

use crate::error::ProjectionError;

/// Outcome of classifying an entity against a projection policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Not a member; the projection keeps listening so the entity may qualify later.
    Remove,
    /// Member, but hidden from the visible sequence.
    Keep,
    /// Member and visible.
    Accept,
}

/// Membership and ordering rules of one projection.
pub trait ProjectionPolicy {
    /// Entity type the policy inspects.
    type Entity;

    /// Short name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Decide membership from the entity's current fields.
    fn classify(&self, entity: &Self::Entity) -> Classification;

    /// Display order among accepted entities; must be a total preorder.
    fn order(&self, a: &Self::Entity, b: &Self::Entity) -> Ordering;
}

/// Lookup of entities by key.
pub trait EntitySource<K, E> {
    /// Entity stored under `key`.
    fn entity(&self, key: &K) -> Option<&E>;
}

impl<K, E, S> EntitySource<K, E> for HashMap<K, E, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    fn entity(&self, key: &K) -> Option<&E> {
        self.get(key)
    }
}

/// Notification describing one change to a projection's visible sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionChange<K> {
    /// `key` became visible at `index`.
    Inserted {
        /// Entity key.
        key: K,
        /// Final row index.
        index: usize,
    },
    /// `key` stopped being visible; it used to sit at `index`.
    Removed {
        /// Entity key.
        key: K,
        /// Former row index.
        index: usize,
    },
    /// `key` moved from `from` to `to`.
    Moved {
        /// Entity key.
        key: K,
        /// Former row index.
        from: usize,
        /// New row index.
        to: usize,
    },
    /// Displayed fields of the visible entity at `index` changed.
    DataChanged {
        /// Entity key.
        key: K,
        /// Row index.
        index: usize,
        /// Whether metadata (rather than status) changed.
        metadata: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Membership {
    Visible,
    Kept,
    Excluded,
}

/// Sorted, filtered view over entities identified by `K`.
pub struct Projection<K, P> {
    policy: P,
    rows: Vec<K>,
    index: HashMap<K, usize>,
    members: HashMap<K, Membership>,
    changes: Vec<ProjectionChange<K>>,
    last_renumbered: Option<RangeInclusive<usize>>,
}

impl<K, P> Projection<K, P>
where
    K: Copy + Eq + Hash + Debug,
    P: ProjectionPolicy,
{
    /// Empty projection driven by `policy`.
    pub fn new(policy: P) -> Self {
        Self {
            policy,
            rows: Vec::new(),
            index: HashMap::new(),
            members: HashMap::new(),
            changes: Vec::new(),
            last_renumbered: None,
        }
    }

    /// Policy driving this projection.
    pub const fn policy(&self) -> &P {
        &self.policy
    }

    /// Number of visible entities.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether nothing is visible.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Visible keys in display order.
    pub fn rows(&self) -> &[K] {
        &self.rows
    }

    /// Row index of a visible entity.
    pub fn index_of(&self, key: &K) -> Option<usize> {
        self.index.get(key).copied()
    }

    /// Key at `row`.
    pub fn key_at(&self, row: usize) -> Option<K> {
        self.rows.get(row).copied()
    }

    /// Whether the projection listens to changes of `key`.
    ///
    /// True between `track` and `untrack`, including while the policy
    /// classifies the entity `Remove`. Use [`is_member`](Self::is_member) to
    /// ask whether the entity is tracked here in the `Keep`/`Accept` sense.
    pub fn is_listening(&self, key: &K) -> bool {
        self.members.contains_key(key)
    }

    /// Whether `key` is currently classified `Keep` or `Accept`.
    pub fn is_member(&self, key: &K) -> bool {
        self.members
            .get(key)
            .is_some_and(|membership| *membership != Membership::Excluded)
    }

    /// Whether `key` is visible.
    pub fn is_visible(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    /// Members classified `Keep`: tracked and hidden.
    pub fn kept(&self) -> impl Iterator<Item = &K> + '_ {
        self.members
            .iter()
            .filter(|(_, membership)| **membership == Membership::Kept)
            .map(|(key, _)| key)
    }

    /// Row span whose reverse-index entries the most recent operation rewrote.
    pub fn last_renumbered(&self) -> Option<RangeInclusive<usize>> {
        self.last_renumbered.clone()
    }

    /// Drain queued change notifications in emission order.
    pub fn take_changes(&mut self) -> Vec<ProjectionChange<K>> {
        std::mem::take(&mut self.changes)
    }

    /// Begin observing `key` and insert it if the policy accepts it.
    ///
    /// # Errors
    ///
    /// Returns an error if `key` is already tracked or cannot be resolved.
    pub fn track<S>(&mut self, key: K, source: &S) -> Result<(), ProjectionError>
    where
        S: EntitySource<K, P::Entity> + ?Sized,
    {
        self.last_renumbered = None;
        if self.members.contains_key(&key) {
            return Err(ProjectionError::AlreadyTracked {
                key: format!("{key:?}"),
            });
        }
        let entity = resolve(source, &key)?;
        match self.policy.classify(entity) {
            Classification::Accept => {
                self.insert(key, entity, source)?;
                self.members.insert(key, Membership::Visible);
            }
            Classification::Keep => {
                self.members.insert(key, Membership::Kept);
            }
            Classification::Remove => {
                self.members.insert(key, Membership::Excluded);
            }
        }
        Ok(())
    }

    /// Stop observing `key`, removing it from the visible sequence if present.
    ///
    /// Returns whether the key was tracked. The row is found through the
    /// reverse index, so the policy is never consulted.
    pub fn untrack(&mut self, key: &K) -> bool {
        self.last_renumbered = None;
        if self.members.remove(key).is_none() {
            return false;
        }
        self.remove_row(*key);
        true
    }

    /// Re-evaluate `key` after its metadata or status changed.
    ///
    /// Changes for keys this projection does not track are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if an entity involved cannot be resolved or the reverse
    /// index is inconsistent.
    pub fn changed<S>(&mut self, key: K, metadata: bool, source: &S) -> Result<(), ProjectionError>
    where
        S: EntitySource<K, P::Entity> + ?Sized,
    {
        self.last_renumbered = None;
        let Some(membership) = self.members.get(&key).copied() else {
            return Ok(());
        };
        let entity = resolve(source, &key)?;
        let classification = self.policy.classify(entity);
        let next = match (membership, classification) {
            (Membership::Visible, Classification::Accept) => {
                self.revalidate(key, entity, metadata, source)?;
                Membership::Visible
            }
            (Membership::Visible, hidden) => {
                self.remove_row(key);
                hidden_membership(hidden)
            }
            (_, Classification::Accept) => {
                self.insert(key, entity, source)?;
                Membership::Visible
            }
            (_, hidden) => hidden_membership(hidden),
        };
        self.members.insert(key, next);
        Ok(())
    }

    /// Verify ordering, index consistency and uniqueness of the visible sequence.
    ///
    /// # Errors
    ///
    /// Returns the first violation found.
    pub fn check_invariants<S>(&self, source: &S) -> Result<(), ProjectionError>
    where
        S: EntitySource<K, P::Entity> + ?Sized,
    {
        for (position, key) in self.rows.iter().enumerate() {
            let recorded = self.index.get(key).copied();
            if recorded != Some(position) || self.members.get(key) != Some(&Membership::Visible)
            {
                return Err(ProjectionError::IndexMismatch {
                    key: format!("{key:?}"),
                    recorded: recorded.unwrap_or(usize::MAX),
                    actual: Some(position),
                });
            }
        }
        if self.index.len() != self.rows.len() {
            let stray = self
                .index
                .iter()
                .find(|(key, position)| self.rows.get(**position) != Some(*key));
            if let Some((key, position)) = stray {
                return Err(ProjectionError::IndexMismatch {
                    key: format!("{key:?}"),
                    recorded: *position,
                    actual: self.rows.iter().position(|row| row == key),
                });
            }
        }
        for (position, pair) in self.rows.windows(2).enumerate() {
            let left = resolve(source, &pair[0])?;
            let right = resolve(source, &pair[1])?;
            if self.policy.order(left, right) == Ordering::Greater {
                return Err(ProjectionError::OutOfOrder { index: position });
            }
        }
        Ok(())
    }

    fn insert<S>(&mut self, key: K, entity: &P::Entity, source: &S) -> Result<(), ProjectionError>
    where
        S: EntitySource<K, P::Entity> + ?Sized,
    {
        // Scan from the tail so equal entities keep arrival order.
        let mut row = self.rows.len();
        while row > 0 {
            let previous = resolve(source, &self.rows[row - 1])?;
            if self.policy.order(previous, entity) != Ordering::Greater {
                break;
            }
            row -= 1;
        }
        self.rows.insert(row, key);
        self.renumber(row, self.rows.len() - 1);
        self.changes.push(ProjectionChange::Inserted { key, index: row });
        Ok(())
    }

    fn remove_row(&mut self, key: K) {
        let Some(index) = self.index.remove(&key) else {
            return;
        };
        self.rows.remove(index);
        if index < self.rows.len() {
            self.renumber(index, self.rows.len() - 1);
        }
        self.changes.push(ProjectionChange::Removed { key, index });
    }

    fn revalidate<S>(
        &mut self,
        key: K,
        entity: &P::Entity,
        metadata: bool,
        source: &S,
    ) -> Result<(), ProjectionError>
    where
        S: EntitySource<K, P::Entity> + ?Sized,
    {
        let from = self
            .index
            .get(&key)
            .copied()
            .filter(|position| self.rows.get(*position) == Some(&key))
            .ok_or_else(|| ProjectionError::IndexMismatch {
                key: format!("{key:?}"),
                recorded: self.index.get(&key).copied().unwrap_or(usize::MAX),
                actual: self.rows.iter().position(|row| *row == key),
            })?;
        self.changes.push(ProjectionChange::DataChanged {
            key,
            index: from,
            metadata,
        });

        // Only this entity changed, so only its neighbours can be out of order.
        let last = self.rows.len() - 1;
        let mut to = from;
        while to > 0 {
            let previous = resolve(source, &self.rows[to - 1])?;
            if self.policy.order(previous, entity) != Ordering::Greater {
                break;
            }
            to -= 1;
        }
        if to == from {
            while to < last {
                let next = resolve(source, &self.rows[to + 1])?;
                if self.policy.order(next, entity) != Ordering::Less {
                    break;
                }
                to += 1;
            }
        }
        if to == from {
            return Ok(());
        }

        if to < from {
            self.rows[to..=from].rotate_right(1);
            self.renumber(to, from);
        } else {
            self.rows[from..=to].rotate_left(1);
            self.renumber(from, to);
        }
        self.changes.push(ProjectionChange::Moved { key, from, to });
        Ok(())
    }

    fn renumber(&mut self, first: usize, last: usize) {
        for position in first..=last {
            self.index.insert(self.rows[position], position);
        }
        self.last_renumbered = Some(first..=last);
    }
}

const fn hidden_membership(classification: Classification) -> Membership {
    match classification {
        Classification::Keep => Membership::Kept,
        Classification::Remove | Classification::Accept => Membership::Excluded,
    }
}

fn resolve<'s, K, E, S>(source: &'s S, key: &K) -> Result<&'s E, ProjectionError>
where
    K: Debug,
    S: EntitySource<K, E> + ?Sized,
{
    source
        .entity(key)
        .ok_or_else(|| ProjectionError::MissingEntity {
            key: format!("{key:?}"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy)]
    struct Item {
        rank: i32,
        class: Classification,
    }

    struct ByRank;

    impl ProjectionPolicy for ByRank {
        type Entity = Item;

        fn name(&self) -> &'static str {
            "by_rank"
        }

        fn classify(&self, entity: &Item) -> Classification {
            entity.class
        }

        fn order(&self, a: &Item, b: &Item) -> Ordering {
            a.rank.cmp(&b.rank)
        }
    }

    fn visible(rank: i32) -> Item {
        Item {
            rank,
            class: Classification::Accept,
        }
    }

    fn setup(ranks: &[i32]) -> (HashMap<u32, Item>, Projection<u32, ByRank>) {
        let mut items = HashMap::new();
        let mut projection = Projection::new(ByRank);
        for (key, rank) in (0_u32..).zip(ranks) {
            items.insert(key, visible(*rank));
            projection.track(key, &items).expect("track");
        }
        projection.take_changes();
        (items, projection)
    }

    #[test]
    fn track_inserts_in_order_with_stable_ties() {
        let (items, projection) = setup(&[3, 1, 2, 1]);
        assert_eq!(projection.rows(), &[1, 3, 2, 0]);
        assert_eq!(projection.index_of(&3), Some(1));
        projection.check_invariants(&items).expect("invariants");
    }

    #[test]
    fn duplicate_track_is_rejected() {
        let (items, mut projection) = setup(&[1]);
        assert!(matches!(
            projection.track(0, &items),
            Err(ProjectionError::AlreadyTracked { .. })
        ));
    }

    #[test]
    fn insert_reports_final_index_and_renumbers_tail() {
        let (mut items, mut projection) = setup(&[1, 3, 5]);
        items.insert(9, visible(2));
        projection.track(9, &items).expect("track");
        assert_eq!(
            projection.take_changes(),
            vec![ProjectionChange::Inserted { key: 9, index: 1 }]
        );
        assert_eq!(projection.last_renumbered(), Some(1..=3));
        projection.check_invariants(&items).expect("invariants");
    }

    #[test]
    fn move_left_renumbers_only_the_span() {
        let (mut items, mut projection) = setup(&[1, 2, 3, 4, 5, 6]);
        items.insert(4, visible(2));
        projection.changed(4, false, &items).expect("changed");

        assert_eq!(projection.rows(), &[0, 1, 4, 2, 3, 5]);
        assert_eq!(projection.last_renumbered(), Some(2..=4));
        assert_eq!(
            projection.take_changes(),
            vec![
                ProjectionChange::DataChanged {
                    key: 4,
                    index: 4,
                    metadata: false
                },
                ProjectionChange::Moved {
                    key: 4,
                    from: 4,
                    to: 2
                },
            ]
        );
        projection.check_invariants(&items).expect("invariants");
    }

    #[test]
    fn move_right_renumbers_only_the_span() {
        let (mut items, mut projection) = setup(&[1, 2, 3, 4, 5, 6]);
        items.insert(1, visible(5));
        projection.changed(1, false, &items).expect("changed");

        // Stops in front of the first equal successor.
        assert_eq!(projection.rows(), &[0, 2, 3, 1, 4, 5]);
        assert_eq!(projection.last_renumbered(), Some(1..=3));
        projection.check_invariants(&items).expect("invariants");
    }

    #[test]
    fn unchanged_position_emits_only_data_changed() {
        let (items, mut projection) = setup(&[1, 2, 3]);
        projection.changed(1, true, &items).expect("changed");
        assert_eq!(
            projection.take_changes(),
            vec![ProjectionChange::DataChanged {
                key: 1,
                index: 1,
                metadata: true
            }]
        );
        assert_eq!(projection.last_renumbered(), None);
    }

    #[test]
    fn keep_hides_and_later_accept_reinserts() {
        let (mut items, mut projection) = setup(&[1, 2, 3]);
        items.insert(
            1,
            Item {
                rank: 2,
                class: Classification::Keep,
            },
        );
        projection.changed(1, false, &items).expect("hide");
        assert_eq!(projection.rows(), &[0, 2]);
        assert_eq!(projection.last_renumbered(), Some(1..=1));
        assert_eq!(projection.kept().copied().collect::<Vec<_>>(), vec![1]);
        assert!(projection.is_member(&1));
        assert!(!projection.is_visible(&1));

        items.insert(1, visible(2));
        projection.changed(1, false, &items).expect("show");
        assert_eq!(projection.rows(), &[0, 1, 2]);
        assert_eq!(projection.kept().count(), 0);
        projection.check_invariants(&items).expect("invariants");
    }

    #[test]
    fn excluded_entities_can_qualify_later() {
        let mut items = HashMap::new();
        let mut projection = Projection::new(ByRank);
        items.insert(
            7_u32,
            Item {
                rank: 1,
                class: Classification::Remove,
            },
        );
        projection.track(7, &items).expect("track");
        assert!(projection.is_empty());
        assert_eq!(projection.kept().count(), 0);
        assert!(projection.is_listening(&7));
        assert!(!projection.is_member(&7));

        items.insert(7, visible(1));
        projection.changed(7, false, &items).expect("changed");
        assert_eq!(projection.rows(), &[7]);
        assert!(projection.is_member(&7));
    }

    #[test]
    fn untrack_uses_direct_lookup() {
        let (items, mut projection) = setup(&[1, 2, 3, 4]);
        assert!(projection.untrack(&1));
        assert_eq!(projection.rows(), &[0, 2, 3]);
        assert_eq!(projection.index_of(&3), Some(2));
        assert_eq!(projection.last_renumbered(), Some(1..=2));
        assert_eq!(
            projection.take_changes(),
            vec![ProjectionChange::Removed { key: 1, index: 1 }]
        );
        assert!(!projection.untrack(&1));
        projection.check_invariants(&items).expect("invariants");
    }

    #[test]
    fn changes_for_untracked_keys_are_ignored() {
        let (mut items, mut projection) = setup(&[1]);
        items.insert(42, visible(0));
        projection.changed(42, false, &items).expect("ignored");
        assert_eq!(projection.rows(), &[0]);
        assert!(projection.take_changes().is_empty());
    }

    #[test]
    fn missing_entity_is_reported() {
        let (mut items, mut projection) = setup(&[1, 2]);
        items.remove(&0);
        items.insert(1, visible(0));
        assert!(matches!(
            projection.changed(1, false, &items),
            Err(ProjectionError::MissingEntity { .. })
        ));
    }
}
