//! Interaction Matrix Builder
//!
//! Dense user x item matrix of interaction scores with bijective id <-> index
//! mappings. Rows and columns are laid out in ascending id order over the
//! union of catalog records and ids observed in events, so the layout is
//! independent of input order.

use ndarray::{Array2, ArrayView1};
use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;

use crate::aggregator::Aggregation;
use crate::types::{Item, ItemId, User, UserId};

/// Bijective mapping between ids and dense indices
#[derive(Debug, Clone, PartialEq)]
pub struct IdIndex<T: Eq + Hash> {
    ids: Vec<T>,
    positions: HashMap<T, usize>,
}

impl<T: Clone + Eq + Hash + Ord> IdIndex<T> {
    /// Build from ids in any order; duplicates collapse, indices follow ascending id order
    pub fn from_ids(ids: impl IntoIterator<Item = T>) -> Self {
        let mut ids: Vec<T> = ids.into_iter().collect();
        ids.sort();
        ids.dedup();

        let positions = ids
            .iter()
            .enumerate()
            .map(|(idx, id)| (id.clone(), idx))
            .collect();

        Self { ids, positions }
    }

    pub fn index_of<Q>(&self, id: &Q) -> Option<usize>
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.positions.get(id).copied()
    }

    pub fn id_at(&self, index: usize) -> Option<&T> {
        self.ids.get(index)
    }

    pub fn contains<Q>(&self, id: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.positions.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// `(index, id)` pairs in index order
    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> {
        self.ids.iter().enumerate()
    }
}

/// Immutable user x item interaction matrix
#[derive(Debug, Clone, PartialEq)]
pub struct InteractionMatrix {
    values: Array2<f64>,
    users: IdIndex<UserId>,
    items: IdIndex<ItemId>,
}

impl InteractionMatrix {
    /// Assemble the matrix from aggregated scores
    ///
    /// Users and items with catalog records but no events, or whose events
    /// were all skipped, still get an all-zero row or column.
    pub fn build(aggregation: &Aggregation, users: &[User], items: &[Item]) -> Self {
        let user_index = IdIndex::from_ids(
            users
                .iter()
                .map(|u| u.user_id.clone())
                .chain(aggregation.users().iter().cloned()),
        );
        let item_index = IdIndex::from_ids(
            items
                .iter()
                .map(|i| i.item_id.clone())
                .chain(aggregation.items().iter().cloned()),
        );

        let mut values = Array2::<f64>::zeros((user_index.len(), item_index.len()));
        for ((user_id, item_id), pair) in &aggregation.scores {
            if let (Some(row), Some(col)) =
                (user_index.index_of(user_id), item_index.index_of(item_id))
            {
                values[[row, col]] = pair.score;
            }
        }

        Self {
            values,
            users: user_index,
            items: item_index,
        }
    }

    pub fn users(&self) -> &IdIndex<UserId> {
        &self.users
    }

    pub fn items(&self) -> &IdIndex<ItemId> {
        &self.items
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn num_users(&self) -> usize {
        self.users.len()
    }

    pub fn num_items(&self) -> usize {
        self.items.len()
    }

    /// Interaction score by id; 0.0 for unknown ids or empty cells
    pub fn score(&self, user_id: &str, item_id: &str) -> f64 {
        match (self.users.index_of(user_id), self.items.index_of(item_id)) {
            (Some(row), Some(col)) => self.values[[row, col]],
            _ => 0.0,
        }
    }

    pub fn user_row(&self, user_idx: usize) -> ArrayView1<'_, f64> {
        self.values.row(user_idx)
    }

    pub fn item_column(&self, item_idx: usize) -> ArrayView1<'_, f64> {
        self.values.column(item_idx)
    }

    /// Items the user has a positive score for, as `(item_idx, score)`,
    /// highest score first, ties by item id
    pub fn user_history(&self, user_idx: usize) -> Vec<(usize, f64)> {
        let mut history: Vec<(usize, f64)> = self
            .values
            .row(user_idx)
            .iter()
            .enumerate()
            .filter(|(_, &score)| score > 0.0)
            .map(|(idx, &score)| (idx, score))
            .collect();

        history.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        history
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::InteractionAggregator;
    use crate::types::Event;
    use crate::weights::{EventWeightPolicy, UnknownEventKindPolicy};

    fn build(events: &[Event], users: &[User], items: &[Item]) -> InteractionMatrix {
        let weights = EventWeightPolicy::default();
        let aggregation = InteractionAggregator::new(&weights, UnknownEventKindPolicy::Skip)
            .aggregate(events, items)
            .unwrap();
        InteractionMatrix::build(&aggregation, users, items)
    }

    #[test]
    fn test_id_index_is_sorted_and_bijective() {
        let index = IdIndex::from_ids(vec![
            ItemId::from("i3"),
            ItemId::from("i1"),
            ItemId::from("i2"),
            ItemId::from("i1"),
        ]);

        assert_eq!(index.len(), 3);
        for (idx, id) in index.iter() {
            assert_eq!(index.index_of(id), Some(idx));
        }
        assert_eq!(index.index_of("i1"), Some(0));
        assert_eq!(index.id_at(2), Some(&ItemId::from("i3")));
        assert_eq!(index.index_of("i9"), None);
    }

    #[test]
    fn test_unseen_cells_are_zero() {
        let events = vec![
            Event::new("u1", "i1", "play", 100.0),
            Event::new("u2", "i2", "complete", 10.0),
        ];
        let matrix = build(&events, &[], &[]);

        assert_eq!(matrix.num_users(), 2);
        assert_eq!(matrix.num_items(), 2);
        assert_eq!(matrix.score("u1", "i1"), 100.0);
        assert_eq!(matrix.score("u2", "i2"), 30.0);
        assert_eq!(matrix.score("u1", "i2"), 0.0);
        assert_eq!(matrix.score("nobody", "i1"), 0.0);
    }

    #[test]
    fn test_catalog_entries_without_events_get_zero_rows() {
        let events = vec![Event::new("u1", "i1", "play", 100.0)];
        let users = vec![User::new("u1"), User::new("u2")];
        let items = vec![
            Item::new("i1", "A", "movie", "drama"),
            Item::new("i2", "B", "movie", "drama"),
        ];
        let matrix = build(&events, &users, &items);

        assert_eq!(matrix.num_users(), 2);
        assert_eq!(matrix.num_items(), 2);
        let u2 = matrix.users().index_of("u2").unwrap();
        assert!(matrix.user_row(u2).iter().all(|&v| v == 0.0));
        let i2 = matrix.items().index_of("i2").unwrap();
        assert!(matrix.item_column(i2).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_layout_independent_of_event_order() {
        let mut events = vec![
            Event::new("u2", "i3", "play", 5.0),
            Event::new("u1", "i1", "like", 7.0),
            Event::new("u3", "i2", "save", 9.0),
        ];
        let a = build(&events, &[], &[]);
        events.reverse();
        let b = build(&events, &[], &[]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_user_history_ordering() {
        let events = vec![
            Event::new("u1", "i1", "play", 100.0),
            Event::new("u1", "i2", "play", 300.0),
            Event::new("u1", "i3", "play", 100.0),
            Event::new("u1", "i4", "play", 0.0),
        ];
        let matrix = build(&events, &[], &[]);
        let u1 = matrix.users().index_of("u1").unwrap();

        let history: Vec<&str> = matrix
            .user_history(u1)
            .into_iter()
            .map(|(idx, _)| matrix.items().id_at(idx).unwrap().as_str())
            .collect();
        assert_eq!(history, vec!["i2", "i1", "i3"]);
    }
}
